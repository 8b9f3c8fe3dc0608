//! # Re-entrancy and Self-Call Tests
//!
//! Dispatched calls may call back into the gate on the same thread. These
//! tests pin the check-act-recheck behaviour and the all-or-nothing rollback
//! of re-entrant changes, plus configuration updates through self-calls.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use common::*;
use timelock_controller::{
    AuditTrail, Call, EventSink, InvocationError, OperationId, Role, SelfCall, Timelock,
    TimelockBuilder, TimelockError, TimelockEvent, MINIMUM_DELAY,
};

// ---------------------------------------------------------------------------
// 1. Post-check
// ---------------------------------------------------------------------------

#[test]
fn call_cancelling_its_own_operation_fails_post_check() {
    let h = Harness::new();
    let c = call("saboteur", b"cancel-me");
    let id = h.gate.hash_operation(&c, None, salt()).unwrap();
    h.roles
        .grant_role(&gate_id(), Role::Cancellor, &p("saboteur"))
        .unwrap();
    h.invoker.on_call(p("saboteur"), move |gate, call| {
        gate.cancel(&call.target, &id, "from inside")?;
        Ok(())
    });

    h.schedule(c.clone());
    h.wait();
    let err = h.execute(c).unwrap_err();
    assert!(matches!(err, TimelockError::NotReady { .. }));

    // The re-entrant cancellation was rolled back with everything else.
    assert!(h.gate.is_ready(&id));
    assert!(!h.gate.is_done(&id));
    assert!(h.invoker.calls().is_empty());
    assert_eq!(h.event_kinds(), vec!["scheduled"]);
}

#[test]
fn call_disputing_its_own_operation_fails_post_check() {
    let h = Harness::new();
    let c = call("whistleblower", b"");
    let id = h.gate.hash_operation(&c, None, salt()).unwrap();
    h.roles
        .grant_role(&gate_id(), Role::Veto, &p("whistleblower"))
        .unwrap();
    h.invoker.on_call(p("whistleblower"), move |gate, call| {
        gate.dispute(&call.target, &id)?;
        Ok(())
    });

    h.schedule(c.clone());
    h.wait();
    assert!(matches!(h.execute(c), Err(TimelockError::Disputed { .. })));
    assert_eq!(h.gate.dispute_status_of(&id).code(), 0);
}

#[test]
fn re_entrant_double_execution_is_rejected() {
    let h = Harness::new();
    let c = call("echo", b"again");
    let id = h.gate.hash_operation(&c, None, salt()).unwrap();
    let recursed = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&recursed);
    h.invoker.on_call(p("echo"), move |gate, call| {
        if !flag.swap(true, Ordering::SeqCst) {
            gate.execute(&executor(), call.clone(), None, salt())?;
        }
        Ok(())
    });

    h.schedule(c.clone());
    h.wait();
    // The inner execution marks the operation done, so the outer post-check
    // fails and both are undone.
    assert!(matches!(h.execute(c), Err(TimelockError::NotReady { .. })));
    assert!(recursed.load(Ordering::SeqCst));
    assert!(h.gate.is_ready(&id));
    assert!(h.invoker.calls().is_empty());
    assert_eq!(h.invoker.depth(), 0);
}

// ---------------------------------------------------------------------------
// 2. Nested success and failure
// ---------------------------------------------------------------------------

#[test]
fn call_may_execute_another_ready_operation() {
    let h = Harness::new();
    let inner = call("vault", b"release");
    let outer = call("relay", b"trigger");
    let inner_id = h.schedule(inner.clone());
    let outer_id = h.schedule(outer.clone());
    h.invoker.on_call(p("relay"), move |gate, _| {
        gate.execute(&executor(), inner.clone(), None, salt())?;
        Ok(())
    });
    h.wait();

    h.execute(outer).unwrap();
    assert!(h.gate.is_done(&inner_id));
    assert!(h.gate.is_done(&outer_id));
    let targets: Vec<String> = h.invoker.calls().iter().map(|c| c.target.to_string()).collect();
    assert_eq!(targets, vec!["vault", "relay"]);
}

#[test]
fn failed_outer_execution_undoes_nested_one() {
    let h = Harness::new();
    let inner = call("vault", b"release");
    let inner_id = h.schedule(inner.clone());
    h.invoker.on_call(p("relay"), move |gate, _| {
        gate.execute(&executor(), inner.clone(), None, salt())?;
        Err(InvocationError::new("relay out of gas"))
    });
    let outer = call("relay", b"trigger");
    let outer_id = h.schedule(outer.clone());
    h.wait();

    let err = h.execute(outer).unwrap_err();
    assert!(matches!(err, TimelockError::InvocationFailed { reason, .. } if reason == "relay out of gas"));
    assert!(h.gate.is_ready(&inner_id));
    assert!(h.gate.is_ready(&outer_id));
    assert!(h.invoker.calls().is_empty());
    assert!(!h.event_kinds().contains(&"executed"));
}

#[test]
fn swallowed_nested_failure_leaves_no_trace() {
    let h = Harness::new();
    let c = call("prober", b"");
    h.invoker.on_call(p("prober"), |gate, _| {
        // Not a cancellor: rejected, and the caller carries on.
        let probe = gate.hash_operation(&call("x", b""), None, salt())?;
        assert!(gate.cancel(&p("prober"), &probe, "").is_err());
        Ok(())
    });
    let id = h.schedule(c.clone());
    h.wait();
    h.execute(c).unwrap();
    assert!(h.gate.is_done(&id));
}

// ---------------------------------------------------------------------------
// 3. Self-calls
// ---------------------------------------------------------------------------

#[test]
fn delay_changes_only_through_execution() {
    let h = Harness::new();
    let new_delay = 3 * MINIMUM_DELAY;

    let err = h.gate.update_min_delay(&proposer(), new_delay).unwrap_err();
    assert!(err.is_unauthorized());

    // Naming the gate's own identity is not enough outside an execution.
    let err = h.gate.update_min_delay(&gate_id(), new_delay).unwrap_err();
    assert!(matches!(err, TimelockError::NotSelf { .. }));
    assert_eq!(h.gate.min_delay(), MINIMUM_DELAY);
    assert!(h.events().is_empty());

    let update = SelfCall::UpdateDelay { new_delay }.to_call(&gate_id()).unwrap();
    let id = h.schedule(update.clone());
    h.wait();
    h.execute(update).unwrap();

    assert!(h.gate.is_done(&id));
    assert_eq!(h.gate.min_delay(), new_delay);
    // Self-calls never reach the invoker.
    assert!(h.invoker.calls().is_empty());
    assert!(h
        .events()
        .contains(&TimelockEvent::MinDelayChanged {
            old: MINIMUM_DELAY,
            new: new_delay
        }));

    // The new minimum applies to later schedules.
    assert!(matches!(
        h.gate.schedule(&proposer(), call("t", b""), None, salt(), MINIMUM_DELAY, ""),
        Err(TimelockError::InsufficientDelay { .. })
    ));
}

#[test]
fn dispatched_call_cannot_update_delay_directly() {
    let h = Harness::new();
    h.invoker.on_call(p("usurper"), |gate, _| {
        gate.update_min_delay(&gate.identity().clone(), 10 * MINIMUM_DELAY)?;
        Ok(())
    });
    let c = call("usurper", b"");
    let id = h.schedule(c.clone());
    h.wait();

    let err = h.execute(c).unwrap_err();
    assert!(matches!(
        err,
        TimelockError::InvocationFailed { ref reason, .. } if reason.contains("is not the timelock itself")
    ));
    assert_eq!(h.gate.min_delay(), MINIMUM_DELAY);
    assert!(h.gate.is_ready(&id));
}

#[test]
fn out_of_bounds_self_call_rolls_back() {
    let h = Harness::new();
    let update = SelfCall::UpdateDelay { new_delay: 60 }
        .to_call(&gate_id())
        .unwrap();
    let id = h.schedule(update.clone());
    h.wait();
    let err = h.execute(update).unwrap_err();
    assert!(matches!(err, TimelockError::DelayOutOfBounds { delay: 60, .. }));
    assert_eq!(h.gate.min_delay(), MINIMUM_DELAY);
    assert!(!h.gate.is_done(&id));
}

#[test]
fn undecodable_self_call_fails() {
    let h = Harness::new();
    let bogus = call("timelock", b"not json");
    h.schedule(bogus.clone());
    h.wait();
    assert!(matches!(
        h.execute(bogus),
        Err(TimelockError::InvalidSelfCall(_))
    ));
}

#[test]
fn self_call_with_value_fails() {
    let h = Harness::new();
    let mut update = SelfCall::UpdateDelay {
        new_delay: MINIMUM_DELAY,
    }
    .to_call(&gate_id())
    .unwrap();
    update.value = 1;
    h.schedule(update.clone());
    h.wait();
    assert!(matches!(
        h.execute(update),
        Err(TimelockError::InvalidSelfCall(_))
    ));
}

#[test]
fn events_reach_sinks_only_after_commit() {
    let h = Harness::new();
    let trail = Arc::clone(&h.trail);
    h.invoker.on_call(p("observer"), move |_, _| {
        // Call 0 has been dispatched, but the execution is still open.
        if trail.events().iter().any(|e| e.kind() == "executed") {
            return Err(InvocationError::new("event delivered early"));
        }
        Ok(())
    });
    let targets = vec![p("first"), p("observer")];
    h.gate
        .schedule_batch(
            &proposer(),
            targets.clone(),
            vec![0, 0],
            vec![vec![], vec![]],
            None,
            salt(),
            MINIMUM_DELAY,
            "",
        )
        .unwrap();
    h.wait();
    h.gate
        .execute_batch(&executor(), targets, vec![0, 0], vec![vec![], vec![]], None, salt())
        .unwrap();
    assert_eq!(
        h.event_kinds(),
        vec!["scheduled", "scheduled", "executed", "executed"]
    );
}

/// Schedules a follow-up operation the first time it sees `trigger` scheduled.
struct FollowUp {
    gate: OnceLock<Weak<Timelock>>,
    trigger: OperationId,
    follow_up: Call,
    fired: AtomicBool,
}

impl EventSink for FollowUp {
    fn publish(&self, event: &TimelockEvent) {
        let TimelockEvent::Scheduled { id, .. } = event else {
            return;
        };
        if *id != self.trigger || self.fired.swap(true, Ordering::SeqCst) {
            return;
        }
        let gate = self.gate.get().and_then(Weak::upgrade).unwrap();
        gate.schedule(&proposer(), self.follow_up.clone(), None, salt(), MINIMUM_DELAY, "follow-up")
            .unwrap();
    }
}

#[test]
fn sink_callbacks_are_delivered_in_commit_order() {
    let first = call("treasury", b"first");
    let second = call("treasury", b"second");
    let trigger = timelock_core::hash_operation(&first.target, 0, &first.payload, None, salt()).unwrap();
    let follow_up_id =
        timelock_core::hash_operation(&second.target, 0, &second.payload, None, salt()).unwrap();

    let follower = Arc::new(FollowUp {
        gate: OnceLock::new(),
        trigger,
        follow_up: second,
        fired: AtomicBool::new(false),
    });
    let trail = Arc::new(AuditTrail::default());
    let gate = Arc::new(
        TimelockBuilder::new(config())
            .with_sink(follower.clone())
            .with_sink(trail.clone())
            .build()
            .unwrap(),
    );
    follower.gate.set(Arc::downgrade(&gate)).unwrap();

    gate.schedule(&proposer(), first, None, salt(), MINIMUM_DELAY, "")
        .unwrap();

    // Both schedules are delivered before the outer call returns, in order.
    let ids: Vec<_> = trail.events().iter().filter_map(|e| e.operation_id()).collect();
    assert_eq!(ids, vec![trigger, follow_up_id]);
    assert!(gate.is_pending(&follow_up_id));
}
