//! # The Timelock Gate
//!
//! [`Timelock`] owns the operation registry and the minimum delay, and is the
//! only way to change either.
//!
//! ## Transactions
//!
//! Every mutating entry point runs as one transaction under a process-wide
//! re-entrant lock:
//!
//! 1. Lock (re-entrantly: a dispatched call may call back into the gate on the
//!    same thread).
//! 2. Checkpoint the ledger (registry, minimum delay, unsent events).
//! 3. Run the entry point.
//! 4. On error, restore the checkpoint. On success of the outermost
//!    transaction, deliver buffered events to the sinks.
//!
//! Nested transactions checkpoint too, so a failed re-entrant call inside a
//! successful execution leaves no trace, and a failed execution undoes every
//! re-entrant change made during its dispatch.
//!
//! ## Execution
//!
//! ```text
//! pre-check ──▶ begin ──▶ dispatch calls in order ──▶ post-check ──▶ DONE ──▶ commit
//!                              │ any failure                │ not ready
//!                              └────────────▶ rollback ◀────┘
//! ```
//!
//! The ledger is never borrowed across a dispatch. Any re-entrant call
//! observes the tentative state of the enclosing execution.

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use parking_lot::ReentrantMutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use timelock_arbitration::{Ruling, Verdict};
use timelock_core::{Call, Clock, Operation, OperationId, Principal, Salt, SystemClock, Timestamp};
use timelock_state::{DisputeStatus, OperationRegistry, OperationStatus, ReadyAt};

use crate::access::{AccessControl, Role, RoleRegistry};
use crate::config::{DelayBounds, TimelockConfig};
use crate::error::TimelockError;
use crate::event::{EventSink, TimelockEvent};
use crate::invoke::{Invoker, RecordingInvoker, SelfCall};

// ── Ledger ──────────────────────────────────────────────────────────────────

/// Serializable gate state: the registry and the minimum delay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Current minimum delay in seconds.
    pub min_delay: u64,
    /// Every known operation.
    pub operations: OperationRegistry,
}

#[derive(Debug, Clone)]
struct Ledger {
    registry: OperationRegistry,
    min_delay: u64,
    outbox: Vec<TimelockEvent>,
}

struct Shared {
    ledger: RefCell<Ledger>,
    depth: Cell<usize>,
    /// Non-zero while an executed self-call is being applied.
    self_calls: Cell<usize>,
    /// Set while committed events are being handed to the sinks.
    flushing: Cell<usize>,
}

/// Increments a counter for its lifetime, restoring it even by unwinding.
struct DepthGuard<'a>(&'a Cell<usize>);

impl<'a> DepthGuard<'a> {
    fn enter(depth: &'a Cell<usize>) -> Self {
        depth.set(depth.get() + 1);
        Self(depth)
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

// ── Timelock ────────────────────────────────────────────────────────────────

/// A timelock gate with veto and arbitration.
pub struct Timelock {
    identity: Principal,
    bounds: DelayBounds,
    clock: Arc<dyn Clock>,
    access: Arc<dyn AccessControl>,
    invoker: Arc<dyn Invoker>,
    sinks: Vec<Arc<dyn EventSink>>,
    shared: ReentrantMutex<Shared>,
}

impl std::fmt::Debug for Timelock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timelock")
            .field("identity", &self.identity)
            .field("bounds", &self.bounds)
            .field("min_delay", &self.min_delay())
            .field("sinks", &self.sinks.len())
            .finish_non_exhaustive()
    }
}

impl Timelock {
    /// Build a gate from configuration with default collaborators.
    pub fn new(config: TimelockConfig) -> Result<Self, TimelockError> {
        TimelockBuilder::new(config).build()
    }

    // ── Scheduling ──────────────────────────────────────────────────────

    /// Schedule a single call.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `AlreadyScheduled`, `InsufficientDelay`,
    /// `TimestampOverflow`, `InvalidTimestamp`.
    pub fn schedule(
        &self,
        proposer: &Principal,
        call: Call,
        predecessor: Option<OperationId>,
        salt: Salt,
        delay: u64,
        description: &str,
    ) -> Result<OperationId, TimelockError> {
        let operation = Operation::single(call, predecessor, salt);
        self.schedule_operation(proposer, &operation, delay, description)
    }

    /// Schedule a batch given as parallel arrays.
    ///
    /// # Errors
    ///
    /// As [`Timelock::schedule`], plus `LengthMismatch`.
    #[allow(clippy::too_many_arguments)]
    pub fn schedule_batch(
        &self,
        proposer: &Principal,
        targets: Vec<Principal>,
        values: Vec<u128>,
        payloads: Vec<Vec<u8>>,
        predecessor: Option<OperationId>,
        salt: Salt,
        delay: u64,
        description: &str,
    ) -> Result<OperationId, TimelockError> {
        self.access.require_role(Role::Proposer, proposer)?;
        let operation = Operation::batch(targets, values, payloads, predecessor, salt)?;
        self.schedule_operation(proposer, &operation, delay, description)
    }

    /// Schedule an assembled operation.
    pub fn schedule_operation(
        &self,
        proposer: &Principal,
        operation: &Operation,
        delay: u64,
        description: &str,
    ) -> Result<OperationId, TimelockError> {
        let id = operation.id()?;
        let ready_at = self.transact(|| {
            self.access.require_role(Role::Proposer, proposer)?;
            let now = self.clock.now();
            self.write(|ledger| -> Result<ReadyAt, TimelockError> {
                if ledger.registry.exists(&id) {
                    return Err(TimelockError::AlreadyScheduled { id });
                }
                if delay < ledger.min_delay {
                    return Err(TimelockError::InsufficientDelay {
                        delay,
                        min_delay: ledger.min_delay,
                    });
                }
                let ready_at = ledger.registry.insert_scheduled(id, now, delay)?;
                for (index, call) in operation.calls.iter().enumerate() {
                    ledger.outbox.push(TimelockEvent::Scheduled {
                        id,
                        index,
                        call: call.clone(),
                        predecessor: operation.dependency(),
                        ready_at,
                        proposer: proposer.clone(),
                        description: description.to_string(),
                    });
                }
                Ok(ready_at)
            })
        })?;
        info!(%id, %proposer, calls = operation.len(), delay, %ready_at, "operation scheduled");
        metrics::counter!("timelock_operations_scheduled_total").increment(1);
        Ok(id)
    }

    /// Remove a pending operation.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `NotPending`.
    pub fn cancel(
        &self,
        canceller: &Principal,
        id: &OperationId,
        reasoning: &str,
    ) -> Result<(), TimelockError> {
        self.transact(|| {
            self.access.require_role(Role::Cancellor, canceller)?;
            self.write(|ledger| -> Result<(), TimelockError> {
                ledger.registry.remove_pending(id)?;
                ledger.outbox.push(TimelockEvent::Cancelled {
                    id: *id,
                    canceller: canceller.clone(),
                    reasoning: reasoning.to_string(),
                });
                Ok(())
            })
        })?;
        info!(%id, %canceller, reasoning, "operation cancelled");
        metrics::counter!("timelock_operations_cancelled_total").increment(1);
        Ok(())
    }

    /// Change the minimum delay. Succeeds only for the gate's own identity
    /// while an executed [`SelfCall::UpdateDelay`] is being applied, so the
    /// change always passes through schedule and execute.
    ///
    /// # Errors
    ///
    /// `NotSelf`, `DelayOutOfBounds`.
    pub fn update_min_delay(&self, caller: &Principal, new_delay: u64) -> Result<(), TimelockError> {
        let old = self.transact(|| {
            if caller != &self.identity || !self.applying_self_call() {
                return Err(TimelockError::NotSelf {
                    caller: caller.clone(),
                });
            }
            self.bounds.check(new_delay)?;
            Ok(self.write(|ledger| {
                let old = ledger.min_delay;
                ledger.min_delay = new_delay;
                ledger.outbox.push(TimelockEvent::MinDelayChanged {
                    old,
                    new: new_delay,
                });
                old
            }))
        })?;
        info!(old, new = new_delay, "minimum delay changed");
        Ok(())
    }

    // ── Disputes ────────────────────────────────────────────────────────

    /// File a veto against a pending operation. Blocks execution until the
    /// arbiter rules.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `NotPending`, `AlreadyDisputedOrTerminal`.
    pub fn dispute(&self, vetoer: &Principal, id: &OperationId) -> Result<(), TimelockError> {
        self.transact(|| {
            self.access.require_role(Role::Veto, vetoer)?;
            self.write(|ledger| -> Result<(), TimelockError> {
                timelock_arbitration::open_dispute(&mut ledger.registry, id)?;
                ledger.outbox.push(TimelockEvent::Disputed {
                    id: *id,
                    vetoer: vetoer.clone(),
                });
                Ok(())
            })
        })?;
        info!(%id, %vetoer, "operation disputed");
        metrics::counter!("timelock_operations_disputed_total").increment(1);
        Ok(())
    }

    /// Rule on an open dispute. An accepted veto deletes the operation; a
    /// rejected one lets it proceed and bars further disputes.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `NotDisputed`.
    pub fn resolve_dispute(
        &self,
        arbiter: &Principal,
        id: &OperationId,
        ruling: Ruling,
        reasoning: &str,
    ) -> Result<Verdict, TimelockError> {
        let verdict = self.transact(|| {
            self.access.require_role(Role::Arbiter, arbiter)?;
            self.write(|ledger| -> Result<Verdict, TimelockError> {
                let verdict = timelock_arbitration::resolve_dispute(&mut ledger.registry, id, ruling)?;
                let event = match verdict {
                    Verdict::Cancelled(_) => TimelockEvent::Cancelled {
                        id: *id,
                        canceller: arbiter.clone(),
                        reasoning: reasoning.to_string(),
                    },
                    Verdict::Cleared(_) => TimelockEvent::Rejected {
                        id: *id,
                        arbiter: arbiter.clone(),
                        reasoning: reasoning.to_string(),
                    },
                };
                ledger.outbox.push(event);
                Ok(verdict)
            })
        })?;
        info!(%id, %arbiter, %ruling, reasoning, "dispute resolved");
        Ok(verdict)
    }

    // ── Execution ───────────────────────────────────────────────────────

    /// Execute a ready single-call operation.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `Disputed`, `NotReady`, `MissingDependency`,
    /// `InvocationFailed` (or a self-call's own error).
    pub fn execute(
        &self,
        executor: &Principal,
        call: Call,
        predecessor: Option<OperationId>,
        salt: Salt,
    ) -> Result<OperationId, TimelockError> {
        let operation = Operation::single(call, predecessor, salt);
        self.execute_operation(executor, &operation)
    }

    /// Execute a ready batch given as parallel arrays.
    ///
    /// # Errors
    ///
    /// As [`Timelock::execute`], plus `LengthMismatch`.
    pub fn execute_batch(
        &self,
        executor: &Principal,
        targets: Vec<Principal>,
        values: Vec<u128>,
        payloads: Vec<Vec<u8>>,
        predecessor: Option<OperationId>,
        salt: Salt,
    ) -> Result<OperationId, TimelockError> {
        self.access.require_role(Role::Executor, executor)?;
        let operation = Operation::batch(targets, values, payloads, predecessor, salt)?;
        self.execute_operation(executor, &operation)
    }

    /// Execute an assembled operation atomically.
    pub fn execute_operation(
        &self,
        executor: &Principal,
        operation: &Operation,
    ) -> Result<OperationId, TimelockError> {
        let id = operation.id()?;
        let outcome = self.transact(|| {
            self.access.require_role(Role::Executor, executor)?;
            self.before_call(&id, operation.dependency())?;
            self.invoker.begin();
            let dispatched = self
                .dispatch(&id, operation, executor)
                .and_then(|()| self.after_call(&id));
            match dispatched {
                Ok(()) => {
                    self.invoker.commit();
                    Ok(())
                }
                Err(err) => {
                    self.invoker.rollback();
                    Err(err)
                }
            }
        });
        match outcome {
            Ok(()) => {
                info!(%id, %executor, calls = operation.len(), "operation executed");
                metrics::counter!("timelock_executions_total", "outcome" => "done").increment(1);
                Ok(id)
            }
            Err(err) => {
                warn!(%id, %executor, error = %err, "execution rejected, state rolled back");
                metrics::counter!("timelock_executions_total", "outcome" => "rolled_back")
                    .increment(1);
                Err(err)
            }
        }
    }

    fn before_call(
        &self,
        id: &OperationId,
        predecessor: Option<OperationId>,
    ) -> Result<(), TimelockError> {
        let now = self.clock.now();
        self.read(|ledger| {
            let entry = ledger.registry.entry(id);
            if entry.ready_at.is_pending() && entry.dispute.blocks_execution() {
                return Err(TimelockError::Disputed { id: *id });
            }
            if !entry.ready_at.is_ready(now) {
                return Err(TimelockError::NotReady {
                    id: *id,
                    ready_at: entry.ready_at,
                });
            }
            match predecessor {
                Some(predecessor) if !ledger.registry.is_done(&predecessor) => {
                    Err(TimelockError::MissingDependency {
                        id: *id,
                        predecessor,
                    })
                }
                _ => Ok(()),
            }
        })
    }

    fn dispatch(
        &self,
        id: &OperationId,
        operation: &Operation,
        executor: &Principal,
    ) -> Result<(), TimelockError> {
        for (index, call) in operation.calls.iter().enumerate() {
            debug!(%id, index, target = %call.target, value = %call.value, "dispatching call");
            if call.target == self.identity {
                self.apply_self_call(call)?;
            } else {
                self.invoker
                    .invoke(self, call)
                    .map_err(|e| TimelockError::InvocationFailed {
                        id: *id,
                        index,
                        target: call.target.clone(),
                        reason: e.reason,
                    })?;
            }
            self.write(|ledger| {
                ledger.outbox.push(TimelockEvent::Executed {
                    id: *id,
                    index,
                    call: call.clone(),
                    executor: executor.clone(),
                })
            });
        }
        Ok(())
    }

    /// The operation must still be ready (and undisputed) after dispatch: a
    /// re-entrant call may have cancelled, disputed or executed it.
    fn after_call(&self, id: &OperationId) -> Result<(), TimelockError> {
        let now = self.clock.now();
        self.write(|ledger| -> Result<(), TimelockError> {
            let entry = ledger.registry.entry(id);
            if entry.ready_at.is_pending() && entry.dispute.blocks_execution() {
                return Err(TimelockError::Disputed { id: *id });
            }
            ledger.registry.mark_done(id, now)?;
            Ok(())
        })
    }

    fn apply_self_call(&self, call: &Call) -> Result<(), TimelockError> {
        if call.value != 0 {
            return Err(TimelockError::InvalidSelfCall(format!(
                "self-calls carry no value, got {}",
                call.value
            )));
        }
        let self_call = SelfCall::decode(&call.payload)?;
        let shared = self.shared.lock();
        let _applying = DepthGuard::enter(&shared.self_calls);
        match self_call {
            SelfCall::UpdateDelay { new_delay } => self.update_min_delay(&self.identity, new_delay),
        }
    }

    fn applying_self_call(&self) -> bool {
        self.shared.lock().self_calls.get() > 0
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// The gate's own principal.
    pub fn identity(&self) -> &Principal {
        &self.identity
    }

    pub fn delay_bounds(&self) -> DelayBounds {
        self.bounds
    }

    /// Current minimum delay in seconds.
    pub fn min_delay(&self) -> u64 {
        self.read(|ledger| ledger.min_delay)
    }

    /// The gate's notion of "now".
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Whether an operation with this id exists (pending or done).
    pub fn is_operation(&self, id: &OperationId) -> bool {
        self.read(|ledger| ledger.registry.exists(id))
    }

    pub fn is_pending(&self, id: &OperationId) -> bool {
        self.read(|ledger| ledger.registry.is_pending(id))
    }

    /// Pending and past its ready time. Disputes are not considered.
    pub fn is_ready(&self, id: &OperationId) -> bool {
        let now = self.clock.now();
        self.read(|ledger| ledger.registry.is_ready(id, now))
    }

    pub fn is_done(&self, id: &OperationId) -> bool {
        self.read(|ledger| ledger.registry.is_done(id))
    }

    /// Raw readiness, sentinels included.
    pub fn ready_at(&self, id: &OperationId) -> ReadyAt {
        self.read(|ledger| ledger.registry.ready_at(id))
    }

    pub fn dispute_status_of(&self, id: &OperationId) -> DisputeStatus {
        self.read(|ledger| ledger.registry.dispute_status(id))
    }

    /// Lifecycle position of `id` at the current time.
    pub fn status(&self, id: &OperationId) -> OperationStatus {
        let now = self.clock.now();
        self.read(|ledger| ledger.registry.entry(id).status(now))
    }

    /// Ids of all pending operations, in id order.
    pub fn pending_operations(&self) -> Vec<OperationId> {
        self.read(|ledger| ledger.registry.pending_ids())
    }

    /// The id a single call would be scheduled under.
    pub fn hash_operation(
        &self,
        call: &Call,
        predecessor: Option<OperationId>,
        salt: Salt,
    ) -> Result<OperationId, TimelockError> {
        Ok(timelock_core::hash_operation(
            &call.target,
            call.value,
            &call.payload,
            predecessor,
            salt,
        )?)
    }

    /// The id a batch would be scheduled under.
    pub fn hash_operation_batch(
        &self,
        targets: &[Principal],
        values: &[u128],
        payloads: &[Vec<u8>],
        predecessor: Option<OperationId>,
        salt: Salt,
    ) -> Result<OperationId, TimelockError> {
        Ok(timelock_core::hash_operation_batch(
            targets,
            values,
            payloads,
            predecessor,
            salt,
        )?)
    }

    /// A copy of the current ledger.
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.read(|ledger| LedgerSnapshot {
            min_delay: ledger.min_delay,
            operations: ledger.registry.clone(),
        })
    }

    // ── Transactions ────────────────────────────────────────────────────

    fn transact<R>(
        &self,
        body: impl FnOnce() -> Result<R, TimelockError>,
    ) -> Result<R, TimelockError> {
        let shared = self.shared.lock();
        let checkpoint = shared.ledger.borrow().clone();
        let outcome = {
            let _depth = DepthGuard::enter(&shared.depth);
            body()
        };
        match outcome {
            Ok(value) => {
                if shared.depth.get() == 0 && shared.flushing.get() == 0 {
                    self.flush(&shared);
                }
                Ok(value)
            }
            Err(err) => {
                *shared.ledger.borrow_mut() = checkpoint;
                debug!(error = %err, depth = shared.depth.get(), "transaction rolled back");
                Err(err)
            }
        }
    }

    /// Deliver the outbox. A sink may call back into the gate; events
    /// committed that way are queued behind the current batch and delivered
    /// by the same loop, so every sink sees commit order.
    fn flush(&self, shared: &Shared) {
        let _flushing = DepthGuard::enter(&shared.flushing);
        loop {
            let events = std::mem::take(&mut shared.ledger.borrow_mut().outbox);
            if events.is_empty() {
                break;
            }
            for event in &events {
                for sink in &self.sinks {
                    sink.publish(event);
                }
            }
        }
    }

    fn read<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        let shared = self.shared.lock();
        let ledger = shared.ledger.borrow();
        f(&ledger)
    }

    fn write<R>(&self, f: impl FnOnce(&mut Ledger) -> R) -> R {
        let shared = self.shared.lock();
        let mut ledger = shared.ledger.borrow_mut();
        f(&mut ledger)
    }
}

// ── Builder ─────────────────────────────────────────────────────────────────

/// Assembles a [`Timelock`] with its collaborators.
///
/// Defaults: [`SystemClock`], a [`RoleRegistry`] seeded from the
/// configuration, a [`RecordingInvoker`], and no sinks.
pub struct TimelockBuilder {
    config: TimelockConfig,
    clock: Option<Arc<dyn Clock>>,
    access: Option<Arc<dyn AccessControl>>,
    invoker: Option<Arc<dyn Invoker>>,
    sinks: Vec<Arc<dyn EventSink>>,
    snapshot: Option<LedgerSnapshot>,
}

impl TimelockBuilder {
    pub fn new(config: TimelockConfig) -> Self {
        Self {
            config,
            clock: None,
            access: None,
            invoker: None,
            sinks: Vec::new(),
            snapshot: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_access_control(mut self, access: Arc<dyn AccessControl>) -> Self {
        self.access = Some(access);
        self
    }

    pub fn with_invoker(mut self, invoker: Arc<dyn Invoker>) -> Self {
        self.invoker = Some(invoker);
        self
    }

    /// Add a sink. Sinks receive events in the order they were added.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Start from a saved ledger instead of an empty registry and the
    /// configured minimum delay.
    pub fn with_snapshot(mut self, snapshot: LedgerSnapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    /// Validate the configuration and build the gate.
    ///
    /// # Errors
    ///
    /// `Config` or `DelayOutOfBounds` if the configuration is inconsistent or
    /// the snapshot's minimum delay lies outside the bounds.
    pub fn build(self) -> Result<Timelock, TimelockError> {
        let config = self.config;
        config.validate()?;
        let (registry, min_delay) = match self.snapshot {
            Some(snapshot) => {
                config.delay_bounds.check(snapshot.min_delay)?;
                (snapshot.operations, snapshot.min_delay)
            }
            None => (OperationRegistry::new(), config.min_delay),
        };
        let access: Arc<dyn AccessControl> = match self.access {
            Some(access) => access,
            None => Arc::new(RoleRegistry::bootstrap(&config.identity, &config.roles)),
        };
        let invoker: Arc<dyn Invoker> = match self.invoker {
            Some(invoker) => invoker,
            None => Arc::new(RecordingInvoker::new()),
        };
        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };

        info!(
            identity = %config.identity,
            min_delay,
            operations = registry.len(),
            "timelock initialised"
        );
        Ok(Timelock {
            identity: config.identity,
            bounds: config.delay_bounds,
            clock,
            access,
            invoker,
            sinks: self.sinks,
            shared: ReentrantMutex::new(Shared {
                ledger: RefCell::new(Ledger {
                    registry,
                    min_delay,
                    outbox: Vec::new(),
                }),
                depth: Cell::new(0),
                self_calls: Cell::new(0),
                flushing: Cell::new(0),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timelock_core::{ManualClock, SECONDS_PER_DAY};

    use crate::config::MINIMUM_DELAY;

    fn p(name: &str) -> Principal {
        Principal::new(name).unwrap()
    }

    fn gate() -> (Timelock, Arc<ManualClock>) {
        let mut config = TimelockConfig::new(p("gate"), MINIMUM_DELAY);
        config.roles.proposers.push(p("alice"));
        config.roles.executors.push(p("alice"));
        let clock = Arc::new(ManualClock::new(Timestamp::from_secs(1_000)));
        let tl = TimelockBuilder::new(config)
            .with_clock(clock.clone())
            .build()
            .unwrap();
        (tl, clock)
    }

    #[test]
    fn failed_transaction_restores_ledger() {
        let (tl, _) = gate();
        let before = tl.snapshot();
        let err = tl
            .transact(|| -> Result<(), TimelockError> {
                tl.write(|ledger| ledger.min_delay = 5);
                Err(TimelockError::Config("boom".into()))
            })
            .unwrap_err();
        assert!(matches!(err, TimelockError::Config(_)));
        assert_eq!(tl.snapshot(), before);
    }

    #[test]
    fn nested_failure_only_undoes_inner_changes() {
        let (tl, _) = gate();
        tl.transact(|| -> Result<(), TimelockError> {
            tl.write(|ledger| ledger.min_delay = 7);
            let _ = tl.transact(|| -> Result<(), TimelockError> {
                tl.write(|ledger| ledger.min_delay = 9);
                Err(TimelockError::Config("inner".into()))
            });
            assert_eq!(tl.min_delay(), 7);
            Ok(())
        })
        .unwrap();
        assert_eq!(tl.min_delay(), 7);
    }

    #[test]
    fn delay_update_requires_self() {
        let (tl, _) = gate();
        let err = tl.update_min_delay(&p("alice"), 3 * SECONDS_PER_DAY).unwrap_err();
        assert!(matches!(err, TimelockError::NotSelf { .. }));
        assert!(err.is_unauthorized());
        let err = tl.update_min_delay(&p("gate"), 3 * SECONDS_PER_DAY).unwrap_err();
        assert!(matches!(err, TimelockError::NotSelf { .. }));
        assert_eq!(tl.min_delay(), MINIMUM_DELAY);
    }

    #[test]
    fn snapshot_min_delay_is_bounds_checked() {
        let config = TimelockConfig::new(p("gate"), MINIMUM_DELAY);
        let snapshot = LedgerSnapshot {
            min_delay: 1,
            operations: OperationRegistry::new(),
        };
        let err = TimelockBuilder::new(config)
            .with_snapshot(snapshot)
            .build()
            .unwrap_err();
        assert!(matches!(err, TimelockError::DelayOutOfBounds { delay: 1, .. }));
    }

    #[test]
    fn schedule_then_ready_at_deadline() {
        let (tl, clock) = gate();
        let call = Call::new(p("treasury"), 0, b"pay".to_vec());
        let id = tl
            .schedule(&p("alice"), call, None, Salt::ZERO, MINIMUM_DELAY, "")
            .unwrap();
        assert!(tl.is_pending(&id));
        clock.advance(MINIMUM_DELAY - 1);
        assert!(!tl.is_ready(&id));
        clock.advance(1);
        assert!(tl.is_ready(&id));
        assert!(matches!(tl.status(&id), OperationStatus::Ready { .. }));
    }
}
