//! Shared fixture: a gate with a manual clock, a recording invoker, an
//! in-memory role registry and an audit trail.

#![allow(dead_code)]

use std::sync::Arc;

use timelock_controller::{
    AuditTrail, Call, OperationId, Principal, RecordingInvoker, RoleAssignments, RoleRegistry,
    Salt, Timelock, TimelockBuilder, TimelockConfig, TimelockEvent, Timestamp, MINIMUM_DELAY,
};
use timelock_core::ManualClock;

pub const T0: u64 = 1_700_000_000;

pub fn p(name: &str) -> Principal {
    Principal::new(name).unwrap()
}

pub fn gate_id() -> Principal {
    p("timelock")
}
pub fn proposer() -> Principal {
    p("council")
}
pub fn executor() -> Principal {
    p("keeper")
}
pub fn vetoer() -> Principal {
    p("guardian")
}
pub fn arbiter() -> Principal {
    p("supreme-court")
}
pub fn cancellor() -> Principal {
    p("chancellor")
}

/// The salt used by the original deployment tests.
pub fn salt() -> Salt {
    Salt::from_hex("0xc1059ed2dc130227aa1d1d539ac94c641306905c020436c636e19e3fab56fc7f").unwrap()
}

pub fn call(target: &str, payload: &[u8]) -> Call {
    Call::new(p(target), 0, payload.to_vec())
}

pub struct Harness {
    pub gate: Timelock,
    pub clock: Arc<ManualClock>,
    pub invoker: Arc<RecordingInvoker>,
    pub roles: Arc<RoleRegistry>,
    pub trail: Arc<AuditTrail>,
}

/// Gate configuration with one principal per role.
pub fn config() -> TimelockConfig {
    let mut config = TimelockConfig::new(gate_id(), MINIMUM_DELAY);
    config.roles = RoleAssignments {
        proposers: vec![proposer()],
        executors: vec![executor()],
        vetoers: vec![vetoer()],
        arbiters: vec![arbiter()],
        cancellors: vec![cancellor()],
        ..RoleAssignments::default()
    };
    config
}

impl Harness {
    pub fn new() -> Self {
        let config = config();
        let clock = Arc::new(ManualClock::new(Timestamp::from_secs(T0)));
        let invoker = Arc::new(RecordingInvoker::new());
        let roles = Arc::new(RoleRegistry::bootstrap(&config.identity, &config.roles));
        let trail = Arc::new(AuditTrail::default());
        let gate = TimelockBuilder::new(config)
            .with_clock(clock.clone())
            .with_invoker(invoker.clone())
            .with_access_control(roles.clone())
            .with_sink(trail.clone())
            .build()
            .unwrap();
        Self {
            gate,
            clock,
            invoker,
            roles,
            trail,
        }
    }

    /// Schedule `call` with the minimum delay and the fixture salt.
    pub fn schedule(&self, call: Call) -> OperationId {
        self.gate
            .schedule(&proposer(), call, None, salt(), MINIMUM_DELAY, "")
            .unwrap()
    }

    /// Advance the clock past the minimum delay.
    pub fn wait(&self) {
        self.clock.advance(MINIMUM_DELAY);
    }

    pub fn execute(&self, call: Call) -> Result<OperationId, timelock_controller::TimelockError> {
        self.gate.execute(&executor(), call, None, salt())
    }

    pub fn events(&self) -> Vec<TimelockEvent> {
        self.trail.events()
    }

    pub fn event_kinds(&self) -> Vec<&'static str> {
        self.trail.events().iter().map(|e| e.kind()).collect()
    }
}
