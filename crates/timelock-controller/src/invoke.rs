//! # Call Dispatch
//!
//! The gate hands every non-self sub-call to an [`Invoker`]. Each execution
//! is bracketed by [`Invoker::begin`] and exactly one of [`Invoker::commit`]
//! or [`Invoker::rollback`]. Brackets nest when a dispatched call re-enters
//! the gate and executes another operation.
//!
//! Calls addressed to the gate's own identity never reach the invoker. Their
//! payload is decoded as a [`SelfCall`] and applied with the gate as caller.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use timelock_core::{Call, Principal};

use crate::error::TimelockError;
use crate::timelock::Timelock;

// ── Invoker ─────────────────────────────────────────────────────────────────

/// Failure reported by an invoker for one call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct InvocationError {
    /// Human-readable reason, surfaced in `TimelockError::InvocationFailed`.
    pub reason: String,
}

impl InvocationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl From<TimelockError> for InvocationError {
    fn from(err: TimelockError) -> Self {
        Self::new(err.to_string())
    }
}

/// Performs the side effects of dispatched calls.
///
/// `invoke` receives the gate so a call may re-enter it on the same thread.
pub trait Invoker: Send + Sync {
    /// Perform one call.
    fn invoke(&self, gate: &Timelock, call: &Call) -> Result<(), InvocationError>;

    /// An execution is starting.
    fn begin(&self) {}

    /// The innermost open execution succeeded.
    fn commit(&self) {}

    /// The innermost open execution failed; discard its effects.
    fn rollback(&self) {}
}

// ── Self-Calls ──────────────────────────────────────────────────────────────

/// Configuration changes the gate applies to itself when executing a call
/// addressed to its own identity. Encoded as JSON in the call payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum SelfCall {
    /// Replace the minimum delay.
    UpdateDelay {
        /// New minimum delay in seconds.
        new_delay: u64,
    },
}

impl SelfCall {
    /// Encode as a call payload.
    pub fn encode(&self) -> Result<Vec<u8>, TimelockError> {
        serde_json::to_vec(self).map_err(|e| TimelockError::InvalidSelfCall(e.to_string()))
    }

    /// Decode a call payload.
    pub fn decode(payload: &[u8]) -> Result<Self, TimelockError> {
        serde_json::from_slice(payload).map_err(|e| TimelockError::InvalidSelfCall(e.to_string()))
    }

    /// A zero-value call carrying this self-call, addressed to `gate`.
    pub fn to_call(&self, gate: &Principal) -> Result<Call, TimelockError> {
        Ok(Call::new(gate.clone(), 0, self.encode()?))
    }
}

// ── RecordingInvoker ────────────────────────────────────────────────────────

/// Target-specific behaviour run when a call to that target is dispatched.
pub type CallHook = Arc<dyn Fn(&Timelock, &Call) -> Result<(), InvocationError> + Send + Sync>;

/// An invoker that journals calls instead of performing them.
///
/// Calls dispatched inside an execution land in that execution's frame and
/// reach [`RecordingInvoker::calls`] only when the outermost execution
/// commits. Targets can be set to fail, and hooks can re-enter the gate.
#[derive(Default)]
pub struct RecordingInvoker {
    committed: Mutex<Vec<Call>>,
    frames: Mutex<Vec<Vec<Call>>>,
    failing: RwLock<BTreeSet<Principal>>,
    hooks: RwLock<HashMap<Principal, CallHook>>,
}

impl RecordingInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls from committed executions, in dispatch order.
    pub fn calls(&self) -> Vec<Call> {
        self.committed.lock().clone()
    }

    /// Number of executions currently open.
    pub fn depth(&self) -> usize {
        self.frames.lock().len()
    }

    /// Make every call to `target` fail.
    pub fn fail_target(&self, target: Principal) {
        self.failing.write().insert(target);
    }

    /// Stop failing calls to `target`.
    pub fn clear_failure(&self, target: &Principal) {
        self.failing.write().remove(target);
    }

    /// Run `hook` whenever a call to `target` is dispatched.
    pub fn on_call(
        &self,
        target: Principal,
        hook: impl Fn(&Timelock, &Call) -> Result<(), InvocationError> + Send + Sync + 'static,
    ) {
        self.hooks.write().insert(target, Arc::new(hook));
    }
}

impl std::fmt::Debug for RecordingInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingInvoker")
            .field("committed", &self.committed.lock().len())
            .field("depth", &self.depth())
            .field("failing", &*self.failing.read())
            .field("hooks", &self.hooks.read().len())
            .finish()
    }
}

impl Invoker for RecordingInvoker {
    fn invoke(&self, gate: &Timelock, call: &Call) -> Result<(), InvocationError> {
        if self.failing.read().contains(&call.target) {
            return Err(InvocationError::new(format!(
                "call to {} reverted",
                call.target
            )));
        }
        // Clone the hook out: it may re-enter the gate and dispatch again.
        let hook = self.hooks.read().get(&call.target).cloned();
        if let Some(hook) = hook {
            hook(gate, call)?;
        }
        match self.frames.lock().last_mut() {
            Some(frame) => frame.push(call.clone()),
            None => self.committed.lock().push(call.clone()),
        }
        Ok(())
    }

    fn begin(&self) {
        self.frames.lock().push(Vec::new());
    }

    fn commit(&self) {
        let mut frames = self.frames.lock();
        let Some(frame) = frames.pop() else {
            return;
        };
        match frames.last_mut() {
            Some(parent) => parent.extend(frame),
            None => self.committed.lock().extend(frame),
        }
    }

    fn rollback(&self) {
        self.frames.lock().pop();
    }
}
