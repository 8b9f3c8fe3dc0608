//! # Timestamps and Clocks
//!
//! Readiness is decided at second granularity against UNIX time, so
//! [`Timestamp`] is a plain `u64` of seconds since the epoch. Arithmetic is
//! checked: a schedule whose ready time would overflow must fail, never wrap.
//!
//! The gate never reads the system clock directly. It asks a [`Clock`], which
//! is [`SystemClock`] in production and [`ManualClock`] in tests and in the
//! CLI's `--now` mode.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Seconds in one day.
pub const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// UNIX time in whole seconds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Wrap a number of seconds since the epoch.
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Truncate a `DateTime<Utc>` to whole seconds. Instants before the epoch
    /// clamp to zero.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(u64::try_from(dt.timestamp()).unwrap_or(0))
    }

    /// Seconds since the epoch.
    pub const fn secs(&self) -> u64 {
        self.0
    }

    /// `self + delay`, or `None` on overflow.
    pub fn checked_add(self, delay_secs: u64) -> Option<Self> {
        self.0.checked_add(delay_secs).map(Self)
    }

    /// Render as ISO 8601 with a `Z` suffix, falling back to the raw number
    /// for values chrono cannot represent.
    pub fn to_iso8601(&self) -> String {
        i64::try_from(self.0)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
            .unwrap_or_else(|| self.0.to_string())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_utc(Utc::now())
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    secs: AtomicU64,
}

impl ManualClock {
    /// Start the clock at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            secs: AtomicU64::new(start.secs()),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, to: Timestamp) {
        self.secs.store(to.secs(), Ordering::SeqCst);
    }

    /// Move forward by `secs`, saturating at `u64::MAX`.
    pub fn advance(&self, secs: u64) {
        let _ = self
            .secs
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |s| Some(s.saturating_add(secs)));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.secs.load(Ordering::SeqCst))
    }
}
