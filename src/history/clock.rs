//! Timestamps for history rows.
//!
//! Wall clocks repeat values (coarse resolution) and can step backwards, so
//! message timestamps come from [`MonotonicClock`], which never hands out the
//! same value twice.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;

pub trait TimeSource: Send + Sync {
    /// Current time in microseconds since the Unix epoch.
    fn now_micros(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_micros(&self) -> i64 {
        Utc::now().timestamp_micros()
    }
}

pub struct MonotonicClock {
    source: Arc<dyn TimeSource>,
    last: AtomicI64,
}

impl MonotonicClock {
    pub fn new(source: Arc<dyn TimeSource>) -> Self {
        Self {
            source,
            last: AtomicI64::new(i64::MIN),
        }
    }

    pub fn system() -> Self {
        Self::new(Arc::new(SystemTimeSource))
    }

    /// Raises the floor so later timestamps sort after `timestamp`.
    pub fn observe(&self, timestamp: i64) {
        self.last.fetch_max(timestamp, Ordering::SeqCst);
    }

    /// Returns `max(now, last + 1)` and records it.
    pub fn next(&self) -> i64 {
        let now = self.source.now_micros();
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last.saturating_add(1)))
            })
            .unwrap_or_else(|last| last);
        now.max(previous.saturating_add(1))
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::system()
    }
}
