use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Milliseconds on a session's monotonic clock.
/// Zero is the moment the clock was created, not the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Millis(pub u64);

impl Millis {
    pub const ZERO: Millis = Millis(0);

    pub fn from_secs(secs: u64) -> Self {
        Millis(secs.saturating_mul(1000))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Elapsed time since `earlier`. Saturates at zero.
    pub fn since(&self, earlier: Millis) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    pub fn saturating_sub(&self, ms: u64) -> Millis {
        Millis(self.0.saturating_sub(ms))
    }

    pub fn plus(&self, ms: u64) -> Millis {
        Millis(self.0.saturating_add(ms))
    }
}

/// One clock per session. Window pruning and cooldown expiry both read it,
/// so they never disagree about ordering.
pub trait Clock: Send + Sync {
    fn now(&self) -> Millis;
}

/// Production clock anchored on `tokio::time::Instant`.
/// Follows tokio's paused time in tests.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    anchor: tokio::time::Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            anchor: tokio::time::Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Millis {
        Millis(self.anchor.elapsed().as_millis() as u64)
    }
}

/// Hand-driven clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(at: Millis) -> Self {
        let clock = Self::new();
        clock.set(at);
        clock
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    /// Never moves backwards.
    pub fn set(&self, at: Millis) {
        self.now_ms.fetch_max(at.0, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Millis {
        Millis(self.now_ms.load(Ordering::SeqCst))
    }
}
