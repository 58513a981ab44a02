//! Clock abstractions used by cooldown buckets.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Clock abstraction so timing can be faked in tests.
///
/// `now` is a monotonic offset from an arbitrary origin; only differences between two
/// readings of the same clock are meaningful.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> Duration;
}

/// Monotonic clock backed by `Instant::now()`.
///
/// Notes: resets when the process restarts. Bucket state is in-memory only, so this is
/// never a problem for the buckets themselves.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    start: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self { start: Instant::now() }
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Hand-driven clock. Clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<Duration>>,
}

impl ManualClock {
    /// Create a clock reading zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("manual clock poisoned");
        *now = now.saturating_add(by);
    }

    /// Jump to an absolute reading. Going backwards is allowed but breaks monotonicity;
    /// only tests should do it.
    pub fn set(&self, to: Duration) {
        *self.now.lock().expect("manual clock poisoned") = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock().expect("manual clock poisoned")
    }
}
