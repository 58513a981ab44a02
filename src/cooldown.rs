//! Per-key sliding-window cooldown buckets.
//!
//! Semantics:
//! - A bucket allows `max_uses` uses per key within any trailing `window`.
//! - Each key keeps the timestamps of its recent uses in chronological order. Timestamps
//!   whose window has fully elapsed are pruned lazily, on every call that touches the key.
//! - Keys nobody touches again are evicted by an amortized sweep: once the number of keys
//!   reaches twice the count left by the previous sweep, the next admission prunes them all.
//! - [`CooldownBucket::can_use`] is check-and-reserve: an admitted call records the use.
//! - [`CooldownBucket::remaining_wait`] never records anything and never changes what a
//!   later `can_use` decides.
//!
//! Invariants:
//! - Prune, check and record for a key happen under one lock; concurrent callers sharing a
//!   key can never be admitted past `max_uses`.
//! - The lock is released before returning; it is never held across an `.await`.
//! - A use recorded at `t` stops counting at `t + window` exactly, so `remaining_wait` is
//!   zero precisely when a call would be admitted.
//!
//! ```rust
//! use cmdguard::{CooldownBucket, ManualClock};
//! use std::time::Duration;
//!
//! let clock = ManualClock::new();
//! let bucket = CooldownBucket::new(Duration::from_secs(10), 2)
//!     .unwrap()
//!     .with_clock(clock.clone());
//!
//! assert!(bucket.can_use(&"u1"));
//! assert!(bucket.can_use(&"u1"));
//! assert!(!bucket.can_use(&"u1"));
//! assert_eq!(bucket.remaining_wait(&"u1"), Duration::from_secs(10));
//!
//! clock.advance(Duration::from_secs(10));
//! assert!(bucket.can_use(&"u1"));
//! ```

use crate::clock::{Clock, MonotonicClock};
use crate::error::ConfigurationError;
use crate::sleeper::Sleeper;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

/// Validated "N uses per window" configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "RawCooldownConfig", into = "RawCooldownConfig")
)]
pub struct CooldownConfig {
    window: Duration,
    max_uses: usize,
}

impl CooldownConfig {
    /// Create a config with validation.
    pub fn new(window: Duration, max_uses: usize) -> Result<Self, ConfigurationError> {
        if window.is_zero() {
            return Err(ConfigurationError::InvalidWindow(window));
        }
        if max_uses == 0 {
            return Err(ConfigurationError::InvalidMaxUses { provided: max_uses });
        }
        Ok(Self { window, max_uses })
    }

    /// Create a config from a window in (fractional) seconds.
    pub fn from_secs_f64(window_seconds: f64, max_uses: usize) -> Result<Self, ConfigurationError> {
        if !window_seconds.is_finite() || window_seconds <= 0.0 {
            return Err(ConfigurationError::InvalidWindowSeconds(window_seconds));
        }
        let window = Duration::try_from_secs_f64(window_seconds)
            .map_err(|_| ConfigurationError::InvalidWindowSeconds(window_seconds))?;
        Self::new(window, max_uses)
    }

    /// Trailing interval over which uses are counted.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Uses allowed per key within one window.
    pub fn max_uses(&self) -> usize {
        self.max_uses
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
struct RawCooldownConfig {
    window_secs: f64,
    max_uses: usize,
}

#[cfg(feature = "serde")]
impl TryFrom<RawCooldownConfig> for CooldownConfig {
    type Error = ConfigurationError;

    fn try_from(raw: RawCooldownConfig) -> Result<Self, Self::Error> {
        CooldownConfig::from_secs_f64(raw.window_secs, raw.max_uses)
    }
}

#[cfg(feature = "serde")]
impl From<CooldownConfig> for RawCooldownConfig {
    fn from(cfg: CooldownConfig) -> Self {
        RawCooldownConfig { window_secs: cfg.window.as_secs_f64(), max_uses: cfg.max_uses }
    }
}

/// Outcome of [`CooldownBucket::try_acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The use was recorded.
    Allowed {
        /// Uses still available to this key in the current window.
        remaining: usize,
    },
    /// The key is exhausted; nothing was recorded.
    Denied {
        /// Time until the oldest recorded use leaves the window.
        wait: Duration,
    },
}

impl Admission {
    /// Helper to check if allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed { .. })
    }
}

/// Smallest key count that triggers a full sweep from [`CooldownBucket::try_acquire`].
const SWEEP_FLOOR: usize = 64;

/// Per-key timestamps plus the key count at which the next full sweep runs.
struct UsageLog<K> {
    entries: HashMap<K, VecDeque<Duration>>,
    sweep_at: usize,
}

impl<K> Default for UsageLog<K> {
    fn default() -> Self {
        Self { entries: HashMap::new(), sweep_at: SWEEP_FLOOR }
    }
}

impl<K: Eq + Hash> UsageLog<K> {
    /// Prune every key, drop the empty ones and move the sweep mark to twice the
    /// survivors. Returns how many keys were dropped.
    fn sweep(&mut self, now: Duration, window: Duration) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, times| {
            prune(times, now, window);
            !times.is_empty()
        });
        self.sweep_at = self.entries.len().saturating_mul(2).max(SWEEP_FLOOR);
        before - self.entries.len()
    }
}

/// Sliding-window limiter keyed by an arbitrary identifier.
///
/// Clones share the same usage log, so one bucket can be handed to every task serving the
/// guarded command.
#[derive(Clone)]
pub struct CooldownBucket<K> {
    config: CooldownConfig,
    usage_log: Arc<Mutex<UsageLog<K>>>,
    clock: Arc<dyn Clock>,
}

impl<K> std::fmt::Debug for CooldownBucket<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CooldownBucket")
            .field("window", &self.config.window)
            .field("max_uses", &self.config.max_uses)
            .field("clock", &self.clock)
            .finish()
    }
}

impl<K> CooldownBucket<K>
where
    K: Eq + Hash + Clone,
{
    /// Create a bucket allowing `max_uses` uses per key in any trailing `window`.
    ///
    /// Errors if `window` is zero or `max_uses` is zero.
    pub fn new(window: Duration, max_uses: usize) -> Result<Self, ConfigurationError> {
        Ok(Self::from_config(CooldownConfig::new(window, max_uses)?))
    }

    /// Create a bucket from an already validated config.
    pub fn from_config(config: CooldownConfig) -> Self {
        Self {
            config,
            usage_log: Arc::new(Mutex::new(UsageLog::default())),
            clock: Arc::new(MonotonicClock::default()),
        }
    }

    /// Override the clock (useful for deterministic tests).
    ///
    /// Swap the clock before the bucket records anything; readings of different clocks are
    /// not comparable.
    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn config(&self) -> CooldownConfig {
        self.config
    }

    pub fn window(&self) -> Duration {
        self.config.window
    }

    pub fn max_uses(&self) -> usize {
        self.config.max_uses
    }

    /// Admit and record a use for `key` if the key has a free slot.
    pub fn can_use(&self, key: &K) -> bool {
        self.try_acquire(key).is_allowed()
    }

    /// Same decision as [`can_use`](Self::can_use), reporting the remaining slots on
    /// admission and the wait on denial from the same critical section.
    pub fn try_acquire(&self, key: &K) -> Admission {
        let window = self.config.window;
        let max_uses = self.config.max_uses;

        let admission = {
            let mut log = self.lock();
            // read the clock under the lock so every log stays chronological
            let now = self.clock.now();
            if log.entries.len() >= log.sweep_at {
                let dropped = log.sweep(now, window);
                debug!(
                    target: "cmdguard::cooldown",
                    dropped,
                    kept = log.entries.len(),
                    "swept expired keys"
                );
            }
            let times = log.entries.entry(key.clone()).or_default();
            prune(times, now, window);
            if times.len() < max_uses {
                times.push_back(now);
                Admission::Allowed { remaining: max_uses - times.len() }
            } else {
                Admission::Denied { wait: wait_until_free(times, now, window) }
            }
        };

        if let Admission::Denied { wait } = admission {
            debug!(
                target: "cmdguard::cooldown",
                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                max_uses,
                "cooldown bucket exhausted"
            );
        }
        admission
    }

    /// Time until `key` can be admitted again; zero if it can be admitted now.
    ///
    /// Read-only with respect to admission: it prunes expired uses but never records one.
    pub fn remaining_wait(&self, key: &K) -> Duration {
        let window = self.config.window;
        let mut log = self.lock();
        let now = self.clock.now();

        let Some(times) = log.entries.get_mut(key) else {
            return Duration::ZERO;
        };
        prune(times, now, window);
        if times.is_empty() {
            log.entries.remove(key);
            return Duration::ZERO;
        }
        if times.len() < self.config.max_uses {
            return Duration::ZERO;
        }
        wait_until_free(times, now, window)
    }

    /// Wait until `key` is admitted, then record the use.
    ///
    /// Sleeps through `sleeper` for the reported wait and re-checks admission atomically on
    /// every wake; another caller may have taken the freed slot in between. Dropping the
    /// future cancels the wait without reserving anything. Returns the remaining slots.
    pub async fn acquire_wait(&self, key: &K, sleeper: &dyn Sleeper) -> usize
    where
        K: Sync,
    {
        loop {
            match self.try_acquire(key) {
                Admission::Allowed { remaining } => return remaining,
                Admission::Denied { wait } => sleeper.sleep(wait).await,
            }
        }
    }

    /// Forget every recorded use of `key`.
    pub fn reset(&self, key: &K) {
        self.lock().entries.remove(key);
    }

    /// Forget every recorded use of every key.
    pub fn clear(&self) {
        *self.lock() = UsageLog::default();
    }

    /// Prune every key and drop the ones left empty. Returns how many keys were dropped.
    pub fn purge_expired(&self) -> usize {
        let window = self.config.window;
        let mut log = self.lock();
        let now = self.clock.now();
        log.sweep(now, window)
    }

    /// Number of keys with at least one use inside the current window.
    pub fn tracked_keys(&self) -> usize {
        self.purge_expired();
        self.lock().entries.len()
    }

    fn lock(&self) -> MutexGuard<'_, UsageLog<K>> {
        self.usage_log.lock().expect("cooldown bucket poisoned")
    }
}

/// Drop uses whose window has fully elapsed. `times` is chronological.
fn prune(times: &mut VecDeque<Duration>, now: Duration, window: Duration) {
    while let Some(&oldest) = times.front() {
        match oldest.checked_add(window) {
            Some(expires) if expires <= now => {
                times.pop_front();
            }
            _ => break,
        }
    }
}

fn wait_until_free(times: &VecDeque<Duration>, now: Duration, window: Duration) -> Duration {
    times
        .front()
        .map(|oldest| oldest.saturating_add(window).saturating_sub(now))
        .unwrap_or(Duration::ZERO)
}
