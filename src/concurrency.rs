//! Concurrency limiting for guarded commands

use crate::error::{CheckFailure, ConfigurationError, GuardError};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

/// What to do when every slot is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum OnLimit {
    /// Queue until a running invocation finishes.
    #[default]
    Wait,
    /// Fail immediately with [`CheckFailure::MaxConcurrencyReached`].
    Reject,
}

/// Validated concurrency limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "RawConcurrencyConfig", into = "RawConcurrencyConfig")
)]
pub struct ConcurrencyConfig {
    max_concurrent: usize,
    mode: OnLimit,
}

impl ConcurrencyConfig {
    /// Create a config with validation.
    pub fn new(max_concurrent: usize, mode: OnLimit) -> Result<Self, ConfigurationError> {
        if max_concurrent == 0 || max_concurrent > Semaphore::MAX_PERMITS {
            return Err(ConfigurationError::InvalidConcurrencyLimit { provided: max_concurrent });
        }
        Ok(Self { max_concurrent, mode })
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn mode(&self) -> OnLimit {
        self.mode
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
struct RawConcurrencyConfig {
    max_concurrent: usize,
    #[serde(default)]
    mode: OnLimit,
}

#[cfg(feature = "serde")]
impl TryFrom<RawConcurrencyConfig> for ConcurrencyConfig {
    type Error = ConfigurationError;

    fn try_from(raw: RawConcurrencyConfig) -> Result<Self, Self::Error> {
        ConcurrencyConfig::new(raw.max_concurrent, raw.mode)
    }
}

#[cfg(feature = "serde")]
impl From<ConcurrencyConfig> for RawConcurrencyConfig {
    fn from(cfg: ConcurrencyConfig) -> Self {
        RawConcurrencyConfig { max_concurrent: cfg.max_concurrent, mode: cfg.mode }
    }
}

/// Counting-semaphore limiter. Clones share the same slots.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    config: ConcurrencyConfig,
}

impl ConcurrencyLimiter {
    /// Create a limiter allowing `max_concurrent` invocations at once.
    pub fn new(max_concurrent: usize, mode: OnLimit) -> Result<Self, ConfigurationError> {
        Ok(Self::from_config(ConcurrencyConfig::new(max_concurrent, mode)?))
    }

    pub fn from_config(config: ConcurrencyConfig) -> Self {
        Self { semaphore: Arc::new(Semaphore::new(config.max_concurrent)), config }
    }

    pub fn config(&self) -> ConcurrencyConfig {
        self.config
    }

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Invocations currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.config.max_concurrent.saturating_sub(self.available())
    }

    /// Take a slot according to the configured mode. The slot is released when the permit
    /// is dropped.
    ///
    /// In [`OnLimit::Wait`] mode the returned future is cancel-safe: dropping it gives up
    /// the place in the queue.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, CheckFailure> {
        match self.config.mode {
            OnLimit::Reject => self.semaphore.clone().try_acquire_owned().map_err(|_| {
                let in_flight = self.in_flight();
                debug!(
                    target: "cmdguard::concurrency",
                    in_flight,
                    max = self.config.max_concurrent,
                    "concurrency limit reached"
                );
                CheckFailure::MaxConcurrencyReached { in_flight, max: self.config.max_concurrent }
            }),
            // the semaphore is never closed
            OnLimit::Wait => self.semaphore.clone().acquire_owned().await.map_err(|_| {
                CheckFailure::MaxConcurrencyReached {
                    in_flight: self.in_flight(),
                    max: self.config.max_concurrent,
                }
            }),
        }
    }

    /// Run `operation` while holding a slot.
    pub async fn execute<T, E, Fut, Op>(&self, operation: Op) -> Result<T, GuardError<E>>
    where
        Fut: Future<Output = Result<T, E>>,
        Op: FnOnce() -> Fut,
    {
        let permit = self.acquire().await?;
        let result = operation().await.map_err(GuardError::Inner);
        drop(permit);
        result
    }
}
