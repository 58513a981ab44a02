//! Guarded execution: checks, cooldown and concurrency around one command.
//!
//! The host's dispatch path calls [`CommandGuard::run`] (or [`CommandGuard::enter`] when it
//! needs to drive the handler itself) before invoking a command handler. Order is fixed:
//!
//! 1. checks, in insertion order;
//! 2. concurrency slot;
//! 3. cooldown bucket, keyed by the configured [`BucketScope`].
//!
//! A failed check or a concurrency rejection never consumes a cooldown slot.

use crate::check::{Check, CheckChain};
use crate::concurrency::ConcurrencyLimiter;
use crate::context::CommandContext;
use crate::cooldown::{Admission, CooldownBucket};
use crate::error::{CheckFailure, GuardError};
use crate::scope::{BucketScope, ScopeKey};
use std::future::Future;
use tokio::sync::OwnedSemaphorePermit;
use tracing::debug;

/// Proof of admission. Holds the concurrency slot, if any, until dropped.
#[derive(Debug)]
#[must_use = "dropping the admission releases the concurrency slot"]
pub struct Admitted {
    _permit: Option<OwnedSemaphorePermit>,
}

/// Everything gating one command.
pub struct CommandGuard<C: CommandContext + ?Sized> {
    checks: CheckChain<C>,
    cooldown: Option<(CooldownBucket<ScopeKey>, BucketScope)>,
    concurrency: Option<ConcurrencyLimiter>,
}

impl<C: CommandContext + ?Sized> Default for CommandGuard<C> {
    fn default() -> Self {
        Self { checks: CheckChain::new(), cooldown: None, concurrency: None }
    }
}

impl<C: CommandContext + ?Sized> Clone for CommandGuard<C> {
    fn clone(&self) -> Self {
        Self {
            checks: self.checks.clone(),
            cooldown: self.cooldown.clone(),
            concurrency: self.concurrency.clone(),
        }
    }
}

impl<C: CommandContext + ?Sized> std::fmt::Debug for CommandGuard<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandGuard")
            .field("checks", &self.checks)
            .field("cooldown", &self.cooldown)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl<C: CommandContext + ?Sized> CommandGuard<C> {
    /// A guard that admits everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a check.
    pub fn check<K: Check<C> + 'static>(mut self, check: K) -> Self {
        self.checks.push(check);
        self
    }

    /// Replace the check chain wholesale.
    pub fn checks(mut self, checks: CheckChain<C>) -> Self {
        self.checks = checks;
        self
    }

    /// Count invocations against `bucket`, keyed by `scope`.
    ///
    /// The bucket may be shared with other guards; they then share one quota.
    pub fn cooldown(mut self, bucket: CooldownBucket<ScopeKey>, scope: BucketScope) -> Self {
        self.cooldown = Some((bucket, scope));
        self
    }

    /// Limit how many invocations run at once.
    pub fn concurrency(mut self, limiter: ConcurrencyLimiter) -> Self {
        self.concurrency = Some(limiter);
        self
    }

    pub fn check_chain(&self) -> &CheckChain<C> {
        &self.checks
    }

    pub fn bucket(&self) -> Option<(&CooldownBucket<ScopeKey>, BucketScope)> {
        self.cooldown.as_ref().map(|(bucket, scope)| (bucket, *scope))
    }

    pub fn limiter(&self) -> Option<&ConcurrencyLimiter> {
        self.concurrency.as_ref()
    }

    /// Time until `ctx` would clear the cooldown; zero without a cooldown.
    pub fn remaining_cooldown(&self, ctx: &C) -> std::time::Duration {
        match &self.cooldown {
            Some((bucket, scope)) => bucket.remaining_wait(&scope.key(ctx)),
            None => std::time::Duration::ZERO,
        }
    }

    /// Run every gate for `ctx`. On success the returned [`Admitted`] holds the
    /// concurrency slot; keep it alive for as long as the handler runs.
    pub async fn enter(&self, ctx: &C) -> Result<Admitted, CheckFailure> {
        self.checks.run(ctx).await?;

        let permit = match &self.concurrency {
            Some(limiter) => Some(limiter.acquire().await?),
            None => None,
        };

        if let Some((bucket, scope)) = &self.cooldown {
            let key = scope.key(ctx);
            if let Admission::Denied { wait } = bucket.try_acquire(&key) {
                debug!(target: "cmdguard::guard", key = %key, scope = ?scope, "invocation on cooldown");
                return Err(CheckFailure::CommandOnCooldown { key, remaining: wait });
            }
        }

        Ok(Admitted { _permit: permit })
    }

    /// Run `handler` if every gate admits `ctx`.
    pub async fn run<T, E, Fut, H>(&self, ctx: &C, handler: H) -> Result<T, GuardError<E>>
    where
        H: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let admitted = self.enter(ctx).await?;
        let result = handler().await.map_err(GuardError::Inner);
        drop(admitted);
        result
    }
}
