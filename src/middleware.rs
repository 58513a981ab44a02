//! Tower integration: run a [`CommandGuard`] in front of any service whose request is the
//! invocation context.

use crate::context::CommandContext;
use crate::error::GuardError;
use crate::guard::CommandGuard;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower_layer::Layer;
use tower_service::Service;

/// A layer that gates requests with a [`CommandGuard`].
pub struct GuardLayer<C: CommandContext> {
    guard: Arc<CommandGuard<C>>,
}

impl<C: CommandContext> GuardLayer<C> {
    /// Create a new guard layer.
    pub fn new(guard: CommandGuard<C>) -> Self {
        Self { guard: Arc::new(guard) }
    }

    /// Share a guard that is also registered elsewhere (e.g. in a
    /// [`CommandRegistry`](crate::CommandRegistry)).
    pub fn from_shared(guard: Arc<CommandGuard<C>>) -> Self {
        Self { guard }
    }
}

impl<C: CommandContext> Clone for GuardLayer<C> {
    fn clone(&self) -> Self {
        Self { guard: self.guard.clone() }
    }
}

impl<S, C> Layer<S> for GuardLayer<C>
where
    C: CommandContext,
{
    type Service = GuardService<S, C>;

    fn layer(&self, service: S) -> Self::Service {
        GuardService { inner: service, guard: self.guard.clone() }
    }
}

/// Middleware service that runs checks, cooldown and concurrency before the inner service.
pub struct GuardService<S, C: CommandContext> {
    inner: S,
    guard: Arc<CommandGuard<C>>,
}

impl<S: Clone, C: CommandContext> Clone for GuardService<S, C> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone(), guard: self.guard.clone() }
    }
}

impl<S, C> Service<C> for GuardService<S, C>
where
    S: Service<C> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
    C: CommandContext + 'static,
{
    type Response = S::Response;
    type Error = GuardError<S::Error>;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(GuardError::Inner)
    }

    fn call(&mut self, req: C) -> Self::Future {
        let guard = self.guard.clone();
        // take the instance that was driven to readiness, leave a fresh clone behind
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let admitted = guard.enter(&req).await?;
            let result = inner.call(req).await.map_err(GuardError::Inner);
            drop(admitted);
            result
        })
    }
}
