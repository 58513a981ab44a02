//! Registry mapping command names to their guards.
//!
//! The host registers one [`CommandGuard`] per command and routes every invocation through
//! [`CommandRegistry::dispatch`]. Rejections go to the registered error listeners; with no
//! listener they are returned to the caller.

use crate::context::CommandContext;
use crate::error::{CheckFailure, GuardError};
use crate::guard::CommandGuard;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Callback notified of rejected invocations: `(command name, context, reason)`.
pub type ErrorListener<C> = Arc<dyn Fn(&str, &C, &CheckFailure) + Send + Sync>;

/// In-memory registry backed by an RwLock. Clones share the same entries.
pub struct CommandRegistry<C: CommandContext + ?Sized> {
    commands: Arc<RwLock<HashMap<String, Arc<CommandGuard<C>>>>>,
    listeners: Arc<RwLock<Vec<ErrorListener<C>>>>,
}

impl<C: CommandContext + ?Sized> Default for CommandRegistry<C> {
    fn default() -> Self {
        Self { commands: Arc::default(), listeners: Arc::default() }
    }
}

impl<C: CommandContext + ?Sized> Clone for CommandRegistry<C> {
    fn clone(&self) -> Self {
        Self { commands: self.commands.clone(), listeners: self.listeners.clone() }
    }
}

impl<C: CommandContext + ?Sized> std::fmt::Debug for CommandRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.names())
            .field("listeners", &self.listeners.read().map(|l| l.len()).unwrap_or_default())
            .finish()
    }
}

impl<C: CommandContext + ?Sized> CommandRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `guard` under `name`, replacing any existing entry.
    ///
    /// Replacement is deliberate: the last registration wins and the old guard's buckets
    /// are no longer consulted.
    pub fn register(&self, name: impl Into<String>, guard: CommandGuard<C>) {
        let name = name.into();
        let mut map = self.commands.write().expect("command registry poisoned");
        if map.contains_key(&name) {
            warn!(target: "cmdguard::registry", command = %name, "command guard replaced; last registration wins");
        }
        map.insert(name, Arc::new(guard));
    }

    pub fn get(&self, name: &str) -> Option<Arc<CommandGuard<C>>> {
        self.commands.read().expect("command registry poisoned").get(name).cloned()
    }

    pub fn remove(&self, name: &str) -> Option<Arc<CommandGuard<C>>> {
        self.commands.write().expect("command registry poisoned").remove(name)
    }

    /// Registered command names, sorted.
    pub fn names(&self) -> Vec<String> {
        let map = self.commands.read().expect("command registry poisoned");
        let mut names: Vec<String> = map.keys().cloned().collect();
        names.sort();
        names
    }

    /// Add a listener for rejected invocations.
    pub fn on_error<F>(&self, listener: F)
    where
        F: Fn(&str, &C, &CheckFailure) + Send + Sync + 'static,
    {
        self.listeners.write().expect("command registry poisoned").push(Arc::new(listener));
    }

    /// Run `handler` for command `name` if its guard admits `ctx`.
    ///
    /// Returns `Ok(Some(value))` when the handler ran, `Ok(None)` when the invocation was
    /// rejected and every listener was notified, and `Err` for unknown commands, unhandled
    /// rejections and handler failures.
    pub async fn dispatch<T, E, Fut, H>(
        &self,
        name: &str,
        ctx: &C,
        handler: H,
    ) -> Result<Option<T>, GuardError<E>>
    where
        H: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let guard = self
            .get(name)
            .ok_or_else(|| GuardError::UnknownCommand { name: name.to_string() })?;

        let admitted = match guard.enter(ctx).await {
            Ok(admitted) => admitted,
            Err(failure) => {
                debug!(target: "cmdguard::registry", command = %name, reason = %failure, "invocation rejected");
                return self.reject(name, ctx, failure);
            }
        };

        let result = handler().await.map_err(GuardError::Inner);
        drop(admitted);
        result.map(Some)
    }

    fn reject<T, E>(
        &self,
        name: &str,
        ctx: &C,
        failure: CheckFailure,
    ) -> Result<Option<T>, GuardError<E>> {
        let listeners = self.listeners.read().expect("command registry poisoned").clone();
        if listeners.is_empty() {
            return Err(GuardError::Rejected(failure));
        }
        for listener in &listeners {
            listener(name, ctx, &failure);
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{dm_only, is_owner};
    use crate::clock::ManualClock;
    use crate::context::testing::TestContext;
    use crate::cooldown::CooldownBucket;
    use crate::scope::BucketScope;
    use std::sync::Mutex;
    use std::time::Duration;
    use tracing_subscriber::fmt::writer::BoxMakeWriter;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct TestError(&'static str);

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "TestError: {}", self.0)
        }
    }

    impl std::error::Error for TestError {}

    #[derive(Clone)]
    struct SharedWriter(Arc<Mutex<Vec<u8>>>);

    impl<'a> MakeWriter<'a> for SharedWriter {
        type Writer = SharedGuard;
        fn make_writer(&'a self) -> Self::Writer {
            SharedGuard(self.0.clone())
        }
    }

    struct SharedGuard(Arc<Mutex<Vec<u8>>>);
    impl std::io::Write for SharedGuard {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let mut guard = self.0.lock().unwrap();
            guard.extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn register_warns_and_replaces_duplicates() {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let writer = SharedWriter(buffer.clone());
        let subscriber = tracing_subscriber::fmt()
            .with_writer(BoxMakeWriter::new(writer))
            .with_target(true)
            .without_time()
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let registry = CommandRegistry::<TestContext>::new();
        registry.register("ping", CommandGuard::new());
        registry.register("ping", CommandGuard::new().check(is_owner()));

        let resolved = registry.get("ping").expect("guard present");
        assert_eq!(resolved.check_chain().names(), vec!["is_owner"], "last registration should win");

        let logs = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(
            logs.contains("command guard replaced"),
            "warning should be emitted on duplicate registration"
        );
    }

    #[test]
    fn names_are_sorted_and_remove_works() {
        let registry = CommandRegistry::<TestContext>::new();
        registry.register("zeta", CommandGuard::new());
        registry.register("alpha", CommandGuard::new());
        assert_eq!(registry.names(), vec!["alpha".to_string(), "zeta".to_string()]);

        assert!(registry.remove("zeta").is_some());
        assert!(registry.remove("zeta").is_none());
        assert_eq!(registry.names(), vec!["alpha".to_string()]);
    }

    #[tokio::test]
    async fn unknown_command_is_an_error() {
        let registry = CommandRegistry::<TestContext>::new();
        let err = registry
            .dispatch("nope", &TestContext::dm(1), || async { Ok::<_, TestError>(()) })
            .await
            .expect_err("unknown");
        assert!(err.is_unknown_command());
    }

    #[tokio::test]
    async fn rejection_without_listeners_is_returned() {
        let registry = CommandRegistry::<TestContext>::new();
        registry.register("secret", CommandGuard::new().check(dm_only()));

        let err = registry
            .dispatch("secret", &TestContext::guild(1, 2), || async { Ok::<_, TestError>(()) })
            .await
            .expect_err("guild rejected");
        assert_eq!(err.failure(), Some(&CheckFailure::DmsOnly));

        let ok = registry
            .dispatch("secret", &TestContext::dm(1), || async { Ok::<_, TestError>("hi") })
            .await
            .expect("dm admitted");
        assert_eq!(ok, Some("hi"));
    }

    #[tokio::test]
    async fn rejection_with_listeners_notifies_each() {
        let registry = CommandRegistry::<TestContext>::new();
        let clock = ManualClock::new();
        let bucket = CooldownBucket::new(Duration::from_secs(30), 1)
            .expect("valid")
            .with_clock(clock.clone());
        registry.register("daily", CommandGuard::new().cooldown(bucket, BucketScope::User));

        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second"] {
            let seen = seen.clone();
            registry.on_error(move |name: &str, ctx: &TestContext, failure: &CheckFailure| {
                seen.lock().unwrap().push((tag, name.to_string(), ctx.author.get(), failure.clone()));
            });
        }

        let ctx = TestContext::guild(9, 2);
        let first = registry.dispatch("daily", &ctx, || async { Ok::<_, TestError>(1) }).await;
        assert_eq!(first.expect("admitted"), Some(1));

        clock.advance(Duration::from_secs(10));
        let second = registry.dispatch("daily", &ctx, || async { Ok::<_, TestError>(2) }).await;
        assert_eq!(second.expect("handled by listeners"), None);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, "first");
        assert_eq!(seen[1].0, "second");
        assert_eq!(seen[0].1, "daily");
        assert_eq!(seen[0].2, 9);
        assert_eq!(seen[0].3.remaining_wait(), Some(Duration::from_secs(20)));
    }

    #[tokio::test]
    async fn handler_errors_bypass_listeners() {
        let registry = CommandRegistry::<TestContext>::new();
        registry.register("fail", CommandGuard::new());
        let notified = Arc::new(Mutex::new(0usize));
        let counter = notified.clone();
        registry.on_error(move |_: &str, _: &TestContext, _: &CheckFailure| {
            *counter.lock().unwrap() += 1;
        });

        let err = registry
            .dispatch("fail", &TestContext::dm(1), || async { Err::<(), _>(TestError("bad")) })
            .await
            .expect_err("handler failed");
        assert_eq!(err.into_inner(), Some(TestError("bad")));
        assert_eq!(*notified.lock().unwrap(), 0);
    }
}
