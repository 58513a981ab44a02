//! Checks: predicates gating a guarded command.
//!
//! A check looks at the invocation and either passes or explains why the command must not
//! run. Checks are plain values behind one trait, collected in a [`CheckChain`] and
//! evaluated in insertion order; the first failure wins.
//!
//! Built-ins: [`is_owner`], [`guild_only`], [`dm_only`], [`has_permissions`], [`is_admin`],
//! [`has_role`]. Closures plug in through [`FnCheck`] (sync, boolean) and [`AsyncFnCheck`]
//! (async, with a custom failure).

use crate::context::{CommandContext, RoleRef};
use crate::error::CheckFailure;
use crate::permissions::Permissions;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::debug;

/// A predicate gating execution of a guarded command.
#[async_trait]
pub trait Check<C: CommandContext + ?Sized>: Send + Sync {
    /// Name used in logs and in [`CheckFailure::Failed`].
    fn name(&self) -> &str;

    /// Pass, or explain why the command must not run.
    async fn check(&self, ctx: &C) -> Result<(), CheckFailure>;
}

/// Boolean closure check. `false` fails with [`CheckFailure::Failed`].
pub struct FnCheck<F> {
    name: String,
    predicate: F,
}

impl<F> FnCheck<F> {
    pub fn new(name: impl Into<String>, predicate: F) -> Self {
        Self { name: name.into(), predicate }
    }
}

#[async_trait]
impl<C, F> Check<C> for FnCheck<F>
where
    C: CommandContext + ?Sized,
    F: Fn(&C) -> bool + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, ctx: &C) -> Result<(), CheckFailure> {
        if (self.predicate)(ctx) {
            Ok(())
        } else {
            Err(CheckFailure::Failed { check: self.name.clone() })
        }
    }
}

/// Async check built from a function returning a boxed future.
///
/// ```rust
/// use cmdguard::{AsyncFnCheck, CheckFailure, CommandContext};
/// use futures::future::BoxFuture;
///
/// fn not_banned<C: CommandContext>(ctx: &C) -> BoxFuture<'_, Result<(), CheckFailure>> {
///     Box::pin(async move {
///         // look the author up somewhere slow
///         let _ = ctx.author_id();
///         Ok(())
///     })
/// }
///
/// # fn build<C: CommandContext + 'static>() {
/// let check = AsyncFnCheck::new("not_banned", not_banned::<C>);
/// # }
/// ```
pub struct AsyncFnCheck<F> {
    name: String,
    function: F,
}

impl<F> AsyncFnCheck<F> {
    pub fn new(name: impl Into<String>, function: F) -> Self {
        Self { name: name.into(), function }
    }
}

#[async_trait]
impl<C, F> Check<C> for AsyncFnCheck<F>
where
    C: CommandContext + ?Sized,
    F: for<'a> Fn(&'a C) -> BoxFuture<'a, Result<(), CheckFailure>> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, ctx: &C) -> Result<(), CheckFailure> {
        (self.function)(ctx).await
    }
}

/// Passes only for the bot owner.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsOwner;

/// Passes only inside a guild.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuildOnly;

/// Passes only in direct messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct DmOnly;

/// Passes when the author holds every required permission and none of the denied ones.
#[derive(Debug, Clone, Copy)]
pub struct HasPermissions {
    required: Permissions,
    denied: Permissions,
}

impl HasPermissions {
    /// Also fail when the author holds any of `denied`.
    pub fn without(mut self, denied: Permissions) -> Self {
        self.denied |= denied;
        self
    }

    pub fn required(&self) -> Permissions {
        self.required
    }

    pub fn denied(&self) -> Permissions {
        self.denied
    }
}

/// Passes for administrators.
#[derive(Debug, Clone, Copy)]
pub struct IsAdmin {
    guild_only: bool,
}

/// Passes when the author holds any (or all) of the listed roles.
#[derive(Debug, Clone)]
pub struct HasRole {
    roles: Vec<RoleRef>,
    require_all: bool,
    guild_only: bool,
}

pub fn is_owner() -> IsOwner {
    IsOwner
}

pub fn guild_only() -> GuildOnly {
    GuildOnly
}

pub fn dm_only() -> DmOnly {
    DmOnly
}

/// Require every permission in `required`. Resolving overwrites is the host's job; the
/// check only tests containment in [`CommandContext::author_permissions`].
///
/// Chain [`HasPermissions::without`] for permissions the author must not hold. Missing
/// permissions are reported before forbidden ones.
pub fn has_permissions(required: Permissions) -> HasPermissions {
    HasPermissions { required, denied: Permissions::empty() }
}

/// Require ADMINISTRATOR. In direct messages this fails with [`CheckFailure::NoDms`] when
/// `guild_only` is set and passes otherwise.
pub fn is_admin(guild_only: bool) -> IsAdmin {
    IsAdmin { guild_only }
}

/// Require any of `roles`, or all of them with `require_all`. DM handling as in
/// [`is_admin`].
pub fn has_role<I, R>(roles: I, require_all: bool, guild_only: bool) -> HasRole
where
    I: IntoIterator<Item = R>,
    R: Into<RoleRef>,
{
    HasRole { roles: roles.into_iter().map(Into::into).collect(), require_all, guild_only }
}

#[async_trait]
impl<C: CommandContext + ?Sized> Check<C> for IsOwner {
    fn name(&self) -> &str {
        "is_owner"
    }

    async fn check(&self, ctx: &C) -> Result<(), CheckFailure> {
        if ctx.is_owner() {
            Ok(())
        } else {
            Err(CheckFailure::NotOwner)
        }
    }
}

#[async_trait]
impl<C: CommandContext + ?Sized> Check<C> for GuildOnly {
    fn name(&self) -> &str {
        "guild_only"
    }

    async fn check(&self, ctx: &C) -> Result<(), CheckFailure> {
        if ctx.in_dms() {
            Err(CheckFailure::NoDms)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl<C: CommandContext + ?Sized> Check<C> for DmOnly {
    fn name(&self) -> &str {
        "dm_only"
    }

    async fn check(&self, ctx: &C) -> Result<(), CheckFailure> {
        if ctx.in_dms() {
            Ok(())
        } else {
            Err(CheckFailure::DmsOnly)
        }
    }
}

#[async_trait]
impl<C: CommandContext + ?Sized> Check<C> for HasPermissions {
    fn name(&self) -> &str {
        "has_permissions"
    }

    async fn check(&self, ctx: &C) -> Result<(), CheckFailure> {
        let held = ctx.author_permissions();
        let missing = self.required.difference(held);
        if !missing.is_empty() {
            return Err(CheckFailure::MissingPermissions { missing });
        }
        let present = self.denied.intersection(held);
        if !present.is_empty() {
            return Err(CheckFailure::ForbiddenPermissions { present });
        }
        Ok(())
    }
}

#[async_trait]
impl<C: CommandContext + ?Sized> Check<C> for IsAdmin {
    fn name(&self) -> &str {
        "is_admin"
    }

    async fn check(&self, ctx: &C) -> Result<(), CheckFailure> {
        if ctx.in_dms() {
            return if self.guild_only { Err(CheckFailure::NoDms) } else { Ok(()) };
        }
        if ctx.author_permissions().contains(Permissions::ADMINISTRATOR) {
            Ok(())
        } else {
            Err(CheckFailure::NotAdmin)
        }
    }
}

impl HasRole {
    fn satisfied_by(&self, held: &[crate::context::Role]) -> bool {
        let holds = |wanted: &RoleRef| held.iter().any(|role| wanted.matches(role));
        if self.require_all {
            self.roles.iter().all(holds)
        } else {
            self.roles.iter().any(holds)
        }
    }
}

#[async_trait]
impl<C: CommandContext + ?Sized> Check<C> for HasRole {
    fn name(&self) -> &str {
        "has_role"
    }

    async fn check(&self, ctx: &C) -> Result<(), CheckFailure> {
        if ctx.in_dms() {
            return if self.guild_only { Err(CheckFailure::NoDms) } else { Ok(()) };
        }
        if self.satisfied_by(ctx.author_roles()) {
            Ok(())
        } else {
            Err(CheckFailure::MissingRole { roles: self.roles.clone() })
        }
    }
}

/// Ordered list of checks evaluated one after another.
pub struct CheckChain<C: CommandContext + ?Sized> {
    checks: Vec<Arc<dyn Check<C>>>,
}

impl<C: CommandContext + ?Sized> Clone for CheckChain<C> {
    fn clone(&self) -> Self {
        Self { checks: self.checks.clone() }
    }
}

impl<C: CommandContext + ?Sized> Default for CheckChain<C> {
    fn default() -> Self {
        Self { checks: Vec::new() }
    }
}

impl<C: CommandContext + ?Sized> std::fmt::Debug for CheckChain<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.checks.iter().map(|c| c.name())).finish()
    }
}

impl<C: CommandContext + ?Sized> CheckChain<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a check; it runs after every check already in the chain.
    pub fn push<K: Check<C> + 'static>(&mut self, check: K) {
        self.checks.push(Arc::new(check));
    }

    /// Builder form of [`push`](Self::push).
    pub fn with<K: Check<C> + 'static>(mut self, check: K) -> Self {
        self.push(check);
        self
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Check names in evaluation order.
    pub fn names(&self) -> Vec<&str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    /// Run every check in order, stopping at the first failure.
    pub async fn run(&self, ctx: &C) -> Result<(), CheckFailure> {
        for check in &self.checks {
            if let Err(failure) = check.check(ctx).await {
                debug!(target: "cmdguard::check", check = check.name(), reason = %failure, "check failed");
                return Err(failure);
            }
        }
        Ok(())
    }
}
