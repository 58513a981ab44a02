//! Convenient re-exports for common cmdguard types.
pub use crate::{
    check::{dm_only, guild_only, has_permissions, has_role, is_admin, is_owner, Check, CheckChain},
    concurrency::{ConcurrencyLimiter, OnLimit},
    context::{ChannelId, CommandContext, GuildId, Role, RoleId, RoleRef, UserId},
    cooldown::{Admission, CooldownBucket, CooldownConfig},
    error::{CheckFailure, ConfigurationError, GuardError},
    guard::CommandGuard,
    middleware::GuardLayer,
    permissions::Permissions,
    registry::CommandRegistry,
    scope::BucketScope,
};
