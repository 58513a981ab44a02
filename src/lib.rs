#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # cmdguard
//!
//! Admission control for chat-bot commands: per-key sliding-window cooldowns,
//! declarative permission checks and concurrency limits, wired in front of a command
//! handler or a tower service.
//!
//! ## Features
//!
//! - **Cooldown buckets** counting uses per key over a sliding window
//! - **Checks** for ownership, DM/guild restrictions, permissions and roles
//! - **Concurrency limits** that either queue or reject
//! - **Command registry** with error listeners for rejected invocations
//! - **Tower middleware** via [`GuardLayer`]
//! - **Injectable clocks** so cooldown behaviour is testable without sleeping
//!
//! ## Quick Start
//!
//! ```rust
//! use cmdguard::{
//!     guild_only, BucketScope, ChannelId, CommandContext, CommandGuard, CooldownBucket,
//!     GuildId, Permissions, Role, UserId,
//! };
//! use std::time::Duration;
//!
//! struct Invocation {
//!     author: u64,
//!     guild: Option<u64>,
//! }
//!
//! impl CommandContext for Invocation {
//!     fn author_id(&self) -> UserId { UserId(self.author) }
//!     fn guild_id(&self) -> Option<GuildId> { self.guild.map(GuildId) }
//!     fn channel_id(&self) -> ChannelId { ChannelId(1) }
//!     fn author_permissions(&self) -> Permissions { Permissions::empty() }
//!     fn author_roles(&self) -> &[Role] { &[] }
//!     fn is_owner(&self) -> bool { false }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let bucket = CooldownBucket::new(Duration::from_secs(60), 1).expect("valid cooldown");
//!     let guard = CommandGuard::new()
//!         .check(guild_only())
//!         .cooldown(bucket, BucketScope::User);
//!
//!     let ctx = Invocation { author: 7, guild: Some(1) };
//!     let reply = guard.run(&ctx, || async { Ok::<_, std::io::Error>("pong") }).await;
//!     assert_eq!(reply.expect("first use admitted"), "pong");
//!
//!     let again = guard.run(&ctx, || async { Ok::<_, std::io::Error>("pong") }).await;
//!     assert!(again.expect_err("second use throttled").is_cooldown());
//! }
//! ```

pub mod check;
pub mod clock;
pub mod concurrency;
pub mod context;
pub mod cooldown;
pub mod error;
pub mod guard;
pub mod middleware;
pub mod permissions;
pub mod prelude;
pub mod registry;
pub mod scope;
pub mod sleeper;

// Re-exports
pub use check::{
    dm_only, guild_only, has_permissions, has_role, is_admin, is_owner, AsyncFnCheck, Check,
    CheckChain, DmOnly, FnCheck, GuildOnly, HasPermissions, HasRole, IsAdmin, IsOwner,
};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use concurrency::{ConcurrencyConfig, ConcurrencyLimiter, OnLimit};
pub use context::{ChannelId, CommandContext, GuildId, Role, RoleId, RoleRef, UserId};
pub use cooldown::{Admission, CooldownBucket, CooldownConfig};
pub use error::{CheckFailure, ConfigurationError, GuardError};
pub use guard::{Admitted, CommandGuard};
pub use middleware::{GuardLayer, GuardService};
pub use permissions::Permissions;
pub use registry::{CommandRegistry, ErrorListener};
pub use scope::{BucketScope, ScopeKey};
pub use sleeper::{Sleeper, TokioSleeper, TrackingSleeper};
