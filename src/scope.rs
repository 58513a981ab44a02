//! Which slice of traffic a cooldown bucket counts against.

use crate::context::CommandContext;
use std::fmt;

/// Key derived from an invocation by a [`BucketScope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeKey(pub u64);

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The attribute of an invocation a bucket is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BucketScope {
    /// One shared key for every invocation.
    Global,
    /// Per invoking user.
    #[default]
    User,
    /// Per guild. Direct messages fall back to the channel, so every DM conversation is
    /// limited on its own.
    Guild,
    /// Per channel.
    Channel,
}

impl BucketScope {
    /// Derive the bucket key for `ctx`.
    pub fn key<C: CommandContext + ?Sized>(&self, ctx: &C) -> ScopeKey {
        match self {
            BucketScope::Global => ScopeKey(0),
            BucketScope::User => ScopeKey(ctx.author_id().get()),
            BucketScope::Guild => match ctx.guild_id() {
                Some(guild) => ScopeKey(guild.get()),
                None => ScopeKey(ctx.channel_id().get()),
            },
            BucketScope::Channel => ScopeKey(ctx.channel_id().get()),
        }
    }
}
