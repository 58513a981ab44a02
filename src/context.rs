//! The host framework's view of a command invocation.
//!
//! `cmdguard` never owns the bot framework. The host implements [`CommandContext`] for its
//! own invocation type and every check, bucket scope and guard reads through it.

use crate::permissions::Permissions;
use std::fmt;

macro_rules! id_type {
    ($($(#[$attr:meta])* $name:ident;)*) => {
        $(
            $(#[$attr])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
            pub struct $name(pub u64);

            impl $name {
                /// The raw snowflake.
                pub fn get(self) -> u64 {
                    self.0
                }
            }

            impl From<u64> for $name {
                fn from(id: u64) -> Self {
                    Self(id)
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )*
    };
}

id_type! {
    /// Id of the user invoking a command.
    UserId;
    /// Id of a guild (server).
    GuildId;
    /// Id of a channel, including direct-message channels.
    ChannelId;
    /// Id of a guild role.
    RoleId;
}

/// A role held by the invoking member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
}

impl Role {
    pub fn new(id: RoleId, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
}

/// A role requirement, matched either by id or by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoleRef {
    Id(RoleId),
    Name(String),
}

impl RoleRef {
    /// Whether `role` satisfies this requirement.
    pub fn matches(&self, role: &Role) -> bool {
        match self {
            RoleRef::Id(id) => role.id == *id,
            RoleRef::Name(name) => role.name == *name,
        }
    }
}

impl From<RoleId> for RoleRef {
    fn from(id: RoleId) -> Self {
        RoleRef::Id(id)
    }
}

impl From<u64> for RoleRef {
    fn from(id: u64) -> Self {
        RoleRef::Id(RoleId(id))
    }
}

impl From<&str> for RoleRef {
    fn from(name: &str) -> Self {
        RoleRef::Name(name.to_string())
    }
}

impl From<String> for RoleRef {
    fn from(name: String) -> Self {
        RoleRef::Name(name)
    }
}

impl fmt::Display for RoleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleRef::Id(id) => write!(f, "<@&{}>", id),
            RoleRef::Name(name) => f.write_str(name),
        }
    }
}

/// Everything a guard needs to know about an invocation.
///
/// Implementations should be cheap: guards call these accessors on every dispatch.
pub trait CommandContext: Send + Sync {
    /// The invoking user.
    fn author_id(&self) -> UserId;

    /// The guild the command was invoked in, `None` in direct messages.
    fn guild_id(&self) -> Option<GuildId>;

    /// The channel the command was invoked in.
    fn channel_id(&self) -> ChannelId;

    /// Resolved permissions of the author in the invoking channel.
    ///
    /// Outside guilds, hosts usually return [`Permissions::empty`].
    fn author_permissions(&self) -> Permissions;

    /// Roles held by the author in the invoking guild.
    fn author_roles(&self) -> &[Role];

    /// Whether the author owns the bot application.
    fn is_owner(&self) -> bool;

    /// Convenience for `guild_id().is_none()`.
    fn in_dms(&self) -> bool {
        self.guild_id().is_none()
    }
}

impl<C: CommandContext + ?Sized> CommandContext for &C {
    fn author_id(&self) -> UserId {
        (**self).author_id()
    }

    fn guild_id(&self) -> Option<GuildId> {
        (**self).guild_id()
    }

    fn channel_id(&self) -> ChannelId {
        (**self).channel_id()
    }

    fn author_permissions(&self) -> Permissions {
        (**self).author_permissions()
    }

    fn author_roles(&self) -> &[Role] {
        (**self).author_roles()
    }

    fn is_owner(&self) -> bool {
        (**self).is_owner()
    }
}
