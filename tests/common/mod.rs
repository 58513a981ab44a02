use cmdguard::{ChannelId, CommandContext, GuildId, Permissions, Role, RoleId, UserId};

/// Invocation as a host bot would describe it to the guards.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub author: u64,
    pub guild: Option<u64>,
    pub channel: u64,
    pub permissions: Permissions,
    pub roles: Vec<Role>,
    pub owner: bool,
}

#[allow(dead_code)]
impl Invocation {
    pub fn in_guild(author: u64, guild: u64, channel: u64) -> Self {
        Self {
            author,
            guild: Some(guild),
            channel,
            permissions: Permissions::empty(),
            roles: Vec::new(),
            owner: false,
        }
    }

    pub fn in_dm(author: u64) -> Self {
        Self {
            author,
            guild: None,
            channel: 90_000 + author,
            permissions: Permissions::empty(),
            roles: Vec::new(),
            owner: false,
        }
    }

    pub fn permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn role(mut self, id: u64, name: &str) -> Self {
        self.roles.push(Role::new(RoleId(id), name));
        self
    }

    pub fn owner(mut self) -> Self {
        self.owner = true;
        self
    }
}

impl CommandContext for Invocation {
    fn author_id(&self) -> UserId {
        UserId(self.author)
    }

    fn guild_id(&self) -> Option<GuildId> {
        self.guild.map(GuildId)
    }

    fn channel_id(&self) -> ChannelId {
        ChannelId(self.channel)
    }

    fn author_permissions(&self) -> Permissions {
        self.permissions
    }

    fn author_roles(&self) -> &[Role] {
        &self.roles
    }

    fn is_owner(&self) -> bool {
        self.owner
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerError(pub &'static str);

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "handler failed: {}", self.0)
    }
}

impl std::error::Error for HandlerError {}
