//! Permission sets as resolved by the host.
//!
//! Bit positions follow the Discord API so hosts can convert their own permission value with
//! [`Permissions::from_bits_truncate`]. The guards only test containment; resolving
//! overwrites and role hierarchies stays the host's job.

bitflags::bitflags! {
    /// A set of member permissions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u64 {
        const CREATE_INSTANT_INVITE = 1 << 0;
        const KICK_MEMBERS = 1 << 1;
        const BAN_MEMBERS = 1 << 2;
        const ADMINISTRATOR = 1 << 3;
        const MANAGE_CHANNELS = 1 << 4;
        const MANAGE_GUILD = 1 << 5;
        const ADD_REACTIONS = 1 << 6;
        const VIEW_AUDIT_LOG = 1 << 7;
        const VIEW_CHANNEL = 1 << 10;
        const SEND_MESSAGES = 1 << 11;
        const MANAGE_MESSAGES = 1 << 13;
        const EMBED_LINKS = 1 << 14;
        const ATTACH_FILES = 1 << 15;
        const READ_MESSAGE_HISTORY = 1 << 16;
        const MENTION_EVERYONE = 1 << 17;
        const CONNECT = 1 << 20;
        const SPEAK = 1 << 21;
        const MUTE_MEMBERS = 1 << 22;
        const MOVE_MEMBERS = 1 << 24;
        const CHANGE_NICKNAME = 1 << 26;
        const MANAGE_NICKNAMES = 1 << 27;
        const MANAGE_ROLES = 1 << 28;
        const MANAGE_WEBHOOKS = 1 << 29;
        const USE_APPLICATION_COMMANDS = 1 << 31;
        const MANAGE_THREADS = 1 << 34;
        const MODERATE_MEMBERS = 1 << 40;
    }
}

impl Permissions {
    /// Human readable names of every flag in the set, in bit order.
    ///
    /// `MANAGE_GUILD` becomes "Manage Server" to match what users see in the client.
    pub fn display_names(&self) -> Vec<String> {
        self.iter_names().map(|(name, _)| display_name(name)).collect()
    }
}

fn display_name(flag: &str) -> String {
    flag.to_lowercase()
        .replace("guild", "server")
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
