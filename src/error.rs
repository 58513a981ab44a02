//! Error types for guards, buckets and limiters
use crate::context::RoleRef;
use crate::permissions::Permissions;
use crate::scope::ScopeKey;
use std::fmt;
use std::time::Duration;

/// Invalid construction parameters. Raised only at setup time.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// Cooldown window must be a positive duration.
    #[error("window must be > 0 (got {0:?})")]
    InvalidWindow(Duration),
    /// Cooldown window given in seconds must be positive and finite.
    #[error("window_seconds must be positive and finite (got {0})")]
    InvalidWindowSeconds(f64),
    /// Bucket capacity must allow at least one use.
    #[error("max_uses must be >= 1 (got {provided})")]
    InvalidMaxUses {
        /// Value provided by caller.
        provided: usize,
    },
    /// Concurrency limit must allow at least one invocation.
    #[error("max_concurrent must be >= 1 (got {provided})")]
    InvalidConcurrencyLimit {
        /// Value provided by caller.
        provided: usize,
    },
}

/// Why a guarded command was not run.
///
/// Messages are phrased for the invoking user.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum CheckFailure {
    /// The author is not the bot owner.
    #[error("Only the bot owner can run this command.")]
    NotOwner,
    /// The command was run in a direct message.
    #[error("This command cannot be used in direct messages.")]
    NoDms,
    /// The command was run inside a guild.
    #[error("This command can only be used in direct messages.")]
    DmsOnly,
    /// The author lacks some of the required permissions.
    #[error("{}", missing_permissions_message(.missing))]
    MissingPermissions {
        /// Required permissions the author does not hold.
        missing: Permissions,
    },
    /// The author holds permissions the command requires them not to have.
    #[error("{}", forbidden_permissions_message(.present))]
    ForbiddenPermissions {
        /// Denied permissions the author holds.
        present: Permissions,
    },
    /// The author is not an administrator.
    #[error("You must be an administrator to run this command.")]
    NotAdmin,
    /// The author does not hold the required role(s).
    #[error("You are missing the required role(s) to run this command.")]
    MissingRole {
        /// The roles that were asked for.
        roles: Vec<RoleRef>,
    },
    /// The cooldown bucket for this invocation is exhausted.
    #[error("This command is on cooldown. Try again in {:.1}s.", .remaining.as_secs_f64())]
    CommandOnCooldown {
        /// Bucket key the invocation was counted against.
        key: ScopeKey,
        /// Time until a slot frees up.
        remaining: Duration,
    },
    /// Too many invocations are already running.
    #[error("This command has reached the concurrency limit ({in_flight} running, max {max}).")]
    MaxConcurrencyReached {
        /// Invocations running when the call was rejected.
        in_flight: usize,
        /// Configured limit.
        max: usize,
    },
    /// A user-supplied check returned `false`.
    #[error("The check `{check}` failed.")]
    Failed {
        /// Name of the failing check.
        check: String,
    },
}

impl CheckFailure {
    /// Remaining wait if this is a cooldown rejection.
    pub fn remaining_wait(&self) -> Option<Duration> {
        match self {
            CheckFailure::CommandOnCooldown { remaining, .. } => Some(*remaining),
            _ => None,
        }
    }

    /// Check if this rejection came from a cooldown bucket
    pub fn is_cooldown(&self) -> bool {
        matches!(self, CheckFailure::CommandOnCooldown { .. })
    }

    /// Check if this rejection came from a concurrency limiter
    pub fn is_concurrency(&self) -> bool {
        matches!(self, CheckFailure::MaxConcurrencyReached { .. })
    }
}

/// "You are missing A, B, and C permission(s) to run this command."
fn missing_permissions_message(missing: &Permissions) -> String {
    match join_names(missing) {
        Some(list) => format!("You are missing {} permission(s) to run this command.", list),
        None => String::from("You are missing the required permission(s) to run this command."),
    }
}

/// "You must not have A and B permission(s) to run this command."
fn forbidden_permissions_message(present: &Permissions) -> String {
    match join_names(present) {
        Some(list) => format!("You must not have {} permission(s) to run this command.", list),
        None => String::from("You hold a permission that is not allowed for this command."),
    }
}

fn join_names(perms: &Permissions) -> Option<String> {
    let names = perms.display_names();
    let (last, init) = names.split_last()?;
    Some(match init {
        [] => last.clone(),
        [first] => format!("{} and {}", first, last),
        _ => format!("{}, and {}", init.join(", "), last),
    })
}

/// Unified error type for guarded execution
#[derive(Debug, Clone)]
pub enum GuardError<E> {
    /// A check, cooldown or concurrency limit rejected the invocation
    Rejected(CheckFailure),
    /// No guard is registered under this command name
    UnknownCommand { name: String },
    /// The guarded handler itself failed
    Inner(E),
}

impl<E: fmt::Display> fmt::Display for GuardError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(failure) => write!(f, "command rejected: {}", failure),
            Self::UnknownCommand { name } => write!(f, "no command registered as '{}'", name),
            Self::Inner(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for GuardError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Rejected(failure) => Some(failure),
            Self::Inner(e) => Some(e),
            Self::UnknownCommand { .. } => None,
        }
    }
}

impl<E> From<CheckFailure> for GuardError<E> {
    fn from(failure: CheckFailure) -> Self {
        GuardError::Rejected(failure)
    }
}

impl<E> GuardError<E> {
    /// Check if a guard rejected the invocation
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
    /// Check if the rejection was a cooldown
    pub fn is_cooldown(&self) -> bool {
        matches!(self, Self::Rejected(failure) if failure.is_cooldown())
    }
    /// Check if the rejection was the concurrency limit
    pub fn is_concurrency(&self) -> bool {
        matches!(self, Self::Rejected(failure) if failure.is_concurrency())
    }
    /// Check if the command name was not registered
    pub fn is_unknown_command(&self) -> bool {
        matches!(self, Self::UnknownCommand { .. })
    }
    /// Check if this error wraps a handler error.
    pub fn is_inner(&self) -> bool {
        matches!(self, Self::Inner(_))
    }
    /// Borrow the rejection reason if present.
    pub fn failure(&self) -> Option<&CheckFailure> {
        match self {
            Self::Rejected(failure) => Some(failure),
            _ => None,
        }
    }
    /// Remaining cooldown if this is a cooldown rejection.
    pub fn remaining_wait(&self) -> Option<Duration> {
        self.failure().and_then(CheckFailure::remaining_wait)
    }
    /// Get the inner error if this is an Inner variant
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }
    /// Borrow the inner error if present.
    pub fn as_inner(&self) -> Option<&E> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }
}
