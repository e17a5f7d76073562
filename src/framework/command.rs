use crate::{context::Context, framework::args::Args};
use anyhow::Result;
use serenity::all::{Message, Permissions};
use std::time::Duration;

/// Command category, used to organize the help listing.  Help lists groups in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Group {
    Fun,
    Moderation,
    Utility,
    Owner,
    Services,
}

impl Group {
    pub fn name(&self) -> &'static str {
        match self {
            Group::Fun => "Fun",
            Group::Moderation => "Moderation",
            Group::Utility => "Utility",
            Group::Owner => "Owner",
            Group::Services => "Services",
        }
    }
}

/// Who is allowed to invoke a command, and where.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Requirements {
    pub guild_only: bool,
    pub owner_only: bool,
    pub permissions: Permissions,
}

impl Default for Requirements {
    fn default() -> Self {
        Self::NONE
    }
}

/// The invoking user, as far as requirement checks are concerned.
#[derive(Clone, Copy, Debug)]
pub struct Caller {
    pub is_owner: bool,
    pub in_guild: bool,
    /// Guild-wide permissions.  `None` outside of guilds or when they could not be resolved.
    pub permissions: Option<Permissions>,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CheckFailure {
    #[error("This command can only be used in a server.")]
    GuildOnly,
    #[error("Only bot owners can use this command.")]
    OwnerOnly,
    #[error("You are missing the following permissions: {}", .0.get_permission_names().join(", "))]
    MissingPermissions(Permissions),
}

impl Requirements {
    pub const NONE: Self = Self {
        guild_only: false,
        owner_only: false,
        permissions: Permissions::empty(),
    };

    pub const fn owner() -> Self {
        Self {
            guild_only: false,
            owner_only: true,
            permissions: Permissions::empty(),
        }
    }

    pub const fn guild(permissions: Permissions) -> Self {
        Self {
            guild_only: true,
            owner_only: false,
            permissions,
        }
    }

    /// Owners skip permission checks, administrators hold every permission.
    pub fn check(&self, caller: &Caller) -> Result<(), CheckFailure> {
        if self.guild_only && !caller.in_guild {
            return Err(CheckFailure::GuildOnly);
        }
        if self.owner_only && !caller.is_owner {
            return Err(CheckFailure::OwnerOnly);
        }
        if caller.is_owner || self.permissions.is_empty() {
            return Ok(());
        }

        let granted = caller.permissions.unwrap_or(Permissions::empty());
        if granted.contains(Permissions::ADMINISTRATOR) {
            return Ok(());
        }

        let missing = self.permissions.difference(granted);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CheckFailure::MissingPermissions(missing))
        }
    }
}

/// A failure whose message should be shown to the invoking user as-is.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct UserError(pub String);

impl UserError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[serenity::async_trait]
pub trait Command: Send + Sync {
    /// Primary name, used to invoke the command and in help output
    fn name(&self) -> &'static str;
    /// Alternative names
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }
    fn group(&self) -> Group;
    /// Argument syntax, e.g. `<user> <duration> [reason]`
    fn usage(&self) -> &'static str {
        ""
    }
    /// One-line help text
    fn description(&self) -> &'static str;
    fn requirements(&self) -> Requirements {
        Requirements::NONE
    }
    /// Minimum time between two invocations by the same user
    fn cooldown(&self) -> Option<Duration> {
        None
    }
    /// Run the command.  Errors are reported back to the user by the dispatcher.
    async fn run(&self, ctx: &Context, msg: &Message, args: Args) -> Result<()>;
}

/// `;name <usage>`
pub fn usage_line(prefix: &str, command: &dyn Command) -> String {
    match command.usage() {
        "" => format!("{}{}", prefix, command.name()),
        usage => format!("{}{} {}", prefix, command.name(), usage),
    }
}
