//! Miscellaneous convenience methods

use crate::context::Context;
use anyhow::Result;
use serenity::all::{CreateAllowedMentions, CreateMessage, Message, Permissions};
use std::time::Duration;

#[serenity::async_trait]
pub trait MessageHelper {
    async fn is_from_owner(&self, ctx: &Context) -> bool;
    async fn guild_permissions(&self, ctx: &Context) -> Option<Permissions>;
    /// Reply without pinging anyone, for text that may contain user input.
    async fn reply_quietly(&self, ctx: &Context, content: String) -> Result<Message>;
}

#[serenity::async_trait]
impl MessageHelper for serenity::all::Message {
    async fn is_from_owner(&self, ctx: &Context) -> bool {
        ctx.cfg
            .read()
            .await
            .general
            .bot_owners
            .contains(&self.author.id)
    }

    /// Guild-wide permissions of the author.  `None` in direct messages or if the member or guild
    /// cannot be resolved.
    async fn guild_permissions(&self, ctx: &Context) -> Option<Permissions> {
        let guild_id = self.guild_id?;
        let member = guild_id
            .member(&ctx.cache_http, self.author.id)
            .await
            .ok()?;
        let guild = ctx.cache.guild(guild_id)?;

        #[allow(deprecated)]
        Some(guild.member_permissions(&member))
    }

    async fn reply_quietly(&self, ctx: &Context, content: String) -> Result<Message> {
        let reply = quiet_message(content).reference_message(self);
        Ok(self.channel_id.send_message(&ctx.cache_http, reply).await?)
    }
}

/// A message whose mentions render but notify nobody.
pub fn quiet_message(content: impl Into<String>) -> CreateMessage {
    CreateMessage::new()
        .content(content)
        .allowed_mentions(CreateAllowedMentions::new().replied_user(false))
}

/// Whole seconds, rounded up, so that a pending wait never reads as zero.
pub fn ceil_secs(duration: Duration) -> Duration {
    let secs = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
    Duration::from_secs(secs)
}

/// Human readable duration, e.g. `1 day, 2 hours, 5 seconds`.  Sub-second precision is dropped.
pub fn format_duration(duration: Duration) -> String {
    const UNITS: [(u64, &str); 4] = [
        (24 * 60 * 60, "day"),
        (60 * 60, "hour"),
        (60, "minute"),
        (1, "second"),
    ];

    let mut remaining = duration.as_secs();
    let mut parts = Vec::new();
    for (size, name) in UNITS {
        let amount = remaining / size;
        remaining %= size;
        match amount {
            0 => {}
            1 => parts.push(format!("1 {name}")),
            n => parts.push(format!("{n} {name}s")),
        }
    }

    if parts.is_empty() {
        return "0 seconds".to_owned();
    }
    parts.join(", ")
}
