use crate::{
    context::Context,
    framework::{
        transformer::{DurationArg, Integer, Optional, Rest, UserMention},
        Args, Command, Group, Requirements, UserError,
    },
    helper::format_duration,
    log_internal,
    timer::TimerKind,
};
use anyhow::Result;
use chrono::Utc;
use serenity::all::{
    EditRole, GetMessages, GuildId, Mentionable, Message, MessageId, PermissionOverwrite,
    PermissionOverwriteType, Permissions, RoleId, UserId,
};
use std::time::Duration;

/// Discord caps timeouts at 28 days, and so do we
const MAX_MUTE: Duration = Duration::from_secs(28 * 24 * 60 * 60);
/// Bulk deletion only accepts messages younger than two weeks
const BULK_DELETE_MAX_AGE_SECS: i64 = 14 * 24 * 60 * 60;

/// Permissions the muted role is denied in every channel
fn muted_overwrite_deny() -> Permissions {
    Permissions::SEND_MESSAGES
        | Permissions::SEND_MESSAGES_IN_THREADS
        | Permissions::CREATE_PUBLIC_THREADS
        | Permissions::CREATE_PRIVATE_THREADS
        | Permissions::ADD_REACTIONS
        | Permissions::SPEAK
}

fn guild_of(msg: &Message) -> Result<GuildId> {
    msg.guild_id
        .ok_or_else(|| UserError::new("This command can only be used in a server.").into())
}

fn refuse_self(author: UserId, target: UserId, action: &str) -> Result<()> {
    if target == author {
        return Err(UserError::new(format!("You can't {action} yourself.")).into());
    }
    Ok(())
}

/// How many messages one purge may delete, from the configured maximum
fn purge_count(max_purge: u8) -> Integer {
    Integer::range(2, i64::from(max_purge.clamp(2, 100)))
}

/// Ids of the messages young enough to be bulk deleted at `now` (unix seconds).
fn deletable(messages: &[Message], now: i64) -> Vec<MessageId> {
    let cutoff = now - BULK_DELETE_MAX_AGE_SECS;
    messages
        .iter()
        .filter(|m| m.timestamp.unix_timestamp() > cutoff)
        .map(|m| m.id)
        .collect()
}

/// The role named `name`, created with channel overwrites if it does not exist yet.
async fn muted_role(ctx: &Context, guild_id: GuildId, name: &str) -> Result<RoleId> {
    let roles = guild_id.roles(&ctx.http).await?;
    if let Some(role) = roles.values().find(|role| role.name.eq_ignore_ascii_case(name)) {
        return Ok(role.id);
    }

    let role = guild_id
        .create_role(
            &ctx.cache_http,
            EditRole::new().name(name).permissions(Permissions::empty()),
        )
        .await?;
    log_internal!("Created muted role \"{}\" in guild {}", name, guild_id);

    let overwrite = PermissionOverwrite {
        allow: Permissions::empty(),
        deny: muted_overwrite_deny(),
        kind: PermissionOverwriteType::Role(role.id),
    };
    for channel_id in guild_id.channels(&ctx.http).await?.into_keys() {
        if let Err(err) = channel_id
            .create_permission(&ctx.http, overwrite.clone())
            .await
        {
            tracing::warn!(channel = %channel_id, error = %err, "Could not restrict muted role");
        }
    }

    Ok(role.id)
}

pub struct Mute;

#[serenity::async_trait]
impl Command for Mute {
    fn name(&self) -> &'static str {
        "mute"
    }

    fn group(&self) -> Group {
        Group::Moderation
    }

    fn usage(&self) -> &'static str {
        "<user> <duration> [reason]"
    }

    fn description(&self) -> &'static str {
        "mute a member for a while"
    }

    fn requirements(&self) -> Requirements {
        Requirements::guild(Permissions::MANAGE_ROLES)
    }

    async fn run(&self, ctx: &Context, msg: &Message, mut args: Args) -> Result<()> {
        let user_id = args.parse(&UserMention)?;
        let duration = args.parse(&DurationArg::max(MAX_MUTE))?;
        let reason = args.parse(&Optional(Rest))?;
        let guild_id = guild_of(msg)?;
        refuse_self(msg.author.id, user_id, "mute")?;

        let role_name = ctx.cfg.read().await.moderation.muted_role_name.clone();
        let role_id = muted_role(ctx, guild_id, &role_name).await?;
        ctx.http
            .add_member_role(guild_id, user_id, role_id, reason.as_deref())
            .await?;

        // Muting again replaces the previous timer
        let expires_at = Utc::now() + chrono::Duration::from_std(duration)?;
        ctx.scheduler
            .replace(
                |timer| timer.kind.is_mute_of(guild_id, user_id),
                TimerKind::Mute {
                    guild_id,
                    user_id,
                    role_id,
                },
                expires_at,
            )
            .await?;

        msg.reply(
            &ctx.cache_http,
            format!(
                "Muted {} for {}.",
                user_id.mention(),
                format_duration(duration)
            ),
        )
        .await?;
        Ok(())
    }
}

pub struct Unmute;

#[serenity::async_trait]
impl Command for Unmute {
    fn name(&self) -> &'static str {
        "unmute"
    }

    fn group(&self) -> Group {
        Group::Moderation
    }

    fn usage(&self) -> &'static str {
        "<user>"
    }

    fn description(&self) -> &'static str {
        "lift a mute early"
    }

    fn requirements(&self) -> Requirements {
        Requirements::guild(Permissions::MANAGE_ROLES)
    }

    async fn run(&self, ctx: &Context, msg: &Message, mut args: Args) -> Result<()> {
        let user_id = args.parse(&UserMention)?;
        args.finish()?;
        let guild_id = guild_of(msg)?;

        let cancelled = ctx
            .scheduler
            .cancel(|timer| timer.kind.is_mute_of(guild_id, user_id))
            .await?;
        let role_id = match cancelled.into_iter().find_map(|timer| match timer.kind {
            TimerKind::Mute { role_id, .. } => Some(role_id),
            _ => None,
        }) {
            Some(role_id) => role_id,
            None => {
                // Muted by hand, or the timer was lost
                let role_name = ctx.cfg.read().await.moderation.muted_role_name.clone();
                let roles = guild_id.roles(&ctx.http).await?;
                roles
                    .values()
                    .find(|role| role.name.eq_ignore_ascii_case(&role_name))
                    .map(|role| role.id)
                    .ok_or_else(|| UserError::new("Nobody is muted here."))?
            }
        };

        ctx.http
            .remove_member_role(guild_id, user_id, role_id, Some("Unmuted"))
            .await?;
        msg.reply(&ctx.cache_http, format!("Unmuted {}.", user_id.mention()))
            .await?;
        Ok(())
    }
}

pub struct Kick;

#[serenity::async_trait]
impl Command for Kick {
    fn name(&self) -> &'static str {
        "kick"
    }

    fn group(&self) -> Group {
        Group::Moderation
    }

    fn usage(&self) -> &'static str {
        "<user> [reason]"
    }

    fn description(&self) -> &'static str {
        "kick a member"
    }

    fn requirements(&self) -> Requirements {
        Requirements::guild(Permissions::KICK_MEMBERS)
    }

    async fn run(&self, ctx: &Context, msg: &Message, mut args: Args) -> Result<()> {
        let user_id = args.parse(&UserMention)?;
        let reason = args.parse(&Optional(Rest))?;
        let guild_id = guild_of(msg)?;
        refuse_self(msg.author.id, user_id, "kick")?;

        match &reason {
            Some(reason) => guild_id.kick_with_reason(&ctx.http, user_id, reason).await?,
            None => guild_id.kick(&ctx.http, user_id).await?,
        }
        msg.reply(&ctx.cache_http, format!("Kicked {}.", user_id.mention()))
            .await?;
        Ok(())
    }
}

pub struct Ban;

#[serenity::async_trait]
impl Command for Ban {
    fn name(&self) -> &'static str {
        "ban"
    }

    fn group(&self) -> Group {
        Group::Moderation
    }

    fn usage(&self) -> &'static str {
        "<user> [reason]"
    }

    fn description(&self) -> &'static str {
        "ban a user"
    }

    fn requirements(&self) -> Requirements {
        Requirements::guild(Permissions::BAN_MEMBERS)
    }

    async fn run(&self, ctx: &Context, msg: &Message, mut args: Args) -> Result<()> {
        let user_id = args.parse(&UserMention)?;
        let reason = args.parse(&Optional(Rest))?;
        let guild_id = guild_of(msg)?;
        refuse_self(msg.author.id, user_id, "ban")?;

        match &reason {
            Some(reason) => {
                guild_id
                    .ban_with_reason(&ctx.http, user_id, 0, reason)
                    .await?
            }
            None => guild_id.ban(&ctx.http, user_id, 0).await?,
        }
        msg.reply(&ctx.cache_http, format!("Banned {}.", user_id.mention()))
            .await?;
        Ok(())
    }
}

pub struct Purge;

#[serenity::async_trait]
impl Command for Purge {
    fn name(&self) -> &'static str {
        "purge"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["prune"]
    }

    fn group(&self) -> Group {
        Group::Moderation
    }

    fn usage(&self) -> &'static str {
        "<count>"
    }

    fn description(&self) -> &'static str {
        "bulk delete recent messages"
    }

    fn requirements(&self) -> Requirements {
        Requirements::guild(Permissions::MANAGE_MESSAGES)
    }

    async fn run(&self, ctx: &Context, msg: &Message, mut args: Args) -> Result<()> {
        let max_purge = ctx.cfg.read().await.moderation.max_purge;
        let count = args.parse(&purge_count(max_purge))?;
        args.finish()?;

        let limit = u8::try_from(count)?;
        let messages = msg
            .channel_id
            .messages(&ctx.cache_http, GetMessages::new().before(msg.id).limit(limit))
            .await?;
        let ids = deletable(&messages, Utc::now().timestamp());

        match ids.as_slice() {
            [] => return Err(UserError::new("There is nothing recent enough to delete.").into()),
            [single] => msg.channel_id.delete_message(&ctx.http, *single).await?,
            many => msg.channel_id.delete_messages(&ctx.http, many).await?,
        }

        log_internal!(
            "{} purged {} message(s) in channel {}",
            msg.author.name,
            ids.len(),
            msg.channel_id
        );
        msg.channel_id
            .say(&ctx.http, format!("Deleted {} message(s).", ids.len()))
            .await?;
        Ok(())
    }
}
