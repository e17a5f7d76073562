use crate::{
    context::Context,
    framework::{
        command::usage_line,
        transformer::{DurationArg, Integer, Optional, Rest, UserMention, Word},
        Args, Command, Dispatcher, Group, UserError,
    },
    helper::{format_duration, MessageHelper},
    timer::{Timer, TimerKind},
};
use anyhow::Result;
use chrono::Utc;
use serenity::all::{CreateEmbed, CreateMessage, EditMessage, Message};
use std::time::{Duration, Instant};

const MAX_REMIND: Duration = Duration::from_secs(365 * 24 * 60 * 60);

pub struct Ping;

#[serenity::async_trait]
impl Command for Ping {
    fn name(&self) -> &'static str {
        "ping"
    }

    fn group(&self) -> Group {
        Group::Utility
    }

    fn description(&self) -> &'static str {
        "check that the bot is alive"
    }

    async fn run(&self, ctx: &Context, msg: &Message, args: Args) -> Result<()> {
        args.finish()?;

        let start = Instant::now();
        let mut reply = msg.reply(&ctx.cache_http, "Pong!").await?;
        let elapsed = start.elapsed();
        reply
            .edit(
                &ctx.cache_http,
                EditMessage::new().content(format!("Pong! ({} ms)", elapsed.as_millis())),
            )
            .await?;
        Ok(())
    }
}

/// Every group and its commands.  Owner commands are only listed for owners.
pub fn render_overview(prefix: &str, dispatcher: &Dispatcher, show_owner: bool) -> String {
    let mut out = String::from("```\n");
    for (group, commands) in dispatcher.by_group() {
        if group == Group::Owner && !show_owner {
            continue;
        }
        out.push_str(group.name());
        out.push_str(":\n");
        for command in commands {
            out.push_str(&format!(
                "  {} - {}\n",
                usage_line(prefix, command.as_ref()),
                command.description()
            ));
        }
    }
    out.push_str(&format!(
        "```\nUse `{prefix}help <command>` for details on a command."
    ));
    out
}

pub fn render_detail(prefix: &str, command: &dyn Command) -> String {
    let mut out = format!("`{}`\n{}", usage_line(prefix, command), command.description());
    if !command.aliases().is_empty() {
        let aliases: Vec<String> = command
            .aliases()
            .iter()
            .map(|alias| format!("`{prefix}{alias}`"))
            .collect();
        out.push_str(&format!("\nAliases: {}", aliases.join(", ")));
    }
    if let Some(cooldown) = command.cooldown() {
        out.push_str(&format!("\nCooldown: {}", format_duration(cooldown)));
    }
    out
}

pub struct Help;

#[serenity::async_trait]
impl Command for Help {
    fn name(&self) -> &'static str {
        "help"
    }

    fn group(&self) -> Group {
        Group::Utility
    }

    fn usage(&self) -> &'static str {
        "[command]"
    }

    fn description(&self) -> &'static str {
        "list commands, or describe one"
    }

    async fn run(&self, ctx: &Context, msg: &Message, mut args: Args) -> Result<()> {
        let name = args.parse(&Optional(Word))?;
        args.finish()?;

        let prefix = ctx.cfg.read().await.general.command_prefix.clone();
        let reply = match name {
            Some(name) => {
                let name = name.trim_start_matches(prefix.as_str());
                let Some(command) = ctx.dispatcher.find(name) else {
                    return Err(UserError::new(format!("There is no command called `{name}`.")).into());
                };
                render_detail(&prefix, command.as_ref())
            }
            None => {
                let show_owner = msg.is_from_owner(ctx).await;
                render_overview(&prefix, &ctx.dispatcher, show_owner)
            }
        };

        msg.reply_quietly(ctx, reply).await?;
        Ok(())
    }
}

pub struct Avatar;

#[serenity::async_trait]
impl Command for Avatar {
    fn name(&self) -> &'static str {
        "avatar"
    }

    fn group(&self) -> Group {
        Group::Utility
    }

    fn usage(&self) -> &'static str {
        "[user]"
    }

    fn description(&self) -> &'static str {
        "show someone's avatar, yours by default"
    }

    async fn run(&self, ctx: &Context, msg: &Message, mut args: Args) -> Result<()> {
        let user_id = args.parse(&Optional(UserMention))?;
        args.finish()?;

        let user = match user_id {
            Some(user_id) if user_id != msg.author.id => user_id.to_user(&ctx.cache_http).await?,
            _ => msg.author.clone(),
        };

        let embed = CreateEmbed::new()
            .title(format!("{}'s avatar", user.name))
            .url(user.face())
            .image(user.face());
        msg.channel_id
            .send_message(
                &ctx.cache_http,
                CreateMessage::new().embed(embed).reference_message(msg),
            )
            .await?;
        Ok(())
    }
}

pub struct Remind;

#[serenity::async_trait]
impl Command for Remind {
    fn name(&self) -> &'static str {
        "remind"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["remindme"]
    }

    fn group(&self) -> Group {
        Group::Utility
    }

    fn usage(&self) -> &'static str {
        "<duration> <message>"
    }

    fn description(&self) -> &'static str {
        "get pinged here after a while, e.g. `2h30m take out the bins`"
    }

    async fn run(&self, ctx: &Context, msg: &Message, mut args: Args) -> Result<()> {
        let duration = args.parse(&DurationArg::max(MAX_REMIND))?;
        let message = args.parse(&Rest)?;

        let expires_at = Utc::now() + chrono::Duration::from_std(duration)?;
        let timer = ctx
            .scheduler
            .schedule(
                TimerKind::Remind {
                    channel_id: msg.channel_id,
                    user_id: msg.author.id,
                    message,
                },
                expires_at,
            )
            .await?;

        msg.reply(
            &ctx.cache_http,
            format!(
                "I'll remind you in {} (reminder #{}).",
                format_duration(duration),
                timer.id
            ),
        )
        .await?;
        Ok(())
    }
}

/// One line per pending reminder, soonest first.
pub fn describe_reminders(timers: &[Timer]) -> String {
    if timers.is_empty() {
        return "You have no pending reminders.".to_owned();
    }

    let lines: Vec<String> = timers
        .iter()
        .filter_map(|timer| match &timer.kind {
            TimerKind::Remind { message, .. } => Some(format!(
                "#{} in {}: {}",
                timer.id,
                format_duration(timer.remaining()),
                message
            )),
            _ => None,
        })
        .collect();
    lines.join("\n")
}

pub struct Reminders;

#[serenity::async_trait]
impl Command for Reminders {
    fn name(&self) -> &'static str {
        "reminders"
    }

    fn group(&self) -> Group {
        Group::Utility
    }

    fn description(&self) -> &'static str {
        "list your pending reminders"
    }

    async fn run(&self, ctx: &Context, msg: &Message, args: Args) -> Result<()> {
        args.finish()?;

        let author = msg.author.id;
        let timers = ctx
            .scheduler
            .list(|timer| timer.kind.is_reminder_of(author))
            .await;
        // Stored reminder text is user input
        msg.reply_quietly(ctx, describe_reminders(&timers)).await?;
        Ok(())
    }
}

pub struct Forget;

#[serenity::async_trait]
impl Command for Forget {
    fn name(&self) -> &'static str {
        "forget"
    }

    fn group(&self) -> Group {
        Group::Utility
    }

    fn usage(&self) -> &'static str {
        "<id>"
    }

    fn description(&self) -> &'static str {
        "cancel one of your reminders"
    }

    async fn run(&self, ctx: &Context, msg: &Message, mut args: Args) -> Result<()> {
        let id = args.parse(&Integer::range(1, i64::MAX))?;
        args.finish()?;

        let id = id.unsigned_abs();
        let author = msg.author.id;
        let cancelled = ctx
            .scheduler
            .cancel(|timer| timer.id == id && timer.kind.is_reminder_of(author))
            .await?;
        if cancelled.is_empty() {
            return Err(UserError::new(format!("You have no reminder #{id}.")).into());
        }

        msg.reply(&ctx.cache_http, format!("Forgot reminder #{id}."))
            .await?;
        Ok(())
    }
}
