//! Routes prefixed messages to commands.

use crate::{
    context::Context,
    event::EventHandled,
    framework::{
        args::Args,
        command::{usage_line, Caller, CheckFailure, Command, Group, UserError},
        transformer::TransformError,
    },
    helper::{ceil_secs, format_duration, MessageHelper},
    volatile_state::Cooldowns,
};
use anyhow::Result;
use serenity::all::{Message, UserId};
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
    time::Duration,
};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("`{name}` is registered by both `{first}` and `{second}`")]
    Duplicate {
        name: String,
        first: &'static str,
        second: &'static str,
    },
}

/// Every registered command, indexed by name and alias
pub struct Dispatcher {
    commands: Vec<Arc<dyn Command>>,
    index: HashMap<String, usize>,
}

impl Dispatcher {
    pub fn new(commands: Vec<Box<dyn Command>>) -> Result<Self, RegistryError> {
        let commands: Vec<Arc<dyn Command>> = commands.into_iter().map(Arc::from).collect();
        let mut index = HashMap::new();

        for (i, command) in commands.iter().enumerate() {
            let names = std::iter::once(command.name()).chain(command.aliases().iter().copied());
            for name in names {
                if let Some(&existing) = index.get(&name.to_lowercase()) {
                    let first: &Arc<dyn Command> = &commands[existing];
                    return Err(RegistryError::Duplicate {
                        name: name.to_owned(),
                        first: first.name(),
                        second: command.name(),
                    });
                }
                index.insert(name.to_lowercase(), i);
            }
        }

        Ok(Self { commands, index })
    }

    /// Case-insensitive lookup by name or alias
    pub fn find(&self, name: &str) -> Option<&Arc<dyn Command>> {
        self.index
            .get(&name.to_lowercase())
            .map(|&i| &self.commands[i])
    }

    /// Commands in registration order
    pub fn commands(&self) -> impl Iterator<Item = &Arc<dyn Command>> {
        self.commands.iter()
    }

    pub fn by_group(&self) -> BTreeMap<Group, Vec<&Arc<dyn Command>>> {
        let mut groups: BTreeMap<Group, Vec<&Arc<dyn Command>>> = BTreeMap::new();
        for command in self.commands() {
            groups.entry(command.group()).or_default().push(command);
        }
        groups
    }

    /// Handle `msg` if it invokes a known command.  The command itself runs on its own task; this
    /// returns once it has been started.
    pub async fn dispatch(&self, ctx: &Context, msg: &Message) -> Result<EventHandled> {
        if msg.author.bot {
            return Ok(EventHandled::No);
        }

        let (prefix, mention_prefix) = {
            let cfg = ctx.cfg.read().await;
            (
                cfg.general.command_prefix.clone(),
                cfg.general.mention_prefix,
            )
        };
        let bot_id = mention_prefix.then(|| ctx.cache.current_user().id);

        let Some((name, rest)) = parse_invocation(&msg.content, &prefix, bot_id) else {
            return Ok(EventHandled::No);
        };
        let Some(command) = self.find(name) else {
            return Ok(EventHandled::No);
        };

        tracing::info!(
            command = command.name(),
            user = %msg.author.name,
            guild = ?msg.guild_id.map(|id| id.get()),
            "Invoking command"
        );

        let caller = Caller {
            is_owner: msg.is_from_owner(ctx).await,
            in_guild: msg.guild_id.is_some(),
            permissions: msg.guild_permissions(ctx).await,
        };
        let verdict = {
            let mut vstate = ctx.vstate.write().await;
            gate(
                command.as_ref(),
                &caller,
                &mut vstate.cooldowns,
                msg.author.id,
            )
        };
        match verdict {
            Gate::Open => {}
            Gate::Refused(failure) => {
                tracing::info!(command = command.name(), %failure, "Refused command");
                msg.reply_quietly(ctx, failure.to_string()).await?;
                return Ok(EventHandled::Yes);
            }
            Gate::CoolingDown(remaining) => {
                let reply = format!(
                    "Slow down! You can use `{}` again in {}.",
                    command.name(),
                    format_duration(ceil_secs(remaining))
                );
                msg.reply_quietly(ctx, reply).await?;
                return Ok(EventHandled::Yes);
            }
        }

        let args = Args::new(rest);
        let command = Arc::clone(command);
        let ctx = ctx.clone();
        let msg = msg.clone();
        tokio::spawn(async move {
            let Err(err) = command.run(&ctx, &msg, args).await else {
                return;
            };

            if refunds_cooldown(&err) {
                ctx.vstate
                    .write()
                    .await
                    .cooldowns
                    .refund(command.name(), msg.author.id);
            }
            let usage = usage_line(&prefix, command.as_ref());
            let reply = error_reply(command.name(), &err, &usage);
            if let Err(err) = msg.reply_quietly(&ctx, reply).await {
                tracing::warn!(command = command.name(), error = %err, "Could not report error");
            }
        });

        Ok(EventHandled::Yes)
    }
}

/// Splits `content` into command name and argument text if it starts with `prefix` or, when
/// `bot_id` is given, a mention of the bot.
pub fn parse_invocation<'a>(
    content: &'a str,
    prefix: &str,
    bot_id: Option<UserId>,
) -> Option<(&'a str, &'a str)> {
    let content = content.trim_start();

    let body = match content.strip_prefix(prefix) {
        Some(body) if !prefix.is_empty() => body,
        _ => {
            let bot_id = bot_id?;
            let plain = format!("<@{}>", bot_id);
            let nick = format!("<@!{}>", bot_id);
            content
                .strip_prefix(plain.as_str())
                .or_else(|| content.strip_prefix(nick.as_str()))?
                .trim_start()
        }
    };

    let end = body.find(char::is_whitespace).unwrap_or(body.len());
    let (name, rest) = body.split_at(end);
    if name.is_empty() {
        return None;
    }
    Some((name, rest))
}

/// Whether an invocation may start, checked before its task is spawned.
#[derive(Debug, PartialEq)]
enum Gate {
    Open,
    Refused(CheckFailure),
    CoolingDown(Duration),
}

/// Requirements are checked before the cooldown, so a refused invocation never starts one.  An
/// open gate has already started the cooldown.
fn gate(command: &dyn Command, caller: &Caller, cooldowns: &mut Cooldowns, user: UserId) -> Gate {
    if let Err(failure) = command.requirements().check(caller) {
        return Gate::Refused(failure);
    }
    if let Some(cooldown) = command.cooldown() {
        if let Some(remaining) = cooldowns.remaining(command.name(), user) {
            return Gate::CoolingDown(remaining);
        }
        cooldowns.touch(command.name(), user, cooldown);
    }
    Gate::Open
}

/// Malformed arguments do not count as a use of the command.
fn refunds_cooldown(err: &anyhow::Error) -> bool {
    err.downcast_ref::<TransformError>().is_some()
}

/// Message shown to the user when a command fails.  Unexpected errors are logged here.
fn error_reply(command: &str, err: &anyhow::Error, usage: &str) -> String {
    if let Some(err) = err.downcast_ref::<TransformError>() {
        format!("Invalid arguments: {}.\nUsage: `{}`", err, usage)
    } else if let Some(err) = err.downcast_ref::<UserError>() {
        err.to_string()
    } else {
        tracing::error!(command, error = ?err, "Command failed");
        "Something went wrong while running that command.".to_owned()
    }
}
