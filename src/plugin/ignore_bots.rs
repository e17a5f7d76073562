use crate::{event::*, plugin::*};
use anyhow::Result;
use serenity::all::Message;

/// Automated authors: bots (ourselves included), webhooks and Discord system messages.
fn is_automated(msg: &Message) -> bool {
    msg.author.bot || msg.author.system || msg.webhook_id.is_some()
}

/// Keeps automated messages away from the command dispatcher
pub struct IgnoreBots;

#[serenity::async_trait]
impl Plugin for IgnoreBots {
    fn name(&self) -> &'static str {
        "ignore_bots"
    }

    async fn handle(&self, _ctx: &Context, event: &Event) -> Result<EventHandled> {
        match event {
            Event::Message(msg) if is_automated(msg) => {
                tracing::trace!(author = %msg.author.name, "Ignoring automated message");
                Ok(EventHandled::Yes)
            }
            _ => Ok(EventHandled::No),
        }
    }
}
