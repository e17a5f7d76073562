use crate::{event::*, log_event, logging::*, plugin::*};
use anyhow::Result;

/// Prints debug information about events
pub struct Debug;

#[serenity::async_trait]
impl Plugin for Debug {
    fn name(&self) -> &'static str {
        "debug"
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        match event {
            Event::Ready(ready) => {
                log_event!(
                    "Connected to {} server(s) as {}",
                    ready.guilds.len(),
                    ready.user.color(),
                );
            }
            // Resolving names costs a request each, so only bother if it will be printed
            Event::Message(msg) if tracing::enabled!(tracing::Level::DEBUG) => {
                let guild = msg.guild_id.color(&ctx.http).await;
                let channel = msg.channel_id.color(&ctx.http).await;
                tracing::debug!(
                    "{}{}{}{}{} {}",
                    guild,
                    Glue.color(),
                    channel,
                    Glue.color(),
                    msg.author.color(),
                    msg.content,
                );
            }
            Event::Message(_) => {}
            Event::MemberJoin(member) => {
                let guild = Some(member.guild_id).color(&ctx.http).await;
                log_event!("{} joined {}", member.user.color(), guild);
            }
        }

        Ok(EventHandled::No)
    }
}
