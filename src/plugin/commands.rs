use crate::{event::*, plugin::*};
use anyhow::Result;

/// Hands messages to the command dispatcher
pub struct Commands;

#[serenity::async_trait]
impl Plugin for Commands {
    fn name(&self) -> &'static str {
        "commands"
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Event::Message(msg) = event else {
            return Ok(EventHandled::No);
        };

        ctx.dispatcher.dispatch(ctx, msg).await
    }
}
