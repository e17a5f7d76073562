use crate::{event::*, log_internal, plugin::*};
use anyhow::Result;
use serenity::all::ActivityData;

/// Restores persisted timers and sets the presence once connected.
pub struct Ready;

#[serenity::async_trait]
impl Plugin for Ready {
    fn name(&self) -> &'static str {
        "ready"
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Event::Ready(_) = event else {
            return Ok(EventHandled::No);
        };

        if let Some(status) = ctx.cfg.read().await.general.status.clone() {
            ctx.cache_http.set_activity(Some(ActivityData::playing(status)));
        }

        // Ready is delivered again after reconnecting.  Timers which are already armed are
        // skipped.
        let restored = ctx.scheduler.restore().await?;
        if restored > 0 {
            log_internal!("Restored {} persisted timer(s)", restored);
        }

        Ok(EventHandled::Yes)
    }
}
