use crate::{event::*, log_internal, plugin::*, timer::TimerKind};
use anyhow::Result;

/// Re-applies the muted role to members who leave and rejoin while muted
pub struct MutePersist;

#[serenity::async_trait]
impl Plugin for MutePersist {
    fn name(&self) -> &'static str {
        "mute_persist"
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Event::MemberJoin(member) = event else {
            return Ok(EventHandled::No);
        };

        let guild_id = member.guild_id;
        let user_id = member.user.id;
        let active = ctx
            .scheduler
            .find(|timer| timer.kind.is_mute_of(guild_id, user_id))
            .await;

        if let Some(TimerKind::Mute { role_id, .. }) = active.map(|timer| timer.kind) {
            ctx.http
                .add_member_role(guild_id, user_id, role_id, Some("Rejoined while muted"))
                .await?;
            log_internal!("Re-applied mute to {} who rejoined", member.user.name);
        }

        Ok(EventHandled::No)
    }
}
