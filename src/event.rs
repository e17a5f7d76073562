//! The Serenity crate we're using for the Discord API is designed around callbacks to handle
//! events.  This module funnels those callbacks into a single Event enum which is offered to each
//! plugin in turn.

use crate::context::Context;
use serenity::all::{Member, Message, Ready};

/// A Discord event
pub enum Event {
    Ready(Ready),
    Message(Message),
    MemberJoin(Member),
}

impl Event {
    /// Offer the event to each plugin, in order, until one reports it handled.
    pub async fn handle(self, ctx: Context) {
        for plugin in crate::plugin::plugins() {
            match plugin.handle(&ctx, &self).await {
                Ok(EventHandled::Yes) => return,
                Ok(EventHandled::No) => continue,
                Err(err) => {
                    tracing::error!(plugin = plugin.name(), error = ?err, "Plugin failed")
                }
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum EventHandled {
    Yes,
    No,
}
