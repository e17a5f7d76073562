use crate::{context::Context, event::Event, event::EventHandled};
use anyhow::Result;

mod commands;
mod debug;
mod ignore_bots;
mod mute_persist;
mod ready;

/// An event listener
#[serenity::async_trait]
pub trait Plugin: Sync + Send {
    /// Plugin name.  Used for debug
    fn name(&self) -> &'static str;
    /// Potentially handle event.  Returns:
    /// - Ok(EventHandled::Yes) if the event has been handled and no other plugin should attempt to
    /// handle it
    /// - Ok(EventHandled::No) if another plugin should attempt to handle the event
    /// - Err if an error occurred
    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled>;
}

/// Ordered list of available plugins
pub fn plugins() -> Vec<Box<dyn Plugin>> {
    vec![
        // Core bot operations
        Box::new(debug::Debug),
        Box::new(ignore_bots::IgnoreBots),
        Box::new(ready::Ready),
        // Moderation
        Box::new(mute_persist::MutePersist),
        // Command dispatch.  Keep last.
        Box::new(commands::Commands),
    ]
}
