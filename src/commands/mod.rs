//! Every chat command the bot understands, grouped by category.

use crate::framework::Command;

mod fun;
mod moderation;
mod owner;
mod place;
mod services;
mod utility;

/// Registration order is also the order within each help group.
pub fn all() -> Vec<Box<dyn Command>> {
    vec![
        // Fun
        Box::new(fun::Roll),
        Box::new(fun::EightBall),
        Box::new(fun::Choose),
        Box::new(fun::CoinFlip),
        // Moderation
        Box::new(moderation::Mute),
        Box::new(moderation::Unmute),
        Box::new(moderation::Kick),
        Box::new(moderation::Ban),
        Box::new(moderation::Purge),
        // Utility
        Box::new(utility::Ping),
        Box::new(utility::Help),
        Box::new(utility::Avatar),
        Box::new(utility::Remind),
        Box::new(utility::Reminders),
        Box::new(utility::Forget),
        // Owner
        Box::new(owner::Reload),
        Box::new(owner::Shutdown),
        Box::new(owner::SetStatus),
        // Services
        Box::new(services::Xkcd),
        Box::new(services::Osu),
        Box::new(services::Iss),
        Box::new(place::Place),
    ]
}
