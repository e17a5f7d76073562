use crate::place::Canvas;
use serenity::all::UserId;
use std::{collections::HashMap, time::Duration};
use tokio::time::Instant;

/// State which is lost across sessions
pub struct VolatileState {
    pub cooldowns: Cooldowns,
    /// Loaded from disk on first use
    pub canvas: Option<Canvas>,
}

/// When each command becomes available again, per user.  Expired entries are dropped whenever a
/// new one is added.
pub struct Cooldowns(HashMap<(&'static str, UserId), Instant>);

impl VolatileState {
    pub fn new() -> Self {
        Self {
            cooldowns: Cooldowns::new(),
            canvas: None,
        }
    }
}

impl Cooldowns {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Time left before `user` may run `command` again, if any.
    pub fn remaining(&self, command: &'static str, user: UserId) -> Option<Duration> {
        let until = self.0.get(&(command, user))?;
        until
            .checked_duration_since(Instant::now())
            .filter(|left| !left.is_zero())
    }

    /// Start a cooldown of `cooldown` for `user` on `command`.
    pub fn touch(&mut self, command: &'static str, user: UserId, cooldown: Duration) {
        let now = Instant::now();
        self.0.retain(|_, until| *until > now);
        self.0.insert((command, user), now + cooldown);
    }

    /// Give back a cooldown, e.g. when the invocation was rejected for bad arguments.
    pub fn refund(&mut self, command: &'static str, user: UserId) {
        self.0.remove(&(command, user));
    }
}
