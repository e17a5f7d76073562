//! Persisted one-shot timers.
//!
//! A timer is a record in [`PersistentState`] plus a tokio task sleeping until the record expires.
//! When it fires, the [`TimerSink`] performs the deferred action and the record is removed from
//! storage.  Records survive restarts and are re-armed by [`Scheduler::restore`].

use crate::{log_internal, persistent_state::PersistentState};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serenity::all::{
    ChannelId, CreateAllowedMentions, CreateMessage, GuildId, Http, Mentionable, RoleId, UserId,
};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{
    sync::{Mutex, RwLock},
    task::JoinHandle,
};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Timer {
    pub id: u64,
    pub expires_at: DateTime<Utc>,
    pub kind: TimerKind,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimerKind {
    /// Remove `role_id` from the member again
    Mute {
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
    },
    /// Ping `user_id` in `channel_id` with `message`
    Remind {
        channel_id: ChannelId,
        user_id: UserId,
        message: String,
    },
    /// User may not draw on the place canvas until this expires
    PlaceCooldown { user_id: UserId },
}

impl Timer {
    /// Time until the timer fires, zero if overdue.
    pub fn remaining(&self) -> Duration {
        (self.expires_at - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

impl TimerKind {
    pub fn is_mute_of(&self, guild: GuildId, user: UserId) -> bool {
        matches!(self, TimerKind::Mute { guild_id, user_id, .. } if *guild_id == guild && *user_id == user)
    }

    pub fn is_reminder_of(&self, user: UserId) -> bool {
        matches!(self, TimerKind::Remind { user_id, .. } if *user_id == user)
    }

    pub fn is_place_cooldown_of(&self, user: UserId) -> bool {
        matches!(self, TimerKind::PlaceCooldown { user_id } if *user_id == user)
    }
}

/// Performs the action of a fired timer.
#[serenity::async_trait]
pub trait TimerSink: Send + Sync {
    async fn fire(&self, timer: &Timer) -> Result<()>;
}

/// Carries out timers against the Discord API.
pub struct DiscordTimerSink {
    http: Arc<Http>,
}

impl DiscordTimerSink {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[serenity::async_trait]
impl TimerSink for DiscordTimerSink {
    async fn fire(&self, timer: &Timer) -> Result<()> {
        match &timer.kind {
            TimerKind::Mute {
                guild_id,
                user_id,
                role_id,
            } => {
                self.http
                    .remove_member_role(*guild_id, *user_id, *role_id, Some("Mute expired"))
                    .await?;
                log_internal!("Mute of user {} in guild {} expired", user_id, guild_id);
            }
            TimerKind::Remind {
                channel_id,
                user_id,
                message,
            } => {
                let reminder = CreateMessage::new()
                    .content(format!(
                        "{}, you asked me to remind you: {}",
                        user_id.mention(),
                        message
                    ))
                    .allowed_mentions(CreateAllowedMentions::new().users(vec![*user_id]));
                channel_id.send_message(&self.http, reminder).await?;
                log_internal!("Delivered reminder #{} to user {}", timer.id, user_id);
            }
            TimerKind::PlaceCooldown { .. } => {}
        }
        Ok(())
    }
}

/// Arms, restores and cancels timers.
pub struct Scheduler {
    store: Arc<RwLock<PersistentState>>,
    sink: Arc<dyn TimerSink>,
    armed: Mutex<HashMap<u64, JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(store: Arc<RwLock<PersistentState>>, sink: Arc<dyn TimerSink>) -> Arc<Self> {
        Arc::new(Self {
            store,
            sink,
            armed: Mutex::new(HashMap::new()),
        })
    }

    /// Persist a new timer and arm it.  Nothing is kept if it cannot be persisted.
    pub async fn schedule(self: &Arc<Self>, kind: TimerKind, expires_at: DateTime<Utc>) -> Result<Timer> {
        let timer = {
            let mut state = self.store.write().await;
            let timer = Timer {
                id: state.allocate_timer_id(),
                expires_at,
                kind,
            };
            state.timers.push(timer.clone());
            if let Err(err) = state.save().await {
                state.timers.retain(|t| t.id != timer.id);
                return Err(err);
            }
            timer
        };

        self.arm(timer.clone()).await;
        Ok(timer)
    }

    /// Cancel every timer matching `predicate`, then schedule a new one in its place.
    pub async fn replace<F>(
        self: &Arc<Self>,
        predicate: F,
        kind: TimerKind,
        expires_at: DateTime<Utc>,
    ) -> Result<Timer>
    where
        F: Fn(&Timer) -> bool + Send,
    {
        self.cancel(predicate).await?;
        self.schedule(kind, expires_at).await
    }

    /// Arm every persisted timer which is not armed yet.  Returns how many were armed.
    pub async fn restore(self: &Arc<Self>) -> Result<usize> {
        let timers = self.store.read().await.timers.clone();
        let mut restored = 0;
        for timer in timers {
            if self.arm(timer).await {
                restored += 1;
            }
        }
        Ok(restored)
    }

    /// Remove every timer matching `predicate` without firing it.  If the removal cannot be
    /// persisted the timers stay in place and armed.
    pub async fn cancel<F>(&self, predicate: F) -> Result<Vec<Timer>>
    where
        F: Fn(&Timer) -> bool + Send,
    {
        let cancelled = {
            let mut state = self.store.write().await;
            let (cancelled, kept): (Vec<Timer>, Vec<Timer>) =
                state.timers.drain(..).partition(|timer| predicate(timer));
            state.timers = kept;
            if !cancelled.is_empty() {
                if let Err(err) = state.save().await {
                    state.timers.extend(cancelled);
                    state.timers.sort_by_key(|timer| timer.id);
                    return Err(err);
                }
            }
            cancelled
        };

        let mut armed = self.armed.lock().await;
        for timer in &cancelled {
            if let Some(handle) = armed.remove(&timer.id) {
                handle.abort();
            }
        }
        Ok(cancelled)
    }

    pub async fn find<F>(&self, predicate: F) -> Option<Timer>
    where
        F: Fn(&Timer) -> bool + Send,
    {
        self.store
            .read()
            .await
            .timers
            .iter()
            .find(|timer| predicate(timer))
            .cloned()
    }

    /// Matching timers, soonest first
    pub async fn list<F>(&self, predicate: F) -> Vec<Timer>
    where
        F: Fn(&Timer) -> bool + Send,
    {
        let mut timers: Vec<Timer> = self
            .store
            .read()
            .await
            .timers
            .iter()
            .filter(|timer| predicate(timer))
            .cloned()
            .collect();
        timers.sort_by_key(|timer| timer.expires_at);
        timers
    }

    async fn arm(self: &Arc<Self>, timer: Timer) -> bool {
        let mut armed = self.armed.lock().await;
        armed.retain(|_, handle| !handle.is_finished());
        if armed.contains_key(&timer.id) {
            return false;
        }

        let id = timer.id;
        let scheduler = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timer.remaining()).await;
            scheduler.fire(timer).await;
        });
        armed.insert(id, handle);
        true
    }

    async fn fire(&self, timer: Timer) {
        // May have been cancelled after the sleep finished
        let pending = self
            .store
            .read()
            .await
            .timers
            .iter()
            .any(|t| t.id == timer.id);
        if !pending {
            return;
        }

        if let Err(err) = self.sink.fire(&timer).await {
            tracing::error!(timer = timer.id, error = ?err, "Timer action failed");
        }

        let mut state = self.store.write().await;
        state.timers.retain(|t| t.id != timer.id);
        if let Err(err) = state.save().await {
            tracing::error!(timer = timer.id, error = ?err, "Could not remove fired timer");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingSink {
        fired: StdMutex<Vec<u64>>,
        fail: bool,
    }

    impl RecordingSink {
        fn fired(&self) -> Vec<u64> {
            self.fired.lock().unwrap().clone()
        }
    }

    #[serenity::async_trait]
    impl TimerSink for RecordingSink {
        async fn fire(&self, timer: &Timer) -> Result<()> {
            self.fired.lock().unwrap().push(timer.id);
            if self.fail {
                anyhow::bail!("discord is down");
            }
            Ok(())
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        store: Arc<RwLock<PersistentState>>,
        sink: Arc<RecordingSink>,
        scheduler: Arc<Scheduler>,
    }

    async fn fixture(sink: RecordingSink) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let state = PersistentState::load_from(dir.path().join("data").join("state.toml"))
            .await
            .unwrap();
        let store = Arc::new(RwLock::new(state));
        let sink = Arc::new(sink);
        let scheduler = Scheduler::new(Arc::clone(&store), sink.clone());
        Fixture {
            _dir: dir,
            store,
            sink,
            scheduler,
        }
    }

    fn reminder(user: u64) -> TimerKind {
        TimerKind::Remind {
            channel_id: ChannelId::new(1),
            user_id: UserId::new(user),
            message: "stretch".to_owned(),
        }
    }

    fn in_secs(secs: i64) -> DateTime<Utc> {
        Utc::now() + chrono::Duration::seconds(secs)
    }

    async fn stored_ids(store: &RwLock<PersistentState>) -> Vec<u64> {
        store.read().await.timers.iter().map(|t| t.id).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_and_deletes_record() {
        let f = fixture(RecordingSink::default()).await;
        let timer = f.scheduler.schedule(reminder(7), in_secs(60)).await.unwrap();
        assert_eq!(stored_ids(&f.store).await, vec![timer.id]);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(f.sink.fired().is_empty());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(f.sink.fired(), vec![timer.id]);
        assert!(stored_ids(&f.store).await.is_empty());

        // The deletion was persisted
        let path = f.store.read().await.path().to_owned();
        let on_disk = PersistentState::load_from(path).await.unwrap();
        assert!(on_disk.timers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failing_action_still_deletes_record() {
        let f = fixture(RecordingSink {
            fail: true,
            ..Default::default()
        })
        .await;
        let timer = f.scheduler.schedule(reminder(7), in_secs(5)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(f.sink.fired(), vec![timer.id]);
        assert!(stored_ids(&f.store).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timers_never_fire() {
        let f = fixture(RecordingSink::default()).await;
        let keep = f.scheduler.schedule(reminder(1), in_secs(60)).await.unwrap();
        let gone = f.scheduler.schedule(reminder(2), in_secs(60)).await.unwrap();

        let cancelled = f
            .scheduler
            .cancel(|t| t.kind.is_reminder_of(UserId::new(2)))
            .await
            .unwrap();
        assert_eq!(cancelled, vec![gone]);
        assert_eq!(stored_ids(&f.store).await, vec![keep.id]);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(f.sink.fired(), vec![keep.id]);
    }

    #[tokio::test(start_paused = true)]
    async fn restore_arms_persisted_timers_once() {
        let f = fixture(RecordingSink::default()).await;
        {
            let mut state = f.store.write().await;
            let overdue = Timer {
                id: state.allocate_timer_id(),
                expires_at: in_secs(-30),
                kind: reminder(1),
            };
            let later = Timer {
                id: state.allocate_timer_id(),
                expires_at: in_secs(3600),
                kind: TimerKind::PlaceCooldown {
                    user_id: UserId::new(2),
                },
            };
            state.timers = vec![overdue, later];
        }

        assert_eq!(f.scheduler.restore().await.unwrap(), 2);
        // Ready can be delivered again after a reconnect
        assert_eq!(f.scheduler.restore().await.unwrap(), 0);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(f.sink.fired(), vec![1]);
        assert_eq!(stored_ids(&f.store).await, vec![2]);

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(f.sink.fired(), vec![1, 2]);
        assert!(stored_ids(&f.store).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn find_and_list() {
        let f = fixture(RecordingSink::default()).await;
        let late = f.scheduler.schedule(reminder(1), in_secs(600)).await.unwrap();
        let soon = f.scheduler.schedule(reminder(1), in_secs(60)).await.unwrap();
        f.scheduler
            .schedule(
                TimerKind::PlaceCooldown {
                    user_id: UserId::new(1),
                },
                in_secs(300),
            )
            .await
            .unwrap();

        let mine = f
            .scheduler
            .list(|t| t.kind.is_reminder_of(UserId::new(1)))
            .await;
        assert_eq!(mine, vec![soon, late]);

        assert!(f
            .scheduler
            .find(|t| t.kind.is_place_cooldown_of(UserId::new(1)))
            .await
            .is_some());
        assert!(f
            .scheduler
            .find(|t| t.kind.is_place_cooldown_of(UserId::new(2)))
            .await
            .is_none());
    }

    /// Makes every further save fail by putting a regular file where the state directory was.
    async fn break_storage(f: &Fixture) {
        let path = f.store.read().await.path().to_owned();
        let dir = path.parent().unwrap();
        if dir.exists() {
            std::fs::remove_dir_all(dir).unwrap();
        }
        std::fs::write(dir, "not a directory").unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn unsaved_timers_are_dropped() {
        let f = fixture(RecordingSink::default()).await;
        break_storage(&f).await;

        assert!(f.scheduler.schedule(reminder(7), in_secs(5)).await.is_err());
        assert!(stored_ids(&f.store).await.is_empty());
        assert!(f.scheduler.armed.lock().await.is_empty());

        // A later restore has nothing to bring back
        assert_eq!(f.scheduler.restore().await.unwrap(), 0);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(f.sink.fired().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unsaved_cancellation_keeps_timers() {
        let f = fixture(RecordingSink::default()).await;
        let first = f.scheduler.schedule(reminder(1), in_secs(60)).await.unwrap();
        let second = f.scheduler.schedule(reminder(2), in_secs(60)).await.unwrap();
        break_storage(&f).await;

        assert!(f
            .scheduler
            .cancel(|t| t.kind.is_reminder_of(UserId::new(1)))
            .await
            .is_err());
        assert_eq!(stored_ids(&f.store).await, vec![first.id, second.id]);

        tokio::time::sleep(Duration::from_secs(120)).await;
        let mut fired = f.sink.fired();
        fired.sort();
        assert_eq!(fired, vec![first.id, second.id]);
    }

    #[tokio::test(start_paused = true)]
    async fn replace_swaps_the_previous_mute() {
        let f = fixture(RecordingSink::default()).await;
        let mute = |role| TimerKind::Mute {
            guild_id: GuildId::new(1),
            user_id: UserId::new(2),
            role_id: RoleId::new(role),
        };
        let is_target = |t: &Timer| t.kind.is_mute_of(GuildId::new(1), UserId::new(2));

        let old = f.scheduler.schedule(mute(3), in_secs(30)).await.unwrap();
        let new = f
            .scheduler
            .replace(is_target, mute(3), in_secs(300))
            .await
            .unwrap();
        assert_eq!(stored_ids(&f.store).await, vec![new.id]);
        assert_eq!(f.scheduler.list(is_target).await, vec![new.clone()]);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(f.sink.fired().is_empty(), "old mute {} fired", old.id);
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(f.sink.fired(), vec![new.id]);
    }

    #[test]
    fn mute_matching() {
        let kind = TimerKind::Mute {
            guild_id: GuildId::new(1),
            user_id: UserId::new(2),
            role_id: RoleId::new(3),
        };
        assert!(kind.is_mute_of(GuildId::new(1), UserId::new(2)));
        assert!(!kind.is_mute_of(GuildId::new(9), UserId::new(2)));
        assert!(!kind.is_reminder_of(UserId::new(2)));
    }
}
