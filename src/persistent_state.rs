use crate::timer::Timer;
use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

const PSTATE_PATH_REL_HOME: &str = ".config/ferrobot/state.toml";

/// State which persists across sessions
#[derive(Default, serde::Serialize, serde::Deserialize)]
pub struct PersistentState {
    #[serde(skip)]
    path: PathBuf,
    #[serde(default)]
    pub next_timer_id: u64,
    #[serde(default)]
    pub timers: Vec<Timer>,
}

impl PersistentState {
    pub fn default_path() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|p| p.join(PSTATE_PATH_REL_HOME))
            .ok_or(anyhow!("Could not find home directory"))
    }

    pub async fn load() -> Result<Self> {
        Self::load_from(Self::default_path()?).await
    }

    /// Load state from `path`.  A missing file is an empty state which will be created on the
    /// first save.
    pub async fn load_from(path: PathBuf) -> Result<Self> {
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self {
                    path,
                    ..Self::default()
                })
            }
            Err(e) => {
                return Err(anyhow!(
                    "Could not read state at `{}`: {}",
                    path.to_string_lossy(),
                    e
                ))
            }
        };

        let mut pstate: PersistentState = toml::from_str(&contents).map_err(|e| {
            anyhow!(
                "Could not parse state at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })?;
        pstate.path = path;

        Ok(pstate)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn allocate_timer_id(&mut self) -> u64 {
        self.next_timer_id += 1;
        self.next_timer_id
    }

    pub async fn save(&self) -> Result<()> {
        let pstate_str = toml::to_string_pretty(&self)
            .map_err(|e| anyhow!("Could not serialize state: {}", e))?;
        write_atomically(&self.path, pstate_str.as_bytes()).await
    }
}

/// Write `contents` next to `path`, then rename over it so readers never see a partial file.
pub async fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            anyhow!(
                "Could not create directory `{}`: {}",
                parent.to_string_lossy(),
                e
            )
        })?;
    }

    let mut tmp_path = path.as_os_str().to_owned();
    tmp_path.push(".new");
    let tmp_path = PathBuf::from(tmp_path);

    tokio::fs::write(&tmp_path, contents).await.map_err(|e| {
        anyhow!(
            "Could not write temporary file `{}`: {}",
            tmp_path.to_string_lossy(),
            e
        )
    })?;

    tokio::fs::rename(&tmp_path, path).await.map_err(|e| {
        anyhow!(
            "Could not rename temporary file `{}` to `{}`: {}",
            tmp_path.to_string_lossy(),
            path.to_string_lossy(),
            e
        )
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::TimerKind;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use serenity::all::{ChannelId, GuildId, RoleId, UserId};

    #[tokio::test]
    async fn missing_file_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.toml");

        let pstate = PersistentState::load_from(path.clone()).await.unwrap();
        assert!(pstate.timers.is_empty());
        assert_eq!(pstate.next_timer_id, 0);
        assert_eq!(pstate.path(), path.as_path());
    }

    #[tokio::test]
    async fn timers_survive_a_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.toml");

        let mut pstate = PersistentState::load_from(path.clone()).await.unwrap();
        let expires_at = Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap();
        let mute = Timer {
            id: pstate.allocate_timer_id(),
            expires_at,
            kind: TimerKind::Mute {
                guild_id: GuildId::new(10),
                user_id: UserId::new(11),
                role_id: RoleId::new(12),
            },
        };
        let remind = Timer {
            id: pstate.allocate_timer_id(),
            expires_at,
            kind: TimerKind::Remind {
                channel_id: ChannelId::new(20),
                user_id: UserId::new(21),
                message: "take out the \"bins\"".to_owned(),
            },
        };
        let cooldown = Timer {
            id: pstate.allocate_timer_id(),
            expires_at,
            kind: TimerKind::PlaceCooldown {
                user_id: UserId::new(31),
            },
        };
        pstate.timers = vec![mute.clone(), remind.clone(), cooldown.clone()];
        pstate.save().await.unwrap();

        let reloaded = PersistentState::load_from(path).await.unwrap();
        assert_eq!(reloaded.next_timer_id, 3);
        assert_eq!(reloaded.timers, vec![mute, remind, cooldown]);
    }

    #[tokio::test]
    async fn garbage_is_reported_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.toml");
        tokio::fs::write(&path, "timers = 5").await.unwrap();

        let err = PersistentState::load_from(path).await.err().unwrap();
        assert!(err.to_string().starts_with("Could not parse state at"));
    }
}
