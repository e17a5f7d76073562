use anyhow::{anyhow, Result};
use serenity::all::UserId;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

const CONFIG_PATH_REL_HOME: &str = ".config/ferrobot/config.toml";
const CONFIG_PATH_ENV: &str = "FERROBOT_CONFIG";

/// Bot configuration
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Config {
    pub general: General,
    #[serde(default)]
    pub moderation: Moderation,
    #[serde(default)]
    pub place: Place,
    #[serde(default)]
    pub services: Services,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct General {
    pub discord_token: String,
    #[serde(default)]
    pub bot_owners: Vec<UserId>,
    pub command_prefix: String,
    /// Also accept `@bot command` invocations
    #[serde(default = "default_true")]
    pub mention_prefix: bool,
    /// "Playing ..." presence set once connected
    pub status: Option<String>,
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Moderation {
    pub muted_role_name: String,
    pub max_purge: u8,
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Place {
    pub width: u32,
    pub height: u32,
    /// Each canvas pixel is rendered as a `scale`x`scale` square
    pub scale: u32,
    pub cooldown_seconds: u64,
    /// Defaults to `place.png` next to the persistent state
    pub canvas_path: Option<PathBuf>,
}

#[derive(Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Services {
    pub osu_api_key: Option<String>,
    pub mapbox_token: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for Moderation {
    fn default() -> Self {
        Self {
            muted_role_name: "Muted".to_owned(),
            max_purge: 100,
        }
    }
}

impl Default for Place {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            scale: 8,
            cooldown_seconds: 300,
            canvas_path: None,
        }
    }
}

impl Config {
    fn config_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        dirs::home_dir()
            .map(|p| p.join(CONFIG_PATH_REL_HOME))
            .ok_or(anyhow!("Could not find home directory"))
    }

    pub async fn load() -> Result<Self> {
        let path = Self::config_path()?;

        let mut file = tokio::fs::File::open(&path).await.map_err(|e| {
            anyhow!(
                "Could not open configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })?;

        let mut contents = String::new();
        file.read_to_string(&mut contents).await.map_err(|e| {
            anyhow!(
                "Could not read configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })?;

        Self::parse(&contents).map_err(|e| {
            anyhow!(
                "Could not parse configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        if config.place.width == 0 || config.place.height == 0 || config.place.scale == 0 {
            return Err(anyhow!("place width, height and scale must be non-zero"));
        }
        Ok(config)
    }

    pub async fn reload(&mut self) -> Result<()> {
        let new = Self::load().await?;
        *self = new;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = Config::parse(
            r#"
            [general]
            discord_token = "token"
            command_prefix = ";"
            "#,
        )
        .unwrap();

        assert!(cfg.general.bot_owners.is_empty());
        assert!(cfg.general.mention_prefix);
        assert_eq!(cfg.general.status, None);
        assert_eq!(cfg.moderation.muted_role_name, "Muted");
        assert_eq!(cfg.moderation.max_purge, 100);
        assert_eq!((cfg.place.width, cfg.place.height, cfg.place.scale), (64, 64, 8));
        assert_eq!(cfg.place.cooldown_seconds, 300);
        assert_eq!(cfg.services.osu_api_key, None);
    }

    #[test]
    fn full_config() {
        let cfg = Config::parse(
            r#"
            [general]
            discord_token = "token"
            bot_owners = [1234, "5678"]
            command_prefix = "!"
            mention_prefix = false
            status = "with timers"

            [moderation]
            muted_role_name = "Silenced"

            [place]
            width = 16
            cooldown_seconds = 0
            canvas_path = "/tmp/place.png"

            [services]
            osu_api_key = "abc"
            "#,
        )
        .unwrap();

        assert_eq!(
            cfg.general.bot_owners,
            vec![UserId::new(1234), UserId::new(5678)]
        );
        assert!(!cfg.general.mention_prefix);
        assert_eq!(cfg.general.status.as_deref(), Some("with timers"));
        assert_eq!(cfg.moderation.muted_role_name, "Silenced");
        assert_eq!(cfg.moderation.max_purge, 100);
        assert_eq!((cfg.place.width, cfg.place.height), (16, 64));
        assert_eq!(cfg.place.cooldown_seconds, 0);
        assert_eq!(
            cfg.place.canvas_path,
            Some(PathBuf::from("/tmp/place.png"))
        );
        assert_eq!(cfg.services.osu_api_key.as_deref(), Some("abc"));
        assert_eq!(cfg.services.mapbox_token, None);
    }

    #[test]
    fn rejects_empty_canvas() {
        let err = Config::parse(
            r#"
            [general]
            discord_token = "token"
            command_prefix = ";"

            [place]
            scale = 0
            "#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn missing_token_is_an_error() {
        assert!(Config::parse("[general]\ncommand_prefix = \";\"").is_err());
    }
}
