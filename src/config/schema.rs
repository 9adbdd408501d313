use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_data_dir() -> String {
    "~/.tandem".to_string()
}

/// Application settings from `~/.tandem/config.toml`.
///
/// Endpoint slots and conversation history are not settings; they live in
/// the JSON blobs under `data_dir` and are managed by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory holding the persisted blobs. Supports `~` expansion.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Whole-request timeout for outbound calls, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// TCP connect timeout for outbound calls, in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Resolved at load time, never serialized.
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(skip)]
    pub resolved_data_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            config_path: PathBuf::new(),
            resolved_data_dir: PathBuf::new(),
        }
    }
}

impl Settings {
    /// Load settings, writing a default config file on first run.
    pub fn load_or_init() -> Result<Self> {
        let home = Self::home_dir();
        std::fs::create_dir_all(&home)
            .with_context(|| format!("failed to create {}", home.display()))?;

        let config_path = home.join("config.toml");
        let mut settings = if config_path.exists() {
            let raw = std::fs::read_to_string(&config_path)
                .with_context(|| format!("failed to read {}", config_path.display()))?;
            toml::from_str::<Self>(&raw)
                .with_context(|| format!("invalid config at {}", config_path.display()))?
        } else {
            let defaults = Self::default();
            let rendered =
                toml::to_string_pretty(&defaults).context("failed to render default config")?;
            std::fs::write(&config_path, rendered)
                .with_context(|| format!("failed to write {}", config_path.display()))?;
            tracing::debug!(path = %config_path.display(), "wrote default config");
            defaults
        };

        settings.config_path = config_path;
        settings.resolved_data_dir = PathBuf::from(shellexpand::tilde(&settings.data_dir).as_ref());
        std::fs::create_dir_all(&settings.resolved_data_dir).with_context(|| {
            format!("failed to create {}", settings.resolved_data_dir.display())
        })?;

        Ok(settings)
    }

    /// `$TANDEM_HOME` when set, else `~/.tandem`.
    pub fn home_dir() -> PathBuf {
        if let Ok(custom) = std::env::var("TANDEM_HOME") {
            if !custom.trim().is_empty() {
                return PathBuf::from(shellexpand::tilde(&custom).as_ref());
            }
        }
        directories::UserDirs::new().map_or_else(
            || PathBuf::from(".tandem"),
            |dirs| dirs.home_dir().join(".tandem"),
        )
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.connect_timeout_secs)
    }
}
