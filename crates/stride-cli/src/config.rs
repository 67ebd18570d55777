//! Persistent CLI configuration and environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stride_core::util::{is_http_url, normalize_text_option};
use stride_core::EngineSettings;

const CONFIG_FILE_NAME: &str = "config.json";
const DEFAULT_OWNER_ID: &str = "local";

pub const ENV_DB_PATH: &str = "STRIDE_DB_PATH";
pub const ENV_REMOTE_URL: &str = "STRIDE_REMOTE_URL";
pub const ENV_REMOTE_TOKEN: &str = "STRIDE_REMOTE_TOKEN";
pub const ENV_OWNER: &str = "STRIDE_OWNER";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub remote_base_url: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub sync_interval_secs: Option<u64>,
    #[serde(default)]
    pub retention_days: Option<u32>,
    #[serde(default)]
    pub failure_threshold: Option<u32>,
}

const fn default_config_version() -> u32 {
    1
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stride")
        .join(CONFIG_FILE_NAME)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stride")
        .join("stride.db")
}

impl CliConfig {
    pub fn load() -> Result<Self, String> {
        Self::load_from_path(&default_config_path())
    }

    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        let mut config = serde_json::from_str::<Self>(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, String> {
        let path = default_config_path();
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                )
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, serialized)
            .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
    }

    /// Engine tuning derived from the file, defaults where unset
    pub fn engine_settings(&self) -> EngineSettings {
        let mut settings = EngineSettings::default();
        if let Some(threshold) = self.failure_threshold {
            settings = settings.with_failure_threshold(threshold);
        }
        if let Some(days) = self.retention_days {
            settings = settings.with_retention_days(days);
        }
        match self.sync_interval_secs {
            Some(0) => settings.without_auto_sync(),
            Some(secs) => settings.with_sync_interval(Duration::from_secs(secs)),
            None => settings,
        }
    }

    fn normalize(&mut self) {
        if self.version == 0 {
            self.version = default_config_version();
        }
        self.remote_base_url = normalize_text_option(self.remote_base_url.take())
            .map(|url| url.trim_end_matches('/').to_string());
        self.owner_id = normalize_text_option(self.owner_id.take());
    }
}

pub fn normalize_remote_url(value: String) -> Result<String, String> {
    let value = normalize_text_option(Some(value))
        .ok_or_else(|| "remote URL must not be empty".to_string())?;
    if is_http_url(&value) {
        Ok(value.trim_end_matches('/').to_string())
    } else {
        Err(format!("remote URL must include http:// or https://: {value}"))
    }
}

/// Everything a command needs, after merging flags, environment and file
#[derive(Debug, Clone)]
pub struct Context {
    pub db_path: PathBuf,
    pub owner_id: String,
    pub remote_url: Option<String>,
    pub remote_token: Option<String>,
    pub force_offline: bool,
    pub settings: EngineSettings,
}

impl Context {
    pub fn resolve(
        cli_db_path: Option<PathBuf>,
        force_offline: bool,
        config: &CliConfig,
    ) -> Result<Self, String> {
        Self::resolve_with_env(cli_db_path, force_offline, config, |key| {
            std::env::var(key).ok()
        })
    }

    /// Flags win over environment, environment over the config file
    pub fn resolve_with_env(
        cli_db_path: Option<PathBuf>,
        force_offline: bool,
        config: &CliConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, String> {
        let db_path = cli_db_path
            .or_else(|| normalize_text_option(env(ENV_DB_PATH)).map(PathBuf::from))
            .unwrap_or_else(default_db_path);

        let remote_url = normalize_text_option(env(ENV_REMOTE_URL))
            .or_else(|| config.remote_base_url.clone())
            .map(normalize_remote_url)
            .transpose()?;

        let owner_id = normalize_text_option(env(ENV_OWNER))
            .or_else(|| config.owner_id.clone())
            .unwrap_or_else(|| DEFAULT_OWNER_ID.to_string());

        Ok(Self {
            db_path,
            owner_id,
            remote_url,
            remote_token: normalize_text_option(env(ENV_REMOTE_TOKEN)),
            force_offline,
            settings: config.engine_settings(),
        })
    }
}
