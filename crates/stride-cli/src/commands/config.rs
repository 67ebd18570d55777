use std::path::Path;

use stride_core::util::normalize_text_option;

use crate::cli::ConfigCommands;
use crate::config::{
    default_config_path, normalize_remote_url, CliConfig, ENV_REMOTE_TOKEN, ENV_REMOTE_URL,
};
use crate::error::CliError;

/// Values passed to `stride config init`; `None` keeps the stored value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigUpdate {
    pub remote_url: Option<String>,
    pub owner: Option<String>,
    pub sync_interval: Option<u64>,
    pub retention_days: Option<u32>,
    pub failure_threshold: Option<u32>,
}

pub fn run_config(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            remote_url,
            owner,
            sync_interval,
            retention_days,
            failure_threshold,
        } => run_config_init(
            &default_config_path(),
            ConfigUpdate {
                remote_url,
                owner,
                sync_interval,
                retention_days,
                failure_threshold,
            },
        ),
        ConfigCommands::Show => run_config_show(&default_config_path()),
    }
}

pub fn run_config_init(path: &Path, update: ConfigUpdate) -> Result<(), CliError> {
    let mut config = CliConfig::load_from_path(path).map_err(CliError::Config)?;
    apply_config_update(&mut config, update)?;
    config.save_to_path(path).map_err(CliError::Config)?;

    println!("Saved config to {}", path.display());
    if config.remote_base_url.is_none() {
        println!("No remote configured; records stay on this device until one is set.");
    }
    Ok(())
}

pub fn apply_config_update(config: &mut CliConfig, update: ConfigUpdate) -> Result<(), CliError> {
    if let Some(url) = normalize_text_option(update.remote_url) {
        config.remote_base_url = Some(normalize_remote_url(url).map_err(CliError::Config)?);
    }
    if let Some(owner) = normalize_text_option(update.owner) {
        config.owner_id = Some(owner);
    }
    if let Some(threshold) = update.failure_threshold {
        if threshold == 0 {
            return Err(CliError::Config(
                "failure threshold must be at least 1".to_string(),
            ));
        }
        config.failure_threshold = Some(threshold);
    }
    if update.sync_interval.is_some() {
        config.sync_interval_secs = update.sync_interval;
    }
    if update.retention_days.is_some() {
        config.retention_days = update.retention_days;
    }
    Ok(())
}

pub fn run_config_show(path: &Path) -> Result<(), CliError> {
    let config = CliConfig::load_from_path(path).map_err(CliError::Config)?;

    println!("# {}", path.display());
    println!("{}", serde_json::to_string_pretty(&config)?);
    if std::env::var_os(ENV_REMOTE_URL).is_some() {
        println!("# {ENV_REMOTE_URL} overrides remote_base_url");
    }
    if std::env::var_os(ENV_REMOTE_TOKEN).is_some() {
        println!("# remote token set via {ENV_REMOTE_TOKEN}");
    }
    Ok(())
}
