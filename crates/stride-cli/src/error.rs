use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] stride_core::Error),
    #[error(transparent)]
    Remote(#[from] stride_core::sync::RemoteError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Task title cannot be empty")]
    EmptyTitle,
    #[error("{0} not found")]
    RecordNotFound(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Refusing to delete local data without --yes")]
    ResetNotConfirmed,
    #[error(
        "Sync is not configured. Run `stride config init --remote-url <URL>` or set STRIDE_REMOTE_URL."
    )]
    SyncNotConfigured,
}
