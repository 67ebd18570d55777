//! Runtime settings for the storage service and its sync engine

use std::time::Duration;

use crate::models::DEFAULT_FAILURE_THRESHOLD;

const DEFAULT_REMOTE_CALL_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SYNC_INTERVAL_SECS: u64 = 60;
const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Tuning knobs for sync and maintenance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Attempts after which a pending entry counts as failed
    pub failure_threshold: u32,
    /// Upper bound on a single remote call
    pub remote_call_timeout: Duration,
    /// Periodic background pass interval (`None`: only on demand)
    pub sync_interval: Option<Duration>,
    /// Default age for `cleanup_old_sync_items`
    pub retention_days: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            remote_call_timeout: Duration::from_secs(DEFAULT_REMOTE_CALL_TIMEOUT_SECS),
            sync_interval: Some(Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS)),
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

impl EngineSettings {
    #[must_use]
    pub const fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    #[must_use]
    pub const fn with_remote_call_timeout(mut self, timeout: Duration) -> Self {
        self.remote_call_timeout = timeout;
        self
    }

    /// Set the automatic sync interval
    #[must_use]
    pub const fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = Some(interval);
        self
    }

    /// Disable periodic passes (triggered sync only)
    #[must_use]
    pub const fn without_auto_sync(mut self) -> Self {
        self.sync_interval = None;
        self
    }

    #[must_use]
    pub const fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }
}
