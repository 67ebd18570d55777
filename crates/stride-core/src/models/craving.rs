//! Craving log model

use serde::{Deserialize, Serialize};

use super::record::{validate_score, RecordMeta, SyncRecord};
use super::Collection;
use crate::error::Result;

/// A single logged craving
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CravingLog {
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// When the craving happened (unix ms)
    pub logged_at: i64,
    /// Strength on a 1-10 scale
    pub intensity: u8,
    /// What set it off, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    /// Whether the craving was resisted
    #[serde(default)]
    pub resisted: bool,
    #[serde(default)]
    pub notes: String,
}

impl CravingLog {
    /// Create an unsaved craving log stamped with the current time
    #[must_use]
    pub fn new(owner_id: impl Into<String>, intensity: u8) -> Self {
        Self {
            meta: RecordMeta::new(owner_id),
            logged_at: chrono::Utc::now().timestamp_millis(),
            intensity,
            trigger: None,
            resisted: false,
            notes: String::new(),
        }
    }

    #[must_use]
    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = Some(trigger.into());
        self
    }

    #[must_use]
    pub const fn with_logged_at(mut self, logged_at: i64) -> Self {
        self.logged_at = logged_at;
        self
    }
}

impl SyncRecord for CravingLog {
    const COLLECTION: Collection = Collection::Cravings;

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn occurred_at(&self) -> i64 {
        self.logged_at
    }

    fn validate(&self) -> Result<()> {
        validate_score("intensity", self.intensity)
    }
}
