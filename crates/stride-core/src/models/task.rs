//! Task model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::record::{start_of_day_millis, RecordMeta, SyncRecord};
use super::Collection;
use crate::error::{Error, Result};

/// A to-do item with a due date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub title: String,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub completed: bool,
}

impl Task {
    #[must_use]
    pub fn new(owner_id: impl Into<String>, title: impl Into<String>, due_date: NaiveDate) -> Self {
        Self {
            meta: RecordMeta::new(owner_id),
            title: title.into(),
            due_date,
            completed: false,
        }
    }
}

impl SyncRecord for Task {
    const COLLECTION: Collection = Collection::Tasks;

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn occurred_at(&self) -> i64 {
        start_of_day_millis(self.due_date)
    }

    fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidInput("task title cannot be empty".into()));
        }
        Ok(())
    }
}
