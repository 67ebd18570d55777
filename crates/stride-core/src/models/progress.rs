//! Daily progress entry model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::record::{start_of_day_millis, validate_score, RecordMeta, SyncRecord};
use super::Collection;
use crate::error::Result;

/// One check-in per day summarizing how it went
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntry {
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Calendar day the entry describes
    pub date: NaiveDate,
    /// Mood on a 1-10 scale
    pub mood_score: u8,
    #[serde(default)]
    pub notes: String,
}

impl ProgressEntry {
    #[must_use]
    pub fn new(owner_id: impl Into<String>, date: NaiveDate, mood_score: u8) -> Self {
        Self {
            meta: RecordMeta::new(owner_id),
            date,
            mood_score,
            notes: String::new(),
        }
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

impl SyncRecord for ProgressEntry {
    const COLLECTION: Collection = Collection::Progress;

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn occurred_at(&self) -> i64 {
        start_of_day_millis(self.date)
    }

    fn validate(&self) -> Result<()> {
        validate_score("mood score", self.mood_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_date_serializes_as_calendar_day() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let entry = ProgressEntry::new("user-1", date, 6).with_notes("steady");

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["date"], serde_json::json!("2024-05-01"));
        assert_eq!(value["moodScore"], serde_json::json!(6));
        assert_eq!(entry.occurred_at(), start_of_day_millis(date));
    }

    #[test]
    fn test_progress_rejects_out_of_range_mood() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let error = ProgressEntry::new("user-1", date, 12).validate().unwrap_err();
        assert!(error.to_string().contains("mood score"));
    }
}
