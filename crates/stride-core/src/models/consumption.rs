//! Consumption log model

use serde::{Deserialize, Serialize};

use super::record::{RecordMeta, SyncRecord};
use super::Collection;
use crate::error::{Error, Result};

/// A logged amount consumed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionLog {
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// When it was consumed (unix ms)
    pub consumed_at: i64,
    pub quantity: f64,
    /// Unit of `quantity` (e.g. "cigarettes", "ml")
    pub unit: String,
    #[serde(default)]
    pub notes: String,
}

impl ConsumptionLog {
    #[must_use]
    pub fn new(owner_id: impl Into<String>, quantity: f64, unit: impl Into<String>) -> Self {
        Self {
            meta: RecordMeta::new(owner_id),
            consumed_at: chrono::Utc::now().timestamp_millis(),
            quantity,
            unit: unit.into(),
            notes: String::new(),
        }
    }
}

impl SyncRecord for ConsumptionLog {
    const COLLECTION: Collection = Collection::Consumption;

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn occurred_at(&self) -> i64 {
        self.consumed_at
    }

    fn validate(&self) -> Result<()> {
        if !self.quantity.is_finite() || self.quantity < 0.0 {
            return Err(Error::InvalidInput(format!(
                "quantity must be a non-negative number, got {}",
                self.quantity
            )));
        }
        if self.unit.trim().is_empty() {
            return Err(Error::InvalidInput("unit cannot be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consumption_validation() {
        assert!(ConsumptionLog::new("user-1", 2.0, "cigarettes").validate().is_ok());
        assert!(ConsumptionLog::new("user-1", -1.0, "cigarettes").validate().is_err());
        assert!(ConsumptionLog::new("user-1", f64::NAN, "ml").validate().is_err());
        assert!(ConsumptionLog::new("user-1", 1.0, " ").validate().is_err());
    }
}
