//! Named collections held by the local store

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A named collection (table) in the local store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Progress,
    Cravings,
    Tasks,
    Consumption,
    SyncQueue,
}

impl Collection {
    /// Every collection, including the sync queue
    pub const ALL: [Self; 5] = [
        Self::Progress,
        Self::Cravings,
        Self::Tasks,
        Self::Consumption,
        Self::SyncQueue,
    ];

    /// Collections holding domain records
    pub const RECORDS: [Self; 4] = [
        Self::Progress,
        Self::Cravings,
        Self::Tasks,
        Self::Consumption,
    ];

    /// Table name, also used as the remote resource name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Progress => "progress",
            Self::Cravings => "cravings",
            Self::Tasks => "tasks",
            Self::Consumption => "consumption",
            Self::SyncQueue => "sync_queue",
        }
    }

    pub const fn is_record_collection(self) -> bool {
        !matches!(self, Self::SyncQueue)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Collection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|collection| collection.name() == wanted)
            .ok_or_else(|| Error::InvalidInput(format!("unknown collection '{}'", s.trim())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_parse_roundtrips_names() {
        for collection in Collection::ALL {
            let parsed: Collection = collection.name().parse().unwrap();
            assert_eq!(parsed, collection);
        }
        assert_eq!(" Cravings ".parse::<Collection>().unwrap(), Collection::Cravings);
    }

    #[test]
    fn test_collection_parse_rejects_unknown() {
        let error = "notes".parse::<Collection>().unwrap_err();
        assert!(error.to_string().contains("unknown collection 'notes'"));
    }

    #[test]
    fn test_sync_queue_is_not_a_record_collection() {
        assert!(!Collection::SyncQueue.is_record_collection());
        assert!(Collection::RECORDS
            .iter()
            .all(|collection| collection.is_record_collection()));
    }
}
