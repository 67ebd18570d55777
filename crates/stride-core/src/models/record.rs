//! Shared record metadata and the `SyncRecord` contract

use chrono::{NaiveDate, NaiveTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::Collection;
use crate::error::{Error, Result};

/// JSON field names shared by every persisted record document.
pub mod fields {
    pub const LOCAL_ID: &str = "localId";
    pub const SERVER_ID: &str = "serverId";
    pub const OWNER_ID: &str = "ownerId";
    pub const SYNCED: &str = "synced";
    pub const PENDING_OPERATION: &str = "pendingOperation";
    pub const UPDATED_AT: &str = "updatedAt";
}

/// A client-generated record identifier, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocalId(Uuid);

impl LocalId {
    /// Create a new unique local ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for LocalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LocalId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}

/// The kind of mutation a sync queue entry carries to the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bookkeeping fields carried by every record, flattened into its JSON document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMeta {
    /// Assigned on first save; `None` means the record has never been persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<LocalId>,
    /// Identifier assigned by the remote service once the CREATE is acknowledged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    /// Owning user
    pub owner_id: String,
    /// True only once every queued mutation for this record has been acknowledged
    #[serde(default)]
    pub synced: bool,
    /// Most recent unsynced intent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_operation: Option<Operation>,
    /// Last local mutation (unix ms)
    #[serde(default)]
    pub updated_at: i64,
}

impl RecordMeta {
    /// Metadata for a record that has not been saved yet
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            ..Self::default()
        }
    }

    pub const fn is_pending_delete(&self) -> bool {
        matches!(self.pending_operation, Some(Operation::Delete))
    }
}

/// A record type stored in one of the domain collections and synced remotely.
pub trait SyncRecord: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection the record type lives in
    const COLLECTION: Collection;

    fn meta(&self) -> &RecordMeta;

    fn meta_mut(&mut self) -> &mut RecordMeta;

    /// Value of the record's temporal field as unix ms, used for range filtering
    fn occurred_at(&self) -> i64;

    /// Domain validation applied before every save
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Inclusive time window applied to a record's temporal field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    /// Lower bound (unix ms, inclusive)
    pub from: Option<i64>,
    /// Upper bound (unix ms, inclusive)
    pub to: Option<i64>,
}

impl DateRange {
    pub const fn new(from: Option<i64>, to: Option<i64>) -> Self {
        Self { from, to }
    }

    /// Range covering whole calendar days (UTC), both ends inclusive
    pub fn between_dates(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self {
            from: from.map(start_of_day_millis),
            to: to.map(|date| {
                date.succ_opt()
                    .map_or(i64::MAX, |next| start_of_day_millis(next) - 1)
            }),
        }
    }

    pub fn contains(&self, timestamp_ms: i64) -> bool {
        self.from.is_none_or(|from| timestamp_ms >= from)
            && self.to.is_none_or(|to| timestamp_ms <= to)
    }
}

/// Midnight UTC of `date` as unix ms
pub fn start_of_day_millis(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

/// Reject values outside `1..=10`, the scale used for intensity and mood scores
pub(crate) fn validate_score(field: &str, value: u8) -> Result<()> {
    if (1..=10).contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "{field} must be between 1 and 10, got {value}"
        )))
    }
}

/// Read the `localId` of a stored record document
pub fn document_local_id(document: &serde_json::Value) -> Option<&str> {
    document.get(fields::LOCAL_ID).and_then(serde_json::Value::as_str)
}

/// Read the `serverId` of a stored record document
pub fn document_server_id(document: &serde_json::Value) -> Option<&str> {
    document
        .get(fields::SERVER_ID)
        .and_then(serde_json::Value::as_str)
        .filter(|id| !id.is_empty())
}

/// Apply an acknowledged mutation to a stored record document.
///
/// Adopts `server_id` when given. The record only becomes `synced` when
/// `fully_synced` is set, i.e. no other queued mutation still references it.
pub(crate) fn reconcile_document(
    document: &mut serde_json::Value,
    server_id: Option<&str>,
    fully_synced: bool,
) -> Result<()> {
    let object = document.as_object_mut().ok_or_else(|| {
        Error::Database("stored record document is not a JSON object".to_string())
    })?;

    if let Some(server_id) = server_id {
        object.insert(
            fields::SERVER_ID.to_string(),
            serde_json::Value::String(server_id.to_string()),
        );
    }
    if fully_synced {
        object.insert(fields::SYNCED.to_string(), serde_json::Value::Bool(true));
        object.remove(fields::PENDING_OPERATION);
    }
    Ok(())
}
