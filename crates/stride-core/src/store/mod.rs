//! Local store: durable, indexed document storage organized into collections

mod migrations;
pub mod schema;
mod sqlite;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::models::Collection;

pub use migrations::CURRENT_VERSION as SCHEMA_VERSION;
pub use schema::IndexDef;
pub use sqlite::SqliteStore;

/// A stored JSON document
pub type Document = serde_json::Value;

/// A value looked up through a secondary index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexValue {
    Text(String),
    Integer(i64),
    Bool(bool),
}

impl From<&str> for IndexValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for IndexValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for IndexValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for IndexValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// One write inside an atomic batch
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Insert or replace the document stored under `local_id`
    Put {
        collection: Collection,
        local_id: String,
        document: Document,
    },
    /// Remove the document stored under `local_id` (no-op when absent)
    Delete {
        collection: Collection,
        local_id: String,
    },
}

impl WriteOp {
    /// Serialize `value` into a `Put`
    pub fn put<T: Serialize>(
        collection: Collection,
        local_id: impl Into<String>,
        value: &T,
    ) -> Result<Self> {
        Ok(Self::Put {
            collection,
            local_id: local_id.into(),
            document: serde_json::to_value(value)?,
        })
    }

    pub fn delete(collection: Collection, local_id: impl Into<String>) -> Self {
        Self::Delete {
            collection,
            local_id: local_id.into(),
        }
    }
}

/// Trait for local document storage.
///
/// Every operation awaits store initialization and returns a definite
/// outcome; a failed write never partially applies.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Get a document by local id
    async fn get(&self, collection: Collection, local_id: &str) -> Result<Option<Document>>;

    /// Every document in a collection, in insertion order
    async fn get_all(&self, collection: Collection) -> Result<Vec<Document>>;

    /// Documents whose indexed field equals `value`
    async fn get_all_by_index(
        &self,
        collection: Collection,
        index: &str,
        value: &IndexValue,
    ) -> Result<Vec<Document>>;

    /// Insert or replace a document
    async fn put(&self, collection: Collection, local_id: &str, document: &Document) -> Result<()>;

    /// Delete a document (no-op when absent)
    async fn delete(&self, collection: Collection, local_id: &str) -> Result<()>;

    /// Remove every document in a collection
    async fn clear(&self, collection: Collection) -> Result<()>;

    /// Commit a batch of writes across collections in a single transaction
    async fn apply(&self, batch: Vec<WriteOp>) -> Result<()>;
}

/// Decode a stored document into a typed value
pub fn decode<T: DeserializeOwned>(document: Document) -> Result<T> {
    Ok(serde_json::from_value(document)?)
}

/// Decode every document, failing on the first malformed one
pub fn decode_all<T: DeserializeOwned>(documents: Vec<Document>) -> Result<Vec<T>> {
    documents.into_iter().map(decode).collect()
}
