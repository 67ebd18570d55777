//! Sync queue entry model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::record::document_local_id;
use super::{Collection, Operation};

/// Number of failed attempts after which an entry is reported as permanently failed
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

/// One pending (or acknowledged) mutation in the sync queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncQueueEntry {
    /// Queue bookkeeping id (UUID v7), distinct from the record's `localId`
    pub id: String,
    /// Collection the mutation targets
    pub collection: Collection,
    /// Snapshot of the record at enqueue time
    pub payload: serde_json::Value,
    pub operation: Operation,
    /// Processing order key (unix ms, strictly increasing)
    pub enqueued_at: i64,
    /// Failed remote sends so far; never decreases
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub synced: bool,
}

impl SyncQueueEntry {
    pub fn new(
        collection: Collection,
        payload: serde_json::Value,
        operation: Operation,
        enqueued_at: i64,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            collection,
            payload,
            operation,
            enqueued_at,
            attempts: 0,
            synced: false,
        }
    }

    /// `localId` of the record this entry refers to
    pub fn local_id(&self) -> Option<&str> {
        document_local_id(&self.payload)
    }

    /// Pending and out of retries for reporting purposes
    pub const fn is_failed(&self, threshold: u32) -> bool {
        !self.synced && self.attempts >= threshold
    }

    pub fn record_failure(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
    }

    pub fn mark_synced(&mut self) {
        self.synced = true;
    }
}

/// Processing order: `enqueuedAt` ascending, ties broken by the time-ordered id
pub fn sort_fifo(entries: &mut [SyncQueueEntry]) {
    entries.sort_by(|a, b| {
        a.enqueued_at
            .cmp(&b.enqueued_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Aggregate counts over every sync queue row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub total: usize,
    pub pending: usize,
    pub failed: usize,
}

impl SyncStatus {
    /// Compute counts over `entries` with the given failure threshold
    pub fn from_entries<'a>(
        entries: impl IntoIterator<Item = &'a SyncQueueEntry>,
        threshold: u32,
    ) -> Self {
        entries.into_iter().fold(Self::default(), |mut status, entry| {
            status.total += 1;
            if !entry.synced {
                status.pending += 1;
            }
            if entry.is_failed(threshold) {
                status.failed += 1;
            }
            status
        })
    }
}
