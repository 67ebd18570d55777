//! Durable sync queue persisted in the local store

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Mutex as AsyncMutex;

use crate::error::Result;
use crate::models::{sort_fifo, Collection, Operation, SyncQueueEntry, SyncStatus};
use crate::store::schema::{BY_LOCAL_ID, BY_SYNCED};
use crate::store::{decode_all, Document, IndexValue, LocalStore, WriteOp};
use crate::util::now_millis;

/// Ordered log of pending mutations.
///
/// Rows live in the `sync_queue` collection; `view` mirrors the unsynced rows
/// in FIFO order so a pass can snapshot its work without a store round trip.
pub struct SyncQueue {
    store: Arc<dyn LocalStore>,
    view: Mutex<Vec<SyncQueueEntry>>,
    hydrated: AtomicBool,
    last_stamp: AtomicI64,
    write_lock: AsyncMutex<()>,
}

impl SyncQueue {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self {
            store,
            view: Mutex::new(Vec::new()),
            hydrated: AtomicBool::new(false),
            last_stamp: AtomicI64::new(0),
            write_lock: AsyncMutex::new(()),
        }
    }

    /// Serializes read-modify-write cycles on records and their queue rows.
    ///
    /// Held by the repository while saving and by the engine while
    /// reconciling, never across a remote call.
    pub async fn write_lock(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    /// Next enqueue timestamp: wall-clock ms, bumped so it never repeats
    pub fn next_stamp(&self) -> i64 {
        let now = now_millis();
        let previous = self
            .last_stamp
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(now.max(last.saturating_add(1)))
            })
            .unwrap_or_else(|last| last);
        now.max(previous.saturating_add(1))
    }

    /// Build an entry for `payload`; nothing is persisted yet
    pub fn entry_for(
        &self,
        collection: Collection,
        payload: Document,
        operation: Operation,
        enqueued_at: i64,
    ) -> SyncQueueEntry {
        SyncQueueEntry::new(collection, payload, operation, enqueued_at)
    }

    /// Add a committed entry to the in-memory view
    pub fn record_enqueued(&self, entry: SyncQueueEntry) {
        let mut view = self.view();
        // A concurrent rehydrate may already have loaded it
        if view.iter().any(|existing| existing.id == entry.id) {
            return;
        }
        view.push(entry);
        sort_fifo(&mut view);
    }

    /// Drop an entry from the in-memory view once it is resolved
    pub fn forget(&self, entry_id: &str) {
        self.view().retain(|entry| entry.id != entry_id);
    }

    /// Replace an entry in the in-memory view with its latest persisted state
    pub fn refresh(&self, updated: &SyncQueueEntry) {
        if let Some(entry) = self.view().iter_mut().find(|entry| entry.id == updated.id) {
            entry.clone_from(updated);
        }
    }

    /// Reload the in-memory view from the store
    pub async fn rehydrate(&self) -> Result<usize> {
        let documents = self
            .store
            .get_all_by_index(Collection::SyncQueue, BY_SYNCED, &IndexValue::Bool(false))
            .await?;
        let mut entries: Vec<SyncQueueEntry> = decode_all(documents)?;
        sort_fifo(&mut entries);

        if let Some(newest) = entries.last() {
            self.last_stamp
                .fetch_max(newest.enqueued_at, Ordering::AcqRel);
        }

        let count = entries.len();
        *self.view() = entries;
        self.hydrated.store(true, Ordering::Release);
        tracing::debug!("Sync queue rehydrated with {count} pending entries");
        Ok(count)
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated.load(Ordering::Acquire)
    }

    /// Load rows persisted by an earlier process, once.
    ///
    /// Must run before stamping new entries so stamps resume above them.
    pub async fn ensure_hydrated(&self) -> Result<()> {
        if !self.is_hydrated() {
            self.rehydrate().await?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.view().is_empty()
    }

    pub fn len(&self) -> usize {
        self.view().len()
    }

    /// Unsynced entries in processing order
    pub fn pending_snapshot(&self) -> Vec<SyncQueueEntry> {
        let mut snapshot: Vec<SyncQueueEntry> = self
            .view()
            .iter()
            .filter(|entry| !entry.synced)
            .cloned()
            .collect();
        sort_fifo(&mut snapshot);
        snapshot
    }

    /// Whether any unsynced row other than `excluding` references `local_id`
    pub async fn has_pending_for(&self, local_id: &str, excluding: &str) -> Result<bool> {
        let documents = self
            .store
            .get_all_by_index(Collection::SyncQueue, BY_LOCAL_ID, &local_id.into())
            .await?;
        let entries: Vec<SyncQueueEntry> = decode_all(documents)?;
        Ok(entries
            .iter()
            .any(|entry| !entry.synced && entry.id != excluding))
    }

    /// Every queue row, synced or not, in processing order
    pub async fn all_entries(&self) -> Result<Vec<SyncQueueEntry>> {
        let mut entries: Vec<SyncQueueEntry> =
            decode_all(self.store.get_all(Collection::SyncQueue).await?)?;
        sort_fifo(&mut entries);
        Ok(entries)
    }

    /// Aggregate counts over every queue row
    pub async fn status(&self, failure_threshold: u32) -> Result<SyncStatus> {
        let entries = self.all_entries().await?;
        Ok(SyncStatus::from_entries(&entries, failure_threshold))
    }

    /// Delete synced rows enqueued before `cutoff_ms`; unsynced rows are never touched
    pub async fn cleanup(&self, cutoff_ms: i64) -> Result<usize> {
        let documents = self
            .store
            .get_all_by_index(Collection::SyncQueue, BY_SYNCED, &IndexValue::Bool(true))
            .await?;
        let entries: Vec<SyncQueueEntry> = decode_all(documents)?;

        let batch: Vec<WriteOp> = entries
            .iter()
            .filter(|entry| entry.synced && entry.enqueued_at < cutoff_ms)
            .map(|entry| WriteOp::delete(Collection::SyncQueue, entry.id.clone()))
            .collect();
        let removed = batch.len();

        self.store.apply(batch).await?;
        Ok(removed)
    }

    /// Remove every row and reset the in-memory view
    pub async fn clear(&self) -> Result<()> {
        self.store.clear(Collection::SyncQueue).await?;
        self.view().clear();
        Ok(())
    }

    fn view(&self) -> MutexGuard<'_, Vec<SyncQueueEntry>> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
