//! Per-collection record repository

use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::{Collection, DateRange, LocalId, Operation, SyncRecord};
use crate::store::schema::BY_OWNER;
use crate::store::{decode, decode_all, LocalStore, WriteOp};
use crate::sync::{ConnectivityMonitor, SyncQueue, SyncTrigger};

/// Typed access to one record collection.
///
/// Every write lands in the local store together with its sync queue entry
/// in one transaction; the network is never awaited.
pub struct Repository<R> {
    store: Arc<dyn LocalStore>,
    queue: Arc<SyncQueue>,
    connectivity: ConnectivityMonitor,
    trigger: SyncTrigger,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for Repository<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            queue: Arc::clone(&self.queue),
            connectivity: self.connectivity.clone(),
            trigger: self.trigger.clone(),
            _record: PhantomData,
        }
    }
}

impl<R: SyncRecord> Repository<R> {
    pub(crate) fn new(
        store: Arc<dyn LocalStore>,
        queue: Arc<SyncQueue>,
        connectivity: ConnectivityMonitor,
        trigger: SyncTrigger,
    ) -> Self {
        Self {
            store,
            queue,
            connectivity,
            trigger,
            _record: PhantomData,
        }
    }

    pub const fn collection(&self) -> Collection {
        R::COLLECTION
    }

    /// Persist a record and queue it for sync.
    ///
    /// A record without a `localId` is created; otherwise the stored record is
    /// updated. Returns the record as persisted.
    pub async fn save(&self, mut record: R) -> Result<R> {
        record.validate()?;

        let write_lock = self.queue.write_lock().await;
        let (local_id, operation) = match record.meta().local_id {
            None => {
                let local_id = LocalId::new();
                record.meta_mut().local_id = Some(local_id);
                (local_id, Operation::Create)
            }
            Some(local_id) => {
                let stored = self.load(&local_id).await?.ok_or_else(|| {
                    Error::NotFound(format!("{} record {local_id}", R::COLLECTION))
                })?;
                if stored.meta().is_pending_delete() {
                    return Err(Error::InvalidInput(format!(
                        "{} record {local_id} is pending deletion",
                        R::COLLECTION
                    )));
                }
                // Keep the server id learned from an earlier reconciliation
                if record.meta().server_id.is_none() {
                    record.meta_mut().server_id.clone_from(&stored.meta().server_id);
                }
                (local_id, Operation::Update)
            }
        };

        self.commit(&mut record, local_id, operation).await?;
        drop(write_lock);

        tracing::debug!("Saved {} record {local_id} ({operation})", R::COLLECTION);
        self.request_sync();
        Ok(record)
    }

    pub async fn get(&self, local_id: &LocalId) -> Result<Option<R>> {
        self.load(local_id).await
    }

    /// Records owned by `owner_id` within `range`, newest first.
    ///
    /// Records pending deletion are hidden.
    pub async fn list(&self, owner_id: &str, range: DateRange) -> Result<Vec<R>> {
        let documents = self
            .store
            .get_all_by_index(R::COLLECTION, BY_OWNER, &owner_id.into())
            .await?;
        let mut records: Vec<R> = decode_all(documents)?;

        records.retain(|record| {
            !record.meta().is_pending_delete() && range.contains(record.occurred_at())
        });
        records.sort_by(|a, b| {
            b.occurred_at()
                .cmp(&a.occurred_at())
                .then_with(|| b.meta().updated_at.cmp(&a.meta().updated_at))
        });
        Ok(records)
    }

    /// Mark a saved record for deletion and queue the DELETE
    pub async fn remove(&self, record: &R) -> Result<()> {
        let local_id = record.meta().local_id.ok_or_else(|| {
            Error::NotFound(format!("{} record has not been saved", R::COLLECTION))
        })?;
        self.remove_by_id(&local_id).await
    }

    pub async fn remove_by_id(&self, local_id: &LocalId) -> Result<()> {
        let write_lock = self.queue.write_lock().await;
        let mut stored = self
            .load(local_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("{} record {local_id}", R::COLLECTION)))?;

        if stored.meta().is_pending_delete() {
            return Ok(());
        }

        self.commit(&mut stored, *local_id, Operation::Delete).await?;
        drop(write_lock);

        tracing::debug!("Removed {} record {local_id}", R::COLLECTION);
        self.request_sync();
        Ok(())
    }

    /// Stamp `record`, then write it and its queue entry atomically
    async fn commit(&self, record: &mut R, local_id: LocalId, operation: Operation) -> Result<()> {
        self.queue.ensure_hydrated().await?;
        let stamp = self.queue.next_stamp();
        let meta = record.meta_mut();
        meta.synced = false;
        meta.pending_operation = Some(operation);
        meta.updated_at = stamp;

        let document = serde_json::to_value(&*record)?;
        let entry = self
            .queue
            .entry_for(R::COLLECTION, document.clone(), operation, stamp);

        self.store
            .apply(vec![
                WriteOp::Put {
                    collection: R::COLLECTION,
                    local_id: local_id.as_str(),
                    document,
                },
                WriteOp::put(Collection::SyncQueue, entry.id.clone(), &entry)?,
            ])
            .await?;

        self.queue.record_enqueued(entry);
        Ok(())
    }

    async fn load(&self, local_id: &LocalId) -> Result<Option<R>> {
        self.store
            .get(R::COLLECTION, &local_id.as_str())
            .await?
            .map(decode)
            .transpose()
    }

    fn request_sync(&self) {
        if self.connectivity.is_online() {
            self.trigger.request();
        }
    }
}
