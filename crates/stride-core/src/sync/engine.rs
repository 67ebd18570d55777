//! Drains the sync queue against the remote service

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use super::connectivity::ConnectivityMonitor;
use super::queue::SyncQueue;
use super::remote::{RemoteError, RemoteResult, RemoteService, RetryClass};
use crate::config::EngineSettings;
use crate::error::Result;
use crate::models::record::{document_server_id, reconcile_document};
use crate::models::{Collection, Operation, SyncQueueEntry};
use crate::store::{LocalStore, WriteOp};

/// Why a pass did not run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyRunning,
    Offline,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRunning => f.write_str("a sync pass is already running"),
            Self::Offline => f.write_str("offline"),
        }
    }
}

/// Counters for one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Entries sent to the remote service
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Held back because an earlier entry for the same record failed
    pub deferred: usize,
    /// Unsynced entries left once the pass ended
    pub remaining: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Every snapshotted entry was attempted
    Completed(SyncReport),
    /// Connectivity dropped mid-pass; completed work is kept
    Incomplete(SyncReport),
    Skipped { reason: SkipReason },
}

impl SyncOutcome {
    pub const fn report(&self) -> Option<&SyncReport> {
        match self {
            Self::Completed(report) | Self::Incomplete(report) => Some(report),
            Self::Skipped { .. } => None,
        }
    }

    const fn skipped(reason: SkipReason) -> Self {
        Self::Skipped { reason }
    }
}

/// Releases the single-pass flag on drop
struct PassGuard<'a>(&'a AtomicBool);

impl<'a> PassGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Sends queued mutations to the remote service and reconciles local state.
///
/// At most one pass runs at a time. Per-record order is preserved: once an
/// entry for a record fails, later entries for that record wait for the
/// next pass.
pub struct SyncEngine {
    store: Arc<dyn LocalStore>,
    queue: Arc<SyncQueue>,
    remote: Arc<dyn RemoteService>,
    connectivity: ConnectivityMonitor,
    settings: EngineSettings,
    running: Arc<AtomicBool>,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn LocalStore>,
        queue: Arc<SyncQueue>,
        remote: Arc<dyn RemoteService>,
        connectivity: ConnectivityMonitor,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            queue,
            remote,
            connectivity,
            settings,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Run one pass over the pending entries.
    ///
    /// Remote failures are recorded on the entries and never returned; an
    /// `Err` means the local store itself failed.
    pub async fn run_sync(&self) -> Result<SyncOutcome> {
        let Some(_guard) = PassGuard::acquire(&self.running) else {
            return Ok(SyncOutcome::skipped(SkipReason::AlreadyRunning));
        };
        if !self.connectivity.is_online() {
            return Ok(SyncOutcome::skipped(SkipReason::Offline));
        }

        {
            let _write_lock = self.queue.write_lock().await;
            if !self.queue.is_hydrated() || self.queue.is_empty() {
                self.queue.rehydrate().await?;
            }
        }
        let snapshot = self.queue.pending_snapshot();
        tracing::debug!("Sync pass started with {} pending entries", snapshot.len());

        let mut report = SyncReport::default();
        let mut blocked: HashSet<String> = HashSet::new();
        let mut interrupted = false;

        for entry in snapshot {
            if !self.connectivity.is_online() {
                interrupted = true;
                break;
            }

            let record_key = entry.local_id().map(str::to_string);
            if record_key.as_ref().is_some_and(|key| blocked.contains(key)) {
                report.deferred += 1;
                continue;
            }

            report.attempted += 1;
            let delivered = match self.deliver(&entry).await {
                Ok(server_id) => self.acknowledge(entry, server_id).await,
                Err(error) => self.record_failure(entry, &error).await,
            };

            if delivered {
                report.succeeded += 1;
            } else {
                report.failed += 1;
                if let Some(key) = record_key {
                    blocked.insert(key);
                }
            }
        }

        self.queue.rehydrate().await?;
        report.remaining = self.queue.len();

        tracing::info!(
            "Sync pass {}: {} succeeded, {} failed, {} deferred, {} remaining",
            if interrupted { "interrupted" } else { "finished" },
            report.succeeded,
            report.failed,
            report.deferred,
            report.remaining
        );

        Ok(if interrupted {
            SyncOutcome::Incomplete(report)
        } else {
            SyncOutcome::Completed(report)
        })
    }

    /// Send one entry, returning the server id assigned by a CREATE
    async fn deliver(&self, entry: &SyncQueueEntry) -> RemoteResult<Option<String>> {
        let server_id = match entry.operation {
            Operation::Create => None,
            Operation::Update | Operation::Delete => Some(self.server_id_for(entry).await?),
        };

        let call = async {
            match (entry.operation, server_id.as_deref()) {
                (Operation::Create, _) => self
                    .remote
                    .create(entry.collection, &entry.payload)
                    .await
                    .map(Some),
                (Operation::Update, Some(server_id)) => self
                    .remote
                    .update(entry.collection, server_id, &entry.payload)
                    .await
                    .map(|()| None),
                (Operation::Delete, Some(server_id)) => self
                    .remote
                    .delete(entry.collection, server_id)
                    .await
                    .map(|()| None),
                (_, None) => Err(missing_server_id(entry)),
            }
        };

        let timeout = self.settings.remote_call_timeout;
        tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| RemoteError::Timeout(timeout))?
    }

    /// The record's current server id, falling back to the queued payload's
    async fn server_id_for(&self, entry: &SyncQueueEntry) -> RemoteResult<String> {
        let local_id = entry
            .local_id()
            .ok_or_else(|| RemoteError::InvalidPayload("payload has no localId".to_string()))?;

        let stored = match self.store.get(entry.collection, local_id).await {
            Ok(document) => document,
            Err(error) => {
                tracing::warn!("Failed to load {} record {local_id}: {error}", entry.collection);
                None
            }
        };

        stored
            .as_ref()
            .and_then(document_server_id)
            .or_else(|| document_server_id(&entry.payload))
            .map(str::to_string)
            .ok_or_else(|| missing_server_id(entry))
    }

    /// Commit the effects of an acknowledged entry in one batch
    async fn acknowledge(&self, mut entry: SyncQueueEntry, server_id: Option<String>) -> bool {
        let _write_lock = self.queue.write_lock().await;
        entry.mark_synced();

        match self.reconcile_batch(&entry, server_id.as_deref()).await {
            Ok(batch) => {
                if let Err(error) = self.store.apply(batch).await {
                    tracing::warn!(
                        "Failed to reconcile {} entry {}: {error}",
                        entry.operation,
                        entry.id
                    );
                    return false;
                }
            }
            Err(error) => {
                tracing::warn!("Failed to reconcile entry {}: {error}", entry.id);
                return false;
            }
        }

        self.queue.forget(&entry.id);
        tracing::debug!(
            "Synced {} {} entry {}",
            entry.collection,
            entry.operation,
            entry.id
        );
        true
    }

    async fn reconcile_batch(
        &self,
        entry: &SyncQueueEntry,
        server_id: Option<&str>,
    ) -> Result<Vec<WriteOp>> {
        let Some(local_id) = entry.local_id() else {
            return Ok(vec![WriteOp::put(Collection::SyncQueue, entry.id.clone(), entry)?]);
        };

        if entry.operation == Operation::Delete {
            return Ok(vec![
                WriteOp::delete(entry.collection, local_id),
                WriteOp::delete(Collection::SyncQueue, entry.id.clone()),
            ]);
        }

        let mut batch = Vec::with_capacity(2);
        if let Some(mut document) = self.store.get(entry.collection, local_id).await? {
            let fully_synced = !self.queue.has_pending_for(local_id, &entry.id).await?;
            reconcile_document(&mut document, server_id, fully_synced)?;
            batch.push(WriteOp::Put {
                collection: entry.collection,
                local_id: local_id.to_string(),
                document,
            });
        }
        batch.push(WriteOp::put(Collection::SyncQueue, entry.id.clone(), entry)?);
        Ok(batch)
    }

    async fn record_failure(&self, mut entry: SyncQueueEntry, error: &RemoteError) -> bool {
        let _write_lock = self.queue.write_lock().await;
        entry.record_failure();

        let threshold = self.settings.failure_threshold;
        if entry.attempts >= threshold {
            tracing::warn!(
                "{} entry {} failed {} times (threshold {threshold}): {error}",
                entry.operation,
                entry.id,
                entry.attempts
            );
        } else if error.retry_class() == RetryClass::Permanent {
            tracing::warn!(
                "{} entry {} rejected by remote: {error}",
                entry.operation,
                entry.id
            );
        } else {
            tracing::debug!(
                "{} entry {} failed (attempt {}): {error}",
                entry.operation,
                entry.id,
                entry.attempts
            );
        }

        let persisted = match WriteOp::put(Collection::SyncQueue, entry.id.clone(), &entry) {
            Ok(op) => self.store.apply(vec![op]).await,
            Err(error) => Err(error),
        };
        match persisted {
            Ok(()) => self.queue.refresh(&entry),
            Err(error) => tracing::warn!("Failed to persist attempt for entry {}: {error}", entry.id),
        }
        false
    }
}

fn missing_server_id(entry: &SyncQueueEntry) -> RemoteError {
    RemoteError::MissingServerId(entry.local_id().unwrap_or(entry.id.as_str()).to_string())
}
