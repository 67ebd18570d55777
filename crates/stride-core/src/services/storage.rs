//! Composition root for local storage and sync

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

use crate::config::EngineSettings;
use crate::error::{Error, Result};
use crate::models::{
    Collection, ConsumptionLog, CravingLog, ProgressEntry, SyncQueueEntry, SyncRecord, SyncStatus,
    Task,
};
use crate::repository::Repository;
use crate::store::{LocalStore, SqliteStore};
use crate::sync::{
    spawn_worker, ConnectivityMonitor, RemoteService, SyncEngine, SyncOutcome, SyncQueue,
    SyncTrigger, SyncWorkerHandle,
};
use crate::util::{now_millis, retention_cutoff};

/// Offline-first storage: repositories, the sync queue and the sync engine
/// sharing one local store.
///
/// Collaborators are injected; the service owns no global state.
pub struct OfflineStorageService {
    store: Arc<dyn LocalStore>,
    queue: Arc<SyncQueue>,
    connectivity: ConnectivityMonitor,
    engine: Arc<SyncEngine>,
    trigger: SyncTrigger,
    requests: Mutex<Option<mpsc::Receiver<()>>>,
    settings: EngineSettings,
}

impl OfflineStorageService {
    pub fn new(
        store: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteService>,
        connectivity: ConnectivityMonitor,
        settings: EngineSettings,
    ) -> Self {
        let queue = Arc::new(SyncQueue::new(Arc::clone(&store)));
        let engine = Arc::new(SyncEngine::new(
            Arc::clone(&store),
            Arc::clone(&queue),
            remote,
            connectivity.clone(),
            settings.clone(),
        ));
        let (trigger, requests) = SyncTrigger::channel(engine.running_flag());

        let on_online = trigger.clone();
        connectivity.on_online(move || {
            on_online.request();
        });

        Self {
            store,
            queue,
            connectivity,
            engine,
            trigger,
            requests: Mutex::new(Some(requests)),
            settings,
        }
    }

    /// Open (or create) a SQLite-backed service at `path` and load its queue
    pub async fn open_sqlite(
        path: impl Into<PathBuf>,
        remote: Arc<dyn RemoteService>,
        connectivity: ConnectivityMonitor,
        settings: EngineSettings,
    ) -> Result<Self> {
        let store = Arc::new(SqliteStore::open(path).await?);
        let service = Self::new(store, remote, connectivity, settings);
        service.initialize().await?;
        Ok(service)
    }

    /// Load pending queue entries left by a previous run
    pub async fn initialize(&self) -> Result<usize> {
        let pending = self.queue.rehydrate().await?;
        if pending > 0 {
            tracing::info!("Loaded {pending} pending sync entries");
        }
        Ok(pending)
    }

    pub fn repository<R: SyncRecord>(&self) -> Repository<R> {
        Repository::new(
            Arc::clone(&self.store),
            Arc::clone(&self.queue),
            self.connectivity.clone(),
            self.trigger.clone(),
        )
    }

    pub fn progress(&self) -> Repository<ProgressEntry> {
        self.repository()
    }

    pub fn cravings(&self) -> Repository<CravingLog> {
        self.repository()
    }

    pub fn tasks(&self) -> Repository<Task> {
        self.repository()
    }

    pub fn consumption(&self) -> Repository<ConsumptionLog> {
        self.repository()
    }

    /// Run one sync pass now
    pub async fn run_sync(&self) -> Result<SyncOutcome> {
        self.engine.run_sync().await
    }

    pub async fn get_sync_status(&self) -> Result<SyncStatus> {
        self.queue.status(self.settings.failure_threshold).await
    }

    /// Every queue row, oldest first
    pub async fn sync_queue_entries(&self) -> Result<Vec<SyncQueueEntry>> {
        self.queue.all_entries().await
    }

    /// Delete synced queue rows older than `retention_days`
    pub async fn cleanup_old_sync_items(&self, retention_days: u32) -> Result<usize> {
        let cutoff = retention_cutoff(now_millis(), retention_days);
        let _write_lock = self.queue.write_lock().await;
        let removed = self.queue.cleanup(cutoff).await?;
        tracing::info!("Removed {removed} synced entries older than {retention_days} days");
        Ok(removed)
    }

    /// Wipe every collection, the queue included
    pub async fn clear_all_data(&self) -> Result<()> {
        let _write_lock = self.queue.write_lock().await;
        for collection in Collection::RECORDS {
            self.store.clear(collection).await?;
        }
        self.queue.clear().await?;
        tracing::info!("Cleared all local data");
        Ok(())
    }

    pub const fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Spawn the background worker. Only one worker may be started.
    pub fn start_background_sync(&self) -> Result<SyncWorkerHandle> {
        let requests = self
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| Error::InvalidInput("background sync already started".to_string()))?;

        Ok(spawn_worker(
            Arc::clone(&self.engine),
            requests,
            self.settings.sync_interval,
        ))
    }
}
