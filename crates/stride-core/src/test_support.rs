//! Shared fixtures for unit tests

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::config::EngineSettings;
use crate::models::record::document_local_id;
use crate::models::{Collection, SyncRecord};
use crate::repository::Repository;
use crate::store::{Document, LocalStore, SqliteStore};
use crate::sync::{
    ConnectivityMonitor, RemoteError, RemoteResult, RemoteService, SyncEngine, SyncQueue,
    SyncTrigger,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone)]
pub struct RemoteCall {
    pub kind: CallKind,
    pub collection: Collection,
    pub server_id: Option<String>,
    pub payload: Option<Document>,
}

type CallHook = Box<dyn Fn(usize) + Send + Sync>;

/// In-memory remote that records every call and fails on request
#[derive(Default)]
pub struct RecordingRemote {
    calls: Mutex<Vec<RemoteCall>>,
    failing_local_ids: Mutex<HashSet<String>>,
    local_ids_by_server_id: Mutex<HashMap<String, String>>,
    fail_updates: AtomicBool,
    hang: AtomicBool,
    next_server_id: AtomicUsize,
    after_call: Mutex<Option<CallHook>>,
}

impl RecordingRemote {
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Every call touching this record fails
    pub fn fail_local_id(&self, local_id: &str) {
        self.failing_local_ids
            .lock()
            .unwrap()
            .insert(local_id.to_string());
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Calls never complete while set
    pub fn hang(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    /// Run `hook` with the running call count after each recorded call
    pub fn after_call(&self, hook: impl Fn(usize) + Send + Sync + 'static) {
        *self.after_call.lock().unwrap() = Some(Box::new(hook));
    }

    async fn record(&self, call: RemoteCall, local_id: Option<String>) -> RemoteResult<()> {
        let count = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(call.clone());
            calls.len()
        };
        if let Some(hook) = self.after_call.lock().unwrap().as_ref() {
            hook(count);
        }

        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        let failing = local_id
            .is_some_and(|id| self.failing_local_ids.lock().unwrap().contains(&id));
        let update_blocked =
            call.kind == CallKind::Update && self.fail_updates.load(Ordering::SeqCst);
        if failing || update_blocked {
            return Err(RemoteError::Api {
                status: 503,
                message: "scripted failure".to_string(),
            });
        }
        Ok(())
    }

    fn local_id_for_server_id(&self, server_id: &str) -> Option<String> {
        self.local_ids_by_server_id
            .lock()
            .unwrap()
            .get(server_id)
            .cloned()
    }
}

#[async_trait]
impl RemoteService for RecordingRemote {
    async fn create(&self, collection: Collection, payload: &Document) -> RemoteResult<String> {
        let local_id = document_local_id(payload).map(str::to_string);
        let call = RemoteCall {
            kind: CallKind::Create,
            collection,
            server_id: None,
            payload: Some(payload.clone()),
        };
        self.record(call, local_id.clone()).await?;

        let server_id = format!("srv-{}", self.next_server_id.fetch_add(1, Ordering::SeqCst) + 1);
        if let Some(local_id) = local_id {
            self.local_ids_by_server_id
                .lock()
                .unwrap()
                .insert(server_id.clone(), local_id);
        }
        Ok(server_id)
    }

    async fn update(
        &self,
        collection: Collection,
        server_id: &str,
        payload: &Document,
    ) -> RemoteResult<()> {
        let call = RemoteCall {
            kind: CallKind::Update,
            collection,
            server_id: Some(server_id.to_string()),
            payload: Some(payload.clone()),
        };
        self.record(call, document_local_id(payload).map(str::to_string))
            .await
    }

    async fn delete(&self, collection: Collection, server_id: &str) -> RemoteResult<()> {
        let call = RemoteCall {
            kind: CallKind::Delete,
            collection,
            server_id: Some(server_id.to_string()),
            payload: None,
        };
        self.record(call, self.local_id_for_server_id(server_id))
            .await
    }
}

/// Store, queue, monitor, remote and engine wired together
pub struct Harness {
    pub store: Arc<dyn LocalStore>,
    pub queue: Arc<SyncQueue>,
    pub connectivity: ConnectivityMonitor,
    pub remote: Arc<RecordingRemote>,
    pub engine: SyncEngine,
    pub trigger: SyncTrigger,
    pub requests: mpsc::Receiver<()>,
    settings: EngineSettings,
}

impl Harness {
    pub async fn online() -> Self {
        Self::with_settings(true, EngineSettings::default()).await
    }

    pub async fn offline() -> Self {
        Self::with_settings(false, EngineSettings::default()).await
    }

    pub async fn with_settings(online: bool, settings: EngineSettings) -> Self {
        let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
        Self::on_store(store, online, settings)
    }

    pub fn on_store(store: Arc<dyn LocalStore>, online: bool, settings: EngineSettings) -> Self {
        let queue = Arc::new(SyncQueue::new(Arc::clone(&store)));
        Self::assemble(
            store,
            queue,
            ConnectivityMonitor::new(online),
            Arc::new(RecordingRemote::default()),
            settings,
        )
    }

    /// Swap in `remote`, rebuilding the engine around it
    pub fn with_remote(self, remote: Arc<RecordingRemote>) -> Self {
        Self::assemble(self.store, self.queue, self.connectivity, remote, self.settings)
    }

    pub fn repository<R: SyncRecord>(&self) -> Repository<R> {
        Repository::new(
            Arc::clone(&self.store),
            Arc::clone(&self.queue),
            self.connectivity.clone(),
            self.trigger.clone(),
        )
    }

    fn assemble(
        store: Arc<dyn LocalStore>,
        queue: Arc<SyncQueue>,
        connectivity: ConnectivityMonitor,
        remote: Arc<RecordingRemote>,
        settings: EngineSettings,
    ) -> Self {
        let engine = SyncEngine::new(
            Arc::clone(&store),
            Arc::clone(&queue),
            Arc::clone(&remote) as Arc<dyn RemoteService>,
            connectivity.clone(),
            settings.clone(),
        );
        let (trigger, requests) = SyncTrigger::channel(engine.running_flag());
        Self {
            store,
            queue,
            connectivity,
            remote,
            engine,
            trigger,
            requests,
            settings,
        }
    }
}
