//! Offline sync: queue, connectivity, remote contract, engine and worker

mod connectivity;
mod engine;
mod queue;
mod remote;
mod worker;

pub use connectivity::ConnectivityMonitor;
pub use engine::{SkipReason, SyncEngine, SyncOutcome, SyncReport};
pub use queue::SyncQueue;
pub use remote::{
    classify_http_status, HttpRemoteService, LocalOnlyRemote, RemoteError, RemoteResult,
    RemoteService, RetryClass,
};
pub use worker::{SyncTrigger, SyncWorkerHandle};

pub(crate) use worker::spawn as spawn_worker;
