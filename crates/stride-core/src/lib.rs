//! stride-core - Core library for Stride
//!
//! Offline-first persistence for the Stride clients: typed record
//! repositories over a local document store, a durable sync queue, and the
//! engine that replays it against a remote service.

pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;
pub mod store;
pub mod sync;
pub mod util;

#[cfg(test)]
mod test_support;

pub use config::EngineSettings;
pub use error::{Error, Result};
pub use models::{
    Collection, ConsumptionLog, CravingLog, DateRange, LocalId, Operation, ProgressEntry,
    SyncQueueEntry, SyncRecord, SyncStatus, Task,
};
pub use repository::Repository;
pub use services::OfflineStorageService;
pub use sync::{ConnectivityMonitor, SyncOutcome, SyncReport};
