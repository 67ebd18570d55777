//! Service layer shared by every client

mod storage;

pub use storage::OfflineStorageService;
