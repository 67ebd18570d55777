//! Data models for Stride

mod collection;
mod consumption;
mod craving;
mod progress;
pub mod record;
mod sync_entry;
mod task;

pub use collection::Collection;
pub use consumption::ConsumptionLog;
pub use craving::CravingLog;
pub use progress::ProgressEntry;
pub use record::{DateRange, LocalId, Operation, RecordMeta, SyncRecord};
pub use sync_entry::{sort_fifo, SyncQueueEntry, SyncStatus, DEFAULT_FAILURE_THRESHOLD};
pub use task::Task;
