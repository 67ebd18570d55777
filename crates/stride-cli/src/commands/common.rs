use std::sync::Arc;

use chrono::DateTime;
use stride_core::sync::{HttpRemoteService, LocalOnlyRemote, RemoteService};
use stride_core::{
    ConnectivityMonitor, ConsumptionLog, CravingLog, OfflineStorageService, ProgressEntry,
    SyncRecord, Task,
};

use crate::config::Context;
use crate::error::CliError;

/// Open the local store with the configured remote.
///
/// The monitor starts offline; only `sync` probes the remote.
pub async fn open_service(context: &Context) -> Result<OfflineStorageService, CliError> {
    let remote: Arc<dyn RemoteService> = match &context.remote_url {
        Some(url) => {
            let mut remote = HttpRemoteService::new(url.as_str())?;
            if let Some(token) = &context.remote_token {
                remote = remote.with_bearer_token(token.as_str());
            }
            Arc::new(remote)
        }
        None => Arc::new(LocalOnlyRemote),
    };

    let service = OfflineStorageService::open_sqlite(
        &context.db_path,
        remote,
        ConnectivityMonitor::new(false),
        context.settings.clone(),
    )
    .await?;
    Ok(service)
}

/// One-line human description of a record
pub trait RecordSummary: SyncRecord {
    fn summary(&self) -> String;
}

impl RecordSummary for CravingLog {
    fn summary(&self) -> String {
        let mut summary = format!(
            "{}  craving {}/10",
            format_timestamp(self.logged_at),
            self.intensity
        );
        if let Some(trigger) = &self.trigger {
            summary.push_str(&format!(", trigger: {trigger}"));
        }
        if self.resisted {
            summary.push_str(", resisted");
        }
        append_notes(summary, &self.notes)
    }
}

impl RecordSummary for ProgressEntry {
    fn summary(&self) -> String {
        append_notes(
            format!("{}  mood {}/10", self.date, self.mood_score),
            &self.notes,
        )
    }
}

impl RecordSummary for Task {
    fn summary(&self) -> String {
        format!(
            "{}  [{}] {}",
            self.due_date,
            if self.completed { "x" } else { " " },
            self.title
        )
    }
}

impl RecordSummary for ConsumptionLog {
    fn summary(&self) -> String {
        append_notes(
            format!(
                "{}  {} {}",
                format_timestamp(self.consumed_at),
                self.quantity,
                self.unit
            ),
            &self.notes,
        )
    }
}

fn append_notes(mut summary: String, notes: &str) -> String {
    if !notes.is_empty() {
        summary.push_str(&format!(" ({notes})"));
    }
    summary
}

pub fn format_record_line<R: RecordSummary>(record: &R) -> String {
    let id = record
        .meta()
        .local_id
        .map_or_else(|| "-".to_string(), |id| id.to_string());
    format!("{id}  {}  [{}]", record.summary(), sync_state(record))
}

pub fn format_record_lines<R: RecordSummary>(records: &[R]) -> Vec<String> {
    records.iter().map(format_record_line).collect()
}

pub fn sync_state<R: SyncRecord>(record: &R) -> String {
    let meta = record.meta();
    match meta.pending_operation {
        _ if meta.synced => "synced".to_string(),
        Some(operation) => format!("pending {}", operation.as_str().to_ascii_lowercase()),
        None => "pending".to_string(),
    }
}

/// Render unix ms as `YYYY-MM-DD HH:MM` (UTC)
pub fn format_timestamp(timestamp_ms: i64) -> String {
    DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |datetime| datetime.format("%Y-%m-%d %H:%M").to_string(),
    )
}
