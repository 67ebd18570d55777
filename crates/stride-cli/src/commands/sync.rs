use std::time::Duration;

use serde::Serialize;
use stride_core::sync::RemoteError;
use stride_core::{OfflineStorageService, SyncOutcome, SyncReport, SyncStatus};

use crate::commands::common::open_service;
use crate::config::Context;
use crate::error::CliError;
use crate::probe::ReachabilityProbe;

const WATCH_PROBE_INTERVAL_SECS: u64 = 30;

pub async fn run_sync(context: &Context, watch: bool) -> Result<(), CliError> {
    let remote_url = context
        .remote_url
        .as_deref()
        .ok_or(CliError::SyncNotConfigured)?;
    let service = open_service(context).await?;
    let probe = ReachabilityProbe::new(remote_url).map_err(RemoteError::from)?;

    if watch {
        return run_watch(&service, probe, context.force_offline).await;
    }

    if !context.force_offline {
        probe.refresh(service.connectivity()).await;
    }
    let outcome = service.run_sync().await?;
    println!("{}", format_sync_outcome(&outcome));
    Ok(())
}

/// Passes are driven by the worker only: the first successful probe flips
/// the monitor online, which queues the initial pass.
async fn run_watch(
    service: &OfflineStorageService,
    probe: ReachabilityProbe,
    force_offline: bool,
) -> Result<(), CliError> {
    let worker = service.start_background_sync()?;
    let probe_task = (!force_offline).then(|| {
        probe.spawn_periodic(
            service.connectivity().clone(),
            Duration::from_secs(WATCH_PROBE_INTERVAL_SECS),
        )
    });

    let pending = service.get_sync_status().await?.pending;
    println!("Watching for changes ({pending} pending). Press Ctrl-C to stop.");

    tokio::signal::ctrl_c().await?;

    if let Some(task) = probe_task {
        task.abort();
    }
    worker.shutdown().await;
    Ok(())
}

pub async fn run_status(context: &Context, as_json: bool) -> Result<(), CliError> {
    let service = open_service(context).await?;
    let status = service.get_sync_status().await?;
    let threshold = context.settings.failure_threshold;

    if as_json {
        let item = StatusItem {
            status,
            failure_threshold: threshold,
            remote: context.remote_url.as_deref(),
        };
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        for line in format_status_lines(&status, threshold, context.remote_url.as_deref()) {
            println!("{line}");
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct StatusItem<'a> {
    #[serde(flatten)]
    pub status: SyncStatus,
    pub failure_threshold: u32,
    pub remote: Option<&'a str>,
}

pub fn format_status_lines(status: &SyncStatus, threshold: u32, remote: Option<&str>) -> Vec<String> {
    vec![
        format!("Pending: {}", status.pending),
        format!("Failed:  {} (>= {threshold} attempts)", status.failed),
        format!("Total:   {}", status.total),
        format!("Remote:  {}", remote.unwrap_or("not configured (local only)")),
    ]
}

pub fn format_sync_outcome(outcome: &SyncOutcome) -> String {
    match outcome {
        SyncOutcome::Completed(report) => format!("Sync completed: {}", format_report(report)),
        SyncOutcome::Incomplete(report) => {
            format!("Sync interrupted (went offline): {}", format_report(report))
        }
        SyncOutcome::Skipped { reason } => format!("Sync skipped: {reason}"),
    }
}

fn format_report(report: &SyncReport) -> String {
    format!(
        "{} sent, {} failed, {} deferred, {} pending",
        report.succeeded, report.failed, report.deferred, report.remaining
    )
}
