//! Background sync task and the fire-and-forget trigger that wakes it

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};

use super::engine::{SyncEngine, SyncOutcome};

/// Cheap handle used by writers to request a sync pass.
///
/// Backed by a channel of capacity 1: while a request is already queued,
/// further requests are dropped.
#[derive(Debug, Clone)]
pub struct SyncTrigger {
    sender: mpsc::Sender<()>,
    running: Arc<AtomicBool>,
}

impl SyncTrigger {
    pub(crate) fn channel(running: Arc<AtomicBool>) -> (Self, mpsc::Receiver<()>) {
        let (sender, receiver) = mpsc::channel(1);
        (Self { sender, running }, receiver)
    }

    /// Signal the worker without waiting. Returns whether a request was queued.
    pub fn request(&self) -> bool {
        if self.running.load(Ordering::Acquire) {
            return false;
        }
        self.sender.try_send(()).is_ok()
    }
}

/// Running background worker; dropping it detaches the task
#[derive(Debug)]
pub struct SyncWorkerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SyncWorkerHandle {
    /// Stop the worker and wait for an in-flight pass to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(error) = self.task.await {
            tracing::warn!("Sync worker terminated abnormally: {error}");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

pub(crate) fn spawn(
    engine: Arc<SyncEngine>,
    mut requests: mpsc::Receiver<()>,
    interval: Option<Duration>,
) -> SyncWorkerHandle {
    let (shutdown, mut shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut ticker = interval.map(|period| {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker
        });
        tracing::debug!("Sync worker started (interval: {interval:?})");

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                request = requests.recv() => {
                    if request.is_none() {
                        break;
                    }
                }
                () = next_tick(ticker.as_mut()) => {}
            }
            run_pass(&engine).await;
        }

        tracing::debug!("Sync worker stopped");
    });

    SyncWorkerHandle { shutdown, task }
}

async fn next_tick(ticker: Option<&mut Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn run_pass(engine: &SyncEngine) {
    match engine.run_sync().await {
        Ok(SyncOutcome::Skipped { reason }) => {
            tracing::debug!("Background sync skipped: {reason}");
        }
        Ok(outcome) => tracing::debug!("Background sync finished: {outcome:?}"),
        Err(error) => tracing::warn!("Background sync failed: {error}"),
    }
}
