//! Reachability probe that feeds the connectivity monitor.

use std::time::Duration;

use stride_core::ConnectivityMonitor;
use tokio::task::JoinHandle;

const PROBE_TIMEOUT_SECS: u64 = 4;
const HEALTH_PATH: &str = "health";

/// Issues `GET {base}/health`; any HTTP response counts as reachable.
#[derive(Debug, Clone)]
pub struct ReachabilityProbe {
    url: String,
    client: reqwest::Client,
}

impl ReachabilityProbe {
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            url: health_url(base_url),
            client,
        })
    }

    pub async fn is_reachable(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(_) => true,
            Err(error) => {
                tracing::warn!("Remote unreachable at {}: {error}", self.url);
                false
            }
        }
    }

    /// Probe once and apply the result to `monitor`
    pub async fn refresh(&self, monitor: &ConnectivityMonitor) -> bool {
        let online = self.is_reachable().await;
        monitor.set_online(online);
        online
    }

    /// Keep probing every `period` until the task is aborted
    pub fn spawn_periodic(self, monitor: ConnectivityMonitor, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.refresh(&monitor).await;
            }
        })
    }
}

pub fn health_url(base_url: &str) -> String {
    format!("{}/{HEALTH_PATH}", base_url.trim().trim_end_matches('/'))
}
