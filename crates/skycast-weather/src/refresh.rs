//! Periodic background refresh.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::sync::WeatherSynchronizer;

/// The fetch auto-refresh repeats
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RefreshTarget {
    /// Nothing fetched yet
    #[default]
    Idle,
    PlaceName(String),
    Coordinates { lat: f64, lon: f64 },
    /// Ask the geolocator again on every refresh
    CurrentLocation,
}

/// Handle to the refresh task. Dropping it stops future refreshes; a fetch
/// already in flight runs to completion.
pub struct AutoRefresh {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl AutoRefresh {
    /// Spawn the refresh loop on the current runtime.
    ///
    /// The timer restarts whenever the refresh target changes. A zero period
    /// disables refreshing.
    pub fn spawn(sync: WeatherSynchronizer, period: Duration) -> Self {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(sync, period, cancel.clone()));

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the loop and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!("Auto-refresh task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for AutoRefresh {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(sync: WeatherSynchronizer, period: Duration, cancel: CancellationToken) {
    if period.is_zero() {
        tracing::info!("Auto-refresh disabled");
        return;
    }

    let mut targets = sync.subscribe_target();
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::debug!("Auto-refresh every {:?}", period);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = targets.changed() => {
                if changed.is_err() {
                    break;
                }
                interval.reset();
                tracing::debug!("Refresh target changed, timer rescheduled");
            }
            _ = interval.tick() => {
                match sync.refresh().await {
                    None => tracing::debug!("Nothing to refresh yet"),
                    Some(Ok(outcome)) => tracing::debug!("Auto-refresh: {:?}", outcome),
                    Some(Err(e)) => tracing::warn!("Auto-refresh failed: {}", e),
                }
            }
        }
    }

    tracing::debug!("Auto-refresh stopped");
}
