//! Background refresh of stale cache entries.
//!
//! One refresher runs per polling-enabled credential. It wakes on a fixed
//! interval, re-fetches whatever is stale using the coordinates already
//! stored (no geocoding), and replaces each snapshot outright. Failures
//! never remove an entry; stale data stays servable until a refresh
//! succeeds.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::OwmClient;
use crate::registry::CacheHandle;

/// Handle to one credential's background refresh task.
pub struct Refresher {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Refresher {
    /// Spawn the refresh loop on the ambient Tokio runtime.
    pub(crate) fn spawn(
        handle: CacheHandle,
        client: Arc<OwmClient>,
        poll_interval: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(handle, client, poll_interval, cancel.clone()));
        Self { cancel, task }
    }

    /// Signal the loop to stop and wait for it to finish.
    ///
    /// An in-flight fetch is allowed to complete; the loop observes the
    /// cancellation at its next select point.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!("refresher task did not join cleanly: {e}");
        }
    }
}

async fn run(
    handle: CacheHandle,
    client: Arc<OwmClient>,
    poll_interval: Duration,
    cancel: CancellationToken,
) {
    let start = tokio::time::Instant::now() + poll_interval;
    let mut ticker = tokio::time::interval_at(start, poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("refresher stopping");
                break;
            }
            _ = ticker.tick() => {
                refresh_cycle(&handle, &client).await;
            }
        }
    }
}

/// One pass over the cache: collect the stale entries under the lock, then
/// fetch outside it and store each replacement.
async fn refresh_cycle(handle: &CacheHandle, client: &OwmClient) {
    let stale = handle.stale_entries(Utc::now());
    if stale.is_empty() {
        return;
    }
    tracing::debug!(count = stale.len(), "refreshing stale entries");

    for (city, lat, lon) in stale {
        match client.current_weather(lat, lon).await {
            Ok(observation) => {
                handle.store(&city, observation.into_snapshot(&city, lat, lon));
                tracing::debug!(city = %city, "entry refreshed");
            }
            Err(e) => {
                // The stale entry stays servable until a later cycle or a
                // foreground call replaces it.
                tracing::warn!(city = %city, "background refresh failed: {e}");
            }
        }
    }
}
