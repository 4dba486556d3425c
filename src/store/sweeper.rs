//! Periodic expiry sweep.
//!
//! Records are only ever destroyed here: a background task deletes expired
//! records in batches on a fixed interval. Revocation never deletes, so the
//! audit trail survives until expiry regardless of how a session ended.

use crate::store::TokenStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub struct ExpirySweeper {
    store: Arc<dyn TokenStore>,
    interval: Duration,
    batch_size: usize,
}

impl ExpirySweeper {
    #[must_use]
    pub fn new(store: Arc<dyn TokenStore>, interval: Duration, batch_size: usize) -> Self {
        Self {
            store,
            interval,
            batch_size,
        }
    }

    /// Run one full sweep, draining expired records batch by batch.
    ///
    /// A store failure ends the pass early; the next interval retries.
    pub async fn sweep_once(&self) -> u64 {
        let mut total = 0;
        loop {
            match self.store.delete_expired(Utc::now(), self.batch_size).await {
                Ok(0) => break,
                Ok(removed) => {
                    total += removed;
                    if (removed as usize) < self.batch_size {
                        break;
                    }
                }
                Err(error) => {
                    warn!(%error, "expiry sweep pass failed");
                    break;
                }
            }
        }
        if total > 0 {
            info!(count = total, "removed expired refresh token records");
        }
        total
    }

    /// Spawn the sweep loop on the current runtime.
    pub fn spawn(self) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.sweep_once().await;
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
        });
        SweeperHandle {
            shutdown: shutdown_tx,
            handle,
        }
    }
}

/// Handle for stopping a spawned sweeper.
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal shutdown and wait for the loop to exit.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}
