//! Fixed-interval refresh of presale status and minted count.
//!
//! Two tasks, one per concern. The status task stops for good once presale
//! is seen to have ended; the minted-count task keeps going because minting
//! continues in the public sale. Both belong to a `PollerHandle` and die
//! with it.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::controller::Dapp;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

pub struct PollerHandle {
    status: JoinHandle<()>,
    minted: JoinHandle<()>,
}

impl PollerHandle {
    pub fn status_finished(&self) -> bool {
        self.status.is_finished()
    }

    pub fn minted_finished(&self) -> bool {
        self.minted.is_finished()
    }

    /// Cancels both tasks and waits for them to unwind.
    pub async fn shutdown(mut self) {
        self.status.abort();
        self.minted.abort();
        let _ = (&mut self.status).await;
        let _ = (&mut self.minted).await;
        info!("pollers stopped");
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.status.abort();
        self.minted.abort();
    }
}

/// Connects the wallet if needed, then starts both pollers. The first tick
/// of each fires immediately.
pub async fn mount(dapp: Arc<Dapp>, every: Duration) -> PollerHandle {
    let connected = dapp.state().read().await.session.wallet_connected;
    if !connected {
        dapp.connect_wallet().await;
    }
    spawn_pollers(dapp, every)
}

pub fn spawn_pollers(dapp: Arc<Dapp>, every: Duration) -> PollerHandle {
    PollerHandle {
        status: tokio::spawn(poll_presale_status(Arc::clone(&dapp), every)),
        minted: tokio::spawn(poll_minted_count(dapp, every)),
    }
}

async fn poll_presale_status(dapp: Arc<Dapp>, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if dapp.check_presale_started().await != Some(true) {
            continue;
        }
        if dapp.check_presale_ended().await == Some(true) {
            info!("presale has ended; status polling stopped");
            return;
        }
        debug!("presale still running");
    }
}

async fn poll_minted_count(dapp: Arc<Dapp>, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        dapp.refresh_minted_count().await;
    }
}
