//! Background bot list refresh

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::lifecycle::BotLifecycleClient;
use crate::models::{BotListing, HealthSummary};

/// Latest state published by the poller
#[derive(Debug, Clone, Default)]
pub struct PollSnapshot {
    /// Last successful listing. Kept across failed ticks.
    pub listing: Option<BotListing>,
    pub last_error: Option<String>,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub ticks: u64,
}

impl PollSnapshot {
    pub fn summary(&self) -> HealthSummary {
        self.listing
            .as_ref()
            .map(|l| HealthSummary::from_bots(&l.bots))
            .unwrap_or_default()
    }
}

/// Handle to a running poll task. Dropping it stops the task.
pub struct BotPoller {
    rx: watch::Receiver<PollSnapshot>,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl BotPoller {
    /// Start polling every `every`; the first fetch happens immediately
    pub fn spawn(
        lifecycle: Arc<BotLifecycleClient>,
        account_filter: Option<String>,
        every: Duration,
    ) -> Self {
        let (tx, rx) = watch::channel(PollSnapshot::default());
        let token = CancellationToken::new();
        let task = tokio::spawn(run(lifecycle, account_filter, every, tx, token.clone()));
        info!("Bot poller started ({}s interval)", every.as_secs());

        Self {
            rx,
            token,
            task: Some(task),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PollSnapshot> {
        self.rx.clone()
    }

    pub fn latest(&self) -> PollSnapshot {
        self.rx.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the task and wait for it to exit
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Poller task ended abnormally: {}", e);
            }
        }
        info!("Bot poller stopped");
    }
}

impl Drop for BotPoller {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run(
    lifecycle: Arc<BotLifecycleClient>,
    account_filter: Option<String>,
    every: Duration,
    tx: watch::Sender<PollSnapshot>,
    token: CancellationToken,
) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                debug!("Poller cancelled");
                break;
            }
            _ = ticker.tick() => {
                let result = lifecycle.list(account_filter.as_deref()).await;
                tx.send_modify(|snap| {
                    snap.ticks += 1;
                    match result {
                        Ok(listing) => {
                            snap.listing = Some(listing);
                            snap.last_error = None;
                            snap.refreshed_at = Some(Utc::now());
                        }
                        Err(e) => {
                            warn!("Bot list refresh failed: {}", e);
                            snap.last_error = Some(e.to_string());
                        }
                    }
                });
            }
        }
    }
}
