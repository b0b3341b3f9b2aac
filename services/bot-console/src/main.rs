//! Bot Console - headless monitor for bots on the trading bridge
//!
//! 1. Loads settings from `BOT_CONSOLE_*` environment variables
//! 2. Builds the session identity
//! 3. Polls the bot list and logs a health summary on every change
//! 4. Stops on Ctrl-C

use std::sync::Arc;

use tracing::{info, warn};

use bot_console::{
    BotLifecycleClient, BotPoller, BridgeClient, ConsoleSettings, PollSnapshot, Session,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("Starting Bot Console...");

    let settings = ConsoleSettings::load()?;
    info!(
        "Bridge: {}, poll interval: {}s",
        settings.bridge_url, settings.poll_interval_secs
    );

    let session = Session::from_settings(&settings);
    if !session.is_authenticated() {
        return Err(anyhow::anyhow!(
            "Set BOT_CONSOLE_BEARER_TOKEN or BOT_CONSOLE_WALLET_ADDRESS"
        ));
    }

    let client = Arc::new(BridgeClient::new(
        &settings.bridge_url,
        session,
        settings.request_timeout(),
    )?);
    let lifecycle = Arc::new(BotLifecycleClient::new(client));

    let poller = BotPoller::spawn(
        lifecycle,
        settings.account_filter.clone(),
        settings.poll_interval(),
    );
    let mut updates = poller.subscribe();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    warn!("Poller exited unexpectedly");
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                log_snapshot(&snapshot);
            }
        }
    }

    poller.shutdown().await;
    Ok(())
}

fn log_snapshot(snapshot: &PollSnapshot) {
    if let Some(err) = &snapshot.last_error {
        warn!("Refresh failed, showing previous list: {}", err);
    }
    let Some(listing) = &snapshot.listing else {
        return;
    };

    let summary = snapshot.summary();
    let counts: Vec<String> = summary
        .counts
        .iter()
        .map(|(class, n)| format!("{}={}", class, n))
        .collect();
    info!(
        "{} bots [{}], {} need attention{}",
        summary.total,
        counts.join(" "),
        summary.needs_attention,
        if listing.is_degraded() { " (filtered locally)" } else { "" }
    );
    for bot in listing.bots.iter().filter(|b| b.classify().needs_attention()) {
        warn!("Bot {} ({}) is {}", bot.name, bot.id, bot.classify());
    }
}
