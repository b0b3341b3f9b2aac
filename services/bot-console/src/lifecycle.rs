//! Bot lifecycle client and local roster

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Method;
use tracing::{debug, info, warn};

use crate::client::BridgeClient;
use crate::error::BotError;
use crate::models::{Bot, BotListing, FilterMode, HealthSummary};
use crate::session::{Confirmation, DestructiveAction};
use crate::wire::{BotBody, BotCreateRequest, BotUpdateRequest, ListBotsBody};

/// Issues lifecycle requests against the bridge. The bridge executes them
/// asynchronously; outcomes are observed through [`BotLifecycleClient::list`].
pub struct BotLifecycleClient {
    client: Arc<BridgeClient>,
}

impl BotLifecycleClient {
    pub fn new(client: Arc<BridgeClient>) -> Self {
        Self { client }
    }

    /// Create a bot for a client that already holds credentials
    pub async fn create(&self, client_id: &str, payload: &BotCreateRequest) -> Result<Bot, BotError> {
        let path = format!("/clients/{}/setup-bot", client_id);
        let body: BotBody = self
            .client
            .call_json(Method::POST, &path, &[], Some(payload))
            .await?;
        let reported = body.into_bot();

        // Fill what the bridge left out from the request; the next poll
        // replaces it with the bridge's view.
        let mut bot = Bot::acknowledged(reported.id.clone(), payload.name.clone());
        bot.account_identifier = Some(client_id.to_string());
        bot.strategy_type = Some(payload.bot_type.as_str().to_string());
        bot.exchange_id = payload.exchange.clone().or_else(|| Some(payload.connector.clone()));
        bot.chain = payload.chain.clone();
        bot.merge(reported);

        info!("Bot created: {} ({}) for client {}", bot.name, bot.id, client_id);
        Ok(bot)
    }

    /// Request a start. The bot shows as running only after a later poll.
    pub async fn start(&self, bot_id: &str) -> Result<(), BotError> {
        self.post_action(bot_id, "start").await?;
        info!("Start requested for bot {}", bot_id);
        Ok(())
    }

    pub async fn stop(&self, bot_id: &str) -> Result<(), BotError> {
        self.post_action(bot_id, "stop").await?;
        info!("Stop requested for bot {}", bot_id);
        Ok(())
    }

    pub async fn update(&self, bot_id: &str, payload: &BotUpdateRequest) -> Result<Bot, BotError> {
        let path = format!("/bots/{}", bot_id);
        let body: BotBody = self
            .client
            .call_json(Method::PUT, &path, &[], Some(payload))
            .await?;
        let reported = body.into_bot();

        let mut bot = Bot::acknowledged(reported.id.clone(), payload.name.clone());
        bot.config = serde_json::to_value(&payload.config).ok();
        bot.merge(reported);

        info!("Bot {} updated", bot_id);
        Ok(bot)
    }

    /// Delete a bot. Irreversible; needs a confirmation naming the bot.
    pub async fn delete(&self, bot_id: &str, confirmation: &Confirmation) -> Result<(), BotError> {
        if !confirmation.covers(DestructiveAction::DeleteBot, bot_id) {
            return Err(BotError::Unconfirmed(bot_id.to_string()));
        }
        let path = format!("/bots/{}", bot_id);
        self.client
            .call::<()>(Method::DELETE, &path, &[], None)
            .await?;
        info!("Bot {} deleted", bot_id);
        Ok(())
    }

    /// Ask the bridge to re-evaluate health now
    pub async fn force_health_check(&self, bot_id: &str) -> Result<(), BotError> {
        self.post_action(bot_id, "force-health-check").await
    }

    /// List bots, optionally for one account.
    ///
    /// The filter goes out as `?account=`. If the bridge ignores it and
    /// returns other accounts' bots, the list is filtered here and marked
    /// degraded.
    pub async fn list(&self, account_filter: Option<&str>) -> Result<BotListing, BotError> {
        let account = account_filter.map(str::trim).filter(|a| !a.is_empty());
        let query: Vec<(&str, &str)> = account.map(|a| vec![("account", a)]).unwrap_or_default();

        let body: ListBotsBody = self
            .client
            .call_json::<(), _>(Method::GET, "/bots", &query, None)
            .await?;
        let bots = body.into_bots();
        debug!("Fetched {} bots", bots.len());

        let Some(account) = account else {
            return Ok(BotListing {
                bots,
                filter_mode: FilterMode::Unfiltered,
            });
        };

        if bots.iter().all(|b| b.belongs_to(account)) {
            return Ok(BotListing {
                bots,
                filter_mode: FilterMode::Server,
            });
        }

        let total = bots.len();
        let bots: Vec<Bot> = bots.into_iter().filter(|b| b.belongs_to(account)).collect();
        warn!(
            "Bridge ignored account filter for {}: kept {} of {} bots after local filtering",
            account,
            bots.len(),
            total
        );
        Ok(BotListing {
            bots,
            filter_mode: FilterMode::ClientFallback,
        })
    }

    async fn post_action(&self, bot_id: &str, action: &str) -> Result<(), BotError> {
        let path = format!("/bots/{}/{}", bot_id, action);
        self.client
            .call::<()>(Method::POST, &path, &[], None)
            .await?;
        Ok(())
    }
}

/// Local view of the bot list. Advisory only: every successful poll replaces
/// it, and failures never touch the bots shown.
#[derive(Debug, Clone)]
pub struct BotRoster {
    bots: Vec<Bot>,
    filter_mode: FilterMode,
    last_error: Option<String>,
    refreshed_at: Option<DateTime<Utc>>,
}

impl Default for BotRoster {
    fn default() -> Self {
        Self {
            bots: Vec::new(),
            filter_mode: FilterMode::Unfiltered,
            last_error: None,
            refreshed_at: None,
        }
    }
}

impl BotRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bots(&self) -> &[Bot] {
        &self.bots
    }

    pub fn get(&self, bot_id: &str) -> Option<&Bot> {
        self.bots.iter().find(|b| b.id == bot_id)
    }

    pub fn filter_mode(&self) -> FilterMode {
        self.filter_mode
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    /// Replace the roster with a fresh listing
    pub fn reconcile(&mut self, listing: BotListing) {
        self.bots = listing.bots;
        self.filter_mode = listing.filter_mode;
        self.last_error = None;
        self.refreshed_at = Some(Utc::now());
    }

    /// Merge the outcome of an update. Only a success changes the roster,
    /// and values the update did not report are kept.
    pub fn apply_update(&mut self, result: &Result<Bot, BotError>) {
        match result {
            Ok(bot) => match self.bots.iter_mut().find(|b| b.id == bot.id) {
                Some(existing) => existing.merge(bot.clone()),
                None => self.bots.push(bot.clone()),
            },
            Err(e) => self.record_failure(e),
        }
    }

    /// Remember a failure for display
    pub fn record_failure(&mut self, error: &impl std::fmt::Display) {
        self.last_error = Some(error.to_string());
    }

    pub fn summary(&self) -> HealthSummary {
        HealthSummary::from_bots(&self.bots)
    }
}
