//! Read-through projections of bridge-owned state
//!
//! Nothing here is authoritative. Every value is replaced by the next
//! successful fetch.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Remote-reported run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BotStatus {
    Running,
    Stopped,
    Error,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Remote-reported health, independent of [`BotStatus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Stale,
    Stopped,
    Error,
    #[serde(other)]
    Unknown,
}

/// Client-side health classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthClass {
    Healthy,
    Stale,
    Stopped,
    Error,
    Unknown,
}

impl HealthClass {
    pub fn needs_attention(&self) -> bool {
        matches!(self, HealthClass::Stopped | HealthClass::Stale | HealthClass::Error)
    }
}

impl std::fmt::Display for HealthClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthClass::Healthy => write!(f, "healthy"),
            HealthClass::Stale => write!(f, "stale"),
            HealthClass::Stopped => write!(f, "stopped"),
            HealthClass::Error => write!(f, "error"),
            HealthClass::Unknown => write!(f, "unknown"),
        }
    }
}

/// Bot as reported by the bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawBot")]
pub struct Bot {
    pub id: String,
    pub name: String,
    pub account_identifier: Option<String>,
    pub strategy_type: Option<String>,
    pub exchange_id: Option<String>,
    pub chain: Option<String>,
    pub status: BotStatus,
    pub health_status: Option<HealthStatus>,
    /// Last accepted config as echoed by the bridge
    pub config: Option<serde_json::Value>,
    /// Strategy-specific telemetry
    pub stats: Option<serde_json::Value>,
}

impl Bot {
    /// Bot known only by id, e.g. from a bare acknowledgement. Everything
    /// else arrives with the next poll.
    pub fn acknowledged(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            account_identifier: None,
            strategy_type: None,
            exchange_id: None,
            chain: None,
            status: BotStatus::Unknown,
            health_status: None,
            config: None,
            stats: None,
        }
    }

    /// Prefer the health report, fall back to run status, else unknown.
    /// An unrecognized health value counts as absent.
    pub fn classify(&self) -> HealthClass {
        match self.health_status {
            Some(HealthStatus::Healthy) => return HealthClass::Healthy,
            Some(HealthStatus::Stale) => return HealthClass::Stale,
            Some(HealthStatus::Stopped) => return HealthClass::Stopped,
            Some(HealthStatus::Error) => return HealthClass::Error,
            Some(HealthStatus::Unknown) | None => {}
        }
        match self.status {
            BotStatus::Running => HealthClass::Healthy,
            BotStatus::Stopped => HealthClass::Stopped,
            BotStatus::Error => HealthClass::Error,
            BotStatus::Unknown => HealthClass::Unknown,
        }
    }

    pub fn belongs_to(&self, account: &str) -> bool {
        self.account_identifier.as_deref() == Some(account)
    }

    /// Fold a newer report for the same bot into this one. Values the newer
    /// report leaves out are kept.
    pub fn merge(&mut self, newer: Bot) {
        if !newer.name.is_empty() {
            self.name = newer.name;
        }
        if newer.status != BotStatus::Unknown {
            self.status = newer.status;
        }
        merge_field(&mut self.account_identifier, newer.account_identifier);
        merge_field(&mut self.strategy_type, newer.strategy_type);
        merge_field(&mut self.exchange_id, newer.exchange_id);
        merge_field(&mut self.chain, newer.chain);
        merge_field(&mut self.health_status, newer.health_status);
        merge_field(&mut self.config, newer.config);
        merge_field(&mut self.stats, newer.stats);
    }
}

fn merge_field<T>(current: &mut Option<T>, newer: Option<T>) {
    if newer.is_some() {
        *current = newer;
    }
}

/// Bot row as the bridge sends it. Several fields come under more than one
/// spelling, sometimes twice in the same row; the first non-blank wins.
/// Nulls read as absent.
#[derive(Deserialize)]
struct RawBot {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    account_identifier: Option<String>,
    #[serde(default, rename = "accountIdentifier")]
    account_identifier_camel: Option<String>,
    #[serde(default)]
    account: Option<String>,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    strategy_type: Option<String>,
    #[serde(default, rename = "strategyType")]
    strategy_type_camel: Option<String>,
    #[serde(default)]
    bot_type: Option<String>,
    #[serde(default)]
    exchange_id: Option<String>,
    #[serde(default, rename = "exchangeId")]
    exchange_id_camel: Option<String>,
    #[serde(default)]
    exchange: Option<String>,
    #[serde(default)]
    chain: Option<String>,
    #[serde(default)]
    status: Option<BotStatus>,
    #[serde(default)]
    health_status: Option<HealthStatus>,
    #[serde(default, rename = "healthStatus")]
    health_status_camel: Option<HealthStatus>,
    #[serde(default)]
    config: Option<serde_json::Value>,
    #[serde(default)]
    stats: Option<serde_json::Value>,
}

fn first_of<const N: usize>(spellings: [Option<String>; N]) -> Option<String> {
    spellings
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
}

impl From<RawBot> for Bot {
    fn from(raw: RawBot) -> Self {
        Self {
            id: raw.id,
            name: raw.name.unwrap_or_default(),
            account_identifier: first_of([
                raw.account_identifier,
                raw.account_identifier_camel,
                raw.account,
                raw.client_id,
            ]),
            strategy_type: first_of([raw.strategy_type, raw.strategy_type_camel, raw.bot_type]),
            exchange_id: first_of([raw.exchange_id, raw.exchange_id_camel, raw.exchange]),
            chain: raw.chain,
            status: raw.status.unwrap_or_default(),
            health_status: raw.health_status.or(raw.health_status_camel),
            config: raw.config,
            stats: raw.stats,
        }
    }
}

pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("invalid bot id: {}", other))),
    }
}

/// Number of bots classified stopped, stale or error
pub fn attention_count(bots: &[Bot]) -> usize {
    bots.iter().filter(|b| b.classify().needs_attention()).count()
}

/// Per-class counts for a bot list
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct HealthSummary {
    pub total: usize,
    pub counts: BTreeMap<HealthClass, usize>,
    pub needs_attention: usize,
}

impl HealthSummary {
    pub fn from_bots(bots: &[Bot]) -> Self {
        let mut counts = BTreeMap::new();
        for bot in bots {
            *counts.entry(bot.classify()).or_insert(0) += 1;
        }
        Self {
            total: bots.len(),
            counts,
            needs_attention: attention_count(bots),
        }
    }

    pub fn count(&self, class: HealthClass) -> usize {
        self.counts.get(&class).copied().unwrap_or(0)
    }
}

/// How an account filter was applied to a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// No filter requested
    Unfiltered,
    /// Bridge honored `?account=`
    Server,
    /// Degraded: bridge ignored the filter and the list was filtered locally
    ClientFallback,
}

/// Result of a list call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BotListing {
    pub bots: Vec<Bot>,
    pub filter_mode: FilterMode,
}

impl BotListing {
    pub fn is_degraded(&self) -> bool {
        self.filter_mode == FilterMode::ClientFallback
    }
}

/// Client credential projection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct CredentialStatus {
    pub has_key: bool,
    pub last_rotated_at: Option<DateTime<Utc>>,
}
