//! Request/response bodies exchanged with the trading bridge

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::Bot;
use crate::strategy::StrategyKind;

/// Body of `POST /clients/{id}/setup-bot`. Never carries secrets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BotCreateRequest {
    pub name: String,
    pub bot_type: StrategyKind,
    /// CEX exchange id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    pub connector: String,
    /// DEX chain
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
    #[serde(flatten)]
    pub market: WireMarket,
    pub config: WireConfig,
}

/// Venue-specific market fields, flattened into the create body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum WireMarket {
    Cex {
        /// `BASE/QUOTE`
        pair: String,
    },
    Solana {
        base_mint: String,
        quote_mint: String,
    },
    Evm {
        base_token: String,
        quote_token: String,
    },
}

/// Strategy config in wire units
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WireConfig {
    Volume(VolumeWireConfig),
    Spread(SpreadWireConfig),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeWireConfig {
    #[serde(with = "rust_decimal::serde::float")]
    pub daily_volume_usd: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub min_trade_usd: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub max_trade_usd: Decimal,
    pub interval_min_seconds: u64,
    pub interval_max_seconds: u64,
    /// DEX only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slippage_bps: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpreadWireConfig {
    pub spread_bps: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub order_size_usd: Decimal,
    pub levels: u8,
    pub refresh_interval_seconds: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub max_inventory_usd: Decimal,
    /// DEX only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slippage_bps: Option<u32>,
}

/// Body of `PUT /bots/{id}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BotUpdateRequest {
    pub name: String,
    pub config: WireConfig,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ExchangeCredentialsRequest<'a> {
    pub exchange: &'a str,
    pub account: &'a str,
    pub api_key: &'a str,
    pub api_secret: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct TradingKeyRequest<'a> {
    pub private_key: &'a str,
    pub chain: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RotateKeyRequest<'a> {
    pub private_key: &'a str,
}

/// `GET /clients/{id}/trading-key`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CredentialStatusResponse {
    #[serde(default, alias = "hasKey")]
    pub has_key: bool,
    #[serde(default, alias = "lastRotatedAt")]
    pub last_rotated_at: Option<DateTime<Utc>>,
}

/// `GET /bots` answers either a bare list or `{bots: [...]}`. Rows are kept
/// raw so one unreadable row does not sink the whole list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListBotsBody {
    Bare(Vec<serde_json::Value>),
    Wrapped { bots: Vec<serde_json::Value> },
}

impl ListBotsBody {
    pub fn into_bots(self) -> Vec<Bot> {
        let rows = match self {
            ListBotsBody::Bare(rows) => rows,
            ListBotsBody::Wrapped { bots } => bots,
        };
        rows.into_iter()
            .enumerate()
            .filter_map(|(i, row)| match serde_json::from_value::<Bot>(row) {
                Ok(bot) => Some(bot),
                Err(e) => {
                    warn!("Skipping unreadable bot row {}: {}", i, e);
                    None
                }
            })
            .collect()
    }
}

/// Single-bot responses: wrapped in `{bot: ...}`, bare, or a bare
/// acknowledgement such as `{"success": true, "bot_id": "b-9"}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum BotBody {
    Wrapped {
        bot: Bot,
    },
    Bare(Bot),
    Ack {
        #[serde(alias = "botId", deserialize_with = "crate::models::string_or_number")]
        bot_id: String,
    },
}

impl BotBody {
    /// The reported bot. An acknowledgement yields a bot known only by id.
    pub fn into_bot(self) -> Bot {
        match self {
            BotBody::Wrapped { bot } => bot,
            BotBody::Bare(bot) => bot,
            BotBody::Ack { bot_id } => Bot::acknowledged(bot_id, ""),
        }
    }
}
