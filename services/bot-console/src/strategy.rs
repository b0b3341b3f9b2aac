//! Strategy schema registry
//!
//! Declarative field definitions per bot type. The registry drives both the
//! wizard (which fields to ask for) and draft validation (bounds, required
//! rules). Parameter values themselves live in [`crate::params`].

use std::str::FromStr;
use std::sync::OnceLock;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::exchange::{Chain, VenueClass};
use crate::params::StrategyParams;

/// Bot strategy type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Volume,
    Spread,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 2] = [StrategyKind::Volume, StrategyKind::Spread];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Volume => "volume",
            StrategyKind::Spread => "spread",
        }
    }

    /// Static schema for this strategy
    pub fn definition(&self) -> &'static StrategyType {
        match self {
            StrategyKind::Volume => VOLUME.get_or_init(volume_definition),
            StrategyKind::Spread => SPREAD.get_or_init(spread_definition),
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "volume" => Ok(StrategyKind::Volume),
            "spread" => Ok(StrategyKind::Spread),
            other => Err(format!("Unknown strategy type: {}", other)),
        }
    }
}

/// Every parameter key known to any strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    DailyVolumeUsd,
    MinTradeUsd,
    MaxTradeUsd,
    IntervalMin,
    IntervalMax,
    SlippageBps,
    SpreadPercent,
    OrderSizeUsd,
    Levels,
    RefreshSeconds,
    MaxInventoryUsd,
}

impl FieldKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::DailyVolumeUsd => "daily_volume_usd",
            FieldKey::MinTradeUsd => "min_trade_usd",
            FieldKey::MaxTradeUsd => "max_trade_usd",
            FieldKey::IntervalMin => "interval_min",
            FieldKey::IntervalMax => "interval_max",
            FieldKey::SlippageBps => "slippage_bps",
            FieldKey::SpreadPercent => "spread_percent",
            FieldKey::OrderSizeUsd => "order_size_usd",
            FieldKey::Levels => "levels",
            FieldKey::RefreshSeconds => "refresh_seconds",
            FieldKey::MaxInventoryUsd => "max_inventory_usd",
        }
    }

    /// Parse a key as sent by the UI. Accepts the snake_case wire spelling
    /// and the camelCase spelling older forms used.
    pub fn parse(key: &str) -> Option<Self> {
        let key = match key {
            "dailyVolumeUsd" => "daily_volume_usd",
            "minTradeUsd" => "min_trade_usd",
            "maxTradeUsd" => "max_trade_usd",
            "intervalMin" => "interval_min",
            "intervalMax" => "interval_max",
            "slippageBps" => "slippage_bps",
            "spreadPercent" => "spread_percent",
            "orderSizeUsd" => "order_size_usd",
            "refreshSeconds" => "refresh_seconds",
            "maxInventoryUsd" => "max_inventory_usd",
            other => other,
        };
        ALL_KEYS.iter().copied().find(|k| k.as_str() == key)
    }
}

const ALL_KEYS: [FieldKey; 11] = [
    FieldKey::DailyVolumeUsd,
    FieldKey::MinTradeUsd,
    FieldKey::MaxTradeUsd,
    FieldKey::IntervalMin,
    FieldKey::IntervalMax,
    FieldKey::SlippageBps,
    FieldKey::SpreadPercent,
    FieldKey::OrderSizeUsd,
    FieldKey::Levels,
    FieldKey::RefreshSeconds,
    FieldKey::MaxInventoryUsd,
];

impl std::fmt::Display for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Integer,
    Decimal,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Integer => "integer",
            ValueType::Decimal => "decimal",
        }
    }
}

/// Which venue classes a rule covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Applicability {
    Any,
    DexOnly,
}

impl Applicability {
    pub fn includes(&self, venue: VenueClass) -> bool {
        match self {
            Applicability::Any => true,
            Applicability::DexOnly => venue == VenueClass::Dex,
        }
    }
}

/// A typed parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Decimal(Decimal),
}

impl FieldValue {
    pub fn as_decimal(&self) -> Decimal {
        match self {
            FieldValue::Integer(v) => Decimal::from(*v),
            FieldValue::Decimal(v) => *v,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Integer(v) => write!(f, "{}", v),
            FieldValue::Decimal(v) => write!(f, "{}", v),
        }
    }
}

/// Declarative description of one strategy parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub key: FieldKey,
    pub label: &'static str,
    pub value_type: ValueType,
    pub default: FieldValue,
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
    pub step: Option<Decimal>,
    /// Must be strictly greater than zero (money and time fields)
    pub positive: bool,
    /// Venue classes the field is shown for
    pub applies_to: Applicability,
    /// Venue classes that must supply a value
    pub required_on: Applicability,
}

impl FieldSpec {
    fn integer(key: FieldKey, label: &'static str, default: i64) -> Self {
        Self {
            key,
            label,
            value_type: ValueType::Integer,
            default: FieldValue::Integer(default),
            min: None,
            max: None,
            step: None,
            positive: false,
            applies_to: Applicability::Any,
            required_on: Applicability::Any,
        }
    }

    fn decimal(key: FieldKey, label: &'static str, default: Decimal) -> Self {
        Self {
            value_type: ValueType::Decimal,
            default: FieldValue::Decimal(default),
            ..Self::integer(key, label, 0)
        }
    }

    fn positive(mut self) -> Self {
        self.positive = true;
        self
    }

    fn bounds(mut self, min: Option<i64>, max: Option<i64>) -> Self {
        self.min = min.map(Decimal::from);
        self.max = max.map(Decimal::from);
        self
    }

    fn step(mut self, step: Decimal) -> Self {
        self.step = Some(step);
        self
    }

    fn required_on(mut self, venues: Applicability) -> Self {
        self.required_on = venues;
        self
    }

    pub fn is_required(&self, venue: VenueClass) -> bool {
        self.required_on.includes(venue)
    }

    /// Bound/step/sign violations for a parsed value, as messages
    pub fn check(&self, value: FieldValue) -> Vec<String> {
        let v = value.as_decimal();
        let mut problems = Vec::new();
        if self.positive && v <= Decimal::ZERO {
            problems.push(format!("{} must be greater than 0", self.label));
        }
        if let Some(min) = self.min {
            if v < min {
                problems.push(format!("{} must be at least {}", self.label, min));
            }
        }
        if let Some(max) = self.max {
            if v > max {
                problems.push(format!("{} must be at most {}", self.label, max));
            }
        }
        if let Some(step) = self.step {
            if !step.is_zero() && !(v % step).is_zero() {
                problems.push(format!("{} must be a multiple of {}", self.label, step));
            }
        }
        problems
    }
}

/// Static strategy definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyType {
    pub id: StrategyKind,
    pub label: &'static str,
    pub description: &'static str,
    pub applicable_chains: Vec<Chain>,
    pub fields: Vec<FieldSpec>,
}

impl StrategyType {
    pub fn field(&self, key: FieldKey) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }
}

static VOLUME: OnceLock<StrategyType> = OnceLock::new();
static SPREAD: OnceLock<StrategyType> = OnceLock::new();

fn slippage_field() -> FieldSpec {
    FieldSpec::integer(FieldKey::SlippageBps, "Slippage tolerance (bps)", 50)
        .bounds(Some(1), Some(5000))
        .required_on(Applicability::DexOnly)
}

fn volume_definition() -> StrategyType {
    StrategyType {
        id: StrategyKind::Volume,
        label: "Volume Bot",
        description: "Generates steady trading volume with randomized trade sizes and timing",
        applicable_chains: vec![Chain::None, Chain::Solana, Chain::Evm],
        fields: vec![
            FieldSpec::decimal(FieldKey::DailyVolumeUsd, "Daily volume (USD)", Decimal::from(5000)).positive(),
            FieldSpec::decimal(FieldKey::MinTradeUsd, "Min trade (USD)", Decimal::from(10)).positive(),
            FieldSpec::decimal(FieldKey::MaxTradeUsd, "Max trade (USD)", Decimal::from(25)).positive(),
            FieldSpec::integer(FieldKey::IntervalMin, "Min interval (minutes)", 15)
                .positive()
                .bounds(Some(1), Some(1440)),
            FieldSpec::integer(FieldKey::IntervalMax, "Max interval (minutes)", 45)
                .positive()
                .bounds(Some(1), Some(1440)),
            slippage_field(),
        ],
    }
}

fn spread_definition() -> StrategyType {
    StrategyType {
        id: StrategyKind::Spread,
        label: "Spread Bot",
        description: "Quotes both sides of the book around mid price at a fixed spread",
        applicable_chains: vec![Chain::None, Chain::Solana],
        fields: vec![
            FieldSpec::decimal(FieldKey::SpreadPercent, "Spread (%)", Decimal::new(5, 1))
                .positive()
                .bounds(None, Some(50))
                .step(Decimal::new(1, 2)),
            FieldSpec::decimal(FieldKey::OrderSizeUsd, "Order size (USD)", Decimal::from(50)).positive(),
            FieldSpec::integer(FieldKey::Levels, "Levels per side", 3).bounds(Some(1), Some(5)),
            FieldSpec::integer(FieldKey::RefreshSeconds, "Refresh interval (seconds)", 30).positive(),
            FieldSpec::decimal(FieldKey::MaxInventoryUsd, "Max inventory (USD)", Decimal::from(1000)).positive(),
            slippage_field(),
        ],
    }
}

/// Ordered fields shown for a strategy on a venue class
pub fn fields_for(strategy: StrategyKind, venue: VenueClass) -> Vec<&'static FieldSpec> {
    strategy
        .definition()
        .fields
        .iter()
        .filter(|f| f.applies_to.includes(venue))
        .collect()
}

/// Fresh parameter set seeded from the schema defaults
pub fn defaults(strategy: StrategyKind) -> StrategyParams {
    StrategyParams::defaults(strategy)
}

/// Field definition for a key within a strategy
pub fn field(strategy: StrategyKind, key: FieldKey) -> Option<&'static FieldSpec> {
    strategy.definition().field(key)
}
