//! Typed strategy parameters
//!
//! Each strategy owns a fixed set of slots. A slot distinguishes "never
//! entered" from "entered but unparseable" so a bad input can never turn
//! into a silent zero.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::strategy::{FieldKey, FieldSpec, FieldValue, StrategyKind, ValueType};

/// Value state of a single parameter
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Slot<T> {
    #[default]
    Unset,
    /// Raw input that failed to parse
    Invalid(String),
    Set(T),
}

impl<T: Copy> Slot<T> {
    pub fn value(&self) -> Option<T> {
        match self {
            Slot::Set(v) => Some(*v),
            _ => None,
        }
    }

    fn map<U>(&self, f: impl FnOnce(T) -> U) -> Slot<U> {
        match self {
            Slot::Unset => Slot::Unset,
            Slot::Invalid(raw) => Slot::Invalid(raw.clone()),
            Slot::Set(v) => Slot::Set(f(*v)),
        }
    }
}

/// Parse raw UI input according to the field's value type.
/// Blank input clears the slot.
pub fn parse_raw(spec: &FieldSpec, raw: &str) -> Slot<FieldValue> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Slot::Unset;
    }
    let parsed = match spec.value_type {
        ValueType::Integer => trimmed.parse::<i64>().ok().map(FieldValue::Integer),
        ValueType::Decimal => Decimal::from_str(trimmed).ok().map(FieldValue::Decimal),
    };
    match parsed {
        Some(v) => Slot::Set(v),
        None => Slot::Invalid(trimmed.to_string()),
    }
}

fn integer_slot(slot: Slot<FieldValue>) -> Slot<i64> {
    match slot {
        Slot::Set(FieldValue::Integer(v)) => Slot::Set(v),
        Slot::Set(FieldValue::Decimal(d)) => Slot::Invalid(d.to_string()),
        Slot::Invalid(raw) => Slot::Invalid(raw),
        Slot::Unset => Slot::Unset,
    }
}

fn decimal_slot(slot: Slot<FieldValue>) -> Slot<Decimal> {
    match slot {
        Slot::Set(v) => Slot::Set(v.as_decimal()),
        Slot::Invalid(raw) => Slot::Invalid(raw),
        Slot::Unset => Slot::Unset,
    }
}

/// Volume bot parameters. Intervals are entered in minutes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VolumeParams {
    pub daily_volume_usd: Slot<Decimal>,
    pub min_trade_usd: Slot<Decimal>,
    pub max_trade_usd: Slot<Decimal>,
    pub interval_min: Slot<i64>,
    pub interval_max: Slot<i64>,
    pub slippage_bps: Slot<i64>,
}

/// Spread bot parameters. The spread is entered as a percentage.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpreadParams {
    pub spread_percent: Slot<Decimal>,
    pub order_size_usd: Slot<Decimal>,
    pub levels: Slot<i64>,
    pub refresh_seconds: Slot<i64>,
    pub max_inventory_usd: Slot<Decimal>,
    pub slippage_bps: Slot<i64>,
}

/// Parameters for whichever strategy the draft targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyParams {
    Volume(VolumeParams),
    Spread(SpreadParams),
}

impl StrategyParams {
    /// Every field seeded with its schema default
    pub fn defaults(strategy: StrategyKind) -> Self {
        let mut params = match strategy {
            StrategyKind::Volume => StrategyParams::Volume(VolumeParams::default()),
            StrategyKind::Spread => StrategyParams::Spread(SpreadParams::default()),
        };
        for spec in &strategy.definition().fields {
            params.assign(spec.key, Slot::Set(spec.default));
        }
        params
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            StrategyParams::Volume(_) => StrategyKind::Volume,
            StrategyParams::Spread(_) => StrategyKind::Spread,
        }
    }

    /// Parse `raw` by the field type and store it. Returns false when the key
    /// does not belong to this strategy.
    pub fn set_raw(&mut self, spec: &FieldSpec, raw: &str) -> bool {
        self.assign(spec.key, parse_raw(spec, raw))
    }

    /// Clear a slot back to unset
    pub fn clear(&mut self, key: FieldKey) -> bool {
        self.assign(key, Slot::Unset)
    }

    fn assign(&mut self, key: FieldKey, slot: Slot<FieldValue>) -> bool {
        match self {
            StrategyParams::Volume(p) => match key {
                FieldKey::DailyVolumeUsd => p.daily_volume_usd = decimal_slot(slot),
                FieldKey::MinTradeUsd => p.min_trade_usd = decimal_slot(slot),
                FieldKey::MaxTradeUsd => p.max_trade_usd = decimal_slot(slot),
                FieldKey::IntervalMin => p.interval_min = integer_slot(slot),
                FieldKey::IntervalMax => p.interval_max = integer_slot(slot),
                FieldKey::SlippageBps => p.slippage_bps = integer_slot(slot),
                _ => return false,
            },
            StrategyParams::Spread(p) => match key {
                FieldKey::SpreadPercent => p.spread_percent = decimal_slot(slot),
                FieldKey::OrderSizeUsd => p.order_size_usd = decimal_slot(slot),
                FieldKey::Levels => p.levels = integer_slot(slot),
                FieldKey::RefreshSeconds => p.refresh_seconds = integer_slot(slot),
                FieldKey::MaxInventoryUsd => p.max_inventory_usd = decimal_slot(slot),
                FieldKey::SlippageBps => p.slippage_bps = integer_slot(slot),
                _ => return false,
            },
        }
        true
    }

    /// Uniform view of a slot, `None` if the key is foreign to this strategy
    pub fn get(&self, key: FieldKey) -> Option<Slot<FieldValue>> {
        let slot = match self {
            StrategyParams::Volume(p) => match key {
                FieldKey::DailyVolumeUsd => p.daily_volume_usd.map(FieldValue::Decimal),
                FieldKey::MinTradeUsd => p.min_trade_usd.map(FieldValue::Decimal),
                FieldKey::MaxTradeUsd => p.max_trade_usd.map(FieldValue::Decimal),
                FieldKey::IntervalMin => p.interval_min.map(FieldValue::Integer),
                FieldKey::IntervalMax => p.interval_max.map(FieldValue::Integer),
                FieldKey::SlippageBps => p.slippage_bps.map(FieldValue::Integer),
                _ => return None,
            },
            StrategyParams::Spread(p) => match key {
                FieldKey::SpreadPercent => p.spread_percent.map(FieldValue::Decimal),
                FieldKey::OrderSizeUsd => p.order_size_usd.map(FieldValue::Decimal),
                FieldKey::Levels => p.levels.map(FieldValue::Integer),
                FieldKey::RefreshSeconds => p.refresh_seconds.map(FieldValue::Integer),
                FieldKey::MaxInventoryUsd => p.max_inventory_usd.map(FieldValue::Decimal),
                FieldKey::SlippageBps => p.slippage_bps.map(FieldValue::Integer),
                _ => return None,
            },
        };
        Some(slot)
    }

    /// Keys currently holding a value or a failed parse
    pub fn populated_keys(&self) -> Vec<FieldKey> {
        self.kind()
            .definition()
            .fields
            .iter()
            .filter(|f| !matches!(self.get(f.key), Some(Slot::Unset) | None))
            .map(|f| f.key)
            .collect()
    }
}
