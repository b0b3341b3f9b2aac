//! Configuration builder
//!
//! A [`BotConfigDraft`] collects one wizard session's selections, is mutated
//! only through its setters, and turns into a [`BotCreateRequest`] once it
//! validates.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

use crate::address::{validate_symbol, validate_token_address};
use crate::credentials::{ApiCredentialInput, CredentialInput, SecretInput};
use crate::error::{DraftError, FieldError, ValidationResult};
use crate::exchange::{self, Chain, ExchangeDescriptor, VenueClass};
use crate::params::{Slot, StrategyParams, VolumeParams};
use crate::strategy::{self, FieldKey, StrategyKind};
use crate::wire::{
    BotCreateRequest, BotUpdateRequest, SpreadWireConfig, VolumeWireConfig, WireConfig, WireMarket,
};

/// Longest accepted bot name
pub const MAX_NAME_LEN: usize = 100;

/// CEX trading pair as entered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairInput {
    pub base: String,
    pub quote: String,
}

/// DEX market as entered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInput {
    pub address: String,
    /// Falls back to the exchange's default quote token
    pub quote_address: Option<String>,
}

/// One wizard session's bot configuration
#[derive(Debug, Default)]
pub struct BotConfigDraft {
    strategy: Option<StrategyKind>,
    exchange: Option<&'static ExchangeDescriptor>,
    name: Option<String>,
    credentials: Option<CredentialInput>,
    pair: Option<PairInput>,
    token: Option<TokenInput>,
    parameters: Option<StrategyParams>,
}

impl BotConfigDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strategy(&self) -> Option<StrategyKind> {
        self.strategy
    }

    pub fn exchange(&self) -> Option<&'static ExchangeDescriptor> {
        self.exchange
    }

    pub fn venue_class(&self) -> Option<VenueClass> {
        self.exchange.map(|e| e.venue_class)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn pair(&self) -> Option<&PairInput> {
        self.pair.as_ref()
    }

    pub fn token(&self) -> Option<&TokenInput> {
        self.token.as_ref()
    }

    pub fn parameters(&self) -> Option<&StrategyParams> {
        self.parameters.as_ref()
    }

    pub fn credentials(&self) -> Option<&CredentialInput> {
        self.credentials.as_ref()
    }

    pub fn credentials_mut(&mut self) -> Option<&mut CredentialInput> {
        self.credentials.as_mut()
    }

    /// Pair or token address entered, matching the selected venue class
    pub fn has_market(&self) -> bool {
        match self.venue_class() {
            Some(VenueClass::Cex) => self.pair.is_some(),
            Some(VenueClass::Dex) => self.token.is_some(),
            None => false,
        }
    }

    /// Switch strategy. Parameters are re-seeded from the new defaults; the
    /// pair/token fields already entered are kept.
    pub fn set_strategy(&mut self, strategy: StrategyKind) -> Result<(), DraftError> {
        if let Some(exchange) = self.exchange {
            if !strategy.definition().applicable_chains.contains(&exchange.chain) {
                return Err(DraftError::UnsupportedExchange {
                    exchange: exchange.id.to_string(),
                    strategy: strategy.to_string(),
                });
            }
        }
        debug!("Draft strategy -> {}", strategy);
        self.strategy = Some(strategy);
        self.parameters = Some(strategy::defaults(strategy));
        Ok(())
    }

    /// Select a venue. Moving between CEX and DEX drops the market fields and
    /// any credentials entered. The strategy is never changed.
    pub fn set_exchange(&mut self, exchange_id: &str) -> Result<(), DraftError> {
        let exchange = exchange::get(exchange_id)
            .map_err(|_| DraftError::UnknownExchange(exchange_id.to_string()))?;

        if let Some(strategy) = self.strategy {
            if !strategy.definition().applicable_chains.contains(&exchange.chain) {
                return Err(DraftError::UnsupportedExchange {
                    exchange: exchange.id.to_string(),
                    strategy: strategy.to_string(),
                });
            }
        }

        let previous = self.venue_class();
        if previous.is_some() && previous != Some(exchange.venue_class) {
            debug!("Venue class changed, clearing market and credentials");
            self.pair = None;
            self.token = None;
            self.clear_credentials();
        }
        // Market fields entered before any venue was chosen
        match exchange.venue_class {
            VenueClass::Cex => self.token = None,
            VenueClass::Dex => self.pair = None,
        }
        let mismatched = self
            .credentials
            .as_ref()
            .is_some_and(|c| c.venue_class() != exchange.venue_class);
        if mismatched {
            self.clear_credentials();
        }

        self.exchange = Some(exchange);
        Ok(())
    }

    /// Parse and store a parameter. A value that fails to parse is kept as
    /// invalid and blocks validation; it never becomes zero.
    pub fn set_field(&mut self, key: &str, raw: &str) -> Result<(), DraftError> {
        let strategy = self.strategy.ok_or(DraftError::NoStrategy)?;
        let field_key = FieldKey::parse(key).ok_or_else(|| DraftError::UnknownField(key.to_string()))?;
        let spec = strategy::field(strategy, field_key)
            .ok_or_else(|| DraftError::UnknownField(key.to_string()))?;
        if let Some(venue) = self.venue_class() {
            if !spec.applies_to.includes(venue) {
                return Err(DraftError::FieldNotApplicable {
                    field: field_key.to_string(),
                    venue: venue.to_string(),
                });
            }
        }

        let params = self
            .parameters
            .get_or_insert_with(|| strategy::defaults(strategy));
        if !params.set_raw(spec, raw) {
            return Err(DraftError::UnknownField(key.to_string()));
        }
        Ok(())
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.name = (!name.trim().is_empty()).then(|| name.trim().to_string());
    }

    /// CEX pair, stored upper-cased
    pub fn set_pair(&mut self, base: &str, quote: &str) -> Result<(), DraftError> {
        if self.venue_class() == Some(VenueClass::Dex) {
            return Err(DraftError::FieldNotApplicable {
                field: "pair".to_string(),
                venue: VenueClass::Dex.to_string(),
            });
        }
        self.pair = Some(PairInput {
            base: base.trim().to_uppercase(),
            quote: quote.trim().to_uppercase(),
        });
        Ok(())
    }

    /// DEX base token (mint or contract address)
    pub fn set_token_address(&mut self, address: &str) -> Result<(), DraftError> {
        if self.venue_class() == Some(VenueClass::Cex) {
            return Err(DraftError::FieldNotApplicable {
                field: "token_address".to_string(),
                venue: VenueClass::Cex.to_string(),
            });
        }
        let quote_address = self.token.take().and_then(|t| t.quote_address);
        self.token = Some(TokenInput {
            address: address.trim().to_string(),
            quote_address,
        });
        Ok(())
    }

    /// DEX quote token override. Requires a base token first.
    pub fn set_quote_address(&mut self, address: Option<&str>) -> Result<(), DraftError> {
        if self.token.is_none() || self.venue_class() != Some(VenueClass::Dex) {
            return Err(DraftError::FieldNotApplicable {
                field: "quote_address".to_string(),
                venue: self
                    .venue_class()
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "unselected".to_string()),
            });
        }
        let Some(token) = self.token.as_mut() else {
            return Ok(());
        };
        token.quote_address = address
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(String::from);
        Ok(())
    }

    pub fn set_api_credentials(&mut self, creds: ApiCredentialInput) -> Result<(), DraftError> {
        self.ensure_venue(VenueClass::Cex, "API")?;
        self.clear_credentials();
        self.credentials = Some(CredentialInput::Api(creds));
        Ok(())
    }

    pub fn set_private_key(&mut self, key: impl Into<String>) -> Result<(), DraftError> {
        self.ensure_venue(VenueClass::Dex, "Private key")?;
        self.clear_credentials();
        self.credentials = Some(CredentialInput::PrivateKey(SecretInput::new(key)));
        Ok(())
    }

    fn ensure_venue(&self, venue: VenueClass, what: &str) -> Result<(), DraftError> {
        match self.venue_class() {
            None => Err(DraftError::NoExchange),
            Some(v) if v != venue => Err(DraftError::CredentialMismatch(what.to_string())),
            Some(_) => Ok(()),
        }
    }

    pub fn clear_credentials(&mut self) {
        if let Some(mut creds) = self.credentials.take() {
            creds.clear();
        }
    }

    /// Credentials entered satisfy the selected exchange's requirements
    pub fn credentials_complete(&self) -> bool {
        match (self.exchange, &self.credentials) {
            (Some(exchange), Some(creds)) => creds.is_complete_for(exchange),
            _ => false,
        }
    }

    /// Check every rule and report all violations
    pub fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();

        if self.strategy.is_none() {
            errors.push(FieldError::new("strategy_type", "Select a bot type"));
        }
        let exchange = match self.exchange {
            Some(e) => Some(e),
            None => {
                errors.push(FieldError::new("exchange", "Select an exchange"));
                None
            }
        };

        if let Some(name) = &self.name {
            if name.chars().count() > MAX_NAME_LEN {
                errors.push(FieldError::new(
                    "name",
                    format!("Name must be at most {} characters", MAX_NAME_LEN),
                ));
            }
        }

        if let Some(exchange) = exchange {
            self.validate_market(exchange, &mut errors);
        }

        if let (Some(strategy), Some(params)) = (self.strategy, &self.parameters) {
            let venue = exchange.map(|e| e.venue_class);
            self.validate_fields(strategy, params, venue, &mut errors);
            if let StrategyParams::Volume(p) = params {
                validate_volume(p, &mut errors);
            }
        }

        ValidationResult::from_errors(errors)
    }

    fn validate_market(&self, exchange: &ExchangeDescriptor, errors: &mut Vec<FieldError>) {
        match exchange.venue_class {
            VenueClass::Cex => match &self.pair {
                None => errors.push(FieldError::new("pair", "Trading pair is required")),
                Some(pair) => {
                    if let Err(e) = validate_symbol(&pair.base) {
                        errors.push(FieldError::new("pair", format!("Base: {}", e)));
                    }
                    if let Err(e) = validate_symbol(&pair.quote) {
                        errors.push(FieldError::new("pair", format!("Quote: {}", e)));
                    }
                    if !pair.base.is_empty() && pair.base == pair.quote {
                        errors.push(FieldError::new("pair", "Base and quote must differ"));
                    }
                }
            },
            VenueClass::Dex => match &self.token {
                None => errors.push(FieldError::new("token_address", "Token address is required")),
                Some(token) => {
                    if let Err(e) = validate_token_address(exchange.chain, &token.address) {
                        errors.push(FieldError::new("token_address", e));
                    }
                    let quote = token.quote_address.as_deref().or(exchange.default_quote);
                    match quote {
                        None => errors.push(FieldError::new("quote_address", "Quote token is required")),
                        Some(quote) => {
                            if let Err(e) = validate_token_address(exchange.chain, quote) {
                                errors.push(FieldError::new("quote_address", e));
                            } else if quote.eq_ignore_ascii_case(token.address.trim()) {
                                errors.push(FieldError::cross(
                                    &["token_address", "quote_address"],
                                    "Base and quote tokens must differ",
                                ));
                            }
                        }
                    }
                }
            },
        }
    }

    fn validate_fields(
        &self,
        strategy: StrategyKind,
        params: &StrategyParams,
        venue: Option<VenueClass>,
        errors: &mut Vec<FieldError>,
    ) {
        for spec in &strategy.definition().fields {
            if let Some(venue) = venue {
                if !spec.applies_to.includes(venue) {
                    continue;
                }
            }
            let required = venue.map(|v| spec.is_required(v)).unwrap_or(true);
            match params.get(spec.key) {
                Some(Slot::Unset) | None => {
                    if required {
                        errors.push(FieldError::new(spec.key.as_str(), format!("{} is required", spec.label)));
                    }
                }
                Some(Slot::Invalid(raw)) => errors.push(FieldError::new(
                    spec.key.as_str(),
                    format!("'{}' is not a valid {}", raw, spec.value_type.as_str()),
                )),
                Some(Slot::Set(value)) => {
                    for problem in spec.check(value) {
                        errors.push(FieldError::new(spec.key.as_str(), problem));
                    }
                }
            }
        }
    }

    /// Build the bridge create body. Fails with the validation result when
    /// the draft is not valid.
    pub fn to_wire_payload(&self) -> Result<BotCreateRequest, ValidationResult> {
        let validation = self.validate();
        if !validation.ok {
            return Err(validation);
        }
        let incomplete = || {
            ValidationResult::from_errors(vec![FieldError::new("draft", "Draft is incomplete")])
        };
        let strategy = self.strategy.ok_or_else(incomplete)?;
        let exchange = self.exchange.ok_or_else(incomplete)?;
        let params = self.parameters.as_ref().ok_or_else(incomplete)?;

        let market = self.wire_market(exchange).ok_or_else(incomplete)?;
        let config = wire_config(params, exchange.venue_class).ok_or_else(incomplete)?;
        let name = self
            .name
            .clone()
            .unwrap_or_else(|| self.default_name(strategy, exchange));

        let (exchange_field, chain) = match exchange.venue_class {
            VenueClass::Cex => (Some(exchange.id.to_string()), None),
            VenueClass::Dex => (None, Some(exchange.chain.as_str().to_string())),
        };

        Ok(BotCreateRequest {
            name,
            bot_type: strategy,
            exchange: exchange_field,
            connector: exchange.connector.to_string(),
            chain,
            market,
            config,
        })
    }

    /// Body for updating an existing bot from this draft
    pub fn to_update_payload(&self) -> Result<BotUpdateRequest, ValidationResult> {
        let create = self.to_wire_payload()?;
        Ok(BotUpdateRequest {
            name: create.name,
            config: create.config,
        })
    }

    fn wire_market(&self, exchange: &ExchangeDescriptor) -> Option<WireMarket> {
        match exchange.venue_class {
            VenueClass::Cex => {
                let pair = self.pair.as_ref()?;
                Some(WireMarket::Cex {
                    pair: format!("{}/{}", pair.base, pair.quote),
                })
            }
            VenueClass::Dex => {
                let token = self.token.as_ref()?;
                let base = token.address.trim().to_string();
                let quote = token
                    .quote_address
                    .clone()
                    .or_else(|| exchange.default_quote.map(String::from))?;
                match exchange.chain {
                    Chain::Solana => Some(WireMarket::Solana {
                        base_mint: base,
                        quote_mint: quote,
                    }),
                    Chain::Evm => Some(WireMarket::Evm {
                        base_token: base,
                        quote_token: quote,
                    }),
                    Chain::None => None,
                }
            }
        }
    }

    fn default_name(&self, strategy: StrategyKind, exchange: &ExchangeDescriptor) -> String {
        let market = match (&self.pair, &self.token) {
            (Some(pair), _) => format!("{}{}", pair.base, pair.quote),
            (None, Some(token)) => token.address.chars().take(6).collect(),
            (None, None) => String::new(),
        };
        format!("{}-{}-{}", strategy, exchange.id, market)
    }
}

fn validate_volume(p: &VolumeParams, errors: &mut Vec<FieldError>) {
    if let (Some(min), Some(max)) = (p.min_trade_usd.value(), p.max_trade_usd.value()) {
        if min >= max {
            errors.push(FieldError::cross(
                &["min_trade_usd", "max_trade_usd"],
                "Min trade must be less than max trade",
            ));
        }
    }
    if let (Some(min), Some(max)) = (p.interval_min.value(), p.interval_max.value()) {
        if min >= max {
            errors.push(FieldError::cross(
                &["interval_min", "interval_max"],
                "Min interval must be less than max interval",
            ));
        }
    }
    if let (Some(max), Some(daily)) = (p.max_trade_usd.value(), p.daily_volume_usd.value()) {
        if max > daily {
            errors.push(FieldError::cross(
                &["max_trade_usd", "daily_volume_usd"],
                "Max trade cannot exceed daily volume",
            ));
        }
    }
}

fn wire_config(params: &StrategyParams, venue: VenueClass) -> Option<WireConfig> {
    let dex_slippage = |slot: &Slot<i64>| match venue {
        VenueClass::Dex => slot.value().and_then(|v| u32::try_from(v).ok()),
        VenueClass::Cex => None,
    };
    match params {
        StrategyParams::Volume(p) => Some(WireConfig::Volume(VolumeWireConfig {
            daily_volume_usd: p.daily_volume_usd.value()?,
            min_trade_usd: p.min_trade_usd.value()?,
            max_trade_usd: p.max_trade_usd.value()?,
            interval_min_seconds: minutes_to_seconds(p.interval_min.value()?)?,
            interval_max_seconds: minutes_to_seconds(p.interval_max.value()?)?,
            slippage_bps: dex_slippage(&p.slippage_bps),
        })),
        StrategyParams::Spread(p) => Some(WireConfig::Spread(SpreadWireConfig {
            spread_bps: percent_to_bps(p.spread_percent.value()?)?,
            order_size_usd: p.order_size_usd.value()?,
            levels: u8::try_from(p.levels.value()?).ok()?,
            refresh_interval_seconds: u64::try_from(p.refresh_seconds.value()?).ok()?,
            max_inventory_usd: p.max_inventory_usd.value()?,
            slippage_bps: dex_slippage(&p.slippage_bps),
        })),
    }
}

pub fn minutes_to_seconds(minutes: i64) -> Option<u64> {
    u64::try_from(minutes).ok()?.checked_mul(60)
}

/// `bps = percent * 100`; only whole basis points convert
pub fn percent_to_bps(percent: Decimal) -> Option<u32> {
    let bps = percent * Decimal::from(100);
    if !bps.fract().is_zero() {
        return None;
    }
    bps.to_u32()
}

#[cfg(test)]
mod tests {
    use super::*;

    const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    fn jupiter_volume() -> BotConfigDraft {
        let mut draft = BotConfigDraft::new();
        draft.set_strategy(StrategyKind::Volume).unwrap();
        draft.set_exchange("jupiter").unwrap();
        draft.set_token_address(USDC_MINT).unwrap();
        draft
    }

    #[test]
    fn test_conversions() {
        assert_eq!(minutes_to_seconds(15), Some(900));
        assert_eq!(minutes_to_seconds(-1), None);
        assert_eq!(percent_to_bps(Decimal::new(5, 1)), Some(50));
        assert_eq!(percent_to_bps(Decimal::new(125, 3)), None);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut draft = jupiter_volume();
        assert_eq!(
            draft.set_field("leverage", "10"),
            Err(DraftError::UnknownField("leverage".to_string()))
        );
        // Spread-only key on a volume draft
        assert_eq!(
            draft.set_field("levels", "3"),
            Err(DraftError::UnknownField("levels".to_string()))
        );
    }

    #[test]
    fn test_set_field_without_strategy() {
        let mut draft = BotConfigDraft::new();
        assert_eq!(draft.set_field("min_trade_usd", "10"), Err(DraftError::NoStrategy));
    }

    #[test]
    fn test_unparseable_value_blocks_validation() {
        let mut draft = jupiter_volume();
        draft.set_field("maxTradeUsd", "lots").unwrap();
        let result = draft.validate();
        assert!(!result.ok);
        assert_eq!(result.errors_for("max_trade_usd").count(), 1);
        assert!(draft.to_wire_payload().is_err());
    }

    #[test]
    fn test_cleared_required_field_blocks_validation() {
        let mut draft = jupiter_volume();
        draft.set_field("daily_volume_usd", "").unwrap();
        let result = draft.validate();
        assert!(result.errors_for("daily_volume_usd").any(|e| e.message.contains("required")));
    }

    #[test]
    fn test_slippage_optional_on_cex_and_dropped_from_wire() {
        let mut draft = BotConfigDraft::new();
        draft.set_strategy(StrategyKind::Spread).unwrap();
        draft.set_exchange("okx").unwrap();
        draft.set_pair("sol", "usdt").unwrap();
        draft.set_field("slippage_bps", "").unwrap();
        assert!(draft.validate().ok);

        let payload = draft.to_wire_payload().unwrap();
        assert_eq!(payload.market, WireMarket::Cex { pair: "SOL/USDT".to_string() });
        assert_eq!(payload.exchange.as_deref(), Some("okx"));
        match payload.config {
            WireConfig::Spread(cfg) => {
                assert_eq!(cfg.spread_bps, 50);
                assert_eq!(cfg.levels, 3);
                assert_eq!(cfg.slippage_bps, None);
            }
            other => panic!("expected spread config, got {:?}", other),
        }
    }

    #[test]
    fn test_slippage_required_on_dex() {
        let mut draft = jupiter_volume();
        draft.set_field("slippage_bps", "").unwrap();
        let result = draft.validate();
        assert!(!result.ok);
        assert_eq!(result.errors_for("slippage_bps").count(), 1);
    }

    #[test]
    fn test_spread_levels_out_of_range() {
        let mut draft = BotConfigDraft::new();
        draft.set_strategy(StrategyKind::Spread).unwrap();
        draft.set_exchange("binance").unwrap();
        draft.set_pair("BTC", "USDT").unwrap();
        draft.set_field("levels", "6").unwrap();
        draft.set_field("order_size_usd", "0").unwrap();

        let result = draft.validate();
        assert_eq!(result.errors_for("levels").count(), 1);
        assert!(result.errors_for("order_size_usd").count() >= 1);
    }

    #[test]
    fn test_evm_market_uses_token_fields() {
        let mut draft = BotConfigDraft::new();
        draft.set_strategy(StrategyKind::Volume).unwrap();
        draft.set_exchange("uniswap").unwrap();
        draft
            .set_token_address("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913")
            .unwrap();

        let payload = draft.to_wire_payload().unwrap();
        assert_eq!(payload.chain.as_deref(), Some("evm"));
        assert_eq!(payload.exchange, None);
        assert_eq!(payload.connector, "uniswap_base");
        assert!(matches!(payload.market, WireMarket::Evm { .. }));
    }

    #[test]
    fn test_spread_rejects_evm_exchange() {
        let mut draft = BotConfigDraft::new();
        draft.set_strategy(StrategyKind::Spread).unwrap();
        assert!(matches!(
            draft.set_exchange("uniswap"),
            Err(DraftError::UnsupportedExchange { .. })
        ));
        assert!(draft.exchange().is_none());
    }

    #[test]
    fn test_default_name() {
        let draft = jupiter_volume();
        assert_eq!(draft.to_wire_payload().unwrap().name, "volume-jupiter-EPjFWd");

        let mut named = jupiter_volume();
        named.set_name("  my bot  ");
        assert_eq!(named.to_wire_payload().unwrap().name, "my bot");

        named.set_name("x".repeat(MAX_NAME_LEN + 1));
        assert_eq!(named.validate().errors_for("name").count(), 1);
    }

    #[test]
    fn test_same_base_and_quote_rejected() {
        let mut draft = jupiter_volume();
        draft.set_quote_address(Some(USDC_MINT)).unwrap();
        let result = draft.validate();
        assert!(result.errors_for("quote_address").count() == 1);
    }

    #[test]
    fn test_credentials_must_match_venue() {
        let mut draft = jupiter_volume();
        assert_eq!(
            draft.set_api_credentials(ApiCredentialInput::new("k", "s")),
            Err(DraftError::CredentialMismatch("API".to_string()))
        );
        draft.set_private_key("abc").unwrap();
        assert!(draft.credentials_complete());
    }
}
