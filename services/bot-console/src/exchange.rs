//! Exchange registry - static catalog of venues the bridge can trade on

use serde::{Deserialize, Serialize};

use crate::strategy::StrategyKind;

/// Venue class decides which credential and market fields apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VenueClass {
    Cex,
    Dex,
}

impl std::fmt::Display for VenueClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VenueClass::Cex => write!(f, "CEX"),
            VenueClass::Dex => write!(f, "DEX"),
        }
    }
}

/// Chain a venue settles on. CEX venues have none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Solana,
    Evm,
    #[default]
    None,
}

impl Chain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Solana => "solana",
            Chain::Evm => "evm",
            Chain::None => "none",
        }
    }
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static venue description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub venue_class: VenueClass,
    pub chain: Chain,
    pub requires_memo: bool,
    pub requires_passphrase: bool,
    /// Connector name the bridge uses for this venue
    pub connector: &'static str,
    /// Quote token used on DEX venues when the user only gives a base token
    pub default_quote: Option<&'static str>,
}

impl ExchangeDescriptor {
    pub fn is_dex(&self) -> bool {
        self.venue_class == VenueClass::Dex
    }
}

pub const WRAPPED_SOL_MINT: &str = "So11111111111111111111111111111111111111112";
pub const WETH_BASE: &str = "0x4200000000000000000000000000000000000006";
pub const WBNB_BSC: &str = "0xbb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c";

const fn cex(
    id: &'static str,
    name: &'static str,
    requires_memo: bool,
    requires_passphrase: bool,
) -> ExchangeDescriptor {
    ExchangeDescriptor {
        id,
        name,
        venue_class: VenueClass::Cex,
        chain: Chain::None,
        requires_memo,
        requires_passphrase,
        connector: id,
        default_quote: None,
    }
}

const fn dex(
    id: &'static str,
    name: &'static str,
    chain: Chain,
    connector: &'static str,
    default_quote: &'static str,
) -> ExchangeDescriptor {
    ExchangeDescriptor {
        id,
        name,
        venue_class: VenueClass::Dex,
        chain,
        requires_memo: false,
        requires_passphrase: false,
        connector,
        default_quote: Some(default_quote),
    }
}

static EXCHANGES: &[ExchangeDescriptor] = &[
    cex("binance", "Binance", false, false),
    cex("bitmart", "BitMart", true, false),
    cex("kucoin", "KuCoin", false, true),
    cex("okx", "OKX", false, true),
    cex("gate_io", "Gate.io", false, false),
    cex("mexc", "MEXC", false, false),
    dex("jupiter", "Jupiter", Chain::Solana, "jupiter", WRAPPED_SOL_MINT),
    dex("raydium", "Raydium", Chain::Solana, "raydium", WRAPPED_SOL_MINT),
    dex("uniswap", "Uniswap (Base)", Chain::Evm, "uniswap_base", WETH_BASE),
    dex("pancakeswap", "PancakeSwap (BSC)", Chain::Evm, "pancakeswap_bsc", WBNB_BSC),
];

/// Lookup failure for an exchange id
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Exchange not found: {0}")]
pub struct ExchangeNotFound(pub String);

/// Look up a venue by id
pub fn get(id: &str) -> Result<&'static ExchangeDescriptor, ExchangeNotFound> {
    EXCHANGES
        .iter()
        .find(|e| e.id == id)
        .ok_or_else(|| ExchangeNotFound(id.to_string()))
}

/// All venues of a class, in catalog order
pub fn list_by_venue_class(class: VenueClass) -> Vec<&'static ExchangeDescriptor> {
    EXCHANGES.iter().filter(|e| e.venue_class == class).collect()
}

/// Venues on chains the strategy can run on, in catalog order
pub fn list_for_strategy(strategy: StrategyKind) -> Vec<&'static ExchangeDescriptor> {
    let chains = &strategy.definition().applicable_chains;
    EXCHANGES
        .iter()
        .filter(|e| chains.contains(&e.chain))
        .collect()
}

/// Whole catalog, in order
pub fn all() -> &'static [ExchangeDescriptor] {
    EXCHANGES
}
