//! Address, key and symbol format checks per chain

use crate::exchange::Chain;

/// Hex body of an EVM value, `0x` or `0X` prefixed
fn strip_hex_prefix(value: &str) -> Option<&str> {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
}

/// Solana public keys are 32 bytes, Base58-encoded to 32-44 characters
pub fn validate_token_address(chain: Chain, address: &str) -> Result<(), String> {
    let address = address.trim();
    if address.is_empty() {
        return Err("Token address is required".to_string());
    }
    match chain {
        Chain::Solana => {
            let decoded = bs58::decode(address)
                .into_vec()
                .map_err(|_| "Invalid Solana mint address: not valid Base58".to_string())?;
            if decoded.len() != 32 {
                return Err(format!(
                    "Invalid Solana mint address: expected 32 bytes, got {}",
                    decoded.len()
                ));
            }
            Ok(())
        }
        Chain::Evm => {
            let hex_part = strip_hex_prefix(address)
                .ok_or_else(|| "Invalid EVM token address: missing 0x prefix".to_string())?;
            let decoded = hex::decode(hex_part)
                .map_err(|_| "Invalid EVM token address: not valid hex".to_string())?;
            if decoded.len() != 20 {
                return Err(format!(
                    "Invalid EVM token address: expected 20 bytes, got {}",
                    decoded.len()
                ));
            }
            Ok(())
        }
        Chain::None => Err("Token addresses only apply to DEX venues".to_string()),
    }
}

/// Solana keys are a Base58 64-byte keypair. A 32-byte value is rejected
/// since it cannot be told apart from a public key or mint. EVM keys are 32
/// bytes of hex with an optional `0x`/`0X` prefix.
pub fn validate_private_key(chain: Chain, key: &str) -> Result<(), String> {
    let key = key.trim();
    if key.is_empty() {
        return Err("Private key is required".to_string());
    }
    match chain {
        Chain::Solana => {
            let decoded = bs58::decode(key)
                .into_vec()
                .map_err(|_| "Solana private key is not valid Base58".to_string())?;
            match decoded.len() {
                64 => Ok(()),
                n => Err(format!(
                    "Solana private key must be a 64-byte keypair, got {} bytes",
                    n
                )),
            }
        }
        Chain::Evm => {
            let hex_part = strip_hex_prefix(key).unwrap_or(key);
            let decoded = hex::decode(hex_part)
                .map_err(|_| "EVM private key is not valid hex".to_string())?;
            if decoded.len() != 32 {
                return Err(format!("EVM private key must be 32 bytes, got {}", decoded.len()));
            }
            Ok(())
        }
        Chain::None => Err("Private keys only apply to DEX venues".to_string()),
    }
}

/// CEX ticker symbol: 1-15 ASCII alphanumerics
pub fn validate_symbol(symbol: &str) -> Result<(), String> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err("Symbol is required".to_string());
    }
    if symbol.len() > 15 || !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(format!("Invalid symbol: {}", symbol));
    }
    Ok(())
}
