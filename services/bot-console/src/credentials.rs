//! Credential provisioning
//!
//! Secrets are taken out of their input fields before any network call, so
//! the field is empty whether the call succeeds or fails. Taken values are
//! wiped from memory when dropped. Nothing here retries on failure.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use tokio::sync::RwLock;
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::address::validate_private_key;
use crate::client::BridgeClient;
use crate::error::CredentialError;
use crate::exchange::{Chain, ExchangeDescriptor, VenueClass};
use crate::models::CredentialStatus;
use crate::session::{Confirmation, DestructiveAction};
use crate::wire::{
    CredentialStatusResponse, ExchangeCredentialsRequest, RotateKeyRequest, TradingKeyRequest,
};

/// A secret text field as held by the UI
#[derive(Default)]
pub struct SecretInput(Zeroizing<String>);

impl SecretInput {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn set(&mut self, value: impl Into<String>) {
        self.0 = Zeroizing::new(value.into());
    }

    /// Move the value out, leaving the field empty
    pub fn take(&mut self) -> Zeroizing<String> {
        std::mem::take(&mut self.0)
    }

    pub fn clear(&mut self) {
        drop(self.take());
    }
}

impl std::fmt::Debug for SecretInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "SecretInput(<empty>)")
        } else {
            write!(f, "SecretInput(***)")
        }
    }
}

/// CEX API credentials
#[derive(Debug, Default)]
pub struct ApiCredentialInput {
    pub api_key: SecretInput,
    pub api_secret: SecretInput,
    pub memo: SecretInput,
    pub passphrase: SecretInput,
}

impl ApiCredentialInput {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: SecretInput::new(api_key),
            api_secret: SecretInput::new(api_secret),
            ..Default::default()
        }
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo.set(memo);
        self
    }

    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase.set(passphrase);
        self
    }

    /// Every field the exchange requires is filled in
    pub fn is_complete_for(&self, exchange: &ExchangeDescriptor) -> bool {
        !self.api_key.is_empty()
            && !self.api_secret.is_empty()
            && (!exchange.requires_memo || !self.memo.is_empty())
            && (!exchange.requires_passphrase || !self.passphrase.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.api_key.is_empty()
            && self.api_secret.is_empty()
            && self.memo.is_empty()
            && self.passphrase.is_empty()
    }

    fn take(&mut self) -> TakenApiCredentials {
        TakenApiCredentials {
            api_key: self.api_key.take(),
            api_secret: self.api_secret.take(),
            memo: self.memo.take(),
            passphrase: self.passphrase.take(),
        }
    }

    pub fn clear(&mut self) {
        drop(self.take());
    }
}

struct TakenApiCredentials {
    api_key: Zeroizing<String>,
    api_secret: Zeroizing<String>,
    memo: Zeroizing<String>,
    passphrase: Zeroizing<String>,
}

impl TakenApiCredentials {
    fn check(&self, exchange: &ExchangeDescriptor) -> Result<(), CredentialError> {
        let missing = |v: &Zeroizing<String>| v.trim().is_empty();
        if missing(&self.api_key) || missing(&self.api_secret) {
            return Err(CredentialError::InvalidFormat(
                "API key and secret are required".to_string(),
            ));
        }
        if exchange.requires_memo && missing(&self.memo) {
            return Err(CredentialError::InvalidFormat(format!(
                "{} requires a memo",
                exchange.name
            )));
        }
        if exchange.requires_passphrase && missing(&self.passphrase) {
            return Err(CredentialError::InvalidFormat(format!(
                "{} requires a passphrase",
                exchange.name
            )));
        }
        Ok(())
    }
}

fn optional(value: &Zeroizing<String>) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Credentials entered for the selected venue
#[derive(Debug)]
pub enum CredentialInput {
    Api(ApiCredentialInput),
    PrivateKey(SecretInput),
}

impl CredentialInput {
    pub fn venue_class(&self) -> VenueClass {
        match self {
            CredentialInput::Api(_) => VenueClass::Cex,
            CredentialInput::PrivateKey(_) => VenueClass::Dex,
        }
    }

    /// Required fields for the exchange are non-empty
    pub fn is_complete_for(&self, exchange: &ExchangeDescriptor) -> bool {
        match self {
            CredentialInput::Api(api) => {
                exchange.venue_class == VenueClass::Cex && api.is_complete_for(exchange)
            }
            CredentialInput::PrivateKey(key) => {
                exchange.venue_class == VenueClass::Dex && !key.is_empty()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CredentialInput::Api(api) => api.is_empty(),
            CredentialInput::PrivateKey(key) => key.is_empty(),
        }
    }

    pub fn clear(&mut self) {
        match self {
            CredentialInput::Api(api) => api.clear(),
            CredentialInput::PrivateKey(key) => key.clear(),
        }
    }
}

/// Submits, rotates and revokes trading credentials on the bridge, and keeps
/// a per-session projection of which clients hold a key
pub struct CredentialProvisioner {
    client: Arc<BridgeClient>,
    projection: RwLock<HashMap<String, CredentialStatus>>,
}

impl CredentialProvisioner {
    pub fn new(client: Arc<BridgeClient>) -> Self {
        Self {
            client,
            projection: RwLock::new(HashMap::new()),
        }
    }

    /// Last known status for a client in this session, without I/O
    pub async fn status(&self, client_id: &str) -> Option<CredentialStatus> {
        self.projection.read().await.get(client_id).copied()
    }

    /// Ask the bridge whether the client holds a live credential
    pub async fn has_credential(&self, client_id: &str) -> Result<bool, CredentialError> {
        let path = format!("/clients/{}/trading-key", client_id);
        let resp: CredentialStatusResponse = self
            .client
            .call_json::<(), _>(Method::GET, &path, &[], None)
            .await?;

        let status = CredentialStatus {
            has_key: resp.has_key,
            last_rotated_at: resp.last_rotated_at,
        };
        self.projection
            .write()
            .await
            .insert(client_id.to_string(), status);
        Ok(status.has_key)
    }

    /// Provision credentials for the client on the given venue.
    ///
    /// CEX venues take API credentials; DEX venues take a private key tagged
    /// with the venue's chain. `input` is emptied in every outcome.
    pub async fn submit(
        &self,
        client_id: &str,
        exchange: &ExchangeDescriptor,
        input: &mut CredentialInput,
    ) -> Result<(), CredentialError> {
        match input {
            CredentialInput::Api(api) => {
                let taken = api.take();
                if exchange.venue_class != VenueClass::Cex {
                    return Err(CredentialError::InvalidFormat(format!(
                        "{} takes a wallet private key, not API credentials",
                        exchange.name
                    )));
                }
                taken.check(exchange)?;

                let body = ExchangeCredentialsRequest {
                    exchange: exchange.id,
                    account: client_id,
                    api_key: taken.api_key.trim(),
                    api_secret: taken.api_secret.trim(),
                    memo: optional(&taken.memo),
                    passphrase: optional(&taken.passphrase),
                };
                self.client
                    .call(Method::POST, "/exchanges/credentials", &[], Some(&body))
                    .await?;
            }
            CredentialInput::PrivateKey(key) => {
                let taken = key.take();
                if exchange.venue_class != VenueClass::Dex {
                    return Err(CredentialError::InvalidFormat(format!(
                        "{} takes API credentials, not a private key",
                        exchange.name
                    )));
                }
                validate_private_key(exchange.chain, &taken)
                    .map_err(CredentialError::InvalidFormat)?;

                let path = format!("/clients/{}/trading-key", client_id);
                let body = TradingKeyRequest {
                    private_key: taken.trim(),
                    chain: exchange.chain.as_str(),
                };
                self.client.call(Method::POST, &path, &[], Some(&body)).await?;
            }
        }

        info!("Credentials stored for client {} on {}", client_id, exchange.id);
        self.mark_provisioned(client_id).await;
        Ok(())
    }

    /// Replace the client's trading key. On failure the previous key stays
    /// active and the projection is left untouched.
    pub async fn rotate(
        &self,
        client_id: &str,
        chain: Chain,
        new_key: &mut SecretInput,
    ) -> Result<(), CredentialError> {
        let taken = new_key.take();
        validate_private_key(chain, &taken).map_err(CredentialError::InvalidFormat)?;

        let path = format!("/clients/{}/rotate-key", client_id);
        let body = RotateKeyRequest {
            private_key: taken.trim(),
        };
        if let Err(e) = self.client.call(Method::PUT, &path, &[], Some(&body)).await {
            let err = CredentialError::from(e);
            warn!("Key rotation failed for client {}: {}", client_id, err);
            return Err(err);
        }

        info!("Trading key rotated for client {}", client_id);
        self.mark_provisioned(client_id).await;
        Ok(())
    }

    /// Revoke the client's trading key. Irreversible, and stops dependent
    /// bots on the bridge side.
    pub async fn revoke(
        &self,
        client_id: &str,
        confirmation: &Confirmation,
    ) -> Result<(), CredentialError> {
        if !confirmation.covers(DestructiveAction::RevokeKey, client_id) {
            return Err(CredentialError::Unconfirmed(client_id.to_string()));
        }

        let path = format!("/clients/{}/revoke-key", client_id);
        self.client.call::<()>(Method::DELETE, &path, &[], None).await?;

        warn!("Trading key revoked for client {}", client_id);
        self.projection.write().await.insert(
            client_id.to_string(),
            CredentialStatus {
                has_key: false,
                last_rotated_at: None,
            },
        );
        Ok(())
    }

    /// Attach CEX credentials to an existing bot. The bridge takes these as
    /// query parameters, so the URL is never logged.
    pub async fn attach_exchange_credentials(
        &self,
        bot_id: &str,
        input: &mut ApiCredentialInput,
    ) -> Result<(), CredentialError> {
        let taken = input.take();
        if taken.api_key.trim().is_empty() || taken.api_secret.trim().is_empty() {
            return Err(CredentialError::InvalidFormat(
                "API key and secret are required".to_string(),
            ));
        }

        let mut query = vec![
            ("api_key", taken.api_key.trim()),
            ("api_secret", taken.api_secret.trim()),
        ];
        if let Some(passphrase) = optional(&taken.passphrase) {
            query.push(("passphrase", passphrase));
        }

        let path = format!("/bots/{}/add-exchange-credentials", bot_id);
        self.client.call::<()>(Method::POST, &path, &query, None).await?;

        info!("Exchange credentials attached to bot {}", bot_id);
        Ok(())
    }

    async fn mark_provisioned(&self, client_id: &str) {
        self.projection.write().await.insert(
            client_id.to_string(),
            CredentialStatus {
                has_key: true,
                last_rotated_at: Some(Utc::now()),
            },
        );
    }
}
