//! Session identity passed explicitly to every bridge call

use reqwest::RequestBuilder;
use zeroize::Zeroizing;

use crate::error::AuthError;
use crate::settings::ConsoleSettings;

/// Header carrying the wallet identity
pub const WALLET_HEADER: &str = "X-Wallet-Address";

/// Who is talking to the bridge
#[derive(Clone, Default)]
pub struct Session {
    bearer_token: Option<Zeroizing<String>>,
    wallet_address: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.bearer_token = (!token.trim().is_empty()).then(|| Zeroizing::new(token));
        self
    }

    pub fn with_wallet_address(mut self, wallet: impl Into<String>) -> Self {
        let wallet = wallet.into();
        self.wallet_address = (!wallet.trim().is_empty()).then_some(wallet);
        self
    }

    pub fn from_settings(settings: &ConsoleSettings) -> Self {
        let mut session = Self::new();
        if let Some(token) = &settings.bearer_token {
            session = session.with_bearer_token(token.clone());
        }
        if let Some(wallet) = &settings.wallet_address {
            session = session.with_wallet_address(wallet.clone());
        }
        session
    }

    pub fn wallet_address(&self) -> Option<&str> {
        self.wallet_address.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.bearer_token.is_some() || self.wallet_address.is_some()
    }

    /// Attach identity headers, or fail before any I/O happens
    pub fn authorize(&self, req: RequestBuilder) -> Result<RequestBuilder, AuthError> {
        if !self.is_authenticated() {
            return Err(AuthError::MissingCredentials);
        }
        let mut req = req;
        if let Some(token) = &self.bearer_token {
            req = req.bearer_auth(token.as_str());
        }
        if let Some(wallet) = &self.wallet_address {
            req = req.header(WALLET_HEADER, wallet);
        }
        Ok(req)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "***"))
            .field("wallet_address", &self.wallet_address)
            .finish()
    }
}

/// Explicit user acknowledgement of a destructive action on one target.
/// Built only after the user confirmed; operations check it names their target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    action: DestructiveAction,
    target: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestructiveAction {
    RevokeKey,
    DeleteBot,
}

impl Confirmation {
    pub fn acknowledge(action: DestructiveAction, target: impl Into<String>) -> Self {
        Self {
            action,
            target: target.into(),
        }
    }

    pub fn covers(&self, action: DestructiveAction, target: &str) -> bool {
        self.action == action && self.target == target
    }
}
