//! Error types for the bot console core
//!
//! Validation problems are local and never reach the network. Everything
//! else carries a human-readable `detail` taken from the bridge response when
//! one is available.

use std::fmt;

use serde::Serialize;

/// Missing or rejected session identity
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("No bearer token or wallet address in session")]
    MissingCredentials,

    #[error("Bridge rejected the session: {0}")]
    Rejected(String),
}

/// A single violated rule on a draft field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Every field the rule involves (cross-field rules name all of them)
    pub fields: Vec<String>,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            fields: vec![field.into()],
            message: message.into(),
        }
    }

    pub fn cross(fields: &[&str], message: impl Into<String>) -> Self {
        Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            message: message.into(),
        }
    }

    /// Whether this error references the given field key
    pub fn names(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.fields.join(", "), self.message)
    }
}

/// Outcome of validating a draft: every violated rule, not just the first
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ValidationResult {
    pub ok: bool,
    pub errors: Vec<FieldError>,
}

impl ValidationResult {
    pub fn from_errors(errors: Vec<FieldError>) -> Self {
        Self {
            ok: errors.is_empty(),
            errors,
        }
    }

    /// Errors that reference the given field key
    pub fn errors_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldError> + 'a {
        self.errors.iter().filter(move |e| e.names(field))
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ok {
            return write!(f, "valid");
        }
        let parts: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationResult {}

/// Draft mutation rejected before it could apply
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("Unknown exchange: {0}")]
    UnknownExchange(String),

    #[error("Exchange {exchange} does not support {strategy} bots")]
    UnsupportedExchange { exchange: String, strategy: String },

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Field {field} does not apply to {venue} venues")]
    FieldNotApplicable { field: String, venue: String },

    #[error("No strategy selected")]
    NoStrategy,

    #[error("No exchange selected")]
    NoExchange,

    #[error("{0} credentials do not match the selected venue")]
    CredentialMismatch(String),
}

/// Credential provisioning failures. None of these are retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("Invalid credential format: {0}")]
    InvalidFormat(String),

    #[error("Bridge rejected credentials: {0}")]
    RemoteRejected(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Credential request timed out")]
    Timeout,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Destructive action not confirmed for {0}")]
    Unconfirmed(String),
}

/// Bot lifecycle failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BotError {
    #[error("A bot with this name already exists")]
    DuplicateName,

    #[error("Invalid address format: {0}")]
    InvalidAddressFormat(String),

    #[error("Bridge rejected request: {0}")]
    RemoteRejected(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Bot not found")]
    NotFound,

    #[error("Bot request timed out")]
    Timeout,

    /// 2xx with a body that could not be read. The request may have been
    /// applied; re-poll before retrying.
    #[error("Unreadable bridge response, the request may have succeeded (re-poll before retrying): {0}")]
    UnexpectedResponse(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Destructive action not confirmed for {0}")]
    Unconfirmed(String),
}

impl BotError {
    /// True when the bridge may have acted on the request despite the error
    pub fn may_have_applied(&self) -> bool {
        matches!(self, BotError::UnexpectedResponse(_) | BotError::Timeout)
    }
}

/// Wizard navigation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error("Step {0} is incomplete")]
    Incomplete(&'static str),

    #[error("Already at the final step")]
    AtEnd,

    #[error("Cannot go back from {from} to {to}")]
    InvalidBack { from: &'static str, to: &'static str },

    #[error("Confirm is only available on the review step")]
    NotAtReview,
}

/// Failure of the two-phase confirm (credentials, then bot)
#[derive(Debug, Clone, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Wizard(#[from] WizardError),

    #[error("Draft is invalid: {0}")]
    Validation(ValidationResult),

    #[error("Credential submission failed: {0}")]
    Credential(#[from] CredentialError),

    /// Credentials were accepted but the bot was not created. The credential
    /// stays on the bridge without a bot.
    #[error("Bot creation failed after credentials were stored: {error}")]
    BotCreation {
        error: BotError,
        orphaned_credential: bool,
    },
}
