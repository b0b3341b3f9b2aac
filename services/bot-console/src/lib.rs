//! Bot Console Library
//!
//! Configuration and lifecycle orchestration for trading bots running on the
//! trading bridge: strategy schemas, draft validation, credential
//! provisioning, lifecycle calls and list polling.

pub mod address;
pub mod client;
pub mod credentials;
pub mod draft;
pub mod error;
pub mod exchange;
pub mod lifecycle;
pub mod models;
pub mod params;
pub mod poller;
pub mod session;
pub mod settings;
pub mod strategy;
pub mod wire;
pub mod wizard;


// Re-export main types for convenience
pub use client::BridgeClient;
pub use credentials::{ApiCredentialInput, CredentialInput, CredentialProvisioner, SecretInput};
pub use draft::BotConfigDraft;
pub use error::{
    AuthError, BotError, CredentialError, DraftError, FieldError, SubmitError, ValidationResult,
    WizardError,
};
pub use exchange::{Chain, ExchangeDescriptor, VenueClass};
pub use lifecycle::{BotLifecycleClient, BotRoster};
pub use models::{Bot, BotListing, BotStatus, FilterMode, HealthClass, HealthSummary};
pub use params::{Slot, StrategyParams};
pub use poller::{BotPoller, PollSnapshot};
pub use session::{Confirmation, DestructiveAction, Session};
pub use settings::ConsoleSettings;
pub use strategy::{FieldKey, StrategyKind};
pub use wire::BotCreateRequest;
pub use wizard::{BotWizard, WizardStep};
