//! Setup wizard state machine
//!
//! One wizard serves every strategy. Which fields the Configure step asks
//! for comes from the strategy schema; the wizard only gates navigation and
//! runs the two-phase submission.

use tracing::{info, warn};

use crate::credentials::CredentialProvisioner;
use crate::draft::BotConfigDraft;
use crate::error::{SubmitError, WizardError};
use crate::lifecycle::BotLifecycleClient;
use crate::models::Bot;
use crate::strategy::{self, FieldSpec};

/// Wizard steps in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum WizardStep {
    #[default]
    SelectType,
    SelectExchange,
    EnterCredentials,
    Configure,
    Review,
}

impl WizardStep {
    pub const ALL: [WizardStep; 5] = [
        WizardStep::SelectType,
        WizardStep::SelectExchange,
        WizardStep::EnterCredentials,
        WizardStep::Configure,
        WizardStep::Review,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            WizardStep::SelectType => "SelectType",
            WizardStep::SelectExchange => "SelectExchange",
            WizardStep::EnterCredentials => "EnterCredentials",
            WizardStep::Configure => "Configure",
            WizardStep::Review => "Review",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }

    pub fn next(&self) -> Option<WizardStep> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn previous(&self) -> Option<WizardStep> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A bot setup session
#[derive(Debug, Default)]
pub struct BotWizard {
    step: WizardStep,
    draft: BotConfigDraft,
    /// Exchange whose credentials were stored during a confirm whose bot
    /// creation then failed. A retry skips straight to bot creation.
    provisioned_for: Option<&'static str>,
}

impl BotWizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn draft(&self) -> &BotConfigDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut BotConfigDraft {
        &mut self.draft
    }

    /// Credentials already stored on the bridge for the selected exchange
    pub fn credentials_provisioned(&self) -> bool {
        match (self.provisioned_for, self.draft.exchange()) {
            (Some(id), Some(exchange)) => id == exchange.id,
            _ => false,
        }
    }

    /// Fields the Configure step shows for the current selection
    pub fn configure_fields(&self) -> Vec<&'static FieldSpec> {
        match (self.draft.strategy(), self.draft.venue_class()) {
            (Some(strategy), Some(venue)) => strategy::fields_for(strategy, venue),
            _ => Vec::new(),
        }
    }

    /// Whether the current step is complete enough to move forward
    pub fn can_proceed(&self) -> bool {
        self.step_complete(self.step)
    }

    fn step_complete(&self, step: WizardStep) -> bool {
        match step {
            WizardStep::SelectType => self.draft.strategy().is_some(),
            WizardStep::SelectExchange => self.draft.exchange().is_some(),
            WizardStep::EnterCredentials => {
                self.credentials_provisioned() || self.draft.credentials_complete()
            }
            WizardStep::Configure => self.draft.has_market() && self.draft.validate().ok,
            WizardStep::Review => true,
        }
    }

    pub fn advance(&mut self) -> Result<WizardStep, WizardError> {
        let next = self.step.next().ok_or(WizardError::AtEnd)?;
        if !self.can_proceed() {
            return Err(WizardError::Incomplete(self.step.name()));
        }
        self.step = next;
        Ok(next)
    }

    pub fn back(&mut self) -> Result<WizardStep, WizardError> {
        let previous = self.step.previous().ok_or(WizardError::InvalidBack {
            from: self.step.name(),
            to: self.step.name(),
        })?;
        self.step = previous;
        Ok(previous)
    }

    /// Jump back to any earlier step
    pub fn back_to(&mut self, step: WizardStep) -> Result<(), WizardError> {
        if step >= self.step {
            return Err(WizardError::InvalidBack {
                from: self.step.name(),
                to: step.name(),
            });
        }
        self.step = step;
        Ok(())
    }

    /// Discard the draft and any secrets it holds
    pub fn cancel(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.draft.clear_credentials();
        self.draft = BotConfigDraft::new();
        self.step = WizardStep::SelectType;
        self.provisioned_for = None;
    }

    /// Submit from the Review step: credentials first, then the bot.
    ///
    /// A credential failure sends the wizard back to EnterCredentials with
    /// the secret fields already cleared. A bot failure after credentials
    /// were stored keeps the wizard on Review and reports the orphaned
    /// credential; nothing is rolled back. When the bot may have been
    /// created anyway (timeout, unreadable 2xx) the credential is not
    /// reported orphaned. Success consumes the draft.
    pub async fn confirm(
        &mut self,
        client_id: &str,
        provisioner: &CredentialProvisioner,
        lifecycle: &BotLifecycleClient,
    ) -> Result<Bot, SubmitError> {
        if self.step != WizardStep::Review {
            return Err(WizardError::NotAtReview.into());
        }
        // Everything up to Review must still hold; the draft may have been
        // edited since those steps were passed.
        for step in [WizardStep::SelectType, WizardStep::SelectExchange, WizardStep::EnterCredentials] {
            if !self.step_complete(step) {
                return Err(WizardError::Incomplete(step.name()).into());
            }
        }
        let payload = self.draft.to_wire_payload().map_err(SubmitError::Validation)?;
        let exchange = self
            .draft
            .exchange()
            .ok_or(WizardError::Incomplete(WizardStep::SelectExchange.name()))?;

        if !self.credentials_provisioned() {
            let creds = self
                .draft
                .credentials_mut()
                .ok_or(WizardError::Incomplete(WizardStep::EnterCredentials.name()))?;
            if let Err(e) = provisioner.submit(client_id, exchange, creds).await {
                warn!("Credential submission failed for {}: {}", exchange.id, e);
                self.draft.clear_credentials();
                self.step = WizardStep::EnterCredentials;
                return Err(e.into());
            }
            self.provisioned_for = Some(exchange.id);
        }

        match lifecycle.create(client_id, &payload).await {
            Ok(bot) => {
                info!("Wizard completed: {} bot {} on {}", payload.bot_type, bot.id, exchange.id);
                self.reset();
                Ok(bot)
            }
            Err(error) if error.may_have_applied() => {
                warn!(
                    "Bot creation outcome unknown for client {}, re-poll before retrying: {}",
                    client_id, error
                );
                Err(SubmitError::BotCreation {
                    error,
                    orphaned_credential: false,
                })
            }
            Err(error) => {
                warn!(
                    "Bot creation failed after credentials were stored for client {}: {}",
                    client_id, error
                );
                Err(SubmitError::BotCreation {
                    error,
                    orphaned_credential: true,
                })
            }
        }
    }
}
