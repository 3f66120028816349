//! Request handling for the onboarding wizard.
//!
//! Transport-free version of the admin onboarding view: the caller maps a
//! submission to a [`WizardAction`], and the wizard applies it to the
//! current step and reports what to present next.

use crate::error::{OnboardingError, Result, ValidationError};
use crate::forms::FormData;
use crate::onboarding::{Sequencer, SuccessUrl};

/// What the user asked for on the current step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardAction {
    /// Submit input for the current step
    Submit(FormData),
    /// Skip the current step (only honoured when it can be skipped)
    Skip,
    /// Reopen the step before the current one
    Previous,
}

/// What to present after an action
#[derive(Debug, Clone, PartialEq)]
pub enum WizardOutcome {
    /// Present the step with this identifier
    Show { step: String },
    /// Input was rejected; the same step stays current
    Invalid {
        step: String,
        errors: ValidationError,
    },
    /// No step is pending any more
    Complete { success: SuccessUrl },
}

/// Drives one onboarding process through user actions
pub struct OnboardingWizard {
    onboarding: Box<dyn Sequencer>,
}

impl OnboardingWizard {
    pub fn new(onboarding: Box<dyn Sequencer>) -> Self {
        Self { onboarding }
    }

    pub fn sequencer(&self) -> &dyn Sequencer {
        self.onboarding.as_ref()
    }

    /// Current state without acting
    pub fn status(&self) -> Result<WizardOutcome> {
        match self.onboarding.current_step()? {
            Some(step) => Ok(WizardOutcome::Show {
                step: step.identifier().to_string(),
            }),
            None => Ok(WizardOutcome::Complete {
                success: self.onboarding.success_url(),
            }),
        }
    }

    /// Apply `action` to the current step.
    ///
    /// Skipping a step that cannot be skipped fails with
    /// [`OnboardingError::SkipNotAllowed`] and changes nothing.
    pub fn handle(&self, action: WizardAction) -> Result<WizardOutcome> {
        let Some(current) = self.onboarding.current_step()? else {
            return self.status();
        };

        match action {
            WizardAction::Skip => {
                if !current.can_skip()? {
                    return Err(OnboardingError::skip_not_allowed(current.identifier()));
                }
                current.skip()?;
            }
            WizardAction::Previous => {
                if let Some(previous) = self.onboarding.previous_step()? {
                    tracing::debug!(step = %previous.identifier(), "reopening previous step");
                    previous.undo()?;
                }
            }
            WizardAction::Submit(data) => match current.validate_input(&data) {
                Ok(validated) => current.save(validated)?,
                Err(errors) => {
                    tracing::debug!(step = %current.identifier(), %errors, "step input rejected");
                    return Ok(WizardOutcome::Invalid {
                        step: current.identifier().to_string(),
                        errors,
                    });
                }
            },
        }

        self.status()
    }
}
