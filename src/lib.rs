//! Onboarding - step sequencing for admin onboarding wizards
//!
//! A process is an ordered set of steps (shop details, payment, shipping...)
//! whose done/skipped state lives in a per-process namespace of the user's
//! session. The [`Onboarding`] sequencer orders the steps and answers which
//! one is current; the [`OnboardingWizard`] applies user actions to it and
//! the [`OnboardingGate`] keeps admin users inside a pending onboarding.

pub mod config;
pub mod context;
pub mod error;
pub mod forms;
pub mod gate;
pub mod logging;
pub mod onboarding;
pub mod registry;
pub mod step;
pub mod steps;
pub mod storage;
pub mod wizard;

pub use context::OnboardingContext;
pub use error::{OnboardingError, Result, StorageError, ValidationError};
pub use forms::{FieldKind, FormData, FormField, ValidatedData};
pub use gate::{GateDecision, OnboardingGate, RequestInfo};
pub use onboarding::{Onboarding, Sequencer, SuccessUrl};
pub use registry::{
    DefaultOnboardingProvider, OnboardingProvider, ProviderTable, StepFactory, StepRegistry,
};
pub use step::{OnboardingStep, StepRecord};
pub use storage::{FileSession, MemorySession, OnboardingStorage, SessionBackend, SessionStorage};
pub use wizard::{OnboardingWizard, WizardAction, WizardOutcome};
