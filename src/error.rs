//! Error types for the onboarding engine

use std::collections::BTreeMap;

use thiserror::Error;

/// Convenience result alias used across the library
pub type Result<T, E = OnboardingError> = std::result::Result<T, E>;

/// Errors raised by a storage namespace or its session backend
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("key '{0}' not found in onboarding storage")]
    KeyNotFound(String),

    #[error("session backend I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to (de)serialize session data: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("session backend lock poisoned")]
    Poisoned,

    #[error("session key '{0}' does not hold a mapping")]
    CorruptNamespace(String),
}

/// Errors surfaced by the sequencer, its steps, and the resolution layer
#[derive(Error, Debug)]
pub enum OnboardingError {
    /// Provider or gate could not be built from the configuration
    #[error("onboarding configuration error: {0}")]
    Configuration(String),

    /// `skip()` called on a step that does not allow skipping
    #[error("step '{step}' cannot be skipped")]
    SkipNotAllowed { step: String },

    #[error("no step '{0}' in this onboarding process")]
    UnknownStep(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl OnboardingError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        OnboardingError::Configuration(message.into())
    }

    /// Create a skip precondition error for a step
    pub fn skip_not_allowed(step: impl Into<String>) -> Self {
        OnboardingError::SkipNotAllowed { step: step.into() }
    }
}

/// Field-level validation failure for a step's input.
///
/// Errors are keyed by field name; messages that do not belong to a single
/// field go to `non_field`.
#[derive(Error, Debug, Clone, Default, PartialEq, Eq)]
#[error("invalid input ({})", summary(.fields, .non_field))]
pub struct ValidationError {
    pub fields: BTreeMap<String, Vec<String>>,
    pub non_field: Vec<String>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error against a field
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Record an error that is not tied to a single field
    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    /// Shorthand for a single field error
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut err = Self::new();
        err.add(field, message);
        err
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }

    /// Errors recorded against `field`, if any
    pub fn errors_for(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Consume the collector, returning `Ok(())` when nothing was recorded
    pub fn into_result(self) -> std::result::Result<(), ValidationError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// `field: msg, msg; field: msg; non-field msg`
fn summary(fields: &BTreeMap<String, Vec<String>>, non_field: &[String]) -> String {
    fields
        .iter()
        .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
        .chain(non_field.iter().cloned())
        .collect::<Vec<_>>()
        .join("; ")
}
