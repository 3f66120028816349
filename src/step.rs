//! The onboarding step capability and shared storage bookkeeping

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};

use crate::context::OnboardingContext;
use crate::error::{Result, ValidationError};
use crate::forms::{validate_fields, FormData, FormField, ValidatedData};

/// One unit of onboarding work.
///
/// Steps are rebuilt every time a sequencer is loaded, so construction must
/// be cheap and free of side effects. All state lives in the context's
/// storage (or in the systems a step configures), keyed by `identifier()`,
/// which must stay stable across rebuilds.
pub trait OnboardingStep: Send + Sync {
    /// Identifier, unique within a process
    fn identifier(&self) -> &str;

    fn title(&self) -> &str;

    fn description(&self) -> Option<&str> {
        None
    }

    fn icon(&self) -> Option<&str> {
        None
    }

    /// Higher priorities are presented first
    fn priority(&self) -> i32 {
        0
    }

    /// Whether the step takes part in sequencing at all for this request
    fn is_visible(&self) -> Result<bool>;

    /// Whether the step's work is complete
    fn is_done(&self) -> Result<bool>;

    /// Whether the user may skip this step
    fn can_skip(&self) -> Result<bool>;

    /// Whether the step was explicitly skipped before.
    ///
    /// Only consulted when `can_skip()` is true, to keep a skipped step
    /// from coming back.
    fn was_skipped(&self) -> Result<bool>;

    /// Record that the user skipped this step.
    ///
    /// Callers must check `can_skip()` first.
    fn skip(&self) -> Result<()>;

    /// Clear done and skipped state so the step is presented again
    fn undo(&self) -> Result<()>;

    /// Inputs the step asks for
    fn form_fields(&self) -> Vec<FormField>;

    fn validate_input(&self, data: &FormData) -> Result<ValidatedData, ValidationError> {
        validate_fields(&self.form_fields(), data)
    }

    /// Persist validated input. Afterwards `is_done()` must report true.
    fn save(&self, data: ValidatedData) -> Result<()>;

    /// Extra data for whoever renders the step
    fn render_context(&self) -> Map<String, Value> {
        Map::new()
    }
}

impl fmt::Debug for dyn OnboardingStep + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnboardingStep")
            .field("identifier", &self.identifier())
            .field("priority", &self.priority())
            .finish()
    }
}

/// Storage-backed done/skipped bookkeeping for a step.
///
/// Keys used inside the process namespace:
/// - `{identifier}`: last saved data
/// - `{identifier}_done`: completion flag
/// - `{identifier}_skipped`: skip flag
/// - `{identifier}_saved_at`: RFC 3339 timestamp of the last save
#[derive(Debug, Clone)]
pub struct StepRecord {
    context: Arc<OnboardingContext>,
    identifier: String,
}

impl StepRecord {
    pub fn new(context: Arc<OnboardingContext>, identifier: impl Into<String>) -> Self {
        Self {
            context,
            identifier: identifier.into(),
        }
    }

    pub fn context(&self) -> &OnboardingContext {
        &self.context
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Record of another step sharing this context
    pub fn sibling(&self, identifier: impl Into<String>) -> StepRecord {
        StepRecord::new(Arc::clone(&self.context), identifier)
    }

    fn done_key(&self) -> String {
        format!("{}_done", self.identifier)
    }

    fn skipped_key(&self) -> String {
        format!("{}_skipped", self.identifier)
    }

    fn saved_at_key(&self) -> String {
        format!("{}_saved_at", self.identifier)
    }

    fn flag(&self, key: &str) -> Result<bool> {
        Ok(self
            .context
            .storage()
            .get(key)?
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    pub fn is_done(&self) -> Result<bool> {
        self.flag(&self.done_key())
    }

    pub fn was_skipped(&self) -> Result<bool> {
        self.flag(&self.skipped_key())
    }

    /// Data stored by the last `mark_done`
    pub fn saved_data(&self) -> Result<Option<Value>> {
        Ok(self.context.storage().get(&self.identifier)?)
    }

    /// Store the validated data and flag the step as done
    pub fn mark_done(&self, data: &ValidatedData) -> Result<()> {
        let storage = self.context.storage();
        storage.set(&self.identifier, Value::Object(data.as_map().clone()))?;
        storage.set(
            &self.saved_at_key(),
            Value::String(Utc::now().to_rfc3339()),
        )?;
        storage.set(&self.done_key(), Value::Bool(true))?;
        tracing::info!(step = %self.identifier, "onboarding step saved");
        Ok(())
    }

    pub fn mark_skipped(&self) -> Result<()> {
        self.context
            .storage()
            .set(&self.skipped_key(), Value::Bool(true))?;
        tracing::info!(step = %self.identifier, "onboarding step skipped");
        Ok(())
    }

    /// Clear both flags. Saved data is kept so forms can be prefilled.
    pub fn reset(&self) -> Result<()> {
        let storage = self.context.storage();
        storage.remove(&self.done_key())?;
        storage.remove(&self.skipped_key())?;
        tracing::info!(step = %self.identifier, "onboarding step reset");
        Ok(())
    }

    /// Fill each field's initial value from previously saved data
    pub fn prefill(&self, mut fields: Vec<FormField>) -> Result<Vec<FormField>> {
        if let Some(Value::Object(saved)) = self.saved_data()? {
            for field in &mut fields {
                if let Some(value) = saved.get(&field.name).filter(|v| !v.is_null()) {
                    field.initial = Some(value.clone());
                }
            }
        }
        Ok(fields)
    }
}
