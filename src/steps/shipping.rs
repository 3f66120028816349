use std::sync::Arc;

use crate::context::OnboardingContext;
use crate::error::{Result, ValidationError};
use crate::forms::{validate_fields, FormData, FormField, ValidatedData};
use crate::step::{OnboardingStep, StepRecord};

/// Default carrier and flat shipping rate. Optional.
pub struct ShippingStep {
    record: StepRecord,
}

impl ShippingStep {
    pub const IDENTIFIER: &'static str = "shipping";

    pub fn new(context: Arc<OnboardingContext>) -> Self {
        Self {
            record: StepRecord::new(context, Self::IDENTIFIER),
        }
    }
}

impl OnboardingStep for ShippingStep {
    fn identifier(&self) -> &str {
        Self::IDENTIFIER
    }

    fn title(&self) -> &str {
        "Shipping"
    }

    fn icon(&self) -> Option<&str> {
        Some("fa-truck")
    }

    fn priority(&self) -> i32 {
        40
    }

    fn is_visible(&self) -> Result<bool> {
        Ok(true)
    }

    fn is_done(&self) -> Result<bool> {
        self.record.is_done()
    }

    fn can_skip(&self) -> Result<bool> {
        Ok(true)
    }

    fn was_skipped(&self) -> Result<bool> {
        self.record.was_skipped()
    }

    fn skip(&self) -> Result<()> {
        self.record.mark_skipped()
    }

    fn undo(&self) -> Result<()> {
        self.record.reset()
    }

    fn form_fields(&self) -> Vec<FormField> {
        let fields = vec![
            FormField::text("carrier", "Carrier").required(),
            FormField::decimal("flat_rate", "Flat rate").required(),
        ];
        self.record.prefill(fields.clone()).unwrap_or(fields)
    }

    fn validate_input(&self, data: &FormData) -> Result<ValidatedData, ValidationError> {
        let validated = validate_fields(&self.form_fields(), data)?;
        if validated.get_f64("flat_rate").is_some_and(|rate| rate < 0.0) {
            return Err(ValidationError::field(
                "flat_rate",
                "Ensure this value is greater than or equal to 0.",
            ));
        }
        Ok(validated)
    }

    fn save(&self, data: ValidatedData) -> Result<()> {
        self.record.mark_done(&data)
    }
}
