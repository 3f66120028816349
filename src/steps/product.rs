use std::sync::Arc;

use serde_json::{Map, Value};

use crate::context::OnboardingContext;
use crate::error::{OnboardingError, Result, ValidationError};
use crate::forms::{validate_fields, FormData, FormField, ValidatedData};
use crate::step::{OnboardingStep, StepRecord};

use super::shop_details::ShopDetailsStep;

/// Create the first product. Only offered once the shop itself exists.
pub struct FirstProductStep {
    record: StepRecord,
}

impl FirstProductStep {
    pub const IDENTIFIER: &'static str = "first_product";

    pub fn new(context: Arc<OnboardingContext>) -> Self {
        Self {
            record: StepRecord::new(context, Self::IDENTIFIER),
        }
    }

    fn shop_details(&self) -> StepRecord {
        self.record.sibling(ShopDetailsStep::IDENTIFIER)
    }
}

impl OnboardingStep for FirstProductStep {
    fn identifier(&self) -> &str {
        Self::IDENTIFIER
    }

    fn title(&self) -> &str {
        "First product"
    }

    fn description(&self) -> Option<&str> {
        Some("Add a product so customers have something to buy.")
    }

    fn icon(&self) -> Option<&str> {
        Some("fa-cube")
    }

    fn priority(&self) -> i32 {
        10
    }

    fn is_visible(&self) -> Result<bool> {
        self.shop_details().is_done()
    }

    fn is_done(&self) -> Result<bool> {
        self.record.is_done()
    }

    fn can_skip(&self) -> Result<bool> {
        Ok(false)
    }

    fn was_skipped(&self) -> Result<bool> {
        self.record.was_skipped()
    }

    fn skip(&self) -> Result<()> {
        Err(OnboardingError::skip_not_allowed(Self::IDENTIFIER))
    }

    fn undo(&self) -> Result<()> {
        self.record.reset()
    }

    fn form_fields(&self) -> Vec<FormField> {
        let fields = vec![
            FormField::text("name", "Product name").required(),
            FormField::decimal("price", "Price").required(),
            FormField::text("sku", "SKU"),
        ];
        self.record.prefill(fields.clone()).unwrap_or(fields)
    }

    fn validate_input(&self, data: &FormData) -> Result<ValidatedData, ValidationError> {
        let validated = validate_fields(&self.form_fields(), data)?;
        if validated.get_f64("price").is_some_and(|price| price <= 0.0) {
            return Err(ValidationError::field(
                "price",
                "Ensure this value is greater than 0.",
            ));
        }
        Ok(validated)
    }

    fn save(&self, data: ValidatedData) -> Result<()> {
        self.record.mark_done(&data)
    }

    fn render_context(&self) -> Map<String, Value> {
        let mut context = Map::new();
        if let Ok(Some(Value::Object(details))) = self.shop_details().saved_data() {
            for key in ["name", "currency"] {
                if let Some(value) = details.get(key) {
                    context.insert(format!("shop_{key}"), value.clone());
                }
            }
        }
        context
    }
}
