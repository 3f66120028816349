use std::sync::Arc;

use serde_json::{Map, Value};

use crate::context::OnboardingContext;
use crate::error::Result;
use crate::forms::{FormField, ValidatedData};
use crate::step::{OnboardingStep, StepRecord};

use super::shop_details::ShopDetailsStep;

pub const PROVIDERS: &[&str] = &["manual", "stripe", "paypal"];

/// Pick how the shop takes payments. Optional.
pub struct PaymentMethodStep {
    record: StepRecord,
}

impl PaymentMethodStep {
    pub const IDENTIFIER: &'static str = "payment_method";

    pub fn new(context: Arc<OnboardingContext>) -> Self {
        Self {
            record: StepRecord::new(context, Self::IDENTIFIER),
        }
    }
}

impl OnboardingStep for PaymentMethodStep {
    fn identifier(&self) -> &str {
        Self::IDENTIFIER
    }

    fn title(&self) -> &str {
        "Payment method"
    }

    fn description(&self) -> Option<&str> {
        Some("Choose a payment provider. You can set this up later.")
    }

    fn icon(&self) -> Option<&str> {
        Some("fa-credit-card")
    }

    fn priority(&self) -> i32 {
        50
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
            FormField::choice("provider", "Provider", PROVIDERS.iter().copied()).required(),
            FormField::boolean("sandbox", "Sandbox mode")
                .help("Process test payments only")
                .initial(Value::Bool(true)),
        ];
        self.record.prefill(fields.clone()).unwrap_or(fields)
    }

    fn save(&self, data: ValidatedData) -> Result<()> {
        self.record.mark_done(&data)
    }

    fn render_context(&self) -> Map<String, Value> {
        // show prices in the currency picked on the shop details step
        let currency = self
            .record
            .sibling(ShopDetailsStep::IDENTIFIER)
            .saved_data()
            .ok()
            .flatten()
            .and_then(|data| data.get("currency").cloned());

        let mut context = Map::new();
        if let Some(currency) = currency {
            context.insert("currency".to_string(), currency);
        }
        context
    }
}
