//! Shop name and currency

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::context::OnboardingContext;
use crate::error::{OnboardingError, Result};
use crate::forms::{FormField, ValidatedData};
use crate::step::{OnboardingStep, StepRecord};

/// Currencies a shop can be set up with
pub const CURRENCIES: &[&str] = &["USD", "EUR", "GBP", "BRL"];

pub struct ShopDetailsStep {
    record: StepRecord,
}

impl ShopDetailsStep {
    pub const IDENTIFIER: &'static str = "shop_details";

    pub fn new(context: Arc<OnboardingContext>) -> Self {
        Self {
            record: StepRecord::new(context, Self::IDENTIFIER),
        }
    }
}

impl OnboardingStep for ShopDetailsStep {
    fn identifier(&self) -> &str {
        Self::IDENTIFIER
    }

    fn title(&self) -> &str {
        "Shop details"
    }

    fn description(&self) -> Option<&str> {
        Some("Name your shop and choose the currency prices are shown in.")
    }

    fn icon(&self) -> Option<&str> {
        Some("fa-store")
    }

    fn priority(&self) -> i32 {
        100
    }

    fn is_visible(&self) -> Result<bool> {
        Ok(true)
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
            FormField::text("name", "Shop name").required(),
            FormField::choice("currency", "Currency", CURRENCIES.iter().copied())
                .required()
                .initial(Value::String("USD".to_string())),
        ];
        // prefill is best effort; a storage failure surfaces on save instead
        self.record.prefill(fields.clone()).unwrap_or(fields)
    }

    fn save(&self, data: ValidatedData) -> Result<()> {
        self.record.mark_done(&data)
    }

    fn render_context(&self) -> Map<String, Value> {
        let mut context = Map::new();
        if let Some(shop) = self.record.context().shop() {
            context.insert("shop".to_string(), Value::String(shop.to_string()));
        }
        context
    }
}
