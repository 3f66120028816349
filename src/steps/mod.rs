//! Built-in onboarding steps for setting up a new shop

pub mod payment;
pub mod product;
pub mod shipping;
pub mod shop_details;

pub use payment::PaymentMethodStep;
pub use product::FirstProductStep;
pub use shipping::ShippingStep;
pub use shop_details::ShopDetailsStep;

use crate::registry::StepRegistry;

/// Process id of the shop setup onboarding
pub const SHOP_SETUP: &str = "shop_setup";

/// Register the shop setup steps under [`SHOP_SETUP`]
pub fn register_defaults(registry: &mut StepRegistry) {
    registry
        .register(SHOP_SETUP, |ctx| Box::new(ShopDetailsStep::new(ctx)))
        .register(SHOP_SETUP, |ctx| Box::new(PaymentMethodStep::new(ctx)))
        .register(SHOP_SETUP, |ctx| Box::new(ShippingStep::new(ctx)))
        .register(SHOP_SETUP, |ctx| Box::new(FirstProductStep::new(ctx)));
}
