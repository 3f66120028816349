//! Shared context handed to every onboarding step

use std::fmt;
use std::sync::Arc;

use crate::storage::OnboardingStorage;

/// Storage handle plus the actor the onboarding runs for.
///
/// Shop, supplier and user are opaque identifiers; the sequencer passes
/// them through untouched for steps to use.
#[derive(Clone)]
pub struct OnboardingContext {
    storage: Arc<dyn OnboardingStorage>,
    shop: Option<String>,
    supplier: Option<String>,
    user: Option<String>,
}

impl OnboardingContext {
    pub fn new(storage: Arc<dyn OnboardingStorage>) -> Self {
        Self {
            storage,
            shop: None,
            supplier: None,
            user: None,
        }
    }

    pub fn with_shop(mut self, shop: impl Into<String>) -> Self {
        self.shop = Some(shop.into());
        self
    }

    pub fn with_supplier(mut self, supplier: impl Into<String>) -> Self {
        self.supplier = Some(supplier.into());
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn storage(&self) -> &dyn OnboardingStorage {
        self.storage.as_ref()
    }

    pub fn shop(&self) -> Option<&str> {
        self.shop.as_deref()
    }

    pub fn supplier(&self) -> Option<&str> {
        self.supplier.as_deref()
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }
}

impl fmt::Debug for OnboardingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnboardingContext")
            .field("shop", &self.shop)
            .field("supplier", &self.supplier)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}
