//! Step registration and sequencer resolution.
//!
//! [`StepRegistry`] is the explicit table mapping a process id to the
//! ordered factories of its steps. [`ProviderTable`] maps provider names to
//! [`OnboardingProvider`]s so the configuration can pick which sequencer
//! implementation builds an onboarding.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::OnboardingSettings;
use crate::context::OnboardingContext;
use crate::error::{OnboardingError, Result};
use crate::onboarding::{Onboarding, Sequencer, SuccessUrl};
use crate::step::OnboardingStep;

/// Builds a step bound to a context
pub type StepFactory =
    Arc<dyn Fn(Arc<OnboardingContext>) -> Box<dyn OnboardingStep> + Send + Sync>;

/// Process id → ordered step factories
#[derive(Clone, Default)]
pub struct StepRegistry {
    processes: HashMap<String, Vec<StepFactory>>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step factory to `process_id`
    pub fn register<F>(&mut self, process_id: &str, factory: F) -> &mut Self
    where
        F: Fn(Arc<OnboardingContext>) -> Box<dyn OnboardingStep> + Send + Sync + 'static,
    {
        self.processes
            .entry(process_id.to_string())
            .or_default()
            .push(Arc::new(factory));
        self
    }

    /// Factories registered for `process_id`, in registration order
    pub fn factories(&self, process_id: &str) -> &[StepFactory] {
        self.processes
            .get(process_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Sorted list of process ids with at least one step
    pub fn process_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.processes.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&str, usize> = self
            .processes
            .iter()
            .map(|(k, v)| (k.as_str(), v.len()))
            .collect();
        f.debug_struct("StepRegistry")
            .field("processes", &counts)
            .finish()
    }
}

/// Builds the sequencer for a process
pub trait OnboardingProvider: Send + Sync {
    fn get_onboarding(
        &self,
        process_id: &str,
        context: Arc<OnboardingContext>,
    ) -> Result<Box<dyn Sequencer>>;
}

/// Provider building the priority-ordered [`Onboarding`]
pub struct DefaultOnboardingProvider {
    registry: Arc<StepRegistry>,
    success_url: SuccessUrl,
}

impl DefaultOnboardingProvider {
    pub fn new(registry: Arc<StepRegistry>, success_url: SuccessUrl) -> Self {
        Self {
            registry,
            success_url,
        }
    }
}

impl OnboardingProvider for DefaultOnboardingProvider {
    fn get_onboarding(
        &self,
        process_id: &str,
        context: Arc<OnboardingContext>,
    ) -> Result<Box<dyn Sequencer>> {
        Ok(Box::new(Onboarding::load(
            process_id,
            context,
            &self.registry,
            self.success_url.clone(),
        )))
    }
}

/// Named providers, resolved from configuration
#[derive(Default)]
pub struct ProviderTable {
    providers: HashMap<String, Arc<dyn OnboardingProvider>>,
}

impl ProviderTable {
    /// Name the default provider is registered under
    pub const DEFAULT: &'static str = "default";

    pub fn new() -> Self {
        Self::default()
    }

    /// Table holding the default provider
    pub fn with_defaults(registry: Arc<StepRegistry>, settings: &OnboardingSettings) -> Self {
        let mut table = Self::new();
        table.register(
            Self::DEFAULT,
            Arc::new(DefaultOnboardingProvider::new(
                registry,
                settings.default_success_url.clone(),
            )),
        );
        table
    }

    pub fn register(&mut self, name: &str, provider: Arc<dyn OnboardingProvider>) -> &mut Self {
        self.providers.insert(name.to_string(), provider);
        self
    }

    /// Provider registered under `name`
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn OnboardingProvider>> {
        self.providers.get(name).cloned().ok_or_else(|| {
            let mut known: Vec<&str> = self.providers.keys().map(String::as_str).collect();
            known.sort_unstable();
            OnboardingError::configuration(format!(
                "unknown onboarding provider '{}' (available: {})",
                name,
                known.join(", ")
            ))
        })
    }

    /// Provider selected by `settings.provider`
    pub fn from_settings(&self, settings: &OnboardingSettings) -> Result<Arc<dyn OnboardingProvider>> {
        self.resolve(&settings.provider)
    }
}
