//! Step sequencing for an onboarding process.
//!
//! An [`Onboarding`] loads every step registered for a process id, orders
//! them by priority (highest first, registration order on ties) and answers
//! which step is current and what lies around it. The ordering is fixed at
//! load time; build a new sequencer to pick up registry changes.
//!
//! Navigation deliberately keeps two orderings apart:
//! - the *pending* list decides which step is current
//! - the *visible* list (which still contains done and skipped steps) is
//!   what next/previous walk through, starting at the current step
//!
//! So once a step has been skipped, "previous" from the current step can be
//! that skipped step rather than the last step the user actually saw.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::OnboardingContext;
use crate::error::{OnboardingError, Result};
use crate::registry::StepRegistry;
use crate::step::OnboardingStep;

/// Where to send the user once the process is complete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SuccessUrl {
    /// Plain route name, e.g. `admin:dashboard`
    Route(String),
    /// Route name plus parameters to resolve it with
    WithParams {
        route: String,
        #[serde(default)]
        params: BTreeMap<String, String>,
    },
}

impl SuccessUrl {
    pub fn route(&self) -> &str {
        match self {
            SuccessUrl::Route(route) => route,
            SuccessUrl::WithParams { route, .. } => route,
        }
    }

    pub fn params(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            SuccessUrl::Route(_) => None,
            SuccessUrl::WithParams { params, .. } => Some(params),
        }
    }
}

impl Default for SuccessUrl {
    fn default() -> Self {
        SuccessUrl::Route("admin:dashboard".to_string())
    }
}

impl fmt::Display for SuccessUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuccessUrl::Route(route) => write!(f, "{}", route),
            SuccessUrl::WithParams { route, params } => {
                let params: Vec<String> =
                    params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                write!(f, "{} ({})", route, params.join(", "))
            }
        }
    }
}

/// Positions of the steps that take part in navigation
fn visible_positions(steps: &[Box<dyn OnboardingStep>]) -> Result<Vec<usize>> {
    let mut positions = Vec::new();
    for (i, step) in steps.iter().enumerate() {
        if step.is_visible()? {
            positions.push(i);
        }
    }
    Ok(positions)
}

/// Positions of the steps still waiting for the user
fn pending_positions(steps: &[Box<dyn OnboardingStep>]) -> Result<Vec<usize>> {
    let mut positions = Vec::new();
    for (i, step) in steps.iter().enumerate() {
        if !step.is_visible()? {
            continue;
        }

        if step.is_done()? {
            continue;
        }

        // skippable and already skipped once
        if step.can_skip()? && step.was_skipped()? {
            continue;
        }

        positions.push(i);
    }
    Ok(positions)
}

/// Neighbour of the current step in the visible list, `offset` away
fn neighbour_position(steps: &[Box<dyn OnboardingStep>], offset: isize) -> Result<Option<usize>> {
    let Some(current) = pending_positions(steps)?.first().copied() else {
        return Ok(None);
    };
    let visible = visible_positions(steps)?;
    let Some(index) = visible.iter().position(|&p| p == current) else {
        return Ok(None);
    };
    Ok(index
        .checked_add_signed(offset)
        .and_then(|i| visible.get(i).copied()))
}

/// Sequencing operations over an ordered set of steps.
///
/// Implementors supply the ordered steps, context and success target; the
/// navigation queries have default implementations that alternate engines
/// can override.
pub trait Sequencer: Send + Sync {
    fn process_id(&self) -> &str;

    fn context(&self) -> &OnboardingContext;

    /// Every step of the process in presentation order
    fn steps(&self) -> &[Box<dyn OnboardingStep>];

    /// Where to go once no step is pending
    fn success_url(&self) -> SuccessUrl;

    /// Look up a step by identifier
    fn step(&self, identifier: &str) -> Result<&dyn OnboardingStep> {
        self.steps()
            .iter()
            .find(|s| s.identifier() == identifier)
            .map(|s| &**s)
            .ok_or_else(|| OnboardingError::UnknownStep(identifier.to_string()))
    }

    /// Visible steps that are neither done nor skipped
    fn pending_steps(&self) -> Result<Vec<&dyn OnboardingStep>> {
        let steps = self.steps();
        Ok(pending_positions(steps)?
            .into_iter()
            .map(move |i| &*steps[i])
            .collect())
    }

    /// All visible steps, done and skipped ones included
    fn visible_steps(&self) -> Result<Vec<&dyn OnboardingStep>> {
        let steps = self.steps();
        Ok(visible_positions(steps)?
            .into_iter()
            .map(move |i| &*steps[i])
            .collect())
    }

    /// First pending step; `None` once the process is complete
    fn current_step(&self) -> Result<Option<&dyn OnboardingStep>> {
        let steps = self.steps();
        Ok(pending_positions(steps)?
            .first()
            .map(move |&i| &*steps[i]))
    }

    /// Visible step right after the current one
    fn next_step(&self) -> Result<Option<&dyn OnboardingStep>> {
        let steps = self.steps();
        Ok(neighbour_position(steps, 1)?.map(move |i| &*steps[i]))
    }

    /// Visible step right before the current one
    fn previous_step(&self) -> Result<Option<&dyn OnboardingStep>> {
        let steps = self.steps();
        Ok(neighbour_position(steps, -1)?.map(move |i| &*steps[i]))
    }

    /// Clear the process's storage namespace. Irreversible.
    fn finish(&self) -> Result<()> {
        self.context().storage().clear()?;
        tracing::info!(process_id = %self.process_id(), "onboarding finished, storage cleared");
        Ok(())
    }
}

/// Default sequencer: steps from the registry, ordered by priority
pub struct Onboarding {
    process_id: String,
    context: Arc<OnboardingContext>,
    steps: Vec<Box<dyn OnboardingStep>>,
    success_url: SuccessUrl,
}

impl Onboarding {
    /// Instantiate and order every step registered for `process_id`
    pub fn load(
        process_id: &str,
        context: Arc<OnboardingContext>,
        registry: &StepRegistry,
        success_url: SuccessUrl,
    ) -> Self {
        let factories = registry.factories(process_id);
        if factories.is_empty() {
            tracing::warn!(process_id, "no onboarding steps registered for process");
        }

        let steps = factories
            .iter()
            .map(|factory| factory(Arc::clone(&context)))
            .collect();

        Self::from_steps(process_id, context, steps, success_url)
    }

    /// Build from already constructed steps, applying the priority order
    pub fn from_steps(
        process_id: &str,
        context: Arc<OnboardingContext>,
        mut steps: Vec<Box<dyn OnboardingStep>>,
        success_url: SuccessUrl,
    ) -> Self {
        // stable: equal priorities keep registration order
        steps.sort_by_key(|step| std::cmp::Reverse(step.priority()));

        tracing::debug!(
            process_id,
            steps = ?steps.iter().map(|s| s.identifier()).collect::<Vec<_>>(),
            "loaded onboarding steps"
        );

        Self {
            process_id: process_id.to_string(),
            context,
            steps,
            success_url,
        }
    }
}

impl Sequencer for Onboarding {
    fn process_id(&self) -> &str {
        &self.process_id
    }

    fn context(&self) -> &OnboardingContext {
        &self.context
    }

    fn steps(&self) -> &[Box<dyn OnboardingStep>] {
        &self.steps
    }

    fn success_url(&self) -> SuccessUrl {
        self.success_url.clone()
    }
}

impl fmt::Debug for Onboarding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Onboarding")
            .field("process_id", &self.process_id)
            .field("steps", &self.steps)
            .field("success_url", &self.success_url)
            .finish_non_exhaustive()
    }
}
