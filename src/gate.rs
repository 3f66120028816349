//! Redirect admin requests into a pending onboarding.
//!
//! Runs in front of admin views: as long as the configured process still has
//! a current step, an authenticated request to any admin view outside the
//! allow list is sent to the onboarding wizard instead.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::context::OnboardingContext;
use crate::error::{OnboardingError, Result};
use crate::registry::OnboardingProvider;

/// App name that marks a request as an admin request
pub const ADMIN_APP: &str = "admin";

/// Route of the onboarding wizard view
pub const ONBOARDING_ROUTE: &str = "onboarding.onboard";

/// Admin views that stay reachable while onboarding is pending, as
/// `{app}:{view}` names
pub const ALLOWED_VIEWS: &[&str] = &[
    "admin:login",
    "admin:logout",
    "admin:home",
    "admin:tour",
    "admin:wizard",
    "admin:menu",
    "admin:menu_toggle",
    "admin:js-catalog",
    "admin:set-language",
    "admin:stop-impersonating-staff",
    "admin:recover_password",
    "admin:request_password",
    "admin:onboarding.onboard",
];

/// The parts of a request the gate looks at
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
    pub authenticated: bool,
    /// Namespace of the resolved view, if any
    pub app_name: Option<String>,
    /// Name of the resolved view, if any
    pub view_name: Option<String>,
}

impl RequestInfo {
    /// Namespaced view name, e.g. `admin:product.list`
    pub fn qualified_view(&self) -> Option<String> {
        match (self.app_name.as_deref(), self.view_name.as_deref()) {
            (Some(app), Some(view)) => Some(format!("{}:{}", app, view)),
            (None, Some(view)) => Some(view.to_string()),
            (_, None) => None,
        }
    }

    /// Authenticated request to an admin view
    pub fn admin(view_name: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            app_name: Some(ADMIN_APP.to_string()),
            view_name: Some(view_name.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Let the request through
    Pass,
    /// Send the user to the onboarding wizard for `process_id`
    Redirect { process_id: String },
}

#[derive(Debug, Clone)]
pub struct OnboardingGate {
    process_id: String,
    allowed: BTreeSet<String>,
}

impl OnboardingGate {
    /// Gate for `process_id`, letting `ignore_views` (namespaced like
    /// `admin:reports.sales`) through in addition to the built-in
    /// [`ALLOWED_VIEWS`]
    pub fn new<I, S>(process_id: &str, ignore_views: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if process_id.trim().is_empty() {
            return Err(OnboardingError::configuration(
                "onboarding gate requires a process id",
            ));
        }

        let allowed = ALLOWED_VIEWS
            .iter()
            .map(|view| view.to_string())
            .chain(ignore_views.into_iter().map(Into::into))
            .collect();

        Ok(Self {
            process_id: process_id.to_string(),
            allowed,
        })
    }

    pub fn process_id(&self) -> &str {
        &self.process_id
    }

    /// Whether the gate looks at this request at all
    fn applies_to(&self, request: &RequestInfo) -> bool {
        if !request.authenticated || request.app_name.as_deref() != Some(ADMIN_APP) {
            return false;
        }
        match request.qualified_view() {
            Some(view) => !self.allowed.contains(&view),
            None => false,
        }
    }

    pub fn check(
        &self,
        request: &RequestInfo,
        provider: &dyn OnboardingProvider,
        context: Arc<OnboardingContext>,
    ) -> Result<GateDecision> {
        if !self.applies_to(request) {
            return Ok(GateDecision::Pass);
        }

        let onboarding = provider.get_onboarding(&self.process_id, context)?;
        match onboarding.current_step()? {
            Some(step) => {
                tracing::info!(
                    process = %self.process_id,
                    view = request.view_name.as_deref().unwrap_or_default(),
                    step = %step.identifier(),
                    "redirecting to pending onboarding"
                );
                Ok(GateDecision::Redirect {
                    process_id: self.process_id.clone(),
                })
            }
            None => Ok(GateDecision::Pass),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::FormData;
    use crate::onboarding::SuccessUrl;
    use crate::registry::{DefaultOnboardingProvider, StepRegistry};
    use crate::step::OnboardingStep;
    use crate::steps::{self, ShopDetailsStep};
    use crate::storage::{MemorySession, SessionStorage};

    fn provider() -> DefaultOnboardingProvider {
        let mut registry = StepRegistry::new();
        steps::register_defaults(&mut registry);
        DefaultOnboardingProvider::new(Arc::new(registry), SuccessUrl::default())
    }

    fn context() -> Arc<OnboardingContext> {
        let storage =
            SessionStorage::new(steps::SHOP_SETUP, Arc::new(MemorySession::new())).unwrap();
        Arc::new(OnboardingContext::new(Arc::new(storage)))
    }

    fn redirect() -> GateDecision {
        GateDecision::Redirect {
            process_id: steps::SHOP_SETUP.to_string(),
        }
    }

    fn complete_onboarding(ctx: &Arc<OnboardingContext>) {
        let provider = provider();
        let onboarding = provider
            .get_onboarding(steps::SHOP_SETUP, Arc::clone(ctx))
            .unwrap();
        while let Some(step) = onboarding.current_step().unwrap() {
            if step.can_skip().unwrap() {
                step.skip().unwrap();
            } else {
                let data: FormData = [("name", "Corner Store"), ("currency", "USD"), ("price", "5")]
                    .into_iter()
                    .collect();
                let validated = step.validate_input(&data).unwrap();
                step.save(validated).unwrap();
            }
        }
    }

    #[test]
    fn test_empty_process_id_is_configuration_error() {
        let err = OnboardingGate::new("", Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, OnboardingError::Configuration(_)));
    }

    #[test]
    fn test_redirects_admin_view_while_pending() {
        let gate = OnboardingGate::new(steps::SHOP_SETUP, Vec::<String>::new()).unwrap();
        let decision = gate
            .check(&RequestInfo::admin("product.list"), &provider(), context())
            .unwrap();
        assert_eq!(decision, redirect());
    }

    #[test]
    fn test_allowed_and_ignored_views_pass() {
        let gate = OnboardingGate::new(steps::SHOP_SETUP, ["admin:reports.sales"]).unwrap();
        let provider = provider();

        for view in ["login", "menu_toggle", ONBOARDING_ROUTE, "reports.sales"] {
            let decision = gate
                .check(&RequestInfo::admin(view), &provider, context())
                .unwrap();
            assert_eq!(decision, GateDecision::Pass, "view {view}");
        }
    }

    #[test]
    fn test_ignore_views_match_namespaced_names_only() {
        let gate = OnboardingGate::new(steps::SHOP_SETUP, ["reports.sales"]).unwrap();
        let decision = gate
            .check(&RequestInfo::admin("reports.sales"), &provider(), context())
            .unwrap();
        assert_eq!(decision, redirect());
    }

    #[test]
    fn test_qualified_view() {
        assert_eq!(
            RequestInfo::admin("product.list").qualified_view().as_deref(),
            Some("admin:product.list")
        );
        assert_eq!(RequestInfo::default().qualified_view(), None);
    }

    #[test]
    fn test_anonymous_and_non_admin_requests_pass() {
        let gate = OnboardingGate::new(steps::SHOP_SETUP, Vec::<String>::new()).unwrap();
        let provider = provider();

        let anonymous = RequestInfo {
            authenticated: false,
            ..RequestInfo::admin("product.list")
        };
        let storefront = RequestInfo {
            app_name: Some("shop".to_string()),
            ..RequestInfo::admin("product.list")
        };
        let unresolved = RequestInfo {
            view_name: None,
            ..RequestInfo::admin("product.list")
        };

        for request in [anonymous, storefront, unresolved] {
            assert_eq!(
                gate.check(&request, &provider, context()).unwrap(),
                GateDecision::Pass
            );
        }
    }

    #[test]
    fn test_passes_once_onboarding_complete() {
        let gate = OnboardingGate::new(steps::SHOP_SETUP, Vec::<String>::new()).unwrap();
        let ctx = context();
        complete_onboarding(&ctx);

        let decision = gate
            .check(&RequestInfo::admin("product.list"), &provider(), ctx)
            .unwrap();
        assert_eq!(decision, GateDecision::Pass);
    }

    #[test]
    fn test_redirects_again_after_undo() {
        let gate = OnboardingGate::new(steps::SHOP_SETUP, Vec::<String>::new()).unwrap();
        let ctx = context();
        complete_onboarding(&ctx);

        ShopDetailsStep::new(Arc::clone(&ctx)).undo().unwrap();

        let decision = gate
            .check(&RequestInfo::admin("product.list"), &provider(), ctx)
            .unwrap();
        assert_eq!(decision, redirect());
    }
}
