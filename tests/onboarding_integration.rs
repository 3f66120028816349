//! End-to-end onboarding flows against a file-backed session
//!
//! Each test reopens the session file between "requests" the way the admin
//! panel rebuilds the sequencer on every request.

use std::path::Path;
use std::sync::Arc;

use onboarding::config::OnboardingSettings;
use onboarding::steps::{self, SHOP_SETUP};
use onboarding::{
    FileSession, FormData, GateDecision, OnboardingContext, OnboardingGate, OnboardingProvider,
    OnboardingStorage, OnboardingWizard, ProviderTable, RequestInfo, Sequencer, SessionStorage,
    StepRegistry, SuccessUrl, WizardAction, WizardOutcome,
};
use tempfile::TempDir;

fn provider(settings: &OnboardingSettings) -> Arc<dyn OnboardingProvider> {
    let mut registry = StepRegistry::new();
    steps::register_defaults(&mut registry);
    ProviderTable::with_defaults(Arc::new(registry), settings)
        .from_settings(settings)
        .unwrap()
}

fn context(session_path: &Path, process_id: &str) -> Arc<OnboardingContext> {
    let session = FileSession::open(session_path).unwrap();
    let storage = SessionStorage::new(process_id, Arc::new(session)).unwrap();
    Arc::new(OnboardingContext::new(Arc::new(storage)).with_user("admin"))
}

fn load(session_path: &Path) -> Box<dyn Sequencer> {
    provider(&OnboardingSettings::default())
        .get_onboarding(SHOP_SETUP, context(session_path, SHOP_SETUP))
        .unwrap()
}

fn form(pairs: &[(&str, &str)]) -> WizardAction {
    WizardAction::Submit(pairs.iter().copied().collect::<FormData>())
}

fn current(session_path: &Path) -> Option<String> {
    load(session_path)
        .current_step()
        .unwrap()
        .map(|step| step.identifier().to_string())
}

#[test]
fn test_progress_survives_reload() {
    let dir = TempDir::new().unwrap();
    let session = dir.path().join("session.json");

    let wizard = OnboardingWizard::new(load(&session));
    wizard
        .handle(form(&[("name", "Corner Store"), ("currency", "EUR")]))
        .unwrap();
    wizard.handle(WizardAction::Skip).unwrap();

    assert_eq!(current(&session).as_deref(), Some("shipping"));

    let onboarding = load(&session);
    let visible: Vec<&str> = onboarding
        .visible_steps()
        .unwrap()
        .into_iter()
        .map(|step| step.identifier())
        .collect();
    assert_eq!(
        visible,
        ["shop_details", "payment_method", "shipping", "first_product"]
    );
}

#[test]
fn test_complete_flow_then_finish_resets_everything() {
    let dir = TempDir::new().unwrap();
    let session = dir.path().join("session.json");

    let wizard = OnboardingWizard::new(load(&session));
    wizard
        .handle(form(&[("name", "Corner Store"), ("currency", "USD")]))
        .unwrap();
    wizard
        .handle(form(&[("provider", "stripe"), ("sandbox", "yes")]))
        .unwrap();
    wizard
        .handle(form(&[("carrier", "DHL"), ("flat_rate", "4.90")]))
        .unwrap();
    let outcome = wizard
        .handle(form(&[("name", "Mug"), ("price", "12.50")]))
        .unwrap();
    assert_eq!(
        outcome,
        WizardOutcome::Complete {
            success: SuccessUrl::default()
        }
    );
    assert_eq!(current(&session), None);

    wizard.sequencer().finish().unwrap();

    let onboarding = load(&session);
    for step in onboarding.steps() {
        assert!(!step.is_done().unwrap(), "{} still done", step.identifier());
        assert!(!step.was_skipped().unwrap());
    }
    assert_eq!(current(&session).as_deref(), Some("shop_details"));
    // first product is hidden again until the shop exists
    assert_eq!(onboarding.visible_steps().unwrap().len(), 3);
}

#[test]
fn test_processes_do_not_share_state() {
    let dir = TempDir::new().unwrap();
    let session = dir.path().join("session.json");

    let wizard = OnboardingWizard::new(load(&session));
    wizard
        .handle(form(&[("name", "Corner Store"), ("currency", "USD")]))
        .unwrap();

    let other = context(&session, "supplier_setup");
    assert!(other.storage().keys().unwrap().is_empty());
    assert!(!other.storage().contains("shop_details_done").unwrap());

    // unregistered processes have nothing to do
    let onboarding = provider(&OnboardingSettings::default())
        .get_onboarding("supplier_setup", other)
        .unwrap();
    assert!(onboarding.steps().is_empty());
    assert!(onboarding.current_step().unwrap().is_none());
}

#[test]
fn test_gate_follows_wizard_progress() {
    let dir = TempDir::new().unwrap();
    let session = dir.path().join("session.json");
    let settings = OnboardingSettings::default();
    let gate = OnboardingGate::new(SHOP_SETUP, settings.middleware_ignore_views.clone()).unwrap();
    let request = RequestInfo::admin("order.list");

    let decision = gate
        .check(&request, provider(&settings).as_ref(), context(&session, SHOP_SETUP))
        .unwrap();
    assert_eq!(
        decision,
        GateDecision::Redirect {
            process_id: SHOP_SETUP.to_string()
        }
    );

    let wizard = OnboardingWizard::new(load(&session));
    wizard
        .handle(form(&[("name", "Corner Store"), ("currency", "GBP")]))
        .unwrap();
    wizard.handle(WizardAction::Skip).unwrap();
    wizard.handle(WizardAction::Skip).unwrap();
    wizard
        .handle(form(&[("name", "Mug"), ("price", "3")]))
        .unwrap();

    let decision = gate
        .check(&request, provider(&settings).as_ref(), context(&session, SHOP_SETUP))
        .unwrap();
    assert_eq!(decision, GateDecision::Pass);
}

#[test]
fn test_configured_success_url_is_returned() {
    let dir = TempDir::new().unwrap();
    let session = dir.path().join("session.json");
    let settings = OnboardingSettings {
        default_success_url: SuccessUrl::WithParams {
            route: "admin:shop.edit".to_string(),
            params: [("pk".to_string(), "1".to_string())].into_iter().collect(),
        },
        ..OnboardingSettings::default()
    };

    let onboarding = provider(&settings)
        .get_onboarding(SHOP_SETUP, context(&session, SHOP_SETUP))
        .unwrap();
    assert_eq!(onboarding.success_url().route(), "admin:shop.edit");
    assert_eq!(onboarding.success_url().to_string(), "admin:shop.edit (pk=1)");
}

#[test]
fn test_unknown_provider_is_configuration_error() {
    let settings = OnboardingSettings {
        provider: "custom".to_string(),
        ..OnboardingSettings::default()
    };
    let mut registry = StepRegistry::new();
    steps::register_defaults(&mut registry);

    let err = ProviderTable::with_defaults(Arc::new(registry), &settings)
        .from_settings(&settings)
        .err()
        .unwrap();
    assert!(matches!(err, onboarding::OnboardingError::Configuration(_)));
}

#[test]
fn test_gate_honours_configured_ignore_views() {
    let dir = TempDir::new().unwrap();
    let session = dir.path().join("session.json");
    let settings = OnboardingSettings {
        middleware_ignore_views: vec!["admin:reports.sales".to_string()],
        ..OnboardingSettings::default()
    };
    let gate = OnboardingGate::new(SHOP_SETUP, settings.middleware_ignore_views.clone()).unwrap();
    let provider = provider(&settings);

    let ignored = gate
        .check(
            &RequestInfo::admin("reports.sales"),
            provider.as_ref(),
            context(&session, SHOP_SETUP),
        )
        .unwrap();
    assert_eq!(ignored, GateDecision::Pass);

    let other = gate
        .check(
            &RequestInfo::admin("reports.stock"),
            provider.as_ref(),
            context(&session, SHOP_SETUP),
        )
        .unwrap();
    assert!(matches!(other, GateDecision::Redirect { .. }));
}
