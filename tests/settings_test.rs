//! Building experiments from serialized settings

use scientist::{Experiment, ExperimentSettings, InMemoryMetricsProvider, RunOrder};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

const SETTINGS: &str = r#"{
    "name": "checkout-pricing",
    "raise_on_mismatch": true,
    "async_mode": true,
    "pool_size": 3,
    "order": "candidate_first",
    "context": { "team": "payments", "rollout": 0.05 }
}"#;

#[test]
fn test_settings_drive_experiment() {
    let settings = ExperimentSettings::from_json(SETTINGS).unwrap();
    let metrics = Arc::new(InMemoryMetricsProvider::new());

    let exp: Experiment<u32, u32, String> = Experiment::builder()
        .settings(&settings)
        .metrics(metrics.clone())
        .build()
        .unwrap();

    assert_eq!(exp.name(), "checkout-pricing");
    assert!(exp.raise_on_mismatch());
    assert!(exp.is_async());
    assert_eq!(exp.pool().map(|pool| pool.threads()), Some(3));
    assert_eq!(exp.order(), RunOrder::CandidateFirst);
    assert_eq!(exp.context()["team"], "payments");

    assert_eq!(exp.run(|| Ok(1999), || Ok(1999)).unwrap(), 1999);
    assert_eq!(metrics.counter_value("scientist.checkout-pricing.total"), 1);
}

#[test]
fn test_disabled_settings_skip_candidate() {
    let settings = ExperimentSettings::from_json(r#"{"name": "off", "enabled": false}"#).unwrap();
    let metrics = Arc::new(InMemoryMetricsProvider::new());
    let exp: Experiment<u32, u32, String> = Experiment::builder()
        .settings(&settings)
        .metrics(metrics.clone())
        .build()
        .unwrap();

    let ran = Arc::new(AtomicBool::new(false));
    let seen = Arc::clone(&ran);
    exp.run(|| Ok(1), move || {
        seen.store(true, Ordering::SeqCst);
        Ok(2)
    })
    .unwrap();

    assert!(!ran.load(Ordering::SeqCst));
    assert_eq!(metrics.counter_value("scientist.off.total"), 0);
}

#[test]
fn test_builder_after_settings_overrides() {
    let settings = ExperimentSettings::from_json(SETTINGS).unwrap();
    let exp: Experiment<u32, u32, String> = Experiment::builder()
        .settings(&settings)
        .async_mode(false)
        .name("overridden")
        .metrics(Arc::new(InMemoryMetricsProvider::new()))
        .build()
        .unwrap();

    assert_eq!(exp.name(), "overridden");
    assert!(!exp.is_async());
    assert!(exp.pool().is_none());
}

#[test]
fn test_zero_pool_size_in_settings_rejected() {
    let settings = ExperimentSettings::from_json(r#"{"pool_size": 0}"#).unwrap();
    let result = Experiment::<u32>::builder().settings(&settings).build();
    assert!(matches!(result, Err(scientist::Error::InvalidConfig(_))));
}

#[test]
fn test_partial_settings_keep_builder_values() {
    let settings = ExperimentSettings::from_json(r#"{"raise_on_mismatch": false}"#).unwrap();
    let metrics = Arc::new(InMemoryMetricsProvider::new());
    let exp: Experiment<u32, u32, String> = Experiment::builder()
        .name("pricing")
        .order(RunOrder::ControlFirst)
        .enabled(|| false)
        .settings(&settings)
        .metrics(metrics.clone())
        .build()
        .unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let value = exp
        .run_sync(|| Ok(1), move || {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(1)
        })
        .unwrap();

    assert_eq!(value, 1);
    assert_eq!(exp.name(), "pricing");
    assert_eq!(exp.order(), RunOrder::ControlFirst);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(metrics.counter_value("scientist.pricing.total"), 0);
}

#[test]
fn test_enabled_true_in_settings_keeps_closed_gate() {
    let settings = ExperimentSettings::from_json(r#"{"enabled": true}"#).unwrap();
    let exp: Experiment<u32, u32, String> = Experiment::builder()
        .name("still-closed")
        .enabled(|| false)
        .settings(&settings)
        .metrics(Arc::new(InMemoryMetricsProvider::new()))
        .build()
        .unwrap();

    assert!(!exp.candidate_enabled());
}
