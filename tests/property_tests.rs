//! Property-based tests for the experiment engine
//!
//! - Control is authoritative for every input
//! - Verdicts and counters follow from values alone
//! - Sync and async modes agree
//! - Run with ProptestConfig::with_cases(100)

use crossbeam::channel;
use proptest::prelude::*;
use scientist::{
    Experiment, ExperimentResult, InMemoryMetricsProvider, Publisher, RunError,
};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

/// One leg's behavior: a value or an error message
fn arb_leg() -> impl Strategy<Value = Result<i64, String>> {
    prop_oneof![
        3 => any::<i64>().prop_map(Ok),
        1 => "[a-z]{1,12}".prop_map(Err),
    ]
}

fn experiment(
    raise: bool,
    async_mode: bool,
    metrics: &Arc<InMemoryMetricsProvider>,
) -> Experiment<i64, i64, String> {
    Experiment::builder()
        .name("prop")
        .raise_on_mismatch(raise)
        .async_mode(async_mode)
        .metrics(metrics.clone())
        .build()
        .unwrap()
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: non-raising runs always hand back control's outcome
    #[test]
    fn prop_control_is_authoritative(control in arb_leg(), candidate in arb_leg()) {
        let metrics = Arc::new(InMemoryMetricsProvider::new());
        let exp = experiment(false, false, &metrics);

        let (c, d) = (control.clone(), candidate.clone());
        let outcome = exp.run(move || c, move || d);

        match (control, outcome) {
            (Ok(expected), Ok(actual)) => prop_assert_eq!(expected, actual),
            (Err(expected), Err(RunError::Control(actual))) => prop_assert_eq!(expected, actual),
            (expected, actual) => prop_assert!(false, "control {:?} but run gave {:?}", expected, actual),
        }
    }

    /// Property: counters move by exactly one per compared run
    #[test]
    fn prop_counters_follow_values(control in any::<i64>(), candidate in arb_leg()) {
        let metrics = Arc::new(InMemoryMetricsProvider::new());
        let exp = experiment(false, false, &metrics);

        let d = candidate.clone();
        prop_assert_eq!(exp.run(move || Ok(control), move || d).unwrap(), control);

        let mismatched = candidate.as_ref().map_or(true, |value| *value != control);
        prop_assert_eq!(metrics.counter_value("scientist.prop.total"), 1);
        prop_assert_eq!(metrics.counter_value("scientist.prop.mismatch"), u64::from(mismatched));
        prop_assert_eq!(
            metrics.counter_value("scientist.prop.candidate.exception"),
            u64::from(candidate.is_err())
        );
    }

    /// Property: raising runs fail exactly when the legs disagree
    #[test]
    fn prop_raise_iff_mismatch(control in any::<i64>(), candidate in arb_leg()) {
        let metrics = Arc::new(InMemoryMetricsProvider::new());
        let exp = experiment(true, false, &metrics);

        let d = candidate.clone();
        let outcome = exp.run(move || Ok(control), move || d);

        let agrees = candidate == Ok(control);
        prop_assert_eq!(outcome.is_ok(), agrees);
        if !agrees {
            prop_assert!(outcome.unwrap_err().is_mismatch());
        }
    }

    /// Property: sync and async modes return the same value and verdict
    #[test]
    fn prop_sync_async_equivalent(control in any::<i64>(), candidate in arb_leg()) {
        let mut verdicts = Vec::new();
        let mut values = Vec::new();

        for async_mode in [false, true] {
            let (tx, rx) = channel::bounded(1);
            let exp: Experiment<i64, i64, String> = Experiment::builder()
                .name("prop-modes")
                .async_mode(async_mode)
                .pool_size(1)
                .metrics(Arc::new(InMemoryMetricsProvider::new()))
                .publisher(Publisher::new(move |result: &ExperimentResult<i64, i64, String>| {
                    let _ = tx.send(result.matched());
                    Ok(())
                }))
                .build()
                .unwrap();

            let d = candidate.clone();
            values.push(exp.run(move || Ok(control), move || d).unwrap());
            verdicts.push(rx.recv_timeout(Duration::from_secs(5)).unwrap());
        }

        prop_assert_eq!(values[0], values[1]);
        prop_assert_eq!(verdicts[0], verdicts[1]);
        prop_assert_eq!(verdicts[0], Some(candidate == Ok(control)));
    }

    /// Property: compare is pure; repeated calls agree and count each time
    #[test]
    fn prop_compare_is_repeatable(control in any::<i64>(), candidate in any::<i64>(), calls in 1usize..5) {
        use scientist::{Observation, Outcome};

        let metrics = Arc::new(InMemoryMetricsProvider::new());
        let exp = experiment(false, false, &metrics);
        let control_obs: Observation<i64, String> =
            Observation::new("control", Outcome::Value(control), Duration::ZERO);
        let candidate_obs: Observation<i64, String> =
            Observation::new("candidate", Outcome::Value(candidate), Duration::ZERO);

        let first = exp.compare(&control_obs, &candidate_obs).is_ok();
        for _ in 1..calls {
            prop_assert_eq!(exp.compare(&control_obs, &candidate_obs).is_ok(), first);
        }

        prop_assert_eq!(first, control == candidate);
        prop_assert_eq!(metrics.counter_value("scientist.prop.total"), calls as u64);
        prop_assert_eq!(
            metrics.counter_value("scientist.prop.mismatch"),
            if first { 0 } else { calls as u64 }
        );
    }
}
