//! Refactor Verification: Shadowing a Rewrite in Production
//!
//! A legacy price calculator (control) stays authoritative while a rewrite
//! (candidate) runs alongside it on every request. Results are published
//! through `tracing`, and the mismatch counters tell us whether the rewrite
//! is ready to take over.
//!
//! Run with: RUST_LOG=scientist=debug cargo run --example refactor_verification

use scientist::{
    Comparator, Experiment, InMemoryMetricsProvider, Publisher, RunError,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq)]
struct Cents(i64);

/// Legacy implementation: integer cents, rounding down per line.
fn legacy_total(quantities: &[(i64, i64)]) -> anyhow::Result<Cents> {
    if quantities.is_empty() {
        anyhow::bail!("empty basket");
    }
    Ok(Cents(quantities.iter().map(|(qty, unit)| qty * unit).sum()))
}

/// Rewrite: floating-point dollars; subtly wrong for large baskets.
fn rewritten_total(quantities: &[(i64, i64)]) -> anyhow::Result<f64> {
    if quantities.iter().any(|(qty, _)| *qty > 100) {
        anyhow::bail!("bulk orders not supported yet");
    }
    #[allow(clippy::cast_precision_loss)]
    let dollars = quantities
        .iter()
        .map(|(qty, unit)| *qty as f64 * (*unit as f64 / 100.0))
        .sum::<f64>();
    Ok(dollars * 1.000_001)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== Scientist: Refactor Verification ===\n");

    let metrics = Arc::new(InMemoryMetricsProvider::new());
    #[allow(clippy::cast_possible_truncation)]
    let cents_match = Comparator::new(|control: &Cents, candidate: &f64| {
        (candidate * 100.0).round() as i64 == control.0
    });

    let experiment: Experiment<Cents, f64> = Experiment::builder_with(cents_match)
        .name("basket-total")
        .context_entry("service", serde_json::json!("checkout"))
        .metrics(metrics.clone())
        .publisher(Publisher::tracing())
        .build()?;

    let baskets: Vec<Vec<(i64, i64)>> = vec![
        vec![(1, 1999), (2, 450)],
        vec![(3, 99)],
        vec![(150, 25)],
        vec![(10_000, 1)],
        vec![],
    ];

    for basket in baskets {
        let control_basket = basket.clone();
        let candidate_basket = basket.clone();
        match experiment.run(
            move || legacy_total(&control_basket),
            move || rewritten_total(&candidate_basket),
        ) {
            Ok(total) => println!("  {basket:?} -> {total:?}"),
            Err(RunError::Control(err)) => println!("  {basket:?} -> control failed: {err}"),
            Err(err) => return Err(err.into()),
        }
    }

    println!("\n=== Counters ===");
    for (name, value) in metrics.counters() {
        println!("  {name}: {value}");
    }
    if let Some(control) = metrics.timer_snapshot("scientist.basket-total.control") {
        println!("  control mean: {:?}", control.mean());
    }

    Ok(())
}
