//! Reconciliation report binary
//!
//! Usage: `recon-report [CONFIG_PATH]`

use anyhow::Context;
use reconciliation_engine::io::{load_db_records, load_onchain_records, write_report};
use reconciliation_engine::{Config, Metrics, Reconciler};

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("loading config from {}", path))?
            .with_env_overrides()?,
        None => Config::from_env()?,
    };

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        "Starting reconciliation report"
    );

    let db_records = load_db_records(&config.db_records_path)
        .with_context(|| format!("reading {}", config.db_records_path.display()))?;
    let onchain_records = load_onchain_records(&config.onchain_records_path)
        .with_context(|| format!("reading {}", config.onchain_records_path.display()))?;

    let reconciler = Reconciler::new(config.reconciler.clone())?.with_metrics(Metrics::new()?);
    let report = reconciler.run(&db_records, &onchain_records)?;

    let written = write_report(&report, reconciler.metrics(), &config.output_dir)
        .with_context(|| format!("writing report to {}", config.output_dir.display()))?;

    for path in &written {
        tracing::info!(path = %path.display(), "Report file written");
    }

    println!(
        "{} records, {} matched, {} anomalies ({:.2}% match rate)",
        report.summary.total_records,
        report.summary.matched,
        report.summary.anomalies,
        report.summary.match_rate
    );

    Ok(())
}
