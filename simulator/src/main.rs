//! SimpleBank Simulator
//!
//! Drives concurrent transfers against a live ledger and checks that balances
//! still agree with the entry journal afterwards.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;
use tracing::{error, info, info_span, Instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use simplebank_coordinator::{
    CoordinatorConfig, LogFormat, Metrics, MetricsSnapshot, TransferCoordinator,
};
use simplebank_ledger::Store;

mod bank;
mod controller;
mod metrics;
mod scenario;

use bank::SimulatedAccount;
use controller::{SimulationConfig, SimulationController, Verification};
use metrics::MetricsReport;
use scenario::Scenario;

/// SimpleBank Simulator CLI
#[derive(Parser, Debug)]
#[command(name = "simulator")]
#[command(about = "SimpleBank concurrent transfer simulator")]
struct Args {
    /// Number of random accounts to create
    #[arg(short, long, default_value = "2")]
    accounts: usize,

    /// Scenario to run: same-direction, deadlock or random-mesh
    #[arg(short, long, default_value = "same-direction")]
    scenario: String,

    /// Number of transfers to issue
    #[arg(short, long, default_value = "10")]
    transfers: usize,

    /// Amount moved by each transfer
    #[arg(long, default_value = "10")]
    amount: i64,

    /// Transfers in flight at once
    #[arg(short, long, default_value = "4")]
    concurrency: usize,

    /// Retries after a serialization failure or deadlock
    #[arg(long, default_value = "3")]
    max_retries: u32,

    /// Base retry backoff in milliseconds
    #[arg(long, default_value = "50")]
    retry_backoff_ms: u64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Print coordinator metrics in Prometheus text format
    #[arg(long)]
    prometheus: bool,

    /// Settings file; environment variables override its values
    #[arg(long, default_value = "app.env")]
    config: PathBuf,
}

/// Everything reported at the end of a run.
#[derive(Debug, Serialize)]
struct SimulationReport {
    run_id: Uuid,
    scenario: Scenario,
    seed: Option<u64>,
    accounts: Vec<SimulatedAccount>,
    metrics: MetricsReport,
    coordinator: MetricsSnapshot,
    verification: Verification,
    passed: bool,
}

fn init_tracing(config: &CoordinatorConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = CoordinatorConfig::load(&args.config)?;
    init_tracing(&config);

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    let scenario = Scenario::load(&args.scenario)?;
    if args.amount <= 0 {
        return Err(anyhow::anyhow!("Amount must be positive, got {}", args.amount));
    }

    let run_id = Uuid::now_v7();
    info!(run_id = %run_id, scenario = scenario.name(), "Starting SimpleBank Simulator");

    let store = Store::connect(&config.store).await?;
    store.health_check().await?;
    store.ensure_schema().await?;

    let metrics = Arc::new(Metrics::new());
    let coordinator = TransferCoordinator::with_metrics(store, metrics.clone());

    let sim_config = SimulationConfig {
        accounts: args.accounts,
        transfers: args.transfers,
        amount: args.amount,
        concurrency: args.concurrency,
        max_retries: args.max_retries,
        retry_backoff: Duration::from_millis(args.retry_backoff_ms),
    };
    let mut controller = SimulationController::new(coordinator, sim_config, args.seed);

    let verification = async {
        controller.initialize().await?;
        controller.run_scenario(scenario).await?;
        controller.verify().await
    }
    .instrument(info_span!("simulation", run_id = %run_id))
    .await?;

    let elapsed = controller.elapsed().as_secs_f64();
    let report = SimulationReport {
        run_id,
        scenario,
        seed: args.seed,
        accounts: controller.accounts().to_vec(),
        metrics: controller.metrics().report(elapsed),
        coordinator: metrics.snapshot(),
        passed: verification.passed(),
        verification,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        info!("Simulation complete");
        info!("Total transfers: {}", report.metrics.total);
        info!("Committed: {}", report.metrics.committed);
        info!("Failed: {}", report.metrics.failed);
        info!("Retries: {}", report.metrics.retries);
        info!("Average latency: {}ms", report.metrics.average_latency_ms);
        info!("p99 latency: {}ms", report.metrics.p99_latency_ms);
        info!(
            initial_total = report.verification.initial_total,
            final_total = report.verification.final_total,
            passed = report.passed,
            "Verification"
        );
    }

    if args.prometheus {
        print!("{}", metrics.to_prometheus());
    }

    if !report.passed {
        return Err(anyhow::anyhow!("Ledger verification failed for run {}", run_id));
    }

    Ok(())
}
