//! Burstcheck CLI
//!
//! Loads shaped bursts of synthetic log events into Elasticsearch so that a
//! frequency alerting rule can be exercised end to end.
//!
//! # Usage
//!
//! ```bash
//! burstcheck --help
//! burstcheck health
//! burstcheck populate
//! burstcheck burst --count 20 --settle-secs 45
//! burstcheck populate --dry-run --seed 7
//! ```

#![deny(unsafe_code)]

use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};
use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::generator::schedule;
use shared::models::{BurstSpec, Distribution, LevelMix, DEFAULT_SERVICE};
use shared::run::{BurstPlan, BurstRunner, RunReport};
use shared::store::{bulk_body, ElasticsearchStore, SearchStore};
use shared::submitter::{ReadinessPolicy, TokioSleeper};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Burstcheck - synthetic log bursts for alert rule testing
#[derive(Parser)]
#[command(name = "burstcheck")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Elasticsearch base URL
    #[arg(
        short,
        long,
        global = true,
        env = "BURSTCHECK_ES_URL",
        default_value = shared::store::elasticsearch::DEFAULT_URL
    )]
    es_url: String,

    /// Maximum number of readiness checks before giving up
    #[arg(long, global = true, env = "BURSTCHECK_MAX_ATTEMPTS", default_value_t = 30)]
    max_attempts: u32,

    /// Seconds to wait between readiness checks
    #[arg(long, global = true, env = "BURSTCHECK_RETRY_DELAY_SECS", default_value_t = 2)]
    retry_delay_secs: u64,

    /// Seed for reproducible bursts
    #[arg(long, global = true, env = "BURSTCHECK_SEED")]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether the store accepts writes
    Health,
    /// Back-fill the last minute with evenly spaced errors and verify them
    Populate(ScenarioArgs),
    /// Send a random error burst starting now and check the alert threshold
    Burst(ScenarioArgs),
}

/// Overrides shared by both scenarios.
#[derive(Args, Debug, Default)]
struct ScenarioArgs {
    /// Number of events
    #[arg(long)]
    count: Option<usize>,

    /// Window length in seconds
    #[arg(long)]
    window_secs: Option<i64>,

    /// Timestamp distribution: uniform or random
    #[arg(long)]
    distribution: Option<Distribution>,

    /// Event level: info, warning, error or mixed
    #[arg(long)]
    level: Option<LevelMix>,

    /// Service name stamped on every event
    #[arg(long, env = "BURSTCHECK_SERVICE", default_value = DEFAULT_SERVICE)]
    service: String,

    /// Seconds to wait before verification
    #[arg(long)]
    settle_secs: Option<u64>,

    /// Minimum count verification expects
    #[arg(long)]
    expect: Option<u64>,

    /// Print the bulk body instead of contacting the store
    #[arg(long)]
    dry_run: bool,
}

impl ScenarioArgs {
    /// Applies the overrides to a preset plan.
    fn apply(&self, plan: BurstPlan, anchored_at_end: bool) -> Result<BurstPlan> {
        let base = &plan.spec;
        let count = self.count.unwrap_or(base.count);
        let length = match self.window_secs {
            Some(secs) => Duration::try_seconds(secs)
                .with_context(|| format!("window of {secs} seconds is out of range"))?,
            None => base.window_length(),
        };

        let spec = if anchored_at_end {
            BurstSpec::ending_at(count, base.window_end, length)
        } else {
            BurstSpec::starting_at(count, base.window_start, length)
        }
        .with_distribution(self.distribution.unwrap_or(base.distribution))
        .with_level(self.level.unwrap_or(base.level))
        .with_service(self.service.clone());
        spec.validate_spec()?;

        let settle = self
            .settle_secs
            .map_or(plan.settle, std::time::Duration::from_secs);
        let expected = self.expect.or(plan.expected_minimum);

        Ok(plan
            .with_spec(spec)
            .with_settle(settle)
            .with_expected_minimum(expected))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let now = Utc::now();
    match cli.command {
        Some(Commands::Health) => health(&cli.es_url).await,
        Some(Commands::Populate(ref args)) => {
            let plan = args.apply(BurstPlan::populate(now), true)?;
            scenario(&cli, &plan, args.dry_run, &mut rng).await
        }
        Some(Commands::Burst(ref args)) => {
            let plan = args.apply(BurstPlan::burst(now), false)?;
            scenario(&cli, &plan, args.dry_run, &mut rng).await
        }
        None => {
            println!("Burstcheck v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for usage information");
            Ok(())
        }
    }
}

/// Performs a single readiness check.
async fn health(es_url: &str) -> Result<()> {
    let store = ElasticsearchStore::new(es_url)?;
    let status = store
        .cluster_health()
        .await
        .with_context(|| format!("Elasticsearch at {es_url} is unreachable"))?;

    println!("Elasticsearch at {es_url}: {status}");
    if !status.is_ready() {
        bail!("cluster status {status} does not accept writes");
    }
    Ok(())
}

async fn scenario(cli: &Cli, plan: &BurstPlan, dry_run: bool, rng: &mut StdRng) -> Result<()> {
    if dry_run {
        let events = schedule(&plan.spec, rng)?;
        print!("{}", bulk_body(&events)?);
        return Ok(());
    }

    tracing::info!(es_url = %cli.es_url, index_target = %plan.target(), "Running scenario");
    let store = ElasticsearchStore::new(cli.es_url.clone())?;
    let policy = ReadinessPolicy::new(
        cli.max_attempts,
        std::time::Duration::from_secs(cli.retry_delay_secs),
    );
    let runner = BurstRunner::new(Arc::new(store), Arc::new(TokioSleeper), policy);

    let report = runner.run(plan, rng).await?;
    println!("{}", summarize(plan, &report));
    Ok(())
}

/// Renders the human-readable run summary.
fn summarize(plan: &BurstPlan, report: &RunReport) -> String {
    let mut lines = vec![format!(
        "Indexed {} events into {} ({} ms)",
        report.ack.indexed, report.target, report.ack.took_ms
    )];

    match &report.verification {
        Some(v) => {
            let scope = plan
                .verify_level
                .map_or_else(|| "documents".to_string(), |l| format!("{l} documents"));
            lines.push(format!(
                "Found {} {scope}, expected at least {}: {}",
                v.actual_count,
                v.expected_minimum,
                if v.matched { "OK" } else { "SHORT" }
            ));
            for event in &v.sample {
                lines.push(format!(
                    "  {} [{}] {} ({})",
                    event.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                    event.level,
                    event.message,
                    event.status_code
                ));
            }
        }
        None => lines.push("Verification unavailable".to_string()),
    }

    lines.join("\n")
}
