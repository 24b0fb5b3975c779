//! facturas-load - constant-arrival-rate load test for the invoices API

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use facturas_load::scenario::parse_duration;
use facturas_load::summary::running_in_github_actions;
use facturas_load::{Executor, LoadScenario, Summary, THRESHOLDS_FAILED_EXIT_CODE};

/// Load test the invoices search endpoint at a constant arrival rate
#[derive(Parser)]
#[command(name = "facturas-load")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Scenario file (YAML); flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API base URL
    #[arg(long, env = "API_BASE_URL")]
    base_url: Option<String>,

    /// Value for the Authorization header
    #[arg(long, env = "AUTH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Path and query appended to the base URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Iterations started per time unit
    #[arg(long)]
    rate: Option<u32>,

    /// Time unit for the rate (e.g. 1s)
    #[arg(long, value_parser = parse_duration)]
    time_unit: Option<Duration>,

    /// Test duration (e.g. 30s)
    #[arg(short, long, value_parser = parse_duration)]
    duration: Option<Duration>,

    #[arg(long)]
    pre_allocated_vus: Option<usize>,

    #[arg(long)]
    max_vus: Option<usize>,

    /// Pause after each request (e.g. 300ms)
    #[arg(long, value_parser = parse_duration)]
    think_time: Option<Duration>,

    /// Grace period for in-flight iterations after the duration
    #[arg(long, value_parser = parse_duration)]
    graceful_stop: Option<Duration>,

    /// HTML report path
    #[arg(long, default_value = "report.html")]
    report: PathBuf,

    /// Skip the HTML report
    #[arg(long)]
    no_report: bool,

    /// Also write the summary as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn scenario(&self) -> anyhow::Result<LoadScenario> {
        let mut scenario = match &self.config {
            Some(path) => LoadScenario::from_yaml_file(path)
                .with_context(|| format!("reading scenario file {}", path.display()))?,
            None => LoadScenario::default(),
        };

        if let Some(v) = &self.base_url {
            scenario.base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = &self.token {
            scenario.token = v.clone();
        }
        if let Some(v) = &self.endpoint {
            scenario.endpoint = v.clone();
        }
        if let Some(v) = self.rate {
            scenario.rate = v;
        }
        if let Some(v) = self.time_unit {
            scenario.time_unit = v;
        }
        if let Some(v) = self.duration {
            scenario.duration = v;
        }
        if let Some(v) = self.pre_allocated_vus {
            scenario.pre_allocated_vus = v;
        }
        if let Some(v) = self.max_vus {
            scenario.max_vus = v;
        }
        if let Some(v) = self.think_time {
            scenario.think_time = v;
        }
        if let Some(v) = self.graceful_stop {
            scenario.graceful_stop = v;
        }
        Ok(scenario)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env values feed the env fallbacks of the flags
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let scenario = cli.scenario()?;
    let executor = Executor::new(scenario).context("invalid load scenario")?;
    let outcome = executor.run().await;
    let summary = Summary::new(executor.scenario(), &outcome);

    print!("{}", summary.render_console());
    println!("{}", summary.render_checks_table());
    if running_in_github_actions() {
        print!("{}", summary.render_github());
    }

    if !cli.no_report {
        let command = std::env::args().collect::<Vec<_>>().join(" ");
        summary
            .write_html(&cli.report, &command)
            .with_context(|| format!("writing {}", cli.report.display()))?;
        info!("HTML report written to {}", cli.report.display());
    }
    if let Some(path) = &cli.json {
        summary
            .write_json(path)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("JSON summary written to {}", path.display());
    }

    if !summary.thresholds_passed {
        for threshold in summary.thresholds.iter().filter(|t| !t.passed) {
            tracing::error!(
                metric = threshold.metric,
                expression = %threshold.expression,
                observed = ?threshold.observed,
                "Threshold crossed"
            );
        }
        std::process::exit(THRESHOLDS_FAILED_EXIT_CODE);
    }

    Ok(())
}
