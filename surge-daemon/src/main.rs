#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use surge_core::GeneratorConfig;
use surge_daemon::{build_orchestrators, join_sources, load_config, log_filter, run_reporter};

const DEFAULT_CONFIG: &str = "contentDescriptors.json";

#[derive(Parser)]
#[command(author, version, about = "Stochastic bursty UDP traffic generator", long_about = None)]
struct Cli {
    /// Source descriptor file (.json or .toml)
    #[arg(short, long, env = "SURGE_CONFIG", default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Seconds between status listings, overriding the config file
    #[arg(short, long)]
    report_interval: Option<u64>,

    /// Tracing filter, overriding the config file (RUST_LOG still wins)
    #[arg(short, long)]
    log_level: Option<String>,
}

fn init_tracing(cfg: &GeneratorConfig, cli_level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_filter(cfg, cli_level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (cfg, ()) = load_config(&cli.config, cli.report_interval, |cfg| {
        init_tracing(cfg, cli.log_level.as_deref());
    })?;
    info!(sources = cfg.sources.len(), config = %cli.config.display(), "surge generator starting");

    let mut handles = Vec::with_capacity(cfg.sources.len());
    let mut tasks = Vec::with_capacity(cfg.sources.len());
    for orchestrator in build_orchestrators(&cfg.sources, cfg.debug_level).await? {
        handles.push(orchestrator.handle());
        tasks.push(tokio::spawn(orchestrator.run()));
    }
    let reporter = tokio::spawn(run_reporter(handles.clone(), cfg.report_interval()));

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    info!("shutdown requested, stopping sources");
    for handle in &handles {
        handle.stop();
    }
    let named = handles.iter().map(|h| h.name().to_string()).zip(tasks).collect();
    let failed = join_sources(named, Duration::from_secs(5)).await;
    if failed > 0 {
        warn!(failed, "some sources did not shut down cleanly");
    }
    reporter.abort();

    for handle in &handles {
        info!(source = %handle.name(), packets = handle.packets_sent(), "final count");
    }
    Ok(())
}
