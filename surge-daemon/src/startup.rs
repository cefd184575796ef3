#![forbid(unsafe_code)]

//! Process bootstrap shared by the binary and its tests.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use surge_core::{GeneratorConfig, SourceConfig};
use tokio::task::JoinHandle;
use tracing::{error, warn};

use crate::orchestrator::SourceOrchestrator;

/// Tracing filter used when `RUST_LOG` is unset: CLI level, then config `log_level`,
/// then `debug` for a positive `debug_level`, else `info`.
pub fn log_filter(cfg: &GeneratorConfig, cli_level: Option<&str>) -> String {
    cli_level
        .map(str::to_string)
        .or_else(|| cfg.log_level.clone())
        .unwrap_or_else(|| (if cfg.debug_level > 0 { "debug" } else { "info" }).to_string())
}

/// Parse the config file, apply overrides, install logging, then validate.
///
/// `install_logging` runs before validation so its warnings reach the subscriber it installs.
/// Whatever it returns (a subscriber guard, typically) is handed back to the caller.
pub fn load_config<P, G, F>(
    path: P,
    report_interval_secs: Option<u64>,
    install_logging: F,
) -> Result<(GeneratorConfig, G)>
where
    P: AsRef<Path>,
    F: FnOnce(&GeneratorConfig) -> G,
{
    let path = path.as_ref();
    let mut cfg = GeneratorConfig::from_file(path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;
    if let Some(secs) = report_interval_secs {
        cfg.report_interval_secs = secs;
    }
    let guard = install_logging(&cfg);
    cfg.validate().with_context(|| format!("invalid configuration in {}", path.display()))?;
    Ok((cfg, guard))
}

/// Build one orchestrator per source on the blocking pool, since resolving spoofed host
/// names uses the system resolver.
pub async fn build_orchestrators(
    sources: &[SourceConfig],
    verbosity: i32,
) -> Result<Vec<SourceOrchestrator>> {
    let mut out = Vec::with_capacity(sources.len());
    for source in sources.iter().cloned() {
        let name = source.name.clone();
        let orchestrator =
            tokio::task::spawn_blocking(move || SourceOrchestrator::new(source, verbosity))
                .await
                .with_context(|| format!("initializing source '{name}'"))?;
        out.push(orchestrator);
    }
    Ok(out)
}

/// Wait up to `grace` for each named source task. Panicked and overdue tasks are logged;
/// returns how many of them there were.
pub async fn join_sources(tasks: Vec<(String, JoinHandle<()>)>, grace: Duration) -> usize {
    let mut failed = 0;
    for (name, task) in tasks {
        match tokio::time::timeout(grace, task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(source = %name, "source task failed: {e}");
                failed += 1;
            }
            Err(_) => {
                warn!(source = %name, "source did not stop within {grace:?}");
                failed += 1;
            }
        }
    }
    failed
}
