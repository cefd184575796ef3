#![forbid(unsafe_code)]

use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::info;

use crate::orchestrator::SourceHandle;

const RULE_WIDTH: usize = 70;

/// Plain-text listing of every source that has not been stopped.
pub fn render_status(sources: &[SourceHandle]) -> String {
    let alive: Vec<&SourceHandle> = sources.iter().filter(|s| !s.is_stopped()).collect();
    let mut lines =
        vec!["=".repeat(RULE_WIDTH), format!("{} content generators alive:", alive.len())];
    lines.extend(
        alive
            .into_iter()
            .map(|s| format!("{} - Total Packets Sent: {}", s.name(), s.packets_sent())),
    );
    lines.join("\n")
}

/// Log a status listing every `period` until all sources are stopped.
pub async fn run_reporter(sources: Vec<SourceHandle>, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if sources.iter().all(SourceHandle::is_stopped) {
            break;
        }
        info!("\n{}", render_status(&sources));
    }
}
