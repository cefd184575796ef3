#![forbid(unsafe_code)]

//! Surge traffic generator runtime: per-source orchestration and status reporting.

pub mod orchestrator;
pub mod startup;
pub mod status;

pub use orchestrator::{SourceHandle, SourceOrchestrator, SourceShared};
pub use startup::{build_orchestrators, join_sources, load_config, log_filter};
pub use status::{render_status, run_reporter};
