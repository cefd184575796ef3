#![forbid(unsafe_code)]

//! Surge configuration handling. Parses the traffic source descriptor file into strongly-typed
//! structures. JSON is the native layout (`contentDescriptors.json`); files with a `.toml`
//! extension are parsed as TOML with the same field names.

use serde::Deserialize;
use std::{fs, path::{Path, PathBuf}, time::Duration};
use tracing::warn;

use crate::{SurgeError, SurgeResult};

/// Largest payload a single IPv4 UDP datagram can carry.
pub const MAX_UDP_PAYLOAD: usize = 65_507;

/// Top-level generator configuration: global verbosity plus the ordered list of sources.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Debug verbosity. Each nested component receives one level less than its parent.
    pub debug_level: i32,

    /// Optional `tracing` filter directive (`info`, `surge_daemon=debug`, ...).
    pub log_level: Option<String>,

    /// Period of the status report loop.
    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: u64,

    /// Traffic sources, started in file order.
    #[serde(rename = "contentDescriptors", alias = "sources")]
    pub sources: Vec<SourceConfig>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            debug_level: 0,
            log_level: None,
            report_interval_secs: default_report_interval_secs(),
            sources: Vec::new(),
        }
    }
}

fn default_report_interval_secs() -> u64 {
    10
}

/// Immutable description of one traffic source.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceConfig {
    /// Display name used in logs and status reports.
    pub name: String,

    /// Real transmission destination (host name or address).
    pub dest_ip: String,
    pub dest_port: u16,

    /// Informational only; pacing is driven by `max_packets_per_second`.
    #[serde(default)]
    pub average_packets_per_second: u32,
    pub max_packets_per_second: u32,

    /// Redraw the sender rate as U(0,1) x max after every packet.
    #[serde(default)]
    pub variable_rate: bool,

    /// State machine clock frequency.
    pub clock_hz: f64,

    #[serde(default)]
    pub start_delay_milliseconds: u64,

    /// Prefix every payload with a fabricated IPv4 + UDP header.
    #[serde(default)]
    pub udp_packet: bool,

    // Addresses and ports written into the fabricated header only.
    #[serde(default)]
    pub packet_src_address: String,
    #[serde(default)]
    pub packet_dst_address: String,
    #[serde(default)]
    pub packet_src_port: u16,
    #[serde(default)]
    pub packet_dst_port: u16,

    /// File providing payload bytes. When absent the built-in corpus is used.
    #[serde(default)]
    pub content_file_path: Option<PathBuf>,

    pub packet_mtu_size_bytes: usize,

    /// Draw each payload size uniformly from `1..=packet_mtu_size_bytes`.
    #[serde(default)]
    pub packet_variable_size: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            name: "source".to_string(),
            dest_ip: "127.0.0.1".to_string(),
            dest_port: 9,
            average_packets_per_second: 1,
            max_packets_per_second: 1,
            variable_rate: false,
            clock_hz: 1.0,
            start_delay_milliseconds: 0,
            udp_packet: false,
            packet_src_address: String::new(),
            packet_dst_address: String::new(),
            packet_src_port: 0,
            packet_dst_port: 0,
            content_file_path: None,
            packet_mtu_size_bytes: 512,
            packet_variable_size: false,
        }
    }
}

impl SourceConfig {
    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_milliseconds)
    }

    /// Check a single source; `GeneratorConfig::validate` calls this for every entry.
    pub fn validate(&self) -> SurgeResult<()> {
        let invalid =
            |msg: String| Err(SurgeError::InvalidConfig(format!("source '{}': {msg}", self.name)));
        if self.dest_ip.trim().is_empty() {
            return invalid("dest_ip is empty".into());
        }
        if !(self.clock_hz.is_finite() && self.clock_hz > 0.0) {
            return invalid(format!("clock_hz must be positive, got {}", self.clock_hz));
        }
        if self.max_packets_per_second == 0 {
            return invalid("max_packets_per_second must be positive".into());
        }
        if self.packet_mtu_size_bytes == 0 || self.packet_mtu_size_bytes > MAX_UDP_PAYLOAD {
            return invalid(format!(
                "packet_mtu_size_bytes must be within 1..={MAX_UDP_PAYLOAD}, got {}",
                self.packet_mtu_size_bytes
            ));
        }
        if self.average_packets_per_second > self.max_packets_per_second {
            warn!(
                source = %self.name,
                "average_packets_per_second ({}) exceeds max_packets_per_second ({})",
                self.average_packets_per_second,
                self.max_packets_per_second
            );
        }
        Ok(())
    }
}

impl GeneratorConfig {
    /// Parse a configuration file from the given path. The format follows the extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> SurgeResult<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml_str(&data)
        } else {
            Self::from_json_str(&data)
        }
    }

    pub fn from_json_str(data: &str) -> SurgeResult<Self> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn from_toml_str(data: &str) -> SurgeResult<Self> {
        toml::from_str(data).map_err(SurgeError::ConfigParse)
    }

    /// Parse and validate. Any failure here is fatal to the process.
    pub fn load<P: AsRef<Path>>(path: P) -> SurgeResult<Self> {
        let cfg = Self::from_file(path)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> SurgeResult<()> {
        if self.sources.is_empty() {
            return Err(SurgeError::InvalidConfig("no traffic sources configured".into()));
        }
        if self.report_interval_secs == 0 {
            return Err(SurgeError::InvalidConfig("report_interval_secs must be positive".into()));
        }
        self.sources.iter().try_for_each(SourceConfig::validate)
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }
}
