#![forbid(unsafe_code)]

//! Per-source lifecycle driver.
//!
//! A [`SourceOrchestrator`] ticks its [`TrafficStateMachine`] at `clock_hz` and keeps exactly one
//! [`Sender`] alive while the source is in LOW or HIGH, none while in OFF or IDLE. State shared
//! with senders and the status reporter lives in [`SourceShared`] behind an `Arc`.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use async_trait::async_trait;
use surge_core::{RateLimiter, SourceConfig};
use surge_mix::{TrafficState, TrafficStateMachine};
use surge_packet::PacketCodec;
use surge_transport::{PacketSource, Sender, SenderHandle};
use tokio::sync::Notify;
use tracing::{debug, error, info};

/// Horizon used for the startup on/off estimate.
const ESTIMATE_STEPS: u32 = 100;

/// State of one source visible to its senders and to the reporter.
#[derive(Debug)]
pub struct SourceShared {
    config: Arc<SourceConfig>,
    codec: Arc<PacketCodec>,
    packets_sent: AtomicU64,
    stopped: AtomicBool,
    wake: Notify,
}

impl SourceShared {
    fn new(config: Arc<SourceConfig>, verbosity: i32) -> Self {
        let codec = Arc::new(PacketCodec::new(&config, verbosity - 1));
        Self {
            config,
            codec,
            packets_sent: AtomicU64::new(0),
            stopped: AtomicBool::new(false),
            wake: Notify::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn packets_sent(&self) -> u64 {
        self.packets_sent.load(Ordering::Relaxed)
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

#[async_trait]
impl PacketSource for SourceShared {
    async fn request_packet(&self, mtu: usize, vary_packet_size: bool) -> Vec<u8> {
        if self.config.content_file_path.is_none() {
            return self.codec.build_packet(mtu, vary_packet_size);
        }
        // File reads block; keep them off the async workers.
        let codec = self.codec.clone();
        tokio::task::spawn_blocking(move || codec.build_packet(mtu, vary_packet_size))
            .await
            .unwrap_or_else(|e| {
                error!(source = %self.config.name, "packet build task failed: {e}");
                self.codec.blank_packet(mtu, vary_packet_size)
            })
    }

    fn record_sent(&self) {
        self.packets_sent.fetch_add(1, Ordering::Relaxed);
    }
}

/// Cloneable read/stop view of a running source.
#[derive(Debug, Clone)]
pub struct SourceHandle(Arc<SourceShared>);

impl SourceHandle {
    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn packets_sent(&self) -> u64 {
        self.0.packets_sent()
    }

    pub fn stop(&self) {
        self.0.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.0.is_stopped()
    }
}

pub struct SourceOrchestrator {
    shared: Arc<SourceShared>,
    machine: TrafficStateMachine,
    active: Vec<SenderHandle>,
    next_sender_id: u64,
    verbosity: i32,
}

impl SourceOrchestrator {
    /// Starts in OFF with no senders and a zero counter. Blocks while resolving spoofed host
    /// names; see [`crate::startup::build_orchestrators`].
    pub fn new(config: SourceConfig, verbosity: i32) -> Self {
        let shared = Arc::new(SourceShared::new(Arc::new(config), verbosity));
        if verbosity > 0 {
            debug!(source = %shared.name(), "orchestrator init");
        }
        Self {
            shared,
            machine: TrafficStateMachine::new(),
            active: Vec::new(),
            next_sender_id: 0,
            verbosity,
        }
    }

    pub fn handle(&self) -> SourceHandle {
        SourceHandle(self.shared.clone())
    }

    pub async fn request_packet(&self, mtu: usize, vary_packet_size: bool) -> Vec<u8> {
        self.shared.request_packet(mtu, vary_packet_size).await
    }

    pub fn name(&self) -> &str {
        self.shared.name()
    }

    pub fn packets_sent(&self) -> u64 {
        self.shared.packets_sent()
    }

    pub fn record_sent(&self) {
        self.shared.record_sent();
    }

    /// Ask the run loop to exit after its current tick.
    pub fn stop(&self) {
        self.shared.stop();
    }

    pub fn state(&self) -> TrafficState {
        self.machine.state()
    }

    pub fn active_senders(&self) -> &[SenderHandle] {
        &self.active
    }

    /// Move to `next`: signal every active sender to stop, then start one fresh sender if
    /// `next` transmits. Does not wait for stopped senders to exit. Needs a tokio runtime.
    pub fn transition(&mut self, next: TrafficState) {
        let prev = self.machine.state();
        self.stop_senders();
        if next.is_transmitting() {
            let id = self.next_sender_id;
            self.next_sender_id += 1;
            let config = self.shared.config.clone();
            let sender = Sender::new(id, config, self.shared.clone(), self.verbosity - 1);
            self.active.push(sender.spawn());
        }
        self.machine.set_state(next);
        if self.verbosity > 0 {
            debug!(
                source = %self.name(),
                from = %prev,
                to = %next,
                senders = self.active.len(),
                "state transition"
            );
        }
    }

    fn stop_senders(&mut self) {
        for sender in self.active.drain(..) {
            sender.stop();
        }
    }

    /// Drive the state machine until [`SourceOrchestrator::stop`] is called.
    pub async fn run(mut self) {
        let cfg = self.shared.config.clone();
        let delay = cfg.start_delay();
        if !delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.shared.wake.notified() => {}
            }
        }

        info!(
            source = %cfg.name,
            "On Time: {:.2} / Off Time: {:.2}",
            self.machine.expected_on_fraction(ESTIMATE_STEPS),
            self.machine.expected_off_fraction(ESTIMATE_STEPS),
        );

        let mut clock = RateLimiter::new(cfg.clock_hz);
        while !self.shared.is_stopped() {
            tokio::select! {
                _ = clock.acquire() => {}
                _ = self.shared.wake.notified() => {}
            }
            if self.shared.is_stopped() {
                break;
            }

            let current = self.machine.state();
            let next = self.machine.next_state();
            if self.verbosity > 0 {
                debug!(source = %cfg.name, state = %current, next = %next, "tick");
            }
            if next != current {
                self.transition(next);
            }
        }

        self.stop_senders();
        info!(source = %cfg.name, packets = self.packets_sent(), "source stopped");
    }
}
