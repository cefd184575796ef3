#![forbid(unsafe_code)]

//! Rate-limited datagram sender.
//!
//! One sender task runs per active traffic level. It paces itself with a one-token bucket at
//! `max_packets_per_second`, optionally redrawing its rate after every packet. Stopping is
//! cooperative: the flag is checked right after each permit is granted, so a send already in
//! progress always completes. A stop also wakes a sender parked on a long pacing interval.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use surge_core::{RateLimiter, SourceConfig};
use surge_mix::RateRedraw;
use tokio::{sync::Notify, task::JoinHandle};
use tracing::{debug, error, warn};

use crate::{resolve_destination, OutboundSocket, PacketSource};

/// Control handle for a spawned sender.
#[derive(Debug)]
pub struct SenderHandle {
    id: u64,
    running: Arc<AtomicBool>,
    wake: Arc<Notify>,
    task: JoinHandle<u64>,
}

impl SenderHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Request a stop. Returns immediately; the task exits at its next permit.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
        self.wake.notify_one();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the task to exit and return how many datagrams it sent.
    pub async fn join(self) -> u64 {
        self.task.await.unwrap_or_else(|e| {
            error!(sender = self.id, "sender task failed: {e}");
            0
        })
    }
}

pub struct Sender<S: PacketSource> {
    id: u64,
    config: Arc<SourceConfig>,
    source: Arc<S>,
    running: Arc<AtomicBool>,
    wake: Arc<Notify>,
    verbosity: i32,
    sent: u64,
}

impl<S: PacketSource> Sender<S> {
    pub fn new(id: u64, config: Arc<SourceConfig>, source: Arc<S>, verbosity: i32) -> Self {
        if verbosity > 0 {
            debug!(source = %config.name, sender = id, "sender init");
        }
        Self {
            id,
            config,
            source,
            running: Arc::new(AtomicBool::new(true)),
            wake: Arc::new(Notify::new()),
            verbosity,
            sent: 0,
        }
    }

    /// Start the transmit loop on the current tokio runtime.
    pub fn spawn(self) -> SenderHandle {
        let id = self.id;
        let running = self.running.clone();
        let wake = self.wake.clone();
        let task = tokio::spawn(self.run());
        SenderHandle { id, running, wake, task }
    }

    async fn run(mut self) -> u64 {
        let cfg = self.config.clone();
        if self.verbosity > 0 {
            debug!(source = %cfg.name, sender = self.id, "sender start");
        }

        // Setup failures leave this sender idle for its whole lifetime.
        let dest = match resolve_destination(&cfg.dest_ip, cfg.dest_port).await {
            Ok(addr) => addr,
            Err(e) => {
                error!(source = %cfg.name, sender = self.id, "destination unavailable: {e:#}");
                return 0;
            }
        };
        let socket = match OutboundSocket::bind_for(dest) {
            Ok(socket) => socket,
            Err(e) => {
                error!(source = %cfg.name, sender = self.id, "socket creation failed: {e}");
                return 0;
            }
        };

        let max_rate = f64::from(cfg.max_packets_per_second);
        let mut limiter = RateLimiter::new(max_rate);
        let redraw = cfg.variable_rate.then(|| RateRedraw::new(max_rate));

        loop {
            tokio::select! {
                _ = limiter.acquire() => {}
                _ = self.wake.notified() => {}
            }
            if !self.running.load(Ordering::Acquire) {
                break;
            }

            let packet = self
                .source
                .request_packet(cfg.packet_mtu_size_bytes, cfg.packet_variable_size)
                .await;
            if self.verbosity > 0 {
                debug!(source = %cfg.name, sender = self.id, len = packet.len(), "sending packet");
            }
            match socket.send_to(&packet, dest).await {
                Ok(_) => {
                    self.sent += 1;
                    self.source.record_sent();
                }
                Err(e) => warn!(source = %cfg.name, sender = self.id, %dest, "udp send error: {e}"),
            }

            if let Some(redraw) = &redraw {
                limiter.set_rate(redraw.next_rate());
            }
        }

        drop(socket);
        if self.verbosity > 0 {
            debug!(source = %cfg.name, sender = self.id, sent = self.sent, "sender finished");
        }
        self.sent
    }
}
