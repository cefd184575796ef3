#![forbid(unsafe_code)]

//! Surge UDP transport.
//!
//! * [`PacketSource`] is the seam between a sender and the source that owns it.
//! * [`OutboundSocket`] binds an ephemeral, non-blocking UDP socket for one sender.
//! * [`sender`] runs the rate-limited transmit loop.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use socket2::{Domain, Protocol, Type};
use tokio::net::UdpSocket;

pub mod sender;

pub use sender::{Sender, SenderHandle};

/// Supplies datagram bodies to a sender and receives its delivery accounting.
#[async_trait]
pub trait PacketSource: Send + Sync + 'static {
    /// Build the next datagram body.
    async fn request_packet(&self, mtu: usize, vary_packet_size: bool) -> Vec<u8>;

    /// Called once for every datagram handed to the OS successfully.
    fn record_sent(&self);
}

/// Outbound-only UDP socket bound to an ephemeral port.
pub struct OutboundSocket {
    socket: UdpSocket,
}

impl OutboundSocket {
    /// Bind `0.0.0.0:0` (or `[::]:0`) matching the destination's address family.
    /// Must be called from within a tokio runtime.
    pub fn bind_for(dest: SocketAddr) -> std::io::Result<Self> {
        let local = match dest.ip() {
            IpAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            IpAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
        };
        let socket =
            socket2::Socket::new(Domain::for_address(local), Type::DGRAM, Some(Protocol::UDP))?;
        socket.bind(&local.into())?;
        let std_sock: std::net::UdpSocket = socket.into();
        std_sock.set_nonblocking(true)?;
        Ok(Self { socket: UdpSocket::from_std(std_sock)? })
    }

    pub async fn send_to(&self, data: &[u8], dest: SocketAddr) -> std::io::Result<usize> {
        self.socket.send_to(data, dest).await
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

/// Resolve the real transmission destination, preferring IPv4 results.
pub async fn resolve_destination(host: &str, port: u16) -> Result<SocketAddr> {
    let host = host.trim();
    if host.is_empty() {
        bail!("destination host is empty");
    }
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
        .await
        .with_context(|| format!("resolving destination {host}:{port}"))?
        .collect();
    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| anyhow!("no addresses found for {host}:{port}"))
}
