#![forbid(unsafe_code)]

//! Shared fixtures for the Surge conformance suite.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use surge_core::SourceConfig;
use tokio::net::UdpSocket;

/// Loopback UDP receiver standing in for a traffic destination.
pub struct LoopbackSink {
    socket: UdpSocket,
}

impl LoopbackSink {
    pub async fn bind() -> Result<Self> {
        let socket = UdpSocket::bind("127.0.0.1:0").await.context("binding loopback sink")?;
        Ok(Self { socket })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Next datagram, or an error if none arrives within `wait`.
    pub async fn recv_within(&self, wait: Duration) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; 65_536];
        let (len, _) = tokio::time::timeout(wait, self.socket.recv_from(&mut buf))
            .await
            .context("no datagram before timeout")??;
        buf.truncate(len);
        Ok(buf)
    }
}

/// Source aimed at `sink`, framed with the 10.0.0.1:1000 -> 10.0.0.2:2000 spoofed header.
pub fn framed_source(sink: SocketAddr, mtu: usize) -> SourceConfig {
    SourceConfig {
        name: "conformance".into(),
        dest_ip: sink.ip().to_string(),
        dest_port: sink.port(),
        average_packets_per_second: 5,
        max_packets_per_second: 5,
        clock_hz: 1.0,
        udp_packet: true,
        packet_src_address: "10.0.0.1".into(),
        packet_dst_address: "10.0.0.2".into(),
        packet_src_port: 1000,
        packet_dst_port: 2000,
        packet_mtu_size_bytes: mtu,
        ..SourceConfig::default()
    }
}
