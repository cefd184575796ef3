#![forbid(unsafe_code)]

//! Payload selection for a traffic source.
//!
//! Payload bytes come from a random window of the configured content file, or from a small
//! built-in corpus when no file is configured. Reading never fails the call: a missing,
//! unreadable or too short file yields a zero-filled payload of the requested size.

use std::{
    fs::File,
    io::{self, Read, Seek, SeekFrom},
    net::{IpAddr, Ipv4Addr, ToSocketAddrs},
    path::{Path, PathBuf},
};

use rand::{seq::SliceRandom, Rng};
use surge_core::SourceConfig;
use tracing::{debug, warn};

use crate::header::Ipv4UdpHeader;

/// Built-in payloads used when no content file is configured.
pub const FALLBACK_CORPUS: [&str; 5] = [
    "This is a test message.",
    "Wakeup",
    "I have a lot to say about the weather AND other InTeresting ToPicS !",
    "Testing 1234 ...... Testing 1234 ././././ Chatty Topic #2 #5, %D% R1",
    "Another message another day.",
];

/// Builds datagram bodies for one source.
#[derive(Debug, Clone)]
pub struct PacketCodec {
    name: String,
    content_file: Option<PathBuf>,
    framing: Option<Ipv4UdpHeader>,
    verbosity: i32,
}

impl PacketCodec {
    /// Spoofed header addresses are resolved once here; a failure is logged and leaves that
    /// address zeroed in every packet. Host names go through the system resolver and block,
    /// so async callers should construct on the blocking pool.
    pub fn new(config: &SourceConfig, verbosity: i32) -> Self {
        let framing = config.udp_packet.then(|| Ipv4UdpHeader {
            src_addr: resolve_spoofed(&config.name, "source", &config.packet_src_address),
            dst_addr: resolve_spoofed(&config.name, "destination", &config.packet_dst_address),
            src_port: config.packet_src_port,
            dst_port: config.packet_dst_port,
        });
        if verbosity > 0 {
            debug!(source = %config.name, framed = framing.is_some(), "packet codec init");
        }
        Self {
            name: config.name.clone(),
            content_file: config.content_file_path.clone(),
            framing,
            verbosity,
        }
    }

    /// Header used for encapsulation, if framing is enabled.
    pub fn framing(&self) -> Option<&Ipv4UdpHeader> {
        self.framing.as_ref()
    }

    /// Zero-filled datagram body with the same sizing and framing as [`Self::build_packet`].
    pub fn blank_packet(&self, mtu: usize, vary_packet_size: bool) -> Vec<u8> {
        let size = packet_size(&mut rand::thread_rng(), mtu, vary_packet_size);
        self.frame(vec![0u8; size])
    }

    /// Produce one datagram body of `mtu` payload bytes, or a uniformly drawn size in
    /// `1..=mtu` when `vary_packet_size` is set, plus the fabricated header when framing.
    pub fn build_packet(&self, mtu: usize, vary_packet_size: bool) -> Vec<u8> {
        let mut rng = rand::thread_rng();
        let size = packet_size(&mut rng, mtu, vary_packet_size);
        let payload = match &self.content_file {
            Some(path) => self.payload_from_file(&mut rng, path, size),
            None => corpus_payload(&mut rng, size),
        };
        self.frame(payload)
    }

    fn frame(&self, payload: Vec<u8>) -> Vec<u8> {
        match &self.framing {
            Some(header) => header.encapsulate(&payload),
            None => payload,
        }
    }

    fn payload_from_file<R: Rng>(&self, rng: &mut R, path: &Path, size: usize) -> Vec<u8> {
        match read_window(rng, path, size) {
            Ok(data) => {
                if self.verbosity > 0 {
                    debug!(
                        source = %self.name,
                        "read {} bytes [{}]",
                        data.len(),
                        String::from_utf8_lossy(&data)
                    );
                }
                data
            }
            Err(e) => {
                warn!(source = %self.name, path = %path.display(), "content read failed: {e}");
                vec![0u8; size]
            }
        }
    }
}

fn packet_size<R: Rng>(rng: &mut R, mtu: usize, vary: bool) -> usize {
    if vary && mtu > 0 {
        rng.gen_range(1..=mtu)
    } else {
        mtu
    }
}

/// Read `size` bytes starting at a uniformly drawn offset in `[0, len - size)`.
/// A file exactly `size` bytes long is read from offset 0.
fn read_window<R: Rng>(rng: &mut R, path: &Path, size: usize) -> io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    let size_u64 = size as u64;
    if len < size_u64 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("content file holds {len} bytes, {size} requested"),
        ));
    }
    let span = len - size_u64;
    let offset = if span == 0 { 0 } else { rng.gen_range(0..span) };
    file.seek(SeekFrom::Start(offset))?;
    let mut data = vec![0u8; size];
    file.read_exact(&mut data)?;
    Ok(data)
}

/// Pick one corpus entry and repeat it to fill `size` bytes.
fn corpus_payload<R: Rng>(rng: &mut R, size: usize) -> Vec<u8> {
    let text = FALLBACK_CORPUS.choose(rng).copied().unwrap_or(FALLBACK_CORPUS[0]);
    text.bytes().cycle().take(size).collect()
}

fn resolve_spoofed(source: &str, role: &str, host: &str) -> Option<Ipv4Addr> {
    let host = host.trim();
    let resolved = match host.parse::<IpAddr>() {
        _ if host.is_empty() => None,
        Ok(IpAddr::V4(v4)) => Some(v4),
        Ok(IpAddr::V6(_)) => None,
        Err(_) => (host, 0)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.find_map(|a| match a.ip() {
                IpAddr::V4(v4) => Some(v4),
                IpAddr::V6(_) => None,
            })),
    };
    if resolved.is_none() {
        warn!(source = %source, "unknown {role} address '{host}', header field left unset");
    }
    resolved
}
