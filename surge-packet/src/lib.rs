#![forbid(unsafe_code)]

//! Packet construction for Surge traffic sources.
//!
//! * [`checksum`] implements the RFC 1071 Internet checksum.
//! * [`header`] fabricates the IPv4 + UDP header carried inside a datagram body.
//! * [`content`] selects payload bytes and applies the optional encapsulation.

pub mod checksum;
pub mod content;
pub mod header;

pub use checksum::{internet_checksum, Checksum};
pub use content::{PacketCodec, FALLBACK_CORPUS};
pub use header::{Ipv4UdpHeader, ENCAPSULATION_OVERHEAD, IPV4_HEADER_LEN, UDP_HEADER_LEN};
