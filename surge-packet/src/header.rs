#![forbid(unsafe_code)]

//! Synthetic IPv4 + UDP header placed at the front of a datagram body.
//!
//! Layout: `[20-byte IPv4 header][8-byte UDP header][payload]`. The socket layer wraps the whole
//! thing in the real OS-level headers, so the result travels as nested headers.
//!
//! Length fields are 16 bits wide and wrap silently for payloads above 65 507 bytes.

use std::net::Ipv4Addr;

use crate::checksum::{internet_checksum, Checksum};

pub const IPV4_HEADER_LEN: usize = 20;
pub const UDP_HEADER_LEN: usize = 8;
/// Bytes added in front of the payload by [`Ipv4UdpHeader::encapsulate`].
pub const ENCAPSULATION_OVERHEAD: usize = IPV4_HEADER_LEN + UDP_HEADER_LEN;

const VERSION_IHL: u8 = 0x45;
const TTL: u8 = 255;
const PROTO_UDP: u8 = 17;
const IPV4_CHECKSUM_OFFSET: usize = 10;
const UDP_CHECKSUM_OFFSET: usize = 6;

/// Addressing written into the fabricated header.
///
/// A `None` address leaves its four bytes zeroed (and contributes zeros to the UDP
/// pseudo-header); the rest of the header is still produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4UdpHeader {
    pub src_addr: Option<Ipv4Addr>,
    pub dst_addr: Option<Ipv4Addr>,
    pub src_port: u16,
    pub dst_port: u16,
}

impl Ipv4UdpHeader {
    /// Return `header ‖ payload` with both checksums filled in.
    #[must_use]
    pub fn encapsulate(&self, payload: &[u8]) -> Vec<u8> {
        let mut packet = vec![0u8; ENCAPSULATION_OVERHEAD + payload.len()];
        let (ip, rest) = packet.split_at_mut(IPV4_HEADER_LEN);
        let (udp, body) = rest.split_at_mut(UDP_HEADER_LEN);
        body.copy_from_slice(payload);
        self.write_ipv4(ip, payload.len());
        self.write_udp(udp, body);
        packet
    }

    fn write_ipv4(&self, ip: &mut [u8], payload_len: usize) {
        let total_len = (ENCAPSULATION_OVERHEAD + payload_len) as u16;
        ip[0] = VERSION_IHL;
        ip[1] = 0; // DSCP / ECN
        ip[2..4].copy_from_slice(&total_len.to_be_bytes());
        // identification, flags and fragment offset stay zero
        ip[8] = TTL;
        ip[9] = PROTO_UDP;
        ip[12..16].copy_from_slice(&octets(self.src_addr));
        ip[16..20].copy_from_slice(&octets(self.dst_addr));
        let csum = internet_checksum(ip);
        ip[IPV4_CHECKSUM_OFFSET..IPV4_CHECKSUM_OFFSET + 2].copy_from_slice(&csum.to_be_bytes());
    }

    fn write_udp(&self, udp: &mut [u8], payload: &[u8]) {
        let udp_len = (UDP_HEADER_LEN + payload.len()) as u16;
        udp[0..2].copy_from_slice(&self.src_port.to_be_bytes());
        udp[2..4].copy_from_slice(&self.dst_port.to_be_bytes());
        udp[4..6].copy_from_slice(&udp_len.to_be_bytes());
        let csum = udp_checksum(self.src_addr, self.dst_addr, udp, payload);
        udp[UDP_CHECKSUM_OFFSET..UDP_CHECKSUM_OFFSET + 2].copy_from_slice(&csum.to_be_bytes());
    }
}

/// UDP checksum over `src ‖ dst ‖ 0 ‖ 17 ‖ udp_len ‖ udp_header ‖ payload`.
///
/// `udp_header` must carry a zero checksum field; its length field is reused for the
/// pseudo-header.
#[must_use]
pub fn udp_checksum(
    src: Option<Ipv4Addr>,
    dst: Option<Ipv4Addr>,
    udp_header: &[u8],
    payload: &[u8],
) -> u16 {
    let mut c = Checksum::new();
    c.add_bytes(&octets(src));
    c.add_bytes(&octets(dst));
    c.add_bytes(&[0, PROTO_UDP]);
    c.add_bytes(&udp_header[4..6]);
    c.add_bytes(udp_header);
    c.add_bytes(payload);
    c.finish()
}

fn octets(addr: Option<Ipv4Addr>) -> [u8; 4] {
    addr.map_or([0; 4], |a| a.octets())
}
