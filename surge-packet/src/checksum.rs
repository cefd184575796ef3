#![forbid(unsafe_code)]

//! Internet checksum (RFC 1071).
//!
//! Big-endian 16-bit words are summed with the carry folded back in after every addition. An
//! odd trailing byte is the high byte of a final word whose low byte is zero. The checksum is
//! the one's complement of the folded sum. A result of `0x0000` is returned unchanged; it is
//! never rewritten to `0xFFFF`.

/// Incremental checksum over one or more byte slices.
///
/// Slices are treated as one contiguous buffer, so an odd-length slice followed by another
/// slice pairs its last byte with the next slice's first byte.
#[derive(Debug, Default, Clone)]
pub struct Checksum {
    sum: u32,
    pending: Option<u8>,
}

impl Checksum {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bytes(&mut self, mut data: &[u8]) {
        if let Some(hi) = self.pending.take() {
            match data.split_first() {
                Some((&lo, rest)) => {
                    self.add_word(u16::from_be_bytes([hi, lo]));
                    data = rest;
                }
                None => {
                    self.pending = Some(hi);
                    return;
                }
            }
        }
        let mut words = data.chunks_exact(2);
        for w in &mut words {
            self.add_word(u16::from_be_bytes([w[0], w[1]]));
        }
        if let [last] = words.remainder() {
            self.pending = Some(*last);
        }
    }

    pub fn add_u16(&mut self, value: u16) {
        self.add_bytes(&value.to_be_bytes());
    }

    fn add_word(&mut self, word: u16) {
        self.sum += u32::from(word);
        if self.sum > 0xFFFF {
            self.sum = (self.sum & 0xFFFF) + 1;
        }
    }

    /// Pad any odd trailing byte and return the complemented sum.
    #[must_use]
    pub fn finish(mut self) -> u16 {
        if let Some(hi) = self.pending.take() {
            self.add_word(u16::from_be_bytes([hi, 0]));
        }
        !(self.sum as u16)
    }
}

/// Checksum of a single contiguous buffer.
#[must_use]
pub fn internet_checksum(buf: &[u8]) -> u16 {
    let mut c = Checksum::new();
    c.add_bytes(buf);
    c.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn rfc1071_reference_vector() {
        // RFC 1071 §3: words sum to 0xddf2.
        let buf = hex!("0001 f203 f4f5 f6f7");
        assert_eq!(internet_checksum(&buf), !0xddf2u16);
        assert_eq!(internet_checksum(&buf), 0x220d);
    }

    #[test]
    fn ipv4_header_reference_vector() {
        let mut hdr = hex!("4500 0073 0000 4000 4011 0000 c0a8 0001 c0a8 00c7");
        let csum = internet_checksum(&hdr);
        assert_eq!(csum, 0xb861);
        hdr[10..12].copy_from_slice(&csum.to_be_bytes());
        assert_eq!(internet_checksum(&hdr), 0x0000);
    }

    #[test]
    fn odd_length_pads_low_byte() {
        assert_eq!(internet_checksum(&[0x01]), !0x0100);
        assert_eq!(internet_checksum(&hex!("0001 f2")), !(0x0001u16 + 0xf200));
    }

    #[test]
    fn empty_and_zero_buffers() {
        assert_eq!(internet_checksum(&[]), 0xFFFF);
        assert_eq!(internet_checksum(&[0u8; 40]), 0xFFFF);
    }

    #[test]
    fn all_ones_sum_is_not_remapped() {
        assert_eq!(internet_checksum(&[0xFF, 0xFF]), 0x0000);
        assert_eq!(internet_checksum(&hex!("fffe 0001")), 0x0000);
    }

    #[test]
    fn carry_is_folded_on_every_addition() {
        // 0xffff + 0x0002 = 0x10001 -> 0x0002
        assert_eq!(internet_checksum(&hex!("ffff 0002")), !0x0002);
    }

    #[test]
    fn split_input_matches_contiguous() {
        let data: Vec<u8> = (0u8..=200).collect();
        for split in [0, 1, 7, 8, 99, 200] {
            let mut c = Checksum::new();
            c.add_bytes(&data[..split]);
            c.add_bytes(&[]);
            c.add_bytes(&data[split..]);
            assert_eq!(c.finish(), internet_checksum(&data), "split at {split}");
        }
    }
}
