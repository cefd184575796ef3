use std::io::Write;

use proptest::prelude::*;
use surge_core::SourceConfig;
use surge_packet::{PacketCodec, ENCAPSULATION_OVERHEAD};

fn codec(udp_packet: bool) -> PacketCodec {
    let cfg = SourceConfig {
        udp_packet,
        packet_src_address: "10.0.0.1".into(),
        packet_dst_address: "10.0.0.2".into(),
        ..SourceConfig::default()
    };
    PacketCodec::new(&cfg, 0)
}

proptest! {
    #[test]
    fn fixed_size_packets_are_exact(mtu in 1usize..2048, framed in any::<bool>()) {
        let packet = codec(framed).build_packet(mtu, false);
        let overhead = if framed { ENCAPSULATION_OVERHEAD } else { 0 };
        prop_assert_eq!(packet.len(), mtu + overhead);
    }

    #[test]
    fn varied_packets_stay_in_range(mtu in 1usize..2048) {
        let len = codec(false).build_packet(mtu, true).len();
        prop_assert!((1..=mtu).contains(&len));
    }
}

#[test]
fn varied_sizes_are_uniform() {
    let codec = codec(false);
    let mtu = 10;
    let trials = 20_000;
    let mut counts = [0u32; 10];
    for _ in 0..trials {
        counts[codec.build_packet(mtu, true).len() - 1] += 1;
    }
    // Expected 2000 per bin with a standard deviation near 42.
    for (i, count) in counts.iter().enumerate() {
        assert!((1_700..=2_300).contains(count), "size {} drawn {count} times", i + 1);
    }
}

#[test]
fn file_content_is_a_contiguous_window() {
    let data: Vec<u8> = (0..=255u8).collect();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&data).unwrap();
    let cfg = SourceConfig {
        content_file_path: Some(file.path().to_path_buf()),
        ..SourceConfig::default()
    };
    let codec = PacketCodec::new(&cfg, 0);
    for _ in 0..200 {
        let packet = codec.build_packet(16, false);
        assert_eq!(packet.len(), 16);
        assert!(packet.windows(2).all(|w| w[1] == w[0] + 1));
    }
}
