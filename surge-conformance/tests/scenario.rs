use std::net::Ipv4Addr;
use std::time::Duration;

use surge_conformance::{framed_source, LoopbackSink};
use surge_daemon::SourceOrchestrator;
use surge_mix::TrafficState;
use surge_packet::{internet_checksum, ENCAPSULATION_OVERHEAD, IPV4_HEADER_LEN};

#[tokio::test]
async fn forced_high_state_emits_framed_datagrams() {
    let sink = LoopbackSink::bind().await.unwrap();
    let mut orch = SourceOrchestrator::new(framed_source(sink.addr().unwrap(), 100), 0);

    orch.transition(TrafficState::High);
    assert_eq!(orch.active_senders().len(), 1);

    let datagram = sink.recv_within(Duration::from_secs(1)).await.unwrap();
    assert_eq!(datagram.len(), 100 + ENCAPSULATION_OVERHEAD);
    assert_eq!(datagram[0], 0x45);
    assert_eq!(datagram[9], 17);
    let addr = |at: usize| {
        Ipv4Addr::new(datagram[at], datagram[at + 1], datagram[at + 2], datagram[at + 3])
    };
    assert_eq!(addr(12), Ipv4Addr::new(10, 0, 0, 1));
    assert_eq!(addr(16), Ipv4Addr::new(10, 0, 0, 2));
    assert_eq!(u16::from_be_bytes([datagram[20], datagram[21]]), 1000);
    assert_eq!(u16::from_be_bytes([datagram[22], datagram[23]]), 2000);
    assert_eq!(internet_checksum(&datagram[..IPV4_HEADER_LEN]), 0);

    orch.transition(TrafficState::Idle);
    assert!(orch.active_senders().is_empty());
}

#[tokio::test]
async fn state_changes_replace_the_sender() {
    let sink = LoopbackSink::bind().await.unwrap();
    let mut orch = SourceOrchestrator::new(framed_source(sink.addr().unwrap(), 32), 0);

    for state in [TrafficState::Low, TrafficState::High, TrafficState::Low] {
        orch.transition(state);
        assert_eq!(orch.active_senders().len(), 1);
        sink.recv_within(Duration::from_secs(1)).await.unwrap();
    }
    orch.transition(TrafficState::Off);
    assert!(orch.active_senders().is_empty());
}
