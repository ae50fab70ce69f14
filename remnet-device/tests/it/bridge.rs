//! Receive and transmit paths, driven through the in-memory transport.

use std::{
    io,
    net::Ipv4Addr,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use bytes::Bytes;
use parking_lot::Mutex;
use remnet_device::{
    DeviceConfig, MacAddr, NetDevice, NodeId, PacketType, RemoteNetDevice, SendError,
};
use remnet_sim::Simulator;
use remnet_transport::{Mock, RemoteEndpoint};
use remnet_wire::{EthernetHeader, BROADCAST};

pub(crate) const OWN: MacAddr = MacAddr(0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa);
pub(crate) const PEER: MacAddr = MacAddr(0xcc, 0xcc, 0xcc, 0xcc, 0xcc, 0xcc);
pub(crate) const OTHER: MacAddr = MacAddr(0xbb, 0xbb, 0xbb, 0xbb, 0xbb, 0xbb);
pub(crate) const GROUP: MacAddr = MacAddr(0x01, 0x00, 0x5e, 0x00, 0x00, 0x01);
pub(crate) const NODE: NodeId = 3;
const IPV4: u16 = 0x0800;

type Received = Arc<Mutex<Vec<(Bytes, MacAddr)>>>;
type PromiscReceived = Arc<Mutex<Vec<(Bytes, MacAddr, PacketType)>>>;

pub(crate) fn remote() -> RemoteEndpoint {
    RemoteEndpoint::new(Ipv4Addr::LOCALHOST, 9000, 7)
}

pub(crate) fn frame(destination: MacAddr, payload: &[u8]) -> Bytes {
    EthernetHeader::new(PEER, destination, IPV4).to_frame(payload)
}

pub(crate) struct Harness {
    pub sim: Simulator,
    pub mock: Mock,
    pub device: RemoteNetDevice<Mock>,
    pub rx: Received,
    pub promisc: PromiscReceived,
}

impl Harness {
    pub fn new(config: DeviceConfig) -> Self {
        let sim = Simulator::new();
        let mock = Mock::new();
        let device = RemoteNetDevice::new(
            sim.handle(),
            mock.clone(),
            config.with_address(OWN).with_remote(remote()),
        );
        device.set_node(NODE);

        let rx = Received::default();
        let sink = Arc::clone(&rx);
        device.set_receive_callback(Arc::new(
            move |_: &dyn NetDevice, packet: Bytes, _: u16, source: MacAddr| {
                sink.lock().push((packet, source));
            },
        ));

        let promisc = PromiscReceived::default();
        let sink = Arc::clone(&promisc);
        device.set_promisc_receive_callback(Arc::new(
            move |_: &dyn NetDevice,
                  packet: Bytes,
                  _: u16,
                  _: MacAddr,
                  destination: MacAddr,
                  packet_type: PacketType| {
                sink.lock().push((packet, destination, packet_type));
            },
        ));

        Self { sim, mock, device, rx, promisc }
    }

    /// Runs the start event.
    pub fn started(config: DeviceConfig) -> Self {
        let mut harness = Self::new(config);
        harness.sim.run();
        assert!(harness.device.is_link_up());
        harness
    }

    /// Number of frames that went through dispatch, delivered or not.
    pub fn handled(&self) -> u64 {
        let stats = self.device.stats();
        stats.rx_frames() + stats.malformed() + stats.multicast_dropped()
    }

    /// Runs the simulation until `n` frames went through dispatch.
    pub fn pump(&mut self, n: u64) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.handled() < n {
            assert!(Instant::now() < deadline, "timed out waiting for {n} frames");
            if self.sim.wait_for_events(Duration::from_millis(50)) {
                self.sim.run();
            }
        }
    }

    pub fn rx_payloads(&self) -> Vec<Bytes> {
        self.rx.lock().iter().map(|(packet, _)| packet.clone()).collect()
    }

    pub fn promisc_types(&self) -> Vec<PacketType> {
        self.promisc.lock().iter().map(|(_, _, packet_type)| *packet_type).collect()
    }
}

/// Polls `f` until it returns `true`.
pub(crate) fn wait_until(mut f: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !f() {
        assert!(Instant::now() < deadline, "condition not met in time");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn classification_without_multicast() {
    let _ = tracing_subscriber::fmt::try_init();
    let mut h = Harness::started(DeviceConfig::default());

    h.mock.inject(frame(BROADCAST, b"broadcast"));
    h.mock.inject(frame(OWN, b"host"));
    h.mock.inject(frame(GROUP, b"multicast"));
    h.mock.inject(frame(OTHER, b"other"));
    h.pump(4);

    assert_eq!(
        h.promisc_types(),
        vec![PacketType::Broadcast, PacketType::Host, PacketType::OtherHost]
    );
    assert_eq!(h.rx_payloads(), vec![Bytes::from_static(b"broadcast"), Bytes::from_static(b"host")]);
    assert!(h.rx.lock().iter().all(|(_, source)| *source == PEER));
    assert_eq!(h.device.stats().multicast_dropped(), 1);
    assert_eq!(h.device.stats().rx_frames(), 3);
}

#[test]
fn classification_with_multicast() {
    let _ = tracing_subscriber::fmt::try_init();
    let mut h = Harness::new(DeviceConfig::default());
    h.device.set_is_multicast(true);
    h.sim.run();

    h.mock.inject(frame(BROADCAST, b"broadcast"));
    h.mock.inject(frame(OWN, b"host"));
    h.mock.inject(frame(GROUP, b"multicast"));
    h.mock.inject(frame(OTHER, b"other"));
    h.pump(4);

    assert_eq!(
        h.promisc_types(),
        vec![PacketType::Broadcast, PacketType::Host, PacketType::Multicast, PacketType::OtherHost]
    );
    assert_eq!(h.promisc.lock()[2].1, GROUP);
    assert_eq!(h.rx_payloads(), vec![Bytes::from_static(b"broadcast"), Bytes::from_static(b"host")]);
    assert_eq!(h.device.stats().multicast_dropped(), 0);
}

#[test]
fn frames_are_dispatched_in_read_order() {
    let _ = tracing_subscriber::fmt::try_init();
    let mut h = Harness::started(DeviceConfig::default());

    let payloads: Vec<Bytes> =
        (0..200u32).map(|n| Bytes::copy_from_slice(&n.to_be_bytes())).collect();
    for payload in &payloads {
        h.mock.inject(frame(OWN, payload));
    }
    h.pump(payloads.len() as u64);

    assert_eq!(h.rx_payloads(), payloads);
    assert_eq!(h.device.queue_len(), 0);
}

#[test]
fn undersized_frame_is_dropped() {
    let _ = tracing_subscriber::fmt::try_init();
    let mut h = Harness::started(DeviceConfig::default());

    h.mock.inject(vec![0xff; 13]);
    h.mock.inject(frame(BROADCAST, b"valid"));
    h.pump(2);

    assert_eq!(h.device.stats().malformed(), 1);
    assert_eq!(h.rx_payloads(), vec![Bytes::from_static(b"valid")]);
    assert_eq!(h.promisc.lock().len(), 1);
}

#[test]
fn header_only_frame_has_empty_payload() {
    let mut h = Harness::started(DeviceConfig::default());

    h.mock.inject(frame(OWN, b""));
    h.pump(1);

    assert_eq!(h.rx_payloads(), vec![Bytes::new()]);
}

#[test]
fn full_queue_drops_newest() {
    let _ = tracing_subscriber::fmt::try_init();
    let mut h = Harness::started(DeviceConfig::default().with_rx_queue_size(4));

    for n in 0..10u8 {
        h.mock.inject(frame(OWN, &[n]));
    }

    // Nothing is dispatched while the simulation is not running.
    wait_until(|| h.device.queue_len() + h.device.queue_drops() as usize == 10);
    assert_eq!(h.device.queue_len(), 4);
    assert_eq!(h.device.queue_drops(), 6);

    h.sim.run();
    let expected: Vec<Bytes> = (0..4u8).map(|n| Bytes::copy_from_slice(&[n])).collect();
    assert_eq!(h.rx_payloads(), expected);
}

#[test]
fn dispatch_runs_in_node_context() {
    let _ = tracing_subscriber::fmt::try_init();
    let mut h = Harness::started(DeviceConfig::default());

    let contexts = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&contexts);
    let handle = h.sim.handle();
    h.device.set_receive_callback(Arc::new(move |_: &dyn NetDevice, _: Bytes, _: u16, _: MacAddr| {
        seen.lock().push(handle.context());
    }));

    h.mock.inject(frame(OWN, b"one"));
    h.mock.inject(frame(BROADCAST, b"two"));
    h.pump(2);

    assert_eq!(*contexts.lock(), vec![NODE, NODE]);
}

#[test]
fn sink_can_reply_through_device() {
    let _ = tracing_subscriber::fmt::try_init();
    let mut h = Harness::started(DeviceConfig::default());

    h.device.set_receive_callback(Arc::new(
        |device: &dyn NetDevice, packet: Bytes, protocol: u16, source: MacAddr| {
            let mut reply = packet.to_vec();
            reply.reverse();
            device.send(reply.into(), source, protocol).unwrap();
        },
    ));

    h.mock.inject(frame(OWN, b"ping"));
    h.pump(1);

    let written = h.mock.written();
    assert_eq!(written.len(), 1);

    let header = EthernetHeader::parse(&written[0]).unwrap();
    assert_eq!(header, EthernetHeader::new(OWN, PEER, IPV4));
    assert_eq!(&written[0][EthernetHeader::len()..], b"gnip");
    assert_eq!(h.device.stats().tx_frames(), 1);
}

#[test]
fn mtu_bounds_header_and_payload() {
    let _ = tracing_subscriber::fmt::try_init();
    let h = Harness::started(DeviceConfig::default());
    assert_eq!(h.device.mtu(), 1400);

    let fits = Bytes::from(vec![0u8; 1400 - EthernetHeader::len()]);
    h.device.send(fits, PEER, IPV4).unwrap();

    let too_big = Bytes::from(vec![0u8; 1401 - EthernetHeader::len()]);
    let err = h.device.send(too_big, PEER, IPV4).unwrap_err();
    assert!(matches!(err, SendError::MtuExceeded { size: 1401, mtu: 1400 }));

    let written = h.mock.written();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].len(), 1400);
}

#[test]
fn send_from_uses_given_source() {
    let h = Harness::started(DeviceConfig::default());

    h.device.send_from(Bytes::from_static(b"spoofed"), OTHER, BROADCAST, 0x86dd).unwrap();

    let written = h.mock.written();
    let header = EthernetHeader::parse(&written[0]).unwrap();
    assert_eq!(header.source, OTHER);
    assert_eq!(header.destination, BROADCAST);
    assert_eq!(header.ethertype, 0x86dd);
}

#[test]
fn send_before_start_fails() {
    let _ = tracing_subscriber::fmt::try_init();
    let h = Harness::new(DeviceConfig::default());

    let err = h.device.send(Bytes::from_static(b"early"), PEER, IPV4).unwrap_err();
    assert!(matches!(err, SendError::LinkDown));
    assert!(h.mock.written().is_empty());
}

#[test]
fn transport_write_failure_is_returned() {
    let _ = tracing_subscriber::fmt::try_init();
    let h = Harness::started(DeviceConfig::default());

    h.mock.fail_writes(Some(io::ErrorKind::BrokenPipe));
    let err = h.device.send(Bytes::from_static(b"lost"), PEER, IPV4).unwrap_err();
    assert!(matches!(err, SendError::Io(ref e) if e.kind() == io::ErrorKind::BrokenPipe));
    assert_eq!(h.device.stats().tx_frames(), 0);
}

#[test]
fn capability_surface() {
    let h = Harness::new(DeviceConfig::default());
    let device: &dyn NetDevice = &h.device;

    assert_eq!(device.address(), OWN);
    assert_eq!(device.broadcast(), BROADCAST);
    assert!(device.is_broadcast());
    assert!(!device.is_multicast());
    assert!(!device.is_point_to_point());
    assert!(!device.is_bridge());
    assert!(device.needs_arp());
    assert!(device.supports_send_from());
    assert_eq!(device.node(), Some(NODE));
    assert_eq!(device.if_index(), 0);

    device.set_if_index(2);
    assert_eq!(device.if_index(), 2);
    assert!(device.set_mtu(9000));
    assert_eq!(device.mtu(), 9000);
    device.set_is_broadcast(false);
    assert!(!device.is_broadcast());

    assert_eq!(
        device.multicast_v4(Ipv4Addr::new(224, 129, 2, 3)),
        MacAddr(0x01, 0x00, 0x5e, 0x01, 0x02, 0x03)
    );
    assert_eq!(
        device.multicast_v6("ff02::1:ff00:1".parse().unwrap()),
        MacAddr(0x33, 0x33, 0xff, 0x00, 0x00, 0x01)
    );
}
