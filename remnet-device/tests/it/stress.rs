//! Randomized restarts and teardowns under a steady stream of frames.

use std::time::{Duration, Instant};

use rand::{rngs::StdRng, Rng, SeedableRng};
use remnet_device::{DeviceConfig, LinkState};
use remnet_wire::BROADCAST;

use crate::bridge::{frame, Harness, GROUP, OTHER, OWN};

const ROUNDS: usize = 200;

/// Every injected frame is either still unread, dropped at the queue, discarded on stop or
/// accounted for by dispatch.
fn assert_accounted(h: &Harness, injected: u64) {
    let stats = h.device.stats();
    let accounted = h.handled()
        + h.device.queue_drops()
        + stats.discarded()
        + h.mock.pending_reads() as u64;
    assert_eq!(
        injected,
        accounted,
        "rx {} malformed {} multicast {} queue drops {} discarded {} unread {}",
        stats.rx_frames(),
        stats.malformed(),
        stats.multicast_dropped(),
        h.device.queue_drops(),
        stats.discarded(),
        h.mock.pending_reads(),
    );
}

fn inject_random(h: &Harness, rng: &mut StdRng) -> u64 {
    let n = rng.gen_range(0..20);
    for _ in 0..n {
        if rng.gen_bool(0.2) {
            let len = rng.gen_range(1..14);
            let junk: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            h.mock.inject(junk);
        } else {
            let destination = [OWN, BROADCAST, GROUP, OTHER][rng.gen_range(0..4)];
            let payload = vec![0x42; rng.gen_range(0..64)];
            h.mock.inject(frame(destination, &payload));
        }
    }
    n
}

fn stop_and_settle(h: &mut Harness) {
    h.device.stop(Duration::ZERO);
    h.sim.run();
    assert_eq!(h.device.link_state(), LinkState::Down);
    assert_eq!(h.device.queue_len(), 0);
}

fn restart(h: &mut Harness) {
    h.device.start(Duration::ZERO);
    h.sim.run();
    assert_eq!(h.device.link_state(), LinkState::Up);
}

#[test]
fn frames_are_accounted_across_restarts() {
    let _ = tracing_subscriber::fmt::try_init();
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut h = Harness::started(DeviceConfig::default().with_rx_queue_size(8));
    let mut injected = 0;

    for _ in 0..ROUNDS {
        injected += inject_random(&h, &mut rng);

        if rng.gen_bool(0.5) && h.sim.wait_for_events(Duration::from_millis(2)) {
            h.sim.run();
        }

        match rng.gen_range(0..10) {
            0..=1 => {
                stop_and_settle(&mut h);
                assert_accounted(&h, injected);
                restart(&mut h);
            }
            2 => {
                h.device.dispose();
                h.sim.run();
                assert_eq!(h.device.queue_len(), 0);
                assert_accounted(&h, injected);
                restart(&mut h);
            }
            _ => {}
        }
    }

    stop_and_settle(&mut h);
    assert_accounted(&h, injected);

    // Frames left unread while stopped are picked up by the next reader.
    let unread = h.mock.pending_reads() as u64;
    let target = h.handled() + h.device.queue_drops();
    restart(&mut h);
    for _ in 0..4 {
        h.mock.inject(frame(OWN, b"tail"));
    }
    injected += 4;

    let deadline = Instant::now() + Duration::from_secs(5);
    while h.handled() + h.device.queue_drops() < target + unread + 4 {
        assert!(Instant::now() < deadline, "frames never drained");
        if h.sim.wait_for_events(Duration::from_millis(20)) {
            h.sim.run();
        }
    }

    stop_and_settle(&mut h);
    assert_accounted(&h, injected);
    assert_eq!(h.mock.pending_reads(), 0);
    assert!(h.device.stats().rx_frames() > 0);
}
