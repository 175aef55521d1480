use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use araneid_lib::net::{CommonDevice, Device, NoPacketLoss, Packet, RandomPacketLoss, Transmission};
use araneid_lib::time::TimeDelta;
use araneid_lib::units::{DataRate, DataSize};
use araneid_lib::Scheduler;

struct RecordingDevice {
    arrivals: Mutex<Vec<Instant>>,
}

impl RecordingDevice {
    fn new() -> Self {
        RecordingDevice { arrivals: Mutex::new(Vec::new()) }
    }
}

impl Device for RecordingDevice {
    fn send(&self, _packet: Packet) {}

    fn receive(&self, _packet: Packet) {
        self.arrivals.lock().unwrap().push(Instant::now());
    }

    fn add_transmission(&self, _dst: Ipv4Addr, _transmission: Arc<Transmission>) {}
}

/// All three scenarios share the process-wide scheduler singleton, so they
/// run as one test rather than three: parallel `#[test]` threads would race
/// each other's `start`/`stop` calls the same way `scheduler_invariants.rs`
/// avoids that for the scheduler's own tests.
#[test]
fn transmission_end_to_end_scenarios() {
    let scheduler = Scheduler::global();
    scheduler.start(1);

    bandwidth_and_delay_fidelity();
    total_loss_yields_no_arrivals();
    buffer_overflow_tail_drops();

    scheduler.stop();
}

/// Scenario: loss=0, delay=20ms, rate=1Mbps, buffer=10KiB, five 1000-byte
/// packets sent back-to-back. Each 1000-byte (8000-bit) packet takes 8ms to
/// clear the bottleneck, and packets serialize behind one another on the
/// link, so arrivals land at 20ms + k*8ms for k in 1..=5.
fn bandwidth_and_delay_fidelity() {
    let recorder = Arc::new(RecordingDevice::new());
    let transmission = Arc::new(Transmission::new(
        Box::new(NoPacketLoss),
        TimeDelta::millis(20),
        DataRate::from_mbps(1.0),
        DataSize::from_bytes(10 * 1024),
    ));
    transmission.connect(recorder.clone() as Arc<dyn Device>);

    let sent_at = Instant::now();
    for _ in 0..5 {
        transmission.send_to_network(Packet::new(&[0u8; 1000]));
    }

    std::thread::sleep(Duration::from_millis(300));

    let arrivals = recorder.arrivals.lock().unwrap();
    assert_eq!(arrivals.len(), 5, "all five packets should eventually arrive");

    let tolerance = Duration::from_millis(20);
    for (k, arrival) in arrivals.iter().enumerate() {
        let expected = Duration::from_millis(20) + Duration::from_millis(8) * (k as u32 + 1);
        let actual = arrival.duration_since(sent_at);
        assert!(
            actual.abs_diff(expected) <= tolerance,
            "packet {k} arrived at {actual:?}, expected near {expected:?}"
        );
    }
}

/// Scenario: loss rate 1.0 drops every packet before it ever reaches the
/// propagation delay stage.
fn total_loss_yields_no_arrivals() {
    let recorder = Arc::new(RecordingDevice::new());
    let transmission = Arc::new(Transmission::new(
        Box::new(RandomPacketLoss::new(1.0).unwrap()),
        TimeDelta::zero(),
        DataRate::from_mbps(100.0),
        DataSize::from_bytes(64 * 1024),
    ));
    transmission.connect(recorder.clone() as Arc<dyn Device>);

    for _ in 0..10 {
        transmission.send_to_network(Packet::new(&[0u8; 500]));
    }

    std::thread::sleep(Duration::from_millis(50));
    assert!(recorder.arrivals.lock().unwrap().is_empty(), "loss=1.0 must drop every packet");
}

/// Scenario: buffer=2000 bytes, three 1000-byte packets sent back-to-back
/// with no propagation delay. The bottleneck guard admits the first
/// (cached 0 -> 1000) and tail-drops the other two (cached+size would meet
/// or exceed the 2000-byte capacity), so exactly one of the three is ever
/// handed to the receiver.
fn buffer_overflow_tail_drops() {
    let received = Arc::new(AtomicUsize::new(0));
    let device = Arc::new(CommonDevice::new("overflow-sink"));
    let sink = Arc::new(CountingSink { received: received.clone() });
    device.attach_bridge(sink);

    let transmission = Arc::new(Transmission::new(
        Box::new(NoPacketLoss),
        TimeDelta::zero(),
        DataRate::from_kbps(8_000.0),
        DataSize::from_bytes(2000),
    ));
    transmission.connect(device as Arc<dyn Device>);

    for _ in 0..3 {
        transmission.send_to_network(Packet::new(&[0u8; 1000]));
    }

    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(received.load(Ordering::SeqCst), 1, "exactly one of three packets should clear the buffer");
}

struct CountingSink {
    received: Arc<AtomicUsize>,
}

impl araneid_lib::sys::Bridge for CountingSink {
    fn interface_name(&self) -> &str {
        "counting-sink"
    }

    fn write_frame(&self, _frame: &[u8]) -> araneid_lib::Result<()> {
        self.received.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
