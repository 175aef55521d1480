use std::sync::{Arc, Mutex};

use super::device::Device;
use super::loss::PacketLoss;
use super::packet::Packet;
use crate::callback::boxed;
use crate::scheduler::Scheduler;
use crate::time::{TimeDelta, TimePoint};
use crate::units::{DataRate, DataSize};

struct BufferState {
    cached: DataSize,
    capacity: DataSize,
}

struct RateState {
    rate: DataRate,
    /// When the bottleneck link next becomes free. `None` until the first
    /// packet is admitted. A packet admitted while the link is still busy
    /// serializes behind it rather than completing independently, so a
    /// burst of same-size packets departs at a steady `size / rate` cadence
    /// instead of all landing at once.
    busy_until: Option<TimePoint>,
}

/// One direction of a link between two devices: loss → propagation delay
/// → bandwidth-limited, capacity-bounded queue.
///
/// Each mutable concern — bandwidth, the in-flight buffer, the receiver —
/// lives behind its own mutex, and the three stages of the state machine
/// (`send_to_network`, `in_flight`, `receive_from_network`) never hold more
/// than one of them at a time. `cached` and `capacity` share a single
/// mutex because admission has to read and write both together, or two
/// packets could each see room for themselves and together overflow it.
pub struct Transmission {
    loss: Box<dyn PacketLoss>,
    delay: TimeDelta,
    rate: Mutex<RateState>,
    buffer: Mutex<BufferState>,
    receiver: Mutex<Option<Arc<dyn Device>>>,
}

impl Transmission {
    pub fn new(loss: Box<dyn PacketLoss>, delay: TimeDelta, rate: DataRate, capacity: DataSize) -> Self {
        Transmission {
            loss,
            delay,
            rate: Mutex::new(RateState { rate, busy_until: None }),
            buffer: Mutex::new(BufferState { cached: DataSize::zero(), capacity }),
            receiver: Mutex::new(None),
        }
    }

    pub fn connect(&self, receiver: Arc<dyn Device>) {
        *self.receiver.lock().unwrap() = Some(receiver);
    }

    pub fn disconnect(&self) {
        *self.receiver.lock().unwrap() = None;
    }

    pub fn set_rate(&self, rate: DataRate) {
        self.rate.lock().unwrap().rate = rate;
    }

    pub fn set_capacity(&self, capacity: DataSize) {
        self.buffer.lock().unwrap().capacity = capacity;
    }

    pub fn propagation_delay(&self) -> TimeDelta {
        self.delay
    }

    /// Entry point for a packet leaving a device toward this link's peer.
    /// A disconnected transmission drops the packet silently — there is no
    /// peer to log an error about yet, since "disconnected" just means
    /// nothing has been wired up on this side.
    pub fn send_to_network(self: &Arc<Self>, packet: Packet) {
        if self.receiver.lock().unwrap().is_none() {
            return;
        }
        if self.loss.should_drop() {
            tracing::info!(bytes = packet.size(), "packet dropped to loss");
            return;
        }

        let transmission = Arc::clone(self);
        let callback = boxed(move || transmission.in_flight(packet.clone()));
        Scheduler::global().schedule_once(self.delay, callback);
    }

    fn in_flight(self: &Arc<Self>, packet: Packet) {
        let size = DataSize::from_bytes(packet.size() as u64);

        {
            let mut state = self.buffer.lock().unwrap();
            if state.cached + size >= state.capacity {
                tracing::info!(bytes = packet.size(), "packet tail-dropped, buffer full");
                return;
            }
            state.cached += size;
        }

        let wait = {
            let mut state = self.rate.lock().unwrap();
            let now = TimePoint::now();
            let start = match state.busy_until {
                Some(busy) if busy > now => busy,
                _ => now,
            };
            let departure = start + size.duration_at(state.rate);
            state.busy_until = Some(departure);
            departure.duration_since(now)
        };

        let transmission = Arc::clone(self);
        let callback = boxed(move || transmission.receive_from_network(packet.clone(), size));
        Scheduler::global().schedule_once(wait, callback);
    }

    fn receive_from_network(&self, packet: Packet, size: DataSize) {
        {
            let mut state = self.buffer.lock().unwrap();
            state.cached = state.cached.saturating_sub(size);
        }

        match self.receiver.lock().unwrap().as_ref() {
            Some(receiver) => receiver.receive(packet),
            None => tracing::error!("transmission disconnected before packet arrived"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::loss::NoPacketLoss;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingDevice {
        received: Arc<AtomicUsize>,
    }

    impl Device for CountingDevice {
        fn send(&self, _packet: Packet) {}
        fn receive(&self, _packet: Packet) {
            self.received.fetch_add(1, Ordering::SeqCst);
        }
        fn add_transmission(&self, _dst: std::net::Ipv4Addr, _transmission: Arc<Transmission>) {}
    }

    #[test]
    fn disconnected_transmission_drops_silently() {
        let transmission = Arc::new(Transmission::new(
            Box::new(NoPacketLoss),
            TimeDelta::zero(),
            DataRate::from_mbps(1.0),
            DataSize::from_bytes(10),
        ));
        transmission.send_to_network(Packet::new(&[0u8; 5]));
    }

    #[test]
    fn buffer_state_admits_within_capacity() {
        let transmission = Arc::new(Transmission::new(
            Box::new(NoPacketLoss),
            TimeDelta::zero(),
            DataRate::from_mbps(1.0),
            DataSize::from_bytes(10),
        ));
        let received = Arc::new(AtomicUsize::new(0));
        transmission.connect(Arc::new(CountingDevice { received: received.clone() }));
        transmission.send_to_network(Packet::new(&[0u8; 5]));
        let state = transmission.buffer.lock().unwrap();
        assert_eq!(state.cached, DataSize::zero());
    }
}
