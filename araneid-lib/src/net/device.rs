use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};

use super::packet::Packet;
use super::transmission::Transmission;
use crate::sys::Bridge;

/// A simulated host-side network endpoint.
///
/// `send` is how a frame arriving from the host (via a bridge) enters the
/// emulated network; `receive` is how a frame that has crossed a
/// transmission re-enters the host side. The two are deliberately
/// asymmetric: sending requires a routing decision (which transmission
/// leads to this destination), receiving does not (it already arrived).
pub trait Device: Send + Sync {
    fn send(&self, packet: Packet);
    fn receive(&self, packet: Packet);
    fn add_transmission(&self, dst: Ipv4Addr, transmission: Arc<Transmission>);
}

/// The workspace's one concrete `Device`: an IPv4-keyed routing table of
/// outgoing transmissions, plus an optional bridge that frames arriving
/// from the network are handed to.
pub struct CommonDevice {
    name: String,
    outgoing: Mutex<HashMap<Ipv4Addr, Arc<Transmission>>>,
    bridge: Mutex<Option<Arc<dyn Bridge>>>,
}

impl CommonDevice {
    pub fn new(name: impl Into<String>) -> Self {
        CommonDevice { name: name.into(), outgoing: Mutex::new(HashMap::new()), bridge: Mutex::new(None) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attach_bridge(&self, bridge: Arc<dyn Bridge>) {
        *self.bridge.lock().unwrap() = Some(bridge);
    }
}

impl Device for CommonDevice {
    fn send(&self, packet: Packet) {
        let Some(dst) = packet.dst_ipv4() else {
            tracing::error!(device = %self.name, "packet has no destination address, cannot route");
            return;
        };
        let transmission = self.outgoing.lock().unwrap().get(&dst).cloned();
        match transmission {
            Some(transmission) => transmission.send_to_network(packet),
            None => tracing::error!(device = %self.name, %dst, "no route to destination"),
        }
    }

    fn receive(&self, packet: Packet) {
        match self.bridge.lock().unwrap().as_ref() {
            Some(bridge) => {
                if let Err(err) = bridge.write_frame(packet.as_bytes()) {
                    tracing::error!(device = %self.name, %err, "failed to write frame to bridge");
                }
            }
            None => tracing::error!(device = %self.name, "no bridge attached, dropping inbound packet"),
        }
    }

    fn add_transmission(&self, dst: Ipv4Addr, transmission: Arc<Transmission>) {
        self.outgoing.lock().unwrap().insert(dst, transmission);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::loss::NoPacketLoss;
    use crate::time::TimeDelta;
    use crate::units::{DataRate, DataSize};

    #[test]
    fn send_with_no_route_is_a_no_op() {
        let device = CommonDevice::new("eth0");
        device.send(Packet::new(b"\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x08\x00"));
    }

    #[test]
    fn add_transmission_registers_a_route() {
        let device = CommonDevice::new("eth0");
        let transmission = Arc::new(Transmission::new(
            Box::new(NoPacketLoss),
            TimeDelta::zero(),
            DataRate::from_mbps(10.0),
            DataSize::from_bytes(1500),
        ));
        device.add_transmission(Ipv4Addr::new(10, 0, 0, 2), transmission);
        assert_eq!(device.outgoing.lock().unwrap().len(), 1);
    }
}
