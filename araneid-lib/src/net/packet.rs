use std::net::Ipv4Addr;

use super::buffer::Buffer;

const ETH_HEADER_LEN: usize = 14;
const VLAN_TAG_LEN: usize = 4;
const ETHERTYPE_VLAN: u16 = 0x8100;
const ETHERTYPE_IPV4: u16 = 0x0800;
const ETHERTYPE_IPV6: u16 = 0x86dd;

/// An immutable Ethernet frame moving through the simulated network.
///
/// Header fields are parsed once at construction, not lazily on each
/// accessor call: a malformed or short frame leaves `src`/`dst` empty and
/// logs a parse warning at the point the packet enters the system, rather
/// than surprising a caller with a `None` deep into routing.
#[derive(Clone)]
pub struct Packet {
    buffer: Buffer,
    src: Option<Ipv4Addr>,
    dst: Option<Ipv4Addr>,
}

impl Packet {
    pub fn new(bytes: &[u8]) -> Packet {
        let buffer = Buffer::new(bytes);
        let (src, dst) = parse_addresses(bytes);
        Packet { buffer, src, dst }
    }

    pub fn from_buffer(buffer: Buffer) -> Packet {
        let (src, dst) = parse_addresses(buffer.as_slice());
        Packet { buffer, src, dst }
    }

    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn src_ipv4(&self) -> Option<Ipv4Addr> {
        self.src
    }

    pub fn dst_ipv4(&self) -> Option<Ipv4Addr> {
        self.dst
    }

    pub fn copy_data(&self) -> Vec<u8> {
        self.buffer.as_slice().to_vec()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_slice()
    }
}

fn parse_addresses(data: &[u8]) -> (Option<Ipv4Addr>, Option<Ipv4Addr>) {
    if data.len() < ETH_HEADER_LEN {
        tracing::warn!(len = data.len(), "frame shorter than an Ethernet header");
        return (None, None);
    }

    let mut ethertype = u16::from_be_bytes([data[12], data[13]]);
    let mut offset = ETH_HEADER_LEN;

    if ethertype == ETHERTYPE_VLAN {
        if data.len() < offset + VLAN_TAG_LEN {
            tracing::warn!("frame truncated inside 802.1Q tag");
            return (None, None);
        }
        ethertype = u16::from_be_bytes([data[offset + 2], data[offset + 3]]);
        offset += VLAN_TAG_LEN;
    }

    match ethertype {
        ETHERTYPE_IPV4 => parse_ipv4(&data[offset..]),
        ETHERTYPE_IPV6 => {
            tracing::warn!("IPv6 payload unsupported");
            (None, None)
        }
        other => {
            tracing::warn!(ethertype = format_args!("{other:#06x}"), "unsupported EtherType");
            (None, None)
        }
    }
}

fn parse_ipv4(data: &[u8]) -> (Option<Ipv4Addr>, Option<Ipv4Addr>) {
    if data.len() < 20 {
        tracing::warn!("frame truncated inside IPv4 header");
        return (None, None);
    }
    let version = data[0] >> 4;
    let ihl = (data[0] & 0x0f) as usize * 4;
    if version != 4 || ihl < 20 || ihl > data.len() {
        tracing::warn!(version, ihl, "malformed IPv4 header");
        return (None, None);
    }
    let src = Ipv4Addr::new(data[12], data[13], data[14], data[15]);
    let dst = Ipv4Addr::new(data[16], data[17], data[18], data[19]);
    (Some(src), Some(dst))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eth_frame(ethertype: u16, payload: &[u8]) -> Vec<u8> {
        let mut frame = vec![0u8; ETH_HEADER_LEN];
        frame[0..6].copy_from_slice(&[0xff; 6]);
        frame[6..12].copy_from_slice(&[0x02, 0, 0, 0, 0, 1]);
        frame[12..14].copy_from_slice(&ethertype.to_be_bytes());
        frame.extend_from_slice(payload);
        frame
    }

    fn ipv4_payload(src: [u8; 4], dst: [u8; 4]) -> Vec<u8> {
        let mut ipv4 = vec![0u8; 20];
        ipv4[0] = 0x45;
        ipv4[12..16].copy_from_slice(&src);
        ipv4[16..20].copy_from_slice(&dst);
        ipv4
    }

    #[test]
    fn parses_plain_ipv4_frame() {
        let frame = eth_frame(ETHERTYPE_IPV4, &ipv4_payload([10, 0, 0, 1], [10, 0, 0, 2]));
        let packet = Packet::new(&frame);
        assert_eq!(packet.src_ipv4(), Some(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(packet.dst_ipv4(), Some(Ipv4Addr::new(10, 0, 0, 2)));
    }

    #[test]
    fn parses_vlan_tagged_ipv4_frame() {
        let mut vlan_payload = vec![0x00, 42];
        vlan_payload.extend_from_slice(&ETHERTYPE_IPV4.to_be_bytes());
        vlan_payload.extend_from_slice(&ipv4_payload([10, 0, 0, 1], [10, 0, 0, 2]));

        let frame = eth_frame(ETHERTYPE_VLAN, &vlan_payload);
        let packet = Packet::new(&frame);
        assert_eq!(packet.dst_ipv4(), Some(Ipv4Addr::new(10, 0, 0, 2)));
    }

    #[test]
    fn unsupported_ethertype_leaves_addresses_empty() {
        let frame = eth_frame(0x0806, &[]);
        let packet = Packet::new(&frame);
        assert_eq!(packet.src_ipv4(), None);
        assert_eq!(packet.dst_ipv4(), None);
    }

    #[test]
    fn truncated_frame_leaves_addresses_empty() {
        let packet = Packet::new(&[0u8; 4]);
        assert_eq!(packet.src_ipv4(), None);
        assert_eq!(packet.dst_ipv4(), None);
        assert_eq!(packet.size(), 4);
    }
}
