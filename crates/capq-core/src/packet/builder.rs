//! Synthetic frame builder
//!
//! Produces well-formed Ethernet frames for feeding in-memory capture
//! backends, benchmarks and tests. Checksums are left zero.

use bytes::{BufMut, Bytes, BytesMut};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

const ETHERTYPE_IPV4: u16 = 0x0800;
const ETHERTYPE_ARP: u16 = 0x0806;
const ETHERTYPE_VLAN: u16 = 0x8100;
const ETHERTYPE_IPV6: u16 = 0x86DD;

const SRC_MAC: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x00, 0x01];
const DST_MAC: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x00, 0x02];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Tcp,
    Udp,
    Icmp,
    Arp,
}

/// Builder for Ethernet frames
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    kind: Kind,
    src_ip: IpAddr,
    dst_ip: IpAddr,
    src_port: u16,
    dst_port: u16,
    vlan: Option<u16>,
    payload: Vec<u8>,
}

impl FrameBuilder {
    fn new(kind: Kind, v6: bool) -> Self {
        let (src_ip, dst_ip) = if v6 {
            (
                IpAddr::V6(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1)),
                IpAddr::V6(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 2)),
            )
        } else {
            (
                IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
                IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
            )
        };
        Self {
            kind,
            src_ip,
            dst_ip,
            src_port: 12345,
            dst_port: 80,
            vlan: None,
            payload: Vec::new(),
        }
    }

    /// IPv4 TCP frame
    pub fn tcp_v4() -> Self {
        Self::new(Kind::Tcp, false)
    }

    /// IPv4 UDP frame
    pub fn udp_v4() -> Self {
        Self::new(Kind::Udp, false)
    }

    /// IPv4 ICMP echo request
    pub fn icmp_v4() -> Self {
        Self::new(Kind::Icmp, false)
    }

    /// IPv6 TCP frame
    pub fn tcp_v6() -> Self {
        Self::new(Kind::Tcp, true)
    }

    /// IPv6 UDP frame
    pub fn udp_v6() -> Self {
        Self::new(Kind::Udp, true)
    }

    /// ARP request
    pub fn arp() -> Self {
        Self::new(Kind::Arp, false)
    }

    /// Set source address. The address family of the frame follows it.
    pub fn src_ip(mut self, ip: impl Into<IpAddr>) -> Self {
        self.src_ip = ip.into();
        self
    }

    /// Set destination address
    pub fn dst_ip(mut self, ip: impl Into<IpAddr>) -> Self {
        self.dst_ip = ip.into();
        self
    }

    /// Set source port
    pub fn src_port(mut self, port: u16) -> Self {
        self.src_port = port;
        self
    }

    /// Set destination port
    pub fn dst_port(mut self, port: u16) -> Self {
        self.dst_port = port;
        self
    }

    /// Add an 802.1Q tag
    pub fn vlan(mut self, id: u16) -> Self {
        self.vlan = Some(id & 0x0FFF);
        self
    }

    /// Set payload
    pub fn payload(mut self, data: &[u8]) -> Self {
        self.payload = data.to_vec();
        self
    }

    /// Build the frame
    pub fn build(self) -> Bytes {
        let mut frame = BytesMut::with_capacity(64 + self.payload.len());
        frame.put_slice(&DST_MAC);
        frame.put_slice(&SRC_MAC);

        if let Some(id) = self.vlan {
            frame.put_u16(ETHERTYPE_VLAN);
            frame.put_u16(id);
        }

        if self.kind == Kind::Arp {
            frame.put_u16(ETHERTYPE_ARP);
            self.put_arp(&mut frame);
            return frame.freeze();
        }

        let transport = self.transport_segment();
        match (self.src_ip, self.dst_ip) {
            (IpAddr::V6(src), dst) => {
                let dst = match dst {
                    IpAddr::V6(d) => d,
                    IpAddr::V4(_) => Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 2),
                };
                frame.put_u16(ETHERTYPE_IPV6);
                frame.put_u32(0x6000_0000); // version, traffic class, flow label
                frame.put_u16(transport.len() as u16);
                frame.put_u8(self.next_header(true));
                frame.put_u8(64); // hop limit
                frame.put_slice(&src.octets());
                frame.put_slice(&dst.octets());
            }
            (IpAddr::V4(src), dst) => {
                let dst = match dst {
                    IpAddr::V4(d) => d,
                    IpAddr::V6(_) => Ipv4Addr::new(10, 0, 0, 2),
                };
                frame.put_u16(ETHERTYPE_IPV4);
                frame.put_u8(0x45); // version 4, IHL 5
                frame.put_u8(0);
                frame.put_u16((20 + transport.len()) as u16);
                frame.put_u16(0); // identification
                frame.put_u16(0x4000); // DF
                frame.put_u8(64); // TTL
                frame.put_u8(self.next_header(false));
                frame.put_u16(0); // checksum
                frame.put_slice(&src.octets());
                frame.put_slice(&dst.octets());
            }
        }
        frame.put_slice(&transport);
        frame.freeze()
    }

    fn next_header(&self, v6: bool) -> u8 {
        match (self.kind, v6) {
            (Kind::Tcp, _) => 6,
            (Kind::Udp, _) => 17,
            (Kind::Icmp, false) => 1,
            (Kind::Icmp, true) => 58,
            (Kind::Arp, _) => 0,
        }
    }

    fn transport_segment(&self) -> BytesMut {
        let mut seg = BytesMut::with_capacity(20 + self.payload.len());
        match self.kind {
            Kind::Tcp => {
                seg.put_u16(self.src_port);
                seg.put_u16(self.dst_port);
                seg.put_u32(1); // sequence
                seg.put_u32(0); // acknowledgment
                seg.put_u8(0x50); // data offset 5
                seg.put_u8(0x18); // PSH, ACK
                seg.put_u16(0xFFFF); // window
                seg.put_u16(0); // checksum
                seg.put_u16(0); // urgent pointer
            }
            Kind::Udp => {
                seg.put_u16(self.src_port);
                seg.put_u16(self.dst_port);
                seg.put_u16((8 + self.payload.len()) as u16);
                seg.put_u16(0);
            }
            Kind::Icmp => {
                let echo_request = if self.src_ip.is_ipv6() { 128 } else { 8 };
                seg.put_u8(echo_request);
                seg.put_u8(0);
                seg.put_u16(0);
                seg.put_u32(0x0001_0001); // identifier, sequence
            }
            Kind::Arp => {}
        }
        seg.put_slice(&self.payload);
        seg
    }

    fn put_arp(&self, frame: &mut BytesMut) {
        let sender = match self.src_ip {
            IpAddr::V4(a) => a,
            IpAddr::V6(_) => Ipv4Addr::new(10, 0, 0, 1),
        };
        let target = match self.dst_ip {
            IpAddr::V4(a) => a,
            IpAddr::V6(_) => Ipv4Addr::new(10, 0, 0, 2),
        };
        frame.put_u16(1); // Ethernet
        frame.put_u16(ETHERTYPE_IPV4);
        frame.put_u8(6);
        frame.put_u8(4);
        frame.put_u16(1); // request
        frame.put_slice(&SRC_MAC);
        frame.put_slice(&sender.octets());
        frame.put_slice(&[0u8; 6]);
        frame.put_slice(&target.octets());
    }
}
