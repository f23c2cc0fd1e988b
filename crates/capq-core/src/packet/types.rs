//! Packet type definitions

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

bitflags! {
    /// Protocol layers recognised in a captured frame's headers
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ProtocolTags: u16 {
        /// Ethernet II framing
        const ETHERNET = 0b0000_0000_0001;
        /// 802.1Q VLAN tag present
        const VLAN     = 0b0000_0000_0010;
        /// ARP
        const ARP      = 0b0000_0000_0100;
        /// IPv4
        const IPV4     = 0b0000_0000_1000;
        /// IPv6
        const IPV6     = 0b0000_0001_0000;
        /// TCP
        const TCP      = 0b0000_0010_0000;
        /// UDP
        const UDP      = 0b0000_0100_0000;
        /// ICMP
        const ICMP     = 0b0000_1000_0000;
        /// ICMPv6
        const ICMPV6   = 0b0001_0000_0000;
    }
}

/// Protocol selector used by filter rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// 802.1Q tagged frames
    Vlan,
    /// ARP
    Arp,
    /// IPv4
    Ipv4,
    /// IPv6
    Ipv6,
    /// TCP
    Tcp,
    /// UDP
    Udp,
    /// ICMP
    Icmp,
    /// ICMPv6
    Icmpv6,
}

impl Protocol {
    /// Tag bit this protocol corresponds to
    pub fn tag(self) -> ProtocolTags {
        match self {
            Protocol::Vlan => ProtocolTags::VLAN,
            Protocol::Arp => ProtocolTags::ARP,
            Protocol::Ipv4 => ProtocolTags::IPV4,
            Protocol::Ipv6 => ProtocolTags::IPV6,
            Protocol::Tcp => ProtocolTags::TCP,
            Protocol::Udp => ProtocolTags::UDP,
            Protocol::Icmp => ProtocolTags::ICMP,
            Protocol::Icmpv6 => ProtocolTags::ICMPV6,
        }
    }

    /// Lowercase protocol name
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Vlan => "vlan",
            Protocol::Arp => "arp",
            Protocol::Ipv4 => "ipv4",
            Protocol::Ipv6 => "ipv6",
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Icmp => "icmp",
            Protocol::Icmpv6 => "icmpv6",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header-level view of a frame: enough to make admission decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketSummary {
    /// Recognised protocol layers
    pub tags: ProtocolTags,
    /// Network-layer source address
    pub src_ip: Option<IpAddr>,
    /// Network-layer destination address
    pub dst_ip: Option<IpAddr>,
    /// Transport source port (TCP/UDP only)
    pub src_port: Option<u16>,
    /// Transport destination port (TCP/UDP only)
    pub dst_port: Option<u16>,
}

impl PacketSummary {
    /// Check whether the frame carries the given protocol
    pub fn has(&self, protocol: Protocol) -> bool {
        self.tags.contains(protocol.tag())
    }

    /// Check whether either endpoint uses `port`
    pub fn touches_port(&self, port: u16) -> bool {
        self.src_port == Some(port) || self.dst_port == Some(port)
    }

    /// Check whether either endpoint is `addr`
    pub fn touches_host(&self, addr: IpAddr) -> bool {
        self.src_ip == Some(addr) || self.dst_ip == Some(addr)
    }
}
