//! Header classification
//!
//! Walks the Ethernet, network and transport headers of a frame with
//! `pnet_packet` views. Payloads are never decoded.

use super::types::{PacketSummary, ProtocolTags};
use pnet_packet::ethernet::{EtherType, EtherTypes, EthernetPacket};
use pnet_packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};
use pnet_packet::ipv4::Ipv4Packet;
use pnet_packet::ipv6::Ipv6Packet;
use pnet_packet::tcp::TcpPacket;
use pnet_packet::udp::UdpPacket;
use pnet_packet::vlan::VlanPacket;
use pnet_packet::Packet;
use std::net::IpAddr;

/// Classify an Ethernet frame.
///
/// Truncated or unknown headers stop the walk; whatever was recognised up to
/// that point is returned.
pub fn classify(frame: &[u8]) -> PacketSummary {
    let mut summary = PacketSummary::default();

    let Some(eth) = EthernetPacket::new(frame) else {
        return summary;
    };
    summary.tags |= ProtocolTags::ETHERNET;

    let mut ethertype = eth.get_ethertype();
    let mut payload = eth.payload();

    // Single 802.1Q tag; stacked tags are classified as VLAN only.
    if ethertype == EtherTypes::Vlan {
        summary.tags |= ProtocolTags::VLAN;
        let Some(vlan) = VlanPacket::new(payload) else {
            return summary;
        };
        ethertype = vlan.get_ethertype();
        payload = &payload[VlanPacket::minimum_packet_size()..];
    }

    classify_network(ethertype, payload, &mut summary);
    summary
}

fn classify_network(ethertype: EtherType, payload: &[u8], summary: &mut PacketSummary) {
    match ethertype {
        EtherTypes::Arp => summary.tags |= ProtocolTags::ARP,
        EtherTypes::Ipv4 => {
            let Some(ip) = Ipv4Packet::new(payload) else {
                return;
            };
            summary.tags |= ProtocolTags::IPV4;
            summary.src_ip = Some(IpAddr::V4(ip.get_source()));
            summary.dst_ip = Some(IpAddr::V4(ip.get_destination()));
            classify_transport(ip.get_next_level_protocol(), ip.payload(), summary);
        }
        EtherTypes::Ipv6 => {
            let Some(ip) = Ipv6Packet::new(payload) else {
                return;
            };
            summary.tags |= ProtocolTags::IPV6;
            summary.src_ip = Some(IpAddr::V6(ip.get_source()));
            summary.dst_ip = Some(IpAddr::V6(ip.get_destination()));
            classify_transport(ip.get_next_header(), ip.payload(), summary);
        }
        _ => {}
    }
}

fn classify_transport(next: IpNextHeaderProtocol, payload: &[u8], summary: &mut PacketSummary) {
    match next {
        IpNextHeaderProtocols::Tcp => {
            summary.tags |= ProtocolTags::TCP;
            if let Some(tcp) = TcpPacket::new(payload) {
                summary.src_port = Some(tcp.get_source());
                summary.dst_port = Some(tcp.get_destination());
            }
        }
        IpNextHeaderProtocols::Udp => {
            summary.tags |= ProtocolTags::UDP;
            if let Some(udp) = UdpPacket::new(payload) {
                summary.src_port = Some(udp.get_source());
                summary.dst_port = Some(udp.get_destination());
            }
        }
        IpNextHeaderProtocols::Icmp => summary.tags |= ProtocolTags::ICMP,
        IpNextHeaderProtocols::Icmpv6 => summary.tags |= ProtocolTags::ICMPV6,
        _ => {}
    }
}
