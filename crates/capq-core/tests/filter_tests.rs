//! Integration tests for the filter chain and rules

use capq_core::filter::{FilterChain, LengthRange, NamedRule};
use capq_core::{predicate_fn, CapturedPacket, FilterRule, FrameBuilder, Protocol, ProtocolTags};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

fn packet(frame: bytes::Bytes) -> CapturedPacket {
    CapturedPacket::new(0, frame)
}

#[test]
fn test_chain_is_deterministic() {
    let mut chain = FilterChain::new();
    chain.add(NamedRule::new("tcp", FilterRule::Protocol(Protocol::Tcp)));
    chain.add(NamedRule::new("https", FilterRule::Port(443)));

    let https = packet(FrameBuilder::tcp_v4().dst_port(443).build());
    let http = packet(FrameBuilder::tcp_v4().dst_port(80).build());

    for _ in 0..10 {
        assert!(chain.admit(&https));
        assert!(!chain.admit(&http));
    }
}

#[test]
fn test_double_remove_is_noop() {
    let mut chain = FilterChain::new();
    let id = chain.add(predicate_fn("reject-all", |_: &CapturedPacket| false));
    let udp = packet(FrameBuilder::udp_v4().build());

    assert!(!chain.admit(&udp));
    chain.remove(id);
    let after_first = chain.admit(&udp);
    chain.remove(id);
    assert_eq!(chain.admit(&udp), after_first);
    assert!(chain.is_empty());
}

#[test]
fn test_rule_host_matches_both_directions() {
    let server = Ipv4Addr::new(203, 0, 113, 5);
    let rule = FilterRule::Host(IpAddr::V4(server));

    let outbound = packet(FrameBuilder::tcp_v4().dst_ip(server).build());
    let inbound = packet(FrameBuilder::tcp_v4().src_ip(server).build());
    let other = packet(FrameBuilder::tcp_v4().build());

    assert!(rule.matches(&outbound));
    assert!(rule.matches(&inbound));
    assert!(!rule.matches(&other));
}

#[test]
fn test_rule_ipv6_and_length() {
    let v6 = packet(
        FrameBuilder::tcp_v6()
            .src_ip(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1))
            .payload(&[0u8; 100])
            .build(),
    );
    assert!(v6.protocols().contains(ProtocolTags::IPV6 | ProtocolTags::TCP));
    assert!(FilterRule::Protocol(Protocol::Ipv6).matches(&v6));
    assert!(!FilterRule::Protocol(Protocol::Ipv4).matches(&v6));

    let big = FilterRule::Length(LengthRange {
        min: Some(150),
        max: None,
    });
    assert!(big.matches(&v6));
    assert!(!big.matches(&packet(FrameBuilder::arp().build())));
}

#[test]
fn test_nested_rules_from_toml() {
    #[derive(serde::Deserialize)]
    struct Wrapper {
        rule: FilterRule,
    }

    let wrapper: Wrapper = toml::from_str(
        r#"rule = { all = [{ not = { protocol = "arp" } }, { any = [{ port = 22 }, { protocol = "icmp" }] }] }"#,
    )
    .unwrap();

    let ssh = packet(FrameBuilder::tcp_v4().dst_port(22).build());
    let ping = packet(FrameBuilder::icmp_v4().build());
    let web = packet(FrameBuilder::tcp_v4().dst_port(80).build());
    let arp = packet(FrameBuilder::arp().build());

    assert!(wrapper.rule.matches(&ssh));
    assert!(wrapper.rule.matches(&ping));
    assert!(!wrapper.rule.matches(&web));
    assert!(!wrapper.rule.matches(&arp));
}
