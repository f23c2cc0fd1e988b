//! Integration tests for configuration module

use capq_core::config::{Config, FilterConfig};
use capq_core::{DropPolicy, Error, FilterRule, InterfaceRequest, Protocol};
use std::io::Write;

const FULL: &str = r#"
[capture]
interface = "eth1"
promiscuous = false
snaplen = 1514
read_timeout_ms = 250

[queue]
capacity = 128
drop_strategy = "drop_newest_queued"

[[filters]]
name = "no-arp"
rule = { not = { protocol = "arp" } }

[logging]
level = "debug"
json_format = true
"#;

#[test]
fn test_full_file() {
    let config = Config::from_toml(FULL).unwrap();
    config.validate().unwrap();

    assert_eq!(config.requested_interface(), Some(&InterfaceRequest::name("eth1")));
    assert!(!config.capture.promiscuous);
    assert_eq!(config.capture.snaplen, 1514);
    assert_eq!(config.queue.capacity, 128);
    assert_eq!(config.queue.drop_strategy, DropPolicy::DropNewestQueued);
    assert_eq!(
        config.filters,
        vec![FilterConfig {
            name: "no-arp".into(),
            rule: FilterRule::not(FilterRule::Protocol(Protocol::Arp)),
        }]
    );
    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.json_format);
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(FULL.as_bytes()).unwrap();

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.queue.capacity, 128);
}

#[test]
fn test_empty_file_is_default() {
    let config = Config::from_toml("").unwrap();
    assert!(config.validate().is_ok());
    assert!(config.requested_interface().is_none());
    assert_eq!(config.queue.drop_strategy, DropPolicy::DropOldest);
}

#[test]
fn test_unknown_strategy_is_parse_error() {
    let err = Config::from_toml("[queue]\ndrop_strategy = \"drop_random\"\n").unwrap_err();
    assert!(matches!(err, Error::TomlParse(_)));
}

#[test]
fn test_zero_capacity_is_invalid_configuration() {
    let config = Config::from_toml("[queue]\ncapacity = 0\n").unwrap();
    assert!(matches!(
        config.validate(),
        Err(Error::InvalidConfiguration { .. })
    ));
}

#[test]
fn test_generated_config_roundtrips() {
    let toml = Config::default().to_toml().unwrap();
    let parsed = Config::from_toml(&toml).unwrap();
    assert_eq!(parsed.queue.capacity, Config::default().queue.capacity);
    assert_eq!(parsed.capture.read_timeout_ms, 100);
}
