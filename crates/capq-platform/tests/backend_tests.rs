//! Integration tests for the host backend that do not need capture privileges

use capq_core::{Error, InterfaceRequest, InterfaceResolver};
use capq_platform::{interface_details, pick_default, PnetBackend};

#[test]
fn test_unknown_interface_lists_host_interfaces() {
    let backend = PnetBackend::new();
    let resolver = InterfaceResolver::new(&backend);

    match resolver.resolve(Some(&InterfaceRequest::name("capq-missing0"))) {
        Err(Error::InterfaceNotFound { requested, available }) => {
            assert_eq!(requested, "capq-missing0");
            let host: Vec<String> = interface_details().into_iter().map(|i| i.name).collect();
            assert!(available.iter().all(|name| host.contains(name)));
        }
        Err(Error::NoInterfacesAvailable) => {}
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_details_match_listing() {
    let details = interface_details();
    if let Some(default) = pick_default(&details) {
        assert!(default.is_up);
        assert!(!default.is_loopback);
    }
}
