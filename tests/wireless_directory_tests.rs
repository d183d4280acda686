mod test_utils;

use glued::error::GluedError;
use glued::wireless::{WirelessDeviceDirectory, WirelessDirectory};
use test_utils::*;

#[test]
fn test_address_forms_resolve_to_same_device() {
    let directory = WirelessDirectory::new(WirelessBuilder::with_airpods().build());

    for identifier in [
        "AA:BB:CC:DD:EE:FF",
        "AABBCCDDEEFF",
        "aa-bb-cc-dd-ee-ff",
    ] {
        let device = directory.resolve(identifier).expect(identifier);
        assert_eq!(device.name, AIRPODS);
    }
}

#[test]
fn test_stripped_retry_with_exact_backend() {
    let backend = WirelessBuilder::new()
        .paired("AABBCCDDEEFF", AIRPODS)
        .strict_addresses()
        .build();
    let directory = WirelessDirectory::new(backend.clone());

    assert!(directory.connect("AA:BB:CC:DD:EE:FF").is_ok());
    assert_eq!(
        backend.get_lookup_calls(),
        vec!["AA:BB:CC:DD:EE:FF".to_string(), "AABBCCDDEEFF".to_string()]
    );
}

#[test]
fn test_no_retry_when_nothing_to_strip() {
    let backend = WirelessBuilder::new().strict_addresses().build();
    let directory = WirelessDirectory::new(backend.clone());

    assert_eq!(
        directory.connect("AABBCCDDEEFF"),
        Err(GluedError::DeviceNotFound("AABBCCDDEEFF".to_string()))
    );
    assert_eq!(backend.get_lookup_calls().len(), 1);
}

#[test]
fn test_name_lookup_is_exact_and_covers_recent_devices() {
    let backend = WirelessBuilder::with_airpods()
        .recent("C0-FF-EE-00-11-22", "Living Room Speaker")
        .build();
    let directory = WirelessDirectory::new(backend.clone());

    assert!(directory.connect("Living Room Speaker").is_ok());
    assert_eq!(backend.get_connect_calls(), vec!["C0-FF-EE-00-11-22".to_string()]);

    assert_eq!(
        directory.connect("airpods pro"),
        Err(GluedError::DeviceNotFound("airpods pro".to_string()))
    );
    // Names never go through address lookup
    assert!(backend.get_lookup_calls().is_empty());
}

#[test]
fn test_malformed_address_is_treated_as_name() {
    let directory = WirelessDirectory::new(WirelessBuilder::with_airpods().build());

    assert_eq!(
        directory.connect("AA:BB:CC:DD:EE"),
        Err(GluedError::DeviceNotFound("AA:BB:CC:DD:EE".to_string()))
    );
    assert_eq!(directory.backend().get_lookup_calls().len(), 0);
}

#[test]
fn test_unavailable_subsystem() {
    let backend = WirelessBuilder::with_airpods().unavailable().build();
    let directory = WirelessDirectory::new(backend.clone());

    assert!(!directory.available());
    assert!(directory.paired_devices().is_empty());
    assert_eq!(
        directory.connect(AIRPODS_ADDRESS),
        Err(GluedError::WirelessUnavailable)
    );
    assert!(backend.get_lookup_calls().is_empty());
}

#[test]
fn test_connect_failure_reports_requested_identifier() {
    let backend = WirelessBuilder::with_airpods().connect_failure(1).build();
    let directory = WirelessDirectory::new(backend);

    assert_eq!(
        directory.connect("AABBCCDDEEFF"),
        Err(GluedError::ConnectFailed {
            identifier: "AABBCCDDEEFF".to_string(),
            status: 1
        })
    );
}

#[test]
fn test_paired_devices_are_fresh_each_query() {
    let backend = WirelessBuilder::with_airpods().build();
    let directory = WirelessDirectory::new(backend.clone());

    assert!(!directory.paired_devices()[0].is_connected);
    directory.connect(AIRPODS).unwrap();
    assert!(directory.paired_devices()[0].is_connected);
}
