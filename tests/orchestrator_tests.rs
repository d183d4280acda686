mod test_utils;

use glued::audio::{AudioDeviceDirectory, OutputRole};
use glued::error::GluedError;
use glued::system::{MockAudioSystem, MockTargetStore, MockWirelessBackend};
use glued::wireless::WirelessDirectory;
use glued::{SwitchOrchestrator, SwitchOutcome, TargetDevice, TargetPreference};
use test_utils::*;

type TestOrchestrator =
    SwitchOrchestrator<MockAudioSystem, WirelessDirectory<MockWirelessBackend>, MockTargetStore>;

struct Fixture {
    audio: MockAudioSystem,
    wireless: MockWirelessBackend,
    orchestrator: TestOrchestrator,
}

impl Fixture {
    fn new(audio: AudioSystemBuilder, wireless: WirelessBuilder, store: MockTargetStore) -> Self {
        let audio = audio.build();
        let wireless = wireless.build();
        let orchestrator = SwitchOrchestrator::new(
            audio.clone(),
            WirelessDirectory::new(wireless.clone()),
            store,
        );
        Self {
            audio,
            wireless,
            orchestrator,
        }
    }

    fn standard() -> Self {
        Self::new(
            AudioSystemBuilder::desk_setup(),
            WirelessBuilder::with_airpods(),
            store_with_airpods(),
        )
    }
}

#[test]
fn test_saved_target_is_connected_then_selected() {
    let f = Fixture::standard();

    let outcome = f.orchestrator.switch_to_saved_target();

    let report = outcome.report().expect("switch attempted");
    assert!(report.is_success());
    assert_eq!(f.wireless.get_connect_calls(), vec![AIRPODS_ADDRESS.to_string()]);
    assert_eq!(
        f.audio.get_set_device_calls(),
        vec![
            (OutputRole::DefaultOutput, AIRPODS.to_string()),
            (OutputRole::SystemOutput, AIRPODS.to_string()),
        ]
    );
    assert_eq!(f.audio.default_output_id(), Some(AIRPODS_ID));
    assert_eq!(f.audio.system_output_id(), Some(AIRPODS_ID));
}

#[test]
fn test_no_saved_target_is_nothing_to_do() {
    let f = Fixture::new(
        AudioSystemBuilder::desk_setup(),
        WirelessBuilder::with_airpods(),
        MockTargetStore::new(),
    );

    let outcome = f.orchestrator.switch_to_saved_target();

    assert_eq!(outcome, SwitchOutcome::NothingToDo);
    assert!(f.wireless.get_lookup_calls().is_empty());
    assert!(f.wireless.get_connect_calls().is_empty());
    assert!(f.audio.get_set_device_calls().is_empty());
    assert_eq!(f.audio.default_output_id(), Some(SPEAKERS_ID));
}

#[test]
fn test_target_is_read_on_every_attempt() {
    let f = Fixture::standard();

    f.orchestrator.switch_to_saved_target();
    f.orchestrator.preference().clear().unwrap();
    let second = f.orchestrator.switch_to_saved_target();

    assert_eq!(second, SwitchOutcome::NothingToDo);
    assert_eq!(f.orchestrator.preference().load_count(), 2);
}

#[test]
fn test_connect_failure_does_not_block_output_switch() {
    let f = Fixture::new(
        AudioSystemBuilder::desk_setup(),
        WirelessBuilder::with_airpods().connect_failure(4),
        store_with_airpods(),
    );

    let report = f.orchestrator.switch_to_saved_target().report().cloned().unwrap();

    assert_eq!(
        report.connect,
        Err(GluedError::ConnectFailed {
            identifier: AIRPODS_ADDRESS.to_string(),
            status: 4
        })
    );
    assert_eq!(report.audio, Ok(()));
    assert_eq!(f.audio.default_output_id(), Some(AIRPODS_ID));
}

#[test]
fn test_output_failure_does_not_undo_connection() {
    let f = Fixture::new(
        AudioSystemBuilder::new()
            .output(SPEAKERS_ID, SPEAKERS)
            .default_output(SPEAKERS_ID),
        WirelessBuilder::with_airpods(),
        store_with_airpods(),
    );

    let report = f.orchestrator.switch_to_saved_target().report().cloned().unwrap();

    assert_eq!(report.connect, Ok(()));
    assert_eq!(
        report.audio,
        Err(GluedError::DeviceNotFound(AIRPODS.to_string()))
    );
    assert!(f.wireless.paired.lock().unwrap()[0].is_connected);
    assert_eq!(f.audio.default_output_id(), Some(SPEAKERS_ID));
}

#[test]
fn test_system_role_failure_keeps_default_role() {
    let f = Fixture::standard();
    f.audio.set_role_failure(Some(OutputRole::SystemOutput));

    let report = f.orchestrator.switch_to_saved_target().report().cloned().unwrap();

    assert!(matches!(
        report.audio,
        Err(GluedError::HardwareSet {
            role: "system output",
            ..
        })
    ));
    // No rollback of the role already changed
    assert_eq!(f.audio.default_output_id(), Some(AIRPODS_ID));
    assert_eq!(f.audio.system_output_id(), None);
}

#[test]
fn test_wireless_unavailable_is_recorded() {
    let f = Fixture::new(
        AudioSystemBuilder::desk_setup(),
        WirelessBuilder::with_airpods().unavailable(),
        store_with_airpods(),
    );

    let report = f.orchestrator.switch_to_saved_target().report().cloned().unwrap();

    assert_eq!(report.connect, Err(GluedError::WirelessUnavailable));
    assert!(report.is_partial());
    assert!(f.wireless.get_connect_calls().is_empty());
}

#[test]
fn test_separator_free_target_address_resolves() {
    let f = Fixture::standard();

    let report = f
        .orchestrator
        .switch_to_target(&TargetDevice::new("AABBCCDDEEFF", AIRPODS));

    assert!(report.is_success());
    assert_eq!(f.wireless.get_connect_calls(), vec![AIRPODS_ADDRESS.to_string()]);
}

#[test]
fn test_output_name_must_match_exactly() {
    let f = Fixture::standard();

    for name in ["airpods pro", "AirPods", "AirPods Pro "] {
        assert_eq!(
            f.audio.set_default_output(name),
            Err(GluedError::DeviceNotFound(name.to_string()))
        );
    }
    assert!(f.audio.get_set_device_calls().is_empty());
    assert!(f.audio.set_default_output(AIRPODS).is_ok());
}

#[test]
fn test_listing_for_presentation() {
    let f = Fixture::standard();

    let listing = f.orchestrator.device_listing();

    assert_eq!(listing.default_output.as_deref(), Some(SPEAKERS));
    assert_eq!(listing.target, Some(airpods_target()));
    let marked: Vec<&str> = listing
        .devices
        .iter()
        .filter(|d| d.is_target)
        .map(|d| d.record.name.as_str())
        .collect();
    assert_eq!(marked, vec![AIRPODS]);
    assert!(listing.devices[1].record.is_connected);
}
