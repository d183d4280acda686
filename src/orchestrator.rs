use chrono::{DateTime, Local};
use std::fmt;
use tracing::{debug, info, warn};

use crate::audio::AudioDeviceDirectory;
use crate::error::GluedError;
use crate::target::{TargetDevice, TargetPreference};
use crate::wireless::{WirelessDeviceDirectory, WirelessDeviceRecord, address};

/// Result of one attempt to move audio onto the target device. Both steps are
/// always attempted; each records its own result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchReport {
    pub target: TargetDevice,
    pub connect: Result<(), GluedError>,
    pub audio: Result<(), GluedError>,
    pub finished_at: DateTime<Local>,
}

impl SwitchReport {
    pub fn is_success(&self) -> bool {
        self.connect.is_ok() && self.audio.is_ok()
    }

    /// Exactly one of the two steps failed
    pub fn is_partial(&self) -> bool {
        self.connect.is_ok() != self.audio.is_ok()
    }

    pub fn failures(&self) -> Vec<&GluedError> {
        [&self.connect, &self.audio]
            .into_iter()
            .filter_map(|step| step.as_ref().err())
            .collect()
    }
}

impl fmt::Display for SwitchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.target)?;
        match (&self.connect, &self.audio) {
            (Ok(()), Ok(())) => write!(f, "connected and set as output"),
            (Err(c), Ok(())) => write!(f, "set as output, connect failed ({})", c),
            (Ok(()), Err(a)) => write!(f, "connected, output switch failed ({})", a),
            (Err(c), Err(a)) => write!(f, "connect failed ({}); output switch failed ({})", c, a),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// No target is saved; nothing was touched
    NothingToDo,
    Attempted(SwitchReport),
}

impl SwitchOutcome {
    pub fn report(&self) -> Option<&SwitchReport> {
        match self {
            SwitchOutcome::NothingToDo => None,
            SwitchOutcome::Attempted(report) => Some(report),
        }
    }
}

/// A paired device as shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedDevice {
    pub record: WirelessDeviceRecord,
    pub is_target: bool,
}

/// Snapshot for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceListing {
    pub default_output: Option<String>,
    pub target: Option<TargetDevice>,
    pub devices: Vec<ListedDevice>,
}

/// Connects the saved wireless device and routes system audio to it.
pub struct SwitchOrchestrator<A, W, T>
where
    A: AudioDeviceDirectory,
    W: WirelessDeviceDirectory,
    T: TargetPreference,
{
    audio: A,
    wireless: W,
    preference: T,
}

impl<A, W, T> SwitchOrchestrator<A, W, T>
where
    A: AudioDeviceDirectory,
    W: WirelessDeviceDirectory,
    T: TargetPreference,
{
    pub fn new(audio: A, wireless: W, preference: T) -> Self {
        Self {
            audio,
            wireless,
            preference,
        }
    }

    pub fn preference(&self) -> &T {
        &self.preference
    }

    /// Switch to whatever target is currently saved.
    pub fn switch_to_saved_target(&self) -> SwitchOutcome {
        match self.preference.load() {
            Some(target) => SwitchOutcome::Attempted(self.switch_to_target(&target)),
            None => {
                debug!("No target device saved, nothing to do");
                SwitchOutcome::NothingToDo
            }
        }
    }

    /// Connect `target`, then make it the default and system output. Never fails;
    /// the report carries both step results.
    pub fn switch_to_target(&self, target: &TargetDevice) -> SwitchReport {
        info!("Switching audio to {}", target);

        let connect = self.wireless.connect(&target.address);
        match &connect {
            Ok(()) => info!("Connected {}", target.address),
            Err(e) => warn!("Connect step failed: {}", e),
        }

        let audio = self.audio.set_default_output(&target.name);
        match &audio {
            Ok(()) => info!("Output switched to {}", target.name),
            Err(e) => warn!("Output switch step failed: {}", e),
        }

        SwitchReport {
            target: target.clone(),
            connect,
            audio,
            finished_at: Local::now(),
        }
    }

    /// Paired devices with the current default output and the saved target marked.
    pub fn device_listing(&self) -> DeviceListing {
        let default_output = match self.audio.current_default_output() {
            Ok(handle) => handle.name,
            Err(e) => {
                debug!("Default output unavailable for listing: {}", e);
                None
            }
        };
        let target = self.preference.load();

        let devices = self
            .wireless
            .paired_devices()
            .into_iter()
            .map(|record| {
                let is_target = target
                    .as_ref()
                    .is_some_and(|t| is_same_device(t, &record));
                ListedDevice { record, is_target }
            })
            .collect();

        DeviceListing {
            default_output,
            target,
            devices,
        }
    }
}

fn is_same_device(target: &TargetDevice, record: &WirelessDeviceRecord) -> bool {
    target.address == record.address || address::same_address(&target.address, &record.address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::{MOCK_FAILURE_STATUS, MockAudioSystem, MockTargetStore, MockWirelessBackend};
    use crate::wireless::WirelessDirectory;

    const AIRPODS: &str = "AA:BB:CC:DD:EE:FF";

    fn fixture() -> (MockAudioSystem, MockWirelessBackend) {
        let audio = MockAudioSystem::new();
        audio.add_device(1, "MacBook Pro Speakers");
        audio.add_device(2, "AirPods Pro");
        audio.set_mock_default_output(1);

        let wireless = MockWirelessBackend::new();
        wireless.add_paired(WirelessDeviceRecord::new(AIRPODS, "AirPods Pro"));
        wireless.add_paired(WirelessDeviceRecord::new("11-22-33-44-55-66", "Keyboard"));
        (audio, wireless)
    }

    type TestOrchestrator = SwitchOrchestrator<
        MockAudioSystem,
        WirelessDirectory<MockWirelessBackend>,
        MockTargetStore,
    >;

    fn orchestrator(
        audio: &MockAudioSystem,
        wireless: &MockWirelessBackend,
        store: MockTargetStore,
    ) -> TestOrchestrator {
        SwitchOrchestrator::new(audio.clone(), WirelessDirectory::new(wireless.clone()), store)
    }

    #[test]
    fn test_successful_switch() {
        let (audio, wireless) = fixture();
        let store = MockTargetStore::with_target(TargetDevice::new(AIRPODS, "AirPods Pro"));
        let orch = orchestrator(&audio, &wireless, store);

        let outcome = orch.switch_to_saved_target();
        let report = outcome.report().unwrap();

        assert!(report.is_success());
        assert_eq!(wireless.get_connect_calls(), vec![AIRPODS.to_string()]);
        assert_eq!(audio.default_output_id(), Some(2));
        assert_eq!(audio.system_output_id(), Some(2));
    }

    #[test]
    fn test_no_target_touches_nothing() {
        let (audio, wireless) = fixture();
        let orch = orchestrator(&audio, &wireless, MockTargetStore::new());

        assert_eq!(orch.switch_to_saved_target(), SwitchOutcome::NothingToDo);
        assert!(wireless.get_connect_calls().is_empty());
        assert!(audio.get_set_device_calls().is_empty());
        assert_eq!(audio.default_output_id(), Some(1));
    }

    #[test]
    fn test_connect_failure_still_switches_output() {
        let (audio, wireless) = fixture();
        wireless.set_connect_failure(Some(-536_870_212));
        let orch = orchestrator(&audio, &wireless, MockTargetStore::new());

        let report = orch.switch_to_target(&TargetDevice::new(AIRPODS, "AirPods Pro"));

        assert!(report.is_partial());
        assert_eq!(
            report.connect,
            Err(GluedError::ConnectFailed {
                identifier: AIRPODS.to_string(),
                status: -536_870_212
            })
        );
        assert!(report.audio.is_ok());
        assert_eq!(audio.default_output_id(), Some(2));
    }

    #[test]
    fn test_output_failure_keeps_connection() {
        let (audio, wireless) = fixture();
        audio.set_role_failure(Some(crate::audio::OutputRole::DefaultOutput));
        let orch = orchestrator(&audio, &wireless, MockTargetStore::new());

        let report = orch.switch_to_target(&TargetDevice::new(AIRPODS, "AirPods Pro"));

        assert!(report.connect.is_ok());
        assert_eq!(
            report.audio,
            Err(GluedError::HardwareSet {
                role: "default output",
                status: MOCK_FAILURE_STATUS
            })
        );
        assert!(wireless.paired.lock().unwrap()[0].is_connected);
    }

    #[test]
    fn test_both_steps_fail_independently() {
        let (audio, wireless) = fixture();
        let orch = orchestrator(&audio, &wireless, MockTargetStore::new());

        let report = orch.switch_to_target(&TargetDevice::new("00:00:00:00:00:01", "Ghost"));

        assert_eq!(report.failures().len(), 2);
        assert!(!report.is_partial());
        assert_eq!(
            report.audio,
            Err(GluedError::DeviceNotFound("Ghost".to_string()))
        );
        assert!(report.to_string().contains("connect failed"));
    }

    #[test]
    fn test_device_listing_marks_target() {
        let (audio, wireless) = fixture();
        let store = MockTargetStore::with_target(TargetDevice::new("aabbccddeeff", "AirPods Pro"));
        let orch = orchestrator(&audio, &wireless, store);

        let listing = orch.device_listing();

        assert_eq!(listing.default_output.as_deref(), Some("MacBook Pro Speakers"));
        assert_eq!(listing.devices.len(), 2);
        assert!(listing.devices[0].is_target);
        assert!(!listing.devices[1].is_target);
    }

    #[test]
    fn test_device_listing_when_wireless_unavailable() {
        let (audio, wireless) = fixture();
        wireless.set_available(false);
        audio.set_default_query_failure(true);
        let orch = orchestrator(&audio, &wireless, MockTargetStore::new());

        let listing = orch.device_listing();

        assert!(listing.devices.is_empty());
        assert_eq!(listing.default_output, None);
        assert_eq!(listing.target, None);
    }
}
