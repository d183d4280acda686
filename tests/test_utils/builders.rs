//! Test utility builders for the mock audio system, wireless stack and config
//!
//! Individual methods may not be used by all tests, so dead code warnings are suppressed.

#![allow(dead_code)]

use glued::audio::AudioObjectId;
use glued::error::OsStatus;
use glued::system::{MockAudioSystem, MockTargetStore, MockWirelessBackend};
use glued::target::TargetDevice;
use glued::wireless::WirelessDeviceRecord;

pub const SPEAKERS_ID: AudioObjectId = 41;
pub const SPEAKERS: &str = "MacBook Pro Speakers";
pub const HEADPHONES_ID: AudioObjectId = 58;
pub const HEADPHONES: &str = "External Headphones";
pub const AIRPODS_ID: AudioObjectId = 73;
pub const AIRPODS: &str = "AirPods Pro";
pub const AIRPODS_ADDRESS: &str = "AA:BB:CC:DD:EE:FF";

/// Builder for a MockAudioSystem with output devices and a default
pub struct AudioSystemBuilder {
    devices: Vec<(AudioObjectId, String)>,
    default_output: Option<AudioObjectId>,
    running: Vec<AudioObjectId>,
}

impl AudioSystemBuilder {
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
            default_output: None,
            running: Vec::new(),
        }
    }

    /// Speakers (default), headphones and AirPods
    pub fn desk_setup() -> Self {
        Self::new()
            .output(SPEAKERS_ID, SPEAKERS)
            .output(HEADPHONES_ID, HEADPHONES)
            .output(AIRPODS_ID, AIRPODS)
            .default_output(SPEAKERS_ID)
    }

    pub fn output(mut self, id: AudioObjectId, name: &str) -> Self {
        self.devices.push((id, name.to_string()));
        self
    }

    pub fn default_output(mut self, id: AudioObjectId) -> Self {
        self.default_output = Some(id);
        self
    }

    pub fn running(mut self, id: AudioObjectId) -> Self {
        self.running.push(id);
        self
    }

    pub fn build(self) -> MockAudioSystem {
        let audio = MockAudioSystem::new();
        for (id, name) in &self.devices {
            audio.add_device(*id, name);
        }
        if let Some(id) = self.default_output {
            audio.set_mock_default_output(id);
        }
        for id in self.running {
            audio.set_running(id, true);
        }
        audio
    }
}

impl Default for AudioSystemBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a MockWirelessBackend with paired and recent devices
pub struct WirelessBuilder {
    paired: Vec<WirelessDeviceRecord>,
    recent: Vec<WirelessDeviceRecord>,
    available: bool,
    strict_addresses: bool,
    connect_failure: Option<OsStatus>,
}

impl WirelessBuilder {
    pub fn new() -> Self {
        Self {
            paired: Vec::new(),
            recent: Vec::new(),
            available: true,
            strict_addresses: false,
            connect_failure: None,
        }
    }

    /// AirPods paired, plus a keyboard that is already connected
    pub fn with_airpods() -> Self {
        Self::new()
            .paired(AIRPODS_ADDRESS, AIRPODS)
            .paired_connected("11-22-33-44-55-66", "Magic Keyboard")
    }

    pub fn paired(mut self, address: &str, name: &str) -> Self {
        self.paired.push(WirelessDeviceRecord::new(address, name));
        self
    }

    pub fn paired_connected(mut self, address: &str, name: &str) -> Self {
        self.paired
            .push(WirelessDeviceRecord::new(address, name).connected(true));
        self
    }

    pub fn recent(mut self, address: &str, name: &str) -> Self {
        self.recent
            .push(WirelessDeviceRecord::new(address, name).paired(false));
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Addresses only match when spelled exactly as stored
    pub fn strict_addresses(mut self) -> Self {
        self.strict_addresses = true;
        self
    }

    pub fn connect_failure(mut self, status: OsStatus) -> Self {
        self.connect_failure = Some(status);
        self
    }

    pub fn build(self) -> MockWirelessBackend {
        let backend = MockWirelessBackend::new();
        for device in self.paired {
            backend.add_paired(device);
        }
        for device in self.recent {
            backend.add_recent(device);
        }
        backend.set_available(self.available);
        backend.set_strict_addresses(self.strict_addresses);
        backend.set_connect_failure(self.connect_failure);
        backend
    }
}

impl Default for WirelessBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn airpods_target() -> TargetDevice {
    TargetDevice::new(AIRPODS_ADDRESS, AIRPODS)
}

pub fn store_with_airpods() -> MockTargetStore {
    MockTargetStore::with_target(airpods_target())
}
