use anyhow::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use crate::audio::{
    AudioDeviceDirectory, AudioObjectId, HardwareCallback, ListenerHost, ListenerKind,
    ListenerSubscription, OutputDeviceHandle, OutputRole, find_output_by_name,
    retarget_output_roles,
};
use crate::error::{GluedError, OsStatus};
use crate::system::traits::FileSystemInterface;
use crate::target::{TargetDevice, TargetPreference};
use crate::wireless::{WirelessBackend, WirelessDeviceRecord, address};

/// Status the mocks report for injected hardware failures (`kAudioHardwareUnspecifiedError`)
pub const MOCK_FAILURE_STATUS: OsStatus = 2_003_329_396;

type ListenerTable = HashMap<u64, (ListenerKind, HardwareCallback)>;

/// Mock audio system for testing - controllable devices, activity and listeners
#[derive(Clone)]
pub struct MockAudioSystem {
    pub devices: Arc<Mutex<Vec<OutputDeviceHandle>>>,
    pub default_output: Arc<Mutex<Option<AudioObjectId>>>,
    pub system_output: Arc<Mutex<Option<AudioObjectId>>>,
    pub running: Arc<Mutex<HashMap<AudioObjectId, bool>>>,
    pub listeners: Arc<Mutex<ListenerTable>>,
    pub next_listener_id: Arc<AtomicUsize>,
    pub registration_count: Arc<AtomicUsize>,
    pub set_device_calls: Arc<Mutex<Vec<(OutputRole, String)>>>,
    pub should_fail_default_query: Arc<Mutex<bool>>,
    pub should_fail_role: Arc<Mutex<Option<OutputRole>>>,
    pub should_fail_running_registration: Arc<Mutex<bool>>,
}

impl MockAudioSystem {
    pub fn new() -> Self {
        Self {
            devices: Arc::new(Mutex::new(Vec::new())),
            default_output: Arc::new(Mutex::new(None)),
            system_output: Arc::new(Mutex::new(None)),
            running: Arc::new(Mutex::new(HashMap::new())),
            listeners: Arc::new(Mutex::new(HashMap::new())),
            next_listener_id: Arc::new(AtomicUsize::new(1)),
            registration_count: Arc::new(AtomicUsize::new(0)),
            set_device_calls: Arc::new(Mutex::new(Vec::new())),
            should_fail_default_query: Arc::new(Mutex::new(false)),
            should_fail_role: Arc::new(Mutex::new(None)),
            should_fail_running_registration: Arc::new(Mutex::new(false)),
        }
    }

    /// Add an output device to the mock system
    pub fn add_device(&self, id: AudioObjectId, name: &str) {
        self.devices
            .lock()
            .unwrap()
            .push(OutputDeviceHandle::named(id, name));
    }

    /// Set the default output without notifying listeners
    pub fn set_mock_default_output(&self, id: AudioObjectId) {
        *self.default_output.lock().unwrap() = Some(id);
    }

    /// Change the default output the way the OS does: update it, then notify
    pub fn change_default_output(&self, id: AudioObjectId) {
        self.set_mock_default_output(id);
        self.trigger_default_output_changed();
    }

    /// Set whether a device is producing sound without notifying listeners
    pub fn set_running(&self, id: AudioObjectId, running: bool) {
        self.running.lock().unwrap().insert(id, running);
    }

    /// Update the running state and notify that device's listeners
    pub fn set_running_and_notify(&self, id: AudioObjectId, running: bool) {
        self.set_running(id, running);
        self.trigger_running_changed(id);
    }

    /// Invoke every default-output listener
    pub fn trigger_default_output_changed(&self) {
        for callback in self.callbacks_for(|kind| kind == ListenerKind::DefaultOutput) {
            callback();
        }
    }

    /// Invoke the is-running listeners registered on `id`
    pub fn trigger_running_changed(&self, id: AudioObjectId) {
        for callback in self.callbacks_for(|kind| kind == ListenerKind::IsRunning(id)) {
            callback();
        }
    }

    fn callbacks_for(&self, matches: impl Fn(ListenerKind) -> bool) -> Vec<HardwareCallback> {
        // Collected first so callbacks never run under the lock
        self.listeners
            .lock()
            .unwrap()
            .values()
            .filter(|(kind, _)| matches(*kind))
            .map(|(_, callback)| callback.clone())
            .collect()
    }

    /// Kinds of all listeners currently installed
    pub fn active_listeners(&self) -> Vec<ListenerKind> {
        self.listeners
            .lock()
            .unwrap()
            .values()
            .map(|(kind, _)| *kind)
            .collect()
    }

    /// Devices that currently have an is-running listener
    pub fn running_listener_devices(&self) -> Vec<AudioObjectId> {
        let mut devices: Vec<AudioObjectId> = self
            .active_listeners()
            .into_iter()
            .filter_map(|kind| match kind {
                ListenerKind::IsRunning(id) => Some(id),
                ListenerKind::DefaultOutput => None,
            })
            .collect();
        devices.sort_unstable();
        devices
    }

    /// Total number of successful listener registrations so far
    pub fn registration_count(&self) -> usize {
        self.registration_count.load(Ordering::SeqCst)
    }

    pub fn default_output_id(&self) -> Option<AudioObjectId> {
        *self.default_output.lock().unwrap()
    }

    pub fn system_output_id(&self) -> Option<AudioObjectId> {
        *self.system_output.lock().unwrap()
    }

    /// Get all set device calls that were made
    pub fn get_set_device_calls(&self) -> Vec<(OutputRole, String)> {
        self.set_device_calls.lock().unwrap().clone()
    }

    /// Configure the mock to fail default output queries
    pub fn set_default_query_failure(&self, should_fail: bool) {
        *self.should_fail_default_query.lock().unwrap() = should_fail;
    }

    /// Configure the mock to fail setting one output role
    pub fn set_role_failure(&self, role: Option<OutputRole>) {
        *self.should_fail_role.lock().unwrap() = role;
    }

    /// Configure the mock to reject is-running listener registration
    pub fn set_running_registration_failure(&self, should_fail: bool) {
        *self.should_fail_running_registration.lock().unwrap() = should_fail;
    }

    fn register(
        &self,
        kind: ListenerKind,
        callback: HardwareCallback,
    ) -> Result<ListenerSubscription, GluedError> {
        let id = self.next_listener_id.fetch_add(1, Ordering::SeqCst) as u64;
        self.listeners.lock().unwrap().insert(id, (kind, callback));
        self.registration_count.fetch_add(1, Ordering::SeqCst);

        let listeners = Arc::clone(&self.listeners);
        Ok(ListenerSubscription::new(kind, move || {
            listeners.lock().unwrap().remove(&id);
        }))
    }
}

impl AudioDeviceDirectory for MockAudioSystem {
    fn current_default_output(&self) -> Result<OutputDeviceHandle, GluedError> {
        if *self.should_fail_default_query.lock().unwrap() {
            return Err(GluedError::HardwareQuery {
                what: "default output device",
                status: MOCK_FAILURE_STATUS,
            });
        }

        let id = self
            .default_output_id()
            .ok_or(GluedError::HardwareQuery {
                what: "default output device",
                status: MOCK_FAILURE_STATUS,
            })?;

        Ok(OutputDeviceHandle {
            id,
            name: self.name_of(id),
        })
    }

    fn name_of(&self, device: AudioObjectId) -> Option<String> {
        self.devices
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.id == device)
            .and_then(|d| d.name.clone())
    }

    fn list_output_devices(&self) -> Result<Vec<OutputDeviceHandle>, GluedError> {
        Ok(self.devices.lock().unwrap().clone())
    }

    fn set_default_output(&self, name: &str) -> Result<(), GluedError> {
        let devices = self.list_output_devices()?;
        let device = find_output_by_name(&devices, name)?;

        let failing_role = *self.should_fail_role.lock().unwrap();
        retarget_output_roles(|role| {
            if failing_role == Some(role) {
                return Err(GluedError::HardwareSet {
                    role: role.as_str(),
                    status: MOCK_FAILURE_STATUS,
                });
            }

            self.set_device_calls
                .lock()
                .unwrap()
                .push((role, name.to_string()));

            match role {
                OutputRole::DefaultOutput => {
                    let previous = self.default_output.lock().unwrap().replace(device.id);
                    if previous != Some(device.id) {
                        self.trigger_default_output_changed();
                    }
                }
                OutputRole::SystemOutput => {
                    *self.system_output.lock().unwrap() = Some(device.id);
                }
            }
            Ok(())
        })
    }

    fn is_running_somewhere(&self, device: AudioObjectId) -> Result<bool, GluedError> {
        Ok(self
            .running
            .lock()
            .unwrap()
            .get(&device)
            .copied()
            .unwrap_or(false))
    }
}

impl ListenerHost for MockAudioSystem {
    fn watch_default_output(
        &self,
        callback: HardwareCallback,
    ) -> Result<ListenerSubscription, GluedError> {
        self.register(ListenerKind::DefaultOutput, callback)
    }

    fn watch_is_running(
        &self,
        device: AudioObjectId,
        callback: HardwareCallback,
    ) -> Result<ListenerSubscription, GluedError> {
        if *self.should_fail_running_registration.lock().unwrap() {
            return Err(GluedError::ListenerRegistration {
                kind: "is-running",
                status: MOCK_FAILURE_STATUS,
            });
        }
        self.register(ListenerKind::IsRunning(device), callback)
    }
}

impl Default for MockAudioSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Mock wireless stack for testing - controllable devices and connect results
#[derive(Clone)]
pub struct MockWirelessBackend {
    pub paired: Arc<Mutex<Vec<WirelessDeviceRecord>>>,
    pub recent: Arc<Mutex<Vec<WirelessDeviceRecord>>>,
    pub available: Arc<Mutex<bool>>,
    /// Only resolve addresses spelled exactly as stored
    pub strict_addresses: Arc<Mutex<bool>>,
    pub connect_failure: Arc<Mutex<Option<OsStatus>>>,
    pub lookup_calls: Arc<Mutex<Vec<String>>>,
    pub connect_calls: Arc<Mutex<Vec<String>>>,
    /// While `true`, connect requests block until released
    pub connect_gate: Arc<(Mutex<bool>, Condvar)>,
}

impl MockWirelessBackend {
    pub fn new() -> Self {
        Self {
            paired: Arc::new(Mutex::new(Vec::new())),
            recent: Arc::new(Mutex::new(Vec::new())),
            available: Arc::new(Mutex::new(true)),
            strict_addresses: Arc::new(Mutex::new(false)),
            connect_failure: Arc::new(Mutex::new(None)),
            lookup_calls: Arc::new(Mutex::new(Vec::new())),
            connect_calls: Arc::new(Mutex::new(Vec::new())),
            connect_gate: Arc::new((Mutex::new(false), Condvar::new())),
        }
    }

    pub fn add_paired(&self, device: WirelessDeviceRecord) {
        self.paired.lock().unwrap().push(device);
    }

    pub fn add_recent(&self, device: WirelessDeviceRecord) {
        self.recent.lock().unwrap().push(device);
    }

    pub fn set_available(&self, available: bool) {
        *self.available.lock().unwrap() = available;
    }

    pub fn set_strict_addresses(&self, strict: bool) {
        *self.strict_addresses.lock().unwrap() = strict;
    }

    /// Make connect requests fail with the given status
    pub fn set_connect_failure(&self, status: Option<OsStatus>) {
        *self.connect_failure.lock().unwrap() = status;
    }

    pub fn get_lookup_calls(&self) -> Vec<String> {
        self.lookup_calls.lock().unwrap().clone()
    }

    /// Addresses of the devices connect was requested for
    pub fn get_connect_calls(&self) -> Vec<String> {
        self.connect_calls.lock().unwrap().clone()
    }

    /// Make connect requests wait until [`release_connections`](Self::release_connections)
    pub fn hold_connections(&self) {
        *self.connect_gate.0.lock().unwrap() = true;
    }

    pub fn release_connections(&self) {
        let (held, released) = &*self.connect_gate;
        *held.lock().unwrap() = false;
        released.notify_all();
    }
}

impl WirelessBackend for MockWirelessBackend {
    fn paired(&self) -> Option<Vec<WirelessDeviceRecord>> {
        if !*self.available.lock().unwrap() {
            return None;
        }
        Some(self.paired.lock().unwrap().clone())
    }

    fn recent(&self) -> Vec<WirelessDeviceRecord> {
        if !*self.available.lock().unwrap() {
            return Vec::new();
        }
        self.recent.lock().unwrap().clone()
    }

    fn lookup_address(&self, lookup: &str) -> Option<WirelessDeviceRecord> {
        self.lookup_calls.lock().unwrap().push(lookup.to_string());

        let strict = *self.strict_addresses.lock().unwrap();
        let paired = self.paired.lock().unwrap().clone();
        let recent = self.recent.lock().unwrap().clone();

        paired.into_iter().chain(recent).find(|device| {
            if strict {
                device.address == lookup
            } else {
                address::same_address(&device.address, lookup)
            }
        })
    }

    fn open_connection(&self, device: &WirelessDeviceRecord) -> Result<(), GluedError> {
        self.connect_calls
            .lock()
            .unwrap()
            .push(device.address.clone());

        let (held, released) = &*self.connect_gate;
        let mut waiting = held.lock().unwrap();
        while *waiting {
            waiting = released.wait(waiting).unwrap();
        }
        drop(waiting);

        if let Some(status) = *self.connect_failure.lock().unwrap() {
            return Err(GluedError::ConnectFailed {
                identifier: device.address.clone(),
                status,
            });
        }

        for known in self.paired.lock().unwrap().iter_mut() {
            if known.address == device.address {
                known.is_connected = true;
            }
        }
        Ok(())
    }
}

impl Default for MockWirelessBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory target preference for testing
#[derive(Clone, Default)]
pub struct MockTargetStore {
    pub target: Arc<Mutex<Option<TargetDevice>>>,
    pub load_calls: Arc<AtomicUsize>,
}

impl MockTargetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(target: TargetDevice) -> Self {
        let store = Self::new();
        *store.target.lock().unwrap() = Some(target);
        store
    }

    pub fn load_count(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }
}

impl TargetPreference for MockTargetStore {
    fn load(&self) -> Option<TargetDevice> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        self.target.lock().unwrap().clone()
    }

    fn save(&self, target: &TargetDevice) -> Result<()> {
        *self.target.lock().unwrap() = Some(target.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.target.lock().unwrap() = None;
        Ok(())
    }
}

/// Mock file system for testing - provides controllable file operations
#[derive(Clone)]
pub struct MockFileSystem {
    pub files: Arc<Mutex<HashMap<PathBuf, String>>>,
    pub read_calls: Arc<Mutex<Vec<PathBuf>>>,
    pub write_calls: Arc<Mutex<Vec<(PathBuf, String)>>>,
    pub directory_creation_calls: Arc<Mutex<Vec<PathBuf>>>,
    pub should_fail_read: Arc<Mutex<bool>>,
    pub should_fail_write: Arc<Mutex<bool>>,
    pub should_fail_create_dir: Arc<Mutex<bool>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self {
            files: Arc::new(Mutex::new(HashMap::new())),
            read_calls: Arc::new(Mutex::new(Vec::new())),
            write_calls: Arc::new(Mutex::new(Vec::new())),
            directory_creation_calls: Arc::new(Mutex::new(Vec::new())),
            should_fail_read: Arc::new(Mutex::new(false)),
            should_fail_write: Arc::new(Mutex::new(false)),
            should_fail_create_dir: Arc::new(Mutex::new(false)),
        }
    }

    /// Add a file to the mock file system
    pub fn add_file<P: AsRef<Path>>(&self, path: P, content: String) {
        self.files
            .lock()
            .unwrap()
            .insert(path.as_ref().to_path_buf(), content);
    }

    /// Get all write calls that were made
    pub fn get_write_calls(&self) -> Vec<(PathBuf, String)> {
        self.write_calls.lock().unwrap().clone()
    }

    /// Get all directory creation calls that were made
    pub fn get_directory_creation_calls(&self) -> Vec<PathBuf> {
        self.directory_creation_calls.lock().unwrap().clone()
    }

    /// Configure the mock to fail read operations
    pub fn set_read_failure(&self, should_fail: bool) {
        *self.should_fail_read.lock().unwrap() = should_fail;
    }

    /// Configure the mock to fail write operations
    pub fn set_write_failure(&self, should_fail: bool) {
        *self.should_fail_write.lock().unwrap() = should_fail;
    }

    /// Configure the mock to fail directory creation
    pub fn set_create_dir_failure(&self, should_fail: bool) {
        *self.should_fail_create_dir.lock().unwrap() = should_fail;
    }

    /// Check if a file exists in the mock system
    pub fn file_exists<P: AsRef<Path>>(&self, path: P) -> bool {
        self.files.lock().unwrap().contains_key(path.as_ref())
    }
}

impl FileSystemInterface for MockFileSystem {
    fn read_config_file(&self, path: &Path) -> Result<String> {
        self.read_calls.lock().unwrap().push(path.to_path_buf());

        if *self.should_fail_read.lock().unwrap() {
            return Err(anyhow::anyhow!("Mock read failure"));
        }

        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("File not found: {}", path.display()))
    }

    fn write_config_file(&self, path: &Path, content: &str) -> Result<()> {
        self.write_calls
            .lock()
            .unwrap()
            .push((path.to_path_buf(), content.to_string()));

        if *self.should_fail_write.lock().unwrap() {
            return Err(anyhow::anyhow!("Mock write failure"));
        }

        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn config_file_exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    fn create_config_dir(&self, path: &Path) -> Result<()> {
        self.directory_creation_calls
            .lock()
            .unwrap()
            .push(path.to_path_buf());

        if *self.should_fail_create_dir.lock().unwrap() {
            return Err(anyhow::anyhow!("Mock create directory failure"));
        }

        Ok(())
    }

    fn remove_config_file(&self, path: &Path) -> Result<()> {
        self.files
            .lock()
            .unwrap()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| anyhow::anyhow!("File not found: {}", path.display()))
    }
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}
