use std::sync::Arc;
use tracing::{debug, info, warn};

use super::address;
use super::device::WirelessDeviceRecord;
use crate::error::GluedError;

/// Raw access to the OS wireless stack.
pub trait WirelessBackend: Send + Sync {
    /// Paired devices, `None` when the subsystem cannot be queried
    fn paired(&self) -> Option<Vec<WirelessDeviceRecord>>;

    /// Devices seen recently, paired or not
    fn recent(&self) -> Vec<WirelessDeviceRecord>;

    /// Resolve an address string exactly as given
    fn lookup_address(&self, address: &str) -> Option<WirelessDeviceRecord>;

    /// Ask the OS to open a connection and wait for its completion signal
    fn open_connection(&self, device: &WirelessDeviceRecord) -> Result<(), GluedError>;
}

/// The wireless directory used by the orchestrator and the device listing.
pub trait WirelessDeviceDirectory: Send + Sync {
    /// Every paired device; empty when the subsystem is unavailable
    fn paired_devices(&self) -> Vec<WirelessDeviceRecord>;

    /// Connect a device by address or by exact name
    fn connect(&self, identifier: &str) -> Result<(), GluedError>;

    /// Best-effort check that the subsystem can be queried at all
    fn available(&self) -> bool;
}

/// Identifier resolution and connect logic on top of a [`WirelessBackend`].
pub struct WirelessDirectory<B: WirelessBackend> {
    backend: B,
}

impl<B: WirelessBackend> WirelessDirectory<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Find the device an identifier refers to
    pub fn resolve(&self, identifier: &str) -> Option<WirelessDeviceRecord> {
        if address::is_address(identifier) {
            if let Some(device) = self.backend.lookup_address(identifier) {
                return Some(device);
            }

            // Addresses may be stored with or without separators
            let stripped = address::strip_separators(identifier);
            if stripped != identifier {
                debug!("Retrying address lookup without separators: {}", stripped);
                return self.backend.lookup_address(&stripped);
            }
            None
        } else {
            let paired = self.backend.paired().unwrap_or_default();
            let recent = self.backend.recent();
            paired
                .into_iter()
                .chain(recent)
                .find(|device| device.name == identifier)
        }
    }
}

impl<B: WirelessBackend> WirelessDeviceDirectory for WirelessDirectory<B> {
    fn paired_devices(&self) -> Vec<WirelessDeviceRecord> {
        match self.backend.paired() {
            Some(devices) => {
                debug!("Found {} paired wireless devices", devices.len());
                devices
            }
            None => {
                warn!("Wireless subsystem unavailable, reporting no paired devices");
                Vec::new()
            }
        }
    }

    fn connect(&self, identifier: &str) -> Result<(), GluedError> {
        if !self.available() {
            return Err(GluedError::WirelessUnavailable);
        }

        let device = self
            .resolve(identifier)
            .ok_or_else(|| GluedError::DeviceNotFound(identifier.to_string()))?;

        info!("Connecting wireless device: {}", device);
        self.backend
            .open_connection(&device)
            .map_err(|e| match e {
                GluedError::ConnectFailed { status, .. } => GluedError::ConnectFailed {
                    identifier: identifier.to_string(),
                    status,
                },
                other => other,
            })?;

        info!("Connected wireless device: {}", device.name);
        Ok(())
    }

    fn available(&self) -> bool {
        self.backend.paired().is_some()
    }
}

impl<T: WirelessDeviceDirectory + ?Sized> WirelessDeviceDirectory for Arc<T> {
    fn paired_devices(&self) -> Vec<WirelessDeviceRecord> {
        (**self).paired_devices()
    }

    fn connect(&self, identifier: &str) -> Result<(), GluedError> {
        (**self).connect(identifier)
    }

    fn available(&self) -> bool {
        (**self).available()
    }
}
