use std::fmt;
use std::sync::Arc;

use super::device::{AudioObjectId, OutputDeviceHandle, OutputRole};
use crate::error::GluedError;

/// Callback invoked by the hardware layer when a watched property changes.
///
/// It may run on any thread, so implementations only sample the changed
/// property and forward a message.
pub type HardwareCallback = Arc<dyn Fn() + Send + Sync>;

/// Queries and mutations against the OS audio subsystem.
pub trait AudioDeviceDirectory: Send + Sync {
    /// The current default output device
    fn current_default_output(&self) -> Result<OutputDeviceHandle, GluedError>;

    /// Display name of a device, `None` when it cannot be resolved
    fn name_of(&self, device: AudioObjectId) -> Option<String>;

    /// Snapshot of every device that exposes output streams
    fn list_output_devices(&self) -> Result<Vec<OutputDeviceHandle>, GluedError>;

    /// Make the output device named exactly `name` both the default and the
    /// system output. Not transactional: a role already changed stays changed
    /// when the second call fails.
    fn set_default_output(&self, name: &str) -> Result<(), GluedError>;

    /// Whether the device is producing sound for any process
    fn is_running_somewhere(&self, device: AudioObjectId) -> Result<bool, GluedError>;
}

/// Registration of hardware property listeners.
pub trait ListenerHost: Send + Sync {
    /// Watch the global "default output device" property
    fn watch_default_output(
        &self,
        callback: HardwareCallback,
    ) -> Result<ListenerSubscription, GluedError>;

    /// Watch the "is running somewhere" property of one device
    fn watch_is_running(
        &self,
        device: AudioObjectId,
        callback: HardwareCallback,
    ) -> Result<ListenerSubscription, GluedError>;
}

/// The output device named exactly `name`.
///
/// Case, surrounding whitespace and partial matches do not count, and a device
/// whose name is unavailable never matches.
pub fn find_output_by_name<'a>(
    devices: &'a [OutputDeviceHandle],
    name: &str,
) -> Result<&'a OutputDeviceHandle, GluedError> {
    devices
        .iter()
        .find(|d| d.name.as_deref() == Some(name))
        .ok_or_else(|| GluedError::DeviceNotFound(name.to_string()))
}

/// Point the default output, then the system output, at one device.
///
/// Stops at the first failing role; a role already changed is left as is.
pub fn retarget_output_roles(
    mut set_role: impl FnMut(OutputRole) -> Result<(), GluedError>,
) -> Result<(), GluedError> {
    for role in [OutputRole::DefaultOutput, OutputRole::SystemOutput] {
        set_role(role)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerKind {
    DefaultOutput,
    IsRunning(AudioObjectId),
}

impl fmt::Display for ListenerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerKind::DefaultOutput => write!(f, "default output"),
            ListenerKind::IsRunning(id) => write!(f, "is-running on device {id}"),
        }
    }
}

/// An installed hardware listener. Dropping it removes the listener.
pub struct ListenerSubscription {
    kind: ListenerKind,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl ListenerSubscription {
    pub fn new(kind: ListenerKind, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            kind,
            release: Some(Box::new(release)),
        }
    }

    pub fn kind(&self) -> ListenerKind {
        self.kind
    }

    /// Device the subscription is bound to, `None` for global listeners
    pub fn device(&self) -> Option<AudioObjectId> {
        match self.kind {
            ListenerKind::DefaultOutput => None,
            ListenerKind::IsRunning(id) => Some(id),
        }
    }
}

impl fmt::Debug for ListenerSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSubscription")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl Drop for ListenerSubscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl<T: AudioDeviceDirectory + ?Sized> AudioDeviceDirectory for Arc<T> {
    fn current_default_output(&self) -> Result<OutputDeviceHandle, GluedError> {
        (**self).current_default_output()
    }

    fn name_of(&self, device: AudioObjectId) -> Option<String> {
        (**self).name_of(device)
    }

    fn list_output_devices(&self) -> Result<Vec<OutputDeviceHandle>, GluedError> {
        (**self).list_output_devices()
    }

    fn set_default_output(&self, name: &str) -> Result<(), GluedError> {
        (**self).set_default_output(name)
    }

    fn is_running_somewhere(&self, device: AudioObjectId) -> Result<bool, GluedError> {
        (**self).is_running_somewhere(device)
    }
}

impl<T: ListenerHost + ?Sized> ListenerHost for Arc<T> {
    fn watch_default_output(
        &self,
        callback: HardwareCallback,
    ) -> Result<ListenerSubscription, GluedError> {
        (**self).watch_default_output(callback)
    }

    fn watch_is_running(
        &self,
        device: AudioObjectId,
        callback: HardwareCallback,
    ) -> Result<ListenerSubscription, GluedError> {
        (**self).watch_is_running(device, callback)
    }
}
