use anyhow::Result;
use std::sync::Arc;

#[cfg(not(target_os = "macos"))]
use super::{
    AudioDeviceDirectory, AudioObjectId, HardwareCallback, ListenerHost, ListenerSubscription,
    OutputDeviceHandle,
};
#[cfg(not(target_os = "macos"))]
use crate::error::GluedError;

#[cfg(target_os = "macos")]
pub type SystemAudio = Arc<super::CoreAudioDirectory>;

#[cfg(not(target_os = "macos"))]
pub type SystemAudio = Arc<NoAudioSystem>;

/// The audio system of the running host
#[cfg(target_os = "macos")]
pub fn system_audio() -> Result<SystemAudio> {
    Ok(Arc::new(super::CoreAudioDirectory::new()))
}

#[cfg(not(target_os = "macos"))]
pub fn system_audio() -> Result<SystemAudio> {
    anyhow::bail!("audio device control requires macOS CoreAudio")
}

/// Stands in for CoreAudio where it does not exist; cannot be constructed.
#[cfg(not(target_os = "macos"))]
#[derive(Debug, Clone, Copy)]
pub enum NoAudioSystem {}

#[cfg(not(target_os = "macos"))]
impl AudioDeviceDirectory for NoAudioSystem {
    fn current_default_output(&self) -> Result<OutputDeviceHandle, GluedError> {
        match *self {}
    }

    fn name_of(&self, _device: AudioObjectId) -> Option<String> {
        match *self {}
    }

    fn list_output_devices(&self) -> Result<Vec<OutputDeviceHandle>, GluedError> {
        match *self {}
    }

    fn set_default_output(&self, _name: &str) -> Result<(), GluedError> {
        match *self {}
    }

    fn is_running_somewhere(&self, _device: AudioObjectId) -> Result<bool, GluedError> {
        match *self {}
    }
}

#[cfg(not(target_os = "macos"))]
impl ListenerHost for NoAudioSystem {
    fn watch_default_output(
        &self,
        _callback: HardwareCallback,
    ) -> Result<ListenerSubscription, GluedError> {
        match *self {}
    }

    fn watch_is_running(
        &self,
        _device: AudioObjectId,
        _callback: HardwareCallback,
    ) -> Result<ListenerSubscription, GluedError> {
        match *self {}
    }
}
