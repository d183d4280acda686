#[cfg(target_os = "macos")]
pub mod coreaudio;
pub mod device;
pub mod directory;
pub mod platform;

#[cfg(target_os = "macos")]
pub use coreaudio::CoreAudioDirectory;
pub use device::{AudioObjectId, OutputDeviceHandle, OutputRole, UNKNOWN_DEVICE};
pub use directory::{
    AudioDeviceDirectory, HardwareCallback, ListenerHost, ListenerKind, ListenerSubscription,
    find_output_by_name, retarget_output_roles,
};
pub use platform::{SystemAudio, system_audio};
