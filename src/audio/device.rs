use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform identifier of an audio object (`AudioObjectID` on macOS).
///
/// Only valid for the current hardware session. `0` is the unknown object.
pub type AudioObjectId = u32;

pub const UNKNOWN_DEVICE: AudioObjectId = 0;

/// An audio output device as seen by the directory.
///
/// The `name` is the durable identity: the saved target stores names, not ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDeviceHandle {
    pub id: AudioObjectId,
    pub name: Option<String>,
}

impl OutputDeviceHandle {
    pub fn new(id: AudioObjectId) -> Self {
        Self { id, name: None }
    }

    pub fn named(id: AudioObjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("(name unavailable)")
    }
}

impl fmt::Display for OutputDeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (ID: {})", self.display_name(), self.id)
    }
}

/// Output roles that can be retargeted when switching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputRole {
    /// Receives application audio
    DefaultOutput,
    /// Alerts and sound effects
    SystemOutput,
}

impl OutputRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputRole::DefaultOutput => "default output",
            OutputRole::SystemOutput => "system output",
        }
    }
}

impl fmt::Display for OutputRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
