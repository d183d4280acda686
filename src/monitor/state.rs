use chrono::{DateTime, Local};
use std::fmt;

use crate::audio::AudioObjectId;

/// Whether the tracked output device was producing sound at the last reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivityState {
    #[default]
    Idle,
    Running,
}

impl ActivityState {
    pub fn from_running(running: bool) -> Self {
        if running {
            ActivityState::Running
        } else {
            ActivityState::Idle
        }
    }

    /// Record a new reading. Returns `true` only on the `Idle -> Running` edge;
    /// sustained sound and `Running -> Idle` are recorded silently.
    pub fn observe(&mut self, running: bool) -> bool {
        let started = *self == ActivityState::Idle && running;
        *self = ActivityState::from_running(running);
        started
    }
}

impl fmt::Display for ActivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityState::Idle => write!(f, "idle"),
            ActivityState::Running => write!(f, "running"),
        }
    }
}

/// Audio started flowing through the tracked output device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityStarted {
    pub device: AudioObjectId,
    pub device_name: Option<String>,
    pub detected_at: DateTime<Local>,
}

impl fmt::Display for ActivityStarted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "activity started on {} (ID: {}) at {}",
            self.device_name.as_deref().unwrap_or("(name unavailable)"),
            self.device,
            self.detected_at.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Messages hardware callbacks push to the monitor thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareEvent {
    DefaultOutputChanged,
    /// Carries the device the listener was registered against and the
    /// reading taken when the callback fired
    RunningChanged { device: AudioObjectId, running: bool },
    Shutdown,
}
