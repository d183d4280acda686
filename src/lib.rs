//! Glue a wireless audio device to the system output.
//!
//! As soon as audio starts playing through the default output device, glued
//! connects the saved wireless device and routes system audio to it.

pub mod audio;
pub mod config;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod notifications;
pub mod orchestrator;
pub mod service;
pub mod system;
pub mod target;
pub mod wireless;

pub use config::Config;
pub use error::GluedError;
pub use monitor::{ActivityStarted, DeviceActivityMonitor};
pub use orchestrator::{DeviceListing, SwitchOrchestrator, SwitchOutcome, SwitchReport};
pub use service::GlueService;
pub use target::{FileTargetStore, TargetDevice, TargetPreference};
