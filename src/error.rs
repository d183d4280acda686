use thiserror::Error;

/// Status code reported by the OS call that failed (`OSStatus`, `IOReturn` or a
/// process exit code for the command-line wireless backend).
pub type OsStatus = i32;

/// Errors raised by the device directories and the activity monitor.
///
/// None of these are fatal. The orchestrator records them per step and keeps
/// going, and the monitor logs them and continues in a degraded state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GluedError {
    /// A directory query failed
    #[error("hardware query failed ({what}): status {status}")]
    HardwareQuery { what: &'static str, status: OsStatus },

    /// Name or identifier resolves to nothing
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("failed to connect {identifier}: status {status}")]
    ConnectFailed {
        identifier: String,
        status: OsStatus,
    },

    /// Setting the default or system output role failed
    #[error("failed to set {role}: status {status}")]
    HardwareSet { role: &'static str, status: OsStatus },

    #[error("failed to register {kind} listener: status {status}")]
    ListenerRegistration { kind: &'static str, status: OsStatus },

    #[error("wireless subsystem unavailable")]
    WirelessUnavailable,

    /// The external wireless tool could not be run at all
    #[error("{tool} failed: {message}")]
    ToolFailed { tool: String, message: String },
}
