use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A paired (or recently seen) wireless device, fresh from a directory query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirelessDeviceRecord {
    pub address: String,
    pub name: String,
    pub is_connected: bool,
    pub is_paired: bool,
    /// When the device was last connected, if the wireless stack reports it
    #[serde(default)]
    pub last_access: Option<DateTime<FixedOffset>>,
}

impl WirelessDeviceRecord {
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
            is_connected: false,
            is_paired: true,
            last_access: None,
        }
    }

    pub fn connected(mut self, is_connected: bool) -> Self {
        self.is_connected = is_connected;
        self
    }

    pub fn paired(mut self, is_paired: bool) -> Self {
        self.is_paired = is_paired;
        self
    }

    pub fn accessed_at(mut self, last_access: DateTime<FixedOffset>) -> Self {
        self.last_access = Some(last_access);
        self
    }
}

impl fmt::Display for WirelessDeviceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]: {}, {}",
            self.name,
            self.address,
            if self.is_connected {
                "connected"
            } else {
                "not connected"
            },
            if self.is_paired { "paired" } else { "not paired" }
        )?;
        if let Some(last_access) = self.last_access {
            write!(f, ", last used {}", last_access.format("%Y-%m-%d %H:%M"))?;
        }
        Ok(())
    }
}
