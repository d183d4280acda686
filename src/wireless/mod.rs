pub mod address;
pub mod blueutil;
pub mod device;
pub mod directory;

pub use blueutil::{BlueutilBackend, DEFAULT_BLUEUTIL_PATH};
pub use device::WirelessDeviceRecord;
pub use directory::{WirelessBackend, WirelessDeviceDirectory, WirelessDirectory};
