//! Access to the `dosdevices` directory.
//!
//! - `DosDevices`: trait the allocator and mount point code go through
//! - `UnixDosDevices`: real symlinks under `<prefix>/dosdevices`
//! - `MemoryDosDevices`: in-memory implementation with race injection

mod dos_devices;
mod memory_devices;
#[cfg(unix)]
mod unix_devices;

pub use dos_devices::{DeviceId, DosDevices, LinkTarget};
pub use memory_devices::MemoryDosDevices;
#[cfg(unix)]
pub use unix_devices::UnixDosDevices;
