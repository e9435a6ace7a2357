//! Drive Letter and Mount Point Manager Core
//!
//! This crate maps the 26 DOS drive letters onto Unix block devices and their
//! mount points:
//! - Drive letter allocation that tolerates other processes racing for letters
//! - Device objects for floppies, CD-ROMs, disks and volumes
//! - The DOS device and volume mount points of every lettered drive
//! - Synthetic answers to device information queries
//!
//! # Architecture
//!
//! - `DosDevices` trait: the `dosdevices` directory (`x::` and `x:` links)
//! - `DeviceNamespace`: device objects and symbolic links by name
//! - `DriveRegistry`: ordered arena of live drives
//! - `MountManager`: ties it together; attach, detach, startup scan, ioctls
//! - `DriveTypeStore` / `Notifier`: best-effort outside collaborators

pub mod allocator;
pub mod bootstrap;
pub mod config;
pub mod dispatch;
pub mod drive;
pub mod error;
pub mod fs;
pub mod lifecycle;
pub mod manager;
pub mod mount_point;
pub mod namespace;
pub mod notify;
pub mod registry;
pub mod store;

pub use allocator::allocate_letter;
pub use config::MountManagerConfig;
pub use dispatch::{
    dispatch, DiskGeometry, IoControl, MediaType, NtStatus, IOCTL_CDROM_READ_TOC,
    IOCTL_DISK_GET_DRIVE_GEOMETRY, IOCTL_STORAGE_GET_DEVICE_NUMBER,
};
pub use drive::{DeviceClass, DeviceNumber, Drive, DriveLetter, DriveType, PARTITION_NONE};
pub use error::{DriveError, DriveResult};
#[cfg(unix)]
pub use fs::UnixDosDevices;
pub use fs::{DeviceId, DosDevices, LinkTarget, MemoryDosDevices};
pub use manager::{MountManager, BOOT_DISK_ALIAS, BOOT_DISK_NAME};
pub use mount_point::{MountPoint, MountPointKind};
pub use namespace::{DeviceHandle, DeviceNamespace};
pub use notify::{ChannelNotifier, Notifier, NullNotifier, VolumeChange, VolumeEvent};
pub use registry::{DriveId, DriveRegistry};
pub use store::{DriveTypeStore, JsonDriveTypeStore, MemoryDriveTypeStore};
