//! DosDevices trait - filesystem interface for drive letter artifacts.
//!
//! Each letter has two artifacts in the `dosdevices` directory:
//! - `x::` links to the raw Unix device node and marks the letter as taken
//! - `x:` links to the Unix mount point of the filesystem on that device

use std::io;
use std::path::{Path, PathBuf};

use crate::drive::DriveLetter;
use crate::error::DriveResult;

/// Identity of a device node (its `rdev`).
pub type DeviceId = u64;

/// What the `x::` artifact of a letter resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTarget {
    /// Resolves to a device node with this identity.
    Device(DeviceId),
    /// Resolves to something that is not a device node.
    NotADevice,
    /// Exists but cannot be resolved.
    Broken,
    /// No artifact at all.
    Missing,
}

pub trait DosDevices {
    /// Identity of a device node. Fails if `device` is not a valid device.
    fn device_id(&self, device: &Path) -> DriveResult<DeviceId>;

    /// Classify the `x::` artifact for `letter`.
    fn device_link(&self, letter: DriveLetter) -> LinkTarget;

    /// Check whether the `x:` artifact exists, dangling or not.
    fn mount_link_exists(&self, letter: DriveLetter) -> bool;

    /// Atomically create `x::` -> `device`. Fails if the artifact exists.
    fn claim_device_link(&mut self, letter: DriveLetter, device: &Path) -> io::Result<()>;

    /// Target of the `x:` artifact, if any.
    fn read_mount_link(&self, letter: DriveLetter) -> Option<PathBuf>;

    /// Create `x:` -> `target`.
    fn create_mount_link(&mut self, letter: DriveLetter, target: &Path) -> io::Result<()>;

    /// Remove the `x:` artifact.
    fn remove_mount_link(&mut self, letter: DriveLetter) -> io::Result<()>;
}

/// Artifact name of the device link, e.g. `c::`.
pub(crate) fn device_link_name(letter: DriveLetter) -> String {
    format!("{}::", letter.as_lower())
}

/// Artifact name of the mount link, e.g. `c:`.
pub(crate) fn mount_link_name(letter: DriveLetter) -> String {
    format!("{}:", letter.as_lower())
}
