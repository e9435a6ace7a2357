//! Symlink-backed `dosdevices` directory.

use std::fs::{self, FileType};
use std::io;
use std::os::unix::fs::{symlink, FileTypeExt, MetadataExt};
use std::path::{Path, PathBuf};

use super::dos_devices::{device_link_name, mount_link_name, DeviceId, DosDevices, LinkTarget};
use crate::drive::DriveLetter;
use crate::error::{DriveError, DriveResult};

/// `dosdevices` directory on the host filesystem.
#[derive(Debug, Clone)]
pub struct UnixDosDevices {
    dir: PathBuf,
}

impl UnixDosDevices {
    /// Use `dir` as the `dosdevices` directory, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> DriveResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn device_path(&self, letter: DriveLetter) -> PathBuf {
        self.dir.join(device_link_name(letter))
    }

    fn mount_path(&self, letter: DriveLetter) -> PathBuf {
        self.dir.join(mount_link_name(letter))
    }
}

/// Disks are block devices on Linux and Solaris, char devices on the BSDs.
fn is_valid_device(file_type: &FileType) -> bool {
    if cfg!(any(target_os = "linux", target_os = "solaris", target_os = "illumos")) {
        file_type.is_block_device()
    } else {
        file_type.is_char_device()
    }
}

impl DosDevices for UnixDosDevices {
    fn device_id(&self, device: &Path) -> DriveResult<DeviceId> {
        let md = fs::metadata(device).map_err(|_| DriveError::InvalidDevice(device.to_path_buf()))?;
        if is_valid_device(&md.file_type()) {
            Ok(md.rdev())
        } else {
            Err(DriveError::InvalidDevice(device.to_path_buf()))
        }
    }

    fn device_link(&self, letter: DriveLetter) -> LinkTarget {
        let path = self.device_path(letter);
        match fs::metadata(&path) {
            Ok(md) if is_valid_device(&md.file_type()) => LinkTarget::Device(md.rdev()),
            Ok(_) => LinkTarget::NotADevice,
            Err(_) => match fs::symlink_metadata(&path) {
                Err(e) if e.kind() == io::ErrorKind::NotFound => LinkTarget::Missing,
                _ => LinkTarget::Broken,
            },
        }
    }

    fn mount_link_exists(&self, letter: DriveLetter) -> bool {
        !matches!(
            fs::symlink_metadata(self.mount_path(letter)),
            Err(e) if e.kind() == io::ErrorKind::NotFound
        )
    }

    fn claim_device_link(&mut self, letter: DriveLetter, device: &Path) -> io::Result<()> {
        symlink(device, self.device_path(letter))
    }

    fn read_mount_link(&self, letter: DriveLetter) -> Option<PathBuf> {
        fs::read_link(self.mount_path(letter)).ok()
    }

    fn create_mount_link(&mut self, letter: DriveLetter, target: &Path) -> io::Result<()> {
        symlink(target, self.mount_path(letter))
    }

    fn remove_mount_link(&mut self, letter: DriveLetter) -> io::Result<()> {
        fs::remove_file(self.mount_path(letter))
    }
}
