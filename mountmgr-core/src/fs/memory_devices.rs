//! In-memory `dosdevices` directory.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use super::dos_devices::{DeviceId, DosDevices, LinkTarget};
use crate::drive::DriveLetter;
use crate::error::{DriveError, DriveResult};

/// In-memory stand-in for the `dosdevices` directory and the device nodes it
/// links to.
///
/// - `add_device` registers a device node path with an identity
/// - `add_path` registers an existing non-device path (a mount directory)
/// - `contend` makes the next claim of a letter lose a race to a rival
#[derive(Debug, Default, Clone)]
pub struct MemoryDosDevices {
    devices: HashMap<PathBuf, DeviceId>,
    paths: HashSet<PathBuf>,
    device_links: BTreeMap<DriveLetter, PathBuf>,
    mount_links: BTreeMap<DriveLetter, PathBuf>,
    rivals: HashMap<DriveLetter, PathBuf>,
    mutations: usize,
}

impl MemoryDosDevices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device node.
    pub fn add_device(&mut self, path: impl Into<PathBuf>, id: DeviceId) {
        self.devices.insert(path.into(), id);
    }

    /// Register an existing path that is not a device node.
    pub fn add_path(&mut self, path: impl Into<PathBuf>) {
        self.paths.insert(path.into());
    }

    /// Place a `x::` artifact directly, as another process would.
    pub fn set_device_link(&mut self, letter: DriveLetter, target: impl Into<PathBuf>) {
        self.device_links.insert(letter, target.into());
    }

    /// Place a `x:` artifact directly.
    pub fn set_mount_link(&mut self, letter: DriveLetter, target: impl Into<PathBuf>) {
        self.mount_links.insert(letter, target.into());
    }

    /// Make the next claim of `letter` fail because a rival linked it to
    /// `device` first.
    pub fn contend(&mut self, letter: DriveLetter, device: impl Into<PathBuf>) {
        self.rivals.insert(letter, device.into());
    }

    /// Target of the `x::` artifact.
    pub fn device_link_target(&self, letter: DriveLetter) -> Option<&Path> {
        self.device_links.get(&letter).map(PathBuf::as_path)
    }

    /// Number of successful mount link creations and removals.
    pub fn mutations(&self) -> usize {
        self.mutations
    }
}

impl DosDevices for MemoryDosDevices {
    fn device_id(&self, device: &Path) -> DriveResult<DeviceId> {
        self.devices
            .get(device)
            .copied()
            .ok_or_else(|| DriveError::InvalidDevice(device.to_path_buf()))
    }

    fn device_link(&self, letter: DriveLetter) -> LinkTarget {
        match self.device_links.get(&letter) {
            None => LinkTarget::Missing,
            Some(target) => match self.devices.get(target) {
                Some(&id) => LinkTarget::Device(id),
                None if self.paths.contains(target) => LinkTarget::NotADevice,
                None => LinkTarget::Broken,
            },
        }
    }

    fn mount_link_exists(&self, letter: DriveLetter) -> bool {
        self.mount_links.contains_key(&letter)
    }

    fn claim_device_link(&mut self, letter: DriveLetter, device: &Path) -> io::Result<()> {
        if let Some(rival) = self.rivals.remove(&letter) {
            self.device_links.insert(letter, rival);
        }
        if self.device_links.contains_key(&letter) {
            return Err(io::Error::from(io::ErrorKind::AlreadyExists));
        }
        self.device_links.insert(letter, device.to_path_buf());
        Ok(())
    }

    fn read_mount_link(&self, letter: DriveLetter) -> Option<PathBuf> {
        self.mount_links.get(&letter).cloned()
    }

    fn create_mount_link(&mut self, letter: DriveLetter, target: &Path) -> io::Result<()> {
        if self.mount_links.contains_key(&letter) {
            return Err(io::Error::from(io::ErrorKind::AlreadyExists));
        }
        self.mount_links.insert(letter, target.to_path_buf());
        self.mutations += 1;
        Ok(())
    }

    fn remove_mount_link(&mut self, letter: DriveLetter) -> io::Result<()> {
        match self.mount_links.remove(&letter) {
            Some(_) => {
                self.mutations += 1;
                Ok(())
            }
            None => Err(io::Error::from(io::ErrorKind::NotFound)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letter(c: char) -> DriveLetter {
        DriveLetter::from_char(c).unwrap()
    }

    #[test]
    fn test_device_link_classification() {
        let mut fs = MemoryDosDevices::new();
        fs.add_device("/dev/sdb1", 0x811);
        fs.add_path("/mnt/data");
        fs.set_device_link(letter('C'), "/dev/sdb1");
        fs.set_device_link(letter('D'), "/mnt/data");
        fs.set_device_link(letter('E'), "/dev/gone");

        assert_eq!(fs.device_link(letter('C')), LinkTarget::Device(0x811));
        assert_eq!(fs.device_link(letter('D')), LinkTarget::NotADevice);
        assert_eq!(fs.device_link(letter('E')), LinkTarget::Broken);
        assert_eq!(fs.device_link(letter('F')), LinkTarget::Missing);
    }

    #[test]
    fn test_claim_is_exclusive() {
        let mut fs = MemoryDosDevices::new();
        fs.claim_device_link(letter('C'), Path::new("/dev/sdb1"))
            .unwrap();
        let err = fs
            .claim_device_link(letter('C'), Path::new("/dev/sdc1"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(
            fs.device_link_target(letter('C')),
            Some(Path::new("/dev/sdb1"))
        );
    }

    #[test]
    fn test_contended_claim() {
        let mut fs = MemoryDosDevices::new();
        fs.contend(letter('C'), "/dev/rival");

        assert!(fs
            .claim_device_link(letter('C'), Path::new("/dev/sdb1"))
            .is_err());
        assert_eq!(
            fs.device_link_target(letter('C')),
            Some(Path::new("/dev/rival"))
        );
    }

    #[test]
    fn test_mount_link_mutations() {
        let mut fs = MemoryDosDevices::new();
        fs.create_mount_link(letter('C'), Path::new("/mnt/c"))
            .unwrap();
        assert!(fs.mount_link_exists(letter('C')));
        assert!(fs
            .create_mount_link(letter('C'), Path::new("/mnt/c"))
            .is_err());
        fs.remove_mount_link(letter('C')).unwrap();
        assert!(fs.remove_mount_link(letter('C')).is_err());
        assert_eq!(fs.mutations(), 2);
    }
}
