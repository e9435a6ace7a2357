//! Mount manager - owns every drive and handles device arrival and removal.
//!
//! The manager is plain single-threaded state. Callers that share it between
//! threads must serialize access themselves (a mutex, or a single task that
//! owns it and receives requests over a channel).

use std::path::Path;

use log::{debug, trace, warn};

use crate::allocator::allocate_letter;
use crate::dispatch::dispatch;
use crate::drive::{DeviceClass, DeviceNumber, Drive, DriveLetter, DriveType};
use crate::error::{DriveError, DriveResult};
use crate::fs::DosDevices;
use crate::mount_point::set_unix_mount_point;
use crate::namespace::DeviceNamespace;
use crate::notify::{Notifier, VolumeChange, VolumeEvent};
use crate::registry::{DriveId, DriveRegistry};
use crate::store::DriveTypeStore;

/// Name of the always-present first hard disk.
pub const BOOT_DISK_NAME: &str = r"\Device\Harddisk0";

/// Stable alias of the boot disk.
pub const BOOT_DISK_ALIAS: &str = r"\??\PhysicalDrive0";

pub struct MountManager<F, S, N> {
    pub(crate) fs: F,
    pub(crate) store: S,
    pub(crate) notifier: N,
    pub(crate) namespace: DeviceNamespace,
    pub(crate) drives: DriveRegistry,
    boot_disk: Drive,
}

impl<F, S, N> MountManager<F, S, N> {
    /// Create a manager with only the boot disk. Nothing is read from `fs`.
    pub fn new(fs: F, store: S, notifier: N) -> DriveResult<Self> {
        let mut namespace = DeviceNamespace::new();
        let device = namespace.create_device(BOOT_DISK_NAME)?;
        namespace.create_symlink(BOOT_DISK_ALIAS, BOOT_DISK_NAME)?;
        let boot_disk = Drive::new(
            None,
            DriveType::Fixed,
            device,
            BOOT_DISK_NAME.to_string(),
            DeviceNumber {
                device_type: DeviceClass::Disk,
                device_number: 0,
                partition_number: 0,
            },
        );

        Ok(Self {
            fs,
            store,
            notifier,
            namespace,
            drives: DriveRegistry::new(),
            boot_disk,
        })
    }

    pub fn drives(&self) -> &DriveRegistry {
        &self.drives
    }

    pub fn drive(&self, id: DriveId) -> Option<&Drive> {
        self.drives.get(id)
    }

    /// The static `\Device\Harddisk0` drive. It is not in the registry.
    pub fn boot_disk(&self) -> &Drive {
        &self.boot_disk
    }

    pub fn namespace(&self) -> &DeviceNamespace {
        &self.namespace
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    pub fn fs_mut(&mut self) -> &mut F {
        &mut self.fs
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run a device control request on the drive behind `name`.
    ///
    /// `name` may be a device name or a link such as `\??\C:`.
    pub fn ioctl(&self, name: &str, code: u32, output_len: usize) -> DriveResult<Vec<u8>> {
        let handle = self.namespace.resolve(name)?;
        let drive = if self.boot_disk.device() == handle {
            &self.boot_disk
        } else {
            self.drives
                .iter()
                .map(|(_, d)| d)
                .find(|d| d.device() == handle)
                .ok_or_else(|| DriveError::ObjectNotFound(name.to_string()))?
        };
        dispatch(drive, code, output_len)
    }
}

impl<F: DosDevices, S: DriveTypeStore, N: Notifier> MountManager<F, S, N> {
    /// Create a manager and populate it from the existing `dosdevices` state.
    pub fn start(fs: F, store: S, notifier: N) -> DriveResult<Self> {
        let mut manager = Self::new(fs, store, notifier)?;
        manager.scan_dos_devices();
        Ok(manager)
    }

    /// Find or create the drive for a newly arrived device.
    ///
    /// A drive already known under `udi` with the same type is reused; one
    /// with a different type is destroyed and recreated. Any other drive
    /// holding the allocated letter is evicted. Evictions are not undone if
    /// a later step fails.
    pub fn attach(
        &mut self,
        udi: &str,
        device: &Path,
        mount_point: Option<&Path>,
        drive_type: DriveType,
    ) -> DriveResult<DriveLetter> {
        let letter = allocate_letter(&mut self.fs, device, drive_type)?;

        let mut reused = None;
        for id in self.drives.ids() {
            let Some(drive) = self.drives.get(id) else { continue };
            if drive.udi() == Some(udi) {
                if drive.drive_type() == drive_type && reused.is_none() {
                    reused = Some(id);
                    continue;
                }
                debug!("{} changed type to {}, recreating", udi, drive_type);
                self.delete_drive(id);
            } else if drive.letter() == Some(letter) {
                debug!("{} takes {} from {}", udi, letter, drive.name());
                self.delete_drive(id);
            }
        }

        let id = match reused {
            Some(id) => id,
            None => self.create_drive(Some(udi), drive_type).inspect_err(|e| {
                warn!("cannot create drive for {}: {}", udi, e);
            })?,
        };

        if let Err(e) = self.assign_letter(id, Some(letter)) {
            warn!("cannot assign {} to {}: {}", letter, udi, e);
            if reused.is_none() {
                self.delete_drive(id);
            }
            return Err(e);
        }
        self.set_unix_mount_point(id, mount_point)?;

        trace!(
            "added device {} udi {} for {} on {:?} type {}",
            letter,
            udi,
            device.display(),
            mount_point,
            drive_type
        );

        if let Err(e) = self.store.store(letter, drive_type) {
            warn!("cannot record drive type of {}: {}", letter, e);
        }
        self.notifier
            .notify(VolumeChange::new(letter, VolumeEvent::Arrival));
        Ok(letter)
    }

    /// Remove the drive known under `udi`. Returns false if there is none.
    pub fn detach(&mut self, udi: &str) -> bool {
        let Some(id) = self.drives.find_by_udi(udi) else {
            return false;
        };

        if let Some(drive) = self.drives.get_mut(id) {
            if let Some(letter) = drive.letter() {
                let modified = set_unix_mount_point(drive, &mut self.fs, None);

                if let Err(e) = self.store.remove(letter) {
                    warn!("cannot clear drive type of {}: {}", letter, e);
                }
                if modified {
                    self.notifier
                        .notify(VolumeChange::new(letter, VolumeEvent::RemoveComplete));
                }
            }
        }

        self.delete_drive(id);
        true
    }
}

#[cfg(unix)]
impl<N: Notifier> MountManager<crate::fs::UnixDosDevices, crate::store::JsonDriveTypeStore, N> {
    /// Open the prefix described by `config` and scan it.
    pub fn from_config(config: &crate::config::MountManagerConfig, notifier: N) -> DriveResult<Self> {
        let fs = crate::fs::UnixDosDevices::open(config.dosdevices_dir())?;
        let store = crate::store::JsonDriveTypeStore::open(config.drive_types_path())?;
        Self::start(fs, store, notifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{IOCTL_DISK_GET_DRIVE_GEOMETRY, IOCTL_STORAGE_GET_DEVICE_NUMBER};
    use crate::fs::MemoryDosDevices;
    use crate::notify::NullNotifier;
    use crate::store::MemoryDriveTypeStore;

    fn manager() -> MountManager<MemoryDosDevices, MemoryDriveTypeStore, NullNotifier> {
        let mut fs = MemoryDosDevices::new();
        fs.add_device("/dev/sdb1", 0x811);
        MountManager::new(fs, MemoryDriveTypeStore::new(), NullNotifier).unwrap()
    }

    #[test]
    fn test_boot_disk() {
        let mgr = manager();
        let boot = mgr.boot_disk();
        assert_eq!(boot.name(), BOOT_DISK_NAME);
        assert_eq!(boot.letter(), None);
        assert!(mgr.drives().is_empty());

        let out = mgr
            .ioctl(BOOT_DISK_ALIAS, IOCTL_STORAGE_GET_DEVICE_NUMBER, 12)
            .unwrap();
        assert_eq!(out, [7, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_ioctl_through_drive_letter() {
        let mut mgr = manager();
        let letter = mgr
            .attach("udi-sdb", Path::new("/dev/sdb1"), None, DriveType::Fixed)
            .unwrap();
        let out = mgr
            .ioctl(&format!(r"\??\{}:", letter.as_char()), IOCTL_DISK_GET_DRIVE_GEOMETRY, 24)
            .unwrap();
        assert_eq!(out.len(), 24);
    }

    #[test]
    fn test_ioctl_unknown_name() {
        let mgr = manager();
        assert!(matches!(
            mgr.ioctl(r"\??\Q:", IOCTL_DISK_GET_DRIVE_GEOMETRY, 24),
            Err(DriveError::ObjectNotFound(_))
        ));
    }

    #[test]
    fn test_attach_failure_leaves_no_drive() {
        let mut mgr = manager();
        assert!(mgr
            .attach("udi-x", Path::new("/dev/none"), None, DriveType::Fixed)
            .is_err());
        assert!(mgr.drives().is_empty());
    }

    #[test]
    fn test_attach_letter_collision_drops_new_drive() {
        let mut mgr = manager();
        // A link nobody owns already sits on C:
        mgr.namespace.create_symlink(r"\??\C:", BOOT_DISK_NAME).unwrap();

        let err = mgr
            .attach("udi-sdb", Path::new("/dev/sdb1"), None, DriveType::Fixed)
            .unwrap_err();
        assert!(matches!(err, DriveError::NameCollision(_)));
        assert!(mgr.drives().is_empty());
        assert!(mgr.namespace().lookup(r"\Device\Harddisk1").is_none());
    }
}
