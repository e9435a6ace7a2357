//! Startup scan of existing drive mappings.

use log::{debug, warn};

use crate::drive::{DriveLetter, DriveType};
use crate::fs::DosDevices;
use crate::manager::MountManager;
use crate::mount_point::set_drive_letter;
use crate::store::DriveTypeStore;

impl<F: DosDevices, S: DriveTypeStore, N> MountManager<F, S, N> {
    /// Type of a drive found at startup: the stored override if it names a
    /// known type, else removable for A: and B: and fixed for the rest.
    fn startup_type(&self, letter: DriveLetter) -> DriveType {
        let stored = match self.store.load(letter) {
            Ok(stored) => stored,
            Err(e) => {
                warn!("cannot read drive type of {}: {}", letter, e);
                None
            }
        };
        stored
            .as_deref()
            .and_then(DriveType::from_registry_name)
            .unwrap_or_else(|| DriveType::default_for_letter(letter))
    }

    /// Create a drive for every letter whose `x:` artifact exists.
    ///
    /// The letter comes from the artifact itself, so no allocation is done.
    /// Returns the number of drives created.
    pub fn scan_dos_devices(&mut self) -> usize {
        let mut created = 0;

        for letter in DriveLetter::all() {
            let Some(link) = self.fs.read_mount_link(letter) else {
                continue;
            };
            let drive_type = self.startup_type(letter);

            let id = match self.create_drive(None, drive_type) {
                Ok(id) => id,
                Err(e) => {
                    warn!("cannot create drive for {}: {}", letter, e);
                    continue;
                }
            };
            let Some(drive) = self.drives.get_mut(id) else { continue };
            debug!("found {} -> {} ({})", letter, link.display(), drive_type);
            drive.unix_mount = Some(link);
            if let Err(e) = set_drive_letter(drive, &mut self.namespace, Some(letter)) {
                warn!("cannot assign {}: {}", letter, e);
                self.delete_drive(id);
                continue;
            }
            created += 1;
        }
        created
    }
}

#[cfg(test)]
mod tests {
    use crate::drive::{DriveLetter, DriveType};
    use crate::fs::MemoryDosDevices;
    use crate::manager::MountManager;
    use crate::notify::NullNotifier;
    use crate::store::MemoryDriveTypeStore;

    fn letter(c: char) -> DriveLetter {
        DriveLetter::from_char(c).unwrap()
    }

    #[test]
    fn test_scan_creates_drives() {
        let mut fs = MemoryDosDevices::new();
        fs.set_mount_link(letter('A'), "/media/floppy");
        fs.set_mount_link(letter('C'), "/home/user/c_drive");
        fs.set_mount_link(letter('Z'), "/");

        let mgr = MountManager::start(fs, MemoryDriveTypeStore::new(), NullNotifier).unwrap();
        let drives: Vec<_> = mgr.drives().iter().map(|(_, d)| d).collect();
        assert_eq!(drives.len(), 3);

        assert_eq!(drives[0].letter(), Some(letter('A')));
        assert_eq!(drives[0].drive_type(), DriveType::Removable);
        assert_eq!(drives[0].name(), r"\Device\Floppy0");

        assert_eq!(drives[1].letter(), Some(letter('C')));
        assert_eq!(drives[1].drive_type(), DriveType::Fixed);
        assert_eq!(drives[1].name(), r"\Device\HarddiskVolume1");
        assert_eq!(
            drives[1].unix_mount(),
            Some(std::path::Path::new("/home/user/c_drive"))
        );
        assert!(drives[1]
            .mount_points()
            .all(|mp| mp.id() == Some("/home/user/c_drive")));

        assert_eq!(drives[2].name(), r"\Device\HarddiskVolume2");
        assert!(drives.iter().all(|d| d.udi().is_none()));
    }

    #[test]
    fn test_scan_uses_stored_types() {
        let mut fs = MemoryDosDevices::new();
        fs.set_mount_link(letter('D'), "/media/cdrom");
        fs.set_mount_link(letter('E'), "/media/other");
        fs.set_mount_link(letter('F'), "/media/tape");
        let store = MemoryDriveTypeStore::with_values([
            ("d:", "CDROM"),
            ("e:", "network"),
            ("f:", "tape"),
        ]);

        let mgr = MountManager::start(fs, store, NullNotifier).unwrap();
        let types: Vec<_> = mgr.drives().iter().map(|(_, d)| d.drive_type()).collect();
        assert_eq!(types, vec![DriveType::Cdrom, DriveType::Remote, DriveType::Fixed]);

        let cdrom = mgr.drives().find_by_letter(letter('D')).unwrap();
        assert_eq!(mgr.drive(cdrom).unwrap().name(), r"\Device\CdRom0");
    }

    #[test]
    fn test_scan_skips_letters_without_link() {
        let fs = MemoryDosDevices::new();
        let mgr = MountManager::start(fs, MemoryDriveTypeStore::new(), NullNotifier).unwrap();
        assert!(mgr.drives().is_empty());
    }

    #[test]
    fn test_scan_does_not_touch_fs() {
        let mut fs = MemoryDosDevices::new();
        fs.set_mount_link(letter('C'), "/mnt/c");
        let mgr = MountManager::start(fs, MemoryDriveTypeStore::new(), NullNotifier).unwrap();
        assert_eq!(mgr.fs().mutations(), 0);
        assert!(mgr.fs().device_link_target(letter('C')).is_none());
    }
}
