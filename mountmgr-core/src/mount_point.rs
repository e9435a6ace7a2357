//! Mount points of lettered drives.
//!
//! Every drive with a letter owns two mount points: the DOS device link
//! `\??\X:` and the volume link `\??\Volume{GUID}`. Both are created and
//! deleted together and carry the drive's Unix mount path as their id.

use std::path::Path;

use log::{debug, warn};
use serde::Serialize;
use uuid::Uuid;

use crate::drive::{Drive, DriveLetter};
use crate::error::{DriveError, DriveResult};
use crate::fs::DosDevices;
use crate::manager::MountManager;
use crate::namespace::DeviceNamespace;
use crate::registry::DriveId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MountPointKind {
    DosDevice,
    Volume,
}

/// A symbolic link in the device namespace owned by a drive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountPoint {
    kind: MountPointKind,
    link: String,
    device: String,
    id: Option<String>,
}

/// Volume GUID of a drive letter: all zero except the last byte, which holds
/// the uppercase letter.
pub fn volume_guid(letter: DriveLetter) -> Uuid {
    let mut tail = [0u8; 8];
    tail[7] = letter.as_char() as u8;
    Uuid::from_fields(0, 0, 0, &tail)
}

impl MountPoint {
    fn link_name(kind: MountPointKind, letter: DriveLetter) -> String {
        match kind {
            MountPointKind::DosDevice => format!(r"\??\{}:", letter.as_char()),
            MountPointKind::Volume => format!(r"\??\Volume{{{}}}", volume_guid(letter)),
        }
    }

    pub(crate) fn add(
        ns: &mut DeviceNamespace,
        kind: MountPointKind,
        device: &str,
        letter: DriveLetter,
        id: Option<&str>,
    ) -> DriveResult<Self> {
        let link = Self::link_name(kind, letter);
        ns.create_symlink(&link, device)?;
        Ok(Self {
            kind,
            link,
            device: device.to_string(),
            id: id.map(str::to_string),
        })
    }

    pub(crate) fn delete(self, ns: &mut DeviceNamespace) {
        ns.delete_symlink(&self.link);
    }

    pub(crate) fn set_id(&mut self, id: Option<&str>) {
        self.id = id.map(str::to_string);
    }

    pub fn kind(&self) -> MountPointKind {
        self.kind
    }

    /// Link name, e.g. `\??\C:`.
    pub fn link(&self) -> &str {
        &self.link
    }

    /// Device name the link points at.
    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

fn mount_id(path: Option<&Path>) -> Option<String> {
    path.map(|p| p.to_string_lossy().into_owned())
}

fn detach_mount_points(drive: &mut Drive, ns: &mut DeviceNamespace) {
    if let Some(mp) = drive.dosdev.take() {
        mp.delete(ns);
    }
    if let Some(mp) = drive.volume.take() {
        mp.delete(ns);
    }
}

/// Set or change the letter of a drive, recreating its mount points.
pub(crate) fn set_drive_letter(
    drive: &mut Drive,
    ns: &mut DeviceNamespace,
    letter: Option<DriveLetter>,
) -> DriveResult<()> {
    if drive.letter == letter {
        return Ok(());
    }
    detach_mount_points(drive, ns);
    drive.letter = letter;
    let Some(letter) = letter else { return Ok(()) };

    let id = mount_id(drive.unix_mount.as_deref());
    let dosdev = MountPoint::add(ns, MountPointKind::DosDevice, &drive.name, letter, id.as_deref());
    let volume = MountPoint::add(ns, MountPointKind::Volume, &drive.name, letter, id.as_deref());
    match (dosdev, volume) {
        (Ok(dosdev), Ok(volume)) => {
            drive.dosdev = Some(dosdev);
            drive.volume = Some(volume);
            Ok(())
        }
        (dosdev, volume) => {
            let mut first_err = None;
            for mp in [dosdev, volume] {
                match mp {
                    Ok(mp) => mp.delete(ns),
                    Err(e) => {
                        first_err.get_or_insert(e);
                    }
                }
            }
            drive.letter = None;
            Err(first_err.unwrap_or_else(|| DriveError::NameCollision(letter.to_string())))
        }
    }
}

/// Point the drive's `x:` artifact at `mount_point`, or remove it.
///
/// Returns whether the artifact changed on disk.
pub(crate) fn set_unix_mount_point<F: DosDevices + ?Sized>(
    drive: &mut Drive,
    fs: &mut F,
    mount_point: Option<&Path>,
) -> bool {
    let Some(letter) = drive.letter else {
        debug!("{} has no letter, not touching mount link", drive.name);
        return false;
    };
    let mut modified = false;

    match mount_point.filter(|p| !p.as_os_str().is_empty()) {
        Some(path) => {
            if drive.unix_mount.as_deref() != Some(path) {
                modified = fs.remove_mount_link(letter).is_ok();
                match fs.create_mount_link(letter, path) {
                    Ok(()) => {
                        modified = true;
                        drive.unix_mount = Some(path.to_path_buf());
                    }
                    Err(e) => {
                        warn!("cannot link {} to {}: {}", letter, path.display(), e);
                        drive.unix_mount = None;
                    }
                }
            }
        }
        None => {
            modified = fs.remove_mount_link(letter).is_ok();
            drive.unix_mount = None;
        }
    }

    let id = mount_id(drive.unix_mount.as_deref());
    for mp in drive.dosdev.iter_mut().chain(drive.volume.iter_mut()) {
        mp.set_id(id.as_deref());
    }
    modified
}

/// Drop the `x:` artifact of the drive's current letter and forget its Unix
/// mount path. Used before the letter changes, since the artifact is keyed
/// by letter.
fn release_mount_link<F: DosDevices + ?Sized>(drive: &mut Drive, fs: &mut F) {
    let (Some(letter), Some(_)) = (drive.letter, drive.unix_mount.as_ref()) else {
        return;
    };
    if let Err(e) = fs.remove_mount_link(letter) {
        warn!("cannot remove mount link of {}: {}", letter, e);
    }
    drive.unix_mount = None;
}

impl<F: DosDevices, S, N> MountManager<F, S, N> {
    /// Set or change the letter of a drive. `None` only detaches.
    pub fn assign_letter(&mut self, id: DriveId, letter: Option<DriveLetter>) -> DriveResult<()> {
        let drive = self
            .drives
            .get_mut(id)
            .ok_or_else(|| DriveError::ObjectNotFound(format!("{:?}", id)))?;
        if drive.letter != letter {
            release_mount_link(drive, &mut self.fs);
        }
        set_drive_letter(drive, &mut self.namespace, letter)
    }

    /// Update the Unix mount point of a drive.
    ///
    /// Returns whether the filesystem artifact changed, which is what decides
    /// if a volume change notification is due.
    pub fn set_unix_mount_point(&mut self, id: DriveId, mount_point: Option<&Path>) -> DriveResult<bool> {
        let drive = self
            .drives
            .get_mut(id)
            .ok_or_else(|| DriveError::ObjectNotFound(format!("{:?}", id)))?;
        Ok(set_unix_mount_point(drive, &mut self.fs, mount_point))
    }

    /// Every mount point owned by a registered drive.
    pub fn mount_points(&self) -> impl Iterator<Item = &MountPoint> {
        self.drives.iter().flat_map(|(_, d)| d.mount_points())
    }

    /// Drive whose mount points carry `id`.
    pub fn find_by_mount_id(&self, id: &str) -> Option<DriveId> {
        self.drives
            .iter()
            .find(|(_, d)| d.mount_points().any(|mp| mp.id() == Some(id)))
            .map(|(drive_id, _)| drive_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::{DeviceNumber, DriveType};
    use crate::fs::MemoryDosDevices;

    fn letter(c: char) -> DriveLetter {
        DriveLetter::from_char(c).unwrap()
    }

    fn new_drive(ns: &mut DeviceNamespace) -> Drive {
        let name = r"\Device\Harddisk1";
        let handle = ns.create_device(name).unwrap();
        Drive::new(
            Some("udi"),
            DriveType::Fixed,
            handle,
            name.to_string(),
            DeviceNumber::for_unit(DriveType::Fixed, true, 1),
        )
    }

    #[test]
    fn test_volume_guid() {
        assert_eq!(
            volume_guid(letter('C')).to_string(),
            "00000000-0000-0000-0000-000000000043"
        );
    }

    #[test]
    fn test_letter_creates_both_mount_points() {
        let mut ns = DeviceNamespace::new();
        let mut drive = new_drive(&mut ns);

        set_drive_letter(&mut drive, &mut ns, Some(letter('C'))).unwrap();
        assert_eq!(drive.letter(), Some(letter('C')));
        assert_eq!(ns.symlink_target(r"\??\C:"), Some(r"\Device\Harddisk1"));
        assert_eq!(
            ns.symlink_target(r"\??\Volume{00000000-0000-0000-0000-000000000043}"),
            Some(r"\Device\Harddisk1")
        );
        assert_eq!(drive.mount_points().count(), 2);
    }

    #[test]
    fn test_change_letter_moves_mount_points() {
        let mut ns = DeviceNamespace::new();
        let mut drive = new_drive(&mut ns);

        set_drive_letter(&mut drive, &mut ns, Some(letter('C'))).unwrap();
        set_drive_letter(&mut drive, &mut ns, Some(letter('E'))).unwrap();
        assert!(ns.symlink_target(r"\??\C:").is_none());
        assert!(ns.symlink_target(r"\??\E:").is_some());

        set_drive_letter(&mut drive, &mut ns, None).unwrap();
        assert_eq!(drive.mount_points().count(), 0);
        assert_eq!(ns.symlinks().count(), 0);
    }

    #[test]
    fn test_letter_collision_leaves_drive_unlettered() {
        let mut ns = DeviceNamespace::new();
        ns.create_symlink(r"\??\C:", r"\Device\Other").unwrap();
        let mut drive = new_drive(&mut ns);

        assert!(set_drive_letter(&mut drive, &mut ns, Some(letter('C'))).is_err());
        assert_eq!(drive.letter(), None);
        assert_eq!(drive.mount_points().count(), 0);
        assert_eq!(ns.symlinks().count(), 1);
    }

    #[test]
    fn test_mount_id_follows_unix_mount() {
        let mut ns = DeviceNamespace::new();
        let mut fs = MemoryDosDevices::new();
        let mut drive = new_drive(&mut ns);
        set_drive_letter(&mut drive, &mut ns, Some(letter('C'))).unwrap();

        assert!(set_unix_mount_point(&mut drive, &mut fs, Some(Path::new("/mnt/c"))));
        assert!(drive.mount_points().all(|mp| mp.id() == Some("/mnt/c")));
        assert_eq!(fs.read_mount_link(letter('C')), Some("/mnt/c".into()));

        assert!(set_unix_mount_point(&mut drive, &mut fs, None));
        assert!(drive.mount_points().all(|mp| mp.id().is_none()));
        assert!(drive.unix_mount().is_none());
        assert!(!fs.mount_link_exists(letter('C')));
    }

    #[test]
    fn test_same_mount_point_is_not_relinked() {
        let mut ns = DeviceNamespace::new();
        let mut fs = MemoryDosDevices::new();
        let mut drive = new_drive(&mut ns);
        set_drive_letter(&mut drive, &mut ns, Some(letter('C'))).unwrap();

        assert!(set_unix_mount_point(&mut drive, &mut fs, Some(Path::new("/mnt/c"))));
        let before = fs.mutations();
        assert!(!set_unix_mount_point(&mut drive, &mut fs, Some(Path::new("/mnt/c"))));
        assert_eq!(fs.mutations(), before);
    }

    #[test]
    fn test_empty_mount_point_clears() {
        let mut ns = DeviceNamespace::new();
        let mut fs = MemoryDosDevices::new();
        let mut drive = new_drive(&mut ns);
        set_drive_letter(&mut drive, &mut ns, Some(letter('C'))).unwrap();

        set_unix_mount_point(&mut drive, &mut fs, Some(Path::new("/mnt/c")));
        assert!(set_unix_mount_point(&mut drive, &mut fs, Some(Path::new(""))));
        assert!(drive.unix_mount().is_none());
        // Nothing left to remove
        assert!(!set_unix_mount_point(&mut drive, &mut fs, None));
    }

    #[test]
    fn test_mount_point_without_letter() {
        let mut ns = DeviceNamespace::new();
        let mut fs = MemoryDosDevices::new();
        let mut drive = new_drive(&mut ns);

        assert!(!set_unix_mount_point(&mut drive, &mut fs, Some(Path::new("/mnt/c"))));
        assert_eq!(fs.mutations(), 0);
    }
}
