//! Drive entities and the per-type tables that derive their names and numbers.

use std::fmt;
use std::ops::Range;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DriveError, DriveResult};
use crate::mount_point::MountPoint;
use crate::namespace::DeviceHandle;

/// Number of DOS drive letters (A-Z).
pub const MAX_DOS_DRIVES: usize = 26;

/// Partition number reported by devices that have no partitions.
pub const PARTITION_NONE: u32 = u32::MAX;

/// A drive letter slot (A=0, B=1, ..., Z=25).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "char", try_from = "char")]
pub struct DriveLetter(u8);

impl DriveLetter {
    /// Create from a slot index (0-25).
    pub fn from_index(index: usize) -> Option<Self> {
        (index < MAX_DOS_DRIVES).then_some(Self(index as u8))
    }

    /// Create from a letter, case insensitive.
    pub fn from_char(letter: char) -> DriveResult<Self> {
        let upper = letter.to_ascii_uppercase();
        if upper.is_ascii_uppercase() {
            Ok(Self(upper as u8 - b'A'))
        } else {
            Err(DriveError::InvalidLetter(letter))
        }
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Uppercase letter, e.g. `'C'`.
    pub fn as_char(self) -> char {
        (b'A' + self.0) as char
    }

    /// Lowercase letter as used in artifact and store names, e.g. `'c'`.
    pub fn as_lower(self) -> char {
        (b'a' + self.0) as char
    }

    /// Single-bit mask used by volume change notifications.
    pub fn unit_mask(self) -> u32 {
        1 << self.0
    }

    /// Every letter from A to Z.
    pub fn all() -> impl Iterator<Item = DriveLetter> {
        (0..MAX_DOS_DRIVES as u8).map(DriveLetter)
    }

    /// Letters a drive of the given type may be allocated from.
    ///
    /// Removable drives live on A: and B:, everything else on C: through Z:.
    pub fn allocation_range(drive_type: DriveType) -> impl Iterator<Item = DriveLetter> + Clone {
        let range: Range<u8> = match drive_type {
            DriveType::Removable => 0..2,
            _ => 2..MAX_DOS_DRIVES as u8,
        };
        range.map(DriveLetter)
    }
}

impl fmt::Display for DriveLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.as_char())
    }
}

impl From<DriveLetter> for char {
    fn from(letter: DriveLetter) -> char {
        letter.as_char()
    }
}

impl TryFrom<char> for DriveLetter {
    type Error = DriveError;

    fn try_from(letter: char) -> DriveResult<Self> {
        Self::from_char(letter)
    }
}

/// Drive type. Closed set; the naming and numbering tables below match on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriveType {
    Unknown,
    Removable,
    Fixed,
    Remote,
    Cdrom,
    Ramdisk,
}

impl DriveType {
    /// Name stored in the drive type override store. `Unknown` has none.
    pub fn registry_name(self) -> Option<&'static str> {
        match self {
            DriveType::Unknown => None,
            DriveType::Removable => Some("floppy"),
            DriveType::Fixed => Some("hd"),
            DriveType::Remote => Some("network"),
            DriveType::Cdrom => Some("cdrom"),
            DriveType::Ramdisk => Some("ramdisk"),
        }
    }

    /// Parse an override store value (case insensitive).
    pub fn from_registry_name(name: &str) -> Option<Self> {
        [
            DriveType::Removable,
            DriveType::Fixed,
            DriveType::Remote,
            DriveType::Cdrom,
            DriveType::Ramdisk,
        ]
        .into_iter()
        .find(|t| t.registry_name().is_some_and(|n| n.eq_ignore_ascii_case(name)))
    }

    /// Default type of a drive found on disk at startup.
    pub fn default_for_letter(letter: DriveLetter) -> Self {
        if letter.index() < 2 {
            DriveType::Removable
        } else {
            DriveType::Fixed
        }
    }

    /// Device name template and first unit number.
    ///
    /// Fixed drives without an identifier are volumes discovered at startup;
    /// they are numbered separately from physical disks and start at 1.
    pub(crate) fn device_template(self, has_udi: bool) -> (&'static str, u32) {
        match self {
            DriveType::Removable => (r"\Device\Floppy", 0),
            DriveType::Cdrom => (r"\Device\CdRom", 0),
            _ if has_udi => (r"\Device\Harddisk", 0),
            _ => (r"\Device\HarddiskVolume", 1),
        }
    }
}

impl FromStr for DriveType {
    type Err = DriveError;

    /// Accepts both the enum names and the override store names.
    fn from_str(s: &str) -> DriveResult<Self> {
        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            "unknown" => Ok(DriveType::Unknown),
            "removable" => Ok(DriveType::Removable),
            "fixed" => Ok(DriveType::Fixed),
            "remote" => Ok(DriveType::Remote),
            _ => Self::from_registry_name(&lower).ok_or_else(|| DriveError::UnknownDriveType(s.to_string())),
        }
    }
}

impl fmt::Display for DriveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DriveType::Unknown => "unknown",
            DriveType::Removable => "removable",
            DriveType::Fixed => "fixed",
            DriveType::Remote => "remote",
            DriveType::Cdrom => "cdrom",
            DriveType::Ramdisk => "ramdisk",
        };
        f.write_str(name)
    }
}

/// Device class reported in device-number metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum DeviceClass {
    /// FILE_DEVICE_CD_ROM
    CdRom = 0x0000_0002,
    /// FILE_DEVICE_DISK
    Disk = 0x0000_0007,
}

/// Device-number metadata: position of a device within its class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceNumber {
    pub device_type: DeviceClass,
    pub device_number: u32,
    pub partition_number: u32,
}

impl DeviceNumber {
    /// Size of the STORAGE_DEVICE_NUMBER wire layout.
    pub const SIZE: usize = 12;

    /// Metadata for a newly created device with the probed unit number.
    pub(crate) fn for_unit(drive_type: DriveType, has_udi: bool, unit: u32) -> Self {
        match drive_type {
            DriveType::Removable => Self {
                device_type: DeviceClass::Disk,
                device_number: unit,
                partition_number: PARTITION_NONE,
            },
            DriveType::Cdrom => Self {
                device_type: DeviceClass::CdRom,
                device_number: unit,
                partition_number: PARTITION_NONE,
            },
            _ if has_udi => Self {
                device_type: DeviceClass::Disk,
                device_number: unit,
                partition_number: 0,
            },
            _ => Self {
                device_type: DeviceClass::Disk,
                device_number: 0,
                partition_number: unit,
            },
        }
    }

    /// Little-endian STORAGE_DEVICE_NUMBER layout.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&(self.device_type as u32).to_le_bytes());
        buf[4..8].copy_from_slice(&self.device_number.to_le_bytes());
        buf[8..12].copy_from_slice(&self.partition_number.to_le_bytes());
        buf
    }
}

/// A DOS drive backed by a device object.
#[derive(Debug)]
pub struct Drive {
    /// Unique identifier for dynamic drives
    pub(crate) udi: Option<String>,
    pub(crate) letter: Option<DriveLetter>,
    pub(crate) drive_type: DriveType,
    pub(crate) device: DeviceHandle,
    /// Device name, e.g. `\Device\Harddisk1`
    pub(crate) name: String,
    pub(crate) devnum: DeviceNumber,
    /// `\??\X:` mount point
    pub(crate) dosdev: Option<MountPoint>,
    /// `\??\Volume{...}` mount point
    pub(crate) volume: Option<MountPoint>,
    pub(crate) unix_mount: Option<PathBuf>,
}

impl Drive {
    pub(crate) fn new(
        udi: Option<&str>,
        drive_type: DriveType,
        device: DeviceHandle,
        name: String,
        devnum: DeviceNumber,
    ) -> Self {
        Self {
            udi: udi.map(str::to_string),
            letter: None,
            drive_type,
            device,
            name,
            devnum,
            dosdev: None,
            volume: None,
            unix_mount: None,
        }
    }

    pub fn udi(&self) -> Option<&str> {
        self.udi.as_deref()
    }

    pub fn letter(&self) -> Option<DriveLetter> {
        self.letter
    }

    pub fn drive_type(&self) -> DriveType {
        self.drive_type
    }

    pub fn device(&self) -> DeviceHandle {
        self.device
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device_number(&self) -> DeviceNumber {
        self.devnum
    }

    pub fn unix_mount(&self) -> Option<&std::path::Path> {
        self.unix_mount.as_deref()
    }

    /// Mount points owned by this drive (none or both).
    pub fn mount_points(&self) -> impl Iterator<Item = &MountPoint> {
        self.dosdev.iter().chain(self.volume.iter())
    }
}
