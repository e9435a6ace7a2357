//! Device control requests against a drive.
//!
//! Only a handful of queries are understood; everything else is reported as
//! not supported. Responses never exceed the caller's output buffer length.

use log::{trace, warn};
use serde::Serialize;

use crate::drive::{Drive, DriveType};
use crate::error::{DriveError, DriveResult};

pub const IOCTL_DISK_GET_DRIVE_GEOMETRY: u32 = 0x0007_0000;
pub const IOCTL_STORAGE_GET_DEVICE_NUMBER: u32 = 0x002D_1080;
pub const IOCTL_CDROM_READ_TOC: u32 = 0x0002_4000;

/// Recognized device control codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoControl {
    GetDriveGeometry,
    GetDeviceNumber,
    ReadToc,
}

impl TryFrom<u32> for IoControl {
    type Error = u32;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            IOCTL_DISK_GET_DRIVE_GEOMETRY => Ok(Self::GetDriveGeometry),
            IOCTL_STORAGE_GET_DEVICE_NUMBER => Ok(Self::GetDeviceNumber),
            IOCTL_CDROM_READ_TOC => Ok(Self::ReadToc),
            _ => Err(code),
        }
    }
}

impl From<IoControl> for u32 {
    fn from(ctl: IoControl) -> u32 {
        match ctl {
            IoControl::GetDriveGeometry => IOCTL_DISK_GET_DRIVE_GEOMETRY,
            IoControl::GetDeviceNumber => IOCTL_STORAGE_GET_DEVICE_NUMBER,
            IoControl::ReadToc => IOCTL_CDROM_READ_TOC,
        }
    }
}

/// Completion status of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum NtStatus {
    Success = 0x0000_0000,
    Unsuccessful = 0xC000_0001,
    InvalidDeviceRequest = 0xC000_0010,
    NoMemory = 0xC000_0017,
    ObjectNameNotFound = 0xC000_0034,
    ObjectNameCollision = 0xC000_0035,
    NotSupported = 0xC000_00BB,
}

/// MEDIA_TYPE values reported in the geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u32)]
pub enum MediaType {
    RemovableMedia = 11,
    FixedMedia = 12,
}

/// DISK_GEOMETRY. The values are synthetic; no real device is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskGeometry {
    pub cylinders: i64,
    pub media_type: MediaType,
    pub tracks_per_cylinder: u32,
    pub sectors_per_track: u32,
    pub bytes_per_sector: u32,
}

impl DiskGeometry {
    pub const SIZE: usize = 24;

    pub fn for_type(drive_type: DriveType) -> Self {
        let media_type = match drive_type {
            DriveType::Removable | DriveType::Cdrom => MediaType::RemovableMedia,
            _ => MediaType::FixedMedia,
        };
        Self {
            cylinders: 10000,
            media_type,
            tracks_per_cylinder: 255,
            sectors_per_track: 63,
            bytes_per_sector: 512,
        }
    }

    /// Little-endian DISK_GEOMETRY layout.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..8].copy_from_slice(&self.cylinders.to_le_bytes());
        buf[8..12].copy_from_slice(&(self.media_type as u32).to_le_bytes());
        buf[12..16].copy_from_slice(&self.tracks_per_cylinder.to_le_bytes());
        buf[16..20].copy_from_slice(&self.sectors_per_track.to_le_bytes());
        buf[20..24].copy_from_slice(&self.bytes_per_sector.to_le_bytes());
        buf
    }
}

/// Handle a device control request on `drive`.
///
/// On success returns the output payload, truncated to `output_len` bytes.
pub fn dispatch(drive: &Drive, code: u32, output_len: usize) -> DriveResult<Vec<u8>> {
    trace!("ioctl {:#x} on {} outsize {}", code, drive.name(), output_len);

    let payload: Vec<u8> = match IoControl::try_from(code) {
        Ok(IoControl::GetDriveGeometry) => DiskGeometry::for_type(drive.drive_type()).to_bytes().to_vec(),
        Ok(IoControl::GetDeviceNumber) => drive.device_number().to_bytes().to_vec(),
        Ok(IoControl::ReadToc) => return Err(DriveError::InvalidDeviceRequest),
        Err(code) => {
            warn!("unsupported ioctl {:#x}", code);
            return Err(DriveError::UnsupportedIoctl(code));
        }
    };

    let len = payload.len().min(output_len);
    Ok(payload[..len].to_vec())
}
