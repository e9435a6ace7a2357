//! Error types for the mount manager.

use std::path::PathBuf;

use thiserror::Error;

use crate::dispatch::NtStatus;

/// Errors that can occur while managing drives.
#[derive(Error, Debug)]
pub enum DriveError {
    #[error("Invalid drive letter: {0}")]
    InvalidLetter(char),

    #[error("Not a valid device node: {}", .0.display())]
    InvalidDevice(PathBuf),

    #[error("No free drive letter for {}", .0.display())]
    NoFreeLetter(PathBuf),

    #[error("No free device name for {0}")]
    NoFreeDeviceName(String),

    #[error("Object name collision: {0}")]
    NameCollision(String),

    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Unknown drive type: {0}")]
    UnknownDriveType(String),

    #[error("Invalid device request")]
    InvalidDeviceRequest,

    #[error("Unsupported ioctl {0:#x}")]
    UnsupportedIoctl(u32),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DriveError {
    /// Status code reported to device clients for this error.
    pub fn status(&self) -> NtStatus {
        match self {
            DriveError::InvalidDeviceRequest => NtStatus::InvalidDeviceRequest,
            DriveError::UnsupportedIoctl(_) => NtStatus::NotSupported,
            DriveError::NameCollision(_) => NtStatus::ObjectNameCollision,
            DriveError::ObjectNotFound(_) => NtStatus::ObjectNameNotFound,
            DriveError::NoFreeLetter(_) | DriveError::NoFreeDeviceName(_) => NtStatus::NoMemory,
            _ => NtStatus::Unsuccessful,
        }
    }
}

/// Result type for mount manager operations.
pub type DriveResult<T> = Result<T, DriveError>;
