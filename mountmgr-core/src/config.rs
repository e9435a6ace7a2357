//! Mount manager configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DriveResult;

/// Environment variable naming the prefix directory.
pub const PREFIX_ENV: &str = "MOUNTMGR_PREFIX";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountManagerConfig {
    /// Prefix directory holding `dosdevices` and the drive type store
    pub prefix: PathBuf,
}

impl MountManagerConfig {
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// `$MOUNTMGR_PREFIX`, else `$HOME/.mountmgr`, else `./.mountmgr`.
    pub fn from_env() -> Self {
        let prefix = std::env::var_os(PREFIX_ENV)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".mountmgr")))
            .unwrap_or_else(|| PathBuf::from(".mountmgr"));
        Self { prefix }
    }

    /// Read a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> DriveResult<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn dosdevices_dir(&self) -> PathBuf {
        self.prefix.join("dosdevices")
    }

    pub fn drive_types_path(&self) -> PathBuf {
        self.prefix.join("drives.json")
    }
}
