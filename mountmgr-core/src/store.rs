//! Persisted drive type overrides.
//!
//! Values are keyed by lowercase letter name (`a:` .. `z:`) and hold one of
//! the drive type registry names (`floppy`, `hd`, `network`, `cdrom`,
//! `ramdisk`). A missing value means the default type for the letter.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::drive::{DriveLetter, DriveType};
use crate::error::DriveResult;

/// Key-value store for drive type overrides.
pub trait DriveTypeStore {
    /// Raw stored value for a letter.
    fn load(&self, letter: DriveLetter) -> DriveResult<Option<String>>;

    /// Record the type of a letter. Types without a registry name delete the value.
    fn store(&mut self, letter: DriveLetter, drive_type: DriveType) -> DriveResult<()>;

    /// Delete the value for a letter.
    fn remove(&mut self, letter: DriveLetter) -> DriveResult<()>;
}

/// Store key for a letter, e.g. `c:`.
pub fn store_key(letter: DriveLetter) -> String {
    format!("{}:", letter.as_lower())
}

/// In-memory store.
#[derive(Debug, Default, Clone)]
pub struct MemoryDriveTypeStore {
    values: HashMap<String, String>,
}

impl MemoryDriveTypeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with initial raw values.
    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let values = values
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_ascii_lowercase(), v.into()))
            .collect();
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

impl DriveTypeStore for MemoryDriveTypeStore {
    fn load(&self, letter: DriveLetter) -> DriveResult<Option<String>> {
        Ok(self.values.get(&store_key(letter)).cloned())
    }

    fn store(&mut self, letter: DriveLetter, drive_type: DriveType) -> DriveResult<()> {
        match drive_type.registry_name() {
            Some(name) => {
                self.values.insert(store_key(letter), name.to_string());
            }
            None => {
                self.values.remove(&store_key(letter));
            }
        }
        Ok(())
    }

    fn remove(&mut self, letter: DriveLetter) -> DriveResult<()> {
        self.values.remove(&store_key(letter));
        Ok(())
    }
}

/// Store backed by a JSON object file, rewritten on every change.
#[derive(Debug, Clone)]
pub struct JsonDriveTypeStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonDriveTypeStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> DriveResult<Self> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> DriveResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, text)?;
        Ok(())
    }
}

impl DriveTypeStore for JsonDriveTypeStore {
    fn load(&self, letter: DriveLetter) -> DriveResult<Option<String>> {
        Ok(self.values.get(&store_key(letter)).cloned())
    }

    fn store(&mut self, letter: DriveLetter, drive_type: DriveType) -> DriveResult<()> {
        match drive_type.registry_name() {
            Some(name) => {
                self.values.insert(store_key(letter), name.to_string());
            }
            None => {
                self.values.remove(&store_key(letter));
            }
        }
        self.save()
    }

    fn remove(&mut self, letter: DriveLetter) -> DriveResult<()> {
        if self.values.remove(&store_key(letter)).is_some() {
            self.save()?;
        }
        Ok(())
    }
}
