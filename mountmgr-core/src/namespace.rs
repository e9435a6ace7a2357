//! Device object namespace.
//!
//! Device objects are bound under names like `\Device\Harddisk1`; symbolic
//! links such as `\??\C:` point at those names. Binding a name that is
//! already taken fails with a name collision, which is what device creation
//! uses to probe for a free unit number.

use std::collections::{BTreeMap, HashMap};

use log::trace;

use crate::error::{DriveError, DriveResult};

/// Handle to a device object bound in the namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(u32);

#[derive(Debug, Default)]
pub struct DeviceNamespace {
    devices: HashMap<DeviceHandle, String>,
    names: BTreeMap<String, DeviceHandle>,
    links: BTreeMap<String, String>,
    next_handle: u32,
}

impl DeviceNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a device object bound to `name`.
    pub fn create_device(&mut self, name: &str) -> DriveResult<DeviceHandle> {
        if self.names.contains_key(name) || self.links.contains_key(name) {
            return Err(DriveError::NameCollision(name.to_string()));
        }
        let handle = DeviceHandle(self.next_handle);
        self.next_handle += 1;
        self.devices.insert(handle, name.to_string());
        self.names.insert(name.to_string(), handle);
        Ok(handle)
    }

    /// Delete a device object. Links pointing at it are left dangling.
    pub fn delete_device(&mut self, handle: DeviceHandle) -> bool {
        match self.devices.remove(&handle) {
            Some(name) => {
                self.names.remove(&name);
                true
            }
            None => false,
        }
    }

    /// Create a symbolic link `link` -> `target`.
    pub fn create_symlink(&mut self, link: &str, target: &str) -> DriveResult<()> {
        if self.links.contains_key(link) || self.names.contains_key(link) {
            return Err(DriveError::NameCollision(link.to_string()));
        }
        trace!("symlink {} -> {}", link, target);
        self.links.insert(link.to_string(), target.to_string());
        Ok(())
    }

    pub fn delete_symlink(&mut self, link: &str) -> bool {
        self.links.remove(link).is_some()
    }

    /// Device bound directly under `name`.
    pub fn lookup(&self, name: &str) -> Option<DeviceHandle> {
        self.names.get(name).copied()
    }

    /// Resolve `name` to a device, following one symbolic link.
    pub fn resolve(&self, name: &str) -> DriveResult<DeviceHandle> {
        let target = self.links.get(name).map(String::as_str).unwrap_or(name);
        self.lookup(target)
            .ok_or_else(|| DriveError::ObjectNotFound(name.to_string()))
    }

    pub fn device_name(&self, handle: DeviceHandle) -> Option<&str> {
        self.devices.get(&handle).map(String::as_str)
    }

    pub fn symlink_target(&self, link: &str) -> Option<&str> {
        self.links.get(link).map(String::as_str)
    }

    /// All symbolic links, sorted by name.
    pub fn symlinks(&self) -> impl Iterator<Item = (&str, &str)> {
        self.links.iter().map(|(l, t)| (l.as_str(), t.as_str()))
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }
}
