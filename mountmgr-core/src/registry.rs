//! Ordered registry of live drives.
//!
//! Drives are stored in an index-addressed arena; `DriveId`s stay valid until
//! the drive is removed. Iteration follows insertion order. The registry has
//! no locking of its own: whoever owns the manager serializes access.

use crate::drive::{Drive, DriveLetter};

/// Stable index of a drive in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DriveId(usize);

#[derive(Debug, Default)]
pub struct DriveRegistry {
    slots: Vec<Option<Drive>>,
    order: Vec<DriveId>,
    free: Vec<usize>,
}

impl DriveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a drive at the tail.
    pub fn insert(&mut self, drive: Drive) -> DriveId {
        let id = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(drive);
                DriveId(slot)
            }
            None => {
                self.slots.push(Some(drive));
                DriveId(self.slots.len() - 1)
            }
        };
        self.order.push(id);
        id
    }

    pub fn remove(&mut self, id: DriveId) -> Option<Drive> {
        let drive = self.slots.get_mut(id.0)?.take()?;
        self.order.retain(|&o| o != id);
        self.free.push(id.0);
        Some(drive)
    }

    pub fn get(&self, id: DriveId) -> Option<&Drive> {
        self.slots.get(id.0)?.as_ref()
    }

    pub fn get_mut(&mut self, id: DriveId) -> Option<&mut Drive> {
        self.slots.get_mut(id.0)?.as_mut()
    }

    /// Drives in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (DriveId, &Drive)> {
        self.order
            .iter()
            .filter_map(move |&id| self.get(id).map(|d| (id, d)))
    }

    /// Snapshot of ids, for loops that remove while walking.
    pub fn ids(&self) -> Vec<DriveId> {
        self.order.clone()
    }

    pub fn find_by_udi(&self, udi: &str) -> Option<DriveId> {
        self.iter()
            .find(|(_, d)| d.udi() == Some(udi))
            .map(|(id, _)| id)
    }

    pub fn find_by_letter(&self, letter: DriveLetter) -> Option<DriveId> {
        self.iter()
            .find(|(_, d)| d.letter() == Some(letter))
            .map(|(id, _)| id)
    }

    pub fn find_by_device_name(&self, name: &str) -> Option<DriveId> {
        self.iter()
            .find(|(_, d)| d.name() == name)
            .map(|(id, _)| id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::{DeviceNumber, DriveType};
    use crate::namespace::DeviceNamespace;

    fn drive(ns: &mut DeviceNamespace, name: &str, udi: Option<&str>) -> Drive {
        let handle = ns.create_device(name).unwrap();
        Drive::new(
            udi,
            DriveType::Fixed,
            handle,
            name.to_string(),
            DeviceNumber::for_unit(DriveType::Fixed, udi.is_some(), 0),
        )
    }

    #[test]
    fn test_insertion_order() {
        let mut ns = DeviceNamespace::new();
        let mut reg = DriveRegistry::new();
        let a = reg.insert(drive(&mut ns, "a", None));
        let b = reg.insert(drive(&mut ns, "b", None));
        let c = reg.insert(drive(&mut ns, "c", None));

        reg.remove(b);
        let d = reg.insert(drive(&mut ns, "d", None));

        let names: Vec<&str> = reg.iter().map(|(_, d)| d.name()).collect();
        assert_eq!(names, vec!["a", "c", "d"]);
        assert_eq!(reg.ids(), vec![a, c, d]);
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn test_remove_twice() {
        let mut ns = DeviceNamespace::new();
        let mut reg = DriveRegistry::new();
        let a = reg.insert(drive(&mut ns, "a", None));
        assert!(reg.remove(a).is_some());
        assert!(reg.remove(a).is_none());
        assert!(reg.get(a).is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn test_find() {
        let mut ns = DeviceNamespace::new();
        let mut reg = DriveRegistry::new();
        reg.insert(drive(&mut ns, "a", None));
        let b = reg.insert(drive(&mut ns, "b", Some("udi-b")));

        assert_eq!(reg.find_by_udi("udi-b"), Some(b));
        assert_eq!(reg.find_by_udi("udi-x"), None);
        assert_eq!(reg.find_by_device_name("b"), Some(b));

        let letter = DriveLetter::from_char('E').unwrap();
        assert_eq!(reg.find_by_letter(letter), None);
        reg.get_mut(b).unwrap().letter = Some(letter);
        assert_eq!(reg.find_by_letter(letter), Some(b));
    }
}
