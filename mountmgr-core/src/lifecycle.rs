//! Creation and destruction of drive device objects.

use log::{trace, warn};

use crate::drive::{DeviceNumber, Drive, DriveType};
use crate::error::{DriveError, DriveResult};
use crate::manager::MountManager;
use crate::registry::DriveId;

/// Unit numbers are probed below this bound.
pub const MAX_DEVICE_UNITS: u32 = 32;

impl<F, S, N> MountManager<F, S, N> {
    /// Create the device object for a new drive and register it.
    ///
    /// The device is bound to the first free name of its type's template.
    /// The drive starts without a letter.
    pub fn create_drive(&mut self, udi: Option<&str>, drive_type: DriveType) -> DriveResult<DriveId> {
        let has_udi = udi.is_some();
        let (template, first) = drive_type.device_template(has_udi);

        for unit in first..MAX_DEVICE_UNITS {
            let name = format!("{}{}", template, unit);
            let handle = match self.namespace.create_device(&name) {
                Ok(handle) => handle,
                Err(DriveError::NameCollision(_)) => continue,
                Err(e) => return Err(e),
            };
            let devnum = DeviceNumber::for_unit(drive_type, has_udi, unit);
            trace!("created device {}", name);
            return Ok(self.drives.insert(Drive::new(udi, drive_type, handle, name, devnum)));
        }

        warn!("no free device name for {}", template);
        Err(DriveError::NoFreeDeviceName(template.to_string()))
    }

    /// Destroy a drive: its mount points, its registry entry and its device
    /// object. Returns false if the drive was already gone.
    pub fn delete_drive(&mut self, id: DriveId) -> bool {
        let Some(mut drive) = self.drives.remove(id) else {
            return false;
        };
        trace!("deleting device {}", drive.name);
        for mp in [drive.dosdev.take(), drive.volume.take()].into_iter().flatten() {
            mp.delete(&mut self.namespace);
        }
        self.namespace.delete_device(drive.device);
        true
    }
}
