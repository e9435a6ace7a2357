//! Drive letter allocation.
//!
//! A letter is taken when its `x::` artifact exists. Claiming a letter means
//! creating that artifact; the create is exclusive, so two processes racing
//! for the same letter cannot both win. The loser rescans.

use std::io;
use std::path::Path;

use log::{debug, warn};

use crate::drive::{DriveLetter, DriveType, MAX_DOS_DRIVES};
use crate::error::{DriveError, DriveResult};
use crate::fs::{DosDevices, LinkTarget};

/// Upper bound on claim attempts for a single allocation.
const MAX_CLAIM_ATTEMPTS: usize = 2 * MAX_DOS_DRIVES;

/// Find the letter already mapped to `device`, or claim a free one.
///
/// Letters whose artifact points elsewhere, at a non-device, or cannot be
/// resolved at all are treated as used.
pub fn allocate_letter<F>(fs: &mut F, device: &Path, drive_type: DriveType) -> DriveResult<DriveLetter>
where
    F: DosDevices + ?Sized,
{
    let target = fs.device_id(device)?;
    let mut in_use = [false; MAX_DOS_DRIVES];

    for _ in 0..MAX_CLAIM_ATTEMPTS {
        let mut avail = None;

        for letter in DriveLetter::allocation_range(drive_type) {
            if in_use[letter.index()] {
                continue;
            }
            match fs.device_link(letter) {
                LinkTarget::Device(id) => {
                    in_use[letter.index()] = true;
                    if id == target {
                        debug!("{} already mapped to {}", letter, device.display());
                        return Ok(letter);
                    }
                }
                LinkTarget::NotADevice | LinkTarget::Broken => in_use[letter.index()] = true,
                LinkTarget::Missing => {
                    // A stale mount link also keeps the letter out of reach
                    if avail.is_none() && !fs.mount_link_exists(letter) {
                        avail = Some(letter);
                    }
                }
            }
        }

        let Some(letter) = avail else { break };
        match fs.claim_device_link(letter, device) {
            Ok(()) => {
                debug!("claimed {} for {}", letter, device.display());
                return Ok(letter);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!("lost race for {}, rescanning", letter);
            }
            Err(e) => {
                warn!("cannot claim {} for {}: {}", letter, device.display(), e);
                in_use[letter.index()] = true;
            }
        }
    }

    Err(DriveError::NoFreeLetter(device.to_path_buf()))
}
