//! Volume change notifications.

use std::sync::mpsc::Sender;

use serde::Serialize;

use crate::drive::DriveLetter;

pub const DBT_DEVICEARRIVAL: u32 = 0x8000;
pub const DBT_DEVICEREMOVECOMPLETE: u32 = 0x8004;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeEvent {
    Arrival,
    RemoveComplete,
}

impl VolumeEvent {
    /// WM_DEVICECHANGE event code.
    pub fn code(self) -> u32 {
        match self {
            VolumeEvent::Arrival => DBT_DEVICEARRIVAL,
            VolumeEvent::RemoveComplete => DBT_DEVICEREMOVECOMPLETE,
        }
    }
}

/// Broadcast payload: which drive changed, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeChange {
    pub unit_mask: u32,
    pub event: VolumeEvent,
}

impl VolumeChange {
    pub fn new(letter: DriveLetter, event: VolumeEvent) -> Self {
        Self {
            unit_mask: letter.unit_mask(),
            event,
        }
    }

    /// The single drive in the unit mask.
    pub fn letter(&self) -> Option<DriveLetter> {
        DriveLetter::from_index(self.unit_mask.trailing_zeros() as usize)
    }
}

/// Fire-and-forget delivery of volume changes.
pub trait Notifier {
    fn notify(&self, change: VolumeChange);
}

/// Drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _change: VolumeChange) {}
}

/// Sends notifications down a channel. A closed channel is ignored.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: Sender<VolumeChange>,
}

impl ChannelNotifier {
    pub fn new(tx: Sender<VolumeChange>) -> Self {
        Self { tx }
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, change: VolumeChange) {
        let _ = self.tx.send(change);
    }
}
