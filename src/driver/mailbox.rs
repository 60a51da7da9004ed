//! Single-slot handoff from the audio thread to the send worker
//!
//! Holds at most one pending snapshot. Posting never blocks and never
//! allocates; a post that lands while another is still pending replaces it.

use crossbeam::atomic::AtomicCell;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::transport::TransportSnapshot;

/// Driver state as seen from outside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Nothing waiting and nothing being sent
    Idle,
    /// A snapshot is waiting in the slot or being sent
    SendPending,
}

/// Last-write-wins mailbox with exactly one consumer
pub struct Mailbox {
    slot: AtomicCell<Option<TransportSnapshot>>,
    in_flight: AtomicBool,
    posted: AtomicU64,
    superseded: AtomicU64,
}

impl Mailbox {
    pub fn new() -> Self {
        Self {
            slot: AtomicCell::new(None),
            in_flight: AtomicBool::new(false),
            posted: AtomicU64::new(0),
            superseded: AtomicU64::new(0),
        }
    }

    /// Put a snapshot in the slot; returns true if it replaced an unsent one
    pub fn post(&self, snapshot: TransportSnapshot) -> bool {
        let replaced = self.slot.swap(Some(snapshot)).is_some();
        self.posted.fetch_add(1, Ordering::Relaxed);
        if replaced {
            self.superseded.fetch_add(1, Ordering::Relaxed);
        }
        replaced
    }

    /// Claim the pending snapshot, marking a send in flight
    ///
    /// Consumer only. Pair every `Some` with [`Mailbox::finish`].
    pub fn claim(&self) -> Option<TransportSnapshot> {
        self.in_flight.store(true, Ordering::SeqCst);
        let snapshot = self.slot.take();
        if snapshot.is_none() {
            self.in_flight.store(false, Ordering::SeqCst);
        }
        snapshot
    }

    /// Mark the claimed send as done
    pub fn finish(&self) {
        self.in_flight.store(false, Ordering::SeqCst);
    }

    pub fn state(&self) -> DriverState {
        if self.in_flight.load(Ordering::SeqCst) || self.slot.load().is_some() {
            DriverState::SendPending
        } else {
            DriverState::Idle
        }
    }

    /// Snapshots posted so far
    pub fn posted(&self) -> u64 {
        self.posted.load(Ordering::Relaxed)
    }

    /// Posts that replaced a snapshot before it was sent
    pub fn superseded(&self) -> u64 {
        self.superseded.load(Ordering::Relaxed)
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

/// Capacity-1 wake channel; a full channel means a wake is already queued
pub fn wake_channel() -> (Sender<()>, Receiver<()>) {
    bounded(1)
}
