//! Per-block sampling on the audio thread
//!
//! `on_block` is the only entry point the host's real-time callback touches.
//! It does a play head query, a store write, a slot swap and a `try_send`;
//! none of these block or allocate.

use crossbeam_channel::{Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::mailbox::{DriverState, Mailbox};
use crate::transport::{query_position, PlayHead, SharedSnapshotStore, TransportSnapshot};

/// Samples the host transport once per audio block
pub struct SamplingDriver {
    store: SharedSnapshotStore,
    mailbox: Arc<Mailbox>,
    wake: Sender<()>,
    blocks: AtomicU64,
    host_failures: AtomicU64,
}

impl SamplingDriver {
    pub fn new(store: SharedSnapshotStore, mailbox: Arc<Mailbox>, wake: Sender<()>) -> Self {
        Self {
            store,
            mailbox,
            wake,
            blocks: AtomicU64::new(0),
            host_failures: AtomicU64::new(0),
        }
    }

    /// Called by the host once per processing block
    ///
    /// A missing or failing play head yields the default snapshot. Returns
    /// the snapshot that was published.
    pub fn on_block(&self, play_head: Option<&dyn PlayHead>) -> TransportSnapshot {
        let snapshot = match query_position(play_head) {
            Ok(position) => position,
            Err(_) => {
                self.host_failures.fetch_add(1, Ordering::Relaxed);
                TransportSnapshot::default()
            }
        };

        self.store.write(snapshot);
        self.mailbox.post(snapshot);

        // Full: a wake is already queued and will pick up the new slot value.
        // Disconnected: the worker is gone; the store still updates.
        match self.wake.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) | Err(TrySendError::Disconnected(())) => {}
        }

        self.blocks.fetch_add(1, Ordering::Relaxed);
        snapshot
    }

    pub fn state(&self) -> DriverState {
        self.mailbox.state()
    }

    /// Blocks processed so far
    pub fn blocks(&self) -> u64 {
        self.blocks.load(Ordering::Relaxed)
    }

    /// Blocks where the host could not report a position
    pub fn host_failures(&self) -> u64 {
        self.host_failures.load(Ordering::Relaxed)
    }
}
