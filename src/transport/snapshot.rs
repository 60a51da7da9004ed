//! Latest transport state, shared between the audio thread and everyone else
//!
//! The store is a single slot: each write replaces the previous value and no
//! history is kept. Writes come from the audio thread only.

use crossbeam::atomic::AtomicCell;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// One complete reading of the host play head
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransportSnapshot {
    /// Tempo in beats per minute
    pub tempo_bpm: f64,
    /// Time signature numerator
    pub time_sig_numerator: i32,
    /// Time signature denominator
    pub time_sig_denominator: i32,
    /// Position in quarter notes
    pub ppq_position: f64,
    /// Position in seconds
    pub time_in_seconds: f64,
    /// Transport is rolling
    pub is_playing: bool,
    /// Transport is recording
    pub is_recording: bool,
}

impl Default for TransportSnapshot {
    /// The position a host reports after a reset: 120 bpm, 4/4, at zero, stopped.
    fn default() -> Self {
        Self {
            tempo_bpm: 120.0,
            time_sig_numerator: 4,
            time_sig_denominator: 4,
            ppq_position: 0.0,
            time_in_seconds: 0.0,
            is_playing: false,
            is_recording: false,
        }
    }
}

#[derive(Clone, Copy)]
struct Stamped {
    version: u64,
    snapshot: TransportSnapshot,
}

/// Single-writer, multi-reader holder of the latest [`TransportSnapshot`]
///
/// `AtomicCell` guards the value with a sequence lock: the writer never waits
/// for readers and a reader racing a write retries until it copies a whole
/// value, so partial snapshots are never observed.
pub struct SnapshotStore {
    cell: AtomicCell<Stamped>,
    writes: AtomicU64,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            cell: AtomicCell::new(Stamped {
                version: 0,
                snapshot: TransportSnapshot::default(),
            }),
            writes: AtomicU64::new(0),
        }
    }

    /// Publish a new snapshot. Audio thread only.
    pub fn write(&self, snapshot: TransportSnapshot) {
        let version = self.writes.load(Ordering::Relaxed) + 1;
        self.cell.store(Stamped { version, snapshot });
        self.writes.store(version, Ordering::Release);
    }

    /// Latest snapshot, or the default one if nothing was written yet
    pub fn read(&self) -> TransportSnapshot {
        self.cell.load().snapshot
    }

    /// Latest snapshot together with the write number that produced it
    ///
    /// Version 0 means the default snapshot.
    pub fn read_versioned(&self) -> (u64, TransportSnapshot) {
        let stamped = self.cell.load();
        (stamped.version, stamped.snapshot)
    }

    /// Number of completed writes
    pub fn version(&self) -> u64 {
        self.writes.load(Ordering::Acquire)
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe handle to a snapshot store
pub type SharedSnapshotStore = Arc<SnapshotStore>;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::thread;

    fn at(ppq: f64) -> TransportSnapshot {
        TransportSnapshot {
            ppq_position: ppq,
            time_in_seconds: ppq / 2.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_read_before_write_is_default() {
        let store = SnapshotStore::new();
        assert_eq!(store.read(), TransportSnapshot::default());
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn test_last_write_wins() {
        let store = SnapshotStore::new();
        store.write(at(1.0));
        store.write(at(2.0));

        let (version, snapshot) = store.read_versioned();
        assert_eq!(version, 2);
        assert_eq!(snapshot.ppq_position, 2.0);
    }

    #[test]
    fn test_concurrent_reads_are_never_torn_or_stale() {
        let store = Arc::new(SnapshotStore::new());
        let writer_store = store.clone();

        let writer = thread::spawn(move || {
            for i in 1..=20_000u64 {
                writer_store.write(at(i as f64));
            }
        });

        let mut last_seen = 0u64;
        while last_seen < 20_000 {
            let floor = store.version();
            let (version, snapshot) = store.read_versioned();

            // Each value is the one written at that version, never a mix
            if version > 0 {
                assert_eq!(snapshot.ppq_position, version as f64);
                assert_eq!(snapshot.time_in_seconds, version as f64 / 2.0);
            }
            assert!(version >= floor, "read {} older than completed write {}", version, floor);
            assert!(version >= last_seen);
            last_seen = version;
        }

        writer.join().unwrap();
    }

    proptest! {
        #[test]
        fn prop_read_returns_last_written(values in proptest::collection::vec(-1e6f64..1e6, 1..64)) {
            let store = SnapshotStore::new();
            for v in &values {
                store.write(at(*v));
            }
            prop_assert_eq!(store.read().ppq_position, *values.last().unwrap());
            prop_assert_eq!(store.version(), values.len() as u64);
        }
    }
}
