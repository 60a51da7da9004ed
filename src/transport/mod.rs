//! Transport state sampled from the host

pub mod display;
pub mod playhead;
pub mod snapshot;

pub use display::{describe, format_bars_beats, format_timecode};
pub use playhead::{query_position, FailingPlayHead, PlayHead, SimulatedPlayHead};
pub use snapshot::{SharedSnapshotStore, SnapshotStore, TransportSnapshot};
