//! Host play head access

use super::snapshot::TransportSnapshot;
use crate::error::PlayHeadError;

/// Accessor the host provides for its current transport position
///
/// Called on the audio thread. Implementations must not block or allocate;
/// they may fail or return stale data.
pub trait PlayHead {
    fn current_position(&self) -> Result<TransportSnapshot, PlayHeadError>;
}

/// Query an optional play head; a missing one is [`PlayHeadError::Unavailable`]
pub fn query_position(play_head: Option<&dyn PlayHead>) -> Result<TransportSnapshot, PlayHeadError> {
    play_head.ok_or(PlayHeadError::Unavailable)?.current_position()
}

/// A fixed position, mostly for tests
impl PlayHead for TransportSnapshot {
    fn current_position(&self) -> Result<TransportSnapshot, PlayHeadError> {
        Ok(*self)
    }
}

/// Play head that always fails, like a host that cannot report time
pub struct FailingPlayHead;

impl PlayHead for FailingPlayHead {
    fn current_position(&self) -> Result<TransportSnapshot, PlayHeadError> {
        Err(PlayHeadError::NoPosition)
    }
}

/// Free-running transport used when no real host is attached
///
/// Advances by whole audio blocks at a fixed tempo and sample rate, and can
/// loop back to zero after a number of bars.
#[derive(Debug, Clone)]
pub struct SimulatedPlayHead {
    position: TransportSnapshot,
    sample_rate: f64,
    // Loop length in quarter notes; 0 disables looping
    loop_length: f64,
}

impl SimulatedPlayHead {
    pub fn new(tempo_bpm: f64, time_sig_numerator: i32, time_sig_denominator: i32, sample_rate: f64) -> Self {
        Self {
            position: TransportSnapshot {
                tempo_bpm,
                time_sig_numerator,
                time_sig_denominator,
                ..Default::default()
            },
            sample_rate,
            loop_length: 0.0,
        }
    }

    /// Loop back to zero every `bars` bars; 0 plays on forever
    pub fn set_loop_bars(&mut self, bars: u32) {
        let numerator = self.position.time_sig_numerator.max(0) as f64;
        let denominator = self.position.time_sig_denominator;
        self.loop_length = if denominator > 0 {
            bars as f64 * numerator * 4.0 / denominator as f64
        } else {
            0.0
        };
    }

    /// Start or stop the transport
    pub fn set_playing(&mut self, playing: bool) {
        self.position.is_playing = playing;
        if !playing {
            self.position.is_recording = false;
        }
    }

    /// Arm recording; implies playing
    pub fn set_recording(&mut self, recording: bool) {
        self.position.is_recording = recording;
        if recording {
            self.position.is_playing = true;
        }
    }

    /// Move the transport forward by one block of `samples` frames
    ///
    /// Does nothing while stopped.
    pub fn advance(&mut self, samples: usize) {
        if !self.position.is_playing || self.sample_rate <= 0.0 {
            return;
        }
        let seconds = samples as f64 / self.sample_rate;
        self.position.time_in_seconds += seconds;
        self.position.ppq_position += seconds * self.position.tempo_bpm / 60.0;

        if self.loop_length > 0.0 && self.position.ppq_position >= self.loop_length {
            self.rewind();
        }
    }

    /// Jump back to zero
    pub fn rewind(&mut self) {
        self.position.time_in_seconds = 0.0;
        self.position.ppq_position = 0.0;
    }
}

impl PlayHead for SimulatedPlayHead {
    fn current_position(&self) -> Result<TransportSnapshot, PlayHeadError> {
        Ok(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_play_head_is_unavailable() {
        assert_eq!(query_position(None), Err(PlayHeadError::Unavailable));
    }

    #[test]
    fn test_failing_play_head_reports_no_position() {
        assert_eq!(query_position(Some(&FailingPlayHead)), Err(PlayHeadError::NoPosition));
    }

    #[test]
    fn test_fixed_position_passes_through() {
        let position = TransportSnapshot { ppq_position: 3.5, ..Default::default() };
        assert_eq!(query_position(Some(&position)), Ok(position));
    }

    #[test]
    fn test_simulated_play_head_advances_only_when_playing() {
        let mut ph = SimulatedPlayHead::new(120.0, 4, 4, 48000.0);
        ph.advance(48000);
        assert_eq!(ph.current_position().unwrap().ppq_position, 0.0);

        ph.set_playing(true);
        ph.advance(48000);
        let pos = ph.current_position().unwrap();
        assert!((pos.time_in_seconds - 1.0).abs() < 1e-9);
        // 120 bpm: two quarter notes per second
        assert!((pos.ppq_position - 2.0).abs() < 1e-9);

        ph.set_recording(true);
        ph.set_playing(false);
        let pos = ph.current_position().unwrap();
        assert!(!pos.is_playing);
        assert!(!pos.is_recording);
    }

    #[test]
    fn test_simulated_play_head_loops() {
        // 120 bpm in 3/4: one bar is 1.5 s
        let mut ph = SimulatedPlayHead::new(120.0, 3, 4, 1000.0);
        ph.set_loop_bars(2);
        ph.set_playing(true);

        ph.advance(2500);
        assert!((ph.current_position().unwrap().ppq_position - 5.0).abs() < 1e-9);

        ph.advance(500);
        let pos = ph.current_position().unwrap();
        assert_eq!(pos.ppq_position, 0.0);
        assert_eq!(pos.time_in_seconds, 0.0);
        assert!(pos.is_playing);

        ph.set_loop_bars(0);
        ph.advance(10_000);
        assert!((ph.current_position().unwrap().ppq_position - 20.0).abs() < 1e-9);
    }
}
