//! Human-readable transport formatting
//!
//! Produces the one-line status shown by the sender binary, e.g.
//! `120.00 bpm, 4/4  -  00:00:04.250  -  3|1|000  (playing)`.

use super::snapshot::TransportSnapshot;

/// Ticks per beat used for the bars|beats|ticks readout
pub const TICKS_PER_BEAT: f64 = 960.0;

/// Format seconds as `HH:MM:SS.mmm`; non-finite input reads as zero
pub fn format_timecode(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds } else { 0.0 };
    let millis = (seconds * 1000.0).round() as i64;
    let abs = millis.unsigned_abs();

    format!(
        "{:02}:{:02}:{:02}.{:03}",
        millis / 3_600_000,
        (abs / 60_000) % 60,
        (abs / 1000) % 60,
        abs % 1000
    )
}

/// Format a quarter-note position as `bar|beat|ticks`, one-based
///
/// Positions that cannot be placed in a bar (non-finite, or a signature
/// with no whole quarter note per bar) read as `1|1|000`.
pub fn format_bars_beats(quarter_notes: f64, numerator: i32, denominator: i32) -> String {
    const START: &str = "1|1|000";

    if !quarter_notes.is_finite() || numerator <= 0 || denominator <= 0 {
        return START.to_string();
    }

    // Integer division, so 6/8 counts as three quarter notes per bar
    let quarter_notes_per_bar = numerator as i64 * 4 / denominator as i64;
    if quarter_notes_per_bar <= 0 {
        return START.to_string();
    }
    let per_bar = quarter_notes_per_bar as f64;
    let beats = (quarter_notes % per_bar) / per_bar * numerator as f64;

    let bar = (quarter_notes as i64 / quarter_notes_per_bar).saturating_add(1);
    let beat = beats as i64 + 1;
    let ticks = ((beats % 1.0) * TICKS_PER_BEAT + 0.5) as i64;

    format!("{}|{}|{:03}", bar, beat, ticks)
}

/// One-line description of a snapshot
pub fn describe(pos: &TransportSnapshot) -> String {
    let mut text = format!(
        "{:.2} bpm, {}/{}  -  {}  -  {}",
        pos.tempo_bpm,
        pos.time_sig_numerator,
        pos.time_sig_denominator,
        format_timecode(pos.time_in_seconds),
        format_bars_beats(pos.ppq_position, pos.time_sig_numerator, pos.time_sig_denominator),
    );

    if pos.is_recording {
        text.push_str("  (recording)");
    } else if pos.is_playing {
        text.push_str("  (playing)");
    }
    text
}
