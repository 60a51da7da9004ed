//! Host-automatable destination port parameter

use crate::constants::{DEFAULT_PORT, MAX_PORT, MIN_PORT};

/// Integer parameter with fixed bounds, exposed to the host as the port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortParameter {
    value: u16,
}

impl PortParameter {
    pub const ID: &'static str = "oscPort";
    pub const NAME: &'static str = "Osc Port";
    pub const MIN: u16 = MIN_PORT;
    pub const MAX: u16 = MAX_PORT;
    pub const DEFAULT: u16 = DEFAULT_PORT;

    pub fn new() -> Self {
        Self { value: Self::DEFAULT }
    }

    pub fn value(&self) -> u16 {
        self.value
    }

    /// Set from a plain value, clamped into bounds
    ///
    /// Returns the new value if it differs from the old one.
    pub fn set_value(&mut self, value: i64) -> Option<u16> {
        let clamped = value.clamp(Self::MIN as i64, Self::MAX as i64) as u16;
        if clamped == self.value {
            return None;
        }
        self.value = clamped;
        Some(clamped)
    }

    /// Set from the host's normalized `[0, 1]` range
    pub fn set_normalized(&mut self, normalized: f32) -> Option<u16> {
        self.set_value(Self::denormalize(normalized))
    }

    pub fn normalized(&self) -> f32 {
        (self.value - Self::MIN) as f32 / (Self::MAX - Self::MIN) as f32
    }

    fn denormalize(normalized: f32) -> i64 {
        let n = if normalized.is_nan() { 0.0 } else { normalized.clamp(0.0, 1.0) as f64 };
        (Self::MIN as f64 + n * (Self::MAX - Self::MIN) as f64).round() as i64
    }
}

impl Default for PortParameter {
    fn default() -> Self {
        Self::new()
    }
}
