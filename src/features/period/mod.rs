//! Period estimation modules
//!
//! Convert an onset-strength envelope to a BPM estimate using
//! FFT-accelerated autocorrelation with a tempo prior.

pub mod autocorrelation;

pub use autocorrelation::{estimate_tempo, TempoParams};

/// Tempo estimate with its periodicity strength
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoEstimate {
    /// BPM estimate
    pub bpm: f32,

    /// Normalized autocorrelation at the chosen lag (0.0-1.0)
    pub periodicity: f32,
}
