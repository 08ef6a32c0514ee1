//! Whole-track energy
//!
//! Global RMS over every sample of the file, accumulated chunk by chunk so
//! memory stays bounded regardless of track length, then mapped to a 1-10
//! level through nine ascending thresholds.

use crate::analysis::result::EnergyInfo;

/// RMS upper bounds for levels 1-9; anything at or above the last is level 10
pub const ENERGY_THRESHOLDS: [f64; 9] = [0.05, 0.08, 0.11, 0.14, 0.17, 0.20, 0.23, 0.26, 0.30];

const DESCRIPTIONS: [&str; 10] = [
    "Very Low",
    "Low",
    "Low-Medium",
    "Medium",
    "Medium",
    "Medium-High",
    "High",
    "High",
    "Very High",
    "Peak Energy",
];

/// Energy level (1-10) for a global RMS value
///
/// # Example
///
/// ```
/// use trackflow_dsp::features::energy::energy_level;
///
/// assert_eq!(energy_level(0.0), 1);
/// assert_eq!(energy_level(0.12), 4);
/// assert_eq!(energy_level(0.9), 10);
/// ```
pub fn energy_level(rms: f64) -> u8 {
    ENERGY_THRESHOLDS
        .iter()
        .position(|&t| rms < t)
        .map_or(10, |i| i as u8 + 1)
}

/// Fixed label for an energy level; out-of-range levels are clamped
pub fn energy_description(level: u8) -> &'static str {
    DESCRIPTIONS[level.clamp(1, 10) as usize - 1]
}

/// Streaming sum-of-squares accumulator
#[derive(Debug, Clone, Default)]
pub struct EnergyAccumulator {
    sum_squares: f64,
    count: u64,
}

impl EnergyAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chunk of mono samples
    pub fn push(&mut self, samples: &[f32]) {
        self.sum_squares += samples.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>();
        self.count += samples.len() as u64;
    }

    /// Samples accumulated so far
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Global RMS, or `None` if no sample was seen
    pub fn rms(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some((self.sum_squares / self.count as f64).sqrt())
    }

    /// Energy descriptors for everything pushed; mid-scale fallback when empty
    /// or non-finite
    pub fn finish(&self) -> EnergyInfo {
        match self.rms() {
            Some(rms) if rms.is_finite() => {
                let level = energy_level(rms);
                log::debug!("Energy: rms={:.4} over {} samples, level {}", rms, self.count, level);
                EnergyInfo {
                    level,
                    rms: (rms * 10_000.0).round() / 10_000.0,
                    description: energy_description(level).to_string(),
                }
            }
            _ => {
                log::warn!("No measurable energy over {} samples, using fallback", self.count);
                EnergyInfo::unknown()
            }
        }
    }
}
