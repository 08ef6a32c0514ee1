//! Configuration parameters for audio analysis

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Analysis configuration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    // STFT parameters
    /// Frame size for STFT (default: 2048)
    pub frame_size: usize,

    /// Hop size for STFT (default: 512)
    pub hop_size: usize,

    // Tempo detection
    /// Seconds of audio, from the start of the file, used for tempo (default: 60.0)
    pub tempo_window_secs: f32,

    /// Minimum BPM to consider (default: 60.0)
    pub min_bpm: f32,

    /// Maximum BPM to consider (default: 180.0)
    pub max_bpm: f32,

    /// Centre of the log-normal tempo prior in BPM (default: 120.0)
    pub tempo_prior_bpm: f32,

    /// Width of the tempo prior in octaves (default: 1.0)
    pub tempo_prior_octaves: f32,

    /// Minimum autocorrelation peak, relative to zero lag, for a tempo to be
    /// reported at all (default: 0.1)
    pub min_periodicity: f32,

    // Key detection
    /// Seconds of audio, from the start of the file, used for key and timbre (default: 30.0)
    pub key_window_secs: f32,

    /// Lowest frequency folded into the chroma vector (default: 65.41 Hz, C2)
    pub chroma_min_freq: f32,

    /// Highest frequency folded into the chroma vector (default: 2093.0 Hz, C7)
    pub chroma_max_freq: f32,

    // Timbre
    /// Number of mel bands before the cosine transform (default: 40)
    pub n_mels: usize,

    // Energy
    /// Mono frames per energy chunk while streaming the whole file (default: 65536)
    pub energy_chunk_frames: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            frame_size: 2048,
            hop_size: 512,
            tempo_window_secs: 60.0,
            min_bpm: 60.0,
            max_bpm: 180.0,
            tempo_prior_bpm: 120.0,
            tempo_prior_octaves: 1.0,
            min_periodicity: 0.1,
            key_window_secs: 30.0,
            chroma_min_freq: 65.41,
            chroma_max_freq: 2093.0,
            n_mels: 40,
            energy_chunk_frames: 65_536,
        }
    }
}

impl AnalysisConfig {
    /// Load a configuration persisted as JSON; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        let bytes = std::fs::read(path.as_ref())?;
        let config: Self = serde_json::from_slice(&bytes)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no analysis can run with.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.frame_size < 2 || !self.frame_size.is_power_of_two() {
            return Err(AnalysisError::InvalidInput(format!(
                "Frame size must be a power of two >= 2, got {}",
                self.frame_size
            )));
        }
        if self.hop_size == 0 || self.hop_size > self.frame_size {
            return Err(AnalysisError::InvalidInput(format!(
                "Hop size must be in 1..={}, got {}",
                self.frame_size, self.hop_size
            )));
        }
        if self.min_bpm <= 0.0 || self.min_bpm >= self.max_bpm {
            return Err(AnalysisError::InvalidInput(format!(
                "Invalid BPM range: [{:.1}, {:.1}]",
                self.min_bpm, self.max_bpm
            )));
        }
        if self.tempo_prior_bpm <= 0.0 || self.tempo_prior_octaves <= 0.0 {
            return Err(AnalysisError::InvalidInput(
                "Tempo prior centre and width must be positive".to_string(),
            ));
        }
        if self.tempo_window_secs <= 0.0 || self.key_window_secs <= 0.0 {
            return Err(AnalysisError::InvalidInput(
                "Analysis windows must be positive".to_string(),
            ));
        }
        if self.chroma_min_freq <= 0.0 || self.chroma_min_freq >= self.chroma_max_freq {
            return Err(AnalysisError::InvalidInput(format!(
                "Invalid chroma range: [{:.1}, {:.1}] Hz",
                self.chroma_min_freq, self.chroma_max_freq
            )));
        }
        if self.n_mels < crate::features::timbre::MFCC_COEFFICIENTS {
            return Err(AnalysisError::InvalidInput(format!(
                "Need at least {} mel bands, got {}",
                crate::features::timbre::MFCC_COEFFICIENTS,
                self.n_mels
            )));
        }
        if self.energy_chunk_frames == 0 {
            return Err(AnalysisError::InvalidInput(
                "Energy chunk size must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of leading samples the extractor needs to keep in memory.
    pub fn prefix_samples(&self, sample_rate: u32) -> usize {
        let secs = self.tempo_window_secs.max(self.key_window_secs);
        (secs * sample_rate as f32).ceil() as usize
    }
}

/// Batch coordinator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Concurrent extraction workers (default: 3)
    ///
    /// Extraction is CPU-bound and each worker holds a decoded prefix in
    /// memory, so this stays small.
    pub workers: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { workers: 3 }
    }
}
