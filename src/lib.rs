//! # Trackflow DSP
//!
//! Audio descriptor extraction and library-scale similarity for DJ tools:
//! tempo, musical key (standard, Camelot and Open Key notation), whole-track
//! energy and a 32-element timbre/pitch fingerprint, cached per file version
//! and ranked by cosine similarity.
//!
//! ## Features
//!
//! - **Tempo**: spectral-flux onset envelope, FFT autocorrelation with a tempo prior
//! - **Key**: chroma vector matched against Krumhansl-Kessler templates
//! - **Energy**: streamed whole-file RMS mapped to a 1-10 level
//! - **Fingerprint vector**: 20 MFCCs + 12 chroma coefficients
//! - **Cache**: one JSON record per (path, mtime, size) fingerprint
//! - **Batch**: cache hits first, misses on a fixed worker pool
//! - **Similarity**: top-N cosine ranking over cached vectors
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use trackflow_dsp::{AnalysisConfig, FeatureExtractor};
//!
//! let extractor = FeatureExtractor::new(AnalysisConfig::default())?;
//! let bundle = extractor.analyze(Path::new("track.mp3"))?;
//!
//! println!("Tempo: {:?}", bundle.tempo);
//! println!("Key: {} ({})", bundle.key.notation, bundle.key.camelot);
//! println!("Energy: {} ({})", bundle.energy.level, bundle.energy.description);
//! # Ok::<(), trackflow_dsp::AnalysisError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! paths → BatchCoordinator ─┬─ FingerprintCache hit ──────────────────────┐
//!                           └─ miss → worker: decode → extract → put ─────┴→ BatchStream
//!
//! query + candidates → SimilarityRanker → FingerprintCache (read only)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod batch;
pub mod cache;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod preprocessing;
pub mod similarity;

use std::path::Path;

// Re-export main types
pub use analysis::extractor::{AudioDescriptors, FeatureExtractor, TrackAnalyzer};
pub use analysis::metadata::{AudioInfo, TrackMetadata};
pub use analysis::result::{
    DescriptorBundle, EnergyInfo, FeatureVector, Key, KeyConfidence, KeyInfo, FEATURE_VECTOR_LEN,
};
pub use batch::{BatchCoordinator, BatchEvent, BatchStream, CancellationToken, ResultSource};
pub use cache::{FingerprintCache, TrackFingerprint};
pub use config::{AnalysisConfig, BatchConfig};
pub use error::AnalysisError;
pub use similarity::{SimilarityRanker, SimilarityResult};

/// Analyze in-memory audio samples
///
/// Energy covers every sample; tempo, key and the feature vector use the
/// leading windows set in `config`.
///
/// # Arguments
///
/// * `samples` - Mono audio samples, normalized to [-1.0, 1.0]
/// * `sample_rate` - Sample rate in Hz (typically 44100 or 48000)
/// * `config` - Analysis configuration parameters
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for a zero sample rate or invalid
/// configuration. Undecided sub-analyses are fallbacks, not errors.
///
/// # Example
///
/// ```no_run
/// use trackflow_dsp::{analyze_audio, AnalysisConfig};
///
/// let samples = vec![0.0f32; 44100 * 30]; // 30 seconds of silence
/// let result = analyze_audio(&samples, 44100, AnalysisConfig::default())?;
/// assert!(result.tempo.is_none());
/// # Ok::<(), trackflow_dsp::AnalysisError>(())
/// ```
pub fn analyze_audio(
    samples: &[f32],
    sample_rate: u32,
    config: AnalysisConfig,
) -> Result<AudioDescriptors, AnalysisError> {
    log::debug!("Starting audio analysis: {} samples at {} Hz", samples.len(), sample_rate);
    analysis::extractor::analyze_samples(samples, sample_rate, &config)
}

/// Decode and analyze one audio file
///
/// # Errors
///
/// Returns `AnalysisError::DecodingError` if the file cannot be opened as
/// audio, or `AnalysisError::InvalidInput` for an invalid configuration.
///
/// # Example
///
/// ```no_run
/// use trackflow_dsp::{analyze_file, AnalysisConfig};
///
/// let bundle = analyze_file("set/opener.flac", AnalysisConfig::default())?;
/// println!("{} → {:?} BPM", bundle.filename, bundle.tempo);
/// # Ok::<(), trackflow_dsp::AnalysisError>(())
/// ```
pub fn analyze_file(
    path: impl AsRef<Path>,
    config: AnalysisConfig,
) -> Result<DescriptorBundle, AnalysisError> {
    FeatureExtractor::new(config)?.analyze(path.as_ref())
}
