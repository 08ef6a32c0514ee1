//! Key detection modules
//!
//! Detect musical key using:
//! - Krumhansl-Kessler templates (24 keys)
//! - Pearson correlation template matching

pub mod detector;
pub mod templates;

pub use detector::detect_key;
pub use templates::KeyTemplates;

use crate::analysis::result::Key;

/// Key detection result
#[derive(Debug, Clone)]
pub struct KeyDetectionResult {
    /// Detected key (best mode, tonic at the chroma maximum)
    pub key: Key,

    /// Correlation of the best template match (-1.0 to 1.0)
    pub correlation: f32,

    /// All 24 template correlations (ranked, highest first)
    pub all_scores: Vec<(Key, f32)>,
}
