//! Chroma extraction modules
//!
//! Extract pitch-class distribution (12 semitones) from audio:
//! - Folding spectral bins into pitch classes
//! - Per-frame normalization and time averaging

pub mod extractor;
pub mod normalization;

pub use extractor::{extract_chroma, pitch_class_of, ChromaMapper};
pub use normalization::{normalize_max, ChromaAccumulator};

/// Number of pitch classes
pub const PITCH_CLASSES: usize = 12;
