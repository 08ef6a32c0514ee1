//! Analysis and result aggregation modules
//!
//! Combines feature extraction results into the descriptor bundle:
//! - File-level extraction pipeline
//! - Result types
//! - Pass-through metadata

pub mod extractor;
pub mod metadata;
pub mod result;

pub use extractor::{analyze_samples, AudioDescriptors, FeatureExtractor, TrackAnalyzer};
