//! Timbre descriptors
//!
//! Mel-frequency cepstral coefficients, time-averaged into the first 20
//! entries of the similarity feature vector.

pub mod mel;
pub mod mfcc;

pub use mel::MelFilterbank;
pub use mfcc::{MfccAccumulator, MfccExtractor};

/// Cepstral coefficients kept per frame
pub const MFCC_COEFFICIENTS: usize = 20;
