//! Feature extraction modules
//!
//! This module contains all feature extraction algorithms:
//! - Shared STFT
//! - Onset strength (spectral flux)
//! - Period estimation (tempo)
//! - Chroma extraction
//! - Key detection
//! - Whole-track energy
//! - Timbre (MFCC)

pub mod chroma;
pub mod energy;
pub mod key;
pub mod onset;
pub mod period;
pub mod spectrum;
pub mod timbre;
