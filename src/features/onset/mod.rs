//! Onset detection modules
//!
//! Onset-strength envelope used for tempo estimation:
//! - Spectral flux over log-compressed magnitudes
//! - Triangular smoothing of the envelope

pub mod spectral_flux;

pub use spectral_flux::{smooth_triangular, OnsetStrength};
