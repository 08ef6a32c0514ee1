//! MFCC computation
//!
//! ```text
//! E[m]  = Σ_k H_m[k] · P[k]
//! L[m]  = 10 · log10(max(E[m], 1e-10))
//! c[n]  = orthonormal DCT-II of L, n < 20
//! ```

use super::mel::MelFilterbank;
use super::MFCC_COEFFICIENTS;
use crate::error::AnalysisError;

/// Floor applied to band energies before the log
const ENERGY_FLOOR: f32 = 1e-10;

/// Per-frame MFCC extractor for one STFT geometry
#[derive(Debug, Clone)]
pub struct MfccExtractor {
    filterbank: MelFilterbank,
    /// DCT-II basis, `MFCC_COEFFICIENTS` rows of `n_mels` columns
    dct: Vec<Vec<f32>>,
    bands: Vec<f32>,
}

impl MfccExtractor {
    /// Build the filterbank and DCT basis
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if `n_mels` is smaller than the
    /// number of coefficients kept, or the filterbank cannot be built.
    pub fn new(n_mels: usize, sample_rate: u32, frame_size: usize) -> Result<Self, AnalysisError> {
        if n_mels < MFCC_COEFFICIENTS {
            return Err(AnalysisError::InvalidInput(format!(
                "Need at least {} mel bands, got {}",
                MFCC_COEFFICIENTS, n_mels
            )));
        }

        let filterbank = MelFilterbank::new(n_mels, sample_rate, frame_size)?;
        let dct = dct_basis(MFCC_COEFFICIENTS, n_mels);

        Ok(Self {
            filterbank,
            dct,
            bands: Vec::with_capacity(n_mels),
        })
    }

    /// Coefficients of one power spectrum
    pub fn frame_mfcc(&mut self, power: &[f32]) -> [f32; MFCC_COEFFICIENTS] {
        self.filterbank.apply(power, &mut self.bands);
        for e in &mut self.bands {
            *e = 10.0 * e.max(ENERGY_FLOOR).log10();
        }

        let mut coeffs = [0.0f32; MFCC_COEFFICIENTS];
        for (c, row) in coeffs.iter_mut().zip(self.dct.iter()) {
            *c = row.iter().zip(self.bands.iter()).map(|(b, e)| b * e).sum();
        }
        coeffs
    }
}

/// Orthonormal DCT-II basis
fn dct_basis(n_out: usize, n_in: usize) -> Vec<Vec<f32>> {
    let scale0 = (1.0 / n_in as f32).sqrt();
    let scale = (2.0 / n_in as f32).sqrt();
    (0..n_out)
        .map(|k| {
            let s = if k == 0 { scale0 } else { scale };
            (0..n_in)
                .map(|n| {
                    s * (std::f32::consts::PI * k as f32 * (2 * n + 1) as f32
                        / (2 * n_in) as f32)
                        .cos()
                })
                .collect()
        })
        .collect()
}

/// Running mean of MFCC frames
#[derive(Debug, Clone, Default)]
pub struct MfccAccumulator {
    sum: [f64; MFCC_COEFFICIENTS],
    frames: usize,
}

impl MfccAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one frame
    pub fn push(&mut self, coeffs: &[f32; MFCC_COEFFICIENTS]) {
        for (acc, &c) in self.sum.iter_mut().zip(coeffs.iter()) {
            *acc += c as f64;
        }
        self.frames += 1;
    }

    /// Frames accumulated
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Time-averaged coefficients, or `None` if no frame was pushed
    pub fn mean(&self) -> Option<[f32; MFCC_COEFFICIENTS]> {
        if self.frames == 0 {
            return None;
        }
        let mut mean = [0.0f32; MFCC_COEFFICIENTS];
        for (m, s) in mean.iter_mut().zip(self.sum.iter()) {
            *m = (*s / self.frames as f64) as f32;
        }
        Some(mean)
    }
}
