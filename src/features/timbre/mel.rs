//! Triangular mel filterbank (HTK mel scale)

use crate::error::AnalysisError;

/// Hz → mel
pub fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

/// mel → Hz
pub fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10f32.powf(mel / 2595.0) - 1.0)
}

/// One triangular filter stored sparsely
#[derive(Debug, Clone)]
struct MelBand {
    first_bin: usize,
    weights: Vec<f32>,
}

/// Mel filterbank over the bins of one STFT geometry
#[derive(Debug, Clone)]
pub struct MelFilterbank {
    bands: Vec<MelBand>,
}

impl MelFilterbank {
    /// Build `n_mels` filters spanning 0 Hz to Nyquist
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` for zero bands, a zero sample
    /// rate, or a frame too small to give each band a bin.
    pub fn new(n_mels: usize, sample_rate: u32, frame_size: usize) -> Result<Self, AnalysisError> {
        if n_mels == 0 || sample_rate == 0 || frame_size < 2 {
            return Err(AnalysisError::InvalidInput(format!(
                "Invalid mel filterbank: {} bands, {} Hz, frame {}",
                n_mels, sample_rate, frame_size
            )));
        }

        let n_bins = frame_size / 2 + 1;
        let nyquist = sample_rate as f32 / 2.0;
        let mel_max = hz_to_mel(nyquist);

        // n_mels + 2 edge frequencies, equally spaced in mel, as fractional bins
        let edges: Vec<f32> = (0..n_mels + 2)
            .map(|i| {
                let hz = mel_to_hz(mel_max * i as f32 / (n_mels + 1) as f32);
                hz * frame_size as f32 / sample_rate as f32
            })
            .collect();

        let bands = edges
            .windows(3)
            .map(|w| {
                let (left, centre, right) = (w[0], w[1], w[2]);
                let first_bin = left.ceil() as usize;
                let last_bin = (right.floor() as usize).min(n_bins - 1);
                let weights = (first_bin..=last_bin.max(first_bin))
                    .map(|bin| {
                        let b = bin as f32;
                        if b <= centre {
                            if centre > left {
                                (b - left) / (centre - left)
                            } else {
                                1.0
                            }
                        } else if right > centre {
                            (right - b) / (right - centre)
                        } else {
                            0.0
                        }
                    })
                    .map(|w| w.max(0.0))
                    .collect();
                MelBand { first_bin, weights }
            })
            .collect();

        Ok(Self { bands })
    }

    /// Number of bands
    pub fn n_mels(&self) -> usize {
        self.bands.len()
    }

    /// Band energies of one power spectrum, written into `out`
    pub fn apply(&self, power: &[f32], out: &mut Vec<f32>) {
        out.clear();
        out.extend(self.bands.iter().map(|band| {
            band.weights
                .iter()
                .enumerate()
                .filter_map(|(i, &w)| power.get(band.first_bin + i).map(|&p| p * w))
                .sum::<f32>()
        }));
    }
}
