//! Short-time Fourier transform
//!
//! One Hann-windowed power spectrum per hop, shared by onset detection, chroma
//! extraction and the mel filterbank so the spectrum is computed once per frame.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::error::AnalysisError;

/// Frequency in Hz of FFT bin `bin`
pub fn bin_frequency(bin: usize, sample_rate: u32, frame_size: usize) -> f32 {
    bin as f32 * sample_rate as f32 / frame_size as f32
}

/// Reusable STFT state: window, FFT plan and scratch buffers
pub struct StftProcessor {
    frame_size: usize,
    hop_size: usize,
    window: Vec<f32>,
    window_gain: f32,
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    power: Vec<f32>,
}

impl StftProcessor {
    /// Plan an STFT with the given frame and hop size
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if either size is zero or the hop
    /// exceeds the frame.
    pub fn new(frame_size: usize, hop_size: usize) -> Result<Self, AnalysisError> {
        if frame_size < 2 {
            return Err(AnalysisError::InvalidInput(format!(
                "Frame size must be >= 2, got {}",
                frame_size
            )));
        }
        if hop_size == 0 || hop_size > frame_size {
            return Err(AnalysisError::InvalidInput(format!(
                "Hop size must be in 1..={}, got {}",
                frame_size, hop_size
            )));
        }

        // Periodic Hann window
        let window: Vec<f32> = (0..frame_size)
            .map(|n| {
                0.5 - 0.5 * (2.0 * std::f32::consts::PI * n as f32 / frame_size as f32).cos()
            })
            .collect();
        let window_gain = window.iter().sum::<f32>();

        let fft = FftPlanner::new().plan_fft_forward(frame_size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        Ok(Self {
            frame_size,
            hop_size,
            window,
            window_gain,
            fft,
            buffer: vec![Complex::new(0.0, 0.0); frame_size],
            scratch,
            power: vec![0.0; frame_size / 2 + 1],
        })
    }

    /// Frame size in samples
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Hop size in samples
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Bins per power spectrum (`frame_size / 2 + 1`)
    pub fn n_bins(&self) -> usize {
        self.frame_size / 2 + 1
    }

    /// Number of frames produced for `n_samples` samples
    ///
    /// A signal shorter than one frame still yields a single zero-padded frame.
    pub fn frame_count(&self, n_samples: usize) -> usize {
        if n_samples == 0 {
            0
        } else if n_samples < self.frame_size {
            1
        } else {
            (n_samples - self.frame_size) / self.hop_size + 1
        }
    }

    /// Compute the power spectrum of every frame and hand it to `f`
    ///
    /// Power is normalized by the window gain so that a full-scale sinusoid
    /// peaks near 0.25 regardless of frame size.
    pub fn for_each_frame<F>(&mut self, samples: &[f32], mut f: F)
    where
        F: FnMut(usize, &[f32]),
    {
        let n_frames = self.frame_count(samples.len());
        let scale = if self.window_gain > 0.0 {
            1.0 / self.window_gain
        } else {
            1.0
        };

        for frame_idx in 0..n_frames {
            let start = frame_idx * self.hop_size;
            let end = (start + self.frame_size).min(samples.len());
            let frame = &samples[start..end];

            for (i, slot) in self.buffer.iter_mut().enumerate() {
                let sample = frame.get(i).copied().unwrap_or(0.0);
                *slot = Complex::new(sample * self.window[i], 0.0);
            }

            self.fft
                .process_with_scratch(&mut self.buffer, &mut self.scratch);

            for (bin, power) in self.power.iter_mut().enumerate() {
                let c = self.buffer[bin] * scale;
                *power = c.re * c.re + c.im * c.im;
            }

            f(frame_idx, &self.power);
        }
    }
}
