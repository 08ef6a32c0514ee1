//! Autocorrelation-based tempo estimation
//!
//! Finds the dominant periodicity of the onset-strength envelope using
//! FFT-accelerated autocorrelation.
//!
//! # Algorithm
//!
//! 1. Smooth and mean-center the onset-strength envelope
//! 2. Compute autocorrelation using FFT acceleration: `ACF = IFFT(|FFT(signal)|²)`
//! 3. Weight each lag in the BPM range by a log-normal tempo prior
//! 4. Pick the strongest local maximum; reject it if its raw ACF value is a
//!    small fraction of the zero-lag energy (no dominant periodicity)
//! 5. Refine the lag by parabolic interpolation and convert:
//!    `BPM = (60 * sample_rate) / (lag * hop_size)`
//!
//! # Reference
//!
//! Ellis, D. P. W. (2007). Beat Tracking by Dynamic Programming.
//! *Journal of New Music Research*, 36(1), 51-60.
//!
//! # Example
//!
//! ```no_run
//! use trackflow_dsp::features::period::autocorrelation::{estimate_tempo, TempoParams};
//!
//! let envelope = vec![0.0f32; 2000];
//! let tempo = estimate_tempo(&envelope, 44100, 512, &TempoParams::default())?;
//! assert!(tempo.is_none());
//! # Ok::<(), trackflow_dsp::AnalysisError>(())
//! ```

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use super::TempoEstimate;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::features::onset::smooth_triangular;

const EPSILON: f32 = 1e-10;

/// Radius in frames of the triangular smoothing applied before correlation
const ENVELOPE_SMOOTHING_RADIUS: usize = 2;

/// Tempo search parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoParams {
    /// Minimum BPM to consider
    pub min_bpm: f32,
    /// Maximum BPM to consider
    pub max_bpm: f32,
    /// Centre of the log-normal tempo prior
    pub prior_bpm: f32,
    /// Prior width in octaves
    pub prior_octaves: f32,
    /// Minimum `ACF[lag] / ACF[0]` for a tempo to be reported
    pub min_periodicity: f32,
}

impl Default for TempoParams {
    fn default() -> Self {
        Self::from(&AnalysisConfig::default())
    }
}

impl From<&AnalysisConfig> for TempoParams {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            min_bpm: config.min_bpm,
            max_bpm: config.max_bpm,
            prior_bpm: config.tempo_prior_bpm,
            prior_octaves: config.tempo_prior_octaves,
            min_periodicity: config.min_periodicity,
        }
    }
}

impl TempoParams {
    /// Log-normal prior weight for `bpm`, 1.0 at the prior centre
    pub fn prior_weight(&self, bpm: f32) -> f32 {
        let octaves = (bpm / self.prior_bpm).log2() / self.prior_octaves;
        (-0.5 * octaves * octaves).exp()
    }
}

/// Estimate tempo from an onset-strength envelope
///
/// # Arguments
///
/// * `onset_envelope` - Onset strength, one value per STFT frame
/// * `sample_rate` - Sample rate in Hz
/// * `hop_size` - Hop size used to compute the envelope (samples per frame)
/// * `params` - BPM range, prior and periodicity threshold
///
/// # Returns
///
/// `Ok(None)` if the envelope has no dominant periodicity in the BPM range
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for a zero sample rate or hop size,
/// or an empty/inverted BPM range.
pub fn estimate_tempo(
    onset_envelope: &[f32],
    sample_rate: u32,
    hop_size: usize,
    params: &TempoParams,
) -> Result<Option<TempoEstimate>, AnalysisError> {
    log::debug!(
        "Estimating tempo from autocorrelation: {} frames, {} Hz, hop={}, range=[{:.1}, {:.1}] BPM",
        onset_envelope.len(),
        sample_rate,
        hop_size,
        params.min_bpm,
        params.max_bpm
    );

    if sample_rate == 0 {
        return Err(AnalysisError::InvalidInput(
            "Invalid sample rate: 0".to_string(),
        ));
    }

    if hop_size == 0 {
        return Err(AnalysisError::InvalidInput(
            "Invalid hop size: 0".to_string(),
        ));
    }

    if params.min_bpm <= 0.0 || params.max_bpm <= 0.0 || params.min_bpm >= params.max_bpm {
        return Err(AnalysisError::InvalidInput(format!(
            "Invalid BPM range: [{:.1}, {:.1}]",
            params.min_bpm, params.max_bpm
        )));
    }

    if onset_envelope.len() < 4 {
        return Ok(None);
    }

    // Step 1: Smooth and mean-center
    let mut signal = smooth_triangular(onset_envelope, ENVELOPE_SMOOTHING_RADIUS);
    let mean = signal.iter().sum::<f32>() / signal.len() as f32;
    for v in &mut signal {
        *v -= mean;
    }

    // Step 2: Autocorrelation
    let acf = compute_autocorrelation_fft(&signal);
    let zero_lag = acf[0];
    if zero_lag <= EPSILON {
        log::debug!("Onset envelope is flat, no tempo");
        return Ok(None);
    }

    // Step 3: Lag range for the BPM range
    let frames_per_minute = 60.0 * sample_rate as f32 / hop_size as f32;
    let lag_of = |bpm: f32| frames_per_minute / bpm;
    let lag_min = (lag_of(params.max_bpm).ceil() as usize).max(1);
    let lag_max = (lag_of(params.min_bpm).floor() as usize).min(acf.len().saturating_sub(2));

    if lag_min + 2 > lag_max {
        log::debug!(
            "Envelope too short for lag range [{}, {}] (ACF length {})",
            lag_min,
            lag_max,
            acf.len()
        );
        return Ok(None);
    }

    let weighted: Vec<f32> = (lag_min..=lag_max)
        .map(|lag| acf[lag] / zero_lag * params.prior_weight(frames_per_minute / lag as f32))
        .collect();

    // Step 4: Strongest weighted peak
    let peaks = find_peaks_in_acf(&weighted, lag_min);
    let Some(&(best_lag, _)) = peaks.first() else {
        log::debug!("No autocorrelation peak in BPM range");
        return Ok(None);
    };

    let strength = acf[best_lag] / zero_lag;
    if strength < params.min_periodicity {
        log::debug!(
            "Weak periodicity {:.3} at lag {} (< {:.3}), no tempo",
            strength,
            best_lag,
            params.min_periodicity
        );
        return Ok(None);
    }

    // Step 5: Sub-frame refinement
    let refined_lag = best_lag as f32 + parabolic_offset(acf[best_lag - 1], acf[best_lag], acf[best_lag + 1]);
    let bpm = frames_per_minute / refined_lag;

    log::debug!(
        "Tempo: {:.2} BPM (lag {:.2}, periodicity {:.3}, {} candidate peaks)",
        bpm,
        refined_lag,
        strength,
        peaks.len()
    );

    Ok(Some(TempoEstimate {
        bpm,
        periodicity: strength.min(1.0),
    }))
}

/// Compute autocorrelation using FFT acceleration
///
/// Uses the identity: ACF = IFFT(|FFT(signal)|²)
///
/// # Returns
///
/// Autocorrelation function (same length as input), negative values clamped to 0
pub fn compute_autocorrelation_fft(signal: &[f32]) -> Vec<f32> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }

    // FFT size: next power of 2 >= 2*n (zero-padding avoids circular wrap)
    let fft_size = (2 * n).next_power_of_two();

    let mut fft_input: Vec<Complex<f32>> = signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
    fft_input.resize(fft_size, Complex::new(0.0, 0.0));

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_size);
    fft.process(&mut fft_input);

    for x in &mut fft_input {
        *x = *x * x.conj();
    }

    let ifft = planner.plan_fft_inverse(fft_size);
    ifft.process(&mut fft_input);

    let scale = 1.0 / (fft_size as f32);
    fft_input[..n]
        .iter()
        .map(|x| (x.re * scale).max(0.0))
        .collect()
}

/// Find local maxima of at least 10% of the slice maximum
///
/// # Arguments
///
/// * `acf_slice` - Slice of (weighted) ACF to search, already limited to the lag range
/// * `offset` - Lag of the first element of the slice
///
/// # Returns
///
/// (lag, value) pairs sorted by value, highest first. Endpoints are never peaks.
fn find_peaks_in_acf(acf_slice: &[f32], offset: usize) -> Vec<(usize, f32)> {
    if acf_slice.len() < 3 {
        return vec![];
    }

    let max_value = acf_slice.iter().copied().fold(0.0f32, f32::max);
    if max_value < EPSILON {
        return vec![];
    }
    let min_height = max_value * 0.1;

    let mut peaks: Vec<(usize, f32)> = (1..acf_slice.len() - 1)
        .filter(|&i| {
            let value = acf_slice[i];
            value >= min_height && value > acf_slice[i - 1] && value >= acf_slice[i + 1]
        })
        .map(|i| (i + offset, acf_slice[i]))
        .collect();

    peaks.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    peaks
}

/// Vertex offset of the parabola through three equally spaced points, in [-0.5, 0.5]
fn parabolic_offset(left: f32, centre: f32, right: f32) -> f32 {
    let denom = left - 2.0 * centre + right;
    if denom.abs() < EPSILON {
        return 0.0;
    }
    (0.5 * (left - right) / denom).clamp(-0.5, 0.5)
}
