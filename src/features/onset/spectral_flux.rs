//! Spectral flux onset strength
//!
//! Onset strength per frame is the half-wave rectified increase of
//! log-compressed magnitude, averaged over bins:
//!
//! ```text
//! L[n][k]  = ln(1 + γ·|X[n][k]|)
//! OSS[n]   = mean_k max(0, L[n][k] − L[n−1][k])
//! ```
//!
//! # Reference
//!
//! Bello, J. P., Daudet, L., Abdallah, S., Duxbury, C., Davies, M., & Sandler, M. B. (2005).
//! A Tutorial on Onset Detection in Music Signals.
//! *IEEE Transactions on Speech and Audio Processing*, 13(5), 1035-1047.

/// Log compression factor γ applied to magnitudes
const LOG_COMPRESSION: f32 = 1000.0;

/// Streaming onset-strength envelope, fed one power spectrum at a time
#[derive(Debug, Default)]
pub struct OnsetStrength {
    previous: Vec<f32>,
    current: Vec<f32>,
    envelope: Vec<f32>,
}

impl OnsetStrength {
    /// Create an empty envelope
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the next frame's power spectrum; returns its onset strength
    ///
    /// The first frame has no predecessor and scores 0.
    pub fn push(&mut self, power: &[f32]) -> f32 {
        self.current.clear();
        self.current
            .extend(power.iter().map(|&p| (1.0 + LOG_COMPRESSION * p.max(0.0).sqrt()).ln()));

        let strength = if self.previous.len() == self.current.len() && !self.current.is_empty() {
            let rise: f32 = self
                .current
                .iter()
                .zip(self.previous.iter())
                .map(|(&cur, &prev)| (cur - prev).max(0.0))
                .sum();
            rise / self.current.len() as f32
        } else {
            0.0
        };

        std::mem::swap(&mut self.previous, &mut self.current);
        self.envelope.push(strength);
        strength
    }

    /// Frames pushed so far
    pub fn len(&self) -> usize {
        self.envelope.len()
    }

    /// True if no frame was pushed
    pub fn is_empty(&self) -> bool {
        self.envelope.is_empty()
    }

    /// Consume the accumulator and return the envelope (one value per frame)
    pub fn into_envelope(self) -> Vec<f32> {
        self.envelope
    }
}

/// Smooth an envelope with a triangular kernel of the given radius
///
/// Widens single-frame onset spikes so that periods falling between two
/// integer lags still correlate.
pub fn smooth_triangular(envelope: &[f32], radius: usize) -> Vec<f32> {
    if radius == 0 || envelope.len() < 3 {
        return envelope.to_vec();
    }

    let kernel: Vec<f32> = (0..=2 * radius)
        .map(|i| (radius + 1) as f32 - (i as f32 - radius as f32).abs())
        .collect();

    (0..envelope.len())
        .map(|i| {
            let mut sum = 0.0f32;
            let mut weight = 0.0f32;
            for (j, &k) in kernel.iter().enumerate() {
                let idx = i as isize + j as isize - radius as isize;
                if idx >= 0 && (idx as usize) < envelope.len() {
                    sum += envelope[idx as usize] * k;
                    weight += k;
                }
            }
            if weight > 0.0 {
                sum / weight
            } else {
                0.0
            }
        })
        .collect()
}
