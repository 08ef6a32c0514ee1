//! Key detection algorithm
//!
//! Correlates a time-averaged chroma vector against all 24 rotated
//! Krumhansl-Kessler templates. The best-correlated template decides the
//! mode; the tonic is the strongest pitch class of the chroma vector.
//!
//! # Reference
//!
//! Krumhansl, C. L., & Kessler, E. J. (1982). Tracing the Dynamic Changes in Perceived
//! Tonal Organization in a Spatial Representation of Musical Keys. *Psychological Review*,
//! 89(4), 334-368.

use super::{templates::KeyTemplates, KeyDetectionResult};
use crate::analysis::result::Key;

const EPSILON: f32 = 1e-10;

/// Detect musical key from a time-averaged chroma vector
///
/// # Returns
///
/// `None` if the chroma vector is flat (no tonal information), so that
/// the caller can fall back to an unknown key.
///
/// # Example
///
/// ```
/// use trackflow_dsp::features::key::{detect_key, KeyTemplates};
///
/// let mut chroma = [0.05f32; 12];
/// chroma[0] = 1.0; // C
/// chroma[4] = 0.7; // E
/// chroma[7] = 0.8; // G
///
/// let result = detect_key(&chroma, &KeyTemplates::new()).unwrap();
/// assert_eq!(result.key.notation(), "C Major");
/// ```
pub fn detect_key(chroma: &[f32; 12], templates: &KeyTemplates) -> Option<KeyDetectionResult> {
    if chroma.iter().any(|c| !c.is_finite()) {
        log::warn!("Chroma vector contains non-finite values, key unknown");
        return None;
    }

    let mut scores = Vec::with_capacity(24);
    for tonic in 0..12u32 {
        let major = pearson_correlation(chroma, templates.get_major_template(tonic))?;
        scores.push((Key::Major(tonic), major));
    }
    for tonic in 0..12u32 {
        let minor = pearson_correlation(chroma, templates.get_minor_template(tonic))?;
        scores.push((Key::Minor(tonic), minor));
    }

    // Stable: on exact ties the first listed key (major before minor) wins
    scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let (best, correlation) = scores[0];

    let tonic = argmax(chroma) as u32;
    let key = match best {
        Key::Major(_) => Key::Major(tonic),
        Key::Minor(_) => Key::Minor(tonic),
    };

    log::debug!(
        "Key: {} (best template {} r={:.3}, tonic from chroma max)",
        key.notation(),
        best.notation(),
        correlation
    );

    Some(KeyDetectionResult {
        key,
        correlation,
        all_scores: scores,
    })
}

/// Pearson correlation of two 12-element vectors; `None` if either is constant
fn pearson_correlation(a: &[f32; 12], b: &[f32; 12]) -> Option<f32> {
    let mean_a = a.iter().sum::<f32>() / 12.0;
    let mean_b = b.iter().sum::<f32>() / 12.0;

    let mut cov = 0.0f32;
    let mut var_a = 0.0f32;
    let mut var_b = 0.0f32;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denom = (var_a * var_b).sqrt();
    if denom < EPSILON {
        return None;
    }
    Some(cov / denom)
}

fn argmax(values: &[f32; 12]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}
