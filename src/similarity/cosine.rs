//! Cosine similarity

/// Magnitudes below this are treated as zero vectors
const MIN_NORM: f64 = 1e-9;

/// Cosine of the angle between `a` and `b`, in [-1, 1]
///
/// Returns 0.0 for mismatched lengths or a (near) zero vector. Accumulates
/// in f64.
///
/// # Example
///
/// ```
/// use trackflow_dsp::similarity::cosine_similarity;
///
/// assert!((cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]) - 1.0).abs() < 1e-9);
/// assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
/// assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let norm_a = norm_a.sqrt();
    let norm_b = norm_b.sqrt();
    if !(norm_a >= MIN_NORM && norm_b >= MIN_NORM) {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Map a cosine in [-1, 1] to a display score in [0, 1], four decimals
pub fn display_score(cosine: f64) -> f64 {
    let score = ((cosine + 1.0) / 2.0).clamp(0.0, 1.0);
    (score * 10_000.0).round() / 10_000.0
}
