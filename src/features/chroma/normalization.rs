//! Chroma normalization and averaging

use super::PITCH_CLASSES;

/// Frames whose strongest pitch class is below this are treated as silent
const SILENCE_FLOOR: f32 = 1e-10;

/// Scale a chroma vector so its maximum is 1.0
///
/// Returns `false`, leaving the vector untouched, if the frame is silent.
pub fn normalize_max(chroma: &mut [f32; PITCH_CLASSES]) -> bool {
    let max = chroma.iter().copied().fold(0.0f32, f32::max);
    if max < SILENCE_FLOOR {
        return false;
    }
    for c in chroma.iter_mut() {
        *c /= max;
    }
    true
}

/// Running mean of max-normalized chroma frames
///
/// Silent frames are skipped so that pauses do not dilute the distribution.
#[derive(Debug, Clone, Default)]
pub struct ChromaAccumulator {
    sum: [f64; PITCH_CLASSES],
    frames: usize,
}

impl ChromaAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize and add one frame
    pub fn push(&mut self, mut chroma: [f32; PITCH_CLASSES]) {
        if !normalize_max(&mut chroma) {
            return;
        }
        for (acc, c) in self.sum.iter_mut().zip(chroma.iter()) {
            *acc += *c as f64;
        }
        self.frames += 1;
    }

    /// Voiced frames accumulated so far
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Time-averaged chroma, or `None` if every frame was silent
    pub fn mean(&self) -> Option<[f32; PITCH_CLASSES]> {
        if self.frames == 0 {
            return None;
        }
        let mut mean = [0.0f32; PITCH_CLASSES];
        for (m, s) in mean.iter_mut().zip(self.sum.iter()) {
            *m = (*s / self.frames as f64) as f32;
        }
        Some(mean)
    }
}
