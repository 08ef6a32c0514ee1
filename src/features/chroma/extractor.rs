//! Chroma vector extraction
//!
//! Converts a power spectrogram to 12-element chroma vectors by folding every
//! bin inside the configured frequency range onto its nearest pitch class.
//! Pitch class 0 is C.

use super::normalization::ChromaAccumulator;
use super::PITCH_CLASSES;
use crate::error::AnalysisError;
use crate::features::spectrum::{bin_frequency, StftProcessor};

/// Pitch class (0 = C) of the equal-tempered note nearest to `freq`
///
/// Uses A4 = 440 Hz = MIDI note 69.
pub fn pitch_class_of(freq: f32) -> usize {
    let midi = (69.0 + 12.0 * (freq / 440.0).log2()).round() as i32;
    midi.rem_euclid(PITCH_CLASSES as i32) as usize
}

/// Precomputed bin → pitch class map for one STFT geometry
#[derive(Debug, Clone)]
pub struct ChromaMapper {
    bin_classes: Vec<Option<u8>>,
}

impl ChromaMapper {
    /// Map bins of a `frame_size` FFT at `sample_rate` whose centre frequency
    /// lies in `[min_freq, max_freq]`
    pub fn new(sample_rate: u32, frame_size: usize, min_freq: f32, max_freq: f32) -> Self {
        let n_bins = frame_size / 2 + 1;
        let bin_classes = (0..n_bins)
            .map(|bin| {
                let freq = bin_frequency(bin, sample_rate, frame_size);
                if freq >= min_freq && freq <= max_freq {
                    Some(pitch_class_of(freq) as u8)
                } else {
                    None
                }
            })
            .collect();
        Self { bin_classes }
    }

    /// Number of bins folded into some pitch class
    pub fn active_bins(&self) -> usize {
        self.bin_classes.iter().filter(|c| c.is_some()).count()
    }

    /// Sum the power of one frame per pitch class (unnormalized)
    pub fn frame_chroma(&self, power: &[f32]) -> [f32; PITCH_CLASSES] {
        let mut chroma = [0.0f32; PITCH_CLASSES];
        for (class, &p) in self.bin_classes.iter().zip(power.iter()) {
            if let Some(pc) = class {
                chroma[*pc as usize] += p;
            }
        }
        chroma
    }
}

/// Extract the time-averaged chroma vector of a signal
///
/// # Arguments
///
/// * `samples` - Mono audio samples
/// * `sample_rate` - Sample rate in Hz
/// * `frame_size` - FFT frame size (default: 2048)
/// * `hop_size` - Hop size (default: 512)
/// * `min_freq`, `max_freq` - Frequency range folded into the chroma
///
/// # Returns
///
/// `Ok(None)` if no frame carries energy in the chroma range
pub fn extract_chroma(
    samples: &[f32],
    sample_rate: u32,
    frame_size: usize,
    hop_size: usize,
    min_freq: f32,
    max_freq: f32,
) -> Result<Option<[f32; PITCH_CLASSES]>, AnalysisError> {
    log::debug!(
        "Extracting chroma: {} samples at {} Hz, range [{:.1}, {:.1}] Hz",
        samples.len(),
        sample_rate,
        min_freq,
        max_freq
    );

    if sample_rate == 0 {
        return Err(AnalysisError::InvalidInput("Invalid sample rate: 0".to_string()));
    }

    let mut stft = StftProcessor::new(frame_size, hop_size)?;
    let mapper = ChromaMapper::new(sample_rate, frame_size, min_freq, max_freq);
    let mut accumulator = ChromaAccumulator::new();

    stft.for_each_frame(samples, |_, power| {
        accumulator.push(mapper.frame_chroma(power));
    });

    log::debug!(
        "Chroma: {} voiced frames over {} active bins",
        accumulator.frames(),
        mapper.active_bins()
    );
    Ok(accumulator.mean())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freqs: &[(f32, f32)], sample_rate: u32, seconds: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * seconds) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                freqs
                    .iter()
                    .map(|&(f, a)| a * (2.0 * std::f32::consts::PI * f * t).sin())
                    .sum::<f32>()
            })
            .collect()
    }

    #[test]
    fn test_pitch_class_of() {
        assert_eq!(pitch_class_of(440.0), 9); // A
        assert_eq!(pitch_class_of(261.63), 0); // C4
        assert_eq!(pitch_class_of(65.41), 0); // C2
        assert_eq!(pitch_class_of(277.18), 1); // C#4
        assert_eq!(pitch_class_of(329.63), 4); // E4
        assert_eq!(pitch_class_of(392.0), 7); // G4
        assert_eq!(pitch_class_of(880.0), 9);
    }

    #[test]
    fn test_mapper_respects_range() {
        let mapper = ChromaMapper::new(22050, 2048, 65.41, 2093.0);
        let mut power = vec![0.0f32; 1025];
        // Bin 0 (DC) and the top bin are outside the range
        power[0] = 10.0;
        power[1024] = 10.0;
        let chroma = mapper.frame_chroma(&power);
        assert!(chroma.iter().all(|&c| c == 0.0));
        assert!(mapper.active_bins() > 0);
    }

    #[test]
    fn test_a440_dominates_pitch_class_a() {
        let samples = tone(&[(440.0, 0.8)], 22050, 2.0);
        let chroma = extract_chroma(&samples, 22050, 2048, 512, 65.41, 2093.0)
            .unwrap()
            .expect("tone has chroma");

        let argmax = chroma
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(argmax, 9);
        assert!((chroma[9] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_silence_has_no_chroma() {
        let samples = vec![0.0f32; 22050];
        let chroma = extract_chroma(&samples, 22050, 2048, 512, 65.41, 2093.0).unwrap();
        assert!(chroma.is_none());
    }
}
