//! Feature extraction pipeline
//!
//! One streamed decode per file: every chunk feeds the whole-file energy
//! accumulator, and only the leading analysis window is kept in memory. One
//! STFT pass over that window then drives the onset envelope (tempo window),
//! the chroma accumulator and the MFCC accumulator (key window).
//!
//! Sub-analyses never fail the track. An undecided tempo is absent, an
//! undecided key is "Unknown", unmeasurable energy is mid-scale. Only a file
//! that cannot be opened as audio produces an error.

use std::ops::ControlFlow;
use std::path::Path;
use std::time::Instant;

use super::metadata::{AudioInfo, TrackMetadata};
use super::result::{DescriptorBundle, EnergyInfo, FeatureVector, KeyInfo};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::features::chroma::{ChromaAccumulator, ChromaMapper, PITCH_CLASSES};
use crate::features::energy::EnergyAccumulator;
use crate::features::key::{detect_key, KeyTemplates};
use crate::features::onset::OnsetStrength;
use crate::features::period::{estimate_tempo, TempoParams};
use crate::features::spectrum::StftProcessor;
use crate::features::timbre::{MfccAccumulator, MfccExtractor};
use crate::io::decoder::AudioSource;

/// Signal-derived descriptors, without any file pass-through
#[derive(Debug, Clone, PartialEq)]
pub struct AudioDescriptors {
    /// Tempo in BPM, one decimal place
    pub tempo: Option<f64>,
    /// Key descriptors
    pub key: KeyInfo,
    /// Energy descriptors
    pub energy: EnergyInfo,
    /// Similarity feature vector
    pub feature: Option<FeatureVector>,
}

/// Descriptors computed over the leading analysis window
struct WindowDescriptors {
    tempo: Option<f64>,
    key: KeyInfo,
    feature: Option<FeatureVector>,
}

impl WindowDescriptors {
    fn fallback() -> Self {
        Self {
            tempo: None,
            key: KeyInfo::unknown(),
            feature: None,
        }
    }
}

/// Analyze a complete in-memory signal
///
/// Energy covers every sample; tempo, key and the feature vector use the
/// configured leading windows.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for a zero sample rate or an invalid
/// configuration.
pub fn analyze_samples(
    samples: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> Result<AudioDescriptors, AnalysisError> {
    config.validate()?;
    if sample_rate == 0 {
        return Err(AnalysisError::InvalidInput("Invalid sample rate: 0".to_string()));
    }

    let mut energy = EnergyAccumulator::new();
    for chunk in samples.chunks(config.energy_chunk_frames) {
        energy.push(chunk);
    }

    let prefix_len = config.prefix_samples(sample_rate).min(samples.len());
    let window = analyze_window(&samples[..prefix_len], sample_rate, config)?;

    Ok(AudioDescriptors {
        tempo: window.tempo,
        key: window.key,
        energy: energy.finish(),
        feature: window.feature,
    })
}

fn analyze_window(
    samples: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> Result<WindowDescriptors, AnalysisError> {
    if samples.is_empty() {
        log::debug!("No samples in analysis window");
        return Ok(WindowDescriptors::fallback());
    }

    let tempo_len = window_len(config.tempo_window_secs, sample_rate).min(samples.len());
    let key_len = window_len(config.key_window_secs, sample_rate).min(samples.len());

    let mut stft = StftProcessor::new(config.frame_size, config.hop_size)?;
    let mapper = ChromaMapper::new(
        sample_rate,
        config.frame_size,
        config.chroma_min_freq,
        config.chroma_max_freq,
    );
    let mut mfcc = MfccExtractor::new(config.n_mels, sample_rate, config.frame_size)?;

    let mut onsets = OnsetStrength::new();
    let mut chroma = ChromaAccumulator::new();
    let mut timbre = MfccAccumulator::new();
    let hop = config.hop_size;

    stft.for_each_frame(samples, |idx, power| {
        let start = idx * hop;
        if start < tempo_len {
            onsets.push(power);
        }
        if start < key_len {
            chroma.push(mapper.frame_chroma(power));
            timbre.push(&mfcc.frame_mfcc(power));
        }
    });

    log::debug!(
        "Window analysis: {} onset frames, {} voiced chroma frames, {} MFCC frames",
        onsets.len(),
        chroma.frames(),
        timbre.frames()
    );

    let params = TempoParams::from(config);
    let tempo = match estimate_tempo(&onsets.into_envelope(), sample_rate, hop, &params) {
        Ok(Some(estimate)) => Some((estimate.bpm as f64 * 10.0).round() / 10.0),
        Ok(None) => None,
        Err(e) => {
            log::warn!("Tempo estimation failed, leaving tempo unset: {}", e);
            None
        }
    };

    let mean_chroma = chroma.mean();
    let key = mean_chroma
        .as_ref()
        .and_then(|c| detect_key(c, &KeyTemplates::new()))
        .map(|result| KeyInfo::detected(result.key))
        .unwrap_or_else(|| {
            log::debug!("No tonal content, key unknown");
            KeyInfo::unknown()
        });

    let feature = timbre.mean().map(|mfcc| FeatureVector {
        mfcc: mfcc.to_vec(),
        chroma: mean_chroma.unwrap_or([0.0; PITCH_CLASSES]).to_vec(),
    });

    Ok(WindowDescriptors {
        tempo,
        key,
        feature,
    })
}

fn window_len(secs: f32, sample_rate: u32) -> usize {
    (secs * sample_rate as f32).ceil() as usize
}

/// Something that turns an audio file into a descriptor bundle
///
/// The batch coordinator drives extraction through this trait, so it can run
/// against a stand-in in tests.
pub trait TrackAnalyzer: Send + Sync {
    /// Analyze one file
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::DecodingError`] if the file cannot be decoded.
    fn analyze(&self, path: &Path) -> Result<DescriptorBundle, AnalysisError>;
}

/// File-level extractor: decode, measure, describe
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    config: AnalysisConfig,
}

impl FeatureExtractor {
    /// Create an extractor with a validated configuration
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if the configuration is invalid.
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration in use
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze one audio file
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::DecodingError`] if the file cannot be opened
    /// or decoded. Every other failure degrades to a fallback value.
    pub fn analyze(&self, path: &Path) -> Result<DescriptorBundle, AnalysisError> {
        let start_time = Instant::now();
        let path = std::path::absolute(path).map_err(|e| {
            AnalysisError::DecodingError(format!("{}: cannot resolve path: {}", path.display(), e))
        })?;

        let file_size = std::fs::metadata(&path)
            .map_err(|e| {
                AnalysisError::DecodingError(format!("{}: cannot stat: {}", path.display(), e))
            })?
            .len();

        let mut source = AudioSource::open(&path)?;
        let sample_rate = source.sample_rate();
        let prefix_limit = self.config.prefix_samples(sample_rate);

        let mut prefix: Vec<f32> = Vec::with_capacity(prefix_limit.min(1 << 22));
        let mut energy = EnergyAccumulator::new();
        let frames = source.stream_chunks(self.config.energy_chunk_frames, |chunk| {
            energy.push(chunk);
            if prefix.len() < prefix_limit {
                let take = (prefix_limit - prefix.len()).min(chunk.len());
                prefix.extend_from_slice(&chunk[..take]);
            }
            ControlFlow::Continue(())
        })?;

        let window = analyze_window(&prefix, sample_rate, &self.config).unwrap_or_else(|e| {
            log::warn!("Window analysis failed for {}: {}", path.display(), e);
            WindowDescriptors::fallback()
        });

        let duration = if sample_rate > 0 {
            frames as f64 / sample_rate as f64
        } else {
            0.0
        };
        let metadata = TrackMetadata::from_reader(&source.tag_reader());
        let audio_info =
            AudioInfo::describe(&path, sample_rate, source.channels(), file_size, duration);

        let bundle = DescriptorBundle {
            file_path: path.to_string_lossy().into_owned(),
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            tempo: window.tempo,
            key: window.key,
            energy: energy.finish(),
            feature: window.feature,
            metadata,
            audio_info,
            duration: (duration * 100.0).round() / 100.0,
        };

        log::debug!(
            "Analyzed {} in {:.1} ms: tempo={:?}, key={}, energy={}",
            bundle.filename,
            start_time.elapsed().as_secs_f64() * 1000.0,
            bundle.tempo,
            bundle.key.notation,
            bundle.energy.level
        );

        Ok(bundle)
    }
}

impl TrackAnalyzer for FeatureExtractor {
    fn analyze(&self, path: &Path) -> Result<DescriptorBundle, AnalysisError> {
        FeatureExtractor::analyze(self, path)
    }
}
