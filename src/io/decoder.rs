//! Audio decoding using Symphonia
//!
//! [`AudioSource`] probes a file, selects the first decodable track and
//! streams it as mono `f32` chunks of a fixed size, so callers can process
//! arbitrarily long tracks in bounded memory.

use std::fs::File;
use std::io::ErrorKind;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use symphonia::core::audio::SampleBuffer as PcmBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::{MetadataOptions, MetadataRevision};
use symphonia::core::probe::Hint;

use super::sample_buffer::SampleBuffer;
use super::tags::{RawTag, SymphoniaTags, TagFormat};
use crate::error::AnalysisError;
use crate::preprocessing::channel_mixer::downmix_into;

/// Mono PCM decoded from a file
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Mono samples, normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count of the source before downmixing
    pub channels: usize,
}

/// An opened, probed audio file ready to be streamed
pub struct AudioSource {
    path: PathBuf,
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: usize,
    tags: Vec<RawTag>,
}

impl std::fmt::Debug for AudioSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioSource")
            .field("path", &self.path)
            .field("track_id", &self.track_id)
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}

impl AudioSource {
    /// Open and probe an audio file
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::DecodingError`] if the file cannot be opened,
    /// its container is not recognized, it has no decodable track, or no
    /// decoder exists for its codec.
    pub fn open(path: &Path) -> Result<Self, AnalysisError> {
        log::debug!("Opening audio file: {}", path.display());

        let file = File::open(path).map_err(|e| {
            AnalysisError::DecodingError(format!("{}: cannot open: {}", path.display(), e))
        })?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let mut probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| decode_error(path, "unrecognized format", &e))?;

        let mut tags = Vec::new();
        if let Some(metadata) = probed.metadata.get() {
            if let Some(revision) = metadata.current() {
                collect_tags(revision, &mut tags);
            }
        }

        let mut format = probed.format;
        {
            let container = format.metadata();
            if let Some(revision) = container.current() {
                collect_tags(revision, &mut tags);
            }
        }

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| {
                AnalysisError::DecodingError(format!(
                    "{}: no supported audio tracks found",
                    path.display()
                ))
            })?;

        let track_id = track.id;
        let params = track.codec_params.clone();

        let sample_rate = params.sample_rate.ok_or_else(|| {
            AnalysisError::DecodingError(format!(
                "{}: sample rate not specified",
                path.display()
            ))
        })?;
        let channels = params.channels.map(|c| c.count()).unwrap_or(0);

        let decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| decode_error(path, "unsupported codec", &e))?;

        log::debug!(
            "Opened {}: track {}, {} Hz, {} channel(s), {} tag(s)",
            path.display(),
            track_id,
            sample_rate,
            channels,
            tags.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            format,
            decoder,
            track_id,
            sample_rate,
            channels,
            tags,
        })
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count of the source (0 until known for some containers)
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Tags read while probing, wrapped in the reader for this file's format
    pub fn tag_reader(&self) -> SymphoniaTags {
        let format = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(TagFormat::from_extension)
            .unwrap_or(TagFormat::Unknown);
        SymphoniaTags::new(format, self.tags.clone())
    }

    /// Decode the whole track, handing mono windows of `chunk_frames` to `sink`
    ///
    /// The final window may be shorter. Corrupt packets are skipped. Decoding
    /// stops early when `sink` returns [`ControlFlow::Break`].
    ///
    /// # Returns
    ///
    /// Number of mono frames decoded
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::DecodingError`] if the stream fails before a
    /// single frame could be decoded. Failures after that point end the
    /// stream with a warning.
    pub fn stream_chunks<F>(&mut self, chunk_frames: usize, mut sink: F) -> Result<u64, AnalysisError>
    where
        F: FnMut(&[f32]) -> ControlFlow<()>,
    {
        if chunk_frames == 0 {
            return Err(AnalysisError::InvalidInput(
                "Chunk size must be > 0".to_string(),
            ));
        }

        let mut window = SampleBuffer::new(chunk_frames * 2);
        let mut pcm: Option<PcmBuffer<f32>> = None;
        let mut mono = Vec::new();
        let mut frames: u64 = 0;

        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => {
                    if frames == 0 {
                        return Err(decode_error(&self.path, "cannot read packets", &e));
                    }
                    log::warn!(
                        "Stopping decode of {} after {} frames: {}",
                        self.path.display(),
                        frames,
                        e
                    );
                    break;
                }
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(msg)) => {
                    log::debug!("Skipping corrupt packet in {}: {}", self.path.display(), msg);
                    continue;
                }
                Err(e) => {
                    if frames == 0 {
                        return Err(decode_error(&self.path, "decoder failed", &e));
                    }
                    log::warn!(
                        "Stopping decode of {} after {} frames: {}",
                        self.path.display(),
                        frames,
                        e
                    );
                    break;
                }
            };

            let spec = *decoded.spec();
            let channels = spec.channels.count();
            let needed = decoded.capacity() * channels;
            if pcm.as_ref().map_or(true, |buf| buf.capacity() < needed) {
                pcm = Some(PcmBuffer::new(decoded.capacity() as u64, spec));
            }
            let Some(buf) = pcm.as_mut() else {
                continue;
            };
            buf.copy_interleaved_ref(decoded);
            self.channels = channels;

            mono.clear();
            downmix_into(buf.samples(), channels, &mut mono);
            frames += mono.len() as u64;

            window.push(&mono);
            while let Some(chunk) = window.next_window(chunk_frames) {
                if sink(chunk).is_break() {
                    return Ok(frames);
                }
            }
        }

        if let Some(rest) = window.take_remainder() {
            let _ = sink(&rest);
        }

        log::debug!("Decoded {} frames from {}", frames, self.path.display());
        Ok(frames)
    }
}

/// Decode audio file to mono PCM samples
///
/// # Arguments
///
/// * `path` - Path to audio file
/// * `max_seconds` - Stop after this many seconds (`None` decodes everything)
///
/// # Errors
///
/// Returns [`AnalysisError::DecodingError`] if the file cannot be decoded
pub fn decode_audio(path: &Path, max_seconds: Option<f32>) -> Result<DecodedAudio, AnalysisError> {
    let mut source = AudioSource::open(path)?;
    let sample_rate = source.sample_rate();
    let limit = max_seconds
        .map(|secs| (secs.max(0.0) * sample_rate as f32).ceil() as usize)
        .unwrap_or(usize::MAX);

    let mut samples = Vec::new();
    source.stream_chunks(8192, |chunk| {
        let room = limit - samples.len();
        samples.extend_from_slice(&chunk[..chunk.len().min(room)]);
        if samples.len() >= limit {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    })?;

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels: source.channels(),
    })
}

fn collect_tags(revision: &MetadataRevision, out: &mut Vec<RawTag>) {
    out.extend(revision.tags().iter().map(|tag| RawTag {
        std_key: tag.std_key,
        key: tag.key.clone(),
        value: tag.value.to_string(),
    }));
}

fn decode_error(path: &Path, context: &str, err: &SymphoniaError) -> AnalysisError {
    AnalysisError::DecodingError(format!("{}: {}: {}", path.display(), context, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_decoding_error() {
        let err = AudioSource::open(Path::new("/definitely/not/here.wav")).unwrap_err();
        assert!(matches!(err, AnalysisError::DecodingError(_)));
    }

    #[test]
    fn test_non_audio_file_is_decoding_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.wav");
        std::fs::write(&path, b"this is not audio at all").unwrap();

        let err = decode_audio(&path, None).unwrap_err();
        assert!(matches!(err, AnalysisError::DecodingError(_)));
    }

    fn write_stereo_wav(path: &Path, sample_rate: u32, frames: usize) {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..frames {
            // Left and right average to 0.25 full scale
            writer.write_sample(i16::MAX / 2).unwrap();
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_decode_audio_downmixes_and_caps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_stereo_wav(&path, 8000, 8000 * 3);

        let full = decode_audio(&path, None).unwrap();
        assert_eq!(full.sample_rate, 8000);
        assert_eq!(full.channels, 2);
        assert_eq!(full.samples.len(), 8000 * 3);
        assert!(full.samples.iter().all(|&s| (s - 0.25).abs() < 1e-3));

        let prefix = decode_audio(&path, Some(1.5)).unwrap();
        assert_eq!(prefix.samples.len(), 12000);
        assert_eq!(prefix.samples[..], full.samples[..12000]);
    }
}
