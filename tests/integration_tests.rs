//! Integration tests for the analysis engine, cache, batch coordinator and
//! similarity ranker, run against WAV files decoded through symphonia

use std::path::{Path, PathBuf};
use std::sync::Arc;

use trackflow_dsp::{
    analyze_file, AnalysisConfig, AnalysisError, BatchConfig, BatchCoordinator, FeatureExtractor,
    FingerprintCache, KeyConfidence, ResultSource, SimilarityRanker,
};

const SAMPLE_RATE: u32 = 22050;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Write mono samples as a 16-bit WAV with `channels` identical channels
fn write_wav(path: &Path, samples: &[f32], channels: u16) {
    let spec = hound::WavSpec {
        channels,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("create wav");
    for &s in samples {
        let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        for _ in 0..channels {
            writer.write_sample(v).expect("write sample");
        }
    }
    writer.finalize().expect("finalize wav");
}

/// Decaying 1 kHz clicks at the given tempo
fn click_track(bpm: f32, seconds: f32) -> Vec<f32> {
    let n = (SAMPLE_RATE as f32 * seconds) as usize;
    let period = (60.0 / bpm * SAMPLE_RATE as f32) as usize;
    let click_len = (0.02 * SAMPLE_RATE as f32) as usize;
    let mut samples = vec![0.0f32; n];
    let mut start = 0;
    while start < n {
        for i in 0..click_len.min(n - start) {
            let t = i as f32 / SAMPLE_RATE as f32;
            let decay = (-(i as f32) / (click_len as f32 / 4.0)).exp();
            samples[start + i] = 0.8 * decay * (2.0 * std::f32::consts::PI * 1000.0 * t).sin();
        }
        start += period;
    }
    samples
}

/// Sum of sinusoids `(frequency, amplitude)`
fn chord(partials: &[(f32, f32)], seconds: f32) -> Vec<f32> {
    let n = (SAMPLE_RATE as f32 * seconds) as usize;
    (0..n)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            partials
                .iter()
                .map(|&(f, a)| a * (2.0 * std::f32::consts::PI * f * t).sin())
                .sum::<f32>()
                * 0.3
        })
        .collect()
}

fn a_major(seconds: f32) -> Vec<f32> {
    chord(&[(220.0, 1.0), (277.18, 0.6), (329.63, 0.6)], seconds)
}

fn a_minor(seconds: f32) -> Vec<f32> {
    chord(&[(220.0, 1.0), (261.63, 0.6), (329.63, 0.6)], seconds)
}

fn write_library(dir: &Path) -> Vec<PathBuf> {
    let tracks: Vec<(&str, Vec<f32>)> = vec![
        ("major_1.wav", a_major(6.0)),
        ("major_2.wav", a_major(7.0)),
        ("clicks.wav", click_track(120.0, 8.0)),
        ("minor.wav", a_minor(6.0)),
    ];
    tracks
        .into_iter()
        .map(|(name, samples)| {
            let path = dir.join(name);
            write_wav(&path, &samples, 1);
            path
        })
        .collect()
}

#[test]
fn test_click_track_file() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clicks_120.wav");
    write_wav(&path, &click_track(120.0, 20.0), 2);

    let bundle = analyze_file(&path, AnalysisConfig::default()).expect("analysis should succeed");

    let tempo = bundle.tempo.expect("click track should have a tempo");
    assert!((tempo - 120.0).abs() < 3.0, "tempo should be close to 120, got {}", tempo);

    assert_eq!(bundle.filename, "clicks_120.wav");
    assert!(Path::new(&bundle.file_path).is_absolute());
    assert!((bundle.duration - 20.0).abs() < 0.1, "duration {}", bundle.duration);
    assert_eq!(bundle.audio_info.format, "WAV");
    assert_eq!(bundle.audio_info.sample_rate, SAMPLE_RATE);
    assert_eq!(bundle.audio_info.channels, 2);
    assert!(bundle.audio_info.bitrate > 0);
    assert!((1..=10).contains(&bundle.energy.level));
    assert!(bundle.energy.rms > 0.0);
    assert_eq!(bundle.feature_vector().map(|v| v.len()), Some(32));
}

#[test]
fn test_chord_file_key() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a_major.wav");
    write_wav(&path, &a_major(8.0), 1);

    let bundle = analyze_file(&path, AnalysisConfig::default()).unwrap();
    assert_eq!(bundle.key.notation, "A Major");
    assert_eq!(bundle.key.camelot, "11B");
    assert_eq!(bundle.key.open_key, "4d");
    assert_eq!(bundle.key.confidence, KeyConfidence::Medium);
}

#[test]
fn test_analysis_is_deterministic() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clicks.wav");
    write_wav(&path, &click_track(128.0, 10.0), 1);

    let extractor = FeatureExtractor::new(AnalysisConfig::default()).unwrap();
    let first = extractor.analyze(&path).unwrap();
    let second = extractor.analyze(&path).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_silent_file_uses_fallbacks() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("silence.wav");
    write_wav(&path, &vec![0.0f32; SAMPLE_RATE as usize * 3], 1);

    let bundle = analyze_file(&path, AnalysisConfig::default()).unwrap();
    assert!(bundle.tempo.is_none());
    assert_eq!(bundle.key.notation, "Unknown");
    assert_eq!(bundle.key.camelot, "N/A");
    assert_eq!(bundle.key.confidence, KeyConfidence::None);
    assert_eq!(bundle.energy.level, 1);
}

#[test]
fn test_energy_covers_audio_past_analysis_window() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("late_drop.wav");

    // Silent for the whole analysis window, loud for the 30 s after it
    let mut samples = vec![0.0f32; SAMPLE_RATE as usize * 60];
    samples.extend(chord(&[(220.0, 2.6)], 30.0));
    write_wav(&path, &samples, 1);

    let bundle = analyze_file(&path, AnalysisConfig::default()).unwrap();
    assert!((bundle.duration - 90.0).abs() < 0.1, "duration {}", bundle.duration);

    // Tempo and key only see the silent prefix
    assert!(bundle.tempo.is_none());
    assert_eq!(bundle.key.confidence, KeyConfidence::None);

    // 0.78 amplitude sine over a third of the file: rms ≈ 0.32
    assert!(bundle.energy.rms > 0.30, "rms {}", bundle.energy.rms);
    assert_eq!(bundle.energy.level, 10);
}

#[test]
fn test_unreadable_file_is_decoding_error() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.wav");
    std::fs::write(&path, b"this is a text file, not audio").unwrap();

    let err = analyze_file(&path, AnalysisConfig::default()).unwrap_err();
    assert!(matches!(err, AnalysisError::DecodingError(_)), "got {:?}", err);
}

#[test]
fn test_batch_then_similarity() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let mut paths = write_library(dir.path());
    let broken = dir.path().join("broken.wav");
    std::fs::write(&broken, b"garbage").unwrap();
    paths.push(broken.clone());

    let cache = FingerprintCache::open(dir.path().join("cache")).unwrap();
    let extractor = Arc::new(FeatureExtractor::new(AnalysisConfig::default()).unwrap());
    let coordinator =
        BatchCoordinator::new(cache.clone(), extractor, &BatchConfig::default()).unwrap();

    // First run: everything extracted, broken file reported, nothing dropped
    let stream = coordinator.analyze_all(&paths);
    assert_eq!(stream.cached(), 0);
    assert_eq!(stream.dispatched(), paths.len());
    let mut events: Vec<_> = stream.collect();
    events.sort_by_key(|e| e.index);
    assert_eq!(events.len(), paths.len());
    for event in &events {
        assert_eq!(event.source, ResultSource::Extraction);
        if event.path == broken {
            assert!(matches!(event.outcome, Err(AnalysisError::DecodingError(_))));
        } else {
            assert!(event.outcome.is_ok(), "{:?}", event.outcome);
        }
    }

    // Second run: every analyzed file is a cache hit
    let events: Vec<_> = coordinator.analyze_all(&paths).collect();
    assert_eq!(events.len(), paths.len());
    let hits: Vec<usize> = events
        .iter()
        .filter(|e| e.source == ResultSource::Cache)
        .map(|e| e.index)
        .collect();
    assert_eq!(hits, vec![0, 1, 2, 3]);
    assert_eq!(events[4].source, ResultSource::Extraction);

    // Similarity: the other A major rendering beats the click track
    let ranker = SimilarityRanker::new(cache);
    let results = ranker.find_similar(&paths[0], &paths, 10);
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.path != paths[0]));
    assert_eq!(results[0].path, paths[1]);
    assert_eq!(results[0].name, "major_2");
    assert_eq!(results[0].key, "11B");
    assert!(results[0].score > 0.99);
    let clicks = results.iter().find(|r| r.name == "clicks").unwrap();
    assert!(results[0].score > clicks.score);
    for (i, r) in results.iter().enumerate() {
        assert_eq!(r.rank, i + 1);
        assert!((0.0..=1.0).contains(&r.score));
    }
}

#[test]
fn test_modified_file_is_reanalyzed() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("track.wav");
    write_wav(&path, &a_major(4.0), 1);

    let cache = FingerprintCache::open(dir.path().join("cache")).unwrap();
    let extractor = Arc::new(FeatureExtractor::default());
    let coordinator = BatchCoordinator::new(cache.clone(), extractor, &BatchConfig::default()).unwrap();

    let first: Vec<_> = coordinator.analyze_all(&[&path]).collect();
    assert_eq!(first[0].source, ResultSource::Extraction);
    assert!(cache.contains(&path));

    // Rewrite with different content and length
    write_wav(&path, &a_minor(5.0), 1);
    assert!(!cache.contains(&path));

    let second: Vec<_> = coordinator.analyze_all(&[&path]).collect();
    assert_eq!(second[0].source, ResultSource::Extraction);
    let bundle = second[0].outcome.as_ref().unwrap();
    assert_eq!(bundle.key.notation, "A Minor");
}
