//! Example: Analyze a single audio file
//!
//! Usage:
//!   cargo run --release --example analyze_file -- [--json] [--config config.json] <file>

use std::env;
use std::path::PathBuf;

use trackflow_dsp::{AnalysisConfig, FeatureExtractor};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let mut json = false;
    let mut config = AnalysisConfig::default();
    let mut path: Option<PathBuf> = None;

    while let Some(a) = args.first().cloned() {
        args.remove(0);
        match a.as_str() {
            "--json" => json = true,
            "--config" => {
                let file = args.first().ok_or("--config requires a path")?.clone();
                args.remove(0);
                config = AnalysisConfig::from_json_file(&file)?;
            }
            "--help" | "-h" => {
                eprintln!("Usage: analyze_file [--json] [--config config.json] <file>");
                return Ok(());
            }
            _ => path = Some(PathBuf::from(a)),
        }
    }

    let Some(path) = path else {
        eprintln!("ERROR: Provide an audio file path. Use --help for usage.");
        std::process::exit(2);
    };

    let extractor = FeatureExtractor::new(config)?;
    let bundle = extractor.analyze(&path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&bundle)?);
        return Ok(());
    }

    println!("Analysis Results: {}", bundle.filename);
    match bundle.tempo {
        Some(bpm) => println!("  Tempo: {:.1} BPM", bpm),
        None => println!("  Tempo: --"),
    }
    println!(
        "  Key: {} ({} / {}, confidence: {:?})",
        bundle.key.notation, bundle.key.camelot, bundle.key.open_key, bundle.key.confidence
    );
    println!(
        "  Energy: {} - {} (rms {:.4})",
        bundle.energy.level, bundle.energy.description, bundle.energy.rms
    );
    println!(
        "  Audio: {} {} Hz, {} ch, {:.2} s, {:.2} MB",
        bundle.audio_info.format,
        bundle.audio_info.sample_rate,
        bundle.audio_info.channels,
        bundle.duration,
        bundle.audio_info.file_size_mb
    );
    if !bundle.metadata.artist.is_empty() || !bundle.metadata.title.is_empty() {
        println!("  Tags: {} - {}", bundle.metadata.artist, bundle.metadata.title);
    }

    Ok(())
}
