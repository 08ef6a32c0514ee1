//! Example: Analyze many audio files through the descriptor cache
//!
//! Usage:
//!   cargo run --release --example analyze_batch -- [--jobs N] [--cache DIR] [--json] <file1> <file2> ...
//!
//! Notes:
//! - Files already analyzed (same path, mtime and size) are served from the cache first.
//! - Remaining files run on a fixed worker pool and report in completion order.
//! - Ctrl-C is not handled; a killed run keeps everything cached so far.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use trackflow_dsp::{
    AnalysisConfig, BatchConfig, BatchCoordinator, FeatureExtractor, FingerprintCache,
    ResultSource,
};

fn default_cache_dir() -> PathBuf {
    env::temp_dir().join("trackflow-cache")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();

    let mut json = false;
    let mut batch = BatchConfig::default();
    let mut cache_dir = default_cache_dir();
    let mut paths: Vec<PathBuf> = Vec::new();

    while let Some(a) = args.first().cloned() {
        args.remove(0);
        match a.as_str() {
            "--json" => json = true,
            "--jobs" => {
                let v = args
                    .first()
                    .ok_or("--jobs requires a value")?
                    .parse::<usize>()?;
                args.remove(0);
                batch.workers = std::cmp::max(1, v);
            }
            "--cache" => {
                cache_dir = PathBuf::from(args.first().ok_or("--cache requires a directory")?);
                args.remove(0);
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: analyze_batch [--jobs N] [--cache DIR] [--json] <file1> <file2> ...\n\
                     \n\
                     --jobs N     Parallel workers (default: 3)\n\
                     --cache DIR  Descriptor cache directory (default: $TMPDIR/trackflow-cache)\n\
                     --json       Emit one JSON object per line (JSONL)\n"
                );
                return Ok(());
            }
            _ => paths.push(PathBuf::from(a)),
        }
    }

    if paths.is_empty() {
        eprintln!("ERROR: Provide at least one audio file path. Use --help for usage.");
        std::process::exit(2);
    }

    let cache = FingerprintCache::open(&cache_dir)?;
    let extractor = Arc::new(FeatureExtractor::new(AnalysisConfig::default())?);
    let coordinator = BatchCoordinator::new(cache, extractor, &batch)?;

    let t0 = Instant::now();
    let stream = coordinator.analyze_all(&paths);
    let total = stream.total();
    eprintln!(
        "Batch: {} files, {} cached, {} to analyze, jobs={}",
        total,
        stream.cached(),
        stream.dispatched(),
        coordinator.workers()
    );

    let mut ok = 0usize;
    for (done, event) in stream.enumerate() {
        let source = match event.source {
            ResultSource::Cache => "cache",
            ResultSource::Extraction => "analyzed",
        };
        match &event.outcome {
            Ok(bundle) => {
                ok += 1;
                if json {
                    println!("{}", serde_json::to_string(bundle)?);
                } else {
                    println!(
                        "[{}/{}] {} ({}): BPM={} Key={} ({}) Energy={}",
                        done + 1,
                        total,
                        event.path.display(),
                        source,
                        bundle
                            .tempo
                            .map(|t| format!("{:.1}", t))
                            .unwrap_or_else(|| "--".to_string()),
                        bundle.key.notation,
                        bundle.key.camelot,
                        bundle.energy.level
                    );
                }
            }
            Err(e) => {
                if json {
                    println!(
                        "{{\"file\":{},\"error\":{}}}",
                        serde_json::to_string(&event.path.to_string_lossy())?,
                        serde_json::to_string(&e.to_string())?
                    );
                } else {
                    println!(
                        "[{}/{}] {}: ERROR: {}",
                        done + 1,
                        total,
                        event.path.display(),
                        e
                    );
                }
            }
        }
    }

    eprintln!(
        "Done: ok={}/{} wall={:.0}ms cache={}",
        ok,
        total,
        t0.elapsed().as_secs_f64() * 1000.0,
        cache_dir.display()
    );

    Ok(())
}
