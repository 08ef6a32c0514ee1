//! Example: Rank cached tracks by similarity to a reference track
//!
//! Usage:
//!   cargo run --release --example find_similar -- [--top N] [--cache DIR] <query> <candidate1> <candidate2> ...
//!
//! Only tracks already in the cache (see the analyze_batch example) are ranked.

use std::env;
use std::path::PathBuf;

use trackflow_dsp::{FingerprintCache, SimilarityRanker};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let mut top_n = 25usize;
    let mut cache_dir = env::temp_dir().join("trackflow-cache");
    let mut paths: Vec<PathBuf> = Vec::new();

    while let Some(a) = args.first().cloned() {
        args.remove(0);
        match a.as_str() {
            "--top" => {
                top_n = args.first().ok_or("--top requires a value")?.parse()?;
                args.remove(0);
            }
            "--cache" => {
                cache_dir = PathBuf::from(args.first().ok_or("--cache requires a directory")?);
                args.remove(0);
            }
            "--help" | "-h" => {
                eprintln!("Usage: find_similar [--top N] [--cache DIR] <query> <candidates...>");
                return Ok(());
            }
            _ => paths.push(PathBuf::from(a)),
        }
    }

    if paths.len() < 2 {
        eprintln!("ERROR: Provide a query and at least one candidate. Use --help for usage.");
        std::process::exit(2);
    }

    let query = paths.remove(0);
    let ranker = SimilarityRanker::new(FingerprintCache::open(&cache_dir)?);
    let results = ranker.find_similar(&query, &paths, top_n);

    if results.is_empty() {
        eprintln!("No cached feature vector for {} (or no cached candidates)", query.display());
        return Ok(());
    }

    println!("Most similar to {}:", query.display());
    for r in &results {
        println!(
            "{:>3}. {:<40} {:.4}  BPM={:<6} Key={}",
            r.rank,
            r.name,
            r.score,
            r.tempo
                .map(|t| format!("{:.1}", t))
                .unwrap_or_else(|| "--".to_string()),
            r.key
        );
    }

    Ok(())
}
