//! Top-N similarity search

use std::path::{Path, PathBuf};

use super::cosine::{cosine_similarity, display_score};
use crate::cache::FingerprintCache;

/// Placeholder shown when a candidate has no detected key
const NO_KEY: &str = "--";

/// One ranked candidate
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityResult {
    /// Candidate path as given
    pub path: PathBuf,
    /// File stem, for display
    pub name: String,
    /// Similarity in [0, 1], four decimals
    pub score: f64,
    /// 1-based position in the result list
    pub rank: usize,
    /// Cached tempo
    pub tempo: Option<f64>,
    /// Cached Camelot key, `"--"` when unknown
    pub key: String,
}

/// Ranks candidates by cosine similarity of their cached feature vectors
#[derive(Debug, Clone)]
pub struct SimilarityRanker {
    cache: FingerprintCache,
}

impl SimilarityRanker {
    /// Rank against records in `cache`
    pub fn new(cache: FingerprintCache) -> Self {
        Self { cache }
    }

    /// The `top_n` candidates most similar to `query`, best first
    ///
    /// Returns an empty list if the query has no cached vector. The query
    /// itself and candidates without a well-formed cached vector are skipped.
    /// Equal scores keep candidate order.
    pub fn find_similar<P: AsRef<Path>>(
        &self,
        query: &Path,
        candidates: &[P],
        top_n: usize,
    ) -> Vec<SimilarityResult> {
        let Some(query_vector) = self.cache.get(query).and_then(|b| b.feature_vector()) else {
            log::debug!("No cached feature vector for query {}", query.display());
            return Vec::new();
        };

        let mut skipped = 0usize;
        let mut results: Vec<SimilarityResult> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let candidate = candidate.as_ref();
            if candidate == query {
                continue;
            }
            let Some(bundle) = self.cache.get(candidate) else {
                skipped += 1;
                continue;
            };
            let Some(vector) = bundle.feature_vector() else {
                skipped += 1;
                continue;
            };

            let camelot = match bundle.key.key() {
                Some(_) => bundle.key.camelot.clone(),
                None => NO_KEY.to_string(),
            };
            results.push(SimilarityResult {
                path: candidate.to_path_buf(),
                name: candidate
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                score: display_score(cosine_similarity(&query_vector, &vector)),
                rank: 0,
                tempo: bundle.tempo,
                key: camelot,
            });
        }

        // Stable: ties keep candidate order
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_n);
        for (i, result) in results.iter_mut().enumerate() {
            result.rank = i + 1;
        }

        log::debug!(
            "Similarity for {}: {} ranked, {} skipped without vectors",
            query.display(),
            results.len(),
            skipped
        );
        results
    }
}
