//! Acoustic similarity over cached feature vectors
//!
//! Ranking reads only from the fingerprint cache; tracks that were never
//! analyzed are skipped, never extracted on demand.

pub mod cosine;
pub mod ranker;

pub use cosine::{cosine_similarity, display_score};
pub use ranker::{SimilarityRanker, SimilarityResult};
