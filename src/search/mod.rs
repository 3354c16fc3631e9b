//! Retrieval: TF-IDF vectorization, the id-keyed vector index, and
//! cosine-similarity ranking.

pub mod archive;
pub mod similarity;
pub mod tfidf;
pub mod vector;

/// Default similarity threshold; results must score strictly above it.
pub const DEFAULT_MIN_SCORE: f32 = 0.1;

/// Default number of documents retrieved per query.
pub const DEFAULT_TOP_K: usize = 5;
