use thiserror::Error;

/// Failures surfaced by the retrieval core.
///
/// Every variant is recoverable at the HTTP boundary: storage corruption is
/// healed by a rebuild, degenerate input yields empty results, and generation
/// failures turn into an apology message.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage corrupt: {0}")]
    StorageCorrupt(String),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    #[error("chunk_size ({chunk_size}) must be non-zero and greater than overlap ({overlap})")]
    InvalidChunking { chunk_size: usize, overlap: usize },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("vector archive: {0}")]
    Archive(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, RagError>;
