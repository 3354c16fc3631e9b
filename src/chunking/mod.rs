//! Text chunking: overlapping fixed-size word windows.

pub mod window;

use crate::error::{RagError, Result};

/// Window size and overlap, both measured in words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

impl ChunkConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        let config = Self {
            chunk_size,
            overlap,
        };
        config.validate()?;
        Ok(config)
    }

    /// The window must advance by at least one word per step.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 || self.chunk_size <= self.overlap {
            return Err(RagError::InvalidChunking {
                chunk_size: self.chunk_size,
                overlap: self.overlap,
            });
        }
        Ok(())
    }

    /// Number of words the window moves forward each step.
    pub fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

/// Split `text` into overlapping word windows.
pub fn chunk_text(text: &str, config: ChunkConfig) -> Result<Vec<String>> {
    config.validate()?;
    Ok(window::chunk_words(text, config.chunk_size, config.step()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_rejects_overlap_not_below_size() {
        assert!(ChunkConfig::new(10, 10).is_err());
        assert!(ChunkConfig::new(10, 20).is_err());
        assert!(ChunkConfig::new(0, 0).is_err());
    }

    #[test]
    fn test_config_allows_zero_overlap() {
        let config = ChunkConfig::new(5, 0).unwrap();
        assert_eq!(config.step(), 5);
    }

    #[test]
    fn test_default_config() {
        let config = ChunkConfig::default();
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.overlap, 200);
        assert_eq!(config.step(), 800);
    }

    #[test]
    fn test_chunk_text_guards_degenerate_config() {
        let bad = ChunkConfig {
            chunk_size: 3,
            overlap: 3,
        };
        let err = chunk_text("a b c d e f", bad).unwrap_err();
        assert!(matches!(
            err,
            RagError::InvalidChunking {
                chunk_size: 3,
                overlap: 3
            }
        ));
    }

    #[test]
    fn test_chunk_text_short_input_is_single_chunk() {
        let text = "  The application deadline\nis January 15.  ";
        let chunks = chunk_text(text, ChunkConfig::default()).unwrap();
        assert_eq!(chunks, vec![text.to_string()]);
    }
}
