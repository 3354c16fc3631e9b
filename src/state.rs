use std::sync::Arc;

use crate::config::Config;
use crate::engine::RagEngine;
use crate::ingest::extract::{FileExtractor, TextExtractor};
use crate::llm::{Generator, HttpGenerator};
use crate::session::SessionStore;

/// Concurrent generator calls allowed at once.
const MAX_CONCURRENT_CHATS: usize = 3;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub engine: Arc<RagEngine>,
    pub sessions: Arc<SessionStore>,
    pub chat_semaphore: Arc<tokio::sync::Semaphore>,
}

impl AppState {
    /// Build the engine with the HTTP generator and file extractor.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let generator: Arc<dyn Generator> = Arc::new(HttpGenerator::new(config.llm.clone())?);
        Self::with_backends(config, generator, Arc::new(FileExtractor))
    }

    pub fn with_backends(
        config: Config,
        generator: Arc<dyn Generator>,
        extractor: Arc<dyn TextExtractor>,
    ) -> anyhow::Result<Self> {
        let engine = RagEngine::open(&config, generator, extractor)?;

        Ok(Self {
            config,
            engine: Arc::new(engine),
            sessions: Arc::new(SessionStore::new()),
            chat_semaphore: Arc::new(tokio::sync::Semaphore::new(MAX_CONCURRENT_CHATS)),
        })
    }
}
