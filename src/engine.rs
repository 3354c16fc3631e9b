//! The retrieval-augmented chat service.
//!
//! [`KnowledgeBase`] couples the document store with the vector index so
//! every mutation runs as one mutate, rebuild, persist sequence.
//! [`RagEngine`] wraps it in a lock and adds source-file handling and
//! response generation; one engine is built at startup and shared by all
//! request handlers.

use parking_lot::RwLock;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::chunking::ChunkConfig;
use crate::config::{Config, RetrievalConfig};
use crate::error::{RagError, Result};
use crate::ingest::extract::TextExtractor;
use crate::ingest::{self, IngestReport, PreparedSource, SourceFile};
use crate::llm::prompt;
use crate::llm::Generator;
use crate::models::{
    ConversationTurn, Dashboard, Document, DocumentId, ScoredDocument, Sender, SourceFileInfo,
};
use crate::search::vector::{IndexOrigin, VectorIndex};
use crate::store::{self, DocumentStore};

/// Documents plus the index built over them.
#[derive(Debug)]
pub struct KnowledgeBase {
    store: DocumentStore,
    index: VectorIndex,
    embeddings_path: PathBuf,
}

impl KnowledgeBase {
    /// Load documents and vectors from disk, seeding and ingesting as needed.
    ///
    /// Nothing here is fatal: unreadable files are logged and replaced by a
    /// rebuilt state.
    pub fn open(
        documents_path: &Path,
        embeddings_path: &Path,
        sources_dir: &Path,
        extractor: &dyn TextExtractor,
        chunking: ChunkConfig,
    ) -> Self {
        let seed = !documents_path.exists();
        let mut store = DocumentStore::load(documents_path);
        let mut changed = false;

        if seed {
            for (title, content) in store::sample_documents() {
                store.add(title, content, store::SAMPLE_SOURCE);
            }
            tracing::info!("Created sample data");
            changed = true;
        }

        let report = ingest::ingest_new_sources(&mut store, sources_dir, extractor, chunking);
        if report.chunks > 0 {
            changed = true;
        }

        let mut kb = if changed {
            let mut kb = Self {
                store,
                index: VectorIndex::new(),
                embeddings_path: embeddings_path.to_path_buf(),
            };
            if let Err(e) = kb.commit() {
                tracing::warn!("Failed to persist knowledge base: {e}");
            }
            kb
        } else {
            let (index, origin) = VectorIndex::load_or_rebuild(embeddings_path, store.documents());
            let kb = Self {
                store,
                index,
                embeddings_path: embeddings_path.to_path_buf(),
            };
            if origin == IndexOrigin::Rebuilt {
                if let Err(e) = kb.index.persist(&kb.embeddings_path) {
                    tracing::warn!("Failed to persist embeddings: {e}");
                }
            }
            kb
        };

        kb.check_consistency();
        kb
    }

    /// Rebuild the whole index over the current documents, then write both files.
    fn commit(&mut self) -> Result<()> {
        self.index.rebuild_all(self.store.documents())?;
        self.store.persist()?;
        self.index.persist(&self.embeddings_path)?;
        Ok(())
    }

    fn check_consistency(&mut self) {
        if self.index.row_count() != self.store.len() {
            tracing::warn!(
                "Index has {} rows for {} documents; rebuilding",
                self.index.row_count(),
                self.store.len()
            );
            if let Err(e) = self.commit() {
                tracing::warn!("Failed to persist knowledge base: {e}");
            }
        }
    }

    pub fn add_document(&mut self, title: &str, content: &str, source: &str) -> Result<DocumentId> {
        let id = self.store.add(title, content, source);
        self.commit()?;
        Ok(id)
    }

    pub fn delete_document(&mut self, id: DocumentId) -> Result<Document> {
        let removed = self.store.delete(id)?;
        self.commit()?;
        Ok(removed)
    }

    /// Add the chunks of one extracted file and commit.
    ///
    /// On a failed commit the new documents are taken out again, so the store
    /// never keeps chunks of a file that was not ingested.
    pub fn append_source(&mut self, file: &SourceFile, chunks: &[String]) -> Result<usize> {
        if self.store.chunk_count(&file.filename) > 0 {
            return Err(RagError::InvalidInput(format!(
                "source {} already exists; delete it first",
                file.filename
            )));
        }

        let added = ingest::append_chunks(&mut self.store, file, chunks);
        if let Err(e) = self.commit() {
            self.rollback(std::slice::from_ref(&file.filename));
            return Err(e);
        }
        Ok(added)
    }

    /// Add every prepared file whose name is still unknown, then commit once.
    pub fn append_prepared(&mut self, prepared: &[PreparedSource]) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        let mut added_files = Vec::new();

        for source in prepared {
            if self.store.chunk_count(&source.file.filename) > 0 {
                continue;
            }
            report.files += 1;
            report.chunks += ingest::append_chunks(&mut self.store, &source.file, &source.chunks);
            added_files.push(source.file.filename.clone());
        }

        if report.chunks > 0 {
            if let Err(e) = self.commit() {
                self.rollback(&added_files);
                return Err(e);
            }
        }
        Ok(report)
    }

    fn rollback(&mut self, filenames: &[String]) {
        let removed = self
            .store
            .delete_where(|d| filenames.iter().any(|f| store::is_from_file(d, f)));
        tracing::warn!("Rolled back {removed} documents after a failed commit");
        if let Err(e) = self.commit() {
            tracing::warn!("Failed to persist knowledge base after rollback: {e}");
        }
    }

    /// Remove every document derived from `filename`.
    pub fn remove_source_documents(&mut self, filename: &str) -> Result<usize> {
        let removed = self
            .store
            .delete_where(|d| store::is_from_file(d, filename));
        if removed > 0 {
            self.commit()?;
        }
        Ok(removed)
    }

    /// Ranked documents for `query`. An unfitted or empty index yields nothing.
    pub fn search(&self, query: &str, top_k: usize, min_score: f32) -> Vec<ScoredDocument> {
        let hits = match self.index.search(query, top_k, min_score) {
            Ok(hits) => hits,
            Err(RagError::DegenerateInput(reason)) => {
                tracing::debug!("Search skipped: {reason}");
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!("Search failed: {e}");
                return Vec::new();
            }
        };

        hits.into_iter()
            .filter_map(|hit| {
                self.store.get(hit.id).map(|doc| ScoredDocument {
                    document: doc.clone(),
                    score: hit.score,
                })
            })
            .collect()
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }
}

/// The process-wide chat service.
pub struct RagEngine {
    kb: RwLock<KnowledgeBase>,
    generator: Arc<dyn Generator>,
    extractor: Arc<dyn TextExtractor>,
    settings: RetrievalConfig,
    sources_dir: PathBuf,
}

/// Result of a source upload.
#[derive(Debug, Clone, serde::Serialize)]
pub struct UploadOutcome {
    pub filename: String,
    pub chunks: usize,
}

impl RagEngine {
    pub fn open(
        config: &Config,
        generator: Arc<dyn Generator>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Result<Self> {
        let chunking = config.retrieval.chunking();
        chunking.validate()?;

        std::fs::create_dir_all(&config.data_dir)?;
        std::fs::create_dir_all(config.sources_dir())?;

        let kb = KnowledgeBase::open(
            &config.documents_path(),
            &config.embeddings_path(),
            &config.sources_dir(),
            extractor.as_ref(),
            chunking,
        );

        Ok(Self {
            kb: RwLock::new(kb),
            generator,
            extractor,
            settings: config.retrieval.clone(),
            sources_dir: config.sources_dir(),
        })
    }

    /// Search with the configured `top_k` and `min_score`.
    pub fn search(&self, query: &str) -> Vec<ScoredDocument> {
        self.search_with(query, self.settings.top_k, self.settings.min_score)
    }

    pub fn search_with(&self, query: &str, top_k: usize, min_score: f32) -> Vec<ScoredDocument> {
        self.kb.read().search(query, top_k, min_score)
    }

    pub fn add_document(&self, title: &str, content: &str, source: &str) -> Result<DocumentId> {
        if title.trim().is_empty() || content.trim().is_empty() {
            return Err(RagError::InvalidInput(
                "title and content are required".to_string(),
            ));
        }
        let id = self.kb.write().add_document(title, content, source)?;
        tracing::info!("Added document {id}: {title}");
        Ok(id)
    }

    pub fn delete_document(&self, id: DocumentId) -> Result<Document> {
        let removed = self.kb.write().delete_document(id)?;
        tracing::info!("Deleted document {id}: {}", removed.title);
        Ok(removed)
    }

    /// Save an uploaded file into the sources directory and ingest it.
    ///
    /// Extraction and chunking run before the write lock is taken; the lock
    /// covers only the append, rebuild and persist.
    pub fn upload_source(&self, filename: &str, bytes: &[u8]) -> Result<UploadOutcome> {
        let (filename, kind) = ingest::sanitize_filename(filename)?;
        let path = self.sources_dir.join(&filename);

        let exists = || {
            RagError::InvalidInput(format!("source {filename} already exists; delete it first"))
        };
        if self.kb.read().store().chunk_count(&filename) > 0 {
            return Err(exists());
        }

        let mut out = match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(out) => out,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Err(exists()),
            Err(e) => return Err(e.into()),
        };
        if let Err(e) = out.write_all(bytes) {
            drop(out);
            let _ = std::fs::remove_file(&path);
            return Err(e.into());
        }
        drop(out);

        let file = SourceFile {
            filename: filename.clone(),
            kind,
            path: path.clone(),
            size_bytes: bytes.len() as u64,
        };

        let result = ingest::prepare_file(&file, self.extractor.as_ref(), self.settings.chunking())
            .map_err(|e| RagError::InvalidInput(format!("{e:#}")))
            .and_then(|chunks| {
                if chunks.is_empty() {
                    return Err(RagError::InvalidInput(format!(
                        "no text could be extracted from {filename}"
                    )));
                }
                self.kb.write().append_source(&file, &chunks)
            });

        match result {
            Ok(chunks) => {
                tracing::info!("Uploaded {filename} as {chunks} chunks");
                Ok(UploadOutcome { filename, chunks })
            }
            Err(e) => {
                if let Err(rm) = std::fs::remove_file(&path) {
                    tracing::warn!("Failed to remove rejected upload {filename}: {rm}");
                }
                Err(e)
            }
        }
    }

    /// Delete a source file and every document derived from it.
    pub fn delete_source(&self, filename: &str) -> Result<usize> {
        let (filename, _) = ingest::sanitize_filename(filename)?;
        let path = self.sources_dir.join(&filename);

        let mut kb = self.kb.write();
        let had_file = path.exists();
        if had_file {
            std::fs::remove_file(&path)?;
        }
        let removed = kb.remove_source_documents(&filename)?;

        if !had_file && removed == 0 {
            return Err(RagError::NotFound(format!("source {filename}")));
        }
        tracing::info!("Deleted source {filename} ({removed} documents)");
        Ok(removed)
    }

    /// Pick up files dropped into the sources directory since startup.
    ///
    /// Files are extracted under no lock; only the append and commit take
    /// the write lock.
    pub fn rescan_sources(&self) -> Result<IngestReport> {
        let known = self.kb.read().store().ingested_files();
        let prepared = ingest::prepare_new_sources(
            &known,
            &self.sources_dir,
            self.extractor.as_ref(),
            self.settings.chunking(),
        );
        if prepared.is_empty() {
            return Ok(IngestReport::default());
        }
        self.kb.write().append_prepared(&prepared)
    }

    pub fn dashboard(&self) -> Dashboard {
        let kb = self.kb.read();
        let source_files = ingest::list_source_files(&self.sources_dir)
            .into_iter()
            .map(|f| SourceFileInfo {
                chunk_count: kb.store().chunk_count(&f.filename),
                filename: f.filename,
                size_bytes: f.size_bytes,
            })
            .collect();

        Dashboard {
            documents: kb.store().documents().to_vec(),
            source_files,
            vector_rows: kb.index().row_count(),
            vocabulary_size: kb.index().vocabulary_size(),
        }
    }

    /// Retrieve context for `query` and assemble the prompt.
    ///
    /// When nothing matches and there is earlier conversation, the search is
    /// retried with the previous user question prepended.
    pub fn build_prompt(
        &self,
        query: &str,
        history: &[ConversationTurn],
    ) -> (String, Vec<ScoredDocument>) {
        let mut retrieved = self.search(query);

        if retrieved.is_empty() && history.len() >= 2 {
            if let Some(last) = history.iter().rev().find(|t| t.sender == Sender::User) {
                let combined = format!("{} {query}", last.text);
                retrieved = self.search(&combined);
            }
        }

        let prompt = prompt::compose(
            query,
            history,
            &retrieved,
            &self.settings.system_prompt,
            &self.settings.assistant_name,
        );
        (prompt, retrieved)
    }

    /// Retrieve, compose and call the generator.
    pub async fn answer(&self, query: &str, history: &[ConversationTurn]) -> Result<String> {
        let (prompt, retrieved) = self.build_prompt(query, history);
        tracing::info!(
            "Generating response with {} retrieved documents",
            retrieved.len()
        );

        self.generator
            .generate(&prompt)
            .await
            .map_err(|e| RagError::Generation(format!("{e:#}")))
    }

    /// Like [`RagEngine::answer`], but a failure comes back as the apology
    /// text instead of an error.
    pub async fn generate_response(&self, query: &str, history: &[ConversationTurn]) -> String {
        match self.answer(query, history).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Error generating response: {e}");
                apology(&e)
            }
        }
    }

    pub fn document_count(&self) -> usize {
        self.kb.read().store().len()
    }

    pub fn vector_rows(&self) -> usize {
        self.kb.read().index().row_count()
    }
}

/// User-facing text for a failed generation, carrying the raw error detail.
pub fn apology(err: &RagError) -> String {
    let detail = match err {
        RagError::Generation(detail) => detail.clone(),
        other => other.to_string(),
    };
    format!(
        "I'm having trouble connecting to my knowledge base. Please try again later. \
         Technical details: {detail}"
    )
}
