use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{RagError, Result};
use crate::models::{Document, DocumentId};
use crate::search::archive::{self, StoredEmbeddings};
use crate::search::similarity::{cosine_similarity, rank_then_filter};
use crate::search::tfidf::TfidfVectorizer;

/// Dense TF-IDF rows keyed by document id, plus the model that produced them.
///
/// The only way to change the rows is [`VectorIndex::rebuild_all`]; there is
/// no incremental add.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    vectorizer: TfidfVectorizer,
    rows: BTreeMap<DocumentId, Vec<f32>>,
}

/// How [`VectorIndex::load_or_rebuild`] obtained its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOrigin {
    Loaded,
    Rebuilt,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorHit {
    pub id: DocumentId,
    pub score: f32,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-fit the vectorizer only, leaving the rows alone.
    pub fn fit(&mut self, documents: &[Document]) {
        if documents.is_empty() {
            self.vectorizer = TfidfVectorizer::new();
            return;
        }
        let texts: Vec<&str> = documents.iter().map(|d| d.content.as_str()).collect();
        self.vectorizer.fit(&texts);
    }

    /// Re-fit and re-embed every document from scratch.
    pub fn rebuild_all(&mut self, documents: &[Document]) -> Result<&BTreeMap<DocumentId, Vec<f32>>> {
        self.rows.clear();
        self.fit(documents);

        for doc in documents {
            let row = self.vectorizer.transform(&doc.content)?;
            self.rows.insert(doc.id, row);
        }

        tracing::info!(
            "Rebuilt vector index: {} rows x {} terms",
            self.rows.len(),
            self.vectorizer.vocabulary_size()
        );
        Ok(&self.rows)
    }

    /// Load persisted rows if they still describe `documents`, otherwise rebuild.
    ///
    /// The vectorizer is re-fitted from document texts either way, so query
    /// embeddings stay consistent with the rows.
    pub fn load_or_rebuild(path: &Path, documents: &[Document]) -> (Self, IndexOrigin) {
        let mut index = Self::new();

        if documents.is_empty() || !path.exists() {
            index.rebuild_or_warn(documents);
            return (index, IndexOrigin::Rebuilt);
        }

        match archive::read_embeddings(path).and_then(|stored| index.adopt(stored, documents)) {
            Ok(()) => {
                tracing::info!(
                    "Loaded embeddings with shape [{}, {}]",
                    index.row_count(),
                    index.vocabulary_size()
                );
                (index, IndexOrigin::Loaded)
            }
            Err(e) => {
                tracing::warn!("Stored embeddings unusable ({e}); recreating");
                index.rebuild_or_warn(documents);
                (index, IndexOrigin::Rebuilt)
            }
        }
    }

    fn rebuild_or_warn(&mut self, documents: &[Document]) {
        if let Err(e) = self.rebuild_all(documents) {
            tracing::warn!("Vector index rebuild failed: {e}");
        }
    }

    fn adopt(&mut self, stored: StoredEmbeddings, documents: &[Document]) -> Result<()> {
        if stored.ids.len() != documents.len() {
            return Err(RagError::StorageCorrupt(format!(
                "{} stored rows for {} documents",
                stored.ids.len(),
                documents.len()
            )));
        }
        if stored.ids.iter().zip(documents).any(|(id, doc)| *id != doc.id) {
            return Err(RagError::StorageCorrupt(
                "stored row ids do not match document ids".to_string(),
            ));
        }

        self.fit(documents);
        if stored.cols != self.vectorizer.vocabulary_size() {
            return Err(RagError::StorageCorrupt(format!(
                "stored rows have {} columns, vocabulary has {}",
                stored.cols,
                self.vectorizer.vocabulary_size()
            )));
        }

        self.rows = stored
            .rows()
            .map(|(id, row)| (id, row.to_vec()))
            .collect();
        Ok(())
    }

    /// Write the rows to a binary archive at `path`.
    pub fn persist(&self, path: &Path) -> Result<()> {
        archive::write_embeddings(
            path,
            self.vectorizer.vocabulary_size(),
            self.rows.iter().map(|(id, row)| (*id, row.as_slice())),
        )
    }

    /// Project a query into the fitted space.
    pub fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.vectorizer.transform(text)
    }

    /// Rank every row against `query`: top `top_k` by score, then keep
    /// scores above `min_score`.
    pub fn search(&self, query: &str, top_k: usize, min_score: f32) -> Result<Vec<VectorHit>> {
        if self.rows.is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = self.embed_query(query)?;
        let scored = self
            .rows
            .iter()
            .map(|(id, row)| (*id, cosine_similarity(&query_vec, row)));

        Ok(rank_then_filter(scored, top_k, min_score)
            .into_iter()
            .map(|(id, score)| VectorHit { id, score })
            .collect())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vectorizer.vocabulary_size()
    }

    pub fn is_fitted(&self) -> bool {
        self.vectorizer.is_fitted()
    }

    pub fn contains(&self, id: DocumentId) -> bool {
        self.rows.contains_key(&id)
    }

    pub fn row(&self, id: DocumentId) -> Option<&[f32]> {
        self.rows.get(&id).map(Vec::as_slice)
    }
}
