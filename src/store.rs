use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::{RagError, Result};
use crate::models::{Document, DocumentId, SourceTag};

/// On-disk shape of the document file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct DocumentFile {
    documents: Vec<Document>,
    #[serde(default)]
    next_id: u64,
}

/// Ordered document collection backed by a pretty-printed JSON file.
#[derive(Debug)]
pub struct DocumentStore {
    documents: Vec<Document>,
    next_id: u64,
    path: PathBuf,
}

impl DocumentStore {
    /// An empty store that will persist to `path`.
    pub fn empty(path: &Path) -> Self {
        Self {
            documents: Vec::new(),
            next_id: 0,
            path: path.to_path_buf(),
        }
    }

    /// Load documents from `path`.
    ///
    /// A missing or unreadable file yields an empty store; the failure is
    /// logged, never returned.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(store) => {
                tracing::info!(
                    "Loaded {} documents from {}",
                    store.documents.len(),
                    path.display()
                );
                store
            }
            Err(RagError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    "Document file not found at {}, starting with no documents",
                    path.display()
                );
                Self::empty(path)
            }
            Err(e) => {
                tracing::warn!("Error loading documents from {}: {e}", path.display());
                Self::empty(path)
            }
        }
    }

    fn try_load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let file: DocumentFile = serde_json::from_str(&data)
            .map_err(|e| RagError::StorageCorrupt(format!("{}: {e}", path.display())))?;

        let mut seen = BTreeSet::new();
        if let Some(dup) = file.documents.iter().find(|d| !seen.insert(d.id)) {
            return Err(RagError::StorageCorrupt(format!(
                "duplicate document id {}",
                dup.id
            )));
        }

        let high_water = file
            .documents
            .iter()
            .map(|d| d.id.0 + 1)
            .max()
            .unwrap_or(0);

        Ok(Self {
            next_id: file.next_id.max(high_water),
            documents: file.documents,
            path: path.to_path_buf(),
        })
    }

    /// Append a document and return its newly assigned id.
    pub fn add(&mut self, title: &str, content: &str, source: &str) -> DocumentId {
        let id = DocumentId(self.next_id);
        self.next_id += 1;
        self.documents.push(Document {
            id,
            title: title.to_string(),
            content: content.to_string(),
            source: source.to_string(),
        });
        id
    }

    /// Remove the document with `id`. Other ids are untouched.
    pub fn delete(&mut self, id: DocumentId) -> Result<Document> {
        let pos = self
            .documents
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| RagError::NotFound(format!("document {id}")))?;
        Ok(self.documents.remove(pos))
    }

    /// Remove every document matching `pred`, returning how many went.
    pub fn delete_where(&mut self, pred: impl Fn(&Document) -> bool) -> usize {
        let before = self.documents.len();
        self.documents.retain(|d| !pred(d));
        before - self.documents.len()
    }

    /// Overwrite the document file with the full collection (temp file + rename).
    pub fn persist(&self) -> Result<()> {
        let file = DocumentFile {
            documents: self.documents.clone(),
            next_id: self.next_id,
        };
        let data = serde_json::to_string_pretty(&file)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, data)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    pub fn get(&self, id: DocumentId) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// The id the next [`DocumentStore::add`] will assign.
    pub fn next_id(&self) -> DocumentId {
        DocumentId(self.next_id)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Filenames of ingested source files, taken from document source tags.
    pub fn ingested_files(&self) -> BTreeSet<String> {
        self.documents
            .iter()
            .filter_map(|d| SourceTag::parse(&d.source))
            .map(|tag| tag.filename)
            .collect()
    }

    /// Number of documents derived from the source file `filename`.
    pub fn chunk_count(&self, filename: &str) -> usize {
        self.documents
            .iter()
            .filter(|d| is_from_file(d, filename))
            .count()
    }
}

/// Whether `doc` was ingested from the raw source file `filename`.
pub fn is_from_file(doc: &Document, filename: &str) -> bool {
    SourceTag::parse(&doc.source).is_some_and(|tag| tag.filename == filename)
}

/// Documents written when a store is created for the first time.
pub fn sample_documents() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "About University",
            "The University is a prestigious institution founded in 1984. We offer a wide \
             range of academic programs across engineering, science, humanities, and \
             business. Our mission is to provide world-class education and foster innovation.",
        ),
        (
            "Admission Requirements",
            "To apply to the University, students need to submit academic transcripts, \
             standardized test scores (SAT/ACT), a personal statement, and letters of \
             recommendation. The application deadline is January 15 for fall admission.",
        ),
    ]
}

pub const SAMPLE_SOURCE: &str = "sample_data";
