//! Raw source ingestion: scan the sources directory, extract text from files
//! not yet represented in the store, and append one document per chunk.

pub mod extract;

use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::chunking::{chunk_text, ChunkConfig};
use crate::error::{RagError, Result};
use crate::models::{SourceKind, SourceTag};
use crate::store::DocumentStore;

use extract::TextExtractor;

/// A file in the sources directory
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub filename: String,
    pub kind: SourceKind,
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// What a scan added to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub files: usize,
    pub chunks: usize,
}

/// List ingestible files directly inside `dir`, sorted by filename.
pub fn list_source_files(dir: &Path) -> Vec<SourceFile> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let filename = entry.file_name().to_string_lossy().to_string();
        if filename.starts_with('.') {
            continue;
        }

        let Some(kind) = SourceKind::from_filename(&filename) else {
            continue;
        };

        let size_bytes = entry.metadata().map(|m| m.len()).unwrap_or(0);
        files.push(SourceFile {
            filename,
            kind,
            path: entry.path().to_path_buf(),
            size_bytes,
        });
    }

    files.sort_by(|a, b| a.filename.cmp(&b.filename));
    files
}

/// A source file extracted and chunked, not yet added to any store.
#[derive(Debug, Clone)]
pub struct PreparedSource {
    pub file: SourceFile,
    pub chunks: Vec<String>,
}

/// Extract and chunk every file in `dir` whose name is not in `known`.
///
/// Files already represented by a `<kind>:<filename>` tag are skipped, even
/// if their contents changed. Per-file failures and files without text are
/// logged and skipped. Touches no store, so it can run without any lock held.
pub fn prepare_new_sources(
    known: &BTreeSet<String>,
    dir: &Path,
    extractor: &dyn TextExtractor,
    chunking: ChunkConfig,
) -> Vec<PreparedSource> {
    let mut prepared = Vec::new();

    for file in list_source_files(dir) {
        if known.contains(&file.filename) {
            continue;
        }

        match prepare_file(&file, extractor, chunking) {
            Ok(chunks) if chunks.is_empty() => {}
            Ok(chunks) => prepared.push(PreparedSource { file, chunks }),
            Err(e) => {
                tracing::warn!("Error processing source {}: {e:#}", file.filename);
            }
        }
    }

    prepared
}

/// Chunk every unseen source file in `dir` straight into `store`.
pub fn ingest_new_sources(
    store: &mut DocumentStore,
    dir: &Path,
    extractor: &dyn TextExtractor,
    chunking: ChunkConfig,
) -> IngestReport {
    let prepared = prepare_new_sources(&store.ingested_files(), dir, extractor, chunking);
    let mut report = IngestReport::default();
    for source in &prepared {
        report.files += 1;
        report.chunks += append_chunks(store, &source.file, &source.chunks);
    }
    report
}

/// Extract and chunk one file. An empty result means it had no text.
pub fn prepare_file(
    file: &SourceFile,
    extractor: &dyn TextExtractor,
    chunking: ChunkConfig,
) -> anyhow::Result<Vec<String>> {
    let text = extract::extract_guarded(extractor, file.kind, &file.path)?;
    if text.trim().is_empty() {
        tracing::warn!("Source {} has no extractable text; skipping", file.filename);
        return Ok(Vec::new());
    }
    Ok(chunk_text(&text, chunking)?)
}

/// Append one document per chunk, tagged with the file and 1-based chunk
/// number. Returns the number of documents added.
pub fn append_chunks(store: &mut DocumentStore, file: &SourceFile, chunks: &[String]) -> usize {
    for (i, chunk) in chunks.iter().enumerate() {
        let n = i + 1;
        let title = format!("{} - Chunk {n}", file.filename);
        let tag = SourceTag::chunk(file.kind, &file.filename, n);
        store.add(&title, chunk, &tag.to_string());
    }
    tracing::info!("Processed {} into {} chunks", file.filename, chunks.len());
    chunks.len()
}

/// Reduce an uploaded filename to a safe basename with a supported extension.
pub fn sanitize_filename(name: &str) -> Result<(String, SourceKind)> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();

    if cleaned.is_empty() {
        return Err(RagError::InvalidInput(format!("invalid filename: {name:?}")));
    }

    match SourceKind::from_filename(&cleaned) {
        Some(kind) => Ok((cleaned, kind)),
        None => Err(RagError::InvalidInput(format!(
            "unsupported file type: {cleaned} (expected .pdf, .txt or .md)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Extractor that reads every file as text, whatever its extension.
    struct PlainExtractor;

    impl TextExtractor for PlainExtractor {
        fn extract(&self, _kind: SourceKind, path: &Path) -> anyhow::Result<String> {
            Ok(std::fs::read_to_string(path)?)
        }
    }

    fn small_chunks() -> ChunkConfig {
        ChunkConfig::new(4, 1).unwrap()
    }

    #[test]
    fn test_list_source_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.pdf"), b"x").unwrap();
        std::fs::write(dir.path().join("a.txt"), b"x").unwrap();
        std::fs::write(dir.path().join(".hidden.txt"), b"x").unwrap();
        std::fs::write(dir.path().join("image.png"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("c.txt"), b"x").unwrap();

        let names: Vec<String> = list_source_files(dir.path())
            .into_iter()
            .map(|f| f.filename)
            .collect();
        assert_eq!(names, vec!["a.txt", "b.pdf"]);
    }

    #[test]
    fn test_ingest_chunks_new_files_with_tags() {
        let dir = tempfile::tempdir().unwrap();
        let sources = dir.path().join("sources");
        std::fs::create_dir(&sources).unwrap();
        std::fs::write(sources.join("guide.pdf"), "one two three four five six seven").unwrap();

        let mut store = DocumentStore::empty(&dir.path().join("documents.json"));
        let report = ingest_new_sources(&mut store, &sources, &PlainExtractor, small_chunks());

        assert_eq!(report, IngestReport { files: 1, chunks: 3 });
        let docs = store.documents();
        assert_eq!(docs[0].title, "guide.pdf - Chunk 1");
        assert_eq!(docs[0].source, "pdf:guide.pdf:chunk1");
        assert_eq!(docs[0].content, "one two three four");
        assert_eq!(docs[1].content, "four five six seven");
        assert_eq!(docs[2].content, "seven");
    }

    #[test]
    fn test_ingest_skips_already_represented_files() {
        let dir = tempfile::tempdir().unwrap();
        let sources = dir.path().join("sources");
        std::fs::create_dir(&sources).unwrap();
        std::fs::write(sources.join("notes.txt"), "hello there").unwrap();

        let mut store = DocumentStore::empty(&dir.path().join("documents.json"));
        ingest_new_sources(&mut store, &sources, &PlainExtractor, small_chunks());
        std::fs::write(sources.join("notes.txt"), "changed content entirely now").unwrap();
        let report = ingest_new_sources(&mut store, &sources, &PlainExtractor, small_chunks());

        assert_eq!(report, IngestReport::default());
        assert_eq!(store.len(), 1);
        assert_eq!(store.documents()[0].content, "hello there");
    }

    #[test]
    fn test_ingest_skips_empty_text() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("blank.txt"), "   \n ").unwrap();

        let mut store = DocumentStore::empty(&dir.path().join("documents.json"));
        let report = ingest_new_sources(&mut store, dir.path(), &PlainExtractor, small_chunks());
        assert_eq!(report.files, 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_panicking_extractor_skips_only_that_file() {
        struct FussyExtractor;

        impl TextExtractor for FussyExtractor {
            fn extract(&self, kind: SourceKind, path: &Path) -> anyhow::Result<String> {
                if kind == SourceKind::Pdf {
                    panic!("malformed object stream");
                }
                Ok(std::fs::read_to_string(path)?)
            }
        }

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.pdf"), "whatever").unwrap();
        std::fs::write(dir.path().join("good.txt"), "library hours").unwrap();

        let mut store = DocumentStore::empty(&dir.path().join("documents.json"));
        let report = ingest_new_sources(&mut store, dir.path(), &FussyExtractor, small_chunks());
        assert_eq!(report, IngestReport { files: 1, chunks: 1 });
        assert_eq!(store.documents()[0].source, "text:good.txt:chunk1");
    }

    #[test]
    fn test_prepare_new_sources_leaves_store_alone() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "one two three four five").unwrap();
        std::fs::write(dir.path().join("b.txt"), "known already").unwrap();

        let known = BTreeSet::from(["b.txt".to_string()]);
        let prepared = prepare_new_sources(&known, dir.path(), &PlainExtractor, small_chunks());
        assert_eq!(prepared.len(), 1);
        assert_eq!(prepared[0].file.filename, "a.txt");
        assert_eq!(prepared[0].chunks, vec!["one two three four", "four five"]);
    }

    #[test]
    fn test_ingest_missing_dir_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DocumentStore::empty(&dir.path().join("documents.json"));
        let report = ingest_new_sources(
            &mut store,
            &dir.path().join("absent"),
            &PlainExtractor,
            small_chunks(),
        );
        assert_eq!(report, IngestReport::default());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(
            sanitize_filename("../../etc/Student Guide.pdf").unwrap(),
            ("Student_Guide.pdf".to_string(), SourceKind::Pdf)
        );
        assert_eq!(
            sanitize_filename("..hidden.txt").unwrap().0,
            "hidden.txt".to_string()
        );
        assert!(sanitize_filename("payload.exe").is_err());
        assert!(sanitize_filename("../..").is_err());
        assert!(sanitize_filename("").is_err());
    }
}
