//! Text extraction from raw source files.

use anyhow::{Context, Result};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use crate::models::SourceKind;

/// Turns a raw source file into plain text.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, kind: SourceKind, path: &Path) -> Result<String>;
}

/// Extracts PDFs with `pdf-extract` and reads text files as UTF-8.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileExtractor;

impl TextExtractor for FileExtractor {
    fn extract(&self, kind: SourceKind, path: &Path) -> Result<String> {
        match kind {
            SourceKind::Pdf => extract_pdf(path),
            SourceKind::Text => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read text file: {}", path.display())),
        }
    }
}

/// Run `extractor`, turning a panic inside it into an error.
///
/// PDF parsing can panic on malformed input; a bad file must fail on its own
/// instead of taking the server down.
pub fn extract_guarded(extractor: &dyn TextExtractor, kind: SourceKind, path: &Path) -> Result<String> {
    catch_unwind(AssertUnwindSafe(|| extractor.extract(kind, path))).unwrap_or_else(|payload| {
        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        anyhow::bail!("Extractor panicked on {}: {msg}", path.display())
    })
}

fn extract_pdf(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read PDF: {}", path.display()))?;

    let text = pdf_extract::extract_text_from_mem(&bytes)
        .with_context(|| format!("Failed to extract text from PDF: {}", path.display()))?;

    if text.trim().is_empty() {
        tracing::warn!(
            "No text extracted from PDF: {}. It might be a scanned document.",
            path.display()
        );
    }

    // Page breaks come through as form feeds; treat them as plain whitespace.
    Ok(text.replace('\x0c', " "))
}
