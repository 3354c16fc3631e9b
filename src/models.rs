use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable document identifier. Assigned once, never reused after deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub u64);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A retrievable text record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub content: String,
    pub source: String,
}

/// A document paired with its similarity to a query
#[derive(Debug, Clone, Serialize)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f32,
}

/// Kind of raw source file that can be ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Pdf,
    Text,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Pdf => "pdf",
            SourceKind::Text => "text",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(SourceKind::Pdf),
            "txt" | "md" => Some(SourceKind::Text),
            _ => None,
        }
    }

    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        Self::from_extension(ext)
    }

    fn parse(kind: &str) -> Option<Self> {
        match kind {
            "pdf" => Some(SourceKind::Pdf),
            "text" => Some(SourceKind::Text),
            _ => None,
        }
    }
}

/// Parsed `<kind>:<filename>[:chunk<N>]` source tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTag {
    pub kind: SourceKind,
    pub filename: String,
    /// 1-based chunk number, if the tag names a single chunk.
    pub chunk: Option<usize>,
}

impl SourceTag {
    pub fn chunk(kind: SourceKind, filename: &str, chunk: usize) -> Self {
        Self {
            kind,
            filename: filename.to_string(),
            chunk: Some(chunk),
        }
    }

    /// Parse a source tag. Free-form tags such as `manual` return `None`.
    pub fn parse(tag: &str) -> Option<Self> {
        let (kind, rest) = tag.split_once(':')?;
        let kind = SourceKind::parse(kind)?;

        let (filename, chunk) = match rest.rsplit_once(':') {
            Some((name, suffix)) => match suffix
                .strip_prefix("chunk")
                .and_then(|n| n.parse::<usize>().ok())
            {
                Some(n) => (name, Some(n)),
                None => (rest, None),
            },
            None => (rest, None),
        };

        if filename.is_empty() {
            return None;
        }

        Some(Self {
            kind,
            filename: filename.to_string(),
            chunk,
        })
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.filename)?;
        if let Some(n) = self.chunk {
            write!(f, ":chunk{n}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Bot,
}

/// A single chat turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub sender: Sender,
    /// Rendered HTML for bot turns, plain text for user turns.
    pub text: String,
    /// Reply text as generated, bot turns only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            raw_text: None,
        }
    }

    pub fn bot(html: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            text: html.into(),
            raw_text: Some(raw.into()),
        }
    }

    /// Text to feed back into a prompt: the generated reply when available.
    pub fn context_text(&self) -> &str {
        self.raw_text.as_deref().unwrap_or(&self.text)
    }
}

/// Chat request
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: Option<Uuid>,
}

/// Chat response
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub bot_response: String,
    pub session_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionRequest {
    pub session_id: Uuid,
}

/// Add-document request
#[derive(Debug, Clone, Deserialize)]
pub struct AddDocumentRequest {
    pub title: String,
    pub content: String,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddDocumentResponse {
    pub id: DocumentId,
}

/// A raw source file in the ingestion directory
#[derive(Debug, Clone, Serialize)]
pub struct SourceFileInfo {
    pub filename: String,
    pub size_bytes: u64,
    pub chunk_count: usize,
}

/// Admin dashboard contents
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub documents: Vec<Document>,
    pub source_files: Vec<SourceFileInfo>,
    pub vector_rows: usize,
    pub vocabulary_size: usize,
}
