use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::chunking::ChunkConfig;
use crate::search::{DEFAULT_MIN_SCORE, DEFAULT_TOP_K};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where documents, raw sources and embeddings are stored
    pub data_dir: PathBuf,
    /// Server bind address
    pub bind_addr: String,
    /// LLM provider configuration
    pub llm: LlmConfig,
    /// Retrieval and prompt settings
    pub retrieval: RetrievalConfig,
    /// Admin credentials; admin routes are disabled when unset
    pub admin: Option<AdminCredentials>,
    /// Maximum accepted chat message length in bytes
    pub max_message_len: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Words per chunk when splitting raw sources
    pub chunk_size: usize,
    /// Words shared by consecutive chunks
    pub chunk_overlap: usize,
    /// Documents retrieved per query
    pub top_k: usize,
    /// Results must score strictly above this
    pub min_score: f32,
    /// Label used for bot turns in the prompt
    pub assistant_name: String,
    /// Instruction placed at the top of every prompt
    pub system_prompt: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        let chunking = ChunkConfig::default();
        Self {
            chunk_size: chunking.chunk_size,
            chunk_overlap: chunking.overlap,
            top_k: DEFAULT_TOP_K,
            min_score: DEFAULT_MIN_SCORE,
            assistant_name: "Assistant".to_string(),
            system_prompt: "You are a helpful University Assistant. Answer university-related \
                            questions based on the provided context. Answer in plain text \
                            without markup."
                .to_string(),
        }
    }
}

impl RetrievalConfig {
    pub fn chunking(&self) -> ChunkConfig {
        ChunkConfig {
            chunk_size: self.chunk_size,
            overlap: self.chunk_overlap,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "ollama", "openai" or "gemini"
    pub provider: String,
    /// Base URL for the LLM API
    pub base_url: String,
    /// Model name for generation
    pub chat_model: String,
    /// API key (only needed for cloud providers)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            chat_model: "llama3.2".to_string(),
            api_key: None,
            timeout_secs: 120,
        }
    }
}

/// Admin username plus the hex SHA-256 of the password.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminCredentials {
    pub username: String,
    #[serde(skip_serializing)]
    pub password_sha256: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            bind_addr: "127.0.0.1:9000".to_string(),
            llm: LlmConfig::default(),
            retrieval: RetrievalConfig::default(),
            admin: None,
            max_message_len: 2000,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("RAG_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(addr) = std::env::var("RAG_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(val) = std::env::var("RAG_MAX_MESSAGE_LEN") {
            if let Ok(v) = val.parse() {
                config.max_message_len = v;
            }
        }

        // Retrieval
        if let Ok(val) = std::env::var("RAG_CHUNK_SIZE") {
            if let Ok(v) = val.parse() {
                config.retrieval.chunk_size = v;
            }
        }
        if let Ok(val) = std::env::var("RAG_CHUNK_OVERLAP") {
            if let Ok(v) = val.parse() {
                config.retrieval.chunk_overlap = v;
            }
        }
        if let Ok(val) = std::env::var("RAG_TOP_K") {
            if let Ok(v) = val.parse() {
                config.retrieval.top_k = v;
            }
        }
        if let Ok(val) = std::env::var("RAG_MIN_SCORE") {
            if let Ok(v) = val.parse() {
                config.retrieval.min_score = v;
            }
        }
        if let Ok(name) = std::env::var("RAG_ASSISTANT_NAME") {
            config.retrieval.assistant_name = name;
        }
        if let Ok(prompt) = std::env::var("RAG_SYSTEM_PROMPT") {
            config.retrieval.system_prompt = prompt;
        }

        // LLM
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            if let Some(url) = default_base_url(&provider) {
                config.llm.base_url = url.to_string();
            }
            config.llm.provider = provider;
        }
        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("LLM_CHAT_MODEL") {
            config.llm.chat_model = model;
        }
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            config.llm.api_key = Some(key);
        }
        if let Ok(val) = std::env::var("LLM_TIMEOUT_SECS") {
            if let Ok(v) = val.parse() {
                config.llm.timeout_secs = v;
            }
        }

        // Admin
        if let (Ok(username), Ok(hash)) = (
            std::env::var("ADMIN_USERNAME"),
            std::env::var("ADMIN_PASSWORD_HASH"),
        ) {
            config.admin = Some(AdminCredentials {
                username,
                password_sha256: hash.trim().to_lowercase(),
            });
        }

        config
    }

    pub fn documents_path(&self) -> PathBuf {
        self.data_dir.join("documents.json")
    }

    pub fn sources_dir(&self) -> PathBuf {
        self.data_dir.join("sources")
    }

    pub fn embeddings_path(&self) -> PathBuf {
        self.data_dir.join("embeddings").join("embeddings.bin")
    }
}

/// Well-known API root for a provider, used when `LLM_BASE_URL` is unset.
fn default_base_url(provider: &str) -> Option<&'static str> {
    match provider {
        "ollama" => Some("http://localhost:11434"),
        "openai" => Some("https://api.openai.com"),
        "gemini" => Some("https://generativelanguage.googleapis.com"),
        _ => None,
    }
}
