//! # rag-chat
//!
//! A retrieval-augmented chat service. Documents live in a JSON store, are
//! embedded with a TF-IDF model, and the most similar ones are placed into
//! the prompt sent to a hosted language model.
//!
//! ## Architecture
//!
//! ```text
//!   sources/*.pdf|txt|md ──► extract ──► chunk ──┐
//!                                                ▼
//!   admin add/delete ─────────────────────► DocumentStore ──► documents.json
//!                                                │
//!                                     full rebuild on change
//!                                                ▼
//!                                         VectorIndex ──────► embeddings.bin
//!                                                │
//!   user question ──► embed ──► cosine rank ──► top-k, score > min
//!                                                │
//!                                                ▼
//!                      history (last 3) + documents ──► prompt ──► Generator
//!                                                                     │
//!                                                 render (escaped HTML) ◄┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for paths, retrieval, LLM and admin
//! - [`models`] - Shared data types: `Document`, `SourceTag`, `ConversationTurn`, request/response types
//! - [`store`] - Ordered document collection with stable ids and JSON persistence
//! - [`chunking`] - Overlapping fixed-size word windows
//! - [`ingest`] - Source directory scanning and PDF/text extraction
//! - [`search::tfidf`] - Vocabulary, smoothed IDF and L2-normalized term vectors
//! - [`search::vector`] - Id-keyed vector index with binary archive persistence
//! - [`llm`] - Prompt assembly and HTTP generation backends (Ollama, OpenAI, Gemini)
//! - [`engine`] - The `RagEngine` service tying store, index and generator together
//! - [`api`] - Axum handlers for chat and admin routes
//! - [`state`] - Shared application state

pub mod api;
pub mod auth;
pub mod chunking;
pub mod config;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod render;
pub mod search;
pub mod session;
pub mod state;
pub mod store;
