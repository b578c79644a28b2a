//! # docqa core
//!
//! Runtime-agnostic logic for docqa: data models, the error taxonomy, text
//! cleaning, chunking, the embedding/index/conversation/document/LLM traits
//! with in-memory implementations, prompt assembly, and the RAG pipeline.
//!
//! This crate contains no tokio, sqlx, HTTP client, or filesystem I/O.
//! Native adapters live in the `docqa` app crate.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`error`] | `RagError` and its stable tags |
//! | [`models`] | Documents, chunks, vector entries, messages |
//! | [`text`] | Text cleaning |
//! | [`chunk`] | Fixed and recursive chunkers |
//! | [`embedding`] | Embedding trait and vector utilities |
//! | [`index`] | Vector index trait |
//! | [`conversation`] | Session-scoped message log |
//! | [`store`] | Document metadata store trait |
//! | [`llm`] | Chat-completion trait |
//! | [`prompt`] | Prompt assembly |
//! | [`pipeline`] | The RAG orchestrator |

pub mod chunk;
pub mod conversation;
pub mod embedding;
pub mod error;
pub mod index;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod store;
pub mod text;

pub use error::{RagError, Result};
