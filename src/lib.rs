//! # docqa
//!
//! Retrieval-augmented question answering over local documents, with
//! per-session conversational memory.
//!
//! The pipeline itself (chunking, retrieval, prompt assembly, answer
//! synthesis) lives in [`docqa_core`]. This crate supplies the native
//! adapters it runs on and the `docqa` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌────────────────────┐
//! │ PDF/TXT  │──▶│  RagPipeline  │──▶│ SQLite / Qdrant    │
//! │ extract  │   │ chunk + embed │   │ vectors + metadata │
//! └──────────┘   └───────┬───────┘   └────────────────────┘
//!                        │ ask
//!                        ▼
//!               ┌─────────────────┐   ┌──────────────┐
//!               │ prompt + memory │──▶│ chat LLM API │
//!               └─────────────────┘   └──────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite`] | SQLite document, conversation, and vector stores |
//! | [`qdrant`] | Qdrant REST vector index |
//! | [`embedding`] | Embedding providers |
//! | [`llm`] | OpenAI-compatible chat client |
//! | [`extract`] | PDF and text extraction |
//! | [`app`] | Application context |
//! | [`ingest`], [`documents`], [`ask`], [`sessions`] | CLI commands |

pub mod app;
pub mod ask;
pub mod config;
pub mod db;
pub mod documents;
pub mod embedding;
pub mod extract;
pub mod ingest;
pub mod llm;
pub mod logging;
pub mod migrate;
pub mod qdrant;
pub mod sessions;
pub mod sqlite;
