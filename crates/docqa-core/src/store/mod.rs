//! Document metadata storage abstraction.
//!
//! The [`DocumentStore`] trait is the narrow CRUD contract the pipeline
//! needs for documents and their chunks. A document and its chunks are
//! always created together.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Chunk, Document};

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Atomically insert a document with its chunks.
    async fn create_document(&self, document: &Document, chunks: &[Chunk]) -> Result<()>;

    async fn get_document(&self, id: &str) -> Result<Option<Document>>;

    /// Newest first.
    async fn list_documents(&self, offset: usize, limit: usize) -> Result<Vec<Document>>;

    async fn count_documents(&self) -> Result<usize>;

    /// Chunks ordered by index.
    async fn get_chunks(&self, document_id: &str) -> Result<Vec<Chunk>>;

    /// Delete a document and its chunks. Returns whether it existed.
    async fn delete_document(&self, id: &str) -> Result<bool>;
}
