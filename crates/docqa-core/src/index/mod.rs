//! Vector index abstraction.
//!
//! A [`VectorIndex`] is one named collection of (vector, payload) entries
//! with a fixed dimensionality and cosine distance.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | `ensure_collection` | Create the collection if absent; fail on dimension mismatch |
//! | `collection_exists` | Existence check |
//! | `upsert` | Batch insert or replace entries by id |
//! | `search` | Top-`limit` entries by descending cosine score, optionally restricted to document ids |
//! | `delete_by_document_id` | Remove every entry of a document, returning how many were removed |
//! | `count` | Number of entries, optionally per document |
//! | `collection_info` | Name, dimensionality, and entry count |
//! | `add_document_chunks` | Build one entry per (chunk, embedding) pair and upsert them in one call |
//!
//! Implementations must be `Send + Sync` to be shared across requests.

pub mod memory;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{RagError, Result};
use crate::models::{SearchResult, VectorEntry, VectorPayload};

/// Summary of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub dims: usize,
    pub entries: usize,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn collection_name(&self) -> &str;

    async fn collection_exists(&self) -> Result<bool>;

    /// Create the collection with `dims` dimensions if it does not exist.
    /// An existing collection with a different dimensionality is an error.
    async fn ensure_collection(&self, dims: usize) -> Result<()>;

    async fn upsert(&self, entries: Vec<VectorEntry>) -> Result<()>;

    /// When `document_ids` is `Some`, only entries of those documents are
    /// eligible. An empty index or an empty match yields `Ok(vec![])`.
    async fn search(
        &self,
        query: &[f32],
        limit: usize,
        document_ids: Option<&[String]>,
    ) -> Result<Vec<SearchResult>>;

    /// Idempotent: an unknown document id removes nothing and returns 0.
    async fn delete_by_document_id(&self, document_id: &str) -> Result<usize>;

    async fn count(&self, document_id: Option<&str>) -> Result<usize>;

    async fn collection_info(&self) -> Result<CollectionInfo>;

    /// Insert one entry per chunk of a document. Returns the number of
    /// entries written.
    async fn add_document_chunks(
        &self,
        document_id: &str,
        document_name: &str,
        chunks: &[String],
        embeddings: &[Vec<f32>],
    ) -> Result<usize> {
        let entries = build_entries(document_id, document_name, chunks, embeddings)?;
        let written = entries.len();
        self.upsert(entries).await?;
        tracing::debug!(
            collection = self.collection_name(),
            document_id,
            written,
            "added document chunks"
        );
        Ok(written)
    }
}

/// Pair chunks with embeddings, tagging each entry with a fresh id, the
/// chunk's position, and the document id. Lengths must match.
pub fn build_entries(
    document_id: &str,
    document_name: &str,
    chunks: &[String],
    embeddings: &[Vec<f32>],
) -> Result<Vec<VectorEntry>> {
    if chunks.len() != embeddings.len() {
        return Err(RagError::vector_store(
            "add_documents",
            format!(
                "Number of chunks ({}) must match number of embeddings ({})",
                chunks.len(),
                embeddings.len()
            ),
        ));
    }

    Ok(chunks
        .iter()
        .zip(embeddings)
        .enumerate()
        .map(|(index, (text, vector))| VectorEntry {
            id: Uuid::new_v4().to_string(),
            vector: vector.clone(),
            payload: VectorPayload {
                document_id: document_id.to_string(),
                chunk_index: index,
                chunk_text: text.clone(),
                document_name: document_name.to_string(),
            },
        })
        .collect())
}

/// Whether `document_id` passes an optional id filter.
pub fn filter_allows(document_ids: Option<&[String]>, document_id: &str) -> bool {
    match document_ids {
        Some(ids) => ids.iter().any(|id| id == document_id),
        None => true,
    }
}

/// Sort hits by descending score and keep the first `limit`.
pub fn rank(mut hits: Vec<SearchResult>, limit: usize) -> Vec<SearchResult> {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(limit);
    hits
}
