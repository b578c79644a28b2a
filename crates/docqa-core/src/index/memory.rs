//! In-memory [`VectorIndex`] for tests and ephemeral use.
//!
//! Entries live in a `Vec` behind `std::sync::RwLock`. Search is
//! brute-force cosine similarity over every entry.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::error::{RagError, Result};
use crate::models::{SearchResult, VectorEntry};

use super::{filter_allows, rank, CollectionInfo, VectorIndex};

pub struct InMemoryVectorIndex {
    name: String,
    dims: RwLock<Option<usize>>,
    entries: RwLock<Vec<VectorEntry>>,
}

impl InMemoryVectorIndex {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dims: RwLock::new(None),
            entries: RwLock::new(Vec::new()),
        }
    }

    fn require_dims(&self, operation: &str) -> Result<usize> {
        let dims = *self.dims.read()?;
        dims.ok_or_else(|| {
            RagError::vector_store(operation, format!("collection '{}' does not exist", self.name))
        })
    }
}

impl Default for InMemoryVectorIndex {
    fn default() -> Self {
        Self::new("documents")
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    fn collection_name(&self) -> &str {
        &self.name
    }

    async fn collection_exists(&self) -> Result<bool> {
        Ok(self.dims.read()?.is_some())
    }

    async fn ensure_collection(&self, dims: usize) -> Result<()> {
        let mut current = self.dims.write()?;
        match *current {
            Some(existing) if existing != dims => Err(RagError::vector_store(
                "create_collection",
                format!(
                    "collection '{}' has {} dimensions, provider produces {}",
                    self.name, existing, dims
                ),
            )),
            Some(_) => Ok(()),
            None => {
                *current = Some(dims);
                Ok(())
            }
        }
    }

    async fn upsert(&self, entries: Vec<VectorEntry>) -> Result<()> {
        let dims = self.require_dims("upsert")?;
        if let Some(bad) = entries.iter().find(|e| e.vector.len() != dims) {
            return Err(RagError::vector_store(
                "upsert",
                format!("expected {} dimensions, got {}", dims, bad.vector.len()),
            ));
        }

        let mut stored = self.entries.write()?;
        for entry in entries {
            match stored.iter_mut().find(|e| e.id == entry.id) {
                Some(existing) => *existing = entry,
                None => stored.push(entry),
            }
        }
        Ok(())
    }

    async fn search(
        &self,
        query: &[f32],
        limit: usize,
        document_ids: Option<&[String]>,
    ) -> Result<Vec<SearchResult>> {
        let dims = self.require_dims("search")?;
        if query.len() != dims {
            return Err(RagError::vector_store(
                "search",
                format!("expected {} dimensions, got {}", dims, query.len()),
            ));
        }

        let stored = self.entries.read()?;
        let hits = stored
            .iter()
            .filter(|e| filter_allows(document_ids, &e.payload.document_id))
            .map(|e| SearchResult {
                id: e.id.clone(),
                score: cosine_similarity(query, &e.vector),
                document_id: e.payload.document_id.clone(),
                document_name: e.payload.document_name.clone(),
                chunk_index: e.payload.chunk_index,
                chunk_text: e.payload.chunk_text.clone(),
            })
            .collect();

        Ok(rank(hits, limit))
    }

    async fn delete_by_document_id(&self, document_id: &str) -> Result<usize> {
        let mut stored = self.entries.write()?;
        let before = stored.len();
        stored.retain(|e| e.payload.document_id != document_id);
        Ok(before - stored.len())
    }

    async fn count(&self, document_id: Option<&str>) -> Result<usize> {
        let stored = self.entries.read()?;
        Ok(match document_id {
            Some(id) => stored.iter().filter(|e| e.payload.document_id == id).count(),
            None => stored.len(),
        })
    }

    async fn collection_info(&self) -> Result<CollectionInfo> {
        let dims = self.require_dims("collection_info")?;
        Ok(CollectionInfo {
            name: self.name.clone(),
            dims,
            entries: self.entries.read()?.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(dims: usize, hot: usize) -> Vec<f32> {
        let mut v = vec![0.0; dims];
        v[hot] = 1.0;
        v
    }

    async fn seeded() -> InMemoryVectorIndex {
        let index = InMemoryVectorIndex::default();
        index.ensure_collection(4).await.unwrap();
        let a_chunks: Vec<String> = (0..3).map(|i| format!("alpha {}", i)).collect();
        let a_vecs = vec![unit(4, 0), vec![0.9, 0.1, 0.0, 0.0], vec![0.5, 0.5, 0.0, 0.0]];
        index
            .add_document_chunks("A", "alpha.txt", &a_chunks, &a_vecs)
            .await
            .unwrap();
        let b_chunks: Vec<String> = (0..2).map(|i| format!("beta {}", i)).collect();
        index
            .add_document_chunks("B", "beta.txt", &b_chunks, &[unit(4, 0), unit(4, 2)])
            .await
            .unwrap();
        index
    }

    #[tokio::test]
    async fn round_trip_returns_every_chunk_once() {
        let index = seeded().await;
        let filter = vec!["A".to_string()];
        let hits = index.search(&unit(4, 0), 10, Some(filter.as_slice())).await.unwrap();

        assert_eq!(hits.len(), 3);
        assert!(hits.iter().all(|h| h.document_id == "A"));
        let mut indices: Vec<usize> = hits.iter().map(|h| h.chunk_index).collect();
        indices.sort();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn results_are_ordered_by_descending_score() {
        let index = seeded().await;
        let hits = index.search(&unit(4, 0), 10, None).await.unwrap();
        assert_eq!(hits.len(), 5);
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        let top = index.search(&unit(4, 0), 2, None).await.unwrap();
        assert_eq!(top.len(), 2);
        assert!((top[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn filter_isolates_documents() {
        let index = seeded().await;
        let filter = vec!["A".to_string()];
        let hits = index.search(&unit(4, 2), 10, Some(filter.as_slice())).await.unwrap();
        assert!(hits.iter().all(|h| h.document_id != "B"));

        let none = vec!["missing".to_string()];
        assert!(index.search(&unit(4, 0), 10, Some(none.as_slice())).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_is_complete_and_idempotent() {
        let index = seeded().await;
        assert_eq!(index.delete_by_document_id("A").await.unwrap(), 3);
        let hits = index.search(&unit(4, 0), 10, None).await.unwrap();
        assert!(hits.iter().all(|h| h.document_id != "A"));
        assert_eq!(index.delete_by_document_id("A").await.unwrap(), 0);
        assert_eq!(index.delete_by_document_id("never-inserted").await.unwrap(), 0);
        assert_eq!(index.count(None).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn empty_index_search_is_empty() {
        let index = InMemoryVectorIndex::default();
        index.ensure_collection(4).await.unwrap();
        assert!(index.search(&unit(4, 1), 5, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn dimension_mismatch_fails_loudly() {
        let index = seeded().await;
        let err = index.ensure_collection(8).await.unwrap_err();
        assert_eq!(err.tag(), "vector_store_error");
        assert!(index.search(&[1.0, 0.0], 5, None).await.is_err());
        assert!(index.ensure_collection(4).await.is_ok());
    }

    #[tokio::test]
    async fn info_and_counts() {
        let index = seeded().await;
        let info = index.collection_info().await.unwrap();
        assert_eq!(info.name, "documents");
        assert_eq!(info.dims, 4);
        assert_eq!(info.entries, 5);
        assert_eq!(index.count(Some("B")).await.unwrap(), 2);
        assert!(index.collection_exists().await.unwrap());
    }
}
