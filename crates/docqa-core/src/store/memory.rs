//! In-memory [`DocumentStore`] for testing.
//!
//! Uses `HashMap` behind `std::sync::RwLock`.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{RagError, Result};
use crate::models::{Chunk, Document};

use super::DocumentStore;

struct StoredDoc {
    doc: Document,
    chunks: Vec<Chunk>,
}

#[derive(Default)]
pub struct InMemoryDocumentStore {
    docs: RwLock<HashMap<String, StoredDoc>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn create_document(&self, document: &Document, chunks: &[Chunk]) -> Result<()> {
        let mut docs = self.docs.write()?;
        if docs.contains_key(&document.id) {
            return Err(RagError::database(
                "create_document",
                format!("document {} already exists", document.id),
            ));
        }
        let mut chunks = chunks.to_vec();
        chunks.sort_by_key(|c| c.chunk_index);
        docs.insert(
            document.id.clone(),
            StoredDoc {
                doc: document.clone(),
                chunks,
            },
        );
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.docs.read()?.get(id).map(|s| s.doc.clone()))
    }

    async fn list_documents(&self, offset: usize, limit: usize) -> Result<Vec<Document>> {
        let docs = self.docs.read()?;
        let mut all: Vec<Document> = docs.values().map(|s| s.doc.clone()).collect();
        all.sort_by(|a, b| {
            b.uploaded_at
                .cmp(&a.uploaded_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(all.into_iter().skip(offset).take(limit).collect())
    }

    async fn count_documents(&self) -> Result<usize> {
        Ok(self.docs.read()?.len())
    }

    async fn get_chunks(&self, document_id: &str) -> Result<Vec<Chunk>> {
        Ok(self
            .docs
            .read()?
            .get(document_id)
            .map(|s| s.chunks.clone())
            .unwrap_or_default())
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        Ok(self.docs.write()?.remove(id).is_some())
    }
}
