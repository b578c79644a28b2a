//! Vector index stored in SQLite, searched by brute-force cosine.

use async_trait::async_trait;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use docqa_core::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use docqa_core::index::{rank, CollectionInfo, VectorIndex};
use docqa_core::models::{SearchResult, VectorEntry};
use docqa_core::{RagError, Result};

/// Embedded vector index: one row per entry in `vector_entries`, the
/// embedding stored as a little-endian `f32` blob. Search is brute-force
/// cosine over the collection.
#[derive(Clone)]
pub struct SqliteVectorIndex {
    pool: SqlitePool,
    name: String,
}

impl SqliteVectorIndex {
    pub fn new(pool: SqlitePool, name: impl Into<String>) -> Self {
        Self {
            pool,
            name: name.into(),
        }
    }

    async fn dims(&self, operation: &str) -> Result<Option<usize>> {
        let dims: Option<i64> =
            sqlx::query_scalar("SELECT dims FROM vector_collections WHERE name = ?")
                .bind(&self.name)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| RagError::vector_store(operation, e))?;
        Ok(dims.map(|d| d as usize))
    }

    async fn require_dims(&self, operation: &str) -> Result<usize> {
        self.dims(operation).await?.ok_or_else(|| {
            RagError::vector_store(operation, format!("collection '{}' does not exist", self.name))
        })
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    fn collection_name(&self) -> &str {
        &self.name
    }

    async fn collection_exists(&self) -> Result<bool> {
        Ok(self.dims("collection_exists").await?.is_some())
    }

    async fn ensure_collection(&self, dims: usize) -> Result<()> {
        match self.dims("create_collection").await? {
            Some(existing) if existing != dims => Err(RagError::vector_store(
                "create_collection",
                format!(
                    "collection '{}' has {} dimensions, provider produces {}",
                    self.name, existing, dims
                ),
            )),
            Some(_) => Ok(()),
            None => {
                sqlx::query(
                    "INSERT OR IGNORE INTO vector_collections (name, dims, distance) VALUES (?, ?, 'cosine')",
                )
                .bind(&self.name)
                .bind(dims as i64)
                .execute(&self.pool)
                .await
                .map_err(|e| RagError::vector_store("create_collection", e))?;
                tracing::info!(collection = %self.name, dims, "created vector collection");
                Ok(())
            }
        }
    }

    async fn upsert(&self, entries: Vec<VectorEntry>) -> Result<()> {
        let dims = self.require_dims("upsert").await?;
        if let Some(bad) = entries.iter().find(|e| e.vector.len() != dims) {
            return Err(RagError::vector_store(
                "upsert",
                format!("expected {} dimensions, got {}", dims, bad.vector.len()),
            ));
        }

        let vs_err = |e: sqlx::Error| RagError::vector_store("upsert", e);
        let mut tx = self.pool.begin().await.map_err(vs_err)?;
        for entry in &entries {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO vector_entries
                    (id, collection, document_id, chunk_index, chunk_text, document_name, embedding)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&entry.id)
            .bind(&self.name)
            .bind(&entry.payload.document_id)
            .bind(entry.payload.chunk_index as i64)
            .bind(&entry.payload.chunk_text)
            .bind(&entry.payload.document_name)
            .bind(vec_to_blob(&entry.vector))
            .execute(&mut *tx)
            .await
            .map_err(vs_err)?;
        }
        tx.commit().await.map_err(vs_err)?;
        Ok(())
    }

    async fn search(
        &self,
        query: &[f32],
        limit: usize,
        document_ids: Option<&[String]>,
    ) -> Result<Vec<SearchResult>> {
        let dims = self.require_dims("search").await?;
        if query.len() != dims {
            return Err(RagError::vector_store(
                "search",
                format!("expected {} dimensions, got {}", dims, query.len()),
            ));
        }
        if matches!(document_ids, Some(ids) if ids.is_empty()) {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, document_id, chunk_index, chunk_text, document_name, embedding \
             FROM vector_entries WHERE collection = ",
        );
        builder.push_bind(self.name.clone());
        if let Some(ids) = document_ids {
            builder.push(" AND document_id IN (");
            let mut separated = builder.separated(", ");
            for id in ids {
                separated.push_bind(id.clone());
            }
            separated.push_unseparated(")");
        }

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RagError::vector_store("search", e))?;

        let hits = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let index: i64 = row.get("chunk_index");
                SearchResult {
                    id: row.get("id"),
                    score: cosine_similarity(query, &blob_to_vec(&blob)),
                    document_id: row.get("document_id"),
                    document_name: row.get("document_name"),
                    chunk_index: index as usize,
                    chunk_text: row.get("chunk_text"),
                }
            })
            .collect();

        Ok(rank(hits, limit))
    }

    async fn delete_by_document_id(&self, document_id: &str) -> Result<usize> {
        let result =
            sqlx::query("DELETE FROM vector_entries WHERE collection = ? AND document_id = ?")
                .bind(&self.name)
                .bind(document_id)
                .execute(&self.pool)
                .await
                .map_err(|e| RagError::vector_store("delete_by_document_id", e))?;
        Ok(result.rows_affected() as usize)
    }

    async fn count(&self, document_id: Option<&str>) -> Result<usize> {
        let count: i64 = match document_id {
            Some(id) => sqlx::query_scalar(
                "SELECT COUNT(*) FROM vector_entries WHERE collection = ? AND document_id = ?",
            )
            .bind(&self.name)
            .bind(id)
            .fetch_one(&self.pool)
            .await,
            None => sqlx::query_scalar("SELECT COUNT(*) FROM vector_entries WHERE collection = ?")
                .bind(&self.name)
                .fetch_one(&self.pool)
                .await,
        }
        .map_err(|e| RagError::vector_store("count", e))?;
        Ok(count as usize)
    }

    async fn collection_info(&self) -> Result<CollectionInfo> {
        let dims = self.require_dims("collection_info").await?;
        let entries = self.count(None).await?;
        Ok(CollectionInfo {
            name: self.name.clone(),
            dims,
            entries,
        })
    }
}
