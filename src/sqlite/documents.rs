use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use docqa_core::models::{Chunk, Document};
use docqa_core::store::DocumentStore;
use docqa_core::{RagError, Result};

use super::{format_ts, parse_ts};

/// Document metadata and chunk text in the `documents` and
/// `document_chunks` tables.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn document_from_row(row: &SqliteRow) -> Result<Document> {
    let strategy: String = row.get("chunking_strategy");
    let file_size: i64 = row.get("file_size");
    let chunk_count: i64 = row.get("chunk_count");
    let uploaded_at: String = row.get("uploaded_at");
    Ok(Document {
        id: row.get("id"),
        filename: row.get("filename"),
        file_size: file_size.max(0) as u64,
        chunking_strategy: strategy.parse()?,
        chunk_count: chunk_count.max(0) as usize,
        uploaded_at: parse_ts(&uploaded_at)?,
    })
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn create_document(&self, document: &Document, chunks: &[Chunk]) -> Result<()> {
        let db_err = |e: sqlx::Error| RagError::database("create_document", e);
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            r#"
            INSERT INTO documents (id, filename, file_size, chunking_strategy, chunk_count, uploaded_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&document.id)
        .bind(&document.filename)
        .bind(document.file_size as i64)
        .bind(document.chunking_strategy.as_str())
        .bind(document.chunk_count as i64)
        .bind(format_ts(&document.uploaded_at))
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        for chunk in chunks {
            sqlx::query(
                r#"
                INSERT INTO document_chunks (document_id, chunk_index, chunk_text, created_at)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(&chunk.document_id)
            .bind(chunk.chunk_index as i64)
            .bind(&chunk.text)
            .bind(format_ts(&chunk.created_at))
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        tracing::debug!(document_id = %document.id, chunks = chunks.len(), "document stored");
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query(
            "SELECT id, filename, file_size, chunking_strategy, chunk_count, uploaded_at FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RagError::database("get_document", e))?;

        row.as_ref().map(document_from_row).transpose()
    }

    async fn list_documents(&self, offset: usize, limit: usize) -> Result<Vec<Document>> {
        let rows = sqlx::query(
            r#"
            SELECT id, filename, file_size, chunking_strategy, chunk_count, uploaded_at
            FROM documents
            ORDER BY uploaded_at DESC, id ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RagError::database("list_documents", e))?;

        rows.iter().map(document_from_row).collect()
    }

    async fn count_documents(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RagError::database("count_documents", e))?;
        Ok(count as usize)
    }

    async fn get_chunks(&self, document_id: &str) -> Result<Vec<Chunk>> {
        let rows = sqlx::query(
            r#"
            SELECT document_id, chunk_index, chunk_text, created_at
            FROM document_chunks
            WHERE document_id = ?
            ORDER BY chunk_index ASC
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RagError::database("get_chunks", e))?;

        rows.iter()
            .map(|row| {
                let index: i64 = row.get("chunk_index");
                let created_at: String = row.get("created_at");
                Ok(Chunk {
                    document_id: row.get("document_id"),
                    chunk_index: index as usize,
                    text: row.get("chunk_text"),
                    created_at: parse_ts(&created_at)?,
                })
            })
            .collect()
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        // Chunk rows go with the document through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RagError::database("delete_document", e))?;
        Ok(result.rows_affected() > 0)
    }
}
