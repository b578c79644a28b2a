//! Error taxonomy shared by every pipeline component.
//!
//! Each [`RagError`] variant maps to a stable machine-readable tag
//! ([`RagError::tag`]) and a human message ([`RagError::public_message`]).
//! Outer surfaces render failures through [`RagError::to_body`], which never
//! exposes internal detail for unexpected failures.

use std::sync::PoisonError;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Message returned for failures outside the domain taxonomy.
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred";

#[derive(Debug, Error)]
pub enum RagError {
    #[error("Failed to extract text from '{path}': {reason}")]
    TextExtraction { path: String, reason: String },

    #[error("Failed to chunk document: {0}")]
    ChunkingFailed(String),

    #[error("Failed to generate embeddings: {0}")]
    EmbeddingGeneration(String),

    #[error("Vector store operation '{operation}' failed: {reason}")]
    VectorStore { operation: String, reason: String },

    #[error("LLM request failed: {0}")]
    Llm(String),

    #[error("Database operation '{operation}' failed: {reason}")]
    Database { operation: String, reason: String },

    #[error("Document with ID '{0}' not found")]
    DocumentNotFound(String),

    #[error("Session with ID '{0}' not found")]
    SessionNotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, RagError>;

impl RagError {
    pub fn text_extraction(path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        RagError::TextExtraction {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn vector_store(operation: &str, reason: impl std::fmt::Display) -> Self {
        RagError::VectorStore {
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn database(operation: &str, reason: impl std::fmt::Display) -> Self {
        RagError::Database {
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn embedding(reason: impl std::fmt::Display) -> Self {
        RagError::EmbeddingGeneration(reason.to_string())
    }

    pub fn llm(reason: impl std::fmt::Display) -> Self {
        RagError::Llm(reason.to_string())
    }

    pub fn internal(reason: impl std::fmt::Display) -> Self {
        RagError::Internal(reason.to_string())
    }

    /// Stable tag identifying the failure kind.
    pub fn tag(&self) -> &'static str {
        match self {
            RagError::TextExtraction { .. } => "text_extraction_error",
            RagError::ChunkingFailed(_) => "chunking_failed_error",
            RagError::EmbeddingGeneration(_) => "embedding_generation_error",
            RagError::VectorStore { .. } => "vector_store_error",
            RagError::Llm(_) => "llm_error",
            RagError::Database { .. } => "database_error",
            RagError::DocumentNotFound(_) => "document_not_found",
            RagError::SessionNotFound(_) => "session_not_found",
            RagError::Validation(_) => "validation_error",
            RagError::Internal(_) => "internal_error",
        }
    }

    /// Message safe to show to a user. Internal failures collapse to
    /// [`GENERIC_ERROR_MESSAGE`].
    pub fn public_message(&self) -> String {
        match self {
            RagError::Internal(_) => GENERIC_ERROR_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    /// Whether the failure belongs to the domain taxonomy rather than the
    /// generic internal bucket.
    pub fn is_domain(&self) -> bool {
        !matches!(self, RagError::Internal(_))
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.tag().to_string(),
            message: self.public_message(),
            timestamp: Utc::now(),
        }
    }
}

impl<T> From<PoisonError<T>> for RagError {
    fn from(err: PoisonError<T>) -> Self {
        RagError::Internal(format!("lock poisoned: {}", err))
    }
}

/// Serializable error payload for outer surfaces.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_stable() {
        assert_eq!(
            RagError::text_extraction("a.pdf", "bad").tag(),
            "text_extraction_error"
        );
        assert_eq!(
            RagError::ChunkingFailed("x".into()).tag(),
            "chunking_failed_error"
        );
        assert_eq!(RagError::embedding("x").tag(), "embedding_generation_error");
        assert_eq!(RagError::vector_store("search", "x").tag(), "vector_store_error");
        assert_eq!(RagError::llm("x").tag(), "llm_error");
        assert_eq!(RagError::database("insert", "x").tag(), "database_error");
        assert_eq!(RagError::internal("x").tag(), "internal_error");
    }

    #[test]
    fn messages_carry_operation_and_reason() {
        let err = RagError::vector_store("add_documents", "length mismatch");
        assert_eq!(
            err.to_string(),
            "Vector store operation 'add_documents' failed: length mismatch"
        );
        let err = RagError::text_extraction("notes.txt", "File not found");
        assert_eq!(
            err.to_string(),
            "Failed to extract text from 'notes.txt': File not found"
        );
    }

    #[test]
    fn internal_errors_do_not_leak_detail() {
        let body = RagError::internal("sqlite pool exhausted at 0xdeadbeef").to_body();
        assert_eq!(body.error, "internal_error");
        assert_eq!(body.message, GENERIC_ERROR_MESSAGE);
        assert!(!RagError::internal("x").is_domain());
        assert!(RagError::llm("timeout").is_domain());
    }

    #[test]
    fn body_serializes_with_tag() {
        let body = RagError::Validation("question must not be empty".into()).to_body();
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"], "validation_error");
        assert_eq!(json["message"], "Validation failed: question must not be empty");
        assert!(json["timestamp"].is_string());
    }
}
