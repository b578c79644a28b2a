//! Core data models used throughout docqa.
//!
//! These types represent the documents, chunks, vector payloads, search
//! results, and conversation messages that flow through the ingestion and
//! question-answering pipelines.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RagError;

/// Chunking strategy recorded on every document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingStrategy {
    /// Sliding character window with overlap.
    Fixed,
    /// Paragraph, then line, then word, then character boundaries.
    Recursive,
}

impl ChunkingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkingStrategy::Fixed => "fixed",
            ChunkingStrategy::Recursive => "recursive",
        }
    }
}

impl fmt::Display for ChunkingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkingStrategy {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(ChunkingStrategy::Fixed),
            "recursive" => Ok(ChunkingStrategy::Recursive),
            other => Err(RagError::ChunkingFailed(format!(
                "Unknown chunking strategy: {}",
                other
            ))),
        }
    }
}

/// An ingested document's metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub filename: String,
    pub file_size: u64,
    pub chunking_strategy: ChunkingStrategy,
    pub chunk_count: usize,
    pub uploaded_at: DateTime<Utc>,
}

/// A chunk of a document's text. Indices are contiguous from 0 within a
/// document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub document_id: String,
    pub chunk_index: usize,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Denormalized payload stored next to each vector so search results can be
/// displayed without a metadata lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorPayload {
    pub document_id: String,
    pub chunk_index: usize,
    pub chunk_text: String,
    pub document_name: String,
}

/// One stored (vector, payload) pair. The id is freshly generated per
/// insert, independent of the chunk index.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: VectorPayload,
}

/// A nearest-neighbor hit returned by a vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub score: f32,
    pub document_id: String,
    pub document_name: String,
    pub chunk_index: usize,
    pub chunk_text: String,
}

/// A retrieved chunk as cited alongside an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceAttribution {
    pub text: String,
    pub document_id: String,
    pub document_name: String,
    pub chunk_index: usize,
    pub similarity_score: f32,
}

impl From<&SearchResult> for SourceAttribution {
    fn from(result: &SearchResult) -> Self {
        Self {
            text: result.chunk_text.clone(),
            document_id: result.document_id.clone(),
            document_name: result.document_name.clone(),
            chunk_index: result.chunk_index,
            similarity_score: result.score,
        }
    }
}

/// Speaker of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageRole {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            "system" => Ok(MessageRole::System),
            other => Err(RagError::Validation(format!("unknown message role: {}", other))),
        }
    }
}

/// A persisted conversation message. `id` increases with append order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: i64,
    pub session_id: String,
    pub role: MessageRole,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// A session derived from its messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub message_count: usize,
    pub last_activity: DateTime<Utc>,
}
