//! Retrieval-augmented answer pipeline.
//!
//! [`RagPipeline`] composes the embedding provider, vector index,
//! conversation store, document store, and LLM client. It holds no state of
//! its own between calls; every component is injected at construction.
//!
//! # Ingestion
//!
//! ```text
//! text ──▶ chunk ──▶ embed ──▶ metadata create ──▶ vector insert
//!                                     ▲                  │ failure
//!                                     └── compensating ◀─┘
//!                                          removal
//! ```
//!
//! # Asking
//!
//! A single [`RagPipeline::ask`] call moves through
//! `RECEIVED → HISTORY_SAVED(user) → RETRIEVED → CONTEXT_BUILT → GENERATED →
//! HISTORY_SAVED(assistant) → RESPONDED`. Retrieval failures degrade to an
//! empty context ([`RetrievalOutcome::Degraded`]); generation failures end
//! the request with [`RagError::Llm`] and leave the user's message in the
//! history.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::chunk::{chunk_text, make_chunks, ChunkingParams};
use crate::conversation::{format_history_for_llm, ConversationStore};
use crate::embedding::{embed_batch, encode_query, model_info, EmbeddingProvider, ModelInfo};
use crate::error::{RagError, Result};
use crate::index::{CollectionInfo, VectorIndex};
use crate::llm::{ChatMessage, ChatRequest, LlmClient, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use crate::models::{
    Chunk, ChunkingStrategy, ConversationMessage, Document, MessageRole, SearchResult,
    SessionSummary, SourceAttribution,
};
use crate::prompt::{build_messages, format_context};
use crate::text::char_len;

/// Phrases that mark an answer as a refusal.
pub const REFUSAL_PHRASES: [&str; 5] = [
    "i don't know",
    "i cannot answer",
    "no information",
    "not provided",
    "unable to answer",
];

/// Answers shorter than this are flagged as low quality.
pub const MIN_ANSWER_CHARS: usize = 10;

/// Tunables consumed by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub chunking: ChunkingParams,
    pub default_strategy: ChunkingStrategy,
    pub top_k: usize,
    /// Prior turns included in a prompt.
    pub max_history_messages: usize,
    /// Messages fetched from memory before trimming to
    /// `max_history_messages`.
    pub history_window: usize,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chunking: ChunkingParams::default(),
            default_strategy: ChunkingStrategy::Recursive,
            top_k: 5,
            max_history_messages: 5,
            history_window: 10,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Shared handles the pipeline is built from.
#[derive(Clone)]
pub struct PipelineComponents {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub index: Arc<dyn VectorIndex>,
    pub conversations: Arc<dyn ConversationStore>,
    pub documents: Arc<dyn crate::store::DocumentStore>,
    pub llm: Arc<dyn LlmClient>,
}

/// Result of the retrieval stage. Failure is a distinct branch from an
/// empty but successful search.
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalOutcome {
    Found(Vec<SearchResult>),
    Empty,
    Degraded { reason: String },
}

impl RetrievalOutcome {
    pub fn results(&self) -> &[SearchResult] {
        match self {
            RetrievalOutcome::Found(results) => results.as_slice(),
            RetrievalOutcome::Empty | RetrievalOutcome::Degraded { .. } => &[],
        }
    }

    pub fn status(&self) -> RetrievalStatus {
        match self {
            RetrievalOutcome::Found(_) => RetrievalStatus::Found,
            RetrievalOutcome::Empty => RetrievalStatus::Empty,
            RetrievalOutcome::Degraded { .. } => RetrievalStatus::Degraded,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalStatus {
    Found,
    Empty,
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub document_id: String,
    pub filename: String,
    pub chunks_created: usize,
    pub chunking_strategy: ChunkingStrategy,
    pub total_characters: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteReport {
    pub document_id: String,
    pub filename: String,
    pub vectors_removed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentPage {
    pub documents: Vec<Document>,
    pub total: usize,
}

#[derive(Debug, Clone, Default)]
pub struct AskRequest {
    pub question: String,
    pub session_id: String,
    /// Restrict retrieval to these documents. `None` or an empty list
    /// searches every document.
    pub document_ids: Option<Vec<String>>,
    pub top_k: Option<usize>,
}

impl AskRequest {
    pub fn new(question: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            session_id: session_id.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub sources: Vec<SourceAttribution>,
    pub session_id: String,
    pub retrieval: RetrievalStatus,
    /// Advisory only; the answer is returned either way.
    pub low_quality: bool,
}

pub struct RagPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    conversations: Arc<dyn ConversationStore>,
    documents: Arc<dyn crate::store::DocumentStore>,
    llm: Arc<dyn LlmClient>,
    settings: PipelineSettings,
}

impl RagPipeline {
    pub fn new(components: PipelineComponents, settings: PipelineSettings) -> Self {
        Self {
            embedder: components.embedder,
            index: components.index,
            conversations: components.conversations,
            documents: components.documents,
            llm: components.llm,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn model_info(&self) -> ModelInfo {
        model_info(self.embedder.as_ref())
    }

    pub async fn collection_info(&self) -> Result<CollectionInfo> {
        self.index.collection_info().await
    }

    // ============ Ingestion ============

    /// Chunk, embed, and store already-extracted text.
    ///
    /// Metadata is written before vectors. If the vector insert fails, the
    /// metadata and any partially written vectors are removed before the
    /// error is returned.
    pub async fn ingest_text(
        &self,
        filename: &str,
        file_size: u64,
        text: &str,
        strategy: Option<ChunkingStrategy>,
    ) -> Result<IngestReport> {
        let strategy = strategy.unwrap_or(self.settings.default_strategy);
        let mut chunks = chunk_text(text, strategy, &self.settings.chunking)?;
        // Blank windows would get no embedding; indices must stay contiguous.
        chunks.retain(|chunk| !chunk.trim().is_empty());
        if chunks.is_empty() {
            return Err(RagError::ChunkingFailed(
                "document produced no non-blank chunks".to_string(),
            ));
        }
        debug!(filename, chunks = chunks.len(), %strategy, "chunked document");

        let embeddings = embed_batch(self.embedder.as_ref(), &chunks).await?;

        let document_id = Uuid::new_v4().to_string();
        let document = Document {
            id: document_id.clone(),
            filename: filename.to_string(),
            file_size,
            chunking_strategy: strategy,
            chunk_count: chunks.len(),
            uploaded_at: chrono::Utc::now(),
        };
        let records = make_chunks(&document_id, &chunks);
        self.documents.create_document(&document, &records).await?;

        if let Err(err) = self
            .index
            .add_document_chunks(&document_id, filename, &chunks, &embeddings)
            .await
        {
            warn!(document_id = %document_id, error = %err, "vector insert failed, rolling back");
            self.rollback_ingest(&document_id).await;
            return Err(err);
        }

        info!(
            document_id = %document_id,
            filename,
            chunks = chunks.len(),
            "document ingested"
        );

        Ok(IngestReport {
            document_id,
            filename: filename.to_string(),
            chunks_created: chunks.len(),
            chunking_strategy: strategy,
            total_characters: char_len(text),
        })
    }

    async fn rollback_ingest(&self, document_id: &str) {
        if let Err(err) = self.index.delete_by_document_id(document_id).await {
            warn!(document_id, error = %err, "rollback: failed to remove vectors");
        }
        if let Err(err) = self.documents.delete_document(document_id).await {
            warn!(document_id, error = %err, "rollback: failed to remove metadata");
        }
    }

    /// Remove a document's vectors, then its metadata and chunks.
    pub async fn delete_document(&self, document_id: &str) -> Result<DeleteReport> {
        let document = self.get_document(document_id).await?;
        let vectors_removed = self.index.delete_by_document_id(document_id).await?;
        self.documents.delete_document(document_id).await?;
        info!(document_id, vectors_removed, "document deleted");
        Ok(DeleteReport {
            document_id: document.id,
            filename: document.filename,
            vectors_removed,
        })
    }

    pub async fn list_documents(&self, offset: usize, limit: usize) -> Result<DocumentPage> {
        let documents = self.documents.list_documents(offset, limit).await?;
        let total = self.documents.count_documents().await?;
        Ok(DocumentPage { documents, total })
    }

    pub async fn get_document(&self, document_id: &str) -> Result<Document> {
        self.documents
            .get_document(document_id)
            .await?
            .ok_or_else(|| RagError::DocumentNotFound(document_id.to_string()))
    }

    pub async fn document_chunks(&self, document_id: &str) -> Result<Vec<Chunk>> {
        self.get_document(document_id).await?;
        self.documents.get_chunks(document_id).await
    }

    // ============ Question answering ============

    /// Encode the question and search the index. Never fails: errors come
    /// back as [`RetrievalOutcome::Degraded`].
    pub async fn retrieve_context(
        &self,
        question: &str,
        document_ids: Option<&[String]>,
        top_k: usize,
    ) -> RetrievalOutcome {
        let filter = document_ids.filter(|ids| !ids.is_empty());
        match self.search(question, filter, top_k).await {
            Ok(results) if results.is_empty() => RetrievalOutcome::Empty,
            Ok(results) => {
                debug!(hits = results.len(), "retrieved context");
                RetrievalOutcome::Found(results)
            }
            Err(err) => {
                warn!(error = %err, "retrieval failed, answering without context");
                RetrievalOutcome::Degraded {
                    reason: err.to_string(),
                }
            }
        }
    }

    async fn search(
        &self,
        question: &str,
        filter: Option<&[String]>,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let query = encode_query(self.embedder.as_ref(), question).await?;
        self.index.search(&query, top_k, filter).await
    }

    /// Build the prompt for `question` from the retrieval results and prior
    /// turns.
    pub fn build_prompt(
        &self,
        question: &str,
        results: &[SearchResult],
        history: &[ChatMessage],
    ) -> Vec<ChatMessage> {
        let context = format_context(results);
        build_messages(
            question,
            &context,
            history,
            self.settings.max_history_messages,
        )
    }

    /// One completion call. Any failure surfaces as [`RagError::Llm`].
    pub async fn generate_answer(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let request = ChatRequest {
            messages,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };
        self.llm.complete(&request).await.map_err(|err| match err {
            RagError::Llm(_) => err,
            other => RagError::llm(other),
        })
    }

    pub async fn ask(&self, request: AskRequest) -> Result<AskResponse> {
        let question = request.question.trim();
        if question.is_empty() {
            return Err(RagError::Validation("question must not be empty".to_string()));
        }
        let session_id = request.session_id.trim();
        if session_id.is_empty() {
            return Err(RagError::Validation("session_id must not be empty".to_string()));
        }

        let saved = self
            .conversations
            .append(session_id, MessageRole::User, question)
            .await?;

        let top_k = request.top_k.unwrap_or(self.settings.top_k);
        let retrieval = self
            .retrieve_context(question, request.document_ids.as_deref(), top_k)
            .await;

        let prior = self.prior_turns(session_id, &saved).await?;
        let messages = self.build_prompt(question, retrieval.results(), &prior);

        let answer = match self.generate_answer(messages).await {
            Ok(answer) => answer,
            Err(err) => {
                error!(session_id, error = %err, "answer generation failed");
                return Err(err);
            }
        };

        self.conversations
            .append(session_id, MessageRole::Assistant, &answer)
            .await?;

        let results = retrieval.results();
        let low_quality = is_low_quality(&answer, results);
        if low_quality {
            debug!(session_id, "answer flagged as low quality");
        }
        info!(
            session_id,
            sources = results.len(),
            retrieval = ?retrieval.status(),
            "question answered"
        );

        Ok(AskResponse {
            sources: format_sources(results),
            answer,
            session_id: session_id.to_string(),
            retrieval: retrieval.status(),
            low_quality,
        })
    }

    /// Prior turns for the prompt, excluding the message just saved.
    async fn prior_turns(
        &self,
        session_id: &str,
        current: &ConversationMessage,
    ) -> Result<Vec<ChatMessage>> {
        let window = self
            .conversations
            .history(session_id, self.settings.history_window)
            .await?;
        let prior: Vec<ConversationMessage> =
            window.into_iter().filter(|m| m.id != current.id).collect();
        Ok(format_history_for_llm(&prior))
    }

    // ============ Sessions ============

    pub async fn history(&self, session_id: &str, limit: usize) -> Result<Vec<ConversationMessage>> {
        self.conversations.history(session_id, limit).await
    }

    pub async fn clear_session(&self, session_id: &str) -> Result<usize> {
        let removed = self.conversations.clear(session_id).await?;
        info!(session_id, removed, "session cleared");
        Ok(removed)
    }

    pub async fn sessions(&self) -> Result<Vec<SessionSummary>> {
        self.conversations.sessions().await
    }

    pub async fn session_exists(&self, session_id: &str) -> Result<bool> {
        self.conversations.session_exists(session_id).await
    }

    /// Summary of one session; fails with [`RagError::SessionNotFound`] if it
    /// has no messages.
    pub async fn session(&self, session_id: &str) -> Result<SessionSummary> {
        self.sessions()
            .await?
            .into_iter()
            .find(|s| s.session_id == session_id)
            .ok_or_else(|| RagError::SessionNotFound(session_id.to_string()))
    }
}

/// Reformat retrieval results as citations, preserving order.
pub fn format_sources(results: &[SearchResult]) -> Vec<SourceAttribution> {
    results.iter().map(SourceAttribution::from).collect()
}

/// Advisory check: too short, or a refusal despite having context.
pub fn is_low_quality(answer: &str, context: &[SearchResult]) -> bool {
    let answer = answer.trim();
    if char_len(answer) < MIN_ANSWER_CHARS {
        return true;
    }
    let lower = answer.to_lowercase();
    let refused = REFUSAL_PHRASES.iter().any(|p| lower.contains(p));
    refused && !context.is_empty()
}
