use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use docqa_core::chunk::ChunkingParams;
use docqa_core::conversation::memory::InMemoryConversationStore;
use docqa_core::conversation::ConversationStore;
use docqa_core::embedding::EmbeddingProvider;
use docqa_core::index::memory::InMemoryVectorIndex;
use docqa_core::index::{CollectionInfo, VectorIndex};
use docqa_core::llm::{ChatRequest, LlmClient};
use docqa_core::models::{ChunkingStrategy, MessageRole, SearchResult, VectorEntry};
use docqa_core::pipeline::{
    AskRequest, PipelineComponents, PipelineSettings, RagPipeline, RetrievalStatus,
};
use docqa_core::prompt::{NO_CONTEXT, SYSTEM_PROMPT};
use docqa_core::store::memory::InMemoryDocumentStore;
use docqa_core::store::DocumentStore;
use docqa_core::{RagError, Result};

const DIMS: usize = 32;

/// Bag-of-words embedder: each lowercase word adds 1.0 to a bucket chosen
/// by its byte sum.
struct KeywordEmbedder;

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    fn model_name(&self) -> &str {
        "keyword-test"
    }
    fn dims(&self) -> usize {
        DIMS
    }
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0.0f32; DIMS];
                for word in text
                    .to_lowercase()
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|w| !w.is_empty())
                {
                    let bucket = word.bytes().map(|b| b as usize).sum::<usize>() % DIMS;
                    v[bucket] += 1.0;
                }
                v
            })
            .collect())
    }
}

/// Replies from a script (falling back to a fixed answer) and records every
/// request.
#[derive(Default)]
struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedLlm {
    fn failing_once() -> Self {
        let llm = Self::default();
        llm.replies
            .lock()
            .unwrap()
            .push_back(Err(RagError::llm("upstream returned 503")));
        llm
    }

    fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(reply) => reply,
            None => Ok("Alpha is a project about vector retrieval in Rust.".to_string()),
        }
    }
}

/// Delegates to an in-memory index but refuses every upsert.
struct RejectingIndex(InMemoryVectorIndex);

#[async_trait]
impl VectorIndex for RejectingIndex {
    fn collection_name(&self) -> &str {
        self.0.collection_name()
    }
    async fn collection_exists(&self) -> Result<bool> {
        self.0.collection_exists().await
    }
    async fn ensure_collection(&self, dims: usize) -> Result<()> {
        self.0.ensure_collection(dims).await
    }
    async fn upsert(&self, _entries: Vec<VectorEntry>) -> Result<()> {
        Err(RagError::vector_store("upsert", "connection refused"))
    }
    async fn search(
        &self,
        query: &[f32],
        limit: usize,
        document_ids: Option<&[String]>,
    ) -> Result<Vec<SearchResult>> {
        self.0.search(query, limit, document_ids).await
    }
    async fn delete_by_document_id(&self, document_id: &str) -> Result<usize> {
        self.0.delete_by_document_id(document_id).await
    }
    async fn count(&self, document_id: Option<&str>) -> Result<usize> {
        self.0.count(document_id).await
    }
    async fn collection_info(&self) -> Result<CollectionInfo> {
        self.0.collection_info().await
    }
}

struct Harness {
    pipeline: RagPipeline,
    llm: Arc<ScriptedLlm>,
    conversations: Arc<InMemoryConversationStore>,
    documents: Arc<InMemoryDocumentStore>,
}

fn settings() -> PipelineSettings {
    PipelineSettings {
        chunking: ChunkingParams::new(60, 10),
        ..PipelineSettings::default()
    }
}

async fn harness_with(index: Arc<dyn VectorIndex>, llm: ScriptedLlm, create_collection: bool) -> Harness {
    if create_collection {
        index.ensure_collection(DIMS).await.unwrap();
    }
    let llm = Arc::new(llm);
    let conversations = Arc::new(InMemoryConversationStore::new());
    let documents = Arc::new(InMemoryDocumentStore::new());
    let pipeline = RagPipeline::new(
        PipelineComponents {
            embedder: Arc::new(KeywordEmbedder),
            index,
            conversations: conversations.clone(),
            documents: documents.clone(),
            llm: llm.clone(),
        },
        settings(),
    );
    Harness {
        pipeline,
        llm,
        conversations,
        documents,
    }
}

async fn harness() -> Harness {
    harness_with(
        Arc::new(InMemoryVectorIndex::default()),
        ScriptedLlm::default(),
        true,
    )
    .await
}

const ALPHA: &str = "Alpha is a retrieval project for document search.\n\n\
Alpha stores vectors and ranks chunks by cosine score.\n\n\
Alpha answers questions with cited alpha sources.";

const BETA: &str = "Beta is a gardening journal about tomatoes.\n\n\
Beta covers watering schedules and soil health.";

#[tokio::test]
async fn ingest_reports_chunks_and_stores_metadata() {
    let h = harness().await;
    let report = h
        .pipeline
        .ingest_text("alpha.txt", ALPHA.len() as u64, ALPHA, None)
        .await
        .unwrap();

    assert_eq!(report.chunks_created, 3);
    assert_eq!(report.chunking_strategy, ChunkingStrategy::Recursive);
    assert_eq!(report.total_characters, ALPHA.chars().count());

    let doc = h.pipeline.get_document(&report.document_id).await.unwrap();
    assert_eq!(doc.filename, "alpha.txt");
    assert_eq!(doc.chunk_count, 3);

    let chunks = h.pipeline.document_chunks(&report.document_id).await.unwrap();
    let indices: Vec<usize> = chunks.iter().map(|c| c.chunk_index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert_eq!(
        h.pipeline.collection_info().await.unwrap().entries,
        3
    );
}

#[tokio::test]
async fn sources_come_from_the_only_document_in_score_order() {
    let h = harness().await;
    let alpha = h
        .pipeline
        .ingest_text("alpha.txt", 0, ALPHA, None)
        .await
        .unwrap();

    let response = h
        .pipeline
        .ask(AskRequest::new("What is Alpha about?", "s1"))
        .await
        .unwrap();

    assert_eq!(response.retrieval, RetrievalStatus::Found);
    assert!(!response.sources.is_empty());
    assert!(response
        .sources
        .iter()
        .all(|s| s.document_id == alpha.document_id && s.document_name == "alpha.txt"));
    for pair in response.sources.windows(2) {
        assert!(pair[0].similarity_score >= pair[1].similarity_score);
    }
    assert!(!response.low_quality);
    assert_eq!(response.session_id, "s1");
}

#[tokio::test]
async fn document_filter_restricts_sources() {
    let h = harness().await;
    let alpha = h.pipeline.ingest_text("alpha.txt", 0, ALPHA, None).await.unwrap();
    let beta = h.pipeline.ingest_text("beta.txt", 0, BETA, None).await.unwrap();

    let mut request = AskRequest::new("How are tomatoes watered?", "s1");
    request.document_ids = Some(vec![alpha.document_id.clone()]);
    let response = h.pipeline.ask(request).await.unwrap();
    assert!(response
        .sources
        .iter()
        .all(|s| s.document_id != beta.document_id));

    // An empty filter list searches everything.
    let mut request = AskRequest::new("How are tomatoes watered?", "s2");
    request.document_ids = Some(Vec::new());
    let response = h.pipeline.ask(request).await.unwrap();
    assert!(response
        .sources
        .iter()
        .any(|s| s.document_id == beta.document_id));
}

#[tokio::test]
async fn first_question_prompt_has_only_system_and_user_turns() {
    let h = harness().await;
    h.pipeline.ingest_text("alpha.txt", 0, ALPHA, None).await.unwrap();
    h.pipeline
        .ask(AskRequest::new("What is Alpha about?", "fresh"))
        .await
        .unwrap();

    let requests = h.llm.requests();
    assert_eq!(requests.len(), 1);
    let messages = &requests[0].messages;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, MessageRole::System);
    assert_eq!(messages[0].content, SYSTEM_PROMPT);
    assert_eq!(messages[1].role, MessageRole::User);
    assert!(messages[1].content.contains("[Source 1 - alpha.txt (relevance: "));
    assert!(messages[1].content.contains("Question: What is Alpha about?"));
    assert_eq!(requests[0].temperature, 0.7);
    assert_eq!(requests[0].max_tokens, 1000);
}

#[tokio::test]
async fn follow_up_includes_prior_turns_but_not_current_question() {
    let h = harness().await;
    h.pipeline
        .ask(AskRequest::new("What is Alpha?", "s1"))
        .await
        .unwrap();
    h.pipeline
        .ask(AskRequest::new("And who uses it?", "s1"))
        .await
        .unwrap();

    let requests = h.llm.requests();
    let messages = &requests[1].messages;
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[1].role, MessageRole::User);
    assert_eq!(messages[1].content, "What is Alpha?");
    assert_eq!(messages[2].role, MessageRole::Assistant);
    assert!(messages[3].content.contains("Question: And who uses it?"));
    assert!(!messages[1..3]
        .iter()
        .any(|m| m.content == "And who uses it?"));
}

#[tokio::test]
async fn prompt_history_is_capped_at_five_turns() {
    let h = harness().await;
    for i in 0..4 {
        h.pipeline
            .ask(AskRequest::new(format!("question {}", i), "s1"))
            .await
            .unwrap();
    }
    let requests = h.llm.requests();
    let last = requests.last().unwrap();
    // 6 prior messages exist; only the last 5 make it into the prompt.
    assert_eq!(last.messages.len(), 7);
    assert_eq!(last.messages[1].role, MessageRole::Assistant);
}

#[tokio::test]
async fn clearing_a_session_reports_removed_messages() {
    let h = harness().await;
    for i in 0..7 {
        let role = if i % 2 == 0 {
            MessageRole::User
        } else {
            MessageRole::Assistant
        };
        h.conversations
            .append("s3", role, &format!("message {}", i))
            .await
            .unwrap();
    }

    assert_eq!(h.pipeline.clear_session("s3").await.unwrap(), 7);
    assert!(h.pipeline.history("s3", 50).await.unwrap().is_empty());
    assert!(!h.pipeline.session_exists("s3").await.unwrap());
    let err = h.pipeline.session("s3").await.unwrap_err();
    assert_eq!(err.tag(), "session_not_found");
}

#[tokio::test]
async fn generation_failure_keeps_the_user_message() {
    let h = harness_with(
        Arc::new(InMemoryVectorIndex::default()),
        ScriptedLlm::failing_once(),
        true,
    )
    .await;

    let err = h
        .pipeline
        .ask(AskRequest::new("What is Alpha?", "s1"))
        .await
        .unwrap_err();
    assert_eq!(err.tag(), "llm_error");

    let history = h.pipeline.history("s1", 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].role, MessageRole::User);
    assert_eq!(history[0].message, "What is Alpha?");
}

#[tokio::test]
async fn retrieval_failure_degrades_to_empty_context() {
    // The collection was never created, so every search fails.
    let h = harness_with(
        Arc::new(InMemoryVectorIndex::default()),
        ScriptedLlm::default(),
        false,
    )
    .await;

    let response = h
        .pipeline
        .ask(AskRequest::new("What is Alpha?", "s1"))
        .await
        .unwrap();
    assert_eq!(response.retrieval, RetrievalStatus::Degraded);
    assert!(response.sources.is_empty());

    let requests = h.llm.requests();
    assert!(requests[0].messages[1].content.contains(NO_CONTEXT));
    assert_eq!(h.pipeline.history("s1", 10).await.unwrap().len(), 2);
}

#[tokio::test]
async fn empty_index_reports_empty_retrieval() {
    let h = harness().await;
    let response = h
        .pipeline
        .ask(AskRequest::new("Anything there?", "s1"))
        .await
        .unwrap();
    assert_eq!(response.retrieval, RetrievalStatus::Empty);
    assert!(response.sources.is_empty());
}

#[tokio::test]
async fn blank_question_is_rejected_before_anything_is_saved() {
    let h = harness().await;
    let err = h
        .pipeline
        .ask(AskRequest::new("   ", "s1"))
        .await
        .unwrap_err();
    assert_eq!(err.tag(), "validation_error");
    assert!(h.pipeline.history("s1", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_vector_insert_rolls_back_metadata() {
    let index = RejectingIndex(InMemoryVectorIndex::default());
    let h = harness_with(Arc::new(index), ScriptedLlm::default(), true).await;

    let err = h
        .pipeline
        .ingest_text("alpha.txt", 0, ALPHA, Some(ChunkingStrategy::Fixed))
        .await
        .unwrap_err();
    assert_eq!(err.tag(), "vector_store_error");
    assert_eq!(h.documents.count_documents().await.unwrap(), 0);
}

#[tokio::test]
async fn delete_removes_vectors_and_metadata() {
    let h = harness().await;
    let alpha = h.pipeline.ingest_text("alpha.txt", 0, ALPHA, None).await.unwrap();
    let beta = h.pipeline.ingest_text("beta.txt", 0, BETA, None).await.unwrap();

    let report = h.pipeline.delete_document(&alpha.document_id).await.unwrap();
    assert_eq!(report.vectors_removed, 3);
    assert_eq!(report.filename, "alpha.txt");

    let page = h.pipeline.list_documents(0, 10).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.documents[0].id, beta.document_id);

    let response = h
        .pipeline
        .ask(AskRequest::new("What is Alpha about?", "s1"))
        .await
        .unwrap();
    assert!(response
        .sources
        .iter()
        .all(|s| s.document_id != alpha.document_id));

    let err = h.pipeline.delete_document(&alpha.document_id).await.unwrap_err();
    assert_eq!(err.tag(), "document_not_found");
}

#[tokio::test]
async fn blank_text_fails_before_anything_is_stored() {
    let h = harness().await;
    let err = h
        .pipeline
        .ingest_text("empty.txt", 0, "   ", None)
        .await
        .unwrap_err();
    assert_eq!(err.tag(), "chunking_failed_error");
    assert_eq!(h.documents.count_documents().await.unwrap(), 0);
}

#[tokio::test]
async fn blank_windows_are_skipped_and_indices_stay_contiguous() {
    let h = harness().await;
    let text = format!("alpha words here{}beta words there", " ".repeat(150));

    let report = h
        .pipeline
        .ingest_text("gappy.txt", 0, &text, Some(ChunkingStrategy::Fixed))
        .await
        .unwrap();
    assert_eq!(report.chunks_created, 2);

    let chunks = h.pipeline.document_chunks(&report.document_id).await.unwrap();
    let indices: Vec<usize> = chunks.iter().map(|c| c.chunk_index).collect();
    assert_eq!(indices, vec![0, 1]);
    assert!(chunks[0].text.starts_with("alpha"));
    assert!(chunks[1].text.ends_with("there"));
    assert!(chunks.iter().all(|c| !c.text.trim().is_empty()));
}
