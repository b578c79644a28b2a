//! Application context: the one place long-lived handles are built.
//!
//! [`AppContext::init`] opens the database, runs migrations, constructs the
//! embedding provider (loading local weights once), opens or creates the
//! vector collection with the provider's dimensionality, builds the LLM
//! client, and assembles a [`RagPipeline`]. [`AppContext::shutdown`] closes
//! the pool.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::sync::Arc;

use docqa_core::index::VectorIndex;
use docqa_core::llm::LlmClient;
use docqa_core::pipeline::{PipelineComponents, RagPipeline};

use crate::config::Config;
use crate::db;
use crate::embedding::create_provider;
use crate::llm::OpenAiCompatClient;
use crate::migrate::migrate_pool;
use crate::qdrant::QdrantVectorIndex;
use crate::sqlite::{SqliteConversationStore, SqliteDocumentStore, SqliteVectorIndex};

pub struct AppContext {
    pub config: Config,
    pub pipeline: RagPipeline,
    pool: SqlitePool,
}

impl AppContext {
    pub async fn init(config: Config) -> Result<Self> {
        let llm: Arc<dyn LlmClient> = Arc::new(OpenAiCompatClient::new(&config.llm)?);
        Self::init_with_llm(config, llm).await
    }

    /// Same as [`init`](Self::init) with a caller-supplied LLM client.
    pub async fn init_with_llm(config: Config, llm: Arc<dyn LlmClient>) -> Result<Self> {
        let settings = config.pipeline_settings()?;

        let pool = db::connect(&config).await?;
        migrate_pool(&pool)
            .await
            .context("Failed to run database migrations")?;

        let embedder = create_provider(&config.embedding)?;

        let index: Arc<dyn VectorIndex> = match config.vector.backend.as_str() {
            "qdrant" => Arc::new(QdrantVectorIndex::new(&config.vector)?),
            _ => Arc::new(SqliteVectorIndex::new(
                pool.clone(),
                config.vector.collection.clone(),
            )),
        };
        index
            .ensure_collection(embedder.dims())
            .await
            .with_context(|| {
                format!(
                    "Failed to open vector collection '{}'",
                    config.vector.collection
                )
            })?;

        tracing::info!(
            backend = %config.vector.backend,
            collection = %config.vector.collection,
            model = embedder.model_name(),
            dims = embedder.dims(),
            llm = llm.model_name(),
            "application initialized"
        );

        let pipeline = RagPipeline::new(
            PipelineComponents {
                embedder,
                index,
                conversations: Arc::new(SqliteConversationStore::new(pool.clone())),
                documents: Arc::new(SqliteDocumentStore::new(pool.clone())),
                llm,
            },
            settings,
        );

        Ok(Self {
            config,
            pipeline,
            pool,
        })
    }

    pub async fn shutdown(self) {
        self.pool.close().await;
        tracing::debug!("database pool closed");
    }
}
