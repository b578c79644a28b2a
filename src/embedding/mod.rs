//! Embedding provider implementations.
//!
//! Concrete backends for [`docqa_core::embedding::EmbeddingProvider`]:
//! - **[`HashingProvider`]**: deterministic feature hashing; offline, no model.
//! - **[`OpenAIProvider`]**: the OpenAI embeddings API with batching, retry, and backoff.
//! - **[`OllamaProvider`]**: a local Ollama instance's `/api/embed` endpoint.
//! - **`LocalProvider`**: fastembed inference, loaded once at init
//!   (feature `local-embeddings-fastembed`).
//!
//! # Retry Strategy
//!
//! The OpenAI and Ollama providers use exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

mod hashing;
#[cfg(feature = "local-embeddings-fastembed")]
mod local;
mod remote;

pub use hashing::HashingProvider;
#[cfg(feature = "local-embeddings-fastembed")]
pub use local::LocalProvider;
pub use remote::{OllamaProvider, OpenAIProvider};

use anyhow::{bail, Result};
use std::sync::Arc;
use std::time::Duration;

use docqa_core::embedding::EmbeddingProvider;
use docqa_core::RagError;

use crate::config::EmbeddingConfig;

/// Create the [`EmbeddingProvider`] named by `config.provider`.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"hash"` | [`HashingProvider`] |
/// | `"openai"` | [`OpenAIProvider`] |
/// | `"ollama"` | [`OllamaProvider`] |
/// | `"local"` | `LocalProvider` (needs `--features local-embeddings-fastembed`) |
///
/// The local provider loads its model weights here, once.
pub fn create_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "hash" => Ok(Arc::new(HashingProvider::new(config.dims))),
        "openai" => Ok(Arc::new(OpenAIProvider::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaProvider::new(config)?)),
        #[cfg(feature = "local-embeddings-fastembed")]
        "local" => Ok(Arc::new(LocalProvider::new(config)?)),
        #[cfg(not(feature = "local-embeddings-fastembed"))]
        "local" => bail!(
            "Local embedding provider requires --features local-embeddings-fastembed"
        ),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

/// Backoff before retry `attempt` (1-based): 1s, 2s, 4s, ... capped at 32s.
pub(crate) fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1 << (attempt.saturating_sub(1)).min(5))
}

/// POST `body` as JSON and return the parsed response, retrying 429, 5xx,
/// and transport failures up to `max_retries` times.
pub(crate) async fn post_json_with_retry(
    client: &reqwest::Client,
    url: &str,
    bearer: Option<&str>,
    body: &serde_json::Value,
    max_retries: u32,
    service: &str,
) -> docqa_core::Result<serde_json::Value> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = backoff_delay(attempt);
            tracing::debug!(service, attempt, ?delay, "retrying embedding request");
            tokio::time::sleep(delay).await;
        }

        let mut request = client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body);
        if let Some(key) = bearer {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return response.json().await.map_err(|e| {
                        RagError::embedding(format!("{} returned invalid JSON: {}", service, e))
                    });
                }

                let body_text = response.text().await.unwrap_or_default();
                let err = RagError::embedding(format!(
                    "{} API error {}: {}",
                    service, status, body_text
                ));

                // Rate limited or server error: retry
                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(err);
                    continue;
                }
                return Err(err);
            }
            Err(e) => {
                last_err = Some(RagError::embedding(format!(
                    "{} connection error ({}): {}",
                    service, url, e
                )));
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| {
        RagError::embedding(format!("{} embedding failed after retries", service))
    }))
}

/// Values of a JSON number array as `f32`; non-numbers decode as `0.0`.
pub(crate) fn json_vector(value: &serde_json::Value) -> Option<Vec<f32>> {
    value
        .as_array()
        .map(|items| items.iter().map(|v| v.as_f64().unwrap_or(0.0) as f32).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(backoff_delay(1), Duration::from_secs(1));
        assert_eq!(backoff_delay(2), Duration::from_secs(2));
        assert_eq!(backoff_delay(4), Duration::from_secs(8));
        assert_eq!(backoff_delay(6), Duration::from_secs(32));
        assert_eq!(backoff_delay(12), Duration::from_secs(32));
    }

    #[test]
    fn default_config_builds_hashing_provider() {
        let provider = create_provider(&EmbeddingConfig::default()).unwrap();
        assert_eq!(provider.model_name(), "feature-hash");
        assert_eq!(provider.dims(), hashing::DEFAULT_DIMS);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let config = EmbeddingConfig {
            provider: "word2vec".to_string(),
            ..EmbeddingConfig::default()
        };
        let err = create_provider(&config).err().unwrap();
        assert!(err.to_string().contains("word2vec"));
    }

    #[cfg(not(feature = "local-embeddings-fastembed"))]
    #[test]
    fn local_provider_requires_feature() {
        let config = EmbeddingConfig {
            provider: "local".to_string(),
            ..EmbeddingConfig::default()
        };
        let err = create_provider(&config).err().unwrap();
        assert!(err.to_string().contains("local-embeddings-fastembed"));
    }

    #[test]
    fn json_vector_reads_numbers() {
        let value = serde_json::json!([0.5, -1, "x"]);
        assert_eq!(json_vector(&value).unwrap(), vec![0.5, -1.0, 0.0]);
        assert!(json_vector(&serde_json::json!({"a": 1})).is_none());
    }
}
