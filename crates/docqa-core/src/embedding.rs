//! Embedding provider trait and vector utilities.
//!
//! Defines the [`EmbeddingProvider`] trait that all embedding backends
//! implement, the input-validating entry points the pipeline calls
//! ([`embed_text`], [`embed_batch`], [`encode_query`]), and pure helpers for
//! vector serialization and similarity computation.
//!
//! Concrete provider implementations (hashing, OpenAI, Ollama, fastembed)
//! live in the `docqa` app crate.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{RagError, Result};

/// Trait for embedding providers.
///
/// The dimensionality is fixed when the provider is constructed and every
/// vector returned by [`embed_texts`](EmbeddingProvider::embed_texts) must
/// have exactly that length.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"all-MiniLM-L6-v2"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;
    /// Embed a batch of non-blank texts, one vector per input, in order.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Name and dimensionality of a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub model_name: String,
    pub dims: usize,
}

pub fn model_info(provider: &dyn EmbeddingProvider) -> ModelInfo {
    ModelInfo {
        model_name: provider.model_name().to_string(),
        dims: provider.dims(),
    }
}

/// Embed a single text. Blank input fails with
/// [`RagError::EmbeddingGeneration`].
pub async fn embed_text(provider: &dyn EmbeddingProvider, text: &str) -> Result<Vec<f32>> {
    if text.trim().is_empty() {
        return Err(RagError::embedding("Cannot embed empty text"));
    }
    let mut vectors = embed_checked(provider, &[text.to_string()]).await?;
    vectors
        .pop()
        .ok_or_else(|| RagError::embedding("provider returned no embedding"))
}

/// Embed a batch of texts.
///
/// Rejects an empty batch. Blank entries are dropped before encoding, so the
/// output can be shorter than the input; the call fails only if every entry
/// is blank.
pub async fn embed_batch(provider: &dyn EmbeddingProvider, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Err(RagError::embedding("Cannot embed empty list"));
    }
    let valid: Vec<String> = texts
        .iter()
        .filter(|t| !t.trim().is_empty())
        .cloned()
        .collect();
    if valid.is_empty() {
        return Err(RagError::embedding("All texts are empty"));
    }
    if valid.len() < texts.len() {
        tracing::debug!(
            dropped = texts.len() - valid.len(),
            "dropping blank entries from embedding batch"
        );
    }
    embed_checked(provider, &valid).await
}

/// Embed a question for retrieval: [`embed_text`] followed by L2
/// normalization.
pub async fn encode_query(provider: &dyn EmbeddingProvider, text: &str) -> Result<Vec<f32>> {
    let vector = embed_text(provider, text).await?;
    Ok(normalize(vector))
}

async fn embed_checked(provider: &dyn EmbeddingProvider, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let vectors = provider.embed_texts(texts).await?;
    if vectors.len() != texts.len() {
        return Err(RagError::embedding(format!(
            "provider returned {} embeddings for {} texts",
            vectors.len(),
            texts.len()
        )));
    }
    let dims = provider.dims();
    if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
        return Err(RagError::embedding(format!(
            "provider returned a {}-dimensional vector, expected {}",
            bad.len(),
            dims
        )));
    }
    Ok(vectors)
}

pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scale `v` to unit length. A zero vector is returned unchanged.
pub fn normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm = l2_norm(&v);
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
    v
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// # Example
///
/// ```rust
/// use docqa_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12);
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Decode a BLOB produced by [`vec_to_blob`].
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity in `[-1.0, 1.0]`.
///
/// Returns `0.0` when either vector has zero norm, or when the vectors are
/// empty or of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Maps text to `[len, vowels, 0]` and the literal `"zero"` to the zero
    /// vector.
    struct CountingProvider;

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        fn model_name(&self) -> &str {
            "counting"
        }
        fn dims(&self) -> usize {
            3
        }
        async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    if t == "zero" {
                        return vec![0.0, 0.0, 0.0];
                    }
                    let vowels = t.chars().filter(|c| "aeiou".contains(*c)).count();
                    vec![t.len() as f32, vowels as f32, 0.0]
                })
                .collect())
        }
    }

    struct WrongDims;

    #[async_trait]
    impl EmbeddingProvider for WrongDims {
        fn model_name(&self) -> &str {
            "wrong"
        }
        fn dims(&self) -> usize {
            4
        }
        async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 2.0]).collect())
        }
    }

    #[tokio::test]
    async fn embedding_is_deterministic() {
        let a = embed_text(&CountingProvider, "hello there").await.unwrap();
        let b = embed_text(&CountingProvider, "hello there").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn blank_text_is_rejected() {
        for text in ["", "   ", "\n\t"] {
            let err = embed_text(&CountingProvider, text).await.unwrap_err();
            assert_eq!(err.tag(), "embedding_generation_error");
        }
    }

    #[tokio::test]
    async fn batch_drops_blank_entries() {
        let texts = vec!["alpha".to_string(), "  ".to_string(), "beta".to_string()];
        let vectors = embed_batch(&CountingProvider, &texts).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0][0], 5.0);
        assert_eq!(vectors[1][0], 4.0);
    }

    #[tokio::test]
    async fn batch_rejects_empty_and_all_blank() {
        assert!(embed_batch(&CountingProvider, &[]).await.is_err());
        let err = embed_batch(&CountingProvider, &["".to_string(), " ".to_string()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("All texts are empty"));
    }

    #[tokio::test]
    async fn query_vectors_are_unit_length() {
        let v = encode_query(&CountingProvider, "what is alpha about?").await.unwrap();
        assert!((l2_norm(&v) - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn zero_query_vector_is_unchanged() {
        let v = encode_query(&CountingProvider, "zero").await.unwrap();
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    #[tokio::test]
    async fn dimension_mismatch_is_an_error() {
        let err = embed_text(&WrongDims, "text").await.unwrap_err();
        assert!(err.to_string().contains("expected 4"));
    }

    #[test]
    fn model_info_reports_provider_metadata() {
        let info = model_info(&CountingProvider);
        assert_eq!(info.model_name, "counting");
        assert_eq!(info.dims, 3);
    }

    #[test]
    fn blob_preserves_values() {
        let vec = vec![1.0f32, -2.5, 3.125, 0.0, -0.001];
        assert_eq!(blob_to_vec(&vec_to_blob(&vec)), vec);
    }

    #[test]
    fn cosine_identical_orthogonal_opposite() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_zero_norm_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    }
}
