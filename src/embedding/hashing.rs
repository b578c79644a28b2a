//! Deterministic feature-hashing embedder for offline use and tests.

use async_trait::async_trait;

use docqa_core::embedding::{normalize, EmbeddingProvider};
use docqa_core::Result;

pub(crate) const DEFAULT_DIMS: usize = 384;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Bag-of-words feature hashing into a fixed number of buckets.
///
/// Each lowercase alphanumeric token adds ±1 to bucket
/// `fnv1a(token) % dims`, the sign taken from the hash's top bit. Vectors
/// are L2-normalized, so texts sharing vocabulary score higher under cosine
/// similarity. Needs no model and no network.
pub struct HashingProvider {
    dims: usize,
}

impl HashingProvider {
    pub fn new(dims: Option<usize>) -> Self {
        Self {
            dims: dims.unwrap_or(DEFAULT_DIMS),
        }
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dims];
        for token in tokens(text) {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % self.dims as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        normalize(vector)
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(FNV_PRIME)
    })
}

#[async_trait]
impl EmbeddingProvider for HashingProvider {
    fn model_name(&self) -> &str {
        "feature-hash"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
