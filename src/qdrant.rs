//! Qdrant vector index over the REST API.
//!
//! Endpoints used:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | existence / dims | `GET /collections/{name}` |
//! | create | `PUT /collections/{name}` with cosine distance |
//! | upsert | `PUT /collections/{name}/points?wait=true` |
//! | search | `POST /collections/{name}/points/search` |
//! | count | `POST /collections/{name}/points/count` (exact) |
//! | delete | `POST /collections/{name}/points/delete?wait=true` by filter |
//!
//! Document restriction uses a `match.any` condition on the `document_id`
//! payload field.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

use docqa_core::index::{CollectionInfo, VectorIndex};
use docqa_core::models::{SearchResult, VectorEntry};
use docqa_core::RagError;

use crate::config::VectorConfig;

pub struct QdrantVectorIndex {
    base_url: String,
    collection: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl QdrantVectorIndex {
    pub fn new(config: &VectorConfig) -> Result<Self> {
        let api_key = config
            .api_key_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok())
            .filter(|k| !k.trim().is_empty());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            collection: config.collection.clone(),
            api_key,
            client,
        })
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}/collections/{}{}", self.base_url, self.collection, suffix)
    }

    /// Send a request and return `(status, body)`. Transport failures map to
    /// a vector-store error tagged with `operation`.
    async fn send(
        &self,
        operation: &str,
        method: Method,
        url: String,
        body: Option<Value>,
    ) -> docqa_core::Result<(StatusCode, Value)> {
        let mut req = self.client.request(method, &url);
        if let Some(key) = &self.api_key {
            req = req.header("api-key", key);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| RagError::vector_store(operation, format!("{}: {}", url, e)))?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        let value = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok((status, value))
    }

    /// Like [`send`](Self::send) but any non-2xx status is an error.
    async fn send_ok(
        &self,
        operation: &str,
        method: Method,
        url: String,
        body: Option<Value>,
    ) -> docqa_core::Result<Value> {
        let (status, value) = self.send(operation, method, url, body).await?;
        if !status.is_success() {
            return Err(RagError::vector_store(
                operation,
                format!("Qdrant returned {}: {}", status, value),
            ));
        }
        Ok(value)
    }

    async fn existing_dims(&self, operation: &str) -> docqa_core::Result<Option<usize>> {
        let (status, value) = self.send(operation, Method::GET, self.url(""), None).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(RagError::vector_store(
                operation,
                format!("Qdrant returned {}: {}", status, value),
            ));
        }
        Ok(collection_dims(&value))
    }
}

/// `result.config.params.vectors.size` of a collection description.
fn collection_dims(value: &Value) -> Option<usize> {
    value
        .pointer("/result/config/params/vectors/size")
        .and_then(Value::as_u64)
        .map(|d| d as usize)
}

fn document_filter(document_ids: &[String]) -> Value {
    json!({
        "must": [{
            "key": "document_id",
            "match": { "any": document_ids }
        }]
    })
}

fn point_json(entry: &VectorEntry) -> Value {
    json!({
        "id": entry.id,
        "vector": entry.vector,
        "payload": {
            "document_id": entry.payload.document_id,
            "chunk_index": entry.payload.chunk_index,
            "chunk_text": entry.payload.chunk_text,
            "document_name": entry.payload.document_name,
        }
    })
}

fn parse_hits(value: &Value) -> docqa_core::Result<Vec<SearchResult>> {
    let points = value
        .get("result")
        .and_then(Value::as_array)
        .ok_or_else(|| RagError::vector_store("search", "response has no result array"))?;

    Ok(points
        .iter()
        .map(|point| {
            let payload = point.get("payload").cloned().unwrap_or(Value::Null);
            let text = |key: &str| {
                payload
                    .get(key)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            let id = match point.get("id") {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            };
            SearchResult {
                id,
                score: point.get("score").and_then(Value::as_f64).unwrap_or(0.0) as f32,
                document_id: text("document_id"),
                document_name: text("document_name"),
                chunk_index: payload
                    .get("chunk_index")
                    .and_then(Value::as_u64)
                    .unwrap_or(0) as usize,
                chunk_text: text("chunk_text"),
            }
        })
        .collect())
}

#[async_trait]
impl VectorIndex for QdrantVectorIndex {
    fn collection_name(&self) -> &str {
        &self.collection
    }

    async fn collection_exists(&self) -> docqa_core::Result<bool> {
        Ok(self.existing_dims("collection_exists").await?.is_some())
    }

    async fn ensure_collection(&self, dims: usize) -> docqa_core::Result<()> {
        match self.existing_dims("create_collection").await? {
            Some(existing) if existing != dims => Err(RagError::vector_store(
                "create_collection",
                format!(
                    "collection '{}' has {} dimensions, provider produces {}",
                    self.collection, existing, dims
                ),
            )),
            Some(_) => Ok(()),
            None => {
                let body = json!({ "vectors": { "size": dims, "distance": "Cosine" } });
                self.send_ok("create_collection", Method::PUT, self.url(""), Some(body))
                    .await?;
                tracing::info!(collection = %self.collection, dims, "created Qdrant collection");
                Ok(())
            }
        }
    }

    async fn upsert(&self, entries: Vec<VectorEntry>) -> docqa_core::Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let points: Vec<Value> = entries.iter().map(point_json).collect();
        self.send_ok(
            "upsert",
            Method::PUT,
            self.url("/points?wait=true"),
            Some(json!({ "points": points })),
        )
        .await?;
        Ok(())
    }

    async fn search(
        &self,
        query: &[f32],
        limit: usize,
        document_ids: Option<&[String]>,
    ) -> docqa_core::Result<Vec<SearchResult>> {
        if matches!(document_ids, Some(ids) if ids.is_empty()) {
            return Ok(Vec::new());
        }

        let mut body = json!({
            "vector": query,
            "limit": limit,
            "with_payload": true,
        });
        if let Some(ids) = document_ids {
            body["filter"] = document_filter(ids);
        }

        let value = self
            .send_ok("search", Method::POST, self.url("/points/search"), Some(body))
            .await?;
        parse_hits(&value)
    }

    async fn delete_by_document_id(&self, document_id: &str) -> docqa_core::Result<usize> {
        let removed = self.count(Some(document_id)).await?;
        if removed == 0 {
            return Ok(0);
        }

        let filter = document_filter(&[document_id.to_string()]);
        self.send_ok(
            "delete_by_document_id",
            Method::POST,
            self.url("/points/delete?wait=true"),
            Some(json!({ "filter": filter })),
        )
        .await?;
        tracing::debug!(collection = %self.collection, document_id, removed, "deleted vectors");
        Ok(removed)
    }

    async fn count(&self, document_id: Option<&str>) -> docqa_core::Result<usize> {
        let mut body = json!({ "exact": true });
        if let Some(id) = document_id {
            body["filter"] = document_filter(&[id.to_string()]);
        }
        let value = self
            .send_ok("count", Method::POST, self.url("/points/count"), Some(body))
            .await?;
        value
            .pointer("/result/count")
            .and_then(Value::as_u64)
            .map(|c| c as usize)
            .ok_or_else(|| RagError::vector_store("count", "response has no result.count"))
    }

    async fn collection_info(&self) -> docqa_core::Result<CollectionInfo> {
        let dims = self
            .existing_dims("collection_info")
            .await?
            .ok_or_else(|| {
                RagError::vector_store(
                    "collection_info",
                    format!("collection '{}' does not exist", self.collection),
                )
            })?;
        Ok(CollectionInfo {
            name: self.collection.clone(),
            dims,
            entries: self.count(None).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_uses_match_any_on_document_id() {
        let filter = document_filter(&["a".to_string(), "b".to_string()]);
        assert_eq!(filter["must"][0]["key"], "document_id");
        assert_eq!(filter["must"][0]["match"]["any"], json!(["a", "b"]));
    }

    #[test]
    fn dims_come_from_collection_config() {
        let value = json!({
            "result": { "config": { "params": { "vectors": { "size": 384, "distance": "Cosine" } } } },
            "status": "ok"
        });
        assert_eq!(collection_dims(&value), Some(384));
        assert_eq!(collection_dims(&json!({"result": {}})), None);
    }

    #[test]
    fn hits_carry_payload_fields() {
        let value = json!({
            "result": [
                {
                    "id": "5c56c793-69f3-4fbf-87e6-c4bf54c28c26",
                    "score": 0.91,
                    "payload": {
                        "document_id": "doc-1",
                        "chunk_index": 2,
                        "chunk_text": "Ownership rules.",
                        "document_name": "rust.pdf"
                    }
                },
                { "id": 7, "score": 0.5, "payload": {} }
            ]
        });
        let hits = parse_hits(&value).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document_id, "doc-1");
        assert_eq!(hits[0].chunk_index, 2);
        assert!((hits[0].score - 0.91).abs() < 1e-6);
        assert_eq!(hits[1].id, "7");
        assert_eq!(hits[1].document_name, "");
    }

    #[test]
    fn url_targets_collection() {
        let index = QdrantVectorIndex::new(&VectorConfig {
            url: "http://qdrant:6333/".to_string(),
            collection: "papers".to_string(),
            ..VectorConfig::default()
        })
        .unwrap();
        assert_eq!(
            index.url("/points/search"),
            "http://qdrant:6333/collections/papers/points/search"
        );
    }
}
