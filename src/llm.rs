//! OpenAI-compatible chat completion client.
//!
//! Works against any `/chat/completions` endpoint speaking the OpenAI wire
//! format: Groq, OpenAI, LM Studio, Ollama's `/v1`. No retries; every
//! failure surfaces as [`RagError::Llm`].

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use docqa_core::llm::{ChatMessage, ChatRequest, LlmClient};
use docqa_core::RagError;

use crate::config::LlmConfig;

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: Option<CompletionMessage>,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

pub struct OpenAiCompatClient {
    model: String,
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    /// Build a client from config. A missing API key is only a warning
    /// here, since local servers accept unauthenticated requests.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            tracing::warn!(
                env = %config.api_key_env,
                "LLM API key not set; requests will be sent without authorization"
            );
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key,
            client,
        })
    }
}

fn extract_content(response: CompletionResponse) -> docqa_core::Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or_else(|| RagError::llm("response has no choices[0].message.content"))
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ChatRequest) -> docqa_core::Result<String> {
        let body = CompletionRequest {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            top_p: 1.0,
            stream: false,
        };

        let mut req = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        let resp = req
            .send()
            .await
            .map_err(|e| RagError::llm(format!("request to {} failed: {}", self.endpoint, e)))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(RagError::llm(format!("API error {}: {}", status, text)));
        }

        let parsed: CompletionResponse = resp
            .json()
            .await
            .map_err(|e| RagError::llm(format!("invalid response body: {}", e)))?;
        let answer = extract_content(parsed)?;
        tracing::debug!(model = %self.model, chars = answer.len(), "completion received");
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_matches_wire_format() {
        let messages = vec![ChatMessage::system("rules"), ChatMessage::user("hi")];
        let body = CompletionRequest {
            model: "llama-3.1-8b-instant",
            messages: &messages,
            temperature: 0.7,
            max_tokens: 1000,
            top_p: 1.0,
            stream: false,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "llama-3.1-8b-instant");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["max_tokens"], 1000);
        assert_eq!(json["top_p"], 1.0);
        assert_eq!(json["stream"], false);
    }

    #[test]
    fn content_is_taken_from_first_choice() {
        let parsed: CompletionResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Paris."}}]
        }))
        .unwrap();
        assert_eq!(extract_content(parsed).unwrap(), "Paris.");
    }

    #[test]
    fn missing_content_is_an_llm_error() {
        let parsed: CompletionResponse =
            serde_json::from_value(serde_json::json!({"choices": []})).unwrap();
        assert_eq!(extract_content(parsed).unwrap_err().tag(), "llm_error");

        let parsed: CompletionResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        }))
        .unwrap();
        assert!(extract_content(parsed).is_err());
    }

    #[test]
    fn endpoint_joins_base_url() {
        let config = LlmConfig {
            base_url: "http://localhost:1234/v1/".to_string(),
            api_key_env: "DOCQA_TEST_UNSET_KEY".to_string(),
            ..LlmConfig::default()
        };
        let client = OpenAiCompatClient::new(&config).unwrap();
        assert_eq!(client.endpoint, "http://localhost:1234/v1/chat/completions");
        assert!(client.api_key.is_none());
    }
}
