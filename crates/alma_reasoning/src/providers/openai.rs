//! OpenAI-compatible oracle: `/chat/completions` for generation and
//! `/embeddings` for vectors.
//!
//! Ollama serves the same API under `http://localhost:11434/v1`, so the
//! `ollama` provider is this client with a different default base URL and no
//! API key.

use crate::retry::{send_with_retry, RetryPolicy};
use alma_core::config::LlmConfig;
use alma_core::Oracle;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::env;
use std::time::Duration;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

#[derive(Debug, Clone)]
pub struct OpenAiOracle {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    embedding_model: String,
    max_tokens: u32,
    temperature: f32,
    retry: RetryPolicy,
    label: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiOracle {
    /// Hosted OpenAI (or any compatible endpoint via `base_url`). Reads the
    /// key from `ALMA_API_KEY`, then `OPENAI_API_KEY`.
    pub fn openai(config: &LlmConfig) -> Result<Self> {
        let api_key = env::var("ALMA_API_KEY")
            .or_else(|_| env::var("OPENAI_API_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty());
        if api_key.is_none() && config.base_url.is_none() {
            anyhow::bail!("No API key: set ALMA_API_KEY or OPENAI_API_KEY");
        }
        Self::build(config, api_key, OPENAI_BASE_URL, "openai")
    }

    /// Local Ollama. No key required.
    pub fn ollama(config: &LlmConfig) -> Result<Self> {
        let api_key = env::var("ALMA_API_KEY").ok().filter(|k| !k.trim().is_empty());
        Self::build(config, api_key, OLLAMA_BASE_URL, "ollama")
    }

    fn build(
        config: &LlmConfig,
        api_key: Option<String>,
        default_base: &str,
        label: &'static str,
    ) -> Result<Self> {
        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(default_base)
            .trim_end_matches('/')
            .to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        tracing::info!("Oracle: {} model={} at {}", label, config.model, base_url);

        Ok(Self {
            client,
            api_key,
            base_url,
            model: config.model.clone(),
            embedding_model: config.embedding_model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            retry: RetryPolicy::with_attempts(config.max_attempts),
            label,
        })
    }

    fn post(&self, path: &str, body: &Value) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .post(format!("{}/{}", self.base_url, path))
            .json(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        req
    }

    fn chat_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        })
    }

    fn embedding_body(&self, text: &str) -> Value {
        json!({
            "model": self.embedding_model,
            "input": text,
        })
    }
}

fn chat_text(resp: ChatResponse) -> Result<String> {
    resp.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("Chat completion had no content"))
}

fn first_embedding(resp: EmbeddingResponse) -> Result<Vec<f32>> {
    resp.data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| anyhow::anyhow!("Embedding response had no vector"))
}

#[async_trait]
impl Oracle for OpenAiOracle {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = self.chat_body(prompt);
        let label = format!("{} chat", self.label);
        let response = send_with_retry(&self.retry, &label, || self.post("chat/completions", &body))
            .await?;
        let parsed: ChatResponse = response
            .json()
            .await
            .context("Failed to decode chat completion")?;
        chat_text(parsed)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = self.embedding_body(text);
        let label = format!("{} embeddings", self.label);
        let response = send_with_retry(&self.retry, &label, || self.post("embeddings", &body))
            .await?;
        let parsed: EmbeddingResponse = response
            .json()
            .await
            .context("Failed to decode embedding response")?;
        first_embedding(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local() -> OpenAiOracle {
        let config = LlmConfig {
            base_url: Some("http://127.0.0.1:9/v1/".into()),
            model: "m".into(),
            embedding_model: "e".into(),
            ..LlmConfig::default()
        };
        OpenAiOracle::ollama(&config).unwrap()
    }

    #[test]
    fn test_base_url_trimmed() {
        assert_eq!(local().base_url, "http://127.0.0.1:9/v1");
    }

    #[test]
    fn test_request_bodies() {
        let o = local();
        let chat = o.chat_body("hola");
        assert_eq!(chat["model"], "m");
        assert_eq!(chat["messages"][0]["role"], "user");
        assert_eq!(chat["messages"][0]["content"], "hola");
        assert_eq!(chat["max_tokens"], 1024);

        let emb = o.embedding_body("pizza");
        assert_eq!(emb["model"], "e");
        assert_eq!(emb["input"], "pizza");
    }

    #[test]
    fn test_chat_response_decoding() {
        let resp: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": "{\"public_response\":\"hola\"}"}}]
        }))
        .unwrap();
        assert_eq!(chat_text(resp).unwrap(), "{\"public_response\":\"hola\"}");

        let empty: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": null}}]
        }))
        .unwrap();
        assert!(chat_text(empty).is_err());
    }

    #[test]
    fn test_embedding_response_decoding() {
        let resp: EmbeddingResponse = serde_json::from_value(json!({
            "data": [{"embedding": [0.1, 0.2], "index": 0}]
        }))
        .unwrap();
        assert_eq!(first_embedding(resp).unwrap(), vec![0.1, 0.2]);

        let none: EmbeddingResponse = serde_json::from_value(json!({"data": []})).unwrap();
        assert!(first_embedding(none).is_err());
    }
}
