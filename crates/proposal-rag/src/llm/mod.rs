//! Ollama HTTP client.
//!
//! Completions only. Embedding has its own synchronous backend under
//! `embeddings`, so this trait stays a single seam the parser and the
//! answer stage share and tests can swap for a canned implementation.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::config::LlmConfig;
use crate::error::EngineError;

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Single-prompt completion, no streaming.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    generate_timeout: Duration,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .tcp_nodelay(true)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            generate_timeout: Duration::from_secs(config.generate_timeout_secs),
        })
    }

    fn request_error(&self, endpoint: &str, e: reqwest::Error) -> anyhow::Error {
        if e.is_timeout() {
            EngineError::Timeout(self.generate_timeout.as_millis() as u64).into()
        } else if e.is_connect() {
            EngineError::Upstream(format!(
                "failed to connect to {} (is Ollama running?): {}",
                endpoint, e
            ))
            .into()
        } else {
            EngineError::Upstream(format!("request to {} failed: {}", endpoint, e)).into()
        }
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let endpoint = format!("{}/api/generate", self.base_url);
        debug!(model = %self.model, prompt_len = prompt.len(), "Sending generate request");

        let request = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false
        });

        let response = self
            .client
            .post(&endpoint)
            .timeout(self.generate_timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.request_error(&endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let error = response.text().await?;
            return Err(EngineError::Upstream(format!("LLM request failed ({}): {}", status, error)).into());
        }

        let body: GenerateResponse = response.json().await?;
        debug!(response_len = body.response.len(), "Generate response received");
        Ok(body.response)
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_response_parses_ollama_shape() {
        let body: GenerateResponse =
            serde_json::from_str(r#"{"model":"llama3:8b","response":"Yes.","done":true}"#).unwrap();
        assert_eq!(body.response, "Yes.");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let mut config = crate::config::EngineConfig::default().llm;
        config.base_url = "http://localhost:11434/".into();
        let client = OllamaClient::new(&config).unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
    }
}
