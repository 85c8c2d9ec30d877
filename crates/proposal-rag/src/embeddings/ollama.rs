//! Ollama embedding backend over the `/api/embed` endpoint.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::EngineError;

use super::{normalize, EmbeddingModel};

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

pub struct OllamaEmbedding {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    dimension: usize,
}

impl OllamaEmbedding {
    pub fn new(config: &LlmConfig, dimension: usize) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.embed_timeout_secs))
            .build()
            .context("failed to build embedding http client")?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.embed_model.clone(),
            dimension,
        })
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embed", self.base_url);
        let request = EmbedRequest {
            model: &self.model,
            input: texts.to_vec(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .with_context(|| format!("embedding request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(EngineError::Upstream(format!("embedding backend returned {}: {}", status, body)).into());
        }

        let parsed: EmbedResponse = response
            .json()
            .context("failed to decode embedding response")?;

        if parsed.embeddings.len() != texts.len() {
            return Err(anyhow!(
                "embedding count mismatch: sent {}, got {}",
                texts.len(),
                parsed.embeddings.len()
            ));
        }

        let mut vectors = parsed.embeddings;
        for vector in &mut vectors {
            if vector.len() != self.dimension {
                return Err(anyhow!(
                    "embedding dimension mismatch: expected {}, got {}",
                    self.dimension,
                    vector.len()
                ));
            }
            normalize(vector);
        }
        Ok(vectors)
    }
}

impl EmbeddingModel for OllamaEmbedding {
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text])?;
        vectors
            .pop()
            .ok_or_else(|| anyhow!("embedding backend returned no vector"))
    }

    fn embed_document(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_query(text)
    }

    fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.embed_batch(texts)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmConfig;

    #[test]
    fn strips_trailing_slash_from_base_url() {
        let config = LlmConfig {
            base_url: "http://localhost:11434/".to_string(),
            ..LlmConfig::default()
        };
        let backend = OllamaEmbedding::new(&config, 384).unwrap();
        assert_eq!(backend.base_url, "http://localhost:11434");
    }

    #[test]
    fn reports_configured_dimension() {
        let backend = OllamaEmbedding::new(&LlmConfig::default(), 384).unwrap();
        assert_eq!(backend.dimension(), 384);
    }
}
