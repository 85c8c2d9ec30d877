use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub data_dir: PathBuf,
    pub embedding: EmbeddingConfig,
    pub search: SearchConfig,
    pub history: HistoryConfig,
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub dimension: usize,
    pub cache_size: usize,
    pub batch_size: usize,
    pub max_retries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Cosine threshold for the predefined-QA fast path.
    pub qa_match_threshold: f32,
    /// Minimum inner-product similarity for a chunk to enter the grounded prompt.
    pub chunk_score_threshold: f32,
    pub top_k: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Turns kept per session before FIFO eviction.
    pub max_turns: usize,
    /// Most recent turns included in grounded prompts.
    pub prompt_turns: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub embed_model: String,
    pub generate_timeout_secs: u64,
    pub embed_timeout_secs: u64,
}

impl EngineConfig {
    /// Validate config values, returning errors for clearly broken configurations.
    pub fn validate(&self) -> Result<(), String> {
        if self.embedding.dimension == 0 {
            return Err("embedding.dimension must be > 0".into());
        }
        if self.embedding.batch_size == 0 {
            return Err("embedding.batch_size must be > 0".into());
        }
        if !(0.0..=1.0).contains(&self.search.qa_match_threshold) {
            return Err("search.qa_match_threshold must be in [0.0, 1.0]".into());
        }
        if !(-1.0..=1.0).contains(&self.search.chunk_score_threshold) {
            return Err("search.chunk_score_threshold must be in [-1.0, 1.0]".into());
        }
        if self.search.top_k == 0 {
            return Err("search.top_k must be > 0".into());
        }
        if self.history.max_turns == 0 {
            return Err("history.max_turns must be > 0".into());
        }
        if self.history.prompt_turns > self.history.max_turns {
            return Err("history.prompt_turns must be <= history.max_turns".into());
        }
        if self.llm.base_url.is_empty() {
            return Err("llm.base_url must not be empty".into());
        }
        Ok(())
    }

    /// Load config from a JSON file, falling back to defaults for missing fields.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("proposal-rag");

        Self {
            data_dir,
            embedding: EmbeddingConfig {
                dimension: 384,
                cache_size: 1000,
                batch_size: 16,
                max_retries: 3,
            },
            search: SearchConfig {
                qa_match_threshold: 0.85,
                chunk_score_threshold: 0.5,
                top_k: 5,
            },
            history: HistoryConfig {
                max_turns: 5,
                prompt_turns: 3,
            },
            llm: LlmConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "llama3:8b".into(),
            embed_model: "all-minilm".into(),
            generate_timeout_secs: 60,
            embed_timeout_secs: 30,
        }
    }
}
