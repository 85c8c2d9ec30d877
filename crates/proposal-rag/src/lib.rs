//! Deterministic query engine over jewellers-block insurance proposals.
//!
//! Proposal records come from an Excel export, are decoded into typed
//! chunks, and are answered through a fixed cascade: predefined QA match,
//! parsed query execution, keyword analytics, and finally grounded
//! retrieval with a local model. Anything the records cannot support is
//! refused rather than guessed.

pub mod audit;
pub mod config;
pub mod decode;
pub mod embeddings;
pub mod engine;
pub mod error;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod output;
pub mod prompt;
pub mod qa_store;
pub mod query;
pub mod sections;
pub mod store;
pub mod types;

// Re-export primary types for convenience
pub use config::EngineConfig;
pub use engine::ProposalEngine;
pub use error::EngineError;
pub use store::RecordStore;
pub use types::{Intent, ParsedQuery, QueryResult, RecordChunk};

// Re-export common types
pub use anyhow::{Error, Result};
pub use uuid::Uuid;
