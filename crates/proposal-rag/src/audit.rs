//! Append-only JSONL audit trail.
//!
//! Every answered query writes one line recording which branch of the
//! cascade produced the answer, so behavior in the field can be replayed
//! and threshold changes can be justified from data.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    Predefined,
    Executor,
    Analytical,
    Structured,
    Location,
    Semantic,
    Refused,
}

impl Branch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Branch::Predefined => "predefined",
            Branch::Executor => "executor",
            Branch::Analytical => "analytical",
            Branch::Structured => "structured",
            Branch::Location => "location",
            Branch::Semantic => "semantic",
            Branch::Refused => "refused",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: String,
    pub query: String,
    pub branch: Branch,
    pub record_id: Option<String>,
    pub num_chunks: usize,
    pub top_similarity: f32,
    pub answer_length: usize,
}

impl AuditEntry {
    pub fn new(
        query: &str,
        branch: Branch,
        record_id: Option<String>,
        num_chunks: usize,
        top_similarity: f32,
        answer_length: usize,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            query: query.to_string(),
            branch,
            record_id,
            num_chunks,
            top_similarity: round4(top_similarity),
            answer_length,
        }
    }
}

fn round4(x: f32) -> f32 {
    (x * 10_000.0).round() / 10_000.0
}

pub struct AuditLog {
    writer: Mutex<BufWriter<File>>,
}

impl AuditLog {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create audit dir {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open audit log {}", path.display()))?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Append one entry and flush. A failed write is logged, never fatal.
    pub fn record(&self, entry: &AuditEntry) {
        info!(
            branch = entry.branch.as_str(),
            record_id = entry.record_id.as_deref().unwrap_or(""),
            num_chunks = entry.num_chunks,
            top_similarity = entry.top_similarity,
            answer_length = entry.answer_length,
            "query answered"
        );
        let line = match serde_json::to_string(entry) {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize audit entry");
                return;
            }
        };
        let mut writer = self.writer.lock();
        if let Err(err) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
            tracing::warn!(error = %err, "failed to write audit entry");
        }
    }
}
