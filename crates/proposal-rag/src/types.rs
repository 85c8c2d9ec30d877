use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// One section of one proposal record, with raw codes, decoded labels and the
/// rendered text used for vector retrieval. Immutable after ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordChunk {
    pub id: Uuid,
    /// Proposal identifier, e.g. `MYJADEQT012`.
    pub record_id: String,
    /// Section name from the source sheet, e.g. `cctv`, `claim_history`.
    pub section: String,
    /// Field name -> raw stored code/value.
    pub fields: HashMap<String, String>,
    /// Field name -> human label. Computed exactly once at ingestion; same
    /// key set as `fields`, never re-decoded.
    pub decoded_fields: HashMap<String, String>,
    pub risk_location: String,
    pub owner_name: String,
    /// Natural-language rendering of the section.
    pub text: String,
}

impl RecordChunk {
    /// Decoded value for a field, falling back to the raw value.
    pub fn value_of(&self, field: &str) -> Option<&str> {
        self.decoded_fields
            .get(field)
            .or_else(|| self.fields.get(field))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Lookup,
    Count,
    List,
    Compare,
    OutOfScope,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Lookup => "lookup",
            Intent::Count => "count",
            Intent::List => "list",
            Intent::Compare => "compare",
            Intent::OutOfScope => "out_of_scope",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured interpretation of one user query. Per-request, never reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedQuery {
    pub intent: Intent,
    /// Fields the user asked about, e.g. `["recording_label"]`.
    pub target_fields: Vec<String>,
    /// Structured filter: field name side.
    pub filter_field: Option<String>,
    /// Structured filter: expected value side (raw code or label).
    pub filter_value: Option<String>,
    /// Free-text filter. Must be a literal substring of `raw_query`.
    pub filter_contains: Option<String>,
    /// Proposal id when the query names one.
    pub record_id: Option<String>,
    /// Fields to render in list answers.
    pub output_fields: Vec<String>,
    /// One-line restatement of what the parser understood.
    pub understood_question: String,
    pub raw_query: String,
    /// False when the keyword fallback produced this parse.
    pub parse_success: bool,
}

impl ParsedQuery {
    pub fn new(intent: Intent, raw_query: impl Into<String>) -> Self {
        let raw_query = raw_query.into();
        Self {
            intent,
            target_fields: Vec::new(),
            filter_field: None,
            filter_value: None,
            filter_contains: None,
            record_id: None,
            output_fields: Vec::new(),
            understood_question: raw_query.clone(),
            raw_query,
            parse_success: true,
        }
    }
}

/// One field hit produced by the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRow {
    pub record_id: String,
    pub field: String,
    pub value: String,
}

/// Executor outcome consumed by the formatter and the orchestrator.
/// Zero results is a valid answer for count/list, a failure for lookup/compare.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub success: bool,
    pub data: Vec<MatchRow>,
    pub count: usize,
    pub summary: Option<String>,
    /// Pre-rendered detail lines, e.g. `"Acme Pawn (MYJADEQT007)"`.
    pub details: Vec<String>,
}

impl QueryResult {
    pub fn empty_success() -> Self {
        Self {
            success: true,
            data: Vec::new(),
            count: 0,
            summary: None,
            details: Vec::new(),
        }
    }

    pub fn miss() -> Self {
        Self {
            success: false,
            data: Vec::new(),
            count: 0,
            summary: None,
            details: Vec::new(),
        }
    }
}

/// One remembered exchange in a session. `answer_preview` is truncated so the
/// history stays small enough to embed in prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub query: String,
    pub intent: Intent,
    pub target_fields: Vec<String>,
    pub filter_field: Option<String>,
    pub filter_value: Option<String>,
    pub filter_contains: Option<String>,
    pub record_id: Option<String>,
    pub understood_question: String,
    pub answer_preview: String,
}
