//! Keyword routing for query types.
//!
//! Classification is linguistic, not a lookup table of known questions:
//! signal phrases decide whether a query is analytical, structured or
//! semantic. The predefined-QA fast path runs before any of this.

use regex::Regex;
use std::sync::LazyLock;

const AGGREGATION_SIGNALS: [&str; 17] = [
    "how many",
    "count",
    "total",
    "average",
    "sum",
    "which proposals",
    "list all",
    "compare",
    "most common",
    "percentage",
    "majority",
    "all proposals",
    "number of",
    "how much",
    "across all",
    "summarize",
    "aggregate",
];

const COMPARISON_SIGNALS: [&str; 14] = [
    "highest",
    "lowest",
    "maximum",
    "minimum",
    "most",
    "least",
    "top",
    "bottom",
    "best",
    "worst",
    "greater than",
    "less than",
    "more than",
    "fewer than",
];

static QUOTE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)MYJADEQT\d+").expect("quote id regex"));

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z]+").expect("word regex"));

const STOP_WORDS: [&str; 104] = [
    "the", "a", "an", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "do", "does", "did", "will", "would", "could", "should", "may", "might", "must", "shall",
    "can", "of", "for", "to", "in", "on", "at", "by", "from", "with", "about", "into", "through",
    "during", "before", "after", "above", "below", "between", "under", "again", "further", "then",
    "once", "what", "which", "who", "whom", "this", "that", "these", "those", "am", "and", "but",
    "if", "or", "because", "as", "until", "while", "how", "many", "much", "where", "when", "why",
    "all", "each", "every", "both", "few", "more", "most", "other", "some", "such", "no", "not",
    "only", "own", "same", "so", "than", "too", "very", "just", "also", "now", "here", "there",
    "any", "tell", "me", "give", "show", "get", "find", "please", "thanks",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    /// Aggregation or comparison across records.
    Analytical,
    /// Names a specific proposal id.
    Structured,
    /// Everything else goes through vector retrieval.
    Semantic,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Analytical => "analytical",
            QueryType::Structured => "structured",
            QueryType::Semantic => "semantic",
        }
    }
}

/// Classify a query by signal phrases, in priority order: aggregation and
/// comparison signals first, then a proposal id, then semantic fallback.
pub fn classify_query(query: &str) -> QueryType {
    let query_lower = query.to_lowercase();
    let query_lower = query_lower.trim();

    if AGGREGATION_SIGNALS.iter().any(|s| query_lower.contains(s)) {
        return QueryType::Analytical;
    }
    if COMPARISON_SIGNALS.iter().any(|s| query_lower.contains(s)) {
        return QueryType::Analytical;
    }
    if QUOTE_ID_RE.is_match(query) {
        return QueryType::Structured;
    }
    QueryType::Semantic
}

/// Proposal id mentioned in the query, uppercased, if any.
pub fn extract_quote_id(query: &str) -> Option<String> {
    QUOTE_ID_RE
        .find(query)
        .map(|m| m.as_str().to_uppercase())
}

/// Candidate field keywords: lowercase words minus stop words, length > 2.
pub fn extract_field_keywords(query: &str) -> Vec<String> {
    let query_lower = query.to_lowercase();
    WORD_RE
        .find_iter(&query_lower)
        .map(|m| m.as_str())
        .filter(|w| w.len() > 2 && !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

pub fn is_counting_query(query: &str) -> bool {
    let query_lower = query.to_lowercase();
    ["how many", "count", "total", "number of"]
        .iter()
        .any(|s| query_lower.contains(s))
}

pub fn is_listing_query(query: &str) -> bool {
    let query_lower = query.to_lowercase();
    ["list all", "which proposals", "which records", "show all"]
        .iter()
        .any(|s| query_lower.contains(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregation_signals_classify_as_analytical() {
        assert_eq!(
            classify_query("How many proposals have CCTV?"),
            QueryType::Analytical
        );
        assert_eq!(
            classify_query("compare the sums assured"),
            QueryType::Analytical
        );
    }

    #[test]
    fn comparison_signals_classify_as_analytical() {
        assert_eq!(
            classify_query("Which business has the highest sum assured?"),
            QueryType::Analytical
        );
    }

    #[test]
    fn quote_id_classifies_as_structured() {
        assert_eq!(
            classify_query("Does myjadeqt003 have an alarm?"),
            QueryType::Structured
        );
    }

    #[test]
    fn aggregation_outranks_quote_id() {
        assert_eq!(
            classify_query("How many claims does MYJADEQT001 have?"),
            QueryType::Analytical
        );
    }

    #[test]
    fn plain_questions_are_semantic() {
        assert_eq!(
            classify_query("Tell me about the business premises"),
            QueryType::Semantic
        );
    }

    #[test]
    fn extracts_and_uppercases_quote_id() {
        assert_eq!(
            extract_quote_id("details for myjadeqt012 please"),
            Some("MYJADEQT012".to_string())
        );
        assert_eq!(extract_quote_id("no id here"), None);
    }

    #[test]
    fn field_keywords_drop_stop_words() {
        let keywords = extract_field_keywords("What is the alarm maintenance status?");
        assert_eq!(keywords, vec!["alarm", "maintenance", "status"]);
    }

    #[test]
    fn detects_counting_and_listing() {
        assert!(is_counting_query("How many have guards?"));
        assert!(!is_counting_query("Does it have guards?"));
        assert!(is_listing_query("Which proposals have CCTV?"));
        assert!(!is_listing_query("How many have CCTV?"));
    }
}
