//! Per-session conversation history.
//!
//! Keeps the last few turns so follow-up questions ("give me their names")
//! resolve against the previous filters without a model round-trip, and so
//! the parser prompt can carry history without bleeding a stale entity into
//! an unrelated question.

use crate::types::{ConversationTurn, Intent, ParsedQuery};

const ANSWER_PREVIEW_CHARS: usize = 200;

/// Phrases that mark a query as a reference to the previous result set.
const FOLLOWUP_PATTERNS: &[&str] = &[
    "their names",
    "the names",
    "give names",
    "give me names",
    "list them",
    "show them",
    "what are they",
    "who are they",
    "give me their",
    "show their",
    "tell me their",
    "what are those",
    "which are those",
    "name them",
    "give the names",
    "show the names",
    "list the names",
    "what about their names",
    "and their names",
    "names please",
    "names?",
];

const REFERENCE_WORDS: &[&str] = &["them", "their", "those", "these", "above", "names"];

/// Location phrasings. A location question must never inherit a business or
/// person name from the previous turn.
const LOCATION_INDICATORS: &[&str] = &[
    "located in",
    "in penang",
    "in johor",
    "in kuala lumpur",
    "in selangor",
    "in sabah",
    "in kedah",
    "in perak",
    "in melaka",
    "in negeri",
    "in pahang",
    "in muar",
    "in taiping",
    "in ipoh",
    "in klang",
    "in seremban",
    "in kota kinabalu",
    "in george town",
    "in sungai petani",
    "in kuantan",
    "location",
    "located",
    "based in",
    "situated in",
];

/// Words that carry no entity signal when comparing two queries.
const ENTITY_NOISE_WORDS: &[&str] = &[
    "does", "do", "is", "what", "which", "how", "far", "often", "type", "of", "the", "a", "an",
    "for", "have", "use", "run", "business", "carry", "out", "keep", "detailed", "records",
    "standard", "operating", "procedure", "in", "place", "armed", "guards", "during", "transit",
    "background", "checks", "long", "retain", "cctv", "recordings", "safe", "grade", "nearest",
    "police", "station", "strong", "room", "door", "access", "backup", "and", "with", "their",
    "them", "that", "this", "from", "are", "has", "had", "its", "stock", "check", "movements",
    "contract", "maintenance", "used", "using", "get", "give", "tell", "show", "sop", "much",
    "many", "where", "when", "who", "proposals", "located", "based", "situated", "count",
    "number",
];

pub fn is_location_query(query: &str) -> bool {
    let query_lower = query.to_lowercase();
    LOCATION_INDICATORS
        .iter()
        .any(|ind| query_lower.contains(ind))
}

/// Up to four significant words of a query, used as an entity fingerprint
/// for the bleed check.
fn entity_words(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c| matches!(c, '?' | '.' | ',' | '!')).to_string())
        .filter(|w| w.len() > 2 && !ENTITY_NOISE_WORDS.contains(&w.as_str()))
        .take(4)
        .collect()
}

fn truncate_preview(answer: &str) -> String {
    answer.chars().take(ANSWER_PREVIEW_CHARS).collect()
}

fn opt_text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("None")
}

#[derive(Debug, Default, Clone)]
pub struct ConversationContext {
    turns: Vec<ConversationTurn>,
    max_turns: usize,
}

impl ConversationContext {
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: Vec::new(),
            max_turns,
        }
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Remember a fully parsed exchange.
    pub fn add_turn(&mut self, query: &str, parsed: &ParsedQuery, answer: &str) {
        self.push(ConversationTurn {
            query: query.to_string(),
            intent: parsed.intent,
            target_fields: parsed.target_fields.clone(),
            filter_field: parsed.filter_field.clone(),
            filter_value: parsed.filter_value.clone(),
            filter_contains: parsed.filter_contains.clone(),
            record_id: parsed.record_id.clone(),
            understood_question: parsed.understood_question.clone(),
            answer_preview: truncate_preview(answer),
        });
    }

    /// Remember an exchange answered without a structured parse (predefined
    /// QA, analytical, retrieval fallback). Carries no filters, so it can
    /// never bleed an entity into the next turn.
    pub fn add_raw_turn(&mut self, query: &str, answer: &str) {
        self.push(ConversationTurn {
            query: query.to_string(),
            intent: Intent::Lookup,
            target_fields: Vec::new(),
            filter_field: None,
            filter_value: None,
            filter_contains: None,
            record_id: None,
            understood_question: query.to_string(),
            answer_preview: truncate_preview(answer),
        });
    }

    fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
        if self.turns.len() > self.max_turns {
            let excess = self.turns.len() - self.max_turns;
            self.turns.drain(..excess);
        }
    }

    fn is_followup_reference(&self, query: &str) -> bool {
        if self.turns.is_empty() {
            return false;
        }
        let query_lower = query.to_lowercase().trim().to_string();

        if FOLLOWUP_PATTERNS
            .iter()
            .any(|pattern| query_lower.contains(pattern))
        {
            return true;
        }

        // Very short queries that are purely referential.
        query_lower.split_whitespace().count() <= 5
            && REFERENCE_WORDS.iter().any(|w| query_lower.contains(w))
    }

    /// Resolve a follow-up reference against the last turn without an LLM.
    /// Returns None when the query does not read as a follow-up.
    pub fn resolve_followup(&self, query: &str) -> Option<ParsedQuery> {
        if !self.is_followup_reference(query) {
            return None;
        }
        let last = self.turns.last()?;

        let mut parsed = ParsedQuery::new(Intent::List, query);
        parsed.target_fields = last.target_fields.clone();
        parsed.filter_field = last.filter_field.clone();
        parsed.filter_value = last.filter_value.clone();
        parsed.filter_contains = last.filter_contains.clone();
        parsed.output_fields = vec!["business_name_label".to_string()];
        parsed.understood_question =
            format!("Follow-up: list names from previous query '{}'", last.query);
        Some(parsed)
    }

    /// Render the history block for the parser prompt. Filters are stripped
    /// from every turn when the current query is about a location or names a
    /// different entity than the last filter did.
    pub fn history_section(&self, current_query: &str) -> String {
        if self.turns.is_empty() {
            return String::new();
        }

        let suppress = self.should_suppress_filters(current_query);
        let rendered: Vec<ConversationTurn> = if suppress {
            self.turns
                .iter()
                .map(|turn| {
                    let mut t = turn.clone();
                    t.filter_field = None;
                    t.filter_value = None;
                    t.filter_contains = None;
                    t
                })
                .collect()
        } else {
            self.turns.clone()
        };

        let mut lines = vec![
            "CONVERSATION HISTORY (most recent turn is the most relevant for follow-up references):"
                .to_string(),
        ];
        for (i, turn) in rendered.iter().enumerate() {
            lines.push(format!("Turn {}:", i + 1));
            lines.push(format!("  User asked: {}", turn.query));
            lines.push(format!("  Understood as: {}", turn.understood_question));
            if turn.filter_field.is_some() || turn.filter_contains.is_some() {
                lines.push(format!(
                    "  Intent: {}, Filter: {}={}, Contains: {}",
                    turn.intent,
                    opt_text(&turn.filter_field),
                    opt_text(&turn.filter_value),
                    opt_text(&turn.filter_contains)
                ));
            }
            lines.push(format!("  Answer given: {}", turn.answer_preview));
        }

        // Last turn gets its own emphasis block for follow-up resolution.
        let last = rendered.last().unwrap();
        lines.push(String::new());
        lines.push(
            "=== MOST RECENT TURN (use this for follow-up references like 'their', 'these', 'those', 'them', 'the names') ==="
                .to_string(),
        );
        lines.push(format!("  Last question: {}", last.query));
        lines.push(format!("  Last answer: {}", last.answer_preview));
        if let Some(field) = &last.filter_field {
            lines.push(format!(
                "  Last filter: {}={}",
                field,
                opt_text(&last.filter_value)
            ));
        }
        if let Some(contains) = &last.filter_contains {
            lines.push(format!("  Last contains search: {}", contains));
        }
        lines.push(String::new());
        lines.push(
            "CRITICAL RULE FOR FOLLOW-UPS: When the user says 'their names', 'give names', 'list them', 'what are they', etc.,"
                .to_string(),
        );
        lines.push(
            "you MUST use the EXACT SAME filter_field, filter_value, and filter_contains from the MOST RECENT turn above."
                .to_string(),
        );
        lines.push("Change intent to 'list' and set output_fields=['business_name_label'].".to_string());
        lines.push(String::new());
        lines.join("\n")
    }

    /// Render the last `turns` exchanges as plain Q/A lines for the
    /// grounded prompt.
    pub fn grounding_history(&self, turns: usize) -> String {
        if self.turns.is_empty() || turns == 0 {
            return String::new();
        }
        let start = self.turns.len().saturating_sub(turns);
        self.turns[start..]
            .iter()
            .map(|turn| format!("Q: {}\nA: {}", turn.query, turn.answer_preview))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn should_suppress_filters(&self, current_query: &str) -> bool {
        if current_query.is_empty() {
            return false;
        }
        if is_location_query(current_query) {
            return true;
        }
        let Some(last) = self.turns.last() else {
            return false;
        };
        let Some(last_contains) = last.filter_contains.as_deref().filter(|s| !s.is_empty())
        else {
            return false;
        };
        let current_words = entity_words(current_query);
        let last_words = entity_words(last_contains);
        !current_words.is_empty()
            && !last_words.is_empty()
            && !current_words.iter().any(|w| last_words.contains(w))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed_with_contains(contains: &str) -> ParsedQuery {
        let mut parsed = ParsedQuery::new(Intent::Lookup, "what is the claim history of Heritage Gold?");
        parsed.target_fields = vec!["claim_history_label".to_string()];
        parsed.filter_contains = Some(contains.to_string());
        parsed
    }

    #[test]
    fn history_keeps_only_the_last_five_turns() {
        let mut ctx = ConversationContext::new(5);
        for i in 0..7 {
            ctx.add_raw_turn(&format!("question {}", i), "answer");
        }
        assert_eq!(ctx.turns().len(), 5);
        assert_eq!(ctx.turns()[0].query, "question 2");
        assert_eq!(ctx.turns()[4].query, "question 6");
    }

    #[test]
    fn answer_previews_are_truncated() {
        let mut ctx = ConversationContext::new(5);
        ctx.add_raw_turn("q", &"x".repeat(500));
        assert_eq!(ctx.turns()[0].answer_preview.chars().count(), 200);
    }

    #[test]
    fn followups_resolve_against_the_last_turn() {
        let mut ctx = ConversationContext::new(5);
        let parsed = parsed_with_contains("Heritage Gold");
        ctx.add_turn(&parsed.raw_query.clone(), &parsed, "No claims in 3 years.");

        let resolved = ctx.resolve_followup("give me their names").unwrap();
        assert_eq!(resolved.intent, Intent::List);
        assert_eq!(resolved.filter_contains.as_deref(), Some("Heritage Gold"));
        assert_eq!(resolved.output_fields, vec!["business_name_label"]);
        assert!(resolved
            .understood_question
            .starts_with("Follow-up: list names"));
    }

    #[test]
    fn short_referential_queries_count_as_followups() {
        let mut ctx = ConversationContext::new(5);
        ctx.add_raw_turn("which proposals have alarms?", "3 proposals match.");
        assert!(ctx.resolve_followup("and them?").is_some());
        assert!(ctx
            .resolve_followup("what is the safe grade of MYJADEQT004?")
            .is_none());
    }

    #[test]
    fn followups_need_history() {
        let ctx = ConversationContext::new(5);
        assert!(ctx.resolve_followup("give me their names").is_none());
    }

    #[test]
    fn location_queries_suppress_inherited_filters() {
        let mut ctx = ConversationContext::new(5);
        let parsed = parsed_with_contains("Heritage Gold");
        ctx.add_turn(&parsed.raw_query.clone(), &parsed, "No claims in 3 years.");

        let section = ctx.history_section("how many proposals are located in Penang?");
        assert!(!section.contains("Last contains search"));
        assert!(!section.contains("Contains: Heritage Gold"));
    }

    #[test]
    fn entity_change_suppresses_stale_contains() {
        let mut ctx = ConversationContext::new(5);
        let parsed = parsed_with_contains("Heritage Gold");
        ctx.add_turn(&parsed.raw_query.clone(), &parsed, "No claims in 3 years.");

        let section = ctx.history_section("does Mehta Pawn Services have an alarm?");
        assert!(!section.contains("Last contains search: Heritage Gold"));

        let same_entity = ctx.history_section("what about heritage gold's alarm?");
        assert!(same_entity.contains("Last contains search: Heritage Gold"));
    }

    #[test]
    fn grounding_history_takes_the_last_turns() {
        let mut ctx = ConversationContext::new(5);
        for i in 0..4 {
            ctx.add_raw_turn(&format!("q{}", i), &format!("a{}", i));
        }
        let history = ctx.grounding_history(3);
        assert_eq!(history, "Q: q1\nA: a1\nQ: q2\nA: a2\nQ: q3\nA: a3");
        assert_eq!(ConversationContext::new(5).grounding_history(3), "");
    }

    #[test]
    fn raw_turns_carry_no_filters() {
        let mut ctx = ConversationContext::new(5);
        ctx.add_raw_turn("tell me about safes", "Safes are graded.");
        let section = ctx.history_section("");
        assert!(section.contains("User asked: tell me about safes"));
        assert!(!section.contains("Intent:"));
    }
}
