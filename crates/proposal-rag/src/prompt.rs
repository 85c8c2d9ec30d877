//! Grounded prompt assembly for the semantic fallback.
//!
//! The prompt pins the model to the retrieved records: answer only from
//! the context block, refuse with a fixed sentinel otherwise. Context is
//! truncated at whole-chunk boundaries to stay inside the budget.

pub const MAX_CONTEXT_CHARS: usize = 12_000;

pub const REFUSAL_MESSAGE: &str = "Data not available in proposal records.";

pub const SYSTEM_INSTRUCTION: &str = "You are an insurance data assistant for JA Assure. \
Answer ONLY from the proposal records provided below. \
Do not infer, assume, extrapolate, or use any knowledge outside the provided context. \
If the exact data needed to answer is not present, respond with exactly: \
Data not available in proposal records. \
Be concise. Output plain text only. No markdown, no bullet points, no bold, no numbered lists.";

/// Assemble the grounded prompt from retrieved chunk texts, recent
/// conversation turns and the question.
pub fn build_prompt(chunks: &[String], history: &str, question: &str) -> String {
    let context = chunks.join("\n\n");
    let truncated = truncate_context(&context, MAX_CONTEXT_CHARS);

    let history_block = if history.trim().is_empty() {
        String::new()
    } else {
        format!(
            "=== RECENT CONVERSATION ===\n{}\n=== END OF CONVERSATION ===\n\n",
            history.trim()
        )
    };

    format!(
        "{}\n\n=== PROPOSAL RECORDS ===\n{}\n=== END OF RECORDS ===\n\n{}Question: {}\n\nAnswer:",
        SYSTEM_INSTRUCTION, truncated, history_block, question
    )
}

/// Prompt for phrasing a deterministic analytical result.
pub fn build_analytical_prompt(question: &str, data: &str) -> String {
    format!(
        "You are an insurance data assistant. Format the following analytical result as a clear, \
concise answer. Do not add any information not present in the data. Output plain text only.\n\n\
Question: {}\n\nAnalytical Result:\n{}\n\nFormatted Answer:",
        question, data
    )
}

/// Keep whole chunks (separated by blank lines) while they fit. If not even
/// the first chunk fits, hard-truncate it.
pub fn truncate_context(context: &str, max_chars: usize) -> String {
    if context.len() <= max_chars {
        return context.to_string();
    }

    let chunks: Vec<&str> = context.split("\n\n").collect();
    let mut kept: Vec<&str> = Vec::new();
    let mut current_len = 0usize;

    for chunk in &chunks {
        if current_len + chunk.len() + 2 <= max_chars {
            kept.push(chunk);
            current_len += chunk.len() + 2;
        } else {
            break;
        }
    }

    if kept.is_empty() {
        let head: String = chunks[0].chars().take(max_chars).collect();
        return format!("{}...", head);
    }
    kept.join("\n\n")
}

/// Rough token estimate, four characters per token.
pub fn estimate_tokens(text: &str) -> usize {
    text.len() / 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_wraps_context_and_question() {
        let chunks = vec!["Record MYJADEQT001: Recording: Yes".to_string()];
        let prompt = build_prompt(&chunks, "", "Does it have recording?");
        assert!(prompt.starts_with(SYSTEM_INSTRUCTION));
        assert!(prompt.contains("=== PROPOSAL RECORDS ===\nRecord MYJADEQT001"));
        assert!(prompt.contains("Question: Does it have recording?"));
        assert!(prompt.ends_with("Answer:"));
        assert!(!prompt.contains("RECENT CONVERSATION"));
    }

    #[test]
    fn prompt_includes_history_when_present() {
        let chunks = vec!["context".to_string()];
        let prompt = build_prompt(&chunks, "Q: previous?\nA: yes", "and now?");
        assert!(prompt.contains("=== RECENT CONVERSATION ===\nQ: previous?\nA: yes"));
    }

    #[test]
    fn truncation_keeps_whole_chunks() {
        let context = format!("{}\n\n{}\n\n{}", "a".repeat(40), "b".repeat(40), "c".repeat(40));
        let truncated = truncate_context(&context, 90);
        assert_eq!(truncated, format!("{}\n\n{}", "a".repeat(40), "b".repeat(40)));
    }

    #[test]
    fn oversized_first_chunk_is_hard_truncated() {
        let context = "x".repeat(200);
        let truncated = truncate_context(&context, 50);
        assert_eq!(truncated.len(), 53);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn short_context_passes_through() {
        assert_eq!(truncate_context("short", 100), "short");
    }

    #[test]
    fn token_estimate_is_quarter_of_length() {
        assert_eq!(estimate_tokens("abcdefgh"), 2);
    }
}
