//! Strip model formatting from generated answers.
//!
//! The prompt forbids markdown but local models emit it anyway. Every
//! generated answer passes through here before it reaches a user, so the
//! output stays plain text regardless of what the model did.

use regex::Regex;
use std::sync::LazyLock;

static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("html tag regex"));
static HTML_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&[a-zA-Z0-9#]+;").expect("html entity regex"));
static BOLD_STAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("bold star regex"));
static BOLD_UNDERSCORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__([^_]+)__").expect("bold underscore regex"));
static ITALIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[^\w*])\*([^*]+)\*([^\w*]|$)").expect("italic regex"));
static INLINE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]*)`").expect("inline code regex"));
static CODE_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[^`]*```").expect("code block regex"));
static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,6}\s+").expect("header regex"));
static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*[-•*+]\s+").expect("bullet regex"));
static NUMBERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\d+\.\s+").expect("numbered list regex"));
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("link regex"));
static IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\([^)]+\)").expect("image regex"));
static MULTI_NEWLINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("newline collapse regex"));
static MULTI_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" {2,}").expect("space collapse regex"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));
static THINKING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?si)<thinking>.*?</thinking>").expect("thinking regex"));
static REASONING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?si)<reasoning>.*?</reasoning>").expect("reasoning regex"));
static ANSWER_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?si)(?:Answer|Response|Result):\s*(.+)").expect("answer prefix regex"));

/// Remove markdown and HTML artifacts, keeping the text content.
pub fn clean_output(text: &str) -> String {
    let text = HTML_TAG_RE.replace_all(text, "");
    let text = HTML_ENTITY_RE.replace_all(&text, " ");
    let text = BOLD_STAR_RE.replace_all(&text, "$1");
    let text = BOLD_UNDERSCORE_RE.replace_all(&text, "$1");
    let text = strip_italics(&text);
    let text = INLINE_CODE_RE.replace_all(&text, "$1");
    let text = CODE_BLOCK_RE.replace_all(&text, "");
    let text = HEADER_RE.replace_all(&text, "");
    let text = BULLET_RE.replace_all(&text, "");
    let text = NUMBERED_RE.replace_all(&text, "");
    let text = LINK_RE.replace_all(&text, "$1");
    let text = IMAGE_RE.replace_all(&text, "$1");
    let text = MULTI_NEWLINE_RE.replace_all(&text, "\n\n");
    let text = MULTI_SPACE_RE.replace_all(&text, " ");
    text.trim().to_string()
}

// Italic markers need a non-word boundary on both sides. The regex crate
// has no lookarounds, so the boundary chars are captured and restored,
// iterating until stable because a consumed boundary can hide the next
// marker pair.
fn strip_italics(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = ITALIC_RE.replace_all(&current, "$1$2$3").to_string();
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Collapse all whitespace runs to single spaces.
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}

/// Drop chain-of-thought blocks some local models leak.
pub fn remove_thinking_tags(text: &str) -> String {
    let text = THINKING_RE.replace_all(text, "");
    REASONING_RE.replace_all(&text, "").to_string()
}

/// If the model prefixed its reply with "Answer:" or similar, keep only
/// what follows.
pub fn extract_answer_only(text: &str) -> String {
    match ANSWER_PREFIX_RE.captures(text) {
        Some(caps) => caps[1].trim().to_string(),
        None => text.to_string(),
    }
}

/// The full cleaning pipeline applied to every generated answer.
pub fn full_clean(text: &str) -> String {
    let text = remove_thinking_tags(text);
    let text = clean_output(&text);
    let text = extract_answer_only(&text);
    normalize_whitespace(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_bold_and_italic() {
        assert_eq!(
            clean_output("The **sum assured** is *RM 1,500,000* total."),
            "The sum assured is RM 1,500,000 total."
        );
    }

    #[test]
    fn strips_adjacent_italics() {
        assert_eq!(clean_output("*yes* *no*"), "yes no");
    }

    #[test]
    fn strips_headers_and_bullets() {
        let raw = "## Summary\n- CCTV: Yes\n- Alarm: No\n1. First point";
        assert_eq!(clean_output(raw), "Summary\nCCTV: Yes\nAlarm: No\nFirst point");
    }

    #[test]
    fn strips_html_and_entities() {
        assert_eq!(clean_output("<b>Yes</b>&nbsp;indeed"), "Yes indeed");
    }

    #[test]
    fn keeps_link_text_only() {
        assert_eq!(clean_output("see [the records](http://x.test/r)"), "see the records");
    }

    #[test]
    fn removes_thinking_blocks() {
        let raw = "<thinking>let me check the fields</thinking>Recording: Yes";
        assert_eq!(full_clean(raw), "Recording: Yes");
    }

    #[test]
    fn extracts_text_after_answer_prefix() {
        assert_eq!(extract_answer_only("Answer: 3 proposals match."), "3 proposals match.");
        assert_eq!(extract_answer_only("No prefix here."), "No prefix here.");
    }

    #[test]
    fn plain_text_passes_through_unchanged() {
        let plain = "Recording for MYJADEQT001: Yes";
        assert_eq!(full_clean(plain), plain);
    }

    #[test]
    fn full_clean_collapses_whitespace() {
        assert_eq!(full_clean("Yes,\n\n   it   does."), "Yes, it does.");
    }
}
