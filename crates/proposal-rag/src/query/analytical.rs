//! Aggregation over raw record fields.
//!
//! Handles multi-record analytical queries without any model in the loop.
//! Matching runs on raw codes, so the yes/no sets include both the decoded
//! spellings and the stored codes.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, LazyLock};
use tracing::debug;

use crate::store::RecordStore;

const CCTV_PATTERNS: [&str; 4] = ["cctv", "camera", "recording", "surveillance"];
const ALARM_PATTERNS: [&str; 3] = ["alarm", "security system", "monitoring"];
const GUARD_PATTERNS: [&str; 3] = ["guard", "armed", "security personnel"];
const TRANSIT_PATTERNS: [&str; 4] = ["transit", "armoured", "vehicle", "transport"];
const CLAIM_PATTERNS: [&str; 3] = ["claim", "loss", "incident"];
const SAFE_PATTERNS: [&str; 4] = ["safe", "vault", "storage", "strong room"];
const DOOR_PATTERNS: [&str; 3] = ["door", "access", "entry"];
const PREMISE_PATTERNS: [&str; 4] = ["premise", "building", "location", "shop"];

const YES_VALUES: [&str; 4] = ["yes", "001", "true", "1"];
const NO_VALUES: [&str; 4] = ["no", "002", "false", "0"];

static NUM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\d.]+").expect("number regex"));

/// Field categories a query condition can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Cctv,
    Alarm,
    Guard,
    Transit,
    Claim,
    Safe,
    Door,
    Premise,
}

impl Category {
    fn patterns(&self) -> &'static [&'static str] {
        match self {
            Category::Cctv => &CCTV_PATTERNS,
            Category::Alarm => &ALARM_PATTERNS,
            Category::Guard => &GUARD_PATTERNS,
            Category::Transit => &TRANSIT_PATTERNS,
            Category::Claim => &CLAIM_PATTERNS,
            Category::Safe => &SAFE_PATTERNS,
            Category::Door => &DOOR_PATTERNS,
            Category::Premise => &PREMISE_PATTERNS,
        }
    }

    fn matches_field(&self, field_name: &str) -> bool {
        self.patterns().iter().any(|p| field_name.contains(p))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expected {
    Yes,
    No,
    NoClaim,
    Claims,
}

/// Aggregation engine over the record store. Returns `None` when a query
/// cannot be mapped to field categories, so the caller can fall through to
/// retrieval.
pub struct AnalyticalEngine {
    store: Arc<RecordStore>,
}

impl AnalyticalEngine {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    pub fn run(&self, query: &str) -> Option<String> {
        let query_lower = query.to_lowercase();

        if is_counting(&query_lower) {
            return self.count(&query_lower);
        }
        if is_listing(&query_lower) {
            return self.list(&query_lower);
        }
        if is_comparison(&query_lower) {
            return self.comparison(&query_lower);
        }
        self.distribution(&query_lower)
    }

    fn count(&self, query: &str) -> Option<String> {
        let (category, expected) = extract_condition(query);
        let category = category?;
        debug!(?category, ?expected, "Running analytical count");

        let mut matching: BTreeSet<&str> = BTreeSet::new();
        for chunk in self.store.chunks() {
            if chunk.record_id.is_empty() {
                continue;
            }
            for (name, value) in &chunk.fields {
                if category.matches_field(&name.to_lowercase()) && value_matches(value, expected) {
                    matching.insert(chunk.record_id.as_str());
                    break;
                }
            }
        }

        if matching.is_empty() {
            return Some("0 proposals match the criteria.".to_string());
        }
        let ids: Vec<&str> = matching.into_iter().collect();
        Some(format!(
            "{} proposal(s) match the criteria. Quote IDs: {}",
            ids.len(),
            ids.join(", ")
        ))
    }

    fn list(&self, query: &str) -> Option<String> {
        let (category, expected) = extract_condition(query);
        let category = category?;

        let mut seen: HashSet<&str> = HashSet::new();
        let mut rows: Vec<(String, String, String)> = Vec::new();
        for chunk in self.store.chunks() {
            if chunk.record_id.is_empty() || seen.contains(chunk.record_id.as_str()) {
                continue;
            }
            let mut fields: Vec<(&String, &String)> = chunk.fields.iter().collect();
            fields.sort_by_key(|(name, _)| *name);
            for (name, value) in fields {
                if category.matches_field(&name.to_lowercase()) && value_matches(value, expected) {
                    seen.insert(chunk.record_id.as_str());
                    rows.push((chunk.record_id.clone(), name.clone(), value.clone()));
                    break;
                }
            }
        }

        if rows.is_empty() {
            return Some("No proposals match the criteria.".to_string());
        }

        let mut lines = vec![format!("Found {} matching proposal(s):", rows.len())];
        for (record_id, field, value) in rows.iter().take(20) {
            lines.push(format!("- {}: {} = {}", record_id, field, value));
        }
        if rows.len() > 20 {
            lines.push(format!("... and {} more.", rows.len() - 20));
        }
        Some(lines.join("\n"))
    }

    fn comparison(&self, query: &str) -> Option<String> {
        let is_max = ["highest", "maximum", "most", "top"]
            .iter()
            .any(|s| query.contains(s));

        let numeric_patterns = [
            ("sum assured", "sum_assured"),
            ("claim amount", "amount_of_claim"),
            ("stock", "maximum_stock"),
            ("value", "value"),
        ];
        let target = numeric_patterns
            .iter()
            .find(|(keyword, _)| query.contains(keyword))
            .map(|(_, pattern)| *pattern)?;

        let mut candidates: Vec<(f64, String, String)> = Vec::new();
        for chunk in self.store.chunks() {
            for (name, value) in &chunk.fields {
                if name.to_lowercase().contains(target) {
                    if let Some(numeric) = parse_numeric(value) {
                        candidates.push((numeric, chunk.record_id.clone(), value.clone()));
                    }
                }
            }
        }
        if candidates.is_empty() {
            return None;
        }

        candidates.sort_by(|a, b| {
            let ord = a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal);
            if is_max {
                ord.reverse()
            } else {
                ord
            }
        });
        let (_, record_id, value) = &candidates[0];
        let word = if is_max { "highest" } else { "lowest" };
        Some(format!(
            "The {} value is {} for proposal {}.",
            word, value, record_id
        ))
    }

    /// Value distribution across all fields of one category.
    fn distribution(&self, query: &str) -> Option<String> {
        let (category, _) = extract_condition(query);
        let category = category?;

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for chunk in self.store.chunks() {
            for (name, value) in &chunk.fields {
                if category.matches_field(&name.to_lowercase()) {
                    *counts.entry(value.clone()).or_insert(0) += 1;
                }
            }
        }
        if counts.is_empty() {
            return None;
        }

        let mut entries: Vec<(String, usize)> = counts.into_iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut lines = vec!["Distribution for matching fields:".to_string()];
        for (value, count) in entries {
            lines.push(format!("- {}: {} proposal(s)", value, count));
        }
        Some(lines.join("\n"))
    }
}

fn is_counting(query: &str) -> bool {
    ["how many", "count", "total", "number of"]
        .iter()
        .any(|s| query.contains(s))
}

fn is_listing(query: &str) -> bool {
    ["list all", "which proposals", "which records", "show all", "what are all"]
        .iter()
        .any(|s| query.contains(s))
}

fn is_comparison(query: &str) -> bool {
    ["highest", "lowest", "maximum", "minimum", "most", "least", "top", "bottom"]
        .iter()
        .any(|s| query.contains(s))
}

/// Map a query onto a field category and the expected yes/no condition.
fn extract_condition(query: &str) -> (Option<Category>, Option<Expected>) {
    let categories = [
        Category::Cctv,
        Category::Alarm,
        Category::Guard,
        Category::Transit,
        Category::Claim,
        Category::Safe,
        Category::Door,
        Category::Premise,
    ];
    let category = categories
        .into_iter()
        .find(|c| c.patterns().iter().any(|p| query.contains(p)));

    let mut expected = if query.contains("no ")
        || query.contains("without")
        || query.contains("don't")
        || query.contains("do not")
    {
        Some(Expected::No)
    } else if query.contains("have") || query.contains("use") || query.contains("with") {
        Some(Expected::Yes)
    } else if query.contains("maintenance") {
        Some(Expected::Yes)
    } else {
        None
    };

    if query.contains("no claim") {
        expected = Some(Expected::NoClaim);
    }
    if query.contains("claims within") || query.contains("has claim") {
        expected = Some(Expected::Claims);
    }

    (category, expected)
}

fn value_matches(value: &str, expected: Option<Expected>) -> bool {
    let Some(expected) = expected else {
        return true;
    };
    let value_lower = value.to_lowercase();
    match expected {
        Expected::Yes => YES_VALUES.contains(&value_lower.as_str()),
        Expected::No => NO_VALUES.contains(&value_lower.as_str()),
        Expected::NoClaim => value_lower.contains("no claim") || value_lower == "001",
        Expected::Claims => value_lower.contains("claim") && !value_lower.contains("no claim"),
    }
}

fn parse_numeric(value: &str) -> Option<f64> {
    let cleaned = value.replace(',', "").replace('$', "").replace("RM", "");
    NUM_RE
        .find(cleaned.trim())
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordChunk;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn chunk(record_id: &str, section: &str, raw: &[(&str, &str)]) -> RecordChunk {
        let fields: HashMap<String, String> = raw
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RecordChunk {
            id: Uuid::new_v4(),
            record_id: record_id.to_string(),
            section: section.to_string(),
            fields: fields.clone(),
            decoded_fields: fields,
            risk_location: "Kuala Lumpur".to_string(),
            owner_name: "Somesh Das".to_string(),
            text: String::new(),
        }
    }

    fn engine() -> AnalyticalEngine {
        AnalyticalEngine::new(Arc::new(RecordStore::from_chunks(vec![
            chunk("MYJADEQT001", "cctv", &[("recording_label", "001")]),
            chunk("MYJADEQT001", "claim_history", &[("claim_label", "001")]),
            chunk(
                "MYJADEQT001",
                "basis_of_sum_assured",
                &[("sum_assured", "RM 1,500,000")],
            ),
            chunk("MYJADEQT002", "cctv", &[("recording_label", "002")]),
            chunk("MYJADEQT002", "alarm", &[("alarm_system_label", "001")]),
            chunk(
                "MYJADEQT002",
                "basis_of_sum_assured",
                &[("sum_assured", "RM 900,000")],
            ),
        ])))
    }

    #[test]
    fn counts_records_with_matching_raw_codes() {
        let answer = engine().run("How many proposals have cctv recording?").unwrap();
        assert_eq!(
            answer,
            "1 proposal(s) match the criteria. Quote IDs: MYJADEQT001"
        );
    }

    #[test]
    fn negation_flips_the_expected_value() {
        let answer = engine().run("How many proposals have no cctv?").unwrap();
        assert_eq!(
            answer,
            "1 proposal(s) match the criteria. Quote IDs: MYJADEQT002"
        );
    }

    #[test]
    fn zero_matches_is_still_an_answer() {
        let answer = engine().run("How many proposals have armed guards?").unwrap();
        assert_eq!(answer, "0 proposals match the criteria.");
    }

    #[test]
    fn count_without_category_returns_none() {
        assert!(engine().run("How many things are there?").is_none());
    }

    #[test]
    fn lists_matching_records_with_field_and_value() {
        let answer = engine().run("Which proposals have an alarm?").unwrap();
        assert_eq!(
            answer,
            "Found 1 matching proposal(s):\n- MYJADEQT002: alarm_system_label = 001"
        );
    }

    #[test]
    fn comparison_reports_the_extreme_raw_value() {
        let answer = engine().run("Which has the highest sum assured?").unwrap();
        assert_eq!(
            answer,
            "The highest value is RM 1,500,000 for proposal MYJADEQT001."
        );

        let lowest = engine().run("Which has the lowest sum assured?").unwrap();
        assert_eq!(
            lowest,
            "The lowest value is RM 900,000 for proposal MYJADEQT002."
        );
    }

    #[test]
    fn no_claim_phrasing_matches_the_raw_code() {
        let answer = engine().run("How many proposals have no claim history?").unwrap();
        assert_eq!(
            answer,
            "1 proposal(s) match the criteria. Quote IDs: MYJADEQT001"
        );
    }

    #[test]
    fn distribution_groups_values_for_a_category() {
        let answer = engine().run("What cctv recording status do proposals report?").unwrap();
        assert!(answer.starts_with("Distribution for matching fields:"));
        assert!(answer.contains("- 001: 1 proposal(s)"));
        assert!(answer.contains("- 002: 1 proposal(s)"));
    }

    #[test]
    fn parses_numbers_out_of_currency_strings() {
        assert_eq!(parse_numeric("RM 1,500,000"), Some(1_500_000.0));
        assert_eq!(parse_numeric("around 20 pieces"), Some(20.0));
        assert_eq!(parse_numeric("none"), None);
    }
}
