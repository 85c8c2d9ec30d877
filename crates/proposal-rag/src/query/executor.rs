//! Deterministic query execution against the record store.
//!
//! Every branch reads `decoded_fields` overlaid on raw `fields`, so values
//! are already human-readable. Nothing here re-decodes: the same code means
//! different things under different field names, and decoding happened once
//! at ingestion with the field name as routing key.

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock};
use tracing::debug;

use crate::sections::title_case;
use crate::store::RecordStore;
use crate::types::{Intent, MatchRow, ParsedQuery, QueryResult, RecordChunk};

/// Minimum `field_match_score` for a field to count as a hit.
const MATCH_THRESHOLD: u32 = 10;

/// Decoded yes/no values and the raw codes the model sometimes echoes back.
const YES_CODES: [&str; 4] = ["yes", "001", "true", "1"];
const NO_CODES: [&str; 5] = ["no", "002", "false", "2", "0"];

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[a-zA-Z]{3,}\b").expect("word regex"));

// ============================================================
// Field matching
// ============================================================

fn normalize_field(name: &str) -> String {
    name.to_lowercase().replace("_label", "").replace('_', " ")
}

/// Score how well a requested field name matches an actual field name.
pub(crate) fn field_match_score(requested: &str, actual: &str) -> u32 {
    let req = normalize_field(requested);
    let act = normalize_field(actual);

    if req == act {
        return 100;
    }
    if req.contains(&act) || act.contains(&req) {
        let shorter = req.len().min(act.len());
        return 50 + shorter as u32;
    }

    let noise: HashSet<&str> =
        ["the", "a", "an", "of", "in", "for", "is", "do", "you", "label"]
            .into_iter()
            .collect();
    let req_words: HashSet<&str> =
        req.split_whitespace().filter(|w| !noise.contains(w)).collect();
    if req_words.is_empty() {
        return 0;
    }
    let act_words: HashSet<&str> =
        act.split_whitespace().filter(|w| !noise.contains(w)).collect();

    req_words.intersection(&act_words).count() as u32 * 10
}

/// Raw fields overlaid by decoded fields; decoded wins.
fn search_fields(chunk: &RecordChunk) -> HashMap<&str, &str> {
    let mut fields: HashMap<&str, &str> = chunk
        .fields
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    for (k, v) in &chunk.decoded_fields {
        fields.insert(k.as_str(), v.as_str());
    }
    fields
}

/// Best-scoring field in `fields` for a requested name, at or above the
/// acceptance threshold.
fn best_field_match<'f>(
    requested: &str,
    fields: &HashMap<&'f str, &'f str>,
) -> Option<(&'f str, &'f str)> {
    let mut best_score = 0;
    let mut best: Option<(&str, &str)> = None;
    for (&name, &value) in fields {
        let score = field_match_score(requested, name);
        if score > best_score {
            best_score = score;
            best = Some((name, value));
        }
    }
    if best_score >= MATCH_THRESHOLD {
        best
    } else {
        None
    }
}

fn field_label(field: &str) -> String {
    title_case(&normalize_field(field))
}

fn parse_numeric(value: &str) -> Option<f64> {
    let cleaned = value.replace(',', "").replace("RM", "").replace('$', "");
    cleaned.trim().parse::<f64>().ok()
}

// ============================================================
// Executor
// ============================================================

/// Executes parsed queries against the record store. No model in the loop,
/// so answers come straight from the ingested data.
pub struct QueryExecutor {
    store: Arc<RecordStore>,
}

impl QueryExecutor {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    pub fn execute(&self, parsed: &ParsedQuery) -> QueryResult {
        debug!(intent = %parsed.intent, record_id = ?parsed.record_id, "Executing parsed query");

        match parsed.intent {
            Intent::Lookup if parsed.record_id.is_some() => self.lookup(parsed),
            Intent::Lookup => self.entity_lookup(parsed),
            // The parser sometimes labels an entity field question as
            // count/list; reroute when the query names a known entity and
            // asks for concrete data fields.
            _ if parsed.record_id.is_none() && self.should_entity_lookup(parsed) => {
                self.entity_lookup(parsed)
            }
            Intent::Count => self.count(parsed),
            Intent::List => self.list(parsed),
            Intent::Compare => self.compare(parsed),
            _ => self.general(parsed),
        }
    }

    // ------------------------------------------------------------------
    // Lookup by record id
    // ------------------------------------------------------------------

    fn lookup(&self, parsed: &ParsedQuery) -> QueryResult {
        let record_id = parsed.record_id.as_deref().unwrap_or_default();
        let mut results: Vec<MatchRow> = Vec::new();

        for chunk in self.store.record_chunks(record_id) {
            let fields = search_fields(chunk);
            if fields.is_empty() {
                continue;
            }

            for output_field in &parsed.output_fields {
                if let Some((name, value)) = best_field_match(output_field, &fields) {
                    results.push(MatchRow {
                        record_id: record_id.to_string(),
                        field: name.to_string(),
                        value: value.to_string(),
                    });
                }
            }

            // Target fields only kick in while nothing matched yet.
            if results.is_empty() {
                for target in &parsed.target_fields {
                    if let Some((name, value)) = best_field_match(target, &fields) {
                        results.push(MatchRow {
                            record_id: record_id.to_string(),
                            field: name.to_string(),
                            value: value.to_string(),
                        });
                    }
                }
            }
        }

        let mut seen = HashSet::new();
        let unique: Vec<MatchRow> = results
            .into_iter()
            .filter(|r| seen.insert((r.record_id.clone(), r.field.clone())))
            .collect();

        if unique.is_empty() {
            return QueryResult {
                summary: Some(format!("No matching fields found for {}", record_id)),
                ..QueryResult::miss()
            };
        }

        let details: Vec<String> = unique
            .iter()
            .map(|r| format!("{}: {}", field_label(&r.field), r.value))
            .collect();
        QueryResult {
            success: true,
            count: unique.len(),
            summary: Some(format!("Found {} field(s) for {}", unique.len(), record_id)),
            data: unique,
            details,
        }
    }

    // ------------------------------------------------------------------
    // Entity detection
    // ------------------------------------------------------------------

    /// True when the query names a known person or business and asks for
    /// data fields beyond the entity's own name.
    fn should_entity_lookup(&self, parsed: &ParsedQuery) -> bool {
        let has_data_fields = parsed
            .output_fields
            .iter()
            .chain(&parsed.target_fields)
            .any(|f| {
                let f = f.to_lowercase();
                !f.contains("business_name") && !f.contains("person_in_charge")
            });
        if !has_data_fields {
            return false;
        }

        if let Some(contains) = &parsed.filter_contains {
            if self.extract_entity(contains).is_some() {
                return true;
            }
        }
        self.extract_entity(&parsed.raw_query).is_some()
    }

    /// Find a known entity name (person or business) inside the query.
    /// Longest names are tried first so "Heritage Gold Sdn Bhd" wins over
    /// a shorter name it happens to contain.
    fn extract_entity(&self, query: &str) -> Option<String> {
        let query_lower = query.to_lowercase();

        let mut names: HashSet<String> = HashSet::new();
        for chunk in self.store.chunks() {
            let owner = chunk.owner_name.trim();
            if !owner.is_empty() {
                names.insert(owner.to_string());
            }
            for (name, value) in search_fields(chunk) {
                let lower = name.to_lowercase();
                if lower.contains("business_name") || lower.contains("person_in_charge") {
                    let value = value.trim();
                    if !value.is_empty()
                        && !matches!(value.to_lowercase().as_str(), "unknown" | "none")
                    {
                        names.insert(value.to_string());
                    }
                }
            }
        }

        let mut sorted: Vec<String> = names.into_iter().collect();
        sorted.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        sorted
            .into_iter()
            .find(|name| query_lower.contains(&name.to_lowercase()))
    }

    // ------------------------------------------------------------------
    // Entity lookup (person or business, no record id)
    // ------------------------------------------------------------------

    fn entity_lookup(&self, parsed: &ParsedQuery) -> QueryResult {
        let search_name = match parsed
            .filter_contains
            .as_deref()
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .or_else(|| self.extract_entity(&parsed.raw_query).map(|e| e.to_lowercase()))
        {
            Some(name) => name,
            None => return self.general(parsed),
        };

        let mut output_fields: Vec<String> = parsed.output_fields.clone();
        if let Some(filter_field) = &parsed.filter_field {
            if parsed.filter_value.is_none() && !output_fields.contains(filter_field) {
                output_fields.push(filter_field.clone());
            }
        }
        for target in &parsed.target_fields {
            if !output_fields.contains(target) {
                output_fields.push(target.clone());
            }
        }
        if output_fields.is_empty() {
            return self.general(parsed);
        }

        // Step 1: find records whose owner, person in charge or business
        // name overlaps the search name in either direction.
        let mut matched: Vec<(String, String)> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for chunk in self.store.chunks() {
            if chunk.record_id.is_empty() || seen.contains(chunk.record_id.as_str()) {
                continue;
            }

            let owner = chunk.owner_name.trim().to_lowercase();
            let mut found =
                !owner.is_empty() && (owner.contains(&search_name) || search_name.contains(&owner));

            if !found {
                for (name, value) in search_fields(chunk) {
                    let lower = name.to_lowercase();
                    if lower.contains("person_in_charge") || lower.contains("business_name") {
                        let value = value.trim().to_lowercase();
                        if !value.is_empty()
                            && (value.contains(&search_name) || search_name.contains(&value))
                        {
                            found = true;
                            break;
                        }
                    }
                }
            }

            if found {
                seen.insert(chunk.record_id.as_str());
                let business = self.field_value(chunk, "business_name");
                matched.push((chunk.record_id.clone(), business));
            }
        }

        if matched.is_empty() {
            return QueryResult {
                summary: Some(format!("No proposal found for '{}'", search_name)),
                ..QueryResult::miss()
            };
        }

        // Step 2: pull the requested fields for each matched record.
        let mut data: Vec<MatchRow> = Vec::new();
        let mut details: Vec<String> = Vec::new();

        for (record_id, business) in &matched {
            let mut retrieved: Vec<(String, String)> = Vec::new();

            for chunk in self.store.record_chunks(record_id) {
                let fields = search_fields(chunk);
                for output_field in &output_fields {
                    if retrieved.iter().any(|(name, _)| name == output_field) {
                        continue;
                    }
                    if let Some((name, value)) = best_field_match(output_field, &fields) {
                        match retrieved.iter_mut().find(|(n, _)| n == name) {
                            Some(entry) => entry.1 = value.to_string(),
                            None => retrieved.push((name.to_string(), value.to_string())),
                        }
                    }
                }
            }

            if retrieved.is_empty() {
                retrieved.push((output_fields.join(", "), "Not found".to_string()));
            }
            for (field, value) in retrieved {
                details.push(format!(
                    "{} ({}): {} = {}",
                    business,
                    record_id,
                    field_label(&field),
                    value
                ));
                data.push(MatchRow {
                    record_id: record_id.clone(),
                    field,
                    value,
                });
            }
        }

        QueryResult {
            success: true,
            count: data.len(),
            summary: Some(format!(
                "Found data for {} matching proposal(s)",
                matched.len()
            )),
            data,
            details,
        }
    }

    // ------------------------------------------------------------------
    // Count
    // ------------------------------------------------------------------

    fn count(&self, parsed: &ParsedQuery) -> QueryResult {
        let mut matching: HashSet<&str> = HashSet::new();
        let mut data: Vec<MatchRow> = Vec::new();
        let mut details: Vec<String> = Vec::new();

        for chunk in self.store.chunks() {
            if chunk.record_id.is_empty() || matching.contains(chunk.record_id.as_str()) {
                continue;
            }
            let fields = search_fields(chunk);

            if let Some(contains) = &parsed.filter_contains {
                let term = contains.to_lowercase();
                let found = chunk.text.to_lowercase().contains(&term)
                    || fields.values().any(|v| v.to_lowercase().contains(&term))
                    || [&chunk.risk_location, &chunk.owner_name]
                        .iter()
                        .any(|v| !v.is_empty() && v.to_lowercase().contains(&term));

                if found {
                    matching.insert(chunk.record_id.as_str());
                    let business = self.field_value(chunk, "business_name");
                    details.push(format!("{} ({})", business, chunk.record_id));
                    data.push(MatchRow {
                        record_id: chunk.record_id.clone(),
                        field: chunk.section.clone(),
                        value: chunk.text.chars().take(100).collect(),
                    });
                }
                continue;
            }

            let (Some(filter_field), Some(filter_value)) =
                (&parsed.filter_field, &parsed.filter_value)
            else {
                continue;
            };
            let expected = filter_value.trim().to_lowercase();
            let filter_key = filter_field.to_lowercase().replace("_label", "");

            let mut hit: Option<(String, String)> = None;
            for (&name, &value) in &fields {
                if !name.to_lowercase().replace("_label", "").contains(&filter_key) {
                    continue;
                }
                let value_lower = value.trim().to_lowercase();

                // Decoded values are "Yes"/"No" but the model may echo the
                // raw codes; treat either spelling of either side as equal.
                let matched = (YES_CODES.contains(&expected.as_str())
                    && YES_CODES.contains(&value_lower.as_str()))
                    || (NO_CODES.contains(&expected.as_str())
                        && NO_CODES.contains(&value_lower.as_str()))
                    || value_lower == expected
                    || (expected.len() > 2 && value_lower.contains(&expected));
                if matched {
                    hit = Some((name.to_string(), value.to_string()));
                    break;
                }
            }

            if hit.is_none() {
                for (top_key, top_value) in [
                    ("risk_location", &chunk.risk_location),
                    ("user_name", &chunk.owner_name),
                ] {
                    if top_key.contains(&filter_key)
                        && top_value.trim().to_lowercase().contains(&expected)
                    {
                        hit = Some((top_key.to_string(), top_value.to_string()));
                        break;
                    }
                }
            }

            if let Some((field, value)) = hit {
                matching.insert(chunk.record_id.as_str());
                let business = self.field_value(chunk, "business_name");
                details.push(format!("{} ({})", business, chunk.record_id));
                data.push(MatchRow {
                    record_id: chunk.record_id.clone(),
                    field,
                    value,
                });
            }
        }

        let count = matching.len();
        if count == 0 {
            // Zero matches is still an answer for a count.
            return QueryResult {
                summary: Some("0 proposals match the criteria".to_string()),
                ..QueryResult::empty_success()
            };
        }
        QueryResult {
            success: true,
            count,
            summary: Some(format!("{} proposal(s) match the criteria", count)),
            data,
            details,
        }
    }

    // ------------------------------------------------------------------
    // List
    // ------------------------------------------------------------------

    fn list(&self, parsed: &ParsedQuery) -> QueryResult {
        // Same matching as count; details already name one business per
        // matched record.
        self.count(parsed)
    }

    // ------------------------------------------------------------------
    // Compare (highest/lowest)
    // ------------------------------------------------------------------

    fn compare(&self, parsed: &ParsedQuery) -> QueryResult {
        // Raw fields only: decoded values may carry labels that break
        // numeric parsing.
        let mut candidates: Vec<(MatchRow, String, f64)> = Vec::new();

        for chunk in self.store.chunks() {
            if chunk.record_id.is_empty() {
                continue;
            }
            for target in &parsed.target_fields {
                for (name, value) in &chunk.fields {
                    if field_match_score(target, name) < MATCH_THRESHOLD {
                        continue;
                    }
                    if let Some(numeric) = parse_numeric(value) {
                        let business = self.field_value(chunk, "business_name");
                        candidates.push((
                            MatchRow {
                                record_id: chunk.record_id.clone(),
                                field: name.clone(),
                                value: value.clone(),
                            },
                            business,
                            numeric,
                        ));
                    }
                }
            }
        }

        if candidates.is_empty() {
            return QueryResult {
                summary: Some("Could not find comparable values".to_string()),
                ..QueryResult::miss()
            };
        }

        let raw = parsed.raw_query.to_lowercase();
        let is_max =
            raw.contains("highest") || raw.contains("maximum") || raw.contains("most");
        candidates.sort_by(|a, b| {
            let ord = a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal);
            if is_max {
                ord.reverse()
            } else {
                ord
            }
        });

        let (best, business, _) = candidates.swap_remove(0);
        let word = if is_max { "highest" } else { "lowest" };
        QueryResult {
            success: true,
            count: 1,
            summary: Some(format!(
                "The {} value is {} for {} ({})",
                word, best.value, business, best.record_id
            )),
            details: vec![format!("{} ({}): {}", business, best.record_id, best.value)],
            data: vec![best],
        }
    }

    // ------------------------------------------------------------------
    // General term search
    // ------------------------------------------------------------------

    fn general(&self, parsed: &ParsedQuery) -> QueryResult {
        let mut terms: Vec<String> = Vec::new();
        if let Some(contains) = &parsed.filter_contains {
            terms.push(contains.to_lowercase());
        }
        let ignore: HashSet<&str> = [
            "what", "how", "many", "which", "the", "are", "have", "has", "with", "and", "for",
            "their", "names", "all",
        ]
        .into_iter()
        .collect();
        let raw = parsed.raw_query.to_lowercase();
        terms.extend(
            WORD_RE
                .find_iter(&raw)
                .map(|m| m.as_str().to_string())
                .filter(|w| !ignore.contains(w.as_str())),
        );

        let mut seen: HashSet<&str> = HashSet::new();
        let mut data: Vec<MatchRow> = Vec::new();
        let mut details: Vec<String> = Vec::new();

        for chunk in self.store.chunks() {
            if chunk.record_id.is_empty() || seen.contains(chunk.record_id.as_str()) {
                continue;
            }
            let fields = search_fields(chunk);
            if fields.is_empty() {
                continue;
            }

            'fields: for (&name, &value) in &fields {
                let value_lower = value.to_lowercase();
                let name_lower = name.to_lowercase();
                for term in &terms {
                    if value_lower.contains(term) || name_lower.contains(term) {
                        seen.insert(chunk.record_id.as_str());
                        let business = self.field_value(chunk, "business_name");
                        details.push(format!("{} ({})", business, chunk.record_id));
                        data.push(MatchRow {
                            record_id: chunk.record_id.clone(),
                            field: name.to_string(),
                            value: value.to_string(),
                        });
                        break 'fields;
                    }
                }
            }
        }

        if data.is_empty() {
            return QueryResult {
                summary: Some("No matching data found".to_string()),
                ..QueryResult::miss()
            };
        }
        QueryResult {
            success: true,
            count: data.len(),
            summary: Some(format!("Found {} matching proposal(s)", data.len())),
            data,
            details,
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Decoded value for a field name pattern, searching this chunk first and
    /// then the record's other chunks.
    fn field_value(&self, chunk: &RecordChunk, pattern: &str) -> String {
        let pattern = pattern.to_lowercase();
        for (name, value) in search_fields(chunk) {
            if name.to_lowercase().contains(&pattern) {
                return value.to_string();
            }
        }
        for other in self.store.record_chunks(&chunk.record_id) {
            if other.id == chunk.id {
                continue;
            }
            for (name, value) in search_fields(other) {
                if name.to_lowercase().contains(&pattern) {
                    return value.to_string();
                }
            }
        }
        "Unknown".to_string()
    }
}

// ============================================================
// Tests
// ============================================================
