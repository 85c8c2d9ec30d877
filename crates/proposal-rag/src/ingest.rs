//! Spreadsheet ingestion.
//!
//! Loads the proposal workbook, parses each section's JSON cell, decodes
//! every field once and renders the section text. The output is the
//! immutable chunk set the rest of the engine runs on.

use anyhow::{Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use rayon::prelude::*;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

use crate::decode;
use crate::sections::{self, SECTION_COLUMNS, SIMPLE_VALUE_COLUMNS};
use crate::types::RecordChunk;

pub const DEFAULT_SHEET: &str = "tbl_MY";

/// Load a proposal workbook into record chunks.
pub fn load_chunks(path: &Path, sheet: &str) -> Result<Vec<RecordChunk>> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook: {}", path.display()))?;

    let range = workbook
        .worksheet_range(sheet)
        .with_context(|| format!("Sheet not found: {}", sheet))?;

    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .context("Workbook sheet is empty")?
        .iter()
        .map(|cell| cell_to_string(cell).trim().to_string())
        .collect();

    let row_maps: Vec<HashMap<String, String>> = rows
        .map(|row| {
            header
                .iter()
                .zip(row.iter())
                .filter(|(name, _)| !name.is_empty())
                .map(|(name, cell)| (name.clone(), cell_to_string(cell)))
                .collect()
        })
        .collect();

    info!(records = row_maps.len(), sheet = %sheet, "Loaded proposal rows");

    let chunks: Vec<RecordChunk> = row_maps
        .par_iter()
        .flat_map(|row| row_to_chunks(row))
        .collect();

    info!(chunks = chunks.len(), "Built section chunks");
    Ok(chunks)
}

/// Build the chunks for one proposal row. Returns nothing when the row has
/// no usable id or fails sum-assured validation.
pub fn row_to_chunks(row: &HashMap<String, String>) -> Vec<RecordChunk> {
    let record_id = match row.get("quote_id").map(|s| s.trim()) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            warn!("Skipping row without quote_id");
            return Vec::new();
        }
    };
    let risk_location = row.get("risk_location").cloned().unwrap_or_default();
    let owner_name = row.get("user_name").cloned().unwrap_or_default();

    if let Some(sum_assured) = row.get("sum_assured").and_then(|cell| parse_json_cell(cell)) {
        if !validate_sum_assured(&sum_assured) {
            warn!(record_id = %record_id, "Skipping record: sum assured must carry exactly one sum insured type");
            return Vec::new();
        }
    }

    let mut chunks = Vec::new();

    for &section in SECTION_COLUMNS {
        let Some(data) = row.get(section).and_then(|cell| parse_json_cell(cell)) else {
            continue;
        };
        chunks.push(build_chunk(&record_id, section, &data, &risk_location, &owner_name));
    }

    for &(column, field) in SIMPLE_VALUE_COLUMNS {
        if let Some(value) = row.get(column).map(|s| s.trim()).filter(|s| !s.is_empty()) {
            let data = serde_json::json!({ field: value });
            chunks.push(build_chunk(&record_id, column, &data, &risk_location, &owner_name));
        }
    }

    chunks
}

fn build_chunk(
    record_id: &str,
    section: &str,
    data: &Value,
    risk_location: &str,
    owner_name: &str,
) -> RecordChunk {
    let decoded = decode::decode_json(data);

    let mut fields = HashMap::new();
    flatten_fields(data, &mut fields);
    let mut decoded_fields = HashMap::new();
    flatten_fields(&decoded, &mut decoded_fields);

    let text = sections::render_section(record_id, section, &decoded);

    RecordChunk {
        id: Uuid::new_v4(),
        record_id: record_id.to_string(),
        section: section.to_string(),
        fields,
        decoded_fields,
        risk_location: risk_location.to_string(),
        owner_name: owner_name.to_string(),
        text,
    }
}

/// Collect scalar leaves into a flat field map. Field names are unique
/// across the schema, so the first occurrence wins on the rare collision
/// (repeated claim entries).
fn flatten_fields(value: &Value, out: &mut HashMap<String, String>) {
    if let Value::Object(map) = value {
        for (key, child) in map {
            match child {
                Value::Object(_) => flatten_fields(child, out),
                Value::Array(items) => {
                    for item in items {
                        if item.is_object() {
                            flatten_fields(item, out);
                        } else if !item.is_null() {
                            out.entry(key.clone())
                                .or_insert_with(|| decode::scalar_to_string(item));
                        }
                    }
                }
                Value::Null => {}
                leaf => {
                    out.entry(key.clone())
                        .or_insert_with(|| decode::scalar_to_string(leaf));
                }
            }
        }
    }
}

/// Parse a JSON cell, tolerating smart quotes from spreadsheet edits.
/// Returns None for empty cells and unparseable content.
pub fn parse_json_cell(cell: &str) -> Option<Value> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    let normalized: String = trimmed
        .chars()
        .map(|c| match c {
            '\u{201c}' | '\u{201d}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect();
    match serde_json::from_str::<Value>(&normalized) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => Some(value),
        _ => None,
    }
}

/// Exactly one sum insured type must be present and non-empty per record.
pub fn validate_sum_assured(sum_assured: &Value) -> bool {
    const SUM_INSURED_KEYS: &[&str] = &[
        "maximum_stock_in_premises_label",
        "maximum_stock_foreign_currency_in_premise_label",
        "value_of_cash_in_premise_label",
    ];

    let Some(map) = sum_assured.as_object() else {
        return false;
    };
    let present = SUM_INSURED_KEYS
        .iter()
        .filter(|key| {
            map.get(**key).is_some_and(|v| match v {
                Value::Null => false,
                Value::String(s) => !s.is_empty(),
                _ => true,
            })
        })
        .count();
    present == 1
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                (*f as i64).to_string()
            } else {
                format!("{:.4}", f)
                    .trim_end_matches('0')
                    .trim_end_matches('.')
                    .to_string()
            }
        }
        Data::Bool(b) => if *b { "true" } else { "false" }.to_string(),
        Data::Error(e) => format!("#ERR:{:?}", e),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_row() -> HashMap<String, String> {
        let mut row = HashMap::new();
        row.insert("quote_id".into(), "MYJADEQT001".into());
        row.insert("risk_location".into(), "Penang".into());
        row.insert("user_name".into(), "Somesh Das".into());
        row.insert(
            "cctv".into(),
            r#"{"recording_label": "001", "cctv_brand_name_label": "Hikvision"}"#.into(),
        );
        row.insert(
            "sum_assured".into(),
            r#"{"maximum_stock_in_premises_label": "500000"}"#.into(),
        );
        row.insert("shop_lifting".into(), "1".into());
        row
    }

    #[test]
    fn row_produces_decoded_chunks() {
        let chunks = row_to_chunks(&sample_row());
        assert_eq!(chunks.len(), 3);

        let cctv = chunks.iter().find(|c| c.section == "cctv").unwrap();
        assert_eq!(cctv.record_id, "MYJADEQT001");
        assert_eq!(cctv.fields["recording_label"], "001");
        assert_eq!(cctv.decoded_fields["recording_label"], "Yes");
        assert!(cctv.text.contains("CCTV Recording: Yes"));
        assert_eq!(cctv.risk_location, "Penang");
        assert_eq!(cctv.owner_name, "Somesh Das");
    }

    #[test]
    fn simple_value_column_becomes_its_own_section() {
        let chunks = row_to_chunks(&sample_row());
        let shop = chunks.iter().find(|c| c.section == "shop_lifting").unwrap();
        assert_eq!(shop.fields["shop_lifting_label"], "1");
        assert_eq!(shop.decoded_fields["shop_lifting_label"], "Yes");
    }

    #[test]
    fn invalid_sum_assured_drops_the_record() {
        let mut row = sample_row();
        row.insert(
            "sum_assured".into(),
            r#"{"maximum_stock_in_premises_label": "500000", "value_of_cash_in_premise_label": "100"}"#.into(),
        );
        assert!(row_to_chunks(&row).is_empty());
    }

    #[test]
    fn missing_quote_id_drops_the_row() {
        let mut row = sample_row();
        row.remove("quote_id");
        assert!(row_to_chunks(&row).is_empty());
    }

    #[test]
    fn json_cells_tolerate_smart_quotes() {
        let parsed = parse_json_cell("{\u{201c}recording_label\u{201d}: \u{201c}001\u{201d}}").unwrap();
        assert_eq!(parsed["recording_label"], "001");
        assert!(parse_json_cell("not json").is_none());
        assert!(parse_json_cell("").is_none());
    }

    #[test]
    fn sum_assured_requires_exactly_one_type() {
        assert!(validate_sum_assured(&json!({
            "value_of_cash_in_premise_label": "100000"
        })));
        assert!(!validate_sum_assured(&json!({})));
        assert!(!validate_sum_assured(&json!({
            "maximum_stock_in_premises_label": "1",
            "value_of_cash_in_premise_label": "2"
        })));
        assert!(!validate_sum_assured(&json!({
            "maximum_stock_in_premises_label": ""
        })));
    }

    #[test]
    fn nested_claims_flatten_first_wins() {
        let data = json!({
            "claim_history_label": "002",
            "additional_details": [
                { "year_of_claim_label": "2021", "amount_of_claim_label": "45000" },
                { "year_of_claim_label": "2023", "amount_of_claim_label": "9000" }
            ]
        });
        let mut out = HashMap::new();
        flatten_fields(&data, &mut out);
        assert_eq!(out["claim_history_label"], "002");
        assert_eq!(out["year_of_claim_label"], "2021");
    }
}
