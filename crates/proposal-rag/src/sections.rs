//! Section schemas and natural-language rendering.
//!
//! Each proposal row stores its data as one JSON cell per section. The
//! renderer turns a decoded section into the text that gets embedded, so the
//! wording here is part of the retrieval contract and must stay stable.

use serde_json::Value;

use crate::decode;

/// Spreadsheet columns that hold JSON section payloads.
pub const SECTION_COLUMNS: &[&str] = &[
    "business_profile",
    "sum_assured",
    "physical_setup",
    "cctv",
    "door_access",
    "alarm",
    "safe",
    "strong_room",
    "display_showcases",
    "display_counters",
    "counter_show_case",
    "transit_and_gaurds",
    "records_keeping",
    "additional_details",
    "add_on_coverage",
    "claim_history",
    "premise_sub_limit",
    "display_window",
    "summary_coverage_values",
];

/// Plain-value columns promoted to single-field sections.
pub const SIMPLE_VALUE_COLUMNS: &[(&str, &str)] = &[("shop_lifting", "shop_lifting_label")];

fn schema_title(section: &str) -> Option<&'static str> {
    match section {
        "business_profile" => Some("Business Profile"),
        "cctv" => Some("CCTV Security"),
        "transit_and_gaurds" => Some("Transit and Guards"),
        "claim_history" => Some("Claim History"),
        _ => None,
    }
}

fn is_array_section(section: &str) -> bool {
    section == "claim_history"
}

/// Human title for a section: schema title when defined, else the section
/// name title-cased.
pub fn section_title(section: &str) -> String {
    match schema_title(section) {
        Some(title) => title.to_string(),
        None => title_case(&section.replace('_', " ")),
    }
}

pub(crate) fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn has_value(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !matches!(s.as_str(), "" | "-1" | "0"),
        Value::Number(n) => n.as_i64() != Some(-1) && n.as_i64() != Some(0),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) => true,
    }
}

fn label_for(section: &str, key: &str) -> String {
    match decode::display_label(section, key) {
        Some(label) => label.to_string(),
        None => title_case(&key.replace('_', " ")),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render one decoded section as text. `data` must already be decoded;
/// raw codes leaking into here would end up verbatim in prompts.
pub fn render_section(record_id: &str, section: &str, data: &Value) -> String {
    let mut lines = vec![format!("Proposal {} – {}:", record_id, section_title(section))];

    // claim_history is a dict carrying a status field plus a nested claim list
    if section == "claim_history" {
        if let Value::Object(map) = data {
            if let Some(status) = map.get("claim_history_label").filter(|v| has_value(v)) {
                lines.push(format!("Claim Status: {}", value_text(status)));
            }
            if let Some(Value::Array(details)) = map.get("additional_details") {
                let valid: Vec<&serde_json::Map<String, Value>> = details
                    .iter()
                    .filter_map(Value::as_object)
                    .filter(|item| {
                        item.get("year_of_claim_label").is_some_and(has_value)
                    })
                    .collect();
                for (i, claim) in valid.iter().enumerate() {
                    lines.push(format!("Claim {}:", i + 1));
                    for (key, label) in [
                        ("year_of_claim_label", "Year"),
                        ("amount_of_claim_label", "Amount"),
                        ("description_label", "Description"),
                    ] {
                        if let Some(value) = claim.get(key).filter(|v| has_value(v)) {
                            lines.push(format!("- {}: {}", label, value_text(value)));
                        }
                    }
                }
            }
            return lines.join("\n");
        }
    }

    if is_array_section(section) || data.is_array() {
        match data.as_array() {
            Some(items) if !items.is_empty() => {
                for (i, item) in items.iter().enumerate() {
                    lines.push(format!("Item {}:", i + 1));
                    match item {
                        Value::Object(map) => {
                            for (key, value) in map {
                                if has_value(value) {
                                    lines.push(format!(
                                        "- {}: {}",
                                        label_for(section, key),
                                        value_text(value)
                                    ));
                                }
                            }
                        }
                        other if has_value(other) => {
                            lines.push(format!("- Value: {}", value_text(other)));
                        }
                        _ => {}
                    }
                }
            }
            _ => lines.push("No records available.".to_string()),
        }
        return lines.join("\n");
    }

    match data {
        Value::Object(map) => {
            for (key, value) in map {
                if has_value(value) {
                    lines.push(format!("{}: {}", label_for(section, key), value_text(value)));
                }
            }
        }
        other if has_value(other) => {
            lines.push(format!("Value: {}", value_text(other)));
        }
        _ => {}
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn titles_fall_back_to_title_case() {
        assert_eq!(section_title("cctv"), "CCTV Security");
        assert_eq!(section_title("records_keeping"), "Records Keeping");
    }

    #[test]
    fn object_section_renders_labeled_lines() {
        let data = json!({
            "recording_label": "Yes",
            "cctv_brand_name_label": "Hikvision",
            "cctv_model_label": ""
        });
        let text = render_section("MYJADEQT001", "cctv", &data);
        assert!(text.starts_with("Proposal MYJADEQT001 – CCTV Security:"));
        assert!(text.contains("CCTV Recording: Yes"));
        assert!(text.contains("CCTV Brand Name: Hikvision"));
        // Empty values are elided
        assert!(!text.contains("CCTV Model"));
    }

    #[test]
    fn sentinel_values_are_elided() {
        let data = json!({
            "recording_label": "0",
            "type_of_back_up_label": "-1"
        });
        let text = render_section("MYJADEQT001", "cctv", &data);
        assert_eq!(text, "Proposal MYJADEQT001 – CCTV Security:");
    }

    #[test]
    fn claim_history_lists_valid_claims_only() {
        let data = json!({
            "claim_history_label": "Claims within the past 3 years",
            "additional_details": [
                {
                    "year_of_claim_label": "2021",
                    "amount_of_claim_label": "45000",
                    "description_label": "Burglary"
                },
                { "description_label": "No year, skipped" }
            ]
        });
        let text = render_section("MYJADEQT003", "claim_history", &data);
        assert!(text.contains("Claim Status: Claims within the past 3 years"));
        assert!(text.contains("Claim 1:"));
        assert!(text.contains("- Year: 2021"));
        assert!(text.contains("- Amount: 45000"));
        assert!(text.contains("- Description: Burglary"));
        assert!(!text.contains("Claim 2:"));
        assert!(!text.contains("No year, skipped"));
    }

    #[test]
    fn unknown_keys_get_title_cased_labels() {
        let data = json!({ "some_new_field_label": "value" });
        let text = render_section("MYJADEQT001", "additional_details", &data);
        assert!(text.contains("Some New Field Label: value"));
    }
}
