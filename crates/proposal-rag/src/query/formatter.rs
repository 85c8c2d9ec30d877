//! Render executor results as user-facing answers.
//!
//! The data is already exact by the time it gets here, so formatting is a
//! pure function of the parsed intent and the result. Zero matches is a
//! valid answer for count and list, a miss for everything else.

use crate::types::{Intent, ParsedQuery, QueryResult};

pub const NOT_AVAILABLE: &str = "Data not available in the proposal records.";

pub fn format_answer(parsed: &ParsedQuery, result: &QueryResult) -> String {
    let summary = result.summary.clone().unwrap_or_default();

    match parsed.intent {
        Intent::Count if result.count == 0 => {
            "0 proposals match the criteria. No records found with the specified condition."
                .to_string()
        }
        Intent::List if result.count == 0 => match &parsed.filter_contains {
            Some(contains) => format!("0 proposals found with '{}' in the records.", contains),
            None => "0 proposals match the criteria.".to_string(),
        },
        _ if !result.success || result.count == 0 => NOT_AVAILABLE.to_string(),
        Intent::Lookup if result.count == 1 => {
            let detail = result
                .details
                .first()
                .cloned()
                .unwrap_or_else(|| summary.clone());
            match &parsed.record_id {
                Some(record_id) => format!("For {}: {}", record_id, detail),
                None => detail,
            }
        }
        Intent::Lookup => {
            if result.details.is_empty() {
                summary
            } else {
                bullets(&result.details)
            }
        }
        Intent::Count => {
            let query_lower = parsed.raw_query.to_lowercase();
            let wants_names = ["name", "names", "which", "list", "who", "what are"]
                .iter()
                .any(|w| query_lower.contains(w));

            if wants_names && !result.details.is_empty() {
                let names: Vec<String> = result.details.iter().take(20).cloned().collect();
                if result.count <= 20 {
                    format!(
                        "There are {} proposal(s) that match. Here are their names:\n{}",
                        result.count,
                        bullets(&names)
                    )
                } else {
                    format!(
                        "There are {} proposal(s) that match. Here are the first 20:\n{}\n... and {} more.",
                        result.count,
                        bullets(&names),
                        result.count - 20
                    )
                }
            } else {
                format!("{} proposal(s) match the criteria.", result.count)
            }
        }
        Intent::List => {
            if result.details.is_empty() {
                summary
            } else {
                let items: Vec<String> = result.details.iter().take(15).cloned().collect();
                let mut listing = format!(
                    "Found {} matching proposal(s):\n{}",
                    result.count,
                    bullets(&items)
                );
                if result.count > 15 {
                    listing.push_str(&format!("\n... and {} more.", result.count - 15));
                }
                listing
            }
        }
        Intent::Compare => summary,
        Intent::OutOfScope => {
            if result.details.is_empty() {
                summary
            } else {
                let shown: Vec<String> = result.details.iter().take(10).cloned().collect();
                format!("{}\n{}", summary, bullets(&shown))
            }
        }
    }
}

fn bullets(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}
