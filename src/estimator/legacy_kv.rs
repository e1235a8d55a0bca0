//! Legacy line-oriented `Key=value` report parser.
//!
//! Older prompt templates asked the model for a flat key=value format with
//! long-form prose sections. This parser is deliberately isolated: its
//! capture-until-next-known-key heuristic must not leak into the JSON path.
//! Missing keys yield empty strings and zeros, never an error - older prompts
//! may omit sections.

use regex::Regex;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Recognized keys, in no particular order. A value runs from its key's
/// separator to the start of the next recognized key or end of text.
const KNOWN_KEYS: [&str; 11] = [
    "Material_Cost",
    "Labor_Cost",
    "Permits",
    "Timeline",
    "Contingency Suggestions",
    "Executive Summary",
    "Project Analysis",
    "Market Conditions",
    "Risk Assessment",
    "Timeline Scheduling",
    "Recommendations",
];

#[derive(Debug, Clone, Default)]
pub struct LegacyReport {
    pub materials_cost: f64,
    pub labor_cost: f64,
    pub permits_cost: f64,
    pub timeline: String,
    pub contingency_suggestions: String,
    /// Long-form prose sections, keyed by their report heading.
    pub sections: BTreeMap<String, String>,
}

impl LegacyReport {
    /// Convert to the shared report shape so the aggregator sees the same
    /// field names regardless of which format produced the report.
    pub fn to_report_value(&self) -> Value {
        let mut report = json!({
            "materialsCost": self.materials_cost,
            "laborCost": self.labor_cost,
            "permitsCost": self.permits_cost,
            "timeline": self.timeline,
            "contingencySuggestions": self.contingency_suggestions,
        });

        // A $ figure in the suggestions text counts as a model-supplied
        // contingency; without one the aggregator falls back to the 7% rule.
        if let Some(amount) = extract_dollar_amount(&self.contingency_suggestions) {
            report["contingencyCost"] = json!(amount);
        }

        if !self.sections.is_empty() {
            report["sections"] = json!(self.sections);
        }

        report
    }
}

/// Parse a legacy report. Tolerant: unrecognized text between keys is skipped,
/// multi-line section values are preserved intact.
pub fn parse(raw: &str) -> LegacyReport {
    let mut report = LegacyReport::default();

    // Locate every recognized key occurrence, then sort by position so each
    // value can run up to the next key.
    let mut hits: Vec<(usize, usize, &str)> = Vec::new();
    for key in KNOWN_KEYS {
        let mut search_from = 0;
        while let Some(found) = raw[search_from..].find(key) {
            let start = search_from + found;
            let value_start = start + key.len();
            // Only a key when followed by an = or : separator
            if separator_len(&raw[value_start..]).is_some() {
                hits.push((start, value_start, key));
            }
            search_from = start + key.len();
        }
    }
    hits.sort_by_key(|(start, _, _)| *start);

    for (index, (_, value_start, key)) in hits.iter().enumerate() {
        let sep = separator_len(&raw[*value_start..]).unwrap_or(0);
        let value_start = value_start + sep;
        let value_end = hits
            .get(index + 1)
            .map(|(next_start, _, _)| *next_start)
            .unwrap_or(raw.len());
        let value = raw[value_start..value_end.max(value_start)].trim();

        match *key {
            "Material_Cost" => report.materials_cost = parse_amount(value),
            "Labor_Cost" => report.labor_cost = parse_amount(value),
            "Permits" => report.permits_cost = parse_amount(value),
            "Timeline" => report.timeline = value.to_string(),
            "Contingency Suggestions" => report.contingency_suggestions = value.to_string(),
            section => {
                report
                    .sections
                    .insert(section.to_string(), value.to_string());
            }
        }
    }

    report
}

/// True when the text contains at least one recognized key followed by a
/// separator. Used to decide whether free-form text is a legacy report at all.
pub fn contains_known_key(text: &str) -> bool {
    KNOWN_KEYS.iter().any(|key| {
        text.match_indices(key)
            .any(|(start, _)| separator_len(&text[start + key.len()..]).is_some())
    })
}

/// Length of the `=` or `:` separator (with surrounding spaces) following a
/// key, or `None` if the match was not actually a key.
fn separator_len(rest: &str) -> Option<usize> {
    let trimmed = rest.trim_start_matches(' ');
    let leading = rest.len() - trimmed.len();
    if trimmed.starts_with('=') || trimmed.starts_with(':') {
        Some(leading + 1)
    } else {
        None
    }
}

/// Pull the first numeric amount out of a value like `5000`, `$5,000` or
/// `$5,000 (materials only)`. Anything without a number is zero.
fn parse_amount(value: &str) -> f64 {
    static AMOUNT: OnceLock<Regex> = OnceLock::new();
    let amount = AMOUNT
        .get_or_init(|| Regex::new(r"(\d[\d,]*(?:\.\d+)?)").expect("amount pattern"));
    amount
        .captures(value)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().replace(',', "").parse().ok())
        .unwrap_or(0.0)
}

/// First `$`-prefixed figure in free text, e.g. `reserve $1,200 for decking`.
pub fn extract_dollar_amount(text: &str) -> Option<f64> {
    static DOLLARS: OnceLock<Regex> = OnceLock::new();
    let dollars = DOLLARS
        .get_or_init(|| Regex::new(r"\$\s*(\d[\d,]*(?:\.\d+)?)").expect("dollar pattern"));
    dollars
        .captures(text)?
        .get(1)?
        .as_str()
        .replace(',', "")
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_REPORT: &str = "\
Material_Cost=5000
Labor_Cost=3000
Permits=200
Timeline=standard
Contingency Suggestions=Add 10% buffer
Executive Summary=The roof is at end of life and should be replaced this season.
Homeowner priorities were weighted toward durability over cost.
Project Analysis=Tear-off and redeck of 1500 sq ft, architectural shingles.
Market Conditions=Shingle prices stable; labor tight in the metro.
Risk Assessment=Moderate. Decking condition unknown until tear-off.
Timeline Scheduling=Permitting 1-2 weeks, build 5 days weather permitting.
Recommendations=Replace flashing and add ridge venting while the deck is open.";

    #[test]
    fn parses_cost_fields() {
        let report = parse(FULL_REPORT);
        assert_eq!(report.materials_cost, 5000.0);
        assert_eq!(report.labor_cost, 3000.0);
        assert_eq!(report.permits_cost, 200.0);
        assert_eq!(report.timeline, "standard");
        assert_eq!(report.contingency_suggestions, "Add 10% buffer");
    }

    #[test]
    fn multi_line_sections_are_preserved_intact() {
        let report = parse(FULL_REPORT);
        let summary = &report.sections["Executive Summary"];
        assert!(summary.contains("end of life"));
        assert!(
            summary.contains("durability over cost"),
            "second line of the section was dropped"
        );
    }

    #[test]
    fn all_six_sections_are_captured() {
        let report = parse(FULL_REPORT);
        assert_eq!(report.sections.len(), 6);
        assert!(report.sections["Timeline Scheduling"].contains("Permitting 1-2 weeks"));
    }

    #[test]
    fn missing_keys_yield_zero_and_empty() {
        let report = parse("Material_Cost=5000");
        assert_eq!(report.materials_cost, 5000.0);
        assert_eq!(report.labor_cost, 0.0);
        assert_eq!(report.permits_cost, 0.0);
        assert_eq!(report.timeline, "");
        assert!(report.sections.is_empty());
    }

    #[test]
    fn empty_input_is_all_defaults() {
        let report = parse("");
        assert_eq!(report.materials_cost, 0.0);
        assert!(report.contingency_suggestions.is_empty());
    }

    #[test]
    fn amounts_tolerate_currency_formatting() {
        let report = parse("Material_Cost=$5,250.50\nLabor_Cost=approx 3000 total");
        assert_eq!(report.materials_cost, 5250.5);
        assert_eq!(report.labor_cost, 3000.0);
    }

    #[test]
    fn colon_separator_is_accepted() {
        let report = parse("Material_Cost: 1200\nTimeline: flexible");
        assert_eq!(report.materials_cost, 1200.0);
        assert_eq!(report.timeline, "flexible");
    }

    #[test]
    fn key_like_text_without_separator_is_not_a_key() {
        let report = parse("Material_Cost=100\nThe Permits process is slow here");
        assert_eq!(report.permits_cost, 0.0);
        // and the prose stays inside the preceding value
        assert_eq!(report.materials_cost, 100.0);
    }

    #[test]
    fn known_key_detection_requires_a_separator() {
        assert!(contains_known_key("Material_Cost=5000"));
        assert!(contains_known_key("Timeline: flexible"));
        assert!(!contains_known_key("The Permits process is slow here"));
        assert!(!contains_known_key("I'd be happy to help!"));
    }

    #[test]
    fn dollar_amount_extraction() {
        assert_eq!(extract_dollar_amount("set aside $1,200 for decking"), Some(1200.0));
        assert_eq!(extract_dollar_amount("$980"), Some(980.0));
        assert_eq!(extract_dollar_amount("Add 10% buffer"), None);
        assert_eq!(extract_dollar_amount(""), None);
    }

    #[test]
    fn report_value_carries_dollar_contingency() {
        let mut report = LegacyReport::default();
        report.contingency_suggestions = "hold $750 in reserve".to_string();
        let value = report.to_report_value();
        assert_eq!(value["contingencyCost"], serde_json::json!(750.0));
    }

    #[test]
    fn report_value_omits_contingency_without_dollar_figure() {
        let mut report = LegacyReport::default();
        report.contingency_suggestions = "Add 10% buffer".to_string();
        let value = report.to_report_value();
        assert!(value.get("contingencyCost").is_none());
    }
}
