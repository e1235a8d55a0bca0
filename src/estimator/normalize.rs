//! Response normalizer.
//!
//! Takes the model's raw text and produces a `NormalizedReport`. Two formats
//! share the output type but nothing else: the JSON path (fence stripping +
//! targeted repairs + serde parse) and the legacy key=value path (isolated in
//! `legacy_kv`). Repairs are deliberately limited to documented model quirks;
//! anything beyond them fails loudly with the raw text preserved, because
//! guessing at intent risks corrupting financial figures downstream.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use super::legacy_kv;
use super::EstimateError;

/// Expected output format for a model response. `LegacyKv` covers reports
/// produced by the older flat key=value prompt style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    LegacyKv,
}

/// Decide which parser a raw response belongs to. JSON is the modern
/// contract; only a response that is clearly a flat key=value report (no JSON
/// opener, at least one recognized key) takes the legacy path. Prose matching
/// neither goes through the JSON parser so it fails loudly instead of
/// degrading into an all-zero legacy report.
pub fn detect_format(raw: &str) -> ReportFormat {
    let stripped = strip_code_fences(raw);
    if stripped.starts_with('{') || stripped.starts_with('[') {
        ReportFormat::Json
    } else if legacy_kv::contains_known_key(stripped) {
        ReportFormat::LegacyKv
    } else {
        ReportFormat::Json
    }
}

/// Parsed, format-agnostic form of the model's output.
#[derive(Debug, Clone)]
pub struct NormalizedReport {
    /// The full structured report (role-dependent shape).
    pub report: Value,
    /// `None` when the model supplied no parseable imageAnalysis array.
    /// Distinct from `Some(vec![])`, which means "zero images".
    pub image_analysis: Option<Vec<String>>,
}

pub fn normalize(raw: &str, format: ReportFormat) -> Result<NormalizedReport, EstimateError> {
    match format {
        ReportFormat::Json => normalize_json(raw),
        ReportFormat::LegacyKv => Ok(normalize_legacy(raw)),
    }
}

fn normalize_json(raw: &str) -> Result<NormalizedReport, EstimateError> {
    let stripped = strip_code_fences(raw);

    // Parse the stripped text as-is first. Repairs only run when that parse
    // fails, so output that is already valid JSON is never rewritten (a bare
    // range can legitimately appear inside a string value).
    let report: Value = match serde_json::from_str(stripped) {
        Ok(report) => report,
        Err(_) => {
            let repaired = repair_numeric_ranges(stripped);
            serde_json::from_str(&repaired).map_err(|e| EstimateError::MalformedModelOutput {
                detail: e.to_string(),
                raw: raw.to_string(),
            })?
        }
    };

    let image_analysis = extract_image_analysis(report.get("imageAnalysis"));

    Ok(NormalizedReport {
        report,
        image_analysis,
    })
}

/// The legacy format is tolerant by design: missing keys yield empty strings
/// and zeros, never an error.
fn normalize_legacy(raw: &str) -> NormalizedReport {
    let parsed = legacy_kv::parse(raw);
    let image_analysis = legacy_image_analysis(raw);
    NormalizedReport {
        report: parsed.to_report_value(),
        image_analysis,
    }
}

/// Strip leading/trailing triple-backtick code fences, with or without a
/// `json` language tag.
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let stripped = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match stripped {
        Some(inner) => {
            let inner = inner.trim_start();
            inner
                .strip_suffix("```")
                .map(|s| s.trim())
                .unwrap_or(inner)
        }
        None => text,
    }
}

/// Quote bare numeric ranges appearing as JSON values (`"estimatedDays": 5-8`
/// becomes `"estimatedDays": "5-8"`). The model reliably emits these for
/// duration fields, and a bare range is not a valid JSON number. Only applied
/// after an initial parse has already failed; the pattern cannot tell a bare
/// range from one inside a string literal.
pub fn repair_numeric_ranges(text: &str) -> String {
    static RANGE: OnceLock<Regex> = OnceLock::new();
    let range = RANGE.get_or_init(|| {
        Regex::new(r#"(:\s*)(\d+(?:\.\d+)?\s*-\s*\d+(?:\.\d+)?)(\s*[,}\]])"#)
            .expect("numeric range pattern")
    });
    range.replace_all(text, "$1\"$2\"$3").into_owned()
}

/// Extract the per-image annotation list. Accepts either a JSON array of
/// strings or a string containing one. Anything else (including an array with
/// non-string entries) means the field is absent, never a fabricated list.
fn extract_image_analysis(value: Option<&Value>) -> Option<Vec<String>> {
    match value? {
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect(),
        Value::String(s) => {
            let parsed: Value = serde_json::from_str(s).ok()?;
            match parsed {
                Value::Array(_) => extract_image_analysis(Some(&parsed)),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Locate an `imageAnalysis = [...]` assignment in legacy free text and parse
/// the bracketed fragment as a JSON string array.
fn legacy_image_analysis(raw: &str) -> Option<Vec<String>> {
    static ASSIGNMENT: OnceLock<Regex> = OnceLock::new();
    let assignment = ASSIGNMENT.get_or_init(|| {
        Regex::new(r#"(?s)imageAnalysis\s*=\s*(\[.*?\])"#).expect("imageAnalysis pattern")
    });
    let fragment = assignment.captures(raw)?.get(1)?.as_str();
    let parsed: Value = serde_json::from_str(fragment).ok()?;
    extract_image_analysis(Some(&parsed))
}
