//! Estimate generation pipeline.
//!
//! One linear pass per request: resolve the role template, build the prompt,
//! query the model, normalize the response, aggregate costs. Any failure is
//! terminal for that request - no internal retries, no partial results. The
//! caller persists only after the whole pipeline has succeeded.

pub mod aggregate;
pub mod legacy_kv;
pub mod normalize;
pub mod prompts;

use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::domain::{GeneratedEstimate, InlineImage, ProjectRequirements, Role};
use crate::services::{ModelError, PromptPart, TextModel};

/// Informational multiplier carried on every estimate. The model sets
/// absolute prices for the stated location, so no regional lookup is applied.
pub const REGION_MULTIPLIER: f64 = 1.0;

#[derive(Debug, Error)]
pub enum EstimateError {
    #[error("unsupported role: {0:?}")]
    UnknownRole(String),

    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("malformed model output: {detail}")]
    MalformedModelOutput { detail: String, raw: String },
}

impl EstimateError {
    /// Stable tag for log fields and diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownRole(_) => "unknown_role",
            Self::ModelUnavailable(_) => "model_unavailable",
            Self::MalformedModelOutput { .. } => "malformed_model_output",
        }
    }
}

/// Run the pipeline for one project submission. `images` are pre-validated
/// attachments and may be empty (the cost-breakdown debug path always runs
/// without images).
#[instrument(skip_all, fields(role = %project.user_role, images = images.len()))]
pub async fn generate_estimate(
    model: &dyn TextModel,
    project: &ProjectRequirements,
    images: &[InlineImage],
) -> Result<GeneratedEstimate, EstimateError> {
    // Received -> PromptBuilt
    let role = Role::parse(&project.user_role)
        .ok_or_else(|| EstimateError::UnknownRole(project.user_role.clone()))?;
    let prompt = prompts::build_prompt(role, project);

    let mut parts = Vec::with_capacity(1 + images.len());
    parts.push(PromptPart::Text(prompt));
    for image in images {
        parts.push(PromptPart::Inline {
            mime_type: image.mime_type.clone(),
            data: image.data.clone(),
        });
    }

    // PromptBuilt -> ModelQueried
    let raw = model.generate(&parts).await.map_err(|e| match e {
        ModelError::Unavailable(detail) => EstimateError::ModelUnavailable(detail),
        ModelError::EmptyResponse => EstimateError::MalformedModelOutput {
            detail: "empty model response".to_string(),
            raw: String::new(),
        },
    })?;

    debug!(raw_len = raw.len(), "Model response received");

    // ModelQueried -> Normalized. The raw text travels with the error so a
    // failed parse can be inspected later instead of being discarded.
    let normalized = normalize::normalize(&raw, normalize::detect_format(&raw))?;

    // Normalized -> Aggregated (pure computation, cannot fail)
    let breakdown = aggregate::aggregate(&normalized.report);

    // Best-effort image fidelity check: a mismatched list is logged, never
    // trimmed or padded, and a malformed list is already `None` here.
    if let Some(annotations) = &normalized.image_analysis {
        if annotations.len() != images.len() {
            warn!(
                expected = images.len(),
                received = annotations.len(),
                "imageAnalysis length does not match submitted image count"
            );
        }
    }

    let timeline = string_field(&normalized.report, &["timeline", "estimatedDays"]);
    let contingency_suggestions = string_field(&normalized.report, &["contingencySuggestions"]);

    Ok(GeneratedEstimate {
        breakdown,
        region_multiplier: REGION_MULTIPLIER,
        data_source: model.model_name().to_string(),
        timeline,
        contingency_suggestions,
        report: normalized.report,
        image_analysis: normalized.image_analysis,
    })
}

/// First present string among the candidate field names; numbers are rendered
/// so a bare `estimatedDays: 6` still yields a usable timeline.
fn string_field(report: &serde_json::Value, candidates: &[&str]) -> String {
    for name in candidates {
        match report.get(*name) {
            Some(serde_json::Value::String(s)) if !s.is_empty() => return s.clone(),
            Some(serde_json::Value::Number(n)) => return n.to_string(),
            _ => {}
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::normalize::ReportFormat;
    use super::*;
    use crate::domain::{MaterialTier, ProjectType, TimelinePreference};
    use serde_json::json;

    /// Always answers with the same raw text.
    struct CannedModel(&'static str);

    #[async_trait::async_trait]
    impl TextModel for CannedModel {
        fn model_name(&self) -> &str {
            "canned-model"
        }

        async fn generate(&self, _parts: &[PromptPart]) -> Result<String, ModelError> {
            Ok(self.0.to_string())
        }
    }

    /// Fails every request, for the unavailable and never-reached cases.
    struct DownModel;

    #[async_trait::async_trait]
    impl TextModel for DownModel {
        fn model_name(&self) -> &str {
            "down-model"
        }

        async fn generate(&self, _parts: &[PromptPart]) -> Result<String, ModelError> {
            Err(ModelError::Unavailable("connection refused".to_string()))
        }
    }

    fn requirements(role: &str) -> ProjectRequirements {
        ProjectRequirements {
            project_type: ProjectType::Residential,
            area: 1500.0,
            location: "Austin, TX".to_string(),
            material_tier: MaterialTier::Standard,
            timeline_preference: TimelinePreference::Standard,
            user_role: role.to_string(),
            details: None,
        }
    }

    fn image(data: &str) -> InlineImage {
        InlineImage {
            mime_type: "image/jpeg".to_string(),
            data: data.to_string(),
        }
    }

    #[test]
    fn unknown_role_is_a_hard_error() {
        // Role resolution is the pipeline's first transition; "plumber" must
        // fail it rather than fall back to some default template.
        assert_eq!(Role::parse("plumber"), None);
        let err = EstimateError::UnknownRole("plumber".to_string());
        assert_eq!(err.kind(), "unknown_role");
    }

    #[test]
    fn string_field_prefers_first_candidate() {
        let report = json!({"timeline": "3-4 weeks", "estimatedDays": "5-8"});
        assert_eq!(string_field(&report, &["timeline", "estimatedDays"]), "3-4 weeks");
    }

    #[test]
    fn string_field_falls_back_and_renders_numbers() {
        let report = json!({"estimatedDays": 6});
        assert_eq!(string_field(&report, &["timeline", "estimatedDays"]), "6");
    }

    #[test]
    fn string_field_empty_when_absent() {
        assert_eq!(string_field(&json!({}), &["timeline"]), "");
    }

    // Full normalize -> aggregate pass over a realistic fenced model reply.
    #[test]
    fn json_response_end_to_end() {
        let raw = "```json\n{\"materialsCost\": 9000, \"laborCost\": 4500, \"permitsCost\": 500, \"estimatedDays\": 5-8, \"imageAnalysis\": [\"north slope\", \"south slope\", \"valley flashing\"]}\n```";
        let normalized = normalize::normalize(raw, ReportFormat::Json).unwrap();
        let breakdown = aggregate::aggregate(&normalized.report);

        assert_eq!(breakdown.materials_cost, 9000.0);
        assert_eq!(breakdown.labor_cost, 4500.0);
        assert_eq!(breakdown.permits_cost, 500.0);
        assert_eq!(breakdown.equipment_cost, 0.0);
        assert_eq!(breakdown.contingency_cost, 980.0);
        assert_eq!(breakdown.total_cost, 14980.0);

        assert_eq!(normalized.report["estimatedDays"], json!("5-8"));
        let annotations = normalized.image_analysis.unwrap();
        assert_eq!(annotations.len(), 3);
        assert_eq!(annotations[0], "north slope");
        assert_eq!(annotations[2], "valley flashing");
    }

    #[test]
    fn legacy_response_end_to_end() {
        let raw = "Material_Cost=5000\nLabor_Cost=3000\nPermits=200\nTimeline=standard\nContingency Suggestions=Add 10% buffer";
        let normalized = normalize::normalize(raw, ReportFormat::LegacyKv).unwrap();
        let breakdown = aggregate::aggregate(&normalized.report);

        assert_eq!(breakdown.contingency_cost, 574.0);
        assert_eq!(breakdown.total_cost, 8774.0);
        assert!(normalized.image_analysis.is_none());
    }

    #[tokio::test]
    async fn pipeline_produces_full_estimate_from_model_reply() {
        let model = CannedModel(
            "```json\n{\"materialsCost\": 9000, \"laborCost\": 4500, \"permitsCost\": 500, \"estimatedDays\": 5-8}\n```",
        );
        let estimate = generate_estimate(&model, &requirements("homeowner"), &[])
            .await
            .unwrap();

        assert_eq!(estimate.data_source, "canned-model");
        assert_eq!(estimate.region_multiplier, 1.0);
        assert_eq!(estimate.breakdown.total_cost, 14980.0);
        assert_eq!(estimate.timeline, "5-8");
    }

    #[tokio::test]
    async fn pipeline_preserves_image_annotations_verbatim() {
        // Three annotations for two submitted images: the list is returned
        // exactly as the model wrote it, never trimmed or padded.
        let model = CannedModel(
            r#"{"materialsCost": 100, "imageAnalysis": ["north slope hail bruising", "ridge cap lifted", "valley debris"]}"#,
        );
        let images = [image("AAAA"), image("BBBB")];
        let estimate = generate_estimate(&model, &requirements("homeowner"), &images)
            .await
            .unwrap();

        assert_eq!(
            estimate.image_analysis.unwrap(),
            vec![
                "north slope hail bruising",
                "ridge cap lifted",
                "valley debris"
            ]
        );
    }

    #[tokio::test]
    async fn pipeline_rejects_unknown_role_before_querying_model() {
        // DownModel would surface as ModelUnavailable if it were ever reached
        let err = generate_estimate(&DownModel, &requirements("plumber"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, EstimateError::UnknownRole(ref r) if r == "plumber"));
    }

    #[tokio::test]
    async fn pipeline_maps_unreachable_model_to_unavailable() {
        let err = generate_estimate(&DownModel, &requirements("homeowner"), &[])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "model_unavailable");
    }

    #[tokio::test]
    async fn pipeline_routes_flat_report_through_legacy_parser() {
        let model = CannedModel(
            "Material_Cost=5000\nLabor_Cost=3000\nPermits=200\nTimeline=standard\nContingency Suggestions=Add 10% buffer",
        );
        let estimate = generate_estimate(&model, &requirements("homeowner"), &[])
            .await
            .unwrap();

        assert_eq!(estimate.breakdown.total_cost, 8774.0);
        assert_eq!(estimate.timeline, "standard");
    }
}
