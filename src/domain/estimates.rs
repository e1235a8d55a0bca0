use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cost breakdown produced by the aggregator. The total is always recomputed
/// locally: materials + labor + permits + equipment + contingency == total,
/// exactly, for every estimate this service returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    pub materials_cost: f64,
    pub labor_cost: f64,
    pub permits_cost: f64,
    pub equipment_cost: f64,
    pub contingency_cost: f64,
    pub total_cost: f64,
    /// Categories that were missing or non-numeric in the model output and
    /// were coerced to zero. Kept on the record so silent zero-cost estimates
    /// can be audited later.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded_fields: Vec<String>,
}

impl CostBreakdown {
    pub fn base_cost(&self) -> f64 {
        self.materials_cost + self.labor_cost + self.permits_cost + self.equipment_cost
    }
}

/// Output of one estimate pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedEstimate {
    #[serde(flatten)]
    pub breakdown: CostBreakdown,
    /// Informational only. The model sets absolute prices, so this stays 1.0.
    pub region_multiplier: f64,
    /// Tag identifying the model that produced the figures.
    pub data_source: String,
    pub timeline: String,
    pub contingency_suggestions: String,
    /// Full normalized model output, role-dependent shape.
    pub report: serde_json::Value,
    /// One annotation per uploaded image, in upload order. `None` means the
    /// model supplied no usable list, which is distinct from zero images.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_analysis: Option<Vec<String>>,
}

/// A persisted estimate. Append-only: new estimate requests create new
/// records, prior records are never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEstimate {
    pub id: Uuid,
    pub project_id: Uuid,
    #[serde(flatten)]
    pub estimate: GeneratedEstimate,
    pub created_at: DateTime<Utc>,
}

/// An uploaded file attachment, as submitted by the form wizard.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    #[serde(default)]
    pub size: u64,
    /// base64 data URL, e.g. `data:image/jpeg;base64,...`
    pub data: String,
}

/// A validated inline attachment ready to send to the model API.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

impl UploadedFile {
    /// Split the data URL into a validated inline attachment. The base64
    /// payload is forwarded to the model API as-is; the API takes base64
    /// directly. Malformed data URLs are a caller error, caught before the
    /// pipeline starts.
    pub fn to_inline(&self) -> Result<InlineImage, String> {
        let (mime_type, data) = self.inline_payload()?;
        Ok(InlineImage { mime_type, data })
    }

    fn inline_payload(&self) -> Result<(String, String), String> {
        let rest = self
            .data
            .strip_prefix("data:")
            .ok_or_else(|| format!("file '{}' is not a data URL", self.name))?;
        let (mime, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| format!("file '{}' is not base64-encoded", self.name))?;
        if payload.is_empty() {
            return Err(format!("file '{}' has an empty payload", self.name));
        }
        let mime = if mime.is_empty() {
            self.mime_type.clone()
        } else {
            mime.to_string()
        };
        Ok((mime, payload.to_string()))
    }
}

/// Request DTO for POST /projects/:project_id/estimate
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EstimateRequest {
    #[serde(default)]
    pub files: Vec<UploadedFile>,
}

/// Response DTO for estimate generation. The breakdown is repeated as its own
/// object so clients do not have to pick the cost fields out of the flattened
/// estimate record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateResponse {
    #[serde(flatten)]
    pub estimate: StoredEstimate,
    pub breakdown: CostBreakdown,
}

impl From<StoredEstimate> for EstimateResponse {
    fn from(stored: StoredEstimate) -> Self {
        let breakdown = stored.estimate.breakdown.clone();
        Self {
            estimate: stored,
            breakdown,
        }
    }
}
