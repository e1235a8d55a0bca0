use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User role submitting an estimate request. Determines which prompt template
/// is used and what report shape the model is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Homeowner,
    Contractor,
    Inspector,
    InsuranceAdjuster,
}

impl Role {
    /// Parse a role string from a form submission. Accepts kebab-case,
    /// snake_case and camelCase spellings; anything else is rejected so the
    /// pipeline can fail with an explicit unknown-role error instead of
    /// guessing a default template.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(['_', ' '], "-").as_str() {
            "homeowner" => Some(Self::Homeowner),
            "contractor" => Some(Self::Contractor),
            "inspector" => Some(Self::Inspector),
            "insurance-adjuster" | "insuranceadjuster" => Some(Self::InsuranceAdjuster),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Homeowner => "homeowner",
            Self::Contractor => "contractor",
            Self::Inspector => "inspector",
            Self::InsuranceAdjuster => "insurance-adjuster",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    Residential,
    Commercial,
    Renovation,
    Infrastructure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialTier {
    Economy,
    Standard,
    Premium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelinePreference {
    Urgent,
    Standard,
    Flexible,
}

impl ProjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Residential => "residential",
            Self::Commercial => "commercial",
            Self::Renovation => "renovation",
            Self::Infrastructure => "infrastructure",
        }
    }
}

impl MaterialTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Economy => "economy",
            Self::Standard => "standard",
            Self::Premium => "premium",
        }
    }
}

impl TimelinePreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Urgent => "urgent",
            Self::Standard => "standard",
            Self::Flexible => "flexible",
        }
    }
}

/// Insurance coverage mapping supplied by adjusters. Both lists are optional:
/// a fresh claim often has neither settled yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageMapping {
    #[serde(default)]
    pub covered: Option<Vec<String>>,
    #[serde(default)]
    pub excluded: Option<Vec<String>>,
}

/// Role-specific detail sub-record. Exactly one variant is relevant per
/// submission; requests carrying a variant that does not match the submitted
/// role are tolerated (the builder only reads what its template needs).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoleDetails {
    #[serde(rename_all = "camelCase")]
    Homeowner {
        #[serde(default)]
        property_age_years: Option<u32>,
        #[serde(default)]
        stories: Option<u32>,
        #[serde(default)]
        roof_type: Option<String>,
        #[serde(default)]
        current_condition: Option<String>,
        #[serde(default)]
        budget_band: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Contractor {
        #[serde(default)]
        company_name: Option<String>,
        #[serde(default)]
        license_number: Option<String>,
        #[serde(default)]
        crew_size: Option<u32>,
        #[serde(default)]
        overhead_percent: Option<f64>,
        #[serde(default)]
        markup_percent: Option<f64>,
    },
    #[serde(rename_all = "camelCase")]
    Inspector {
        #[serde(default)]
        inspection_type: Option<String>,
        #[serde(default)]
        code_edition: Option<String>,
        #[serde(default)]
        focus_areas: Vec<String>,
        #[serde(default)]
        noted_deficiencies: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    InsuranceAdjuster {
        #[serde(default)]
        claim_number: Option<String>,
        #[serde(default)]
        policyholder: Option<String>,
        #[serde(default)]
        damage_cause: Option<String>,
        #[serde(default)]
        deductible: Option<f64>,
        #[serde(default)]
        coverage_mapping: Option<CoverageMapping>,
    },
}

/// Input to the estimate pipeline. Immutable for the duration of one estimate
/// request. The role is kept as the submitted string: unrecognized values must
/// surface as an explicit pipeline error, not a deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRequirements {
    pub project_type: ProjectType,
    pub area: f64,
    pub location: String,
    pub material_tier: MaterialTier,
    pub timeline_preference: TimelinePreference,
    #[serde(alias = "role")]
    pub user_role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<RoleDetails>,
}

/// Project entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    #[serde(flatten)]
    pub requirements: ProjectRequirements,
    /// Full wizard payload as submitted, kept verbatim. Canonical fields win
    /// over this blob when requirements are reconstructed for an estimate run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_payload: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Reconstruct the requirements for an estimate run by merging the stored
    /// form payload with the project's canonical fields. Canonical fields win
    /// on conflict; unknown payload fields are ignored (permissive input).
    pub fn effective_requirements(&self) -> ProjectRequirements {
        let canonical = match serde_json::to_value(&self.requirements) {
            Ok(v) => v,
            Err(_) => return self.requirements.clone(),
        };

        let mut merged = match &self.form_payload {
            Some(serde_json::Value::Object(payload)) => serde_json::Value::Object(payload.clone()),
            _ => return self.requirements.clone(),
        };

        if let (Some(target), serde_json::Value::Object(canonical)) =
            (merged.as_object_mut(), canonical)
        {
            for (key, value) in canonical {
                target.insert(key, value);
            }
        }

        serde_json::from_value(merged).unwrap_or_else(|_| self.requirements.clone())
    }
}

/// Request DTO for creating a project
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(flatten)]
    pub requirements: ProjectRequirements,
    #[serde(default)]
    pub form_payload: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn sample_requirements() -> ProjectRequirements {
        ProjectRequirements {
            project_type: ProjectType::Residential,
            area: 1500.0,
            location: "Austin, TX".to_string(),
            material_tier: MaterialTier::Standard,
            timeline_preference: TimelinePreference::Standard,
            user_role: "homeowner".to_string(),
            details: None,
        }
    }

    #[test]
    fn role_parse_accepts_all_four_roles() {
        assert_eq!(Role::parse("homeowner"), Some(Role::Homeowner));
        assert_eq!(Role::parse("contractor"), Some(Role::Contractor));
        assert_eq!(Role::parse("inspector"), Some(Role::Inspector));
        assert_eq!(
            Role::parse("insurance-adjuster"),
            Some(Role::InsuranceAdjuster)
        );
        assert_eq!(
            Role::parse("insurance_adjuster"),
            Some(Role::InsuranceAdjuster)
        );
    }

    #[test]
    fn role_parse_rejects_unknown_roles() {
        assert_eq!(Role::parse("plumber"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn requirements_accept_legacy_role_field() {
        let req: ProjectRequirements = serde_json::from_value(json!({
            "projectType": "residential",
            "area": 1200.0,
            "location": "Denver, CO",
            "materialTier": "economy",
            "timelinePreference": "urgent",
            "role": "contractor"
        }))
        .unwrap();
        assert_eq!(req.user_role, "contractor");
    }

    #[test]
    fn requirements_ignore_unknown_fields() {
        let req: ProjectRequirements = serde_json::from_value(json!({
            "projectType": "commercial",
            "area": 9000.0,
            "location": "Chicago, IL",
            "materialTier": "premium",
            "timelinePreference": "flexible",
            "userRole": "inspector",
            "somethingTheWizardAdded": {"nested": true}
        }))
        .unwrap();
        assert_eq!(req.user_role, "inspector");
    }

    #[test]
    fn effective_requirements_prefer_canonical_fields() {
        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            name: "Roof replacement".to_string(),
            requirements: sample_requirements(),
            form_payload: Some(json!({
                "area": 9999.0,
                "location": "somewhere else",
                "preferredColor": "slate gray"
            })),
            created_at: now,
            updated_at: now,
        };

        let effective = project.effective_requirements();
        // Canonical fields win over the stored payload
        assert_eq!(effective.area, 1500.0);
        assert_eq!(effective.location, "Austin, TX");
    }

    #[test]
    fn effective_requirements_without_payload_are_canonical() {
        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            name: "Test".to_string(),
            requirements: sample_requirements(),
            form_payload: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(project.effective_requirements().area, 1500.0);
    }
}
