//! Role prompt builder.
//!
//! One template per role, dispatched over the `Role` enum. Pure and
//! deterministic: the same role and project always produce the same prompt.
//! Every template restates the relevant form data (so the model cannot
//! "forget" it), pins down an exact JSON output contract, and states the
//! image-annotation rule. Absent optional fields render a human-readable
//! placeholder - the model should never have to interpret a literal
//! `undefined` or `null`.

use crate::domain::{CoverageMapping, ProjectRequirements, Role, RoleDetails};

const NOT_PROVIDED: &str = "Not provided";

/// Shared output rules appended to every template. Keep the `imageAnalysis`
/// field name literal: tests and the normalizer depend on it.
const OUTPUT_RULES: &str = r#"OUTPUT RULES:
- Respond with a single JSON object exactly matching the schema above. No text outside the JSON object.
- All cost fields are plain numbers in USD, no currency symbols, no thousands separators.
- "imageAnalysis" must contain exactly one string per uploaded image, in upload order. Do not invent entries for images that were not uploaded and do not omit entries for images that were. If no images were uploaded, return an empty array.
- If you cannot determine a value, use 0 for numbers and "" for strings. Never use null."#;

const HOMEOWNER_TEMPLATE: &str = r#"You are an experienced residential roofing and construction cost estimator advising a homeowner. Produce a realistic cost estimate for the project below, using current market prices for the stated location.

PROJECT DATA:
- Project type: {project_type}
- Area: {area} sq ft
- Location: {location}
- Material tier: {material_tier}
- Timeline preference: {timeline_preference}
- Property age: {property_age} years
- Stories: {stories}
- Roof type: {roof_type}
- Current condition: {current_condition}
- Budget band: {budget_band}

Explain trade-offs a homeowner would care about: material longevity vs upfront cost, permit requirements in the stated location, and what typically goes wrong on projects like this.

Return a JSON object with this EXACT schema:
{
  "materialsCost": 9000,
  "laborCost": 4500,
  "permitsCost": 500,
  "equipmentCost": 300,
  "contingencyCost": 990,
  "timeline": "3-4 weeks including permitting",
  "estimatedDays": "5-8",
  "contingencySuggestions": "Set aside an extra buffer for deck repairs discovered at tear-off.",
  "summary": "Plain-language summary for the homeowner.",
  "recommendations": ["..."],
  "imageAnalysis": ["one annotation per uploaded photo, in upload order"]
}

{output_rules}"#;

const CONTRACTOR_TEMPLATE: &str = r#"You are a senior construction estimator preparing an internal bid worksheet for a contractor. Produce line-item cost estimates for the project below, broken down by category, using current market prices for the stated location.

PROJECT DATA:
- Project type: {project_type}
- Area: {area} sq ft
- Location: {location}
- Material tier: {material_tier}
- Timeline preference: {timeline_preference}
- Company: {company_name}
- License: {license_number}
- Crew size: {crew_size}
- Overhead: {overhead_percent}
- Markup: {markup_percent}

Itemize materials, labor, permits and equipment separately. Account for the stated crew size when estimating labor duration.

Return a JSON object with this EXACT schema:
{
  "costEstimates": {
    "materials": {"total": 9000, "items": [{"name": "...", "cost": 0}]},
    "labor": {"total": 4500, "crewDays": 0},
    "permits": {"total": 500},
    "equipment": {"total": 300},
    "contingency": {"total": 990}
  },
  "timeline": "bid-ready schedule summary",
  "estimatedDays": "5-8",
  "contingencySuggestions": "Where the bid is most likely to slip.",
  "marketConditions": "Supply and subcontractor availability notes.",
  "imageAnalysis": ["one annotation per uploaded photo, in upload order"]
}

{output_rules}"#;

const INSPECTOR_TEMPLATE: &str = r#"You are a licensed building inspector producing a cost-of-remediation assessment. Evaluate the project below for code compliance and estimate the cost of bringing it to standard.

PROJECT DATA:
- Project type: {project_type}
- Area: {area} sq ft
- Location: {location}
- Material tier: {material_tier}
- Timeline preference: {timeline_preference}
- Inspection type: {inspection_type}
- Code edition: {code_edition}
- Focus areas: {focus_areas}
- Noted deficiencies: {noted_deficiencies}

Flag each deficiency against the applicable code section and estimate remediation cost per finding.

Return a JSON object with this EXACT schema:
{
  "materialsCost": 9000,
  "laborCost": 4500,
  "permitsCost": 500,
  "equipmentCost": 300,
  "contingencyCost": 990,
  "timeline": "remediation schedule",
  "estimatedDays": "5-8",
  "contingencySuggestions": "Findings likely to expand in scope once opened up.",
  "complianceFindings": [{"finding": "...", "codeReference": "...", "remediationCost": 0}],
  "riskAssessment": "Overall compliance risk narrative.",
  "imageAnalysis": ["one annotation per uploaded photo, in upload order"]
}

{output_rules}"#;

const ADJUSTER_TEMPLATE: &str = r#"You are an insurance claims estimator assessing repair costs for a property damage claim. Estimate covered repair costs for the project below using current market prices for the stated location.

PROJECT DATA:
- Project type: {project_type}
- Area: {area} sq ft
- Location: {location}
- Material tier: {material_tier}
- Timeline preference: {timeline_preference}
- Claim number: {claim_number}
- Policyholder: {policyholder}
- Damage cause: {damage_cause}
- Deductible: {deductible}
- Covered items: {covered_items}
- Excluded items: {excluded_items}

Separate like-kind-and-quality replacement cost from upgrade cost. Note any damage consistent or inconsistent with the stated cause.

Return a JSON object with this EXACT schema:
{
  "materialsCost": 9000,
  "laborCost": 4500,
  "permitsCost": 500,
  "equipmentCost": 300,
  "contingencyCost": 990,
  "timeline": "repair schedule",
  "estimatedDays": "5-8",
  "contingencySuggestions": "Supplemental claim items likely to surface.",
  "coverageAssessment": {"consistentWithCause": true, "notes": "..."},
  "imageAnalysis": ["one annotation per uploaded photo, in upload order"]
}

{output_rules}"#;

/// Build the prompt for a resolved role. Total over the enum: unknown role
/// strings are rejected earlier, by `Role::parse`, so there is no default
/// template to fall into.
pub fn build_prompt(role: Role, project: &ProjectRequirements) -> String {
    let template = match role {
        Role::Homeowner => homeowner_prompt(project),
        Role::Contractor => contractor_prompt(project),
        Role::Inspector => inspector_prompt(project),
        Role::InsuranceAdjuster => adjuster_prompt(project),
    };
    fill_common(template, project)
}

fn fill_common(template: String, project: &ProjectRequirements) -> String {
    template
        .replace("{project_type}", project.project_type.as_str())
        .replace("{area}", &format_number(project.area))
        .replace("{location}", text_or_provided(&project.location))
        .replace("{material_tier}", project.material_tier.as_str())
        .replace(
            "{timeline_preference}",
            project.timeline_preference.as_str(),
        )
        .replace("{output_rules}", OUTPUT_RULES)
}

fn homeowner_prompt(project: &ProjectRequirements) -> String {
    let (property_age, stories, roof_type, current_condition, budget_band) =
        match &project.details {
            Some(RoleDetails::Homeowner {
                property_age_years,
                stories,
                roof_type,
                current_condition,
                budget_band,
            }) => (
                opt_num(*property_age_years),
                opt_num(*stories),
                opt_text(roof_type),
                opt_text(current_condition),
                opt_text(budget_band),
            ),
            _ => (
                NOT_PROVIDED.to_string(),
                NOT_PROVIDED.to_string(),
                NOT_PROVIDED.to_string(),
                NOT_PROVIDED.to_string(),
                NOT_PROVIDED.to_string(),
            ),
        };

    HOMEOWNER_TEMPLATE
        .to_string()
        .replace("{property_age}", &property_age)
        .replace("{stories}", &stories)
        .replace("{roof_type}", &roof_type)
        .replace("{current_condition}", &current_condition)
        .replace("{budget_band}", &budget_band)
}

fn contractor_prompt(project: &ProjectRequirements) -> String {
    let (company_name, license_number, crew_size, overhead, markup) = match &project.details {
        Some(RoleDetails::Contractor {
            company_name,
            license_number,
            crew_size,
            overhead_percent,
            markup_percent,
        }) => (
            opt_text(company_name),
            opt_text(license_number),
            opt_num(*crew_size),
            opt_percent(*overhead_percent),
            opt_percent(*markup_percent),
        ),
        _ => (
            NOT_PROVIDED.to_string(),
            NOT_PROVIDED.to_string(),
            NOT_PROVIDED.to_string(),
            NOT_PROVIDED.to_string(),
            NOT_PROVIDED.to_string(),
        ),
    };

    CONTRACTOR_TEMPLATE
        .to_string()
        .replace("{company_name}", &company_name)
        .replace("{license_number}", &license_number)
        .replace("{crew_size}", &crew_size)
        .replace("{overhead_percent}", &overhead)
        .replace("{markup_percent}", &markup)
}

fn inspector_prompt(project: &ProjectRequirements) -> String {
    let (inspection_type, code_edition, focus_areas, deficiencies) = match &project.details {
        Some(RoleDetails::Inspector {
            inspection_type,
            code_edition,
            focus_areas,
            noted_deficiencies,
        }) => (
            opt_text(inspection_type),
            opt_text(code_edition),
            list_or_none(focus_areas),
            list_or_none(noted_deficiencies),
        ),
        _ => (
            NOT_PROVIDED.to_string(),
            NOT_PROVIDED.to_string(),
            "None listed".to_string(),
            "None listed".to_string(),
        ),
    };

    INSPECTOR_TEMPLATE
        .to_string()
        .replace("{inspection_type}", &inspection_type)
        .replace("{code_edition}", &code_edition)
        .replace("{focus_areas}", &focus_areas)
        .replace("{noted_deficiencies}", &deficiencies)
}

fn adjuster_prompt(project: &ProjectRequirements) -> String {
    let (claim_number, policyholder, damage_cause, deductible, covered, excluded) =
        match &project.details {
            Some(RoleDetails::InsuranceAdjuster {
                claim_number,
                policyholder,
                damage_cause,
                deductible,
                coverage_mapping,
            }) => (
                opt_text(claim_number),
                opt_text(policyholder),
                opt_text(damage_cause),
                opt_money(*deductible),
                coverage_list(coverage_mapping, |m| m.covered.as_deref()),
                coverage_list(coverage_mapping, |m| m.excluded.as_deref()),
            ),
            _ => (
                NOT_PROVIDED.to_string(),
                NOT_PROVIDED.to_string(),
                NOT_PROVIDED.to_string(),
                NOT_PROVIDED.to_string(),
                "Under investigation".to_string(),
                "Under investigation".to_string(),
            ),
        };

    ADJUSTER_TEMPLATE
        .to_string()
        .replace("{claim_number}", &claim_number)
        .replace("{policyholder}", &policyholder)
        .replace("{damage_cause}", &damage_cause)
        .replace("{deductible}", &deductible)
        .replace("{covered_items}", &covered)
        .replace("{excluded_items}", &excluded)
}

// Placeholder rendering. The model reads this text, so absent values become
// words, never `null` or `undefined`.

fn opt_text(value: &Option<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.clone(),
        _ => NOT_PROVIDED.to_string(),
    }
}

fn text_or_provided(value: &str) -> &str {
    if value.trim().is_empty() {
        NOT_PROVIDED
    } else {
        value
    }
}

fn opt_num(value: Option<u32>) -> String {
    value.map_or_else(|| NOT_PROVIDED.to_string(), |v| v.to_string())
}

fn opt_percent(value: Option<f64>) -> String {
    value.map_or_else(|| NOT_PROVIDED.to_string(), |v| format!("{v}%"))
}

fn opt_money(value: Option<f64>) -> String {
    value.map_or_else(|| NOT_PROVIDED.to_string(), |v| format!("${v}"))
}

fn list_or_none(values: &[String]) -> String {
    if values.is_empty() {
        "None listed".to_string()
    } else {
        values.join(", ")
    }
}

/// Coverage lists default to "Under investigation": an adjuster form without a
/// settled mapping is a claim still being worked, not an empty claim.
fn coverage_list<F>(mapping: &Option<CoverageMapping>, select: F) -> String
where
    F: Fn(&CoverageMapping) -> Option<&[String]>,
{
    match mapping.as_ref().and_then(|m| select(m)) {
        Some(items) if !items.is_empty() => items.join(", "),
        _ => "Under investigation".to_string(),
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
