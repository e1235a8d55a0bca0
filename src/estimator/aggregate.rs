//! Cost aggregator.
//!
//! Extracts the four cost categories from a normalized report and derives
//! contingency and total. The model's JSON shape drifts between role
//! templates, so each category is resolved through an independent fallback
//! chain: direct field, then `costEstimates.<category>.total`, then zero.
//! The total is never taken from the model; it is recomputed locally so that
//! materials + labor + permits + equipment + contingency == total holds for
//! every estimate this service produces.

use serde_json::Value;

use crate::domain::CostBreakdown;

/// Contingency buffer applied when the model supplies none.
pub const CONTINGENCY_RATE: f64 = 0.07;

struct Category {
    direct: &'static str,
    nested: &'static str,
}

const CATEGORIES: [Category; 4] = [
    Category {
        direct: "materialsCost",
        nested: "materials",
    },
    Category {
        direct: "laborCost",
        nested: "labor",
    },
    Category {
        direct: "permitsCost",
        nested: "permits",
    },
    Category {
        direct: "equipmentCost",
        nested: "equipment",
    },
];

pub fn aggregate(report: &Value) -> CostBreakdown {
    let mut amounts = [0.0_f64; 4];
    let mut degraded_fields = Vec::new();

    for (index, category) in CATEGORIES.iter().enumerate() {
        match resolve_category(report, category) {
            Some(amount) => amounts[index] = amount,
            None => {
                // Coerced to zero: either missing in both locations or
                // present but non-numeric. Recorded so zero-cost estimates
                // can be audited instead of passing silently.
                degraded_fields.push(category.direct.to_string());
            }
        }
    }

    let [materials_cost, labor_cost, permits_cost, equipment_cost] = amounts;
    let base_cost = materials_cost + labor_cost + permits_cost + equipment_cost;

    // Honor a non-zero model contingency; otherwise apply the 7% rule. The
    // model's own total, if any, is ignored in either case.
    let contingency_cost = match resolve_category(
        report,
        &Category {
            direct: "contingencyCost",
            nested: "contingency",
        },
    ) {
        Some(amount) if amount > 0.0 => amount,
        _ => (base_cost * CONTINGENCY_RATE).round(),
    };

    let breakdown = CostBreakdown {
        materials_cost,
        labor_cost,
        permits_cost,
        equipment_cost,
        contingency_cost,
        total_cost: base_cost + contingency_cost,
        degraded_fields,
    };

    if !breakdown.degraded_fields.is_empty() {
        tracing::warn!(
            degraded = ?breakdown.degraded_fields,
            base_cost = breakdown.base_cost(),
            "Cost categories coerced to zero during aggregation"
        );
    }

    breakdown
}

/// Resolve one category: direct field first, then the nested
/// `costEstimates.<name>.total` path. `None` means the value was coerced to
/// zero (missing everywhere, non-numeric, or negative).
fn resolve_category(report: &Value, category: &Category) -> Option<f64> {
    let value = report.get(category.direct).or_else(|| {
        report
            .get("costEstimates")?
            .get(category.nested)?
            .get("total")
    })?;
    as_money(value)
}

/// Accept JSON numbers and numeric strings (the model sometimes quotes
/// figures or prefixes them with `$`). NaN and negatives are rejected rather
/// than propagated into the total.
fn as_money(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s
            .trim()
            .trim_start_matches('$')
            .replace(',', "")
            .parse()
            .ok()?,
        _ => return None,
    };
    (amount.is_finite() && amount >= 0.0).then_some(amount)
}
