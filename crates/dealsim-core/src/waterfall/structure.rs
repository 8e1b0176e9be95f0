use rust_decimal::Decimal;

use crate::deal::inputs::{HurdleMetric, PromoteTier, TierSplit, WaterfallStructure};
use crate::error::{DealSimError, ValidationIssue};
use crate::types::Rate;
use crate::DealSimResult;

/// Name reported while no promote hurdle has been reached.
pub const BASE_SPLIT_NAME: &str = "Base split";

/// Structural problems with a waterfall definition, one issue per defect.
pub fn structure_issues(structure: &WaterfallStructure) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut issue = |field: String, message: String| {
        issues.push(ValidationIssue { field, message });
    };

    if structure.pref_rate < Decimal::ZERO {
        issue(
            "waterfall.pref_rate".into(),
            "Preferred return cannot be negative".into(),
        );
    }

    check_split(&structure.base_split, "waterfall.base_split", &mut issue);

    let mut previous: Option<&PromoteTier> = None;
    for (i, tier) in structure.tiers.iter().enumerate() {
        let field = format!("waterfall.tiers[{i}]");
        check_split(&tier.split, &field, &mut issue);
        if tier.hurdle <= Decimal::ZERO {
            issue(
                format!("{field}.hurdle"),
                "Hurdle must be positive".into(),
            );
        }
        if let Some(prev) = previous {
            if tier.hurdle <= prev.hurdle {
                issue(
                    format!("{field}.hurdle"),
                    format!(
                        "Tier thresholds must be strictly increasing ({} follows {})",
                        tier.hurdle, prev.hurdle
                    ),
                );
            }
        }
        previous = Some(tier);
    }

    if structure.variant.has_catch_up() {
        match structure.catch_up_pct {
            Some(pct) if pct > Decimal::ZERO && pct <= Decimal::ONE => {}
            Some(pct) => issue(
                "waterfall.catch_up_pct".into(),
                format!("Catch-up target {pct} must be in (0, 1]"),
            ),
            None => issue(
                "waterfall.catch_up_pct".into(),
                "Catch-up variant requires a catch-up percentage".into(),
            ),
        }
    }

    issues
}

fn check_split(split: &TierSplit, field: &str, issue: &mut impl FnMut(String, String)) {
    if split.lp < Decimal::ZERO || split.gp < Decimal::ZERO {
        issue(field.to_string(), "Split fractions cannot be negative".into());
    }
    if split.lp + split.gp != Decimal::ONE {
        issue(
            field.to_string(),
            format!(
                "LP/GP split must sum to 1.0 (got {} + {})",
                split.lp, split.gp
            ),
        );
    }
}

/// Fail with `InvalidWaterfallStructure` on the first structural defect.
pub fn validate_structure(structure: &WaterfallStructure) -> DealSimResult<()> {
    let issues = structure_issues(structure);
    if issues.is_empty() {
        Ok(())
    } else {
        Err(DealSimError::InvalidWaterfallStructure(
            issues
                .iter()
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        ))
    }
}

/// The split in force for a period, and the hurdle context behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveTier {
    /// `None` while the base split applies
    pub index: Option<usize>,
    pub name: String,
    pub split: TierSplit,
    /// Hurdle of the active tier, if any
    pub reached_hurdle: Option<Rate>,
    /// Next hurdle still ahead
    pub next_hurdle: Option<Rate>,
}

/// Highest tier whose hurdle the performance measure has reached.
///
/// `measure` is `None` when it cannot yet be computed (e.g. LP IRR before any
/// distribution), which keeps the base split in force.
pub fn select_active_tier(structure: &WaterfallStructure, measure: Option<Rate>) -> ActiveTier {
    let index = measure.and_then(|m| structure.tiers.iter().rposition(|t| m >= t.hurdle));

    let next_hurdle = match index {
        Some(i) => structure.tiers.get(i + 1).map(|t| t.hurdle),
        None => structure.tiers.first().map(|t| t.hurdle),
    };

    match index {
        Some(i) => {
            let tier = &structure.tiers[i];
            ActiveTier {
                index: Some(i),
                name: tier.name.clone(),
                split: tier.split,
                reached_hurdle: Some(tier.hurdle),
                next_hurdle,
            }
        }
        None => ActiveTier {
            index: None,
            name: BASE_SPLIT_NAME.to_string(),
            split: structure.base_split,
            reached_hurdle: None,
            next_hurdle,
        },
    }
}

/// Human-readable rationale naming the active tier.
pub fn describe_active_tier(
    active: &ActiveTier,
    metric: HurdleMetric,
    measure: Option<Rate>,
) -> String {
    let fmt_measure = |v: Rate| match metric {
        HurdleMetric::EquityMultiple => format!("{:.2}x", v),
        HurdleMetric::Irr => format!("{:.2}%", v * Decimal::ONE_HUNDRED),
    };
    let label = match metric {
        HurdleMetric::EquityMultiple => "LP EM",
        HurdleMetric::Irr => "LP IRR",
    };
    let current = measure
        .map(fmt_measure)
        .unwrap_or_else(|| "n/a".to_string());

    let position = match (active.reached_hurdle, active.next_hurdle) {
        (Some(reached), _) => format!(
            "{label} {current} at period start reached {} hurdle",
            fmt_measure(reached)
        ),
        (None, Some(next)) => format!(
            "{label} {current} at period start below first hurdle {}",
            fmt_measure(next)
        ),
        (None, None) => format!("{label} {current}; no promote hurdles configured"),
    };

    format!(
        "{} active ({}; LP/GP {:.0}/{:.0}); tier fixed for the whole period, excess not clipped at the next hurdle",
        active.name,
        position,
        active.split.lp * Decimal::ONE_HUNDRED,
        active.split.gp * Decimal::ONE_HUNDRED,
    )
}
