use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::analysis::simulate;
use crate::deal::inputs::InvestmentInputs;
use crate::error::DealSimError;
use crate::returns::metrics::ReturnMetrics;
use crate::settings::SensitivitySettings;
use crate::types::*;
use crate::DealSimResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input perturbed by a sensitivity table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityAxis {
    /// Starting and post-renovation rent
    Rent,
    ExitCapRate,
    RenovationBudget,
}

impl SensitivityAxis {
    pub const ALL: [SensitivityAxis; 3] = [
        SensitivityAxis::Rent,
        SensitivityAxis::ExitCapRate,
        SensitivityAxis::RenovationBudget,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SensitivityAxis::Rent => "Rent",
            SensitivityAxis::ExitCapRate => "Exit cap rate",
            SensitivityAxis::RenovationBudget => "Renovation budget",
        }
    }

    /// Copy of `inputs` with this axis scaled by `1 + step`.
    pub fn perturb(&self, inputs: &InvestmentInputs, step: Rate) -> InvestmentInputs {
        let factor = Decimal::ONE + step;
        let mut scenario = inputs.clone();
        match self {
            SensitivityAxis::Rent => {
                scenario.income.monthly_rent_per_unit *= factor;
                if let Some(post) = scenario.income.post_renovation_rent_per_unit.as_mut() {
                    *post *= factor;
                }
            }
            SensitivityAxis::ExitCapRate => scenario.exit.exit_cap_rate *= factor,
            SensitivityAxis::RenovationBudget => scenario.acquisition.renovation_budget *= factor,
        }
        scenario
    }
}

/// Result of one perturbed scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityRow {
    pub label: String,
    pub step: Rate,
    pub irr: MetricOutcome,
    /// Year-1 cash-on-cash
    pub coc: MetricOutcome,
    pub equity_multiple: MetricOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityTable {
    pub axis: SensitivityAxis,
    pub name: String,
    pub rows: Vec<SensitivityRow>,
}

/// Two-way rent x exit-cap IRR matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityGrid {
    pub rent_steps: Vec<Rate>,
    pub exit_cap_steps: Vec<Rate>,
    /// `irr[i][j]` at rent step i, exit cap step j
    pub irr: Vec<Vec<MetricOutcome>>,
    pub base_case_position: (usize, usize),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityReport {
    pub tables: Vec<SensitivityTable>,
    pub grid: SensitivityGrid,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `Base` for 0, otherwise a signed percentage such as `+5%`.
pub fn step_label(step: Rate) -> String {
    if step.is_zero() {
        return "Base".to_string();
    }
    let pct = (step * Decimal::ONE_HUNDRED).normalize();
    if pct > Decimal::ZERO {
        format!("+{pct}%")
    } else {
        format!("{pct}%")
    }
}

/// Index of the step nearest to zero.
fn closest_index(values: &[Decimal], target: Decimal) -> usize {
    values
        .iter()
        .enumerate()
        .min_by_key(|(_, v)| (**v - target).abs())
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Map over items, on the rayon pool when enabled.
#[allow(unused_variables)]
fn maybe_parallel_map<T, U, F>(items: &[T], parallel: bool, f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        if parallel && items.len() > 1 {
            return items.par_iter().map(f).collect();
        }
    }

    items.iter().map(f).collect()
}

fn run_scenario(inputs: &InvestmentInputs) -> DealSimResult<ReturnMetrics> {
    simulate(inputs).map(|s| s.metrics)
}

fn failed(label: String, step: Rate) -> SensitivityRow {
    let undefined = MetricOutcome::Undefined(UndefinedReason::ScenarioFailed);
    SensitivityRow {
        label,
        step,
        irr: undefined,
        coc: undefined,
        equity_multiple: undefined,
    }
}

fn validate_steps(steps: &[Rate]) -> DealSimResult<()> {
    if steps.is_empty() {
        return Err(DealSimError::InvalidInput {
            field: "sensitivity.steps".into(),
            reason: "At least one perturbation step is required".into(),
        });
    }
    if let Some(step) = steps.iter().find(|s| **s <= Decimal::NEGATIVE_ONE) {
        return Err(DealSimError::InvalidInput {
            field: "sensitivity.steps".into(),
            reason: format!("Step {step} would remove the whole input"),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// One table: each step applied to `axis`, every scenario simulated
/// independently. A failed scenario becomes an undefined row plus a warning.
pub fn sensitivity_table(
    inputs: &InvestmentInputs,
    axis: SensitivityAxis,
    settings: &SensitivitySettings,
    warnings: &mut Vec<String>,
) -> SensitivityTable {
    let outcomes = maybe_parallel_map(&settings.steps, settings.parallel, |step| {
        run_scenario(&axis.perturb(inputs, *step))
    });

    let rows = settings
        .steps
        .iter()
        .zip(outcomes)
        .map(|(step, outcome)| {
            let label = step_label(*step);
            match outcome {
                Ok(m) => SensitivityRow {
                    label,
                    step: *step,
                    irr: m.irr,
                    coc: m.cash_on_cash_year1,
                    equity_multiple: m.equity_multiple,
                },
                Err(e) => {
                    tracing::warn!(axis = axis.name(), step = %step, error = %e, "scenario failed");
                    warnings.push(format!("{} {label}: {e}", axis.name()));
                    failed(label, *step)
                }
            }
        })
        .collect();

    SensitivityTable {
        axis,
        name: axis.name().to_string(),
        rows,
    }
}

/// Rent x exit-cap IRR grid over the configured steps.
pub fn rent_exit_cap_grid(
    inputs: &InvestmentInputs,
    settings: &SensitivitySettings,
    warnings: &mut Vec<String>,
) -> SensitivityGrid {
    let steps = &settings.steps;
    let cells: Vec<(Rate, Rate)> = steps
        .iter()
        .flat_map(|r| steps.iter().map(move |c| (*r, *c)))
        .collect();

    let outcomes = maybe_parallel_map(&cells, settings.parallel, |(rent, cap)| {
        let scenario = SensitivityAxis::ExitCapRate.perturb(
            &SensitivityAxis::Rent.perturb(inputs, *rent),
            *cap,
        );
        run_scenario(&scenario).map(|m| m.irr)
    });

    let mut irr = Vec::with_capacity(steps.len());
    let mut row = Vec::with_capacity(steps.len());
    for ((rent, cap), outcome) in cells.iter().zip(outcomes) {
        let value = match outcome {
            Ok(v) => v,
            Err(e) => {
                warnings.push(format!(
                    "Grid rent {} / exit cap {}: {e}",
                    step_label(*rent),
                    step_label(*cap)
                ));
                MetricOutcome::Undefined(UndefinedReason::ScenarioFailed)
            }
        };
        row.push(value);
        if row.len() == steps.len() {
            irr.push(std::mem::take(&mut row));
        }
    }

    let base = closest_index(steps, Decimal::ZERO);
    SensitivityGrid {
        rent_steps: steps.clone(),
        exit_cap_steps: steps.clone(),
        irr,
        base_case_position: (base, base),
    }
}

/// Rent, exit-cap and renovation-budget tables plus the two-way grid.
pub fn sensitivity_report(
    inputs: &InvestmentInputs,
    settings: &SensitivitySettings,
) -> DealSimResult<ComputationOutput<SensitivityReport>> {
    validate_steps(&settings.steps)?;
    let mut warnings: Vec<String> = Vec::new();

    let tables = SensitivityAxis::ALL
        .iter()
        .map(|axis| sensitivity_table(inputs, *axis, settings, &mut warnings))
        .collect();
    let grid = rent_exit_cap_grid(inputs, settings, &mut warnings);

    tracing::debug!(
        steps = settings.steps.len(),
        failures = warnings.len(),
        "sensitivity complete"
    );

    Ok(with_metadata(
        "One-way sensitivity (rent, exit cap, renovation budget) and rent x exit-cap grid",
        &serde_json::json!({
            "steps": settings.steps.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
            "parallel": settings.parallel,
        }),
        warnings,
        SensitivityReport { tables, grid },
    ))
}
