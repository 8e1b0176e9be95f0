use serde::{Deserialize, Serialize};

use crate::deal::inputs::InvestmentInputs;
use crate::deal::validation::{normalize_inputs, validate_inputs};
use crate::proforma::projection::{project, ProForma};
use crate::returns::alerts::return_alerts;
use crate::returns::exit::{analyze_exit, ExitAnalysis};
use crate::returns::metrics::{calculate_return_metrics, ReturnMetrics};
use crate::scenarios::sensitivity::{sensitivity_report, SensitivityReport};
use crate::settings::EngineSettings;
use crate::types::*;
use crate::waterfall::engine::{run_waterfall, WaterfallInput, WaterfallResult};
use crate::DealSimResult;

/// Projection, sale and metrics of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    pub pro_forma: ProForma,
    pub exit: ExitAnalysis,
    pub metrics: ReturnMetrics,
}

/// Project, sell and measure a deal. Inputs are assumed validated.
pub fn simulate(inputs: &InvestmentInputs) -> DealSimResult<Simulation> {
    let pro_forma = project(inputs)?;
    let exit = analyze_exit(&pro_forma, &inputs.exit, inputs.sale_month())?;
    let metrics = calculate_return_metrics(inputs, &pro_forma, &exit);
    Ok(Simulation {
        pro_forma,
        exit,
        metrics,
    })
}

/// Everything a full analysis produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealAnalysis {
    pub pro_forma: ProForma,
    pub exit: ExitAnalysis,
    pub metrics: ReturnMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waterfall: Option<WaterfallResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<SensitivityReport>,
}

/// Validate, simulate, run the waterfall for syndications, and build the
/// sensitivity tables.
///
/// Blocking validation errors stop the run with `ValidationFailed`; every
/// other finding is returned as a warning alongside the results.
pub fn run_deal_analysis(
    inputs: &InvestmentInputs,
    settings: &EngineSettings,
) -> DealSimResult<ComputationOutput<DealAnalysis>> {
    let inputs = normalize_inputs(inputs);
    let mut warnings = validate_inputs(&inputs, &settings.thresholds).into_result()?;

    let Simulation {
        pro_forma,
        exit,
        metrics,
    } = simulate(&inputs)?;
    if let Some(month) = pro_forma
        .monthly
        .iter()
        .find(|m| m.balloon_payment > rust_decimal::Decimal::ZERO)
        .map(|m| m.month)
    {
        warnings.push(format!(
            "Loan matures in month {month}, before the sale; balloon paid from operating cash"
        ));
    }
    warnings.extend(return_alerts(&metrics, &settings.thresholds));

    let waterfall = match inputs.active_syndication() {
        Some(syndication) => {
            let input = WaterfallInput::from_projection(syndication, &pro_forma, &exit);
            let out = run_waterfall(&input)?;
            warnings.extend(out.warnings);
            Some(out.result)
        }
        None => None,
    };

    let sensitivity = if settings.sensitivity.enabled {
        let out = sensitivity_report(&inputs, &settings.sensitivity)?;
        warnings.extend(out.warnings);
        Some(out.result)
    } else {
        None
    };

    tracing::debug!(
        deal_type = ?inputs.deal_type,
        months = pro_forma.monthly.len(),
        irr = %metrics.irr,
        warnings = warnings.len(),
        "deal analysis complete"
    );

    Ok(with_metadata(
        "Real-estate deal simulation (pro forma, exit, returns, waterfall, sensitivity)",
        &serde_json::json!({
            "deal_type": inputs.deal_type,
            "purchase_price": inputs.acquisition.purchase_price.to_string(),
            "sale_month": inputs.sale_month(),
            "financing_type": inputs.financing.financing_type,
            "exit_cap_rate": inputs.exit.exit_cap_rate.to_string(),
        }),
        warnings,
        DealAnalysis {
            pro_forma,
            exit,
            metrics,
            waterfall,
            sensitivity,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deal::test_support::base_rental;
    use crate::error::DealSimError;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rental_analysis_has_no_waterfall() {
        let out = run_deal_analysis(&base_rental(), &EngineSettings::default()).unwrap();
        assert!(out.result.waterfall.is_none());
        assert!(out.result.sensitivity.is_some());
        assert!(out.result.metrics.irr.is_defined());
    }

    #[test]
    fn test_validation_errors_block_the_run() {
        let mut inputs = base_rental();
        inputs.exit.exit_cap_rate = dec!(-0.01);
        match run_deal_analysis(&inputs, &EngineSettings::default()) {
            Err(DealSimError::ValidationFailed { errors }) => {
                assert_eq!(errors[0].field, "exit.exit_cap_rate")
            }
            other => panic!("expected ValidationFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_sensitivity_can_be_disabled() {
        let mut settings = EngineSettings::default();
        settings.sensitivity.enabled = false;
        let out = run_deal_analysis(&base_rental(), &settings).unwrap();
        assert!(out.result.sensitivity.is_none());
    }

    #[test]
    fn test_deterministic_output() {
        let settings = EngineSettings::default();
        let a = serde_json::to_string(&run_deal_analysis(&base_rental(), &settings).unwrap()).unwrap();
        let b = serde_json::to_string(&run_deal_analysis(&base_rental(), &settings).unwrap()).unwrap();
        assert_eq!(a, b);
    }
}
