use clap::Args;
use serde_json::{json, Value};

use dealsim_core::analysis::run_deal_analysis;
use dealsim_core::deal::validation::{normalize_inputs, validate_inputs};
use dealsim_core::settings::EngineSettings;
use dealsim_core::DealSimError;

use super::read_deal_inputs;

/// Arguments for the full deal analysis
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to deal inputs (JSON or YAML); stdin when omitted
    #[arg(long)]
    pub input: Option<String>,

    /// Skip the sensitivity tables and grid
    #[arg(long)]
    pub no_sensitivity: bool,

    /// Emit only the return metrics and exit valuation
    #[arg(long)]
    pub summary: bool,
}

pub fn run_analyze(args: AnalyzeArgs, settings: &EngineSettings) -> Result<Value, Box<dyn std::error::Error>> {
    let inputs = read_deal_inputs(args.input.as_deref())?;

    let mut settings = settings.clone();
    if args.no_sensitivity || args.summary {
        settings.sensitivity.enabled = false;
    }

    let output = run_deal_analysis(&inputs, &settings)?;
    let mut value = serde_json::to_value(&output)?;

    if args.summary {
        let analysis = &output.result;
        value["result"] = json!({
            "metrics": analysis.metrics,
            "exit": analysis.exit,
            "waterfall": analysis.waterfall.as_ref().map(|w| json!({
                "lp_irr": w.lp_irr,
                "gp_irr": w.gp_irr,
                "lp_equity_multiple": w.lp_equity_multiple,
                "gp_equity_multiple": w.gp_equity_multiple,
                "gp_promote": w.gp_promote,
            })),
        });
    }
    Ok(value)
}

/// Arguments for input validation
#[derive(Args)]
pub struct ValidateArgs {
    /// Path to deal inputs (JSON or YAML); stdin when omitted
    #[arg(long)]
    pub input: Option<String>,

    /// Exit with an error when any blocking issue is found
    #[arg(long)]
    pub strict: bool,
}

pub fn run_validate(args: ValidateArgs, settings: &EngineSettings) -> Result<Value, Box<dyn std::error::Error>> {
    let inputs = normalize_inputs(&read_deal_inputs(args.input.as_deref())?);
    let report = validate_inputs(&inputs, &settings.thresholds);

    if args.strict && !report.is_valid() {
        return Err(DealSimError::ValidationFailed {
            errors: report.errors,
        }
        .into());
    }

    Ok(json!({
        "valid": report.is_valid(),
        "errors": report.errors,
        "warnings": report.warnings,
    }))
}
