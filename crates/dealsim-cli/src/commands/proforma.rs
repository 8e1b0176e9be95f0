use clap::Args;
use serde_json::Value;

use dealsim_core::proforma::projection::build_pro_forma;
use dealsim_core::settings::EngineSettings;

use super::{checked_deal_inputs, reshape_envelope};

/// Arguments for the pro forma projection
#[derive(Args)]
pub struct ProformaArgs {
    /// Path to deal inputs (JSON or YAML); stdin when omitted
    #[arg(long)]
    pub input: Option<String>,

    /// Emit only the annual summaries
    #[arg(long, conflicts_with = "monthly")]
    pub annual: bool,

    /// Emit only the monthly records
    #[arg(long)]
    pub monthly: bool,
}

pub fn run_proforma(args: ProformaArgs, settings: &EngineSettings) -> Result<Value, Box<dyn std::error::Error>> {
    let (inputs, validation_warnings) = checked_deal_inputs(args.input.as_deref(), settings)?;
    let output = build_pro_forma(&inputs)?;

    let result = if args.annual {
        serde_json::to_value(&output.result.annual)?
    } else if args.monthly {
        serde_json::to_value(&output.result.monthly)?
    } else {
        serde_json::to_value(&output.result)?
    };

    Ok(reshape_envelope(
        serde_json::to_value(&output)?,
        result,
        validation_warnings,
    ))
}
