use clap::Args;
use serde_json::Value;

use dealsim_core::analysis::simulate;
use dealsim_core::settings::EngineSettings;
use dealsim_core::waterfall::audit::{audit_rows, WaterfallAuditRow, AUDIT_COLUMNS};
use dealsim_core::waterfall::engine::{self, WaterfallInput};

use super::{check_deal_inputs, reshape_envelope};
use crate::input;

/// Arguments for the LP/GP waterfall
#[derive(Args)]
pub struct WaterfallArgs {
    /// Syndication deal inputs, or a raw waterfall input with `structure` and
    /// `period_cash_flows` (JSON or YAML); stdin when omitted
    #[arg(long)]
    pub input: Option<String>,

    /// Emit the per-period audit rows instead of the full allocation
    #[arg(long)]
    pub audit: bool,

    /// Also write the 15-column audit export to this CSV file
    #[arg(long)]
    pub audit_csv: Option<String>,
}

/// Waterfall input from either document shape.
fn waterfall_input(
    path: Option<&str>,
    settings: &EngineSettings,
) -> Result<(WaterfallInput, Vec<String>), Box<dyn std::error::Error>> {
    let raw: Value = input::read_input(path, "--input <file> or stdin required for waterfall")?;
    if raw.get("structure").is_some() {
        return Ok((serde_json::from_value(raw)?, Vec::new()));
    }

    // Full deal inputs: project the deal, then allocate its cash.
    let (inputs, warnings) = check_deal_inputs(&serde_json::from_value(raw)?, settings)?;
    let syndication = inputs
        .active_syndication()
        .ok_or("waterfall requires deal_type \"syndication\" with a syndication block")?;
    let simulation = simulate(&inputs)?;
    Ok((
        WaterfallInput::from_projection(syndication, &simulation.pro_forma, &simulation.exit),
        warnings,
    ))
}

pub fn write_audit_csv(path: &str, rows: &[WaterfallAuditRow]) -> Result<(), Box<dyn std::error::Error>> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|e| format!("Failed to create '{}': {}", path, e))?;
    wtr.write_record(AUDIT_COLUMNS)?;
    for row in rows {
        wtr.write_record(row.values())?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn run_waterfall(args: WaterfallArgs, settings: &EngineSettings) -> Result<Value, Box<dyn std::error::Error>> {
    let (wf_input, validation_warnings) = waterfall_input(args.input.as_deref(), settings)?;
    let output = engine::run_waterfall(&wf_input)?;
    let rows = audit_rows(&output.result.allocations);

    if let Some(ref path) = args.audit_csv {
        write_audit_csv(path, &rows)?;
        tracing::info!(path = %path, rows = rows.len(), "audit export written");
    }

    let result = if args.audit {
        serde_json::to_value(&rows)?
    } else {
        serde_json::to_value(&output.result)?
    };
    Ok(reshape_envelope(
        serde_json::to_value(&output)?,
        result,
        validation_warnings,
    ))
}
