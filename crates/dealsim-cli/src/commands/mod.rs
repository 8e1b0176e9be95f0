pub mod analysis;
pub mod financing;
pub mod proforma;
pub mod scenarios;
pub mod waterfall;

use dealsim_core::deal::inputs::InvestmentInputs;
use dealsim_core::deal::validation::{normalize_inputs, validate_inputs};
use dealsim_core::settings::EngineSettings;

use crate::input;

const MISSING_DEAL: &str = "--input <deal.json|deal.yaml> or stdin required";

/// Deal inputs from `--input` or stdin.
pub fn read_deal_inputs(path: Option<&str>) -> Result<InvestmentInputs, Box<dyn std::error::Error>> {
    input::read_input(path, MISSING_DEAL)
}

/// Normalized inputs that passed validation, plus the validation warnings.
pub fn check_deal_inputs(
    inputs: &InvestmentInputs,
    settings: &EngineSettings,
) -> Result<(InvestmentInputs, Vec<String>), Box<dyn std::error::Error>> {
    let inputs = normalize_inputs(inputs);
    let warnings = validate_inputs(&inputs, &settings.thresholds).into_result()?;
    Ok((inputs, warnings))
}

pub fn checked_deal_inputs(
    path: Option<&str>,
    settings: &EngineSettings,
) -> Result<(InvestmentInputs, Vec<String>), Box<dyn std::error::Error>> {
    check_deal_inputs(&read_deal_inputs(path)?, settings)
}

/// Replace the `result` of a serialized envelope and append warnings.
pub fn reshape_envelope(
    mut envelope: serde_json::Value,
    result: serde_json::Value,
    extra_warnings: Vec<String>,
) -> serde_json::Value {
    envelope["result"] = result;
    if let Some(serde_json::Value::Array(warnings)) = envelope.get_mut("warnings") {
        let existing = std::mem::take(warnings);
        *warnings = extra_warnings
            .into_iter()
            .map(serde_json::Value::String)
            .chain(existing)
            .collect();
    }
    envelope
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reshape_puts_validation_warnings_first() {
        let envelope = json!({"result": {"a": 1}, "warnings": ["engine"]});
        let out = reshape_envelope(envelope, json!([1, 2]), vec!["input".into()]);
        assert_eq!(out["result"], json!([1, 2]));
        assert_eq!(out["warnings"], json!(["input", "engine"]));
    }
}
