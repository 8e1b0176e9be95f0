use napi::bindgen_prelude::AsyncTask;
use napi::{Env, Result as NapiResult, Task};
use napi_derive::napi;
use rust_decimal::Decimal;

use dealsim_core::deal::inputs::InvestmentInputs;
use dealsim_core::settings::EngineSettings;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn parse_inputs(input_json: &str) -> NapiResult<InvestmentInputs> {
    serde_json::from_str(input_json).map_err(to_napi_error)
}

/// Settings JSON is optional; missing keys take their defaults.
fn parse_settings(settings_json: Option<String>) -> NapiResult<EngineSettings> {
    match settings_json {
        Some(json) => serde_json::from_str(&json).map_err(to_napi_error),
        None => Ok(EngineSettings::default()),
    }
}

/// Normalized inputs, rejected with every blocking issue when invalid.
fn checked_inputs(input_json: &str, settings: &EngineSettings) -> NapiResult<(InvestmentInputs, Vec<String>)> {
    let inputs = dealsim_core::deal::validation::normalize_inputs(&parse_inputs(input_json)?);
    let warnings = dealsim_core::deal::validation::validate_inputs(&inputs, &settings.thresholds)
        .into_result()
        .map_err(to_napi_error)?;
    Ok((inputs, warnings))
}

// ---------------------------------------------------------------------------
// Deal analysis
// ---------------------------------------------------------------------------

fn analyze_json(input_json: &str, settings_json: Option<String>) -> NapiResult<String> {
    let inputs = parse_inputs(input_json)?;
    let settings = parse_settings(settings_json)?;
    let output =
        dealsim_core::analysis::run_deal_analysis(&inputs, &settings).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn analyze_deal(input_json: String, settings_json: Option<String>) -> NapiResult<String> {
    analyze_json(&input_json, settings_json)
}

/// Full analysis on the libuv worker pool. Dropping the promise discards
/// the result; nothing partial is ever resolved.
pub struct AnalyzeDealTask {
    input_json: String,
    settings_json: Option<String>,
}

#[napi]
impl Task for AnalyzeDealTask {
    type Output = String;
    type JsValue = String;

    fn compute(&mut self) -> NapiResult<Self::Output> {
        analyze_json(&self.input_json, self.settings_json.take())
    }

    fn resolve(&mut self, _env: Env, output: Self::Output) -> NapiResult<Self::JsValue> {
        Ok(output)
    }
}

#[napi]
pub fn analyze_deal_async(
    input_json: String,
    settings_json: Option<String>,
) -> AsyncTask<AnalyzeDealTask> {
    AsyncTask::new(AnalyzeDealTask {
        input_json,
        settings_json,
    })
}

#[napi]
pub fn validate_deal(input_json: String, settings_json: Option<String>) -> NapiResult<String> {
    let inputs = dealsim_core::deal::validation::normalize_inputs(&parse_inputs(&input_json)?);
    let settings = parse_settings(settings_json)?;
    let report = dealsim_core::deal::validation::validate_inputs(&inputs, &settings.thresholds);
    serde_json::to_string(&report).map_err(to_napi_error)
}

#[napi]
pub fn build_pro_forma(input_json: String) -> NapiResult<String> {
    let (inputs, warnings) = checked_inputs(&input_json, &EngineSettings::default())?;
    let mut output =
        dealsim_core::proforma::projection::build_pro_forma(&inputs).map_err(to_napi_error)?;
    output.warnings.splice(0..0, warnings);
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Financing
// ---------------------------------------------------------------------------

#[napi]
pub fn amortize_loan(input_json: String) -> NapiResult<String> {
    let terms: dealsim_core::financing::amortization::LoanTerms =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        dealsim_core::financing::amortization::amortize_loan(&terms).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// IRR of a JSON array of periodic cash flows; `{"status": "undefined"}` when
/// no rate exists.
#[napi]
pub fn compute_irr(cash_flows_json: String) -> NapiResult<String> {
    let flows: Vec<Decimal> = serde_json::from_str(&cash_flows_json).map_err(to_napi_error)?;
    let irr = dealsim_core::returns::metrics::irr_outcome(&flows);
    serde_json::to_string(&irr).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Waterfall
// ---------------------------------------------------------------------------

#[napi]
pub fn run_waterfall(input_json: String) -> NapiResult<String> {
    let input: dealsim_core::waterfall::engine::WaterfallInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = dealsim_core::waterfall::engine::run_waterfall(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Formatted 15-column audit rows for a raw waterfall input.
#[napi]
pub fn waterfall_audit(input_json: String) -> NapiResult<String> {
    let input: dealsim_core::waterfall::engine::WaterfallInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = dealsim_core::waterfall::engine::run_waterfall(&input).map_err(to_napi_error)?;
    let rows = dealsim_core::waterfall::audit::audit_rows(&output.result.allocations);
    serde_json::to_string(&serde_json::json!({
        "columns": dealsim_core::waterfall::audit::AUDIT_COLUMNS,
        "rows": rows.iter().map(|r| r.values()).collect::<Vec<_>>(),
    }))
    .map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Sensitivity
// ---------------------------------------------------------------------------

#[napi]
pub fn sensitivity_report(input_json: String, settings_json: Option<String>) -> NapiResult<String> {
    let settings = parse_settings(settings_json)?;
    let (inputs, warnings) = checked_inputs(&input_json, &settings)?;
    let mut output =
        dealsim_core::scenarios::sensitivity::sensitivity_report(&inputs, &settings.sensitivity)
            .map_err(to_napi_error)?;
    output.warnings.splice(0..0, warnings);
    serde_json::to_string(&output).map_err(to_napi_error)
}
