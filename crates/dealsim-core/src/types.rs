use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Multiples (e.g., 1.8x equity multiple)
pub type Multiple = Decimal;

/// Why a metric could not be computed for an otherwise successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedReason {
    /// Cash-flow series never changes sign
    NoSignChange,
    /// Root finder hit its iteration cap
    DidNotConverge,
    /// Ratio over an unlevered period
    ZeroDebtService,
    /// Ratio over zero invested equity
    ZeroEquity,
    ZeroGrossPotentialRent,
    /// The perturbed scenario itself failed to simulate
    ScenarioFailed,
}

impl std::fmt::Display for UndefinedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UndefinedReason::NoSignChange => "cash flows never change sign",
            UndefinedReason::DidNotConverge => "solver did not converge",
            UndefinedReason::ZeroDebtService => "no debt service",
            UndefinedReason::ZeroEquity => "no equity invested",
            UndefinedReason::ZeroGrossPotentialRent => "no gross potential rent",
            UndefinedReason::ScenarioFailed => "scenario failed",
        };
        f.write_str(s)
    }
}

/// A metric value, or an explicit marker that it is undefined.
///
/// Computation-time failures resolve to `Undefined` instead of NaN or an
/// error, so one bad ratio never aborts the rest of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum MetricOutcome {
    Defined(Decimal),
    Undefined(UndefinedReason),
}

impl MetricOutcome {
    /// Ratio helper: `Undefined(reason)` when the denominator is zero.
    pub fn ratio(numerator: Decimal, denominator: Decimal, reason: UndefinedReason) -> Self {
        if denominator.is_zero() {
            MetricOutcome::Undefined(reason)
        } else {
            MetricOutcome::Defined(numerator / denominator)
        }
    }

    pub fn value(&self) -> Option<Decimal> {
        match self {
            MetricOutcome::Defined(v) => Some(*v),
            MetricOutcome::Undefined(_) => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, MetricOutcome::Defined(_))
    }
}

impl std::fmt::Display for MetricOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricOutcome::Defined(v) => write!(f, "{v}"),
            MetricOutcome::Undefined(_) => f.write_str("N/A"),
        }
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation.
///
/// Carries no wall-clock fields: identical inputs must serialize to
/// identical bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub engine: String,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            engine: "dealsim".to_string(),
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
