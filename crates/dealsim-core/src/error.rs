use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single blocking problem found by the input validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_issues(errors: &[ValidationIssue]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum DealSimError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Validation failed: {}", join_issues(.errors))]
    ValidationFailed { errors: Vec<ValidationIssue> },

    #[error("Invalid financing terms: {0}")]
    InvalidFinancingTerms(String),

    #[error("Invalid exit assumptions: {0}")]
    InvalidExitAssumptions(String),

    #[error("Invalid waterfall structure: {0}")]
    InvalidWaterfallStructure(String),

    #[error("Convergence failure: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    ConvergenceFailure {
        function: String,
        iterations: u32,
        last_delta: Decimal,
    },

    #[error("IRR undefined: {0}")]
    IrrUndefined(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Scenario not found: {0}")]
    ScenarioNotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<serde_json::Error> for DealSimError {
    fn from(e: serde_json::Error) -> Self {
        DealSimError::SerializationError(e.to_string())
    }
}
