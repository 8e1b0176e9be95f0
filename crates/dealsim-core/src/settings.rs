use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{Multiple, Rate};

/// Engine-level knobs that are not part of a deal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub sensitivity: SensitivitySettings,
    pub thresholds: WarningThresholds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivitySettings {
    /// Include the sensitivity report in a full analysis
    pub enabled: bool,
    /// Run scenarios on the rayon pool
    pub parallel: bool,
    /// Relative perturbations applied to each axis; 0 is the base case
    pub steps: Vec<Rate>,
}

impl Default for SensitivitySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            parallel: true,
            steps: vec![dec!(-0.10), dec!(-0.05), Decimal::ZERO, dec!(0.05), dec!(0.10)],
        }
    }
}

/// Levels at which non-blocking warnings fire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarningThresholds {
    pub min_dscr: Multiple,
    pub max_breakeven_occupancy: Rate,
    pub max_ltv: Rate,
    pub high_vacancy: Rate,
}

impl Default for WarningThresholds {
    fn default() -> Self {
        Self {
            min_dscr: dec!(1.20),
            max_breakeven_occupancy: dec!(0.90),
            max_ltv: dec!(0.80),
            high_vacancy: dec!(0.15),
        }
    }
}
