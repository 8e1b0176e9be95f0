use rust_decimal::Decimal;

use crate::returns::metrics::ReturnMetrics;
use crate::settings::WarningThresholds;
use crate::types::MetricOutcome;

fn pct(rate: Decimal) -> Decimal {
    (rate * Decimal::ONE_HUNDRED).round_dp(1)
}

/// Non-blocking warnings derived from a finished run.
pub fn return_alerts(metrics: &ReturnMetrics, thresholds: &WarningThresholds) -> Vec<String> {
    let mut warnings = Vec::new();

    if let MetricOutcome::Defined(dscr) = metrics.dscr_year1 {
        if dscr < thresholds.min_dscr {
            warnings.push(format!(
                "Year-1 DSCR {} is below {}",
                dscr.round_dp(2),
                thresholds.min_dscr
            ));
        }
    }

    if let MetricOutcome::Defined(be) = metrics.breakeven_occupancy {
        if be > thresholds.max_breakeven_occupancy {
            warnings.push(format!(
                "Breakeven occupancy {}% is above {}%",
                pct(be),
                pct(thresholds.max_breakeven_occupancy)
            ));
        }
    }

    match metrics.irr {
        MetricOutcome::Defined(irr) if irr < Decimal::ZERO => {
            warnings.push(format!("Negative IRR: {}%", pct(irr)));
        }
        MetricOutcome::Defined(_) => {}
        MetricOutcome::Undefined(reason) => {
            warnings.push(format!("IRR is undefined: {reason}"));
        }
    }

    if metrics.cash_flow_year1 < Decimal::ZERO {
        warnings.push(format!(
            "Year-1 cash flow is negative ({})",
            metrics.cash_flow_year1.round_dp(2)
        ));
    }

    warnings
}
