use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::waterfall::engine::WaterfallAllocation;

/// Column headers of the waterfall audit export, in order.
pub const AUDIT_COLUMNS: [&str; 15] = [
    "Period",
    "Cash Available",
    "LP ROC",
    "GP ROC",
    "LP Pref Accrual",
    "LP Pref Paid",
    "GP Catch-Up",
    "LP Tier Distribution",
    "GP Tier Distribution",
    "LP Total",
    "GP Total",
    "LP Unreturned Capital",
    "LP Pref Balance",
    "LP Equity Multiple",
    "Active Tier",
];

/// One audit line with every value pre-formatted for export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaterfallAuditRow {
    pub period: String,
    pub cash_available: String,
    pub lp_roc: String,
    pub gp_roc: String,
    pub lp_pref_accrual: String,
    pub lp_pref_paid: String,
    pub gp_catch_up: String,
    pub lp_tier_distribution: String,
    pub gp_tier_distribution: String,
    pub lp_total: String,
    pub gp_total: String,
    pub lp_unreturned_capital: String,
    pub lp_pref_balance: String,
    pub lp_equity_multiple: String,
    pub active_tier: String,
}

/// Currency to 2 decimal places, half away from zero.
pub fn format_currency(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    // -0.00 renders as 0.00
    let rounded = if rounded.is_zero() { Decimal::ZERO } else { rounded };
    format!("{rounded:.2}")
}

fn format_multiple(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.4}")
}

impl From<&WaterfallAllocation> for WaterfallAuditRow {
    fn from(a: &WaterfallAllocation) -> Self {
        Self {
            period: a.period.to_string(),
            cash_available: format_currency(a.cash_available),
            lp_roc: format_currency(a.lp_roc),
            gp_roc: format_currency(a.gp_roc),
            lp_pref_accrual: format_currency(a.lp_pref_accrual),
            lp_pref_paid: format_currency(a.lp_pref_paid),
            gp_catch_up: format_currency(a.gp_catch_up),
            lp_tier_distribution: format_currency(a.lp_tier_distribution),
            gp_tier_distribution: format_currency(a.gp_tier_distribution),
            lp_total: format_currency(a.lp_total),
            gp_total: format_currency(a.gp_total),
            lp_unreturned_capital: format_currency(a.lp_unreturned_capital),
            lp_pref_balance: format_currency(a.lp_pref_balance),
            lp_equity_multiple: format_multiple(a.lp_equity_multiple),
            active_tier: a.rationale.clone(),
        }
    }
}

impl WaterfallAuditRow {
    /// Values in `AUDIT_COLUMNS` order.
    pub fn values(&self) -> [&str; 15] {
        [
            &self.period,
            &self.cash_available,
            &self.lp_roc,
            &self.gp_roc,
            &self.lp_pref_accrual,
            &self.lp_pref_paid,
            &self.gp_catch_up,
            &self.lp_tier_distribution,
            &self.gp_tier_distribution,
            &self.lp_total,
            &self.gp_total,
            &self.lp_unreturned_capital,
            &self.lp_pref_balance,
            &self.lp_equity_multiple,
            &self.active_tier,
        ]
    }
}

pub fn audit_rows(allocations: &[WaterfallAllocation]) -> Vec<WaterfallAuditRow> {
    allocations.iter().map(WaterfallAuditRow::from).collect()
}
