use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::deal::inputs::InvestmentInputs;
use crate::error::DealSimError;
use crate::proforma::projection::ProForma;
use crate::returns::exit::ExitAnalysis;
use crate::time_value::{annualize_monthly_rate, irr};
use crate::types::*;

/// Deal-level return metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnMetrics {
    /// Effective annual IRR on equity, `(1 + irr_monthly)^12 - 1`
    pub irr: MetricOutcome,
    /// Monthly IRR: initial equity at t=0, monthly cash flow, sale in the sale month
    pub irr_monthly: MetricOutcome,
    pub cash_on_cash_year1: MetricOutcome,
    pub cash_on_cash_by_year: Vec<MetricOutcome>,
    /// (total cash flow + net sale proceeds) / initial equity
    pub equity_multiple: MetricOutcome,
    pub dscr_year1: MetricOutcome,
    pub dscr_by_year: Vec<MetricOutcome>,
    /// (operating expenses + debt service) / gross potential rent, year 1
    pub breakeven_occupancy: MetricOutcome,
    /// Year-1 NOI / purchase price
    pub cap_rate: MetricOutcome,
    pub stabilized_noi: Money,
    pub noi_year1: Money,
    pub debt_service_year1: Money,
    pub cash_flow_year1: Money,
    pub initial_equity: Money,
    pub net_sale_proceeds: Money,
    /// Total cash returned less equity invested
    pub total_profit: Money,
}

/// Equity-level monthly cash flows used for the project IRR.
///
/// Month indices are exact, so a partial final year lands at its true time.
pub fn monthly_equity_flows(pro_forma: &ProForma, exit: &ExitAnalysis) -> Vec<Money> {
    let mut flows = Vec::with_capacity(pro_forma.monthly.len() + 1);
    flows.push(-pro_forma.initial_equity);
    flows.extend(pro_forma.monthly.iter().map(|m| m.cash_flow_before_tax));
    if let Some(last) = flows.last_mut() {
        *last += exit.net_sale_proceeds;
    }
    flows
}

/// IRR as a per-field outcome; solver failures never abort the run.
pub fn irr_outcome(cash_flows: &[Money]) -> MetricOutcome {
    match irr(cash_flows) {
        Ok(rate) => MetricOutcome::Defined(rate),
        Err(DealSimError::IrrUndefined(_)) => MetricOutcome::Undefined(UndefinedReason::NoSignChange),
        Err(e) => {
            tracing::warn!(error = %e, "IRR unresolved");
            MetricOutcome::Undefined(UndefinedReason::DidNotConverge)
        }
    }
}

/// Reduce the projection and sale to deal-level metrics.
pub fn calculate_return_metrics(
    inputs: &InvestmentInputs,
    pro_forma: &ProForma,
    exit: &ExitAnalysis,
) -> ReturnMetrics {
    let equity = pro_forma.initial_equity;
    let flows = monthly_equity_flows(pro_forma, exit);
    let irr_monthly = irr_outcome(&flows);
    let irr = match irr_monthly {
        MetricOutcome::Defined(r) => MetricOutcome::Defined(annualize_monthly_rate(r)),
        undefined => undefined,
    };
    if !irr.is_defined() {
        tracing::warn!(?irr, "project IRR undefined");
    }

    let total_cash_flow: Money = pro_forma.annual.iter().map(|y| y.cash_flow_before_tax).sum();
    let total_returned = total_cash_flow + exit.net_sale_proceeds;
    let equity_multiple = MetricOutcome::ratio(total_returned, equity, UndefinedReason::ZeroEquity);

    let cash_on_cash_by_year: Vec<MetricOutcome> =
        pro_forma.annual.iter().map(|y| y.cash_on_cash).collect();
    let dscr_by_year: Vec<MetricOutcome> = pro_forma.annual.iter().map(|y| y.dscr).collect();

    let zero_equity = MetricOutcome::Undefined(UndefinedReason::ZeroEquity);
    let zero_ds = MetricOutcome::Undefined(UndefinedReason::ZeroDebtService);

    let (noi_year1, debt_service_year1, cash_flow_year1, breakeven_occupancy) =
        match pro_forma.annual.first() {
            Some(y1) => {
                let costs = y1.operating_expenses
                    + y1.management_fee
                    + y1.replacement_reserves
                    + y1.debt_service;
                (
                    y1.noi,
                    y1.debt_service,
                    y1.cash_flow_before_tax,
                    MetricOutcome::ratio(
                        costs,
                        y1.gross_potential_rent,
                        UndefinedReason::ZeroGrossPotentialRent,
                    ),
                )
            }
            None => (
                Decimal::ZERO,
                Decimal::ZERO,
                Decimal::ZERO,
                MetricOutcome::Undefined(UndefinedReason::ZeroGrossPotentialRent),
            ),
        };

    ReturnMetrics {
        irr,
        irr_monthly,
        cash_on_cash_year1: cash_on_cash_by_year.first().copied().unwrap_or(zero_equity),
        cash_on_cash_by_year,
        equity_multiple,
        dscr_year1: dscr_by_year.first().copied().unwrap_or(zero_ds),
        dscr_by_year,
        breakeven_occupancy,
        cap_rate: MetricOutcome::ratio(
            noi_year1,
            inputs.acquisition.purchase_price,
            UndefinedReason::ZeroEquity,
        ),
        stabilized_noi: exit.stabilized_noi,
        noi_year1,
        debt_service_year1,
        cash_flow_year1,
        initial_equity: equity,
        net_sale_proceeds: exit.net_sale_proceeds,
        total_profit: total_returned - equity,
    }
}
