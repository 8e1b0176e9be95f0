use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::proforma::projection::MonthlyPeriodRecord;
use crate::types::*;

/// Year-aggregated roll-up of the monthly records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnualSummaryRecord {
    pub year: u32,
    /// Months in this year; below 12 for a partial final year
    pub months: u32,
    pub gross_potential_rent: Money,
    pub vacancy_loss: Money,
    pub other_income: Money,
    pub effective_gross_income: Money,
    pub operating_expenses: Money,
    pub management_fee: Money,
    pub replacement_reserves: Money,
    pub noi: Money,
    pub interest: Money,
    pub principal: Money,
    pub debt_service: Money,
    pub balloon_payment: Money,
    pub renovation_draws: Money,
    pub make_ready: Money,
    pub leasing_commissions: Money,
    pub capital_expenditures: Money,
    pub refinance_cash_out: Money,
    pub cash_flow_before_tax: Money,
    pub ending_loan_balance: Money,
    /// NOI / debt service
    pub dscr: MetricOutcome,
    /// Cash flow / initial equity
    pub cash_on_cash: MetricOutcome,
}

impl AnnualSummaryRecord {
    pub fn is_partial(&self) -> bool {
        self.months < 12
    }
}

/// Roll monthly records up into project years.
pub fn summarize_years(monthly: &[MonthlyPeriodRecord], initial_equity: Money) -> Vec<AnnualSummaryRecord> {
    monthly
        .chunks(12)
        .enumerate()
        .map(|(i, months)| summarize_year(i as u32 + 1, months, initial_equity))
        .collect()
}

fn summarize_year(year: u32, months: &[MonthlyPeriodRecord], initial_equity: Money) -> AnnualSummaryRecord {
    let sum = |f: fn(&MonthlyPeriodRecord) -> Money| -> Money { months.iter().map(f).sum() };

    let noi = sum(|m| m.noi);
    let debt_service = sum(|m| m.debt_service);
    let cash_flow_before_tax = sum(|m| m.cash_flow_before_tax);

    AnnualSummaryRecord {
        year,
        months: months.len() as u32,
        gross_potential_rent: sum(|m| m.gross_potential_rent),
        vacancy_loss: sum(|m| m.vacancy_loss),
        other_income: sum(|m| m.other_income),
        effective_gross_income: sum(|m| m.effective_gross_income),
        operating_expenses: sum(|m| m.operating_expenses),
        management_fee: sum(|m| m.management_fee),
        replacement_reserves: sum(|m| m.replacement_reserves),
        noi,
        interest: sum(|m| m.interest),
        principal: sum(|m| m.principal),
        debt_service,
        balloon_payment: sum(|m| m.balloon_payment),
        renovation_draws: sum(|m| m.renovation_draw),
        make_ready: sum(|m| m.make_ready),
        leasing_commissions: sum(|m| m.leasing_commissions),
        capital_expenditures: sum(|m| m.capital_expenditures),
        refinance_cash_out: sum(|m| m.refinance_cash_out),
        cash_flow_before_tax,
        ending_loan_balance: months
            .last()
            .map(|m| m.loan_balance)
            .unwrap_or(Decimal::ZERO),
        dscr: MetricOutcome::ratio(noi, debt_service, UndefinedReason::ZeroDebtService),
        cash_on_cash: MetricOutcome::ratio(
            cash_flow_before_tax,
            initial_equity,
            UndefinedReason::ZeroEquity,
        ),
    }
}
