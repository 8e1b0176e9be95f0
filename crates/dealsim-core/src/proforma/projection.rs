use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::deal::inputs::{FinancingType, InvestmentInputs, OutflowKind};
use crate::error::DealSimError;
use crate::financing::amortization::{build_schedule, AmortizationSchedule, LoanTerms};
use crate::proforma::annual::{summarize_years, AnnualSummaryRecord};
use crate::time_value::monthly_equivalent_rate;
use crate::types::*;
use crate::DealSimResult;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One projected month. Produced once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyPeriodRecord {
    pub month: u32,
    /// Projection year (1-based)
    pub year: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_date: Option<NaiveDate>,
    /// Monthly rent per unit in effect
    pub rent: Money,
    pub gross_potential_rent: Money,
    pub vacancy_loss: Money,
    /// Other income net of its own vacancy
    pub other_income: Money,
    pub effective_gross_income: Money,
    /// Fixed expenses plus maintenance
    pub operating_expenses: Money,
    pub management_fee: Money,
    pub replacement_reserves: Money,
    pub noi: Money,
    pub interest: Money,
    pub principal: Money,
    /// Scheduled interest + principal
    pub debt_service: Money,
    /// Principal paid off at loan maturity, outside scheduled debt service
    pub balloon_payment: Money,
    pub renovation_draw: Money,
    pub make_ready: Money,
    pub leasing_commissions: Money,
    pub capital_expenditures: Money,
    /// Net proceeds of a BRRRR refinance in its month
    pub refinance_cash_out: Money,
    pub cash_flow_before_tax: Money,
    /// Loan balance at month end
    pub loan_balance: Money,
}

/// The BRRRR refinance as it was applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinanceEvent {
    pub month: u32,
    pub arv: Money,
    pub new_loan: Money,
    pub old_loan_payoff: Money,
    pub closing_costs: Money,
    pub cash_out: Money,
    pub new_monthly_payment: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProForma {
    pub monthly: Vec<MonthlyPeriodRecord>,
    pub annual: Vec<AnnualSummaryRecord>,
    pub acquisition_loan: Money,
    pub initial_equity: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refinance: Option<RefinanceEvent>,
}

impl ProForma {
    /// Project-level monthly cash flow series (month 1 first).
    pub fn cash_flows(&self) -> Vec<Money> {
        self.monthly.iter().map(|m| m.cash_flow_before_tax).collect()
    }

    /// Loan balance outstanding at the end of `month`.
    pub fn loan_balance_at(&self, month: u32) -> Money {
        if month == 0 {
            return self.acquisition_loan;
        }
        self.monthly
            .get((month - 1) as usize)
            .map(|m| m.loan_balance)
            .unwrap_or(Decimal::ZERO)
    }
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

/// Acquisition loan terms derived from the deal.
pub fn acquisition_loan_terms(inputs: &InvestmentInputs) -> LoanTerms {
    let f = &inputs.financing;
    LoanTerms {
        financing_type: f.financing_type,
        principal: inputs.acquisition_loan(),
        annual_rate: f.annual_rate,
        amortization_months: f.amortization_months(),
        interest_only_months: f.interest_only_months,
        term_months: f.term_months(),
        collateral_value: Some(inputs.acquisition.purchase_price),
    }
}

/// Largest compounded growth multiple the projector carries; keeps every
/// grown amount well inside Decimal range.
const MAX_GROWTH_LEVEL: Decimal = dec!(1000000000000000);

/// Compounding index that starts at 1 in month 1.
struct GrowthIndex {
    field: &'static str,
    factor: Decimal,
    level: Decimal,
}

impl GrowthIndex {
    fn annual(field: &'static str, rate: Rate) -> Self {
        Self {
            field,
            factor: Decimal::ONE + monthly_equivalent_rate(rate),
            level: Decimal::ONE,
        }
    }

    /// Level for this month, then step to the next.
    fn next(&mut self, month: u32) -> DealSimResult<Decimal> {
        let current = self.level;
        self.level = self
            .level
            .checked_mul(self.factor)
            .filter(|level| *level <= MAX_GROWTH_LEVEL)
            .ok_or_else(|| DealSimError::InvalidInput {
                field: self.field.into(),
                reason: format!("growth compounds past {MAX_GROWTH_LEVEL}x by month {month}"),
            })?;
        Ok(current)
    }
}

fn scheduled_principal(schedule: &AmortizationSchedule, interest: Money, principal: Money) -> Money {
    schedule
        .amortizing_payment
        .map(|pmt| (pmt - interest).max(Decimal::ZERO).min(principal))
        .unwrap_or(Decimal::ZERO)
}

/// Project the deal month by month through the sale month.
///
/// Rent, other income and expenses compound monthly at the monthly equivalent
/// of their annual growth rates. For BRRRR deals a refinance at month `m`
/// pays the month's scheduled debt service on the old loan, retires its
/// balance from the new loan, and from month `m + 1` services the new loan.
pub fn project(inputs: &InvestmentInputs) -> DealSimResult<ProForma> {
    let horizon = inputs.sale_month();
    if horizon == 0 {
        return Err(DealSimError::InvalidInput {
            field: "hold_period_months".into(),
            reason: "Projection needs at least one month".into(),
        });
    }

    let acquisition = build_schedule(&acquisition_loan_terms(inputs), Some(horizon))?;

    let refinance = match inputs.active_refinance() {
        Some(refi) if refi.month < horizon => {
            let new_loan = refi.arv * refi.ltv;
            let terms = LoanTerms {
                financing_type: FinancingType::FullyAmortizing,
                principal: new_loan,
                annual_rate: refi.annual_rate,
                amortization_months: refi.amortization_years * 12,
                interest_only_months: 0,
                term_months: refi.amortization_years * 12,
                collateral_value: Some(refi.arv),
            };
            let schedule = build_schedule(&terms, Some(horizon - refi.month))?;
            let old_loan_payoff = acquisition.balance_after(refi.month);
            let event = RefinanceEvent {
                month: refi.month,
                arv: refi.arv,
                new_loan,
                old_loan_payoff,
                closing_costs: refi.closing_costs,
                cash_out: new_loan - old_loan_payoff - refi.closing_costs,
                new_monthly_payment: schedule.initial_payment,
            };
            Some((event, schedule))
        }
        Some(refi) => {
            tracing::warn!(
                refinance_month = refi.month,
                sale_month = horizon,
                "refinance falls on or after sale; ignored"
            );
            None
        }
        None => None,
    };

    let income = &inputs.income;
    let expenses = &inputs.expenses;
    let units = Decimal::from(income.unit_count);

    let mut rent_index = GrowthIndex::annual("income.annual_rent_growth", income.annual_rent_growth);
    let mut other_index =
        GrowthIndex::annual("income.other_income_growth", income.other_income_growth);
    let mut expense_index =
        GrowthIndex::annual("expenses.annual_expense_growth", expenses.annual_expense_growth);

    let fixed_monthly = (expenses.property_tax_annual
        + expenses.insurance_annual
        + expenses.other_fixed_annual)
        / Decimal::from(12);
    let reserves_monthly = expenses.reserves_per_unit_annual * units / Decimal::from(12);

    let reno_budget = inputs.acquisition.renovation_budget;
    let reno_months = inputs.acquisition.renovation_months.max(1);
    let reno_draw = reno_budget / Decimal::from(reno_months);
    // Last renovation month; a budget always occupies at least month 1
    let reno_complete = if reno_budget.is_zero() {
        inputs.acquisition.renovation_months
    } else {
        reno_months
    };

    let mut monthly = Vec::with_capacity(horizon as usize);

    for month in 1..=horizon {
        let rent_level = rent_index.next(month)?;
        let other_level = other_index.next(month)?;
        let expense_level = expense_index.next(month)?;

        let base_rent = match income.post_renovation_rent_per_unit {
            Some(post) if month > reno_complete => post,
            _ => income.monthly_rent_per_unit,
        };
        let rent = base_rent * rent_level;

        // --- Income ---
        let gross_potential_rent = rent * units;
        let vacancy_loss = gross_potential_rent * income.vacancy_rate;
        let other_gross = income.other_income_monthly * other_level;
        let other_vacancy = income
            .other_income_vacancy_rate
            .map(|v| other_gross * v)
            .unwrap_or(Decimal::ZERO);
        let other_income = other_gross - other_vacancy;
        let effective_gross_income = gross_potential_rent - vacancy_loss + other_income;

        // --- Expenses ---
        let operating_expenses = fixed_monthly * expense_level
            + effective_gross_income * expenses.maintenance_pct_of_egi;
        let management_fee = effective_gross_income * expenses.management_fee_pct_of_egi;
        let replacement_reserves = reserves_monthly * expense_level;
        let noi = effective_gross_income - operating_expenses - management_fee - replacement_reserves;

        // --- Debt ---
        let (schedule, loan_month) = match &refinance {
            Some((event, new_schedule)) if month > event.month => {
                (new_schedule, month - event.month)
            }
            _ => (&acquisition, month),
        };
        let (interest, principal, balloon_payment) = match schedule.period(loan_month) {
            Some(p) => {
                let scheduled = if p.balloon {
                    scheduled_principal(schedule, p.interest, p.principal)
                } else {
                    p.principal
                };
                (p.interest, scheduled, p.principal - scheduled)
            }
            None => (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
        };
        let debt_service = interest + principal;

        let (refinance_cash_out, loan_balance) = match &refinance {
            Some((event, new_schedule)) if month == event.month => {
                (event.cash_out, new_schedule.principal)
            }
            Some((event, new_schedule)) if month > event.month => {
                (Decimal::ZERO, new_schedule.balance_after(month - event.month))
            }
            _ => (Decimal::ZERO, acquisition.balance_after(month)),
        };

        // --- Period-specific outflows ---
        let renovation_draw = if reno_budget.is_zero() || month > reno_months {
            Decimal::ZERO
        } else if month == reno_months {
            reno_budget - reno_draw * Decimal::from(reno_months - 1)
        } else {
            reno_draw
        };
        let outflow = |kind: OutflowKind| -> Money {
            inputs
                .scheduled_outflows
                .iter()
                .filter(|o| o.month == month && o.kind == kind)
                .map(|o| o.amount)
                .sum()
        };
        let make_ready = outflow(OutflowKind::MakeReady);
        let leasing_commissions = outflow(OutflowKind::LeasingCommission);
        let capital_expenditures = outflow(OutflowKind::CapitalExpenditure);

        let cash_flow_before_tax = noi
            - debt_service
            - balloon_payment
            - renovation_draw
            - make_ready
            - leasing_commissions
            - capital_expenditures
            + refinance_cash_out;

        let period_date = inputs
            .acquisition
            .start_date
            .and_then(|d| d.checked_add_months(Months::new(month - 1)));

        monthly.push(MonthlyPeriodRecord {
            month,
            year: (month - 1) / 12 + 1,
            period_date,
            rent,
            gross_potential_rent,
            vacancy_loss,
            other_income,
            effective_gross_income,
            operating_expenses,
            management_fee,
            replacement_reserves,
            noi,
            interest,
            principal,
            debt_service,
            balloon_payment,
            renovation_draw,
            make_ready,
            leasing_commissions,
            capital_expenditures,
            refinance_cash_out,
            cash_flow_before_tax,
            loan_balance,
        });
    }

    let initial_equity = inputs.initial_equity();
    let annual = summarize_years(&monthly, initial_equity);

    tracing::debug!(
        months = monthly.len(),
        years = annual.len(),
        refinanced = refinance.is_some(),
        "pro forma projected"
    );

    Ok(ProForma {
        monthly,
        annual,
        acquisition_loan: acquisition.principal,
        initial_equity,
        refinance: refinance.map(|(event, _)| event),
    })
}

/// Build the monthly and annual pro forma for a deal.
pub fn build_pro_forma(inputs: &InvestmentInputs) -> DealSimResult<ComputationOutput<ProForma>> {
    let mut warnings: Vec<String> = Vec::new();
    let pro_forma = project(inputs)?;

    if let Some(month) = pro_forma
        .monthly
        .iter()
        .find(|m| m.balloon_payment > Decimal::ZERO)
        .map(|m| m.month)
    {
        warnings.push(format!(
            "Loan matures in month {month}, before the sale; balloon paid from operating cash"
        ));
    }

    Ok(with_metadata(
        "Monthly pro forma projection",
        &serde_json::json!({
            "deal_type": inputs.deal_type,
            "sale_month": inputs.sale_month(),
            "unit_count": inputs.income.unit_count,
        }),
        warnings,
        pro_forma,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deal::inputs::{DealType, RefinanceInputs, ScheduledOutflow};
    use crate::deal::test_support::base_rental;
    use rust_decimal_macros::dec;

    #[test]
    fn test_base_rental_year_one() {
        let pf = project(&base_rental()).unwrap();
        assert_eq!(pf.monthly.len(), 60);
        let y1 = &pf.annual[0];
        assert_eq!(y1.effective_gross_income, dec!(22080));
        // NOI = 22,080 - 4,500 - 1,104 - 1,766.40
        assert_eq!(y1.noi, dec!(14709.60));
        assert_eq!(pf.acquisition_loan, dec!(187500));
        assert_eq!(pf.initial_equity, dec!(67500));
    }

    #[test]
    fn test_record_identities() {
        let pf = project(&base_rental()).unwrap();
        for m in &pf.monthly {
            assert_eq!(
                m.noi,
                m.effective_gross_income - m.operating_expenses - m.management_fee
                    - m.replacement_reserves
            );
            assert_eq!(m.debt_service, m.interest + m.principal);
            assert_eq!(m.cash_flow_before_tax, m.noi - m.debt_service);
        }
    }

    #[test]
    fn test_rent_growth_compounds_monthly() {
        let mut inputs = base_rental();
        inputs.income.annual_rent_growth = dec!(0.03);
        let pf = project(&inputs).unwrap();
        assert_eq!(pf.monthly[0].rent, dec!(2000));
        // Month 13 rent is one full year of growth
        assert!((pf.monthly[12].rent - dec!(2060)).abs() < dec!(0.01));
        assert!(pf.monthly[1].rent > pf.monthly[0].rent);
    }

    #[test]
    fn test_renovation_draws_sum_to_budget() {
        let mut inputs = base_rental();
        inputs.acquisition.renovation_budget = dec!(10000);
        inputs.acquisition.renovation_months = 3;
        inputs.income.post_renovation_rent_per_unit = Some(dec!(2300));
        let pf = project(&inputs).unwrap();
        let total: Money = pf.monthly.iter().map(|m| m.renovation_draw).sum();
        assert_eq!(total, dec!(10000));
        assert!(pf.monthly[3].renovation_draw.is_zero());
        assert_eq!(pf.monthly[2].rent, dec!(2000));
        assert_eq!(pf.monthly[3].rent, dec!(2300));
    }

    #[test]
    fn test_zero_month_renovation_lifts_rent_from_month_two() {
        let mut inputs = base_rental();
        inputs.acquisition.renovation_budget = dec!(8000);
        inputs.acquisition.renovation_months = 0;
        inputs.income.post_renovation_rent_per_unit = Some(dec!(2300));
        let pf = project(&inputs).unwrap();
        assert_eq!(pf.monthly[0].renovation_draw, dec!(8000));
        assert_eq!(pf.monthly[0].rent, dec!(2000));
        assert_eq!(pf.monthly[1].rent, dec!(2300));
    }

    #[test]
    fn test_post_renovation_rent_without_budget_starts_immediately() {
        let mut inputs = base_rental();
        inputs.income.post_renovation_rent_per_unit = Some(dec!(2300));
        let pf = project(&inputs).unwrap();
        assert_eq!(pf.monthly[0].rent, dec!(2300));
    }

    #[test]
    fn test_runaway_growth_is_an_input_error() {
        let mut inputs = base_rental();
        inputs.acquisition.hold_period_months = 480;
        inputs.income.annual_rent_growth = dec!(10);
        match project(&inputs) {
            Err(DealSimError::InvalidInput { field, .. }) => {
                assert_eq!(field, "income.annual_rent_growth")
            }
            other => panic!("expected InvalidInput, got {:?}", other.map(|pf| pf.monthly.len())),
        }
    }

    #[test]
    fn test_scheduled_outflows_land_in_their_month() {
        let mut inputs = base_rental();
        inputs.scheduled_outflows = vec![
            ScheduledOutflow {
                month: 7,
                kind: OutflowKind::MakeReady,
                amount: dec!(1500),
            },
            ScheduledOutflow {
                month: 7,
                kind: OutflowKind::LeasingCommission,
                amount: dec!(1000),
            },
        ];
        let pf = project(&inputs).unwrap();
        let m7 = &pf.monthly[6];
        assert_eq!(m7.make_ready, dec!(1500));
        assert_eq!(m7.leasing_commissions, dec!(1000));
        assert_eq!(
            m7.cash_flow_before_tax,
            m7.noi - m7.debt_service - dec!(2500)
        );
        assert!(pf.monthly[5].make_ready.is_zero());
    }

    #[test]
    fn test_brrrr_refinance_is_single_month_event() {
        let mut inputs = base_rental();
        inputs.deal_type = DealType::Brrrr;
        inputs.refinance = Some(RefinanceInputs {
            month: 6,
            arv: dec!(320000),
            ltv: dec!(0.75),
            annual_rate: dec!(0.065),
            amortization_years: 30,
            closing_costs: dec!(4000),
        });
        let pf = project(&inputs).unwrap();
        let event = pf.refinance.as_ref().unwrap();
        assert_eq!(event.new_loan, dec!(240000));
        assert_eq!(
            event.cash_out,
            dec!(240000) - event.old_loan_payoff - dec!(4000)
        );

        let m6 = &pf.monthly[5];
        let m7 = &pf.monthly[6];
        assert_eq!(m6.refinance_cash_out, event.cash_out);
        assert_eq!(m6.loan_balance, dec!(240000));
        assert!(m7.refinance_cash_out.is_zero());
        // Month 7 services the new loan
        assert_eq!(m7.interest, dec!(240000) * (dec!(0.065) / dec!(12)));
        assert_eq!(m7.debt_service, event.new_monthly_payment);
        assert!(m7.loan_balance < dec!(240000));
    }

    #[test]
    fn test_refinance_ignored_for_rental() {
        let mut inputs = base_rental();
        inputs.refinance = Some(RefinanceInputs {
            month: 6,
            arv: dec!(320000),
            ltv: dec!(0.75),
            annual_rate: dec!(0.065),
            amortization_years: 30,
            closing_costs: Decimal::ZERO,
        });
        let pf = project(&inputs).unwrap();
        assert!(pf.refinance.is_none());
    }

    #[test]
    fn test_bridge_balloon_before_sale_is_separated() {
        let mut inputs = base_rental();
        inputs.financing.financing_type = FinancingType::BridgeInterestOnly;
        inputs.financing.loan_term_months = Some(12);
        let result = build_pro_forma(&inputs).unwrap();
        let m12 = &result.result.monthly[11];
        assert_eq!(m12.balloon_payment, dec!(187500));
        assert_eq!(m12.debt_service, m12.interest);
        assert!(result.result.monthly[12].debt_service.is_zero());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_period_dates() {
        let mut inputs = base_rental();
        inputs.acquisition.start_date = NaiveDate::from_ymd_opt(2025, 11, 1);
        let pf = project(&inputs).unwrap();
        assert_eq!(pf.monthly[2].period_date, NaiveDate::from_ymd_opt(2026, 1, 1));
    }
}
