use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::deal::inputs::{DealType, FinancingType, InvestmentInputs};
use crate::error::{DealSimError, ValidationIssue};
use crate::settings::WarningThresholds;
use crate::types::Rate;
use crate::waterfall::structure::structure_issues;
use crate::DealSimResult;

/// Longest hold the projector accepts (40 years).
pub const MAX_HOLD_MONTHS: u32 = 480;
/// Ceiling on loan interest rates, as an annual fraction.
pub const MAX_ANNUAL_RATE: Rate = Decimal::ONE;
/// Ceiling on annual rent, income and expense growth.
pub const MAX_ANNUAL_GROWTH: Rate = Decimal::ONE;

/// Blocking errors and non-blocking warnings for one set of inputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Warnings on success, `ValidationFailed` carrying every error otherwise.
    pub fn into_result(self) -> DealSimResult<Vec<String>> {
        if self.errors.is_empty() {
            Ok(self.warnings)
        } else {
            Err(DealSimError::ValidationFailed {
                errors: self.errors,
            })
        }
    }
}

/// Canonical ordering: outflows and capital calls sorted by month.
pub fn normalize_inputs(inputs: &InvestmentInputs) -> InvestmentInputs {
    let mut normalized = inputs.clone();
    normalized.scheduled_outflows.sort_by_key(|o| o.month);
    if let Some(syndication) = normalized.syndication.as_mut() {
        syndication.capital_calls.sort_by_key(|c| c.month);
    }
    normalized
}

fn in_unit_interval(rate: Rate) -> bool {
    rate >= Decimal::ZERO && rate <= Decimal::ONE
}

/// Range-check every input field before any engine component runs.
pub fn validate_inputs(inputs: &InvestmentInputs, thresholds: &WarningThresholds) -> ValidationReport {
    let mut errors: Vec<ValidationIssue> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();
    let mut error = |field: &str, message: String| {
        errors.push(ValidationIssue {
            field: field.to_string(),
            message,
        });
    };

    // --- Acquisition ---
    let acq = &inputs.acquisition;
    if acq.purchase_price <= Decimal::ZERO {
        error("acquisition.purchase_price", "Purchase price must be positive".into());
    }
    if acq.closing_costs < Decimal::ZERO {
        error("acquisition.closing_costs", "Closing costs cannot be negative".into());
    }
    if acq.hold_period_months == 0 || acq.hold_period_months > MAX_HOLD_MONTHS {
        error(
            "acquisition.hold_period_months",
            format!("Hold period must be between 1 and {MAX_HOLD_MONTHS} months"),
        );
    }
    if acq.renovation_budget < Decimal::ZERO {
        error("acquisition.renovation_budget", "Renovation budget cannot be negative".into());
    }
    if acq.renovation_months > acq.hold_period_months {
        error(
            "acquisition.renovation_months",
            "Renovation cannot run past the hold period".into(),
        );
    }

    // --- Financing ---
    let fin = &inputs.financing;
    if fin.financing_type != FinancingType::None {
        if fin.annual_rate < Decimal::ZERO {
            error("financing.annual_rate", "Interest rate cannot be negative".into());
        } else if fin.annual_rate > MAX_ANNUAL_RATE {
            error("financing.annual_rate", "Interest rate cannot exceed 100%".into());
        }
        if fin.term_months() == 0 {
            error("financing.loan_term_months", "Loan term must be at least one month".into());
        }
        match fin.financing_type {
            FinancingType::FullyAmortizing | FinancingType::InterestOnlyThenAmortizing => {
                if fin.amortization_years == 0 {
                    error(
                        "financing.amortization_years",
                        "Amortizing loans need an amortization term".into(),
                    );
                }
            }
            FinancingType::BridgeInterestOnly => {
                if fin.loan_term_months.is_none() && fin.amortization_years == 0 {
                    error(
                        "financing.loan_term_months",
                        "Bridge loans need a loan term".into(),
                    );
                }
            }
            FinancingType::None => {}
        }
        if fin.financing_type == FinancingType::InterestOnlyThenAmortizing
            && fin.interest_only_months >= fin.amortization_months()
        {
            error(
                "financing.interest_only_months",
                "Interest-only period must be shorter than the amortization term".into(),
            );
        }
        match (fin.loan_amount, fin.ltv) {
            (None, None) => error(
                "financing.ltv",
                "Either a loan amount or an LTV is required".into(),
            ),
            (Some(amount), _) if amount < Decimal::ZERO => {
                error("financing.loan_amount", "Loan amount cannot be negative".into())
            }
            (None, Some(ltv)) if !in_unit_interval(ltv) => {
                error("financing.ltv", format!("LTV {ltv} must be between 0 and 100%"))
            }
            _ => {}
        }
        if !in_unit_interval(fin.points_pct) {
            error("financing.points_pct", "Points must be between 0 and 100%".into());
        }
        if acq.purchase_price > Decimal::ZERO {
            let ltv = fin.loan_principal(acq.purchase_price) / acq.purchase_price;
            if ltv > Decimal::ONE {
                error("financing.loan_amount", format!("LTV {ltv:.4} exceeds 100%"));
            } else if ltv > thresholds.max_ltv {
                warnings.push(format!(
                    "LTV {:.1}% exceeds {:.1}%",
                    ltv * Decimal::ONE_HUNDRED,
                    thresholds.max_ltv * Decimal::ONE_HUNDRED
                ));
            }
        }
    }

    // --- Income ---
    let inc = &inputs.income;
    if inc.unit_count == 0 {
        error("income.unit_count", "At least one unit is required".into());
    }
    if inc.monthly_rent_per_unit < Decimal::ZERO {
        error("income.monthly_rent_per_unit", "Rent cannot be negative".into());
    }
    if inc.post_renovation_rent_per_unit.is_some_and(|r| r < Decimal::ZERO) {
        error(
            "income.post_renovation_rent_per_unit",
            "Rent cannot be negative".into(),
        );
    }
    if inc.other_income_monthly < Decimal::ZERO {
        error("income.other_income_monthly", "Other income cannot be negative".into());
    }
    for (field, growth) in [
        ("income.annual_rent_growth", inc.annual_rent_growth),
        ("income.other_income_growth", inc.other_income_growth),
        ("expenses.annual_expense_growth", inputs.expenses.annual_expense_growth),
    ] {
        if growth <= Decimal::NEGATIVE_ONE || growth > MAX_ANNUAL_GROWTH {
            error(field, "Growth rate must be greater than -100% and at most 100%".into());
        }
    }
    if !in_unit_interval(inc.vacancy_rate) {
        error("income.vacancy_rate", "Vacancy must be between 0 and 100%".into());
    } else if inc.vacancy_rate > thresholds.high_vacancy {
        warnings.push(format!(
            "Vacancy {:.1}% is above {:.1}%",
            inc.vacancy_rate * Decimal::ONE_HUNDRED,
            thresholds.high_vacancy * Decimal::ONE_HUNDRED
        ));
    }
    if inc.other_income_vacancy_rate.is_some_and(|v| !in_unit_interval(v)) {
        error(
            "income.other_income_vacancy_rate",
            "Vacancy must be between 0 and 100%".into(),
        );
    }

    // --- Expenses ---
    let exp = &inputs.expenses;
    for (field, amount) in [
        ("expenses.property_tax_annual", exp.property_tax_annual),
        ("expenses.insurance_annual", exp.insurance_annual),
        ("expenses.other_fixed_annual", exp.other_fixed_annual),
        ("expenses.reserves_per_unit_annual", exp.reserves_per_unit_annual),
    ] {
        if amount < Decimal::ZERO {
            error(field, "Expense cannot be negative".into());
        }
    }
    for (field, pct) in [
        ("expenses.maintenance_pct_of_egi", exp.maintenance_pct_of_egi),
        ("expenses.management_fee_pct_of_egi", exp.management_fee_pct_of_egi),
    ] {
        if !in_unit_interval(pct) {
            error(field, "Percentage of EGI must be between 0 and 100%".into());
        }
    }

    // --- Exit ---
    let sale_month = inputs.sale_month();
    if inputs.exit.exit_cap_rate <= Decimal::ZERO {
        error("exit.exit_cap_rate", "Exit cap rate must be positive".into());
    }
    if !in_unit_interval(inputs.exit.sale_cost_pct) {
        error("exit.sale_cost_pct", "Sale costs must be between 0 and 100%".into());
    }
    if sale_month == 0 || sale_month > acq.hold_period_months {
        error(
            "exit.sale_month",
            format!(
                "Sale month {sale_month} must fall within the {}-month hold",
                acq.hold_period_months
            ),
        );
    }
    if fin.financing_type == FinancingType::BridgeInterestOnly && fin.term_months() < sale_month {
        warnings.push(format!(
            "Bridge loan matures in month {}, before the sale in month {sale_month}",
            fin.term_months()
        ));
    }

    for (i, outflow) in inputs.scheduled_outflows.iter().enumerate() {
        if outflow.month == 0 || outflow.month > sale_month {
            error(
                &format!("scheduled_outflows[{i}].month"),
                format!("Month {} is outside the projection", outflow.month),
            );
        }
        if outflow.amount < Decimal::ZERO {
            error(
                &format!("scheduled_outflows[{i}].amount"),
                "Outflow amount cannot be negative".into(),
            );
        }
    }

    // --- Refinance ---
    match (inputs.deal_type, &inputs.refinance) {
        (DealType::Brrrr, Some(refi)) => {
            if refi.month == 0 || refi.month >= sale_month {
                error(
                    "refinance.month",
                    "Refinance must happen after month 0 and before the sale".into(),
                );
            }
            if refi.arv <= Decimal::ZERO {
                error("refinance.arv", "ARV must be positive".into());
            }
            if refi.ltv <= Decimal::ZERO || refi.ltv > Decimal::ONE {
                error("refinance.ltv", format!("Refinance LTV {} must be in (0, 100%]", refi.ltv));
            }
            if refi.annual_rate < Decimal::ZERO {
                error("refinance.annual_rate", "Interest rate cannot be negative".into());
            } else if refi.annual_rate > MAX_ANNUAL_RATE {
                error("refinance.annual_rate", "Interest rate cannot exceed 100%".into());
            }
            if refi.amortization_years == 0 {
                error("refinance.amortization_years", "Amortization term is required".into());
            }
            if refi.closing_costs < Decimal::ZERO {
                error("refinance.closing_costs", "Closing costs cannot be negative".into());
            }
        }
        (DealType::Brrrr, None) => {
            warnings.push("BRRRR deal has no refinance event; modelled as a plain rental".into())
        }
        (DealType::Rental | DealType::Syndication, Some(_)) => {
            warnings.push("Refinance is only modelled for BRRRR deals; ignored".into())
        }
        (DealType::Rental | DealType::Syndication, None) => {}
    }

    // --- Syndication ---
    match (inputs.deal_type, &inputs.syndication) {
        (DealType::Syndication, Some(synd)) => {
            if synd.lp_equity_share <= Decimal::ZERO || synd.lp_equity_share > Decimal::ONE {
                error(
                    "syndication.lp_equity_share",
                    "LP equity share must be in (0, 100%]".into(),
                );
            }
            for issue in structure_issues(&synd.waterfall) {
                error(&format!("syndication.{}", issue.field), issue.message);
            }
            for (i, call) in synd.capital_calls.iter().enumerate() {
                if call.month == 0 || call.month > sale_month {
                    error(
                        &format!("syndication.capital_calls[{i}].month"),
                        format!("Month {} is outside the projection", call.month),
                    );
                }
                if call.amount <= Decimal::ZERO {
                    error(
                        &format!("syndication.capital_calls[{i}].amount"),
                        "Capital call must be positive".into(),
                    );
                }
            }
            let wf = &synd.waterfall;
            if !wf.variant.accrues_pref() && !wf.pref_rate.is_zero() {
                warnings.push("Preferred return is not part of em_hurdles; pref_rate ignored".into());
            }
            if !wf.variant.has_catch_up() && wf.catch_up_pct.is_some() {
                warnings.push("Catch-up only applies to pref_roc_catchup_promote; ignored".into());
            }
        }
        (DealType::Syndication, None) => error(
            "syndication",
            "Syndication deals need an equity split and waterfall".into(),
        ),
        (DealType::Rental | DealType::Brrrr, Some(_)) => {
            warnings.push("Waterfall is only run for syndication deals; ignored".into())
        }
        (DealType::Rental | DealType::Brrrr, None) => {}
    }

    ValidationReport { errors, warnings }
}
