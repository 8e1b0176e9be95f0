use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::deal::inputs::FinancingType;
use crate::error::DealSimError;
use crate::time_value::level_payment;
use crate::types::*;
use crate::DealSimResult;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Terms of a single loan, in months.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanTerms {
    pub financing_type: FinancingType,
    pub principal: Money,
    pub annual_rate: Rate,
    /// Amortization period in months
    pub amortization_months: u32,
    /// Interest-only months at the start (interest_only_then_amortizing)
    #[serde(default)]
    pub interest_only_months: u32,
    /// Total loan term in months; a balloon is due at term end
    pub term_months: u32,
    /// Property value used for the LTV ceiling check
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collateral_value: Option<Money>,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One month of debt service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationPeriod {
    pub month: u32,
    pub beginning_balance: Money,
    pub interest: Money,
    pub principal: Money,
    pub payment: Money,
    pub ending_balance: Money,
    pub interest_only: bool,
    /// Final payoff of the remaining balance at term end
    pub balloon: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub financing_type: FinancingType,
    pub principal: Money,
    pub monthly_rate: Rate,
    /// Payment in month 1
    pub initial_payment: Money,
    /// Level payment once amortization starts (None for bridge loans)
    pub amortizing_payment: Option<Money>,
    pub periods: Vec<AmortizationPeriod>,
    pub total_interest: Money,
    pub total_principal: Money,
}

impl AmortizationSchedule {
    /// Schedule for an all-cash purchase.
    pub fn unlevered() -> Self {
        Self {
            financing_type: FinancingType::None,
            principal: Decimal::ZERO,
            monthly_rate: Decimal::ZERO,
            initial_payment: Decimal::ZERO,
            amortizing_payment: None,
            periods: Vec::new(),
            total_interest: Decimal::ZERO,
            total_principal: Decimal::ZERO,
        }
    }

    /// Debt-service row for a month (1-based), if the loan is still live.
    pub fn period(&self, month: u32) -> Option<&AmortizationPeriod> {
        if month == 0 {
            return None;
        }
        self.periods.get((month - 1) as usize)
    }

    /// Outstanding balance after `month` payments.
    pub fn balance_after(&self, month: u32) -> Money {
        if month == 0 {
            return self.principal;
        }
        match self.period(month) {
            Some(p) => p.ending_balance,
            None => self
                .periods
                .last()
                .map(|p| p.ending_balance)
                .unwrap_or(self.principal),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Reject terms the schedule cannot be built from.
pub fn validate_loan_terms(terms: &LoanTerms) -> DealSimResult<()> {
    if terms.financing_type == FinancingType::None {
        return Ok(());
    }
    if terms.annual_rate < Decimal::ZERO {
        return Err(DealSimError::InvalidFinancingTerms(format!(
            "interest rate {} is negative",
            terms.annual_rate
        )));
    }
    if terms.principal < Decimal::ZERO {
        return Err(DealSimError::InvalidFinancingTerms(
            "loan principal cannot be negative".into(),
        ));
    }
    if terms.term_months == 0 {
        return Err(DealSimError::InvalidFinancingTerms(
            "loan term must be at least one month".into(),
        ));
    }
    match terms.financing_type {
        FinancingType::FullyAmortizing | FinancingType::InterestOnlyThenAmortizing => {
            if terms.amortization_months == 0 {
                return Err(DealSimError::InvalidFinancingTerms(
                    "amortization term must be at least one month".into(),
                ));
            }
        }
        FinancingType::BridgeInterestOnly | FinancingType::None => {}
    }
    if terms.financing_type == FinancingType::InterestOnlyThenAmortizing
        && terms.interest_only_months >= terms.amortization_months
    {
        return Err(DealSimError::InvalidFinancingTerms(format!(
            "interest-only period ({} months) must be shorter than amortization ({} months)",
            terms.interest_only_months, terms.amortization_months
        )));
    }
    if let Some(value) = terms.collateral_value {
        if value <= Decimal::ZERO {
            return Err(DealSimError::InvalidFinancingTerms(
                "collateral value must be positive".into(),
            ));
        }
        if terms.principal / value > Decimal::ONE {
            return Err(DealSimError::InvalidFinancingTerms(format!(
                "LTV {:.4} exceeds 100%",
                terms.principal / value
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// Build the monthly debt-service schedule.
///
/// The level payment is computed at origination, and again at the
/// interest-only to amortizing transition over the remaining amortization
/// months. Bridge loans pay `P * r` monthly with a balloon at term end.
/// The schedule stops at `min(term, horizon)`; any balance left then is the
/// payoff owed at sale.
pub fn build_schedule(
    terms: &LoanTerms,
    horizon_months: Option<u32>,
) -> DealSimResult<AmortizationSchedule> {
    validate_loan_terms(terms)?;

    if terms.financing_type == FinancingType::None || terms.principal.is_zero() {
        return Ok(AmortizationSchedule::unlevered());
    }

    let r = terms.annual_rate / dec!(12);
    let last_month = horizon_months
        .map(|h| h.min(terms.term_months))
        .unwrap_or(terms.term_months);

    let io_months = match terms.financing_type {
        FinancingType::InterestOnlyThenAmortizing => terms.interest_only_months,
        FinancingType::BridgeInterestOnly => terms.term_months,
        FinancingType::FullyAmortizing | FinancingType::None => 0,
    };

    let mut amortizing_payment = if io_months == 0 {
        Some(level_payment(terms.principal, r, terms.amortization_months)?)
    } else {
        None
    };

    let mut periods = Vec::with_capacity(last_month as usize);
    let mut balance = terms.principal;
    let mut total_interest = Decimal::ZERO;
    let mut total_principal = Decimal::ZERO;

    for month in 1..=last_month {
        let beginning_balance = balance;
        let interest = beginning_balance * r;
        let interest_only = month <= io_months;

        // Re-amortize the remaining balance when I/O ends
        if !interest_only && amortizing_payment.is_none() {
            let remaining = terms.amortization_months - io_months;
            amortizing_payment = Some(level_payment(beginning_balance, r, remaining)?);
        }

        let mut principal = match (interest_only, amortizing_payment) {
            (true, _) | (false, None) => Decimal::ZERO,
            (false, Some(pmt)) => (pmt - interest).max(Decimal::ZERO),
        };

        // Close out rounding residue in the final amortization month
        if !interest_only && month == terms.amortization_months {
            principal = beginning_balance;
        }

        let balloon = month == terms.term_months && beginning_balance - principal > Decimal::ZERO;
        if balloon {
            principal = beginning_balance;
        }
        principal = principal.min(beginning_balance);

        balance = beginning_balance - principal;
        total_interest += interest;
        total_principal += principal;

        periods.push(AmortizationPeriod {
            month,
            beginning_balance,
            interest,
            principal,
            payment: interest + principal,
            ending_balance: balance,
            interest_only,
            balloon,
        });

        if balance.is_zero() {
            break;
        }
    }

    let initial_payment = periods.first().map(|p| p.payment).unwrap_or_default();

    tracing::debug!(
        financing_type = ?terms.financing_type,
        principal = %terms.principal,
        months = periods.len(),
        "amortization schedule built"
    );

    Ok(AmortizationSchedule {
        financing_type: terms.financing_type,
        principal: terms.principal,
        monthly_rate: r,
        initial_payment,
        amortizing_payment,
        periods,
        total_interest,
        total_principal,
    })
}

/// Build a full-term amortization schedule for a standalone loan.
pub fn amortize_loan(terms: &LoanTerms) -> DealSimResult<ComputationOutput<AmortizationSchedule>> {
    let mut warnings: Vec<String> = Vec::new();

    let schedule = build_schedule(terms, None)?;

    if terms.financing_type != FinancingType::None
        && terms.term_months < terms.amortization_months
        && terms.financing_type != FinancingType::BridgeInterestOnly
    {
        warnings.push(format!(
            "Loan term ({} months) is shorter than amortization ({} months); balloon due at maturity",
            terms.term_months, terms.amortization_months
        ));
    }

    Ok(with_metadata(
        "Fixed-payment loan amortization",
        &serde_json::json!({
            "financing_type": terms.financing_type,
            "principal": terms.principal.to_string(),
            "annual_rate": terms.annual_rate.to_string(),
            "amortization_months": terms.amortization_months,
            "term_months": terms.term_months,
        }),
        warnings,
        schedule,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn thirty_year(principal: Money, rate: Rate) -> LoanTerms {
        LoanTerms {
            financing_type: FinancingType::FullyAmortizing,
            principal,
            annual_rate: rate,
            amortization_months: 360,
            interest_only_months: 0,
            term_months: 360,
            collateral_value: None,
        }
    }

    #[test]
    fn test_fully_amortizing_closes_to_zero() {
        let sched = build_schedule(&thirty_year(dec!(187500), dec!(0.07)), None).unwrap();
        assert_eq!(sched.periods.len(), 360);
        assert_eq!(sched.periods.last().unwrap().ending_balance, Decimal::ZERO);
        assert!((sched.total_principal - dec!(187500)).abs() < dec!(0.000001));
        assert!((sched.initial_payment - dec!(1247.44)).abs() < dec!(0.01));
    }

    #[test]
    fn test_first_month_split() {
        let sched = build_schedule(&thirty_year(dec!(120000), dec!(0.06)), None).unwrap();
        let first = &sched.periods[0];
        assert_eq!(first.interest, dec!(600));
        assert_eq!(first.principal + first.interest, first.payment);
        assert_eq!(first.ending_balance, dec!(120000) - first.principal);
    }

    #[test]
    fn test_zero_rate_is_straight_line() {
        let mut terms = thirty_year(dec!(36000), Decimal::ZERO);
        terms.amortization_months = 36;
        terms.term_months = 36;
        let sched = build_schedule(&terms, None).unwrap();
        for p in &sched.periods {
            assert_eq!(p.interest, Decimal::ZERO);
            assert_eq!(p.principal, dec!(1000));
        }
        assert_eq!(sched.periods.last().unwrap().ending_balance, Decimal::ZERO);
    }

    #[test]
    fn test_interest_only_then_reamortizes() {
        let terms = LoanTerms {
            financing_type: FinancingType::InterestOnlyThenAmortizing,
            principal: dec!(100000),
            annual_rate: dec!(0.06),
            amortization_months: 120,
            interest_only_months: 24,
            term_months: 120,
            collateral_value: None,
        };
        let sched = build_schedule(&terms, None).unwrap();
        for p in &sched.periods[..24] {
            assert!(p.interest_only);
            assert_eq!(p.payment, dec!(500));
            assert_eq!(p.ending_balance, dec!(100000));
        }
        let expected = level_payment(dec!(100000), dec!(0.005), 96).unwrap();
        assert_eq!(sched.amortizing_payment, Some(expected));
        assert!((sched.periods[24].payment - expected).abs() < dec!(0.0000001));
        assert_eq!(sched.periods.last().unwrap().ending_balance, Decimal::ZERO);
        assert_eq!(sched.periods.len(), 120);
    }

    #[test]
    fn test_bridge_balloon_at_term() {
        let terms = LoanTerms {
            financing_type: FinancingType::BridgeInterestOnly,
            principal: dec!(200000),
            annual_rate: dec!(0.12),
            amortization_months: 0,
            interest_only_months: 0,
            term_months: 12,
            collateral_value: None,
        };
        let sched = build_schedule(&terms, None).unwrap();
        assert_eq!(sched.periods.len(), 12);
        for p in &sched.periods[..11] {
            assert_eq!(p.payment, dec!(2000));
            assert_eq!(p.ending_balance, dec!(200000));
        }
        let last = &sched.periods[11];
        assert!(last.balloon);
        assert_eq!(last.payment, dec!(202000));
        assert_eq!(last.ending_balance, Decimal::ZERO);
    }

    #[test]
    fn test_bridge_sale_before_term_leaves_balance() {
        let terms = LoanTerms {
            financing_type: FinancingType::BridgeInterestOnly,
            principal: dec!(200000),
            annual_rate: dec!(0.12),
            amortization_months: 0,
            interest_only_months: 0,
            term_months: 24,
            collateral_value: None,
        };
        let sched = build_schedule(&terms, Some(6)).unwrap();
        assert_eq!(sched.periods.len(), 6);
        assert_eq!(sched.balance_after(6), dec!(200000));
    }

    #[test]
    fn test_balloon_when_term_shorter_than_amortization() {
        let mut terms = thirty_year(dec!(100000), dec!(0.06));
        terms.term_months = 60;
        let sched = build_schedule(&terms, None).unwrap();
        assert_eq!(sched.periods.len(), 60);
        let last = &sched.periods[59];
        assert!(last.balloon);
        assert_eq!(last.ending_balance, Decimal::ZERO);
        assert!(last.principal > dec!(90000));
    }

    #[test]
    fn test_invalid_terms() {
        let mut negative = thirty_year(dec!(1000), dec!(-0.01));
        assert!(matches!(
            build_schedule(&negative, None),
            Err(DealSimError::InvalidFinancingTerms(_))
        ));

        negative.annual_rate = dec!(0.05);
        negative.amortization_months = 0;
        assert!(matches!(
            build_schedule(&negative, None),
            Err(DealSimError::InvalidFinancingTerms(_))
        ));

        let mut over_ltv = thirty_year(dec!(101), dec!(0.05));
        over_ltv.collateral_value = Some(dec!(100));
        assert!(matches!(
            build_schedule(&over_ltv, None),
            Err(DealSimError::InvalidFinancingTerms(_))
        ));
    }

    #[test]
    fn test_extreme_rate_reports_instead_of_panicking() {
        let terms = thirty_year(dec!(187500), dec!(6));
        assert!(matches!(
            build_schedule(&terms, None),
            Err(DealSimError::InvalidFinancingTerms(_))
        ));
    }

    #[test]
    fn test_unlevered_schedule() {
        let terms = LoanTerms {
            financing_type: FinancingType::None,
            principal: Decimal::ZERO,
            annual_rate: Decimal::ZERO,
            amortization_months: 0,
            interest_only_months: 0,
            term_months: 0,
            collateral_value: None,
        };
        let sched = build_schedule(&terms, Some(12)).unwrap();
        assert!(sched.periods.is_empty());
        assert_eq!(sched.balance_after(12), Decimal::ZERO);
    }
}
