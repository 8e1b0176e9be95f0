use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::deal::inputs::ExitInputs;
use crate::error::DealSimError;
use crate::proforma::projection::ProForma;
use crate::types::*;
use crate::DealSimResult;

/// Terminal sale at the end of the projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitAnalysis {
    pub sale_month: u32,
    /// Trailing-12 NOI, or the annualized run-rate for holds under a year
    pub stabilized_noi: Money,
    pub exit_cap_rate: Rate,
    pub sale_price: Money,
    pub sale_costs: Money,
    pub loan_payoff: Money,
    pub net_sale_proceeds: Money,
}

/// NOI for the twelve months ending at `sale_month`.
///
/// With fewer than twelve months projected, the available months are
/// annualized.
pub fn stabilized_noi(pro_forma: &ProForma, sale_month: u32) -> DealSimResult<Money> {
    let end = (sale_month as usize).min(pro_forma.monthly.len());
    if end == 0 {
        return Err(DealSimError::InsufficientData(
            "No projected months to stabilize NOI from".into(),
        ));
    }
    let start = end.saturating_sub(12);
    let window = &pro_forma.monthly[start..end];
    let total: Money = window.iter().map(|m| m.noi).sum();
    if window.len() == 12 {
        Ok(total)
    } else {
        Ok(total / Decimal::from(window.len() as u32) * Decimal::from(12))
    }
}

/// Sale price, costs and net proceeds at the sale month.
pub fn analyze_exit(pro_forma: &ProForma, exit: &ExitInputs, sale_month: u32) -> DealSimResult<ExitAnalysis> {
    if exit.exit_cap_rate <= Decimal::ZERO {
        return Err(DealSimError::InvalidExitAssumptions(format!(
            "exit cap rate {} must be positive",
            exit.exit_cap_rate
        )));
    }
    if exit.sale_cost_pct < Decimal::ZERO || exit.sale_cost_pct > Decimal::ONE {
        return Err(DealSimError::InvalidExitAssumptions(format!(
            "sale cost {} must be between 0 and 100%",
            exit.sale_cost_pct
        )));
    }

    let stabilized_noi = stabilized_noi(pro_forma, sale_month)?;
    let sale_price = stabilized_noi / exit.exit_cap_rate;
    let sale_costs = sale_price * exit.sale_cost_pct;
    let loan_payoff = pro_forma.loan_balance_at(sale_month);
    let net_sale_proceeds = sale_price - sale_costs - loan_payoff;

    tracing::debug!(
        sale_month,
        %sale_price,
        %net_sale_proceeds,
        "exit analysed"
    );

    Ok(ExitAnalysis {
        sale_month,
        stabilized_noi,
        exit_cap_rate: exit.exit_cap_rate,
        sale_price,
        sale_costs,
        loan_payoff,
        net_sale_proceeds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deal::test_support::base_rental;
    use crate::proforma::projection::project;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sale_from_trailing_noi() {
        let inputs = base_rental();
        let pf = project(&inputs).unwrap();
        let exit = analyze_exit(&pf, &inputs.exit, 60).unwrap();
        assert_eq!(exit.stabilized_noi, dec!(14709.6));
        assert_eq!(exit.sale_price, dec!(245160));
        assert_eq!(exit.sale_costs, dec!(14709.6));
        assert_eq!(exit.loan_payoff, pf.monthly[59].loan_balance);
        assert_eq!(
            exit.net_sale_proceeds,
            dec!(245160) - dec!(14709.6) - exit.loan_payoff
        );
    }

    #[test]
    fn test_short_hold_annualizes() {
        let mut inputs = base_rental();
        inputs.acquisition.hold_period_months = 6;
        let pf = project(&inputs).unwrap();
        assert_eq!(stabilized_noi(&pf, 6).unwrap(), dec!(14709.6));
    }

    #[test]
    fn test_rejects_non_positive_cap_rate() {
        let mut inputs = base_rental();
        let pf = project(&inputs).unwrap();
        inputs.exit.exit_cap_rate = Decimal::ZERO;
        assert!(matches!(
            analyze_exit(&pf, &inputs.exit, 60),
            Err(DealSimError::InvalidExitAssumptions(_))
        ));
    }
}
