use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::DealSimError;
use crate::types::{Money, Rate};
use crate::DealSimResult;

/// Absolute NPV tolerance at which the IRR solver stops.
pub const IRR_NPV_TOLERANCE: Decimal = dec!(0.0000001);
/// Hard cap on solver iterations.
pub const MAX_IRR_ITERATIONS: u32 = 100;

const IRR_LOWER_BOUND: Rate = dec!(-0.99);
const IRR_UPPER_BOUND: Rate = dec!(10.0);
/// Bracket width below which the root is pinned to Decimal resolution.
const MIN_BRACKET_WIDTH: Decimal = dec!(0.000000000000001);
const MAX_BRACKET_CONTRACTIONS: u32 = 12;

/// Net Present Value of a series of cash flows (t = 0 undiscounted).
pub fn npv(rate: Rate, cash_flows: &[Money]) -> DealSimResult<Money> {
    if rate <= dec!(-1) {
        return Err(DealSimError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }
    npv_checked(rate, cash_flows).ok_or_else(|| DealSimError::DivisionByZero {
        context: format!("NPV at rate {rate} exceeds Decimal range"),
    })
}

/// NPV and its derivative with respect to the rate, or `None` when a
/// discount factor leaves the Decimal range.
fn npv_with_derivative(rate: Rate, cash_flows: &[Money]) -> Option<(Money, Money)> {
    let one_plus_r = Decimal::ONE + rate;
    if one_plus_r <= Decimal::ZERO {
        return None;
    }
    let v = Decimal::ONE.checked_div(one_plus_r)?;

    let mut value = Decimal::ZERO;
    let mut derivative = Decimal::ZERO;
    // discount = v^t
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount.checked_mul(v)?;
        }
        value = value.checked_add(cf.checked_mul(discount)?)?;
        if t > 0 {
            // d/dr [cf * v^t] = -t * cf * v^(t+1)
            let term = Decimal::from(t as u64)
                .checked_mul(*cf)?
                .checked_mul(discount)?
                .checked_mul(v)?;
            derivative = derivative.checked_sub(term)?;
        }
    }

    Some((value, derivative))
}

fn npv_checked(rate: Rate, cash_flows: &[Money]) -> Option<Money> {
    npv_with_derivative(rate, cash_flows).map(|(v, _)| v)
}

/// True when the series has at least one strictly positive and one
/// strictly negative flow.
pub fn has_sign_change(cash_flows: &[Money]) -> bool {
    let any_pos = cash_flows.iter().any(|cf| cf.is_sign_positive() && !cf.is_zero());
    let any_neg = cash_flows.iter().any(|cf| cf.is_sign_negative() && !cf.is_zero());
    any_pos && any_neg
}

/// Internal Rate of Return per period.
///
/// Bracketed solver: the root is first bracketed in `[-0.99, 10.0]`, then
/// refined with Newton-Raphson steps that are only accepted when they land
/// inside the current bracket (bisection otherwise). Stops once
/// `|NPV| < 1e-7` or the bracket collapses to Decimal resolution.
/// A series without a sign change has no IRR and returns `IrrUndefined`.
pub fn irr(cash_flows: &[Money]) -> DealSimResult<Rate> {
    if cash_flows.len() < 2 {
        return Err(DealSimError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }
    if !has_sign_change(cash_flows) {
        return Err(DealSimError::IrrUndefined(
            "cash flows never change sign".into(),
        ));
    }

    let (mut lo, mut f_lo) = finite_endpoint(cash_flows, IRR_LOWER_BOUND)?;
    let (mut hi, f_hi) = finite_endpoint(cash_flows, IRR_UPPER_BOUND)?;

    if f_lo.abs() < IRR_NPV_TOLERANCE {
        return Ok(lo);
    }
    if f_hi.abs() < IRR_NPV_TOLERANCE {
        return Ok(hi);
    }
    if f_lo.is_sign_positive() == f_hi.is_sign_positive() {
        return Err(DealSimError::ConvergenceFailure {
            function: "IRR".into(),
            iterations: 0,
            last_delta: f_lo.abs().min(f_hi.abs()),
        });
    }

    let mut rate = dec!(0.10);
    if rate <= lo || rate >= hi {
        rate = (lo + hi) / dec!(2);
    }
    let mut last_delta = Decimal::MAX;

    for _ in 0..MAX_IRR_ITERATIONS {
        let (f, df) = match npv_with_derivative(rate, cash_flows) {
            Some(pair) => pair,
            None => {
                rate = (lo + hi) / dec!(2);
                continue;
            }
        };
        last_delta = f.abs();

        if last_delta < IRR_NPV_TOLERANCE {
            return Ok(rate);
        }

        // Tighten the bracket around the sign change
        if f.is_sign_positive() == f_lo.is_sign_positive() {
            lo = rate;
            f_lo = f;
        } else {
            hi = rate;
        }

        if hi - lo < MIN_BRACKET_WIDTH {
            return Ok(rate);
        }

        let newton = if df.is_zero() {
            None
        } else {
            f.checked_div(df).and_then(|step| rate.checked_sub(step))
        };

        rate = match newton {
            Some(next) if next > lo && next < hi => next,
            _ => (lo + hi) / dec!(2),
        };
    }

    Err(DealSimError::ConvergenceFailure {
        function: "IRR".into(),
        iterations: MAX_IRR_ITERATIONS,
        last_delta,
    })
}

/// Evaluate NPV at a bracket endpoint, contracting toward zero while the
/// discount factors overflow.
fn finite_endpoint(cash_flows: &[Money], start: Rate) -> DealSimResult<(Rate, Money)> {
    let mut rate = start;
    for _ in 0..MAX_BRACKET_CONTRACTIONS {
        if let Some(value) = npv_checked(rate, cash_flows) {
            return Ok((rate, value));
        }
        rate /= dec!(2);
    }
    Err(DealSimError::ConvergenceFailure {
        function: "IRR bracket".into(),
        iterations: MAX_BRACKET_CONTRACTIONS,
        last_delta: Decimal::MAX,
    })
}

/// Convert a monthly periodic rate into its effective annual equivalent.
pub fn annualize_monthly_rate(monthly: Rate) -> Rate {
    (Decimal::ONE + monthly).powi(12) - Decimal::ONE
}

/// Monthly-equivalent of an annual growth rate: `(1 + g)^(1/12) - 1`.
pub fn monthly_equivalent_rate(annual: Rate) -> Rate {
    if annual.is_zero() {
        return Decimal::ZERO;
    }
    (Decimal::ONE + annual).powd(Decimal::ONE / dec!(12)) - Decimal::ONE
}

/// Level payment that amortizes `principal` over `nper` periods:
/// `P * r * (1+r)^n / ((1+r)^n - 1)`, straight-line when `r == 0`.
pub fn level_payment(principal: Money, rate: Rate, nper: u32) -> DealSimResult<Money> {
    if nper == 0 {
        return Err(DealSimError::InvalidInput {
            field: "nper".into(),
            reason: "Number of periods must be > 0".into(),
        });
    }

    if rate.is_zero() {
        return Ok(principal / Decimal::from(nper));
    }

    let overflow = || {
        DealSimError::InvalidFinancingTerms(format!(
            "level payment overflows at periodic rate {rate} over {nper} periods"
        ))
    };
    let compound = (Decimal::ONE + rate)
        .checked_powi(i64::from(nper))
        .ok_or_else(overflow)?;
    let denominator = compound - Decimal::ONE;
    if denominator.is_zero() {
        return Err(DealSimError::DivisionByZero {
            context: "level payment denominator".into(),
        });
    }

    (principal * rate)
        .checked_mul(compound)
        .map(|numerator| numerator / denominator)
        .ok_or_else(overflow)
}
