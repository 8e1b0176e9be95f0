use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::deal::inputs::{CapitalCall, HurdleMetric, RocMode, SyndicationInputs, WaterfallStructure};
use crate::error::DealSimError;
use crate::proforma::projection::ProForma;
use crate::returns::exit::ExitAnalysis;
use crate::returns::metrics::irr_outcome;
use crate::time_value::{annualize_monthly_rate, has_sign_change, irr};
use crate::types::*;
use crate::waterfall::structure::{
    describe_active_tier, select_active_tier, validate_structure, BASE_SPLIT_NAME,
};
use crate::DealSimResult;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Project cash to allocate between LP and GP, one entry per month.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterfallInput {
    pub structure: WaterfallStructure,
    /// LP share of contributed equity
    pub lp_equity_share: Rate,
    /// Equity contributed at closing (LP + GP)
    pub initial_equity: Money,
    #[serde(default)]
    pub capital_calls: Vec<CapitalCall>,
    /// Project cash flow for periods 1..=N
    pub period_cash_flows: Vec<Money>,
    /// Net sale proceeds, added to the final period
    #[serde(default)]
    pub terminal_proceeds: Money,
}

impl WaterfallInput {
    /// Waterfall input for a projected syndication.
    pub fn from_projection(
        syndication: &SyndicationInputs,
        pro_forma: &ProForma,
        exit: &ExitAnalysis,
    ) -> Self {
        Self {
            structure: syndication.waterfall.clone(),
            lp_equity_share: syndication.lp_equity_share,
            initial_equity: pro_forma.initial_equity,
            capital_calls: syndication.capital_calls.clone(),
            period_cash_flows: pro_forma.cash_flows(),
            terminal_proceeds: exit.net_sale_proceeds,
        }
    }
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// LP/GP cash paid through one promote band in a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierDistribution {
    pub name: String,
    pub lp: Money,
    pub gp: Money,
}

/// Audit record for one period of the waterfall.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterfallAllocation {
    pub period: u32,
    pub cash_available: Money,
    /// Project deficit not covered this period (nothing is distributed)
    pub shortfall: Money,
    pub lp_capital_call: Money,
    pub gp_capital_call: Money,
    pub lp_roc: Money,
    pub gp_roc: Money,
    /// LP unreturned capital the pref accrues on
    pub lp_unreturned_start: Money,
    pub lp_pref_accrual: Money,
    pub lp_pref_paid: Money,
    pub gp_catch_up: Money,
    /// Every band in order, base split first; only the active one is non-zero
    pub tier_distributions: Vec<TierDistribution>,
    pub active_tier: String,
    pub lp_tier_distribution: Money,
    pub gp_tier_distribution: Money,
    pub lp_total: Money,
    pub gp_total: Money,
    pub cumulative_lp_distributions: Money,
    pub cumulative_gp_distributions: Money,
    pub lp_unreturned_capital: Money,
    pub gp_unreturned_capital: Money,
    pub lp_pref_balance: Money,
    /// Cumulative LP distributions / cumulative LP contributions
    pub lp_equity_multiple: Multiple,
    pub rationale: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterfallResult {
    pub allocations: Vec<WaterfallAllocation>,
    pub lp_contributed: Money,
    pub gp_contributed: Money,
    pub lp_distributions: Money,
    pub gp_distributions: Money,
    pub lp_equity_multiple: MetricOutcome,
    pub gp_equity_multiple: MetricOutcome,
    /// Annualised from the monthly LP series
    pub lp_irr: MetricOutcome,
    pub gp_irr: MetricOutcome,
    /// GP profit above its pro-rata share of total profit
    pub gp_promote: Money,
    /// LP capital still unreturned after the final period
    pub lp_unreturned_capital: Money,
    pub lp_pref_balance: Money,
}

// ---------------------------------------------------------------------------
// Period state
// ---------------------------------------------------------------------------

/// Running balances threaded from one period to the next.
#[derive(Debug, Clone, Default)]
pub struct WaterfallCarry {
    pub lp_contributed: Money,
    pub gp_contributed: Money,
    pub lp_unreturned: Money,
    pub gp_unreturned: Money,
    pub lp_pref_balance: Money,
    pub lp_distributed: Money,
    pub gp_distributed: Money,
    /// Distributions beyond return of capital
    pub lp_profit: Money,
    pub gp_profit: Money,
    /// Monthly net flows, t = 0 is the closing contribution
    pub lp_flows: Vec<Money>,
    pub gp_flows: Vec<Money>,
}

impl WaterfallCarry {
    /// State at closing, before period 1.
    pub fn opening(initial_equity: Money, lp_share: Rate) -> Self {
        let lp = initial_equity * lp_share;
        let gp = initial_equity - lp;
        Self {
            lp_contributed: lp,
            gp_contributed: gp,
            lp_unreturned: lp,
            gp_unreturned: gp,
            lp_flows: vec![-lp],
            gp_flows: vec![-gp],
            ..Self::default()
        }
    }

    pub fn lp_equity_multiple(&self) -> Multiple {
        if self.lp_contributed.is_zero() {
            Decimal::ZERO
        } else {
            self.lp_distributed / self.lp_contributed
        }
    }

    /// Annualised LP IRR on distributions to date.
    pub fn lp_irr_to_date(&self) -> Option<Rate> {
        if !has_sign_change(&self.lp_flows) {
            return None;
        }
        irr(&self.lp_flows).ok().map(annualize_monthly_rate)
    }

    /// Performance measure the promote hurdles are keyed on.
    pub fn hurdle_measure(&self, metric: HurdleMetric) -> Option<Rate> {
        match metric {
            HurdleMetric::EquityMultiple => Some(self.lp_equity_multiple()),
            HurdleMetric::Irr => self.lp_irr_to_date(),
        }
    }
}

/// Cash entering one period.
#[derive(Debug, Clone, Copy)]
pub struct PeriodCash {
    pub period: u32,
    /// Project cash flow, terminal proceeds included
    pub cash_flow: Money,
    pub capital_call: Money,
}

/// Split `roc` between the parties' unreturned balances.
fn return_of_capital(mode: RocMode, cash: Money, lp_unreturned: Money, gp_unreturned: Money) -> (Money, Money) {
    match mode {
        RocMode::LpFirst => {
            let lp = cash.min(lp_unreturned);
            let gp = (cash - lp).min(gp_unreturned);
            (lp, gp)
        }
        RocMode::ProRata => {
            let outstanding = lp_unreturned + gp_unreturned;
            if outstanding.is_zero() {
                return (Decimal::ZERO, Decimal::ZERO);
            }
            if cash >= outstanding {
                return (lp_unreturned, gp_unreturned);
            }
            let lp = (cash * lp_unreturned / outstanding).min(lp_unreturned);
            let gp = (cash - lp).min(gp_unreturned);
            (lp, gp)
        }
    }
}

/// GP cash that brings its share of cumulative profit up to `target`.
fn catch_up_amount(target: Rate, lp_profit: Money, gp_profit: Money, available: Money) -> Money {
    if available <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    if target >= Decimal::ONE {
        return available;
    }
    let needed = (target * lp_profit - (Decimal::ONE - target) * gp_profit) / (Decimal::ONE - target);
    needed.max(Decimal::ZERO).min(available)
}

/// Advance the waterfall by one period.
///
/// The active tier is fixed from the carry at period start; all promote cash
/// of the period is split at that tier, even past the next hurdle.
pub fn step(
    structure: &WaterfallStructure,
    lp_share: Rate,
    carry: &WaterfallCarry,
    cash: PeriodCash,
) -> (WaterfallCarry, WaterfallAllocation) {
    let variant = structure.variant;
    let metric = variant.hurdle_metric();
    let measure = carry.hurdle_measure(metric);
    let active = select_active_tier(structure, measure);
    let rationale = describe_active_tier(&active, metric, measure);

    let mut next = carry.clone();
    let lp_unreturned_start = carry.lp_unreturned;

    // Capital calls
    let lp_capital_call = cash.capital_call * lp_share;
    let gp_capital_call = cash.capital_call - lp_capital_call;
    next.lp_contributed += lp_capital_call;
    next.gp_contributed += gp_capital_call;
    next.lp_unreturned += lp_capital_call;
    next.gp_unreturned += gp_capital_call;

    let cash_available = cash.cash_flow.max(Decimal::ZERO);
    let shortfall = (-cash.cash_flow).max(Decimal::ZERO);
    let mut remaining = cash_available;

    // Return of capital
    let (lp_roc, gp_roc) = return_of_capital(
        structure.roc_mode,
        remaining,
        next.lp_unreturned,
        next.gp_unreturned,
    );
    remaining -= lp_roc + gp_roc;
    next.lp_unreturned -= lp_roc;
    next.gp_unreturned -= gp_roc;

    // Preferred return
    let lp_pref_accrual = if variant.accrues_pref() {
        lp_unreturned_start * structure.pref_rate / Decimal::from(12)
    } else {
        Decimal::ZERO
    };
    next.lp_pref_balance += lp_pref_accrual;
    let lp_pref_paid = remaining.min(next.lp_pref_balance);
    next.lp_pref_balance -= lp_pref_paid;
    remaining -= lp_pref_paid;
    next.lp_profit += lp_pref_paid;

    // GP catch-up
    let gp_catch_up = match structure.catch_up_pct {
        Some(target) if variant.has_catch_up() => {
            catch_up_amount(target, next.lp_profit, next.gp_profit, remaining)
        }
        _ => Decimal::ZERO,
    };
    remaining -= gp_catch_up;
    next.gp_profit += gp_catch_up;

    // Promote
    let lp_tier_distribution = remaining * active.split.lp;
    let gp_tier_distribution = remaining - lp_tier_distribution;
    next.lp_profit += lp_tier_distribution;
    next.gp_profit += gp_tier_distribution;

    let tier_distributions = std::iter::once((None, BASE_SPLIT_NAME))
        .chain(
            structure
                .tiers
                .iter()
                .enumerate()
                .map(|(i, t)| (Some(i), t.name.as_str())),
        )
        .map(|(index, name)| {
            let (lp, gp) = if index == active.index {
                (lp_tier_distribution, gp_tier_distribution)
            } else {
                (Decimal::ZERO, Decimal::ZERO)
            };
            TierDistribution {
                name: name.to_string(),
                lp,
                gp,
            }
        })
        .collect();

    let lp_total = lp_roc + lp_pref_paid + lp_tier_distribution;
    let gp_total = gp_roc + gp_catch_up + gp_tier_distribution;
    next.lp_distributed += lp_total;
    next.gp_distributed += gp_total;
    next.lp_flows.push(lp_total - lp_capital_call);
    next.gp_flows.push(gp_total - gp_capital_call);

    let allocation = WaterfallAllocation {
        period: cash.period,
        cash_available,
        shortfall,
        lp_capital_call,
        gp_capital_call,
        lp_roc,
        gp_roc,
        lp_unreturned_start,
        lp_pref_accrual,
        lp_pref_paid,
        gp_catch_up,
        tier_distributions,
        active_tier: active.name,
        lp_tier_distribution,
        gp_tier_distribution,
        lp_total,
        gp_total,
        cumulative_lp_distributions: next.lp_distributed,
        cumulative_gp_distributions: next.gp_distributed,
        lp_unreturned_capital: next.lp_unreturned,
        gp_unreturned_capital: next.gp_unreturned,
        lp_pref_balance: next.lp_pref_balance,
        lp_equity_multiple: next.lp_equity_multiple(),
        rationale,
    };

    tracing::trace!(
        period = cash.period,
        %cash_available,
        %lp_total,
        %gp_total,
        tier = %allocation.active_tier,
        "waterfall period"
    );

    (next, allocation)
}

// ---------------------------------------------------------------------------
// Full run
// ---------------------------------------------------------------------------

/// Cash entering each period: monthly cash flow, sale proceeds in the last
/// period, and capital calls summed by month.
pub fn period_cash(input: &WaterfallInput) -> Vec<PeriodCash> {
    let last = input.period_cash_flows.len();
    input
        .period_cash_flows
        .iter()
        .enumerate()
        .map(|(i, cf)| {
            let period = i as u32 + 1;
            let terminal = if i + 1 == last {
                input.terminal_proceeds
            } else {
                Decimal::ZERO
            };
            let capital_call = input
                .capital_calls
                .iter()
                .filter(|c| c.month == period)
                .map(|c| c.amount)
                .sum();
            PeriodCash {
                period,
                cash_flow: *cf + terminal,
                capital_call,
            }
        })
        .collect()
}

/// Run the LP/GP distribution waterfall period by period.
pub fn run_waterfall(input: &WaterfallInput) -> DealSimResult<ComputationOutput<WaterfallResult>> {
    validate_structure(&input.structure)?;
    if input.lp_equity_share <= Decimal::ZERO || input.lp_equity_share > Decimal::ONE {
        return Err(DealSimError::InvalidInput {
            field: "lp_equity_share".into(),
            reason: "LP equity share must be in (0, 1]".into(),
        });
    }
    if input.initial_equity < Decimal::ZERO {
        return Err(DealSimError::InvalidInput {
            field: "initial_equity".into(),
            reason: "Initial equity cannot be negative".into(),
        });
    }
    if input.period_cash_flows.is_empty() {
        return Err(DealSimError::InsufficientData(
            "Waterfall needs at least one period".into(),
        ));
    }

    let structure = &input.structure;
    let share = input.lp_equity_share;
    let opening = WaterfallCarry::opening(input.initial_equity, share);

    let (carry, allocations) = period_cash(input).into_iter().fold(
        (opening, Vec::with_capacity(input.period_cash_flows.len())),
        |(carry, mut allocations), cash| {
            let (next, allocation) = step(structure, share, &carry, cash);
            allocations.push(allocation);
            (next, allocations)
        },
    );

    let mut warnings: Vec<String> = Vec::new();
    let shortfalls = allocations.iter().filter(|a| a.shortfall > Decimal::ZERO).count();
    if shortfalls > 0 {
        warnings.push(format!(
            "{shortfalls} period(s) ran a cash shortfall; nothing was distributed in those periods"
        ));
    }
    if carry.lp_unreturned > Decimal::ZERO {
        warnings.push(format!(
            "LP capital not fully returned: {} outstanding",
            carry.lp_unreturned.round_dp(2)
        ));
    }
    if carry.lp_pref_balance > Decimal::ZERO {
        warnings.push(format!(
            "LP preferred return unpaid at exit: {}",
            carry.lp_pref_balance.round_dp(2)
        ));
    }

    let lp_irr = irr_outcome(&carry.lp_flows);
    let gp_irr = irr_outcome(&carry.gp_flows);
    let annualized = |outcome: MetricOutcome| match outcome {
        MetricOutcome::Defined(r) => MetricOutcome::Defined(annualize_monthly_rate(r)),
        undefined => undefined,
    };

    let total_profit = carry.lp_profit + carry.gp_profit;
    let gp_share = Decimal::ONE - share;

    let result = WaterfallResult {
        lp_contributed: carry.lp_contributed,
        gp_contributed: carry.gp_contributed,
        lp_distributions: carry.lp_distributed,
        gp_distributions: carry.gp_distributed,
        lp_equity_multiple: MetricOutcome::ratio(
            carry.lp_distributed,
            carry.lp_contributed,
            UndefinedReason::ZeroEquity,
        ),
        gp_equity_multiple: MetricOutcome::ratio(
            carry.gp_distributed,
            carry.gp_contributed,
            UndefinedReason::ZeroEquity,
        ),
        lp_irr: annualized(lp_irr),
        gp_irr: annualized(gp_irr),
        gp_promote: carry.gp_profit - gp_share * total_profit,
        lp_unreturned_capital: carry.lp_unreturned,
        lp_pref_balance: carry.lp_pref_balance,
        allocations,
    };

    tracing::debug!(
        periods = result.allocations.len(),
        lp = %result.lp_distributions,
        gp = %result.gp_distributions,
        "waterfall complete"
    );

    Ok(with_metadata(
        "LP/GP distribution waterfall (ROC, pref, catch-up, promote tiers)",
        &serde_json::json!({
            "variant": structure.variant,
            "roc_mode": structure.roc_mode,
            "pref_rate": structure.pref_rate.to_string(),
            "lp_equity_share": share.to_string(),
            "tiers": structure.tiers.len(),
            "periods": input.period_cash_flows.len(),
        }),
        warnings,
        result,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
