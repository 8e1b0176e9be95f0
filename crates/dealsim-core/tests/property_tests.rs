//! Property-based tests for engine invariants.
//!
//! - Waterfall conservation: cash available == LP total + GP total
//! - LP unreturned capital only rises on capital calls
//! - Fully-amortizing loans close to zero over their term
//! - IRR recovers the rate a series was built from

use dealsim_core::deal::inputs::{
    CapitalCall, FinancingType, PromoteTier, RocMode, TierSplit, WaterfallStructure,
    WaterfallVariant,
};
use dealsim_core::financing::amortization::{build_schedule, LoanTerms};
use dealsim_core::time_value::irr;
use dealsim_core::waterfall::engine::{run_waterfall, WaterfallInput};
use proptest::prelude::*;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;

// =============================================================================
// GENERATORS
// =============================================================================

const VARIANTS: [WaterfallVariant; 4] = [
    WaterfallVariant::EmHurdles,
    WaterfallVariant::PrefRocPromote,
    WaterfallVariant::PrefRocCatchupPromote,
    WaterfallVariant::IrrHurdles,
];

fn bp(v: i64) -> Decimal {
    Decimal::new(v, 4)
}

fn split(lp_pct: u32) -> TierSplit {
    let lp = Decimal::new(lp_pct as i64, 2);
    TierSplit {
        lp,
        gp: Decimal::ONE - lp,
    }
}

fn structure(variant_idx: usize, lp_first: bool, pref_bp: i64, base_lp_pct: u32) -> WaterfallStructure {
    let variant = VARIANTS[variant_idx];
    let (first, second) = match variant {
        WaterfallVariant::IrrHurdles => (dec!(0.10), dec!(0.18)),
        _ => (dec!(1.3), dec!(1.8)),
    };
    WaterfallStructure {
        variant,
        pref_rate: bp(pref_bp),
        roc_mode: if lp_first { RocMode::LpFirst } else { RocMode::ProRata },
        catch_up_pct: Some(dec!(0.25)),
        base_split: split(base_lp_pct),
        tiers: vec![
            PromoteTier {
                name: "Tier 1".into(),
                hurdle: first,
                split: split(base_lp_pct - 10),
            },
            PromoteTier {
                name: "Tier 2".into(),
                hurdle: second,
                split: split(base_lp_pct - 20),
            },
        ],
    }
}

fn waterfall_input(
    structure: WaterfallStructure,
    lp_share_pct: u32,
    flows: Vec<i64>,
    terminal: i64,
    calls: Vec<(u32, i64)>,
) -> WaterfallInput {
    let periods = flows.len() as u32;
    WaterfallInput {
        structure,
        lp_equity_share: Decimal::new(lp_share_pct as i64, 2),
        initial_equity: dec!(500000),
        capital_calls: calls
            .into_iter()
            .map(|(month, amount)| CapitalCall {
                month: month % periods + 1,
                amount: Decimal::from(amount),
            })
            .collect(),
        period_cash_flows: flows.into_iter().map(|f| Decimal::new(f, 2)).collect(),
        terminal_proceeds: Decimal::from(terminal),
    }
}

// =============================================================================
// WATERFALL
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_waterfall_conserves_cash(
        variant_idx in 0usize..4,
        lp_first in any::<bool>(),
        pref_bp in 0i64..1200,
        base_lp_pct in 60u32..95,
        lp_share_pct in 50u32..100,
        flows in prop::collection::vec(-2_000_000i64..6_000_000, 1..48),
        terminal in 0i64..1_500_000,
        calls in prop::collection::vec((0u32..48, 1i64..50_000), 0..3),
    ) {
        let input = waterfall_input(
            structure(variant_idx, lp_first, pref_bp, base_lp_pct),
            lp_share_pct,
            flows,
            terminal,
            calls,
        );
        let out = run_waterfall(&input).unwrap();
        for a in &out.result.allocations {
            prop_assert!((a.cash_available - a.lp_total - a.gp_total).abs() < dec!(0.01));
            prop_assert!(a.lp_total >= Decimal::ZERO);
            prop_assert!(a.gp_total >= Decimal::ZERO);
            prop_assert!(a.lp_unreturned_capital >= Decimal::ZERO);
            prop_assert!(a.lp_pref_balance >= Decimal::ZERO);
        }
    }

    #[test]
    fn prop_lp_capital_non_increasing_without_calls(
        variant_idx in 0usize..4,
        lp_first in any::<bool>(),
        pref_bp in 0i64..1200,
        base_lp_pct in 60u32..95,
        lp_share_pct in 50u32..100,
        flows in prop::collection::vec(-2_000_000i64..6_000_000, 2..48),
        terminal in 0i64..1_500_000,
    ) {
        let input = waterfall_input(
            structure(variant_idx, lp_first, pref_bp, base_lp_pct),
            lp_share_pct,
            flows,
            terminal,
            Vec::new(),
        );
        let out = run_waterfall(&input).unwrap();
        let a = &out.result.allocations;
        prop_assert!(a[0].lp_unreturned_capital <= a[0].lp_unreturned_start);
        for w in a.windows(2) {
            prop_assert!(w[1].lp_unreturned_capital <= w[0].lp_unreturned_capital);
        }
    }

    #[test]
    fn prop_capital_calls_are_the_only_increase(
        lp_share_pct in 50u32..100,
        flows in prop::collection::vec(0i64..4_000_000, 2..36),
        calls in prop::collection::vec((0u32..36, 1i64..50_000), 1..4),
    ) {
        let input = waterfall_input(structure(1, false, 800, 80), lp_share_pct, flows, 0, calls);
        let out = run_waterfall(&input).unwrap();
        for a in &out.result.allocations {
            prop_assert!(a.lp_unreturned_capital <= a.lp_unreturned_start + a.lp_capital_call);
        }
    }
}

// =============================================================================
// AMORTIZATION AND IRR
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_fully_amortizing_closes(
        principal in 10_000i64..2_000_000,
        rate_bp in 0i64..1500,
        years in 1u32..41,
    ) {
        let terms = LoanTerms {
            financing_type: FinancingType::FullyAmortizing,
            principal: Decimal::from(principal),
            annual_rate: bp(rate_bp),
            amortization_months: years * 12,
            interest_only_months: 0,
            term_months: years * 12,
            collateral_value: None,
        };
        let sched = build_schedule(&terms, None).unwrap();
        prop_assert_eq!(sched.periods.len() as u32, years * 12);
        let last = sched.periods.last().unwrap();
        prop_assert!(last.ending_balance.abs() < dec!(0.01));
        prop_assert!((sched.total_principal - Decimal::from(principal)).abs() < dec!(0.01));
    }

    #[test]
    fn prop_irr_round_trip(
        rate_bp in -3000i64..6000,
        periods in 1usize..31,
    ) {
        let rate = bp(rate_bp);
        let outlay = dec!(100000);
        let mut flows = vec![Decimal::ZERO; periods + 1];
        flows[0] = -outlay;
        flows[periods] = outlay * (Decimal::ONE + rate).powi(periods as i64);
        let solved = irr(&flows).unwrap();
        prop_assert!((solved - rate).abs() < dec!(0.000001), "rate {} solved {}", rate, solved);
    }
}
