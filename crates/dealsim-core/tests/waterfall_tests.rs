mod common;

use dealsim_core::analysis::simulate;
use dealsim_core::deal::inputs::{
    PromoteTier, RocMode, TierSplit, WaterfallStructure, WaterfallVariant,
};
use dealsim_core::waterfall::audit::{audit_rows, AUDIT_COLUMNS};
use dealsim_core::waterfall::engine::{run_waterfall, WaterfallInput};
use dealsim_core::waterfall::structure::BASE_SPLIT_NAME;
use dealsim_core::DealSimError;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use common::syndication;

fn em_structure() -> WaterfallStructure {
    WaterfallStructure {
        variant: WaterfallVariant::EmHurdles,
        pref_rate: Decimal::ZERO,
        roc_mode: RocMode::ProRata,
        catch_up_pct: None,
        base_split: TierSplit {
            lp: dec!(0.80),
            gp: dec!(0.20),
        },
        tiers: vec![PromoteTier {
            name: "Above 1.5x".into(),
            hurdle: dec!(1.5),
            split: TierSplit {
                lp: dec!(0.70),
                gp: dec!(0.30),
            },
        }],
    }
}

fn deal_waterfall(variant: &str) -> WaterfallInput {
    let inputs = syndication(variant);
    let sim = simulate(&inputs).unwrap();
    WaterfallInput::from_projection(inputs.syndication.as_ref().unwrap(), &sim.pro_forma, &sim.exit)
}

// ===========================================================================
// Tier activation
// ===========================================================================

#[test]
fn test_tier_activates_in_period_after_hurdle_crossed() {
    // LP contributes 90,000; period 2 pushes the LP multiple past 1.5x
    let input = WaterfallInput {
        structure: em_structure(),
        lp_equity_share: dec!(0.90),
        initial_equity: dec!(100000),
        capital_calls: Vec::new(),
        period_cash_flows: vec![dec!(100000), dec!(80000), dec!(10000), dec!(10000)],
        terminal_proceeds: Decimal::ZERO,
    };
    let out = run_waterfall(&input).unwrap();
    let a = &out.result.allocations;

    // Period 2 (K): base split applies to all promote cash, no clipping
    assert_eq!(a[1].active_tier, BASE_SPLIT_NAME);
    assert_eq!(a[1].lp_tier_distribution, dec!(64000));
    assert_eq!(a[1].gp_tier_distribution, dec!(16000));
    assert!(a[1].lp_equity_multiple > dec!(1.5));

    // Period 3 (K+1): 70/30
    assert_eq!(a[2].active_tier, "Above 1.5x");
    assert_eq!(a[2].lp_tier_distribution, dec!(7000));
    assert_eq!(a[2].gp_tier_distribution, dec!(3000));
    assert!(a[2].rationale.starts_with("Above 1.5x active"));
    assert!(a[2].rationale.contains("LP/GP 70/30"));
    assert!(a[1].rationale.starts_with(BASE_SPLIT_NAME));
}

// ===========================================================================
// Invariants on a projected syndication
// ===========================================================================

#[test]
fn test_conservation_every_variant() {
    for variant in [
        "em_hurdles",
        "pref_roc_promote",
        "pref_roc_catchup_promote",
        "irr_hurdles",
    ] {
        let out = run_waterfall(&deal_waterfall(variant)).unwrap();
        for a in &out.result.allocations {
            assert!(
                (a.cash_available - a.lp_total - a.gp_total).abs() < dec!(0.01),
                "{variant} period {} leaks cash",
                a.period
            );
        }
    }
}

#[test]
fn test_pref_accrual_follows_start_balance() {
    let out = run_waterfall(&deal_waterfall("pref_roc_promote")).unwrap();
    for a in &out.result.allocations {
        assert_eq!(a.lp_pref_accrual, a.lp_unreturned_start * dec!(0.08) / dec!(12));
    }
}

#[test]
fn test_unreturned_capital_never_increases_without_calls() {
    let out = run_waterfall(&deal_waterfall("pref_roc_catchup_promote")).unwrap();
    let a = &out.result.allocations;
    for w in a.windows(2) {
        assert!(w[1].lp_unreturned_capital <= w[0].lp_unreturned_capital);
    }
    assert!(a.iter().all(|p| p.lp_unreturned_capital >= Decimal::ZERO));
}

#[test]
fn test_sale_returns_capital_and_clears_pref() {
    let out = run_waterfall(&deal_waterfall("pref_roc_promote")).unwrap();
    let r = &out.result;
    assert_eq!(r.lp_unreturned_capital, Decimal::ZERO);
    assert_eq!(r.lp_pref_balance, Decimal::ZERO);
    let last = r.allocations.last().unwrap();
    assert!(last.cash_available > dec!(1000000));
    assert!(r.lp_irr.is_defined());
    assert!(r.gp_irr.is_defined());
    assert!(r.gp_promote > Decimal::ZERO);
}

#[test]
fn test_catch_up_variant_pays_gp_more() {
    let plain = run_waterfall(&deal_waterfall("pref_roc_promote")).unwrap();
    let catch_up = run_waterfall(&deal_waterfall("pref_roc_catchup_promote")).unwrap();
    let paid: Decimal = catch_up.result.allocations.iter().map(|a| a.gp_catch_up).sum();
    assert!(paid > Decimal::ZERO);
    assert!(catch_up.result.gp_distributions > plain.result.gp_distributions);
}

#[test]
fn test_em_hurdles_has_no_pref() {
    let out = run_waterfall(&deal_waterfall("em_hurdles")).unwrap();
    assert!(out
        .result
        .allocations
        .iter()
        .all(|a| a.lp_pref_accrual.is_zero() && a.lp_pref_paid.is_zero() && a.gp_catch_up.is_zero()));
}

// ===========================================================================
// Structure errors and audit export
// ===========================================================================

#[test]
fn test_split_not_summing_to_one_is_rejected() {
    let mut input = deal_waterfall("em_hurdles");
    input.structure.tiers[0].split.gp = dec!(0.35);
    match run_waterfall(&input) {
        Err(DealSimError::InvalidWaterfallStructure(msg)) => assert!(msg.contains("sum to 1.0")),
        other => panic!("expected InvalidWaterfallStructure, got {other:?}"),
    }
}

#[test]
fn test_audit_rows_are_two_decimal() {
    let out = run_waterfall(&deal_waterfall("pref_roc_promote")).unwrap();
    let rows = audit_rows(&out.result.allocations);
    assert_eq!(rows.len(), 84);
    assert_eq!(AUDIT_COLUMNS.len(), rows[0].values().len());
    for row in &rows {
        for value in &row.values()[1..13] {
            let decimals = value.split('.').nth(1).map(str::len);
            assert_eq!(decimals, Some(2), "{value}");
        }
    }
    assert_eq!(rows[0].period, "1");
    assert_eq!(rows[0].active_tier, out.result.allocations[0].rationale);
}
