mod common;

use dealsim_core::analysis::run_deal_analysis;
use dealsim_core::deal::inputs::{DealType, InvestmentInputs};
use dealsim_core::deal::validation::validate_inputs;
use dealsim_core::settings::EngineSettings;
use dealsim_core::storage::{InMemoryScenarioStore, ScenarioStore};
use dealsim_core::DealSimError;
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

use common::{base_rental, base_rental_json, syndication};

#[test]
fn test_syndication_analysis_includes_waterfall() {
    let out = run_deal_analysis(&syndication("pref_roc_catchup_promote"), &EngineSettings::default()).unwrap();
    let wf = out.result.waterfall.as_ref().unwrap();
    assert_eq!(wf.allocations.len(), 84);
    assert!(out.result.sensitivity.is_some());
}

#[test]
fn test_identical_inputs_give_identical_bytes() {
    let settings = EngineSettings::default();
    let inputs = syndication("irr_hurdles");
    let first = serde_json::to_vec(&run_deal_analysis(&inputs, &settings).unwrap()).unwrap();
    let second = serde_json::to_vec(&run_deal_analysis(&inputs.clone(), &settings).unwrap()).unwrap();
    assert!(first == second);
}

#[test]
fn test_low_dscr_is_a_warning_not_an_error() {
    let out = run_deal_analysis(&base_rental(), &EngineSettings::default()).unwrap();
    assert!(out.warnings.iter().any(|w| w.starts_with("Year-1 DSCR")));
    assert!(out.result.metrics.irr.is_defined());
}

#[test]
fn test_blocking_errors_surface_verbatim() {
    let mut inputs = base_rental();
    inputs.financing.annual_rate = dec!(-0.02);
    inputs.income.unit_count = 0;
    let report = validate_inputs(&inputs, &EngineSettings::default().thresholds);
    let err = run_deal_analysis(&inputs, &EngineSettings::default()).unwrap_err();
    match err {
        DealSimError::ValidationFailed { errors } => assert_eq!(errors, report.errors),
        other => panic!("expected ValidationFailed, got {other:?}"),
    }
}

#[test]
fn test_extreme_rate_and_growth_are_rejected_up_front() {
    let mut steep_rate = base_rental();
    steep_rate.financing.annual_rate = dec!(6);
    let mut runaway_growth = base_rental();
    runaway_growth.acquisition.hold_period_months = 480;
    runaway_growth.income.annual_rent_growth = dec!(10);

    for inputs in [steep_rate, runaway_growth] {
        assert!(matches!(
            run_deal_analysis(&inputs, &EngineSettings::default()),
            Err(DealSimError::ValidationFailed { .. })
        ));
    }
}

#[test]
fn test_syndication_without_structure_is_rejected() {
    let mut inputs = base_rental();
    inputs.deal_type = DealType::Syndication;
    assert!(matches!(
        run_deal_analysis(&inputs, &EngineSettings::default()),
        Err(DealSimError::ValidationFailed { .. })
    ));
}

#[test]
fn test_inputs_round_trip_through_store() {
    let mut store = InMemoryScenarioStore::new();
    store.save("base", &base_rental()).unwrap();
    let loaded = store.load("base").unwrap();
    assert_eq!(
        serde_json::to_value(&loaded).unwrap(),
        serde_json::to_value(base_rental()).unwrap()
    );
    let settings = EngineSettings::default();
    let a = serde_json::to_string(&run_deal_analysis(&loaded, &settings).unwrap()).unwrap();
    let b = serde_json::to_string(&run_deal_analysis(&base_rental(), &settings).unwrap()).unwrap();
    assert!(a == b);
}

#[test]
fn test_missing_optional_fields_take_defaults() {
    let inputs: InvestmentInputs = serde_json::from_value(base_rental_json()).unwrap();
    assert!(inputs.scheduled_outflows.is_empty());
    assert_eq!(inputs.sale_month(), 60);
    assert_eq!(inputs.financing.points_pct, rust_decimal::Decimal::ZERO);
}

#[test]
fn test_settings_deserialize_partially() {
    let settings: EngineSettings =
        serde_json::from_str(r#"{ "thresholds": { "min_dscr": "0.90" } }"#).unwrap();
    assert_eq!(settings.thresholds.min_dscr, dec!(0.90));
    assert_eq!(settings.thresholds.max_ltv, dec!(0.80));
    let out = run_deal_analysis(&base_rental(), &settings).unwrap();
    assert!(!out.warnings.iter().any(|w| w.starts_with("Year-1 DSCR")));
}
