#![allow(dead_code)]

use dealsim_core::deal::inputs::InvestmentInputs;
use serde_json::json;

/// $250k single-family rental: 25% down, 7% / 30-year, $2,000 rent, 8% vacancy.
pub fn base_rental_json() -> serde_json::Value {
    json!({
        "deal_type": "rental",
        "acquisition": {
            "purchase_price": "250000",
            "closing_costs": "5000",
            "hold_period_months": 60
        },
        "financing": {
            "financing_type": "fully_amortizing",
            "annual_rate": "0.07",
            "amortization_years": 30,
            "ltv": "0.75"
        },
        "income": {
            "unit_count": 1,
            "monthly_rent_per_unit": "2000",
            "vacancy_rate": "0.08"
        },
        "expenses": {
            "property_tax_annual": "3000",
            "insurance_annual": "1500",
            "maintenance_pct_of_egi": "0.05",
            "management_fee_pct_of_egi": "0.08"
        },
        "exit": {
            "exit_cap_rate": "0.06",
            "sale_cost_pct": "0.06"
        }
    })
}

pub fn base_rental() -> InvestmentInputs {
    serde_json::from_value(base_rental_json()).expect("base rental fixture")
}

/// 24-unit value-add syndication with 3% rent growth and an EM-hurdle waterfall.
pub fn syndication(variant: &str) -> InvestmentInputs {
    let mut value = json!({
        "deal_type": "syndication",
        "acquisition": {
            "purchase_price": "3000000",
            "closing_costs": "60000",
            "hold_period_months": 84
        },
        "financing": {
            "financing_type": "interest_only_then_amortizing",
            "annual_rate": "0.06",
            "amortization_years": 30,
            "interest_only_months": 24,
            "ltv": "0.65"
        },
        "income": {
            "unit_count": 24,
            "monthly_rent_per_unit": "1600",
            "annual_rent_growth": "0.03",
            "other_income_monthly": "1200",
            "other_income_growth": "0.02",
            "vacancy_rate": "0.06",
            "other_income_vacancy_rate": "0.10"
        },
        "expenses": {
            "property_tax_annual": "36000",
            "insurance_annual": "14000",
            "other_fixed_annual": "18000",
            "annual_expense_growth": "0.025",
            "maintenance_pct_of_egi": "0.05",
            "management_fee_pct_of_egi": "0.06",
            "reserves_per_unit_annual": "300"
        },
        "exit": {
            "exit_cap_rate": "0.055",
            "sale_cost_pct": "0.03"
        },
        "syndication": {
            "lp_equity_share": "0.90",
            "waterfall": {
                "variant": variant,
                "pref_rate": "0.08",
                "roc_mode": "pro_rata",
                "base_split": { "lp": "0.80", "gp": "0.20" },
                "tiers": [
                    { "name": "Above 1.5x", "hurdle": "1.5", "split": { "lp": "0.70", "gp": "0.30" } },
                    { "name": "Above 2.0x", "hurdle": "2.0", "split": { "lp": "0.60", "gp": "0.40" } }
                ]
            }
        }
    });
    match variant {
        "em_hurdles" => value["syndication"]["waterfall"]["pref_rate"] = json!("0"),
        "pref_roc_catchup_promote" => {
            value["syndication"]["waterfall"]["catch_up_pct"] = json!("0.20")
        }
        "irr_hurdles" => {
            value["syndication"]["waterfall"]["tiers"] = json!([
                { "name": "Above 12% IRR", "hurdle": "0.12", "split": { "lp": "0.70", "gp": "0.30" } },
                { "name": "Above 18% IRR", "hurdle": "0.18", "split": { "lp": "0.60", "gp": "0.40" } }
            ])
        }
        _ => {}
    }
    serde_json::from_value(value).expect("syndication fixture")
}
