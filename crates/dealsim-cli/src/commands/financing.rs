use clap::Args;
use rust_decimal::{Decimal, MathematicalOps};
use serde::Deserialize;
use serde_json::{json, Value};

use dealsim_core::deal::inputs::FinancingType;
use dealsim_core::financing::amortization::{amortize_loan, LoanTerms};
use dealsim_core::returns::metrics::irr_outcome;
use dealsim_core::types::{with_metadata, MetricOutcome};

use crate::input;

/// Arguments for a loan amortization schedule
#[derive(Args)]
pub struct AmortizeArgs {
    /// Path to JSON/YAML loan terms (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Loan type: fully_amortizing, interest_only_then_amortizing, bridge_interest_only, none
    #[arg(long, default_value = "fully_amortizing")]
    pub financing_type: String,

    /// Loan principal
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Annual interest rate (e.g. 0.07)
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Amortization period in months
    #[arg(long, default_value_t = 360)]
    pub amortization_months: u32,

    /// Interest-only months before amortization starts
    #[arg(long, default_value_t = 0)]
    pub interest_only_months: u32,

    /// Loan term in months (defaults to the amortization period)
    #[arg(long)]
    pub term_months: Option<u32>,

    /// Omit the per-month rows
    #[arg(long)]
    pub summary: bool,
}

fn parse_financing_type(s: &str) -> Result<FinancingType, Box<dyn std::error::Error>> {
    serde_json::from_value(Value::String(s.to_string()))
        .map_err(|_| format!("Unknown financing type '{}'", s).into())
}

pub fn run_amortize(args: AmortizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let terms: LoanTerms = if let Some(ref path) = args.input {
        input::file::read_document(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let principal = args
            .principal
            .ok_or("--principal is required (or provide --input)")?;
        let annual_rate = args.rate.ok_or("--rate is required (or provide --input)")?;

        LoanTerms {
            financing_type: parse_financing_type(&args.financing_type)?,
            principal,
            annual_rate,
            amortization_months: args.amortization_months,
            interest_only_months: args.interest_only_months,
            term_months: args.term_months.unwrap_or(args.amortization_months),
            collateral_value: None,
        }
    };

    let output = amortize_loan(&terms)?;
    let mut value = serde_json::to_value(&output)?;
    if args.summary {
        if let Some(result) = value.get_mut("result").and_then(Value::as_object_mut) {
            result.remove("periods");
        }
    }
    Ok(value)
}

/// Arguments for a standalone IRR
#[derive(Args)]
pub struct IrrArgs {
    /// Path to JSON/YAML with `cash_flows` and optional `periods_per_year`
    #[arg(long)]
    pub input: Option<String>,

    /// Periodic cash flows (comma-separated, e.g. "-100,30,30,130")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub cash_flows: Option<Vec<Decimal>>,

    /// Periods per year used to annualize (12 for monthly flows)
    #[arg(long)]
    pub periods_per_year: Option<u32>,
}

#[derive(Deserialize)]
struct IrrInput {
    cash_flows: Vec<Decimal>,
    #[serde(default)]
    periods_per_year: Option<u32>,
}

fn annualize(periodic: MetricOutcome, periods_per_year: u32) -> MetricOutcome {
    match periodic {
        MetricOutcome::Defined(r) if periods_per_year > 1 => {
            MetricOutcome::Defined((Decimal::ONE + r).powi(i64::from(periods_per_year)) - Decimal::ONE)
        }
        other => other,
    }
}

pub fn run_irr(args: IrrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let irr_input: IrrInput = if let Some(ref path) = args.input {
        input::file::read_document(path)?
    } else if let Some(flows) = args.cash_flows {
        IrrInput {
            cash_flows: flows,
            periods_per_year: None,
        }
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--cash-flows or --input <file> required".into());
    };

    let periods_per_year = args
        .periods_per_year
        .or(irr_input.periods_per_year)
        .unwrap_or(1);
    if periods_per_year == 0 {
        return Err("--periods-per-year must be at least 1".into());
    }

    let periodic = irr_outcome(&irr_input.cash_flows);
    let mut warnings = Vec::new();
    if let MetricOutcome::Undefined(reason) = periodic {
        warnings.push(format!("IRR is undefined: {reason}"));
    }

    let output = with_metadata(
        "Internal rate of return (bracketed Newton-Raphson with bisection fallback)",
        &json!({
            "periods": irr_input.cash_flows.len(),
            "periods_per_year": periods_per_year,
        }),
        warnings,
        json!({
            "irr": annualize(periodic, periods_per_year),
            "periodic_irr": periodic,
        }),
    );
    Ok(serde_json::to_value(output)?)
}
