use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Multiple, Rate};

// ---------------------------------------------------------------------------
// Top-level deal description
// ---------------------------------------------------------------------------

/// Acquisition strategy being modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealType {
    /// Buy-and-hold rental
    Rental,
    /// Buy, rehab, rent, refinance, repeat
    Brrrr,
    /// LP/GP syndication with a distribution waterfall
    Syndication,
}

/// Everything the engine needs for one simulation run.
///
/// Treated as immutable once a run starts; sensitivity scenarios clone it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentInputs {
    pub deal_type: DealType,
    pub acquisition: AcquisitionInputs,
    pub financing: FinancingInputs,
    pub income: IncomeInputs,
    pub expenses: ExpenseInputs,
    pub exit: ExitInputs,
    /// Refinance event (BRRRR only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refinance: Option<RefinanceInputs>,
    /// One-off outflows booked in a specific month
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scheduled_outflows: Vec<ScheduledOutflow>,
    /// Equity split and waterfall (syndication only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syndication: Option<SyndicationInputs>,
}

impl InvestmentInputs {
    /// Month in which the property is sold (defaults to the hold period).
    pub fn sale_month(&self) -> u32 {
        self.exit
            .sale_month
            .unwrap_or(self.acquisition.hold_period_months)
    }
}

// ---------------------------------------------------------------------------
// Acquisition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionInputs {
    pub purchase_price: Money,
    pub closing_costs: Money,
    /// Hold period in months
    pub hold_period_months: u32,
    /// Total renovation budget, drawn as a period outflow
    #[serde(default)]
    pub renovation_budget: Money,
    /// Months over which the budget is drawn in equal instalments
    #[serde(default)]
    pub renovation_months: u32,
    /// First day of month 1; labels each period with its calendar month
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Financing
// ---------------------------------------------------------------------------

/// Debt structure used for acquisition (and refinance) loans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinancingType {
    /// All-cash purchase
    None,
    FullyAmortizing,
    InterestOnlyThenAmortizing,
    /// Interest-only with a balloon at term end (or sale)
    BridgeInterestOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancingInputs {
    pub financing_type: FinancingType,
    /// Annual interest rate
    #[serde(default)]
    pub annual_rate: Rate,
    /// Amortization period in years
    #[serde(default)]
    pub amortization_years: u32,
    /// Interest-only months at the start of the loan
    #[serde(default)]
    pub interest_only_months: u32,
    /// Total loan term in months; defaults to the amortization term
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_term_months: Option<u32>,
    /// Loan-to-value against purchase price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ltv: Option<Rate>,
    /// Explicit loan amount (overrides `ltv`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_amount: Option<Money>,
    /// Lender points as a fraction of the loan, paid from equity at close
    #[serde(default)]
    pub points_pct: Rate,
}

impl FinancingInputs {
    /// Loan principal at acquisition.
    pub fn loan_principal(&self, purchase_price: Money) -> Money {
        if self.financing_type == FinancingType::None {
            return Decimal::ZERO;
        }
        match (self.loan_amount, self.ltv) {
            (Some(amount), _) => amount,
            (None, Some(ltv)) => purchase_price * ltv,
            (None, None) => Decimal::ZERO,
        }
    }

    pub fn amortization_months(&self) -> u32 {
        self.amortization_years * 12
    }

    pub fn term_months(&self) -> u32 {
        self.loan_term_months
            .unwrap_or_else(|| self.amortization_months())
    }
}

/// BRRRR refinance at a configured month.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinanceInputs {
    pub month: u32,
    /// After-repair value the new loan is sized against
    pub arv: Money,
    pub ltv: Rate,
    pub annual_rate: Rate,
    pub amortization_years: u32,
    #[serde(default)]
    pub closing_costs: Money,
}

// ---------------------------------------------------------------------------
// Pro forma
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeInputs {
    pub unit_count: u32,
    /// Starting monthly rent per unit
    pub monthly_rent_per_unit: Money,
    /// Rent per unit once renovation completes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_renovation_rent_per_unit: Option<Money>,
    #[serde(default)]
    pub annual_rent_growth: Rate,
    /// Parking, laundry, fees (monthly, whole property)
    #[serde(default)]
    pub other_income_monthly: Money,
    #[serde(default)]
    pub other_income_growth: Rate,
    pub vacancy_rate: Rate,
    /// Vacancy on other income; none means collected in full
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_income_vacancy_rate: Option<Rate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseInputs {
    #[serde(default)]
    pub property_tax_annual: Money,
    #[serde(default)]
    pub insurance_annual: Money,
    /// Utilities, HOA, landscaping, other fixed costs
    #[serde(default)]
    pub other_fixed_annual: Money,
    #[serde(default)]
    pub annual_expense_growth: Rate,
    /// Repairs & maintenance as a share of EGI
    #[serde(default)]
    pub maintenance_pct_of_egi: Rate,
    /// Property-management fee as a share of EGI
    #[serde(default)]
    pub management_fee_pct_of_egi: Rate,
    /// Replacement reserves per unit per year
    #[serde(default)]
    pub reserves_per_unit_annual: Money,
}

/// Kind of a month-specific outflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutflowKind {
    MakeReady,
    LeasingCommission,
    CapitalExpenditure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledOutflow {
    pub month: u32,
    pub kind: OutflowKind,
    pub amount: Money,
}

// ---------------------------------------------------------------------------
// Exit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitInputs {
    /// Month of sale; defaults to the hold period
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_month: Option<u32>,
    pub exit_cap_rate: Rate,
    /// Brokerage + disposition costs as a share of sale price
    #[serde(default)]
    pub sale_cost_pct: Rate,
}

// ---------------------------------------------------------------------------
// Syndication
// ---------------------------------------------------------------------------

/// How return of capital is shared between LP and GP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RocMode {
    ProRata,
    LpFirst,
}

/// Waterfall family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaterfallVariant {
    /// ROC then equity-multiple hurdles
    EmHurdles,
    /// ROC, preferred return, equity-multiple promote
    PrefRocPromote,
    /// ROC, preferred return, GP catch-up, equity-multiple promote
    PrefRocCatchupPromote,
    /// ROC, preferred return, LP IRR-to-date hurdles
    IrrHurdles,
}

/// Metric a promote hurdle is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HurdleMetric {
    EquityMultiple,
    Irr,
}

impl WaterfallVariant {
    pub fn accrues_pref(&self) -> bool {
        match self {
            WaterfallVariant::EmHurdles => false,
            WaterfallVariant::PrefRocPromote
            | WaterfallVariant::PrefRocCatchupPromote
            | WaterfallVariant::IrrHurdles => true,
        }
    }

    pub fn has_catch_up(&self) -> bool {
        match self {
            WaterfallVariant::PrefRocCatchupPromote => true,
            WaterfallVariant::EmHurdles
            | WaterfallVariant::PrefRocPromote
            | WaterfallVariant::IrrHurdles => false,
        }
    }

    pub fn hurdle_metric(&self) -> HurdleMetric {
        match self {
            WaterfallVariant::IrrHurdles => HurdleMetric::Irr,
            WaterfallVariant::EmHurdles
            | WaterfallVariant::PrefRocPromote
            | WaterfallVariant::PrefRocCatchupPromote => HurdleMetric::EquityMultiple,
        }
    }
}

/// LP/GP split of promote cash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSplit {
    pub lp: Rate,
    pub gp: Rate,
}

/// A promote band that activates once `hurdle` is reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoteTier {
    pub name: String,
    /// Equity multiple (e.g. 1.5) or annualised IRR (e.g. 0.15)
    pub hurdle: Multiple,
    pub split: TierSplit,
}

/// External LP/GP contribution after closing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapitalCall {
    pub month: u32,
    pub amount: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyndicationInputs {
    /// LP share of contributed equity (GP holds the remainder)
    pub lp_equity_share: Rate,
    pub waterfall: WaterfallStructure,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capital_calls: Vec<CapitalCall>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterfallStructure {
    pub variant: WaterfallVariant,
    /// Annual preferred return, non-compounding
    #[serde(default)]
    pub pref_rate: Rate,
    pub roc_mode: RocMode,
    /// GP's target share of total profit (catch-up variant only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catch_up_pct: Option<Rate>,
    /// Split applied before the first hurdle is reached
    pub base_split: TierSplit,
    /// Ordered, strictly ascending hurdles
    #[serde(default)]
    pub tiers: Vec<PromoteTier>,
}

impl InvestmentInputs {
    /// Acquisition loan principal.
    pub fn acquisition_loan(&self) -> Money {
        self.financing
            .loan_principal(self.acquisition.purchase_price)
    }

    /// Cash invested at closing: down payment, closing costs and lender points.
    pub fn initial_equity(&self) -> Money {
        let loan = self.acquisition_loan();
        let down_payment = (self.acquisition.purchase_price - loan).max(Decimal::ZERO);
        down_payment + self.acquisition.closing_costs + loan * self.financing.points_pct
    }

    /// Refinance event, honoured only for BRRRR deals.
    pub fn active_refinance(&self) -> Option<&RefinanceInputs> {
        match self.deal_type {
            DealType::Brrrr => self.refinance.as_ref(),
            DealType::Rental | DealType::Syndication => None,
        }
    }

    /// Syndication terms, honoured only for syndication deals.
    pub fn active_syndication(&self) -> Option<&SyndicationInputs> {
        match self.deal_type {
            DealType::Syndication => self.syndication.as_ref(),
            DealType::Rental | DealType::Brrrr => None,
        }
    }
}
