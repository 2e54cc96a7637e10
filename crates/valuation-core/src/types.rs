use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ValuationError;
use crate::ValuationResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Multiples (e.g., 8.5x EV/EBITDA)
pub type Multiple = Decimal;

/// Normalized ticker symbol: trimmed, uppercased.
///
/// Every map in the engine keys on `Ticker`, so joins between the comps
/// table, the DCF results and the price feed agree on identity regardless
/// of how the collaborator spelled the symbol.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticker(String);

impl Ticker {
    pub fn new(raw: &str) -> Self {
        Ticker(raw.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Ticker {
    fn from(raw: &str) -> Self {
        Ticker::new(raw)
    }
}

/// Latest-fiscal-year financial facts for one ticker, as normalized by the
/// upstream ETL. Missing is a first-class value, not zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ebit: Option<Money>,
    /// Depreciation & amortisation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub da: Option<Money>,
    /// May be quoted in millions; the resolver rescales (see `resolver::scale_shares_if_millions`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diluted_shares: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debt: Option<Money>,
}

/// Global assumptions shared across the portfolio, percent-denominated as the
/// user enters them. Converted to decimal [`AssumptionRates`] exactly once at
/// the engine boundary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Assumptions {
    /// 10Y risk-free rate in percent. The one field with no default: absence
    /// aborts the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_free_pct: Option<Decimal>,
    /// Equity risk premium in percent (default 5.5)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub erp_pct: Option<Decimal>,
    /// Base tax rate in percent (default 25.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_rate_pct: Option<Decimal>,
    /// Base terminal growth in percent (default 2.5)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal_growth_pct: Option<Decimal>,
    /// Unlevered industry beta (default 0.85)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlevered_beta: Option<Decimal>,
}

const DEFAULT_ERP_PCT: Decimal = dec!(5.5);
const DEFAULT_TAX_RATE_PCT: Decimal = dec!(25.0);
const DEFAULT_TERMINAL_GROWTH_PCT: Decimal = dec!(2.5);
const DEFAULT_UNLEVERED_BETA: Decimal = dec!(0.85);

const HUNDRED: Decimal = dec!(100);

/// Decimal-denominated global assumptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssumptionRates {
    pub risk_free: Rate,
    pub erp: Rate,
    pub tax_rate: Rate,
    pub terminal_growth: Rate,
    pub unlevered_beta: Decimal,
}

impl Assumptions {
    /// Convert to decimals, filling defaults. Risk-free is required.
    pub fn resolve(&self) -> ValuationResult<AssumptionRates> {
        let rf = self
            .risk_free_pct
            .ok_or_else(|| ValuationError::MissingAssumption {
                field: "risk_free_pct".into(),
            })?;
        Ok(AssumptionRates {
            risk_free: rf / HUNDRED,
            erp: self.erp_pct.unwrap_or(DEFAULT_ERP_PCT) / HUNDRED,
            tax_rate: self.tax_rate_pct.unwrap_or(DEFAULT_TAX_RATE_PCT) / HUNDRED,
            terminal_growth: self.terminal_growth_pct.unwrap_or(DEFAULT_TERMINAL_GROWTH_PCT)
                / HUNDRED,
            unlevered_beta: self.unlevered_beta.unwrap_or(DEFAULT_UNLEVERED_BETA),
        })
    }
}

/// Equity value per share, `None` when the share count is zero.
///
/// The one place the shares-as-denominator guard lives; implied price in the
/// base case and in every sensitivity cell goes through it.
pub fn per_share(equity_value: Money, shares: Decimal) -> Option<Money> {
    if shares.is_zero() {
        None
    } else {
        Some(equity_value / shares)
    }
}

/// Standard computation output envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
