use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{AssumptionRates, Rate, Ticker};

const DEFAULT_GROWTH_PCT: Decimal = dec!(5.0);
const DEFAULT_DA_PCT: Decimal = dec!(5.0);
const DEFAULT_CAPEX_PCT: Decimal = dec!(6.0);
const DEFAULT_NWC_PCT: Decimal = dec!(1.0);

const HUNDRED: Decimal = dec!(100);

/// User-authored per-company overrides recovered from the prior model
/// artifact, percent-denominated as the user typed them. Any absent field
/// falls back to a computed or global default at merge time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverrideSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub growth_pct: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ebit_margin_pct: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub da_pct: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capex_pct: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nwc_pct: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal_growth_pct: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_rate_pct: Option<Decimal>,
}

impl OverrideSet {
    pub fn is_empty(&self) -> bool {
        self.growth_pct.is_none()
            && self.ebit_margin_pct.is_none()
            && self.da_pct.is_none()
            && self.capex_pct.is_none()
            && self.nwc_pct.is_none()
            && self.terminal_growth_pct.is_none()
            && self.tax_rate_pct.is_none()
    }
}

/// Where prior-run overrides come from. The collaborator that owns the model
/// artifact reads the per-company sheets before regenerating them and hands
/// the captured sets to the engine through this seam.
pub trait OverrideSource {
    /// Overrides for one ticker. Absence of any prior artifact is a normal
    /// first-run condition, answered with an all-`None` set.
    fn load(&self, ticker: &Ticker) -> OverrideSet;
}

/// First run: no prior artifact exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOverrides;

impl OverrideSource for NoOverrides {
    fn load(&self, _ticker: &Ticker) -> OverrideSet {
        OverrideSet::default()
    }
}

/// Override sets captured in memory from the previous artifact.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOverrides {
    sets: BTreeMap<Ticker, OverrideSet>,
}

impl InMemoryOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ticker: Ticker, set: OverrideSet) {
        self.sets.insert(ticker, set);
    }
}

impl FromIterator<(Ticker, OverrideSet)> for InMemoryOverrides {
    fn from_iter<I: IntoIterator<Item = (Ticker, OverrideSet)>>(iter: I) -> Self {
        InMemoryOverrides {
            sets: iter.into_iter().collect(),
        }
    }
}

impl OverrideSource for InMemoryOverrides {
    fn load(&self, ticker: &Ticker) -> OverrideSet {
        self.sets.get(ticker).cloned().unwrap_or_default()
    }
}

/// The effective per-company assumptions after the three-way merge,
/// decimal-denominated. This is the only place percent values are converted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedAssumptions {
    pub growth: Rate,
    pub ebit_margin: Rate,
    pub da_pct: Rate,
    pub capex_pct: Rate,
    pub nwc_pct: Rate,
    pub terminal_growth: Rate,
    pub tax_rate: Rate,
}

impl ResolvedAssumptions {
    /// Express the effective values back in percent so the regenerated
    /// artifact carries them forward. Feeding the result through
    /// [`resolve`] again reproduces `self` exactly.
    pub fn to_overrides(&self) -> OverrideSet {
        OverrideSet {
            growth_pct: Some(self.growth * HUNDRED),
            ebit_margin_pct: Some(self.ebit_margin * HUNDRED),
            da_pct: Some(self.da_pct * HUNDRED),
            capex_pct: Some(self.capex_pct * HUNDRED),
            nwc_pct: Some(self.nwc_pct * HUNDRED),
            terminal_growth_pct: Some(self.terminal_growth * HUNDRED),
            tax_rate_pct: Some(self.tax_rate * HUNDRED),
        }
    }
}

/// Merge one company's assumptions field by field:
/// explicit override > computed per-company default > global assumption.
pub fn resolve(
    overrides: &OverrideSet,
    computed_ebit_margin: Rate,
    globals: &AssumptionRates,
) -> ResolvedAssumptions {
    let pct = |value: Option<Decimal>, default_pct: Decimal| value.unwrap_or(default_pct) / HUNDRED;

    ResolvedAssumptions {
        growth: pct(overrides.growth_pct, DEFAULT_GROWTH_PCT),
        ebit_margin: pct(overrides.ebit_margin_pct, computed_ebit_margin * HUNDRED),
        da_pct: pct(overrides.da_pct, DEFAULT_DA_PCT),
        capex_pct: pct(overrides.capex_pct, DEFAULT_CAPEX_PCT),
        nwc_pct: pct(overrides.nwc_pct, DEFAULT_NWC_PCT),
        terminal_growth: pct(overrides.terminal_growth_pct, globals.terminal_growth * HUNDRED),
        tax_rate: pct(overrides.tax_rate_pct, globals.tax_rate * HUNDRED),
    }
}
