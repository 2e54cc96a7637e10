use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::dcf::DcfResult;
use crate::types::{Money, Ticker};

const HUNDRED: Decimal = dec!(100);

/// One line of the portfolio summary: model output joined against the
/// current market price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioRow {
    pub ticker: Ticker,
    pub wacc_pct: Decimal,
    pub terminal_growth_pct: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implied_price: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_price: Option<Money>,
    /// (implied / market - 1) x 100; `None` unless both prices are present
    /// and the market price is non-zero
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upside_pct: Option<Decimal>,
}

/// Collect per-company results into a summary ordered by ticker.
pub fn summarize(
    results: &BTreeMap<Ticker, DcfResult>,
    prices: &BTreeMap<Ticker, Money>,
) -> Vec<PortfolioRow> {
    results
        .iter()
        .map(|(ticker, dcf)| {
            let market_price = prices.get(ticker).copied();
            PortfolioRow {
                ticker: ticker.clone(),
                wacc_pct: dcf.wacc * HUNDRED,
                terminal_growth_pct: dcf.assumptions.terminal_growth * HUNDRED,
                implied_price: dcf.implied_price,
                market_price,
                upside_pct: upside(dcf.implied_price, market_price),
            }
        })
        .collect()
}

fn upside(implied: Option<Money>, market: Option<Money>) -> Option<Decimal> {
    match (implied, market) {
        (Some(i), Some(m)) if !m.is_zero() => Some((i / m - Decimal::ONE) * HUNDRED),
        _ => None,
    }
}
