use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::resolver::scale_shares_if_millions;
use crate::types::{FinancialProfile, Money, Multiple, Ticker};

/// Tax rate baked into the rough P/E proxy (equity / (EBIT * (1 - 25%))).
const ROUGH_PE_TAX: Decimal = dec!(0.25);

/// One row of the comps table, derived per ticker from the primary record and
/// the latest market price. A `None` ratio means the denominator was missing
/// or zero — never silently zero, never a panic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Money>,
    /// Diluted shares in absolute units (millions-quoted inputs rescaled)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diluted_shares: Option<Decimal>,
    /// Price x shares
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equity_value: Option<Money>,
    /// Debt minus cash; absent balance-sheet lines count as zero
    pub net_debt: Money,
    /// Equity value + net debt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enterprise_value: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ebit: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub da: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ev_revenue: Option<Multiple>,
    /// Rough proxy: equity value / (EBIT * 0.75)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pe_rough: Option<Multiple>,
    /// Rough proxy: EV / (EBIT + D&A)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ev_ebitda_rough: Option<Multiple>,
}

/// Derive a single comps row from a primary record and its market price.
pub fn build_peer_row(profile: &FinancialProfile, price: Option<Money>) -> PeerRow {
    let shares = profile.diluted_shares.map(scale_shares_if_millions);

    let equity_value = match (price, shares) {
        (Some(px), Some(sh)) => Some(px * sh),
        _ => None,
    };

    let cash = profile.cash.unwrap_or(Decimal::ZERO);
    let debt = profile.debt.unwrap_or(Decimal::ZERO);
    let net_debt = debt - cash;

    let enterprise_value = equity_value.map(|eq| eq + net_debt);

    let ev_revenue = ratio(enterprise_value, profile.revenue);
    let pe_rough = ratio(
        equity_value,
        profile.ebit.map(|e| e * (Decimal::ONE - ROUGH_PE_TAX)),
    );
    let ebitda = match (profile.ebit, profile.da) {
        (Some(ebit), Some(da)) => Some(ebit + da),
        _ => None,
    };
    let ev_ebitda_rough = ratio(enterprise_value, ebitda);

    PeerRow {
        price,
        diluted_shares: shares,
        equity_value,
        net_debt,
        enterprise_value,
        revenue: profile.revenue,
        ebit: profile.ebit,
        da: profile.da,
        ev_revenue,
        pe_rough,
        ev_ebitda_rough,
    }
}

/// Build the full comps table, keyed and ordered by normalized ticker.
pub fn build_peer_table(
    profiles: &BTreeMap<Ticker, FinancialProfile>,
    prices: &BTreeMap<Ticker, Money>,
) -> BTreeMap<Ticker, PeerRow> {
    profiles
        .iter()
        .map(|(ticker, profile)| {
            let price = prices.get(ticker).copied();
            (ticker.clone(), build_peer_row(profile, price))
        })
        .collect()
}

/// numerator / denominator, `None` when either is missing or the denominator
/// is zero.
fn ratio(numerator: Option<Decimal>, denominator: Option<Decimal>) -> Option<Decimal> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if !d.is_zero() => Some(n / d),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_profile() -> FinancialProfile {
        FinancialProfile {
            revenue: Some(dec!(2000000000)),
            ebit: Some(dec!(200000000)),
            da: Some(dec!(100000000)),
            diluted_shares: Some(dec!(120)), // quoted in millions
            cash: Some(dec!(300000000)),
            debt: Some(dec!(500000000)),
        }
    }

    #[test]
    fn test_shares_rescaled_in_comps() {
        let row = build_peer_row(&sample_profile(), Some(dec!(25)));
        assert_eq!(row.diluted_shares, Some(dec!(120000000)));
        // Equity value uses the rescaled count
        assert_eq!(row.equity_value, Some(dec!(3000000000)));
    }

    #[test]
    fn test_ev_identity() {
        let row = build_peer_row(&sample_profile(), Some(dec!(25)));
        // EV = equity value + net debt, exactly
        assert_eq!(row.net_debt, dec!(200000000));
        assert_eq!(
            row.enterprise_value.unwrap(),
            row.equity_value.unwrap() + row.net_debt
        );
    }

    #[test]
    fn test_multiples() {
        let row = build_peer_row(&sample_profile(), Some(dec!(25)));
        // EV = 3.0B + 0.2B = 3.2B; EV/Revenue = 3.2B / 2.0B = 1.6x
        assert_eq!(row.ev_revenue, Some(dec!(1.6)));
        // P/E rough = 3.0B / (0.2B * 0.75) = 20x
        assert_eq!(row.pe_rough, Some(dec!(20)));
        // EV/EBITDA rough = 3.2B / 0.3B
        let ev_ebitda = row.ev_ebitda_rough.unwrap();
        assert!(
            (ev_ebitda - dec!(10.6667)).abs() < dec!(0.0001),
            "EV/EBITDA: expected ~10.67x, got {ev_ebitda}"
        );
    }

    #[test]
    fn test_missing_price_leaves_equity_undefined() {
        let row = build_peer_row(&sample_profile(), None);
        assert!(row.equity_value.is_none());
        assert!(row.enterprise_value.is_none());
        assert!(row.ev_revenue.is_none());
        // Net debt needs no market data
        assert_eq!(row.net_debt, dec!(200000000));
    }

    #[test]
    fn test_zero_ebit_marks_pe_undefined() {
        let mut profile = sample_profile();
        profile.ebit = Some(Decimal::ZERO);
        let row = build_peer_row(&profile, Some(dec!(25)));
        assert!(row.pe_rough.is_none());
    }

    #[test]
    fn test_missing_da_marks_ev_ebitda_undefined() {
        let mut profile = sample_profile();
        profile.da = None;
        let row = build_peer_row(&profile, Some(dec!(25)));
        assert!(row.ev_ebitda_rough.is_none());
        // Other multiples unaffected
        assert!(row.ev_revenue.is_some());
    }

    #[test]
    fn test_missing_balance_sheet_counts_as_zero() {
        let mut profile = sample_profile();
        profile.cash = None;
        profile.debt = None;
        let row = build_peer_row(&profile, Some(dec!(25)));
        assert_eq!(row.net_debt, Decimal::ZERO);
        assert_eq!(row.enterprise_value, row.equity_value);
    }

    #[test]
    fn test_peer_table_ordered_by_ticker() {
        let mut profiles = BTreeMap::new();
        profiles.insert(Ticker::new("tdoc"), sample_profile());
        profiles.insert(Ticker::new("DGX"), sample_profile());
        let mut prices = BTreeMap::new();
        prices.insert(Ticker::new("TDOC"), dec!(10));

        let table = build_peer_table(&profiles, &prices);
        let tickers: Vec<&str> = table.keys().map(|t| t.as_str()).collect();
        assert_eq!(tickers, vec!["DGX", "TDOC"]);
        assert!(table[&Ticker::new("DGX")].price.is_none());
        assert_eq!(table[&Ticker::new("TDOC")].price, Some(dec!(10)));
    }
}
