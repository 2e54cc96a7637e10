use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::comps::PeerRow;
use crate::types::{FinancialProfile, Money, Rate, Ticker};

/// Share counts below this are taken to be quoted in millions.
const SHARES_MILLIONS_THRESHOLD: Decimal = dec!(10000);
const MILLION: Decimal = dec!(1000000);

/// A resolved revenue base below this is not plausible for a real company
/// in absolute units.
const REVENUE_FLOOR: Money = dec!(1000000);
const DEFAULT_REVENUE_BASE: Money = dec!(1000000000);

const DEFAULT_EBIT_MARGIN: Rate = dec!(0.10);
const EBIT_MARGIN_MAX: Rate = dec!(0.30);

const DEFAULT_SHARES: Decimal = dec!(1);

/// Rescale a share count quoted in millions to absolute units.
///
/// Applied identically wherever shares are consumed (comps table, resolver,
/// implied price), so a 120 in the filing always means 120,000,000 shares.
pub fn scale_shares_if_millions(shares: Decimal) -> Decimal {
    if shares < SHARES_MILLIONS_THRESHOLD {
        shares * MILLION
    } else {
        shares
    }
}

/// Cross-sectional statistics over the whole peer table, computed in a first
/// pass before any per-company resolution. Third tier of the source chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrossSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_revenue: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_shares: Option<Decimal>,
}

impl CrossSection {
    pub fn from_peer_table(peers: &BTreeMap<Ticker, PeerRow>) -> Self {
        CrossSection {
            mean_revenue: mean(peers.values().map(|p| p.revenue)),
            mean_shares: mean(peers.values().map(|p| p.diluted_shares)),
        }
    }
}

fn mean(values: impl Iterator<Item = Option<Decimal>>) -> Option<Decimal> {
    let present: Vec<Decimal> = values.flatten().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().copied().sum::<Decimal>() / Decimal::from(present.len() as i64))
    }
}

/// First non-null value from an ordered candidate list.
fn first_available(candidates: &[Option<Decimal>]) -> Option<Decimal> {
    candidates.iter().copied().flatten().next()
}

/// Per-company inputs after source resolution and sanity guards. Everything
/// downstream of the resolver works with these, never with raw records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedFields {
    /// Year-0 revenue in absolute units
    pub revenue_base: Money,
    /// EBIT margin as a decimal, guarded into (0, 0.30)
    pub ebit_margin: Rate,
    /// Diluted shares in absolute units
    pub shares: Decimal,
    pub net_debt: Money,
    /// Net debt / equity value; zero when equity value is zero or missing
    pub de_ratio: Decimal,
}

/// Resolve the DCF inputs for one ticker.
///
/// Each field independently walks the source chain: primary record, peer
/// row, cross-sectional mean, fixed default. Implausible resolutions are
/// replaced by the default and logged to `warnings`.
pub fn resolve_fields(
    ticker: &Ticker,
    profile: Option<&FinancialProfile>,
    peer: &PeerRow,
    cross: &CrossSection,
    warnings: &mut Vec<String>,
) -> ResolvedFields {
    let revenue_base = resolve_revenue(ticker, profile, peer, cross, warnings);
    let ebit_margin = resolve_ebit_margin(ticker, peer, warnings);
    let shares = resolve_shares(profile, peer, cross);

    let de_ratio = match peer.equity_value {
        Some(eq) if !eq.is_zero() => peer.net_debt / eq,
        _ => Decimal::ZERO,
    };

    ResolvedFields {
        revenue_base,
        ebit_margin,
        shares,
        net_debt: peer.net_debt,
        de_ratio,
    }
}

fn resolve_revenue(
    ticker: &Ticker,
    profile: Option<&FinancialProfile>,
    peer: &PeerRow,
    cross: &CrossSection,
    warnings: &mut Vec<String>,
) -> Money {
    let resolved = first_available(&[
        profile.and_then(|p| p.revenue),
        peer.revenue,
        cross.mean_revenue,
    ])
    .unwrap_or(DEFAULT_REVENUE_BASE);

    if resolved <= REVENUE_FLOOR {
        warnings.push(format!(
            "{ticker}: resolved revenue base {resolved} below plausibility floor; using {DEFAULT_REVENUE_BASE}"
        ));
        DEFAULT_REVENUE_BASE
    } else {
        resolved
    }
}

fn resolve_ebit_margin(ticker: &Ticker, peer: &PeerRow, warnings: &mut Vec<String>) -> Rate {
    let margin = match peer.ebit {
        Some(ebit) => {
            let rev = match peer.revenue {
                Some(r) if !r.is_zero() => r,
                _ => Decimal::ONE,
            };
            ebit / rev
        }
        None => DEFAULT_EBIT_MARGIN,
    };

    // Exclusive band: sign errors and outlier ratios would otherwise feed
    // an exponential projection.
    if margin <= Decimal::ZERO || margin >= EBIT_MARGIN_MAX {
        if peer.ebit.is_some() {
            warnings.push(format!(
                "{ticker}: EBIT margin {margin} outside (0, {EBIT_MARGIN_MAX}); using {DEFAULT_EBIT_MARGIN}"
            ));
        }
        DEFAULT_EBIT_MARGIN
    } else {
        margin
    }
}

fn resolve_shares(
    profile: Option<&FinancialProfile>,
    peer: &PeerRow,
    cross: &CrossSection,
) -> Decimal {
    let resolved = first_available(&[
        profile.and_then(|p| p.diluted_shares),
        peer.diluted_shares,
        cross.mean_shares,
    ])
    .unwrap_or(DEFAULT_SHARES);

    scale_shares_if_millions(resolved)
}
