use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{per_share, Money, Rate};
use crate::wacc::{effective_discount_rate, MIN_GRID_WACC};

const WACC_OFFSETS: [Decimal; 5] = [dec!(-0.02), dec!(-0.01), dec!(0), dec!(0.01), dec!(0.02)];
const GROWTH_OFFSETS: [Decimal; 4] = [dec!(-0.005), dec!(0), dec!(0.005), dec!(0.010)];

/// Growth rows used when no base terminal growth is available.
const FIXED_GROWTH_POINTS: [Decimal; 4] = [dec!(0.015), dec!(0.020), dec!(0.025), dec!(0.030)];

/// Implied price stress-tested across discount rate and terminal growth,
/// holding the operating assumptions (the FCFF stream) fixed.
///
/// `implied_prices[row][col]` corresponds to
/// (`growth_points[row]`, `wacc_points[col]`). The shape is always 4 x 5; an
/// undefined cell is `None`, never dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityGrid {
    pub wacc_points: Vec<Rate>,
    pub growth_points: Vec<Rate>,
    pub implied_prices: Vec<Vec<Option<Money>>>,
}

/// Five WACC columns centered on the base rate, each floored at 2%.
pub fn wacc_points(base_wacc: Rate) -> Vec<Rate> {
    WACC_OFFSETS
        .iter()
        .map(|off| (base_wacc + off).max(MIN_GRID_WACC))
        .collect()
}

/// Four terminal-growth rows around the base rate, or the fixed set when no
/// base is available.
pub fn growth_points(base_growth: Option<Rate>) -> Vec<Rate> {
    match base_growth {
        Some(g) => GROWTH_OFFSETS.iter().map(|off| g + off).collect(),
        None => FIXED_GROWTH_POINTS.to_vec(),
    }
}

/// Build the grid from the already-computed base FCFF stream. Only the
/// discounting and terminal-value math vary per cell; the stream is reused
/// unchanged.
pub fn build_grid(
    fcff: &[Money],
    net_debt: Money,
    shares: Decimal,
    base_wacc: Rate,
    base_growth: Option<Rate>,
) -> SensitivityGrid {
    let wacc_pts = wacc_points(base_wacc);
    let growth_pts = growth_points(base_growth);

    let implied_prices = growth_pts
        .iter()
        .map(|&g| {
            wacc_pts
                .iter()
                .map(|&w| implied_price_for(fcff, net_debt, shares, w, g))
                .collect()
        })
        .collect();

    SensitivityGrid {
        wacc_points: wacc_pts,
        growth_points: growth_pts,
        implied_prices,
    }
}

fn implied_price_for(
    fcff: &[Money],
    net_debt: Money,
    shares: Decimal,
    wacc: Rate,
    growth: Rate,
) -> Option<Money> {
    let last_fcff = *fcff.last()?;
    let periods = Decimal::from(fcff.len() as i64);

    let pv_stream: Money = fcff
        .iter()
        .enumerate()
        .map(|(idx, cf)| *cf / (Decimal::ONE + wacc).powd(Decimal::from(idx as i64 + 1)))
        .sum();

    // Each cell carries its own floor so a low-WACC column never produces a
    // non-positive Gordon denominator.
    let wacc_eff = effective_discount_rate(wacc, growth);
    let terminal_value = last_fcff * (Decimal::ONE + growth) / (wacc_eff - growth);
    let pv_terminal = terminal_value / (Decimal::ONE + wacc_eff).powd(periods);

    let enterprise_value = pv_stream + pv_terminal;
    let equity_value = enterprise_value - net_debt;
    per_share(equity_value, shares)
}
