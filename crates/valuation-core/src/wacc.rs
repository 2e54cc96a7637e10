use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::Rate;

/// Minimum spread kept between the discount rate and terminal growth so the
/// Gordon denominator stays strictly positive.
const MIN_WACC_GROWTH_SPREAD: Decimal = dec!(0.001);

/// Hard floor applied to sensitivity-grid WACC points.
pub const MIN_GRID_WACC: Rate = dec!(0.02);

/// Discount-rate build for one company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountRate {
    pub levered_beta: Decimal,
    pub cost_of_equity: Rate,
    /// Equals cost of equity: the model assumes equity-only discounting.
    /// A blended after-tax WACC is a known, deliberate simplification gap.
    pub wacc: Rate,
}

/// Re-lever a beta via the Hamada equation: B_L = B_U * (1 + (1 - t) * D/E).
pub fn relever_beta(unlevered_beta: Decimal, tax_rate: Rate, debt_equity: Decimal) -> Decimal {
    unlevered_beta * (Decimal::ONE + (Decimal::ONE - tax_rate) * debt_equity)
}

/// CAPM cost of equity: Ke = Rf + B_L * ERP.
pub fn cost_of_equity(risk_free: Rate, levered_beta: Decimal, erp: Rate) -> Rate {
    risk_free + levered_beta * erp
}

/// Build the per-company discount rate from the industry unlevered beta and
/// the company's approximate D/E (net debt / equity value).
pub fn discount_rate(
    unlevered_beta: Decimal,
    tax_rate: Rate,
    debt_equity: Decimal,
    risk_free: Rate,
    erp: Rate,
) -> DiscountRate {
    let levered_beta = relever_beta(unlevered_beta, tax_rate, debt_equity);
    let ke = cost_of_equity(risk_free, levered_beta, erp);
    DiscountRate {
        levered_beta,
        cost_of_equity: ke,
        wacc: ke,
    }
}

/// The shared denominator guard: max(wacc, g + 0.001).
///
/// Used for the base-case terminal value and independently inside every
/// sensitivity cell, so the floor semantics cannot drift between call sites.
pub fn effective_discount_rate(wacc: Rate, terminal_growth: Rate) -> Rate {
    wacc.max(terminal_growth + MIN_WACC_GROWTH_SPREAD)
}
