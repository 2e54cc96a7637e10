use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use serde::{Deserialize, Serialize};

use crate::overrides::ResolvedAssumptions;
use crate::resolver::ResolvedFields;
use crate::sensitivity::{build_grid, SensitivityGrid};
use crate::types::{per_share, Money, Rate};
use crate::wacc::{effective_discount_rate, DiscountRate};

/// Explicit forecast horizon.
pub const HORIZON_YEARS: u32 = 5;

/// One projected year of the FCFF build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearProjection {
    /// 1-based forecast year
    pub year: u32,
    pub revenue: Money,
    pub ebit: Money,
    pub tax: Money,
    pub nopat: Money,
    pub da: Money,
    pub capex: Money,
    pub nwc_change: Money,
    pub fcff: Money,
    pub discount_factor: Rate,
    pub pv_fcff: Money,
}

/// Full per-company DCF output, including the stress grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfResult {
    pub levered_beta: Decimal,
    pub wacc: Rate,
    pub projections: Vec<YearProjection>,
    /// Terminal value discounted to present
    pub pv_of_terminal: Money,
    pub enterprise_value: Money,
    pub net_debt: Money,
    pub equity_value: Money,
    /// `None` when the resolved share count is zero
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implied_price: Option<Money>,
    /// Effective assumptions after the override merge; the collaborator
    /// persists these so they survive the next rebuild
    pub assumptions: ResolvedAssumptions,
    pub sensitivity: SensitivityGrid,
}

impl DcfResult {
    pub fn fcff_stream(&self) -> Vec<Money> {
        self.projections.iter().map(|p| p.fcff).collect()
    }
}

/// Project one company: 5-year FCFF stream, Gordon terminal value with the
/// floored denominator, equity bridge and implied price, plus the 4 x 5
/// sensitivity grid over the same stream.
///
/// Deterministic and total: every guard degrades to a default or to `None`,
/// so one company's data can never abort the batch.
pub fn project_company(
    fields: &ResolvedFields,
    assumptions: &ResolvedAssumptions,
    rate: &DiscountRate,
) -> DcfResult {
    let wacc = rate.wacc;
    let mut projections = Vec::with_capacity(HORIZON_YEARS as usize);

    for year in 1..=HORIZON_YEARS {
        let year_dec = Decimal::from(year);
        let revenue =
            fields.revenue_base * (Decimal::ONE + assumptions.growth).powd(year_dec);
        let ebit = revenue * assumptions.ebit_margin;
        let tax = ebit * assumptions.tax_rate;
        let nopat = ebit - tax;
        let da = revenue * assumptions.da_pct;
        let capex = revenue * assumptions.capex_pct;
        let nwc_change = revenue * assumptions.nwc_pct;
        let fcff = nopat + da - capex - nwc_change;

        let discount = (Decimal::ONE + wacc).powd(year_dec);
        let pv_fcff = fcff / discount;

        projections.push(YearProjection {
            year,
            revenue,
            ebit,
            tax,
            nopat,
            da,
            capex,
            nwc_change,
            fcff,
            discount_factor: Decimal::ONE / discount,
            pv_fcff,
        });
    }

    let pv_of_fcff: Money = projections.iter().map(|p| p.pv_fcff).sum();
    let last_fcff = projections[HORIZON_YEARS as usize - 1].fcff;

    let growth = assumptions.terminal_growth;
    let wacc_eff = effective_discount_rate(wacc, growth);
    let terminal_value = last_fcff * (Decimal::ONE + growth) / (wacc_eff - growth);
    let pv_of_terminal =
        terminal_value / (Decimal::ONE + wacc_eff).powd(Decimal::from(HORIZON_YEARS));

    let enterprise_value = pv_of_fcff + pv_of_terminal;
    let equity_value = enterprise_value - fields.net_debt;
    let implied_price = per_share(equity_value, fields.shares);

    let fcff_stream: Vec<Money> = projections.iter().map(|p| p.fcff).collect();
    let sensitivity = build_grid(
        &fcff_stream,
        fields.net_debt,
        fields.shares,
        wacc,
        Some(growth),
    );

    DcfResult {
        levered_beta: rate.levered_beta,
        wacc,
        projections,
        pv_of_terminal,
        enterprise_value,
        net_debt: fields.net_debt,
        equity_value,
        implied_price,
        assumptions: assumptions.clone(),
        sensitivity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wacc::discount_rate;
    use rust_decimal_macros::dec;

    fn reference_fields() -> ResolvedFields {
        ResolvedFields {
            revenue_base: dec!(1000000000),
            ebit_margin: dec!(0.10),
            shares: dec!(120000000),
            net_debt: Decimal::ZERO,
            de_ratio: Decimal::ZERO,
        }
    }

    fn reference_assumptions() -> ResolvedAssumptions {
        ResolvedAssumptions {
            growth: dec!(0.05),
            ebit_margin: dec!(0.10),
            da_pct: dec!(0.05),
            capex_pct: dec!(0.06),
            nwc_pct: dec!(0.01),
            terminal_growth: dec!(0.025),
            tax_rate: dec!(0.25),
        }
    }

    fn reference_rate() -> DiscountRate {
        DiscountRate {
            levered_beta: dec!(0.895),
            cost_of_equity: dec!(0.08925),
            wacc: dec!(0.08925),
        }
    }

    fn relative_close(actual: Decimal, expected: Decimal) -> bool {
        ((actual - expected) / expected).abs() < dec!(0.000001)
    }

    #[test]
    fn test_year_one_build() {
        let result = project_company(&reference_fields(), &reference_assumptions(), &reference_rate());
        let y1 = &result.projections[0];

        assert_eq!(y1.revenue, dec!(1050000000.00));
        assert_eq!(y1.ebit, dec!(105000000.0000));
        assert_eq!(y1.tax, dec!(26250000.000000));
        assert_eq!(y1.nopat, dec!(78750000.000000));
        assert_eq!(y1.da, dec!(52500000.0000));
        assert_eq!(y1.capex, dec!(63000000.0000));
        assert_eq!(y1.nwc_change, dec!(10500000.0000));
        assert_eq!(y1.fcff, dec!(57750000.000000));
        assert!(relative_close(y1.discount_factor, dec!(0.91806288)));
        assert!(relative_close(y1.pv_fcff, dec!(53018131.742024)));
    }

    #[test]
    fn test_five_year_stream() {
        let result = project_company(&reference_fields(), &reference_assumptions(), &reference_rate());
        assert_eq!(result.projections.len(), 5);

        let expected_fcff = [
            dec!(57750000),
            dec!(60637500),
            dec!(63669375),
            dec!(66852843.75),
            dec!(70195485.9375),
        ];
        let expected_pv = [
            dec!(53018131.742024),
            dec!(51107678.062085),
            dec!(49266065.609538),
            dec!(47490813.761776),
            dec!(45779531.282869),
        ];
        for (i, p) in result.projections.iter().enumerate() {
            assert!(
                relative_close(p.fcff, expected_fcff[i]),
                "FCFF year {}: expected {}, got {}",
                i + 1,
                expected_fcff[i],
                p.fcff
            );
            assert!(
                relative_close(p.pv_fcff, expected_pv[i]),
                "PV year {}: expected {}, got {}",
                i + 1,
                expected_pv[i],
                p.pv_fcff
            );
        }
    }

    #[test]
    fn test_terminal_value_and_bridge() {
        let result = project_company(&reference_fields(), &reference_assumptions(), &reference_rate());

        // TV = 70,195,485.9375 * 1.025 / (0.08925 - 0.025), discounted 5y
        assert!(relative_close(result.pv_of_terminal, dec!(730334934.862885)));
        assert!(relative_close(result.enterprise_value, dec!(976997155.321176)));
        // Zero net debt: equity equals EV
        assert_eq!(result.equity_value, result.enterprise_value);
        let implied = result.implied_price.unwrap();
        assert!(relative_close(implied, dec!(8.141643)));
    }

    #[test]
    fn test_net_debt_reduces_equity() {
        let mut fields = reference_fields();
        fields.net_debt = dec!(200000000);
        let result = project_company(&fields, &reference_assumptions(), &reference_rate());
        assert_eq!(
            result.equity_value,
            result.enterprise_value - dec!(200000000)
        );
    }

    #[test]
    fn test_zero_shares_implied_price_undefined() {
        let mut fields = reference_fields();
        fields.shares = Decimal::ZERO;
        let result = project_company(&fields, &reference_assumptions(), &reference_rate());
        assert!(result.implied_price.is_none());
        // The rest of the model still computes
        assert!(result.enterprise_value > Decimal::ZERO);
    }

    #[test]
    fn test_wacc_floor_prevents_negative_terminal_denominator() {
        // WACC below terminal growth: the floor takes over, TV stays positive
        let rate = DiscountRate {
            levered_beta: dec!(0.3),
            cost_of_equity: dec!(0.02),
            wacc: dec!(0.02),
        };
        let result = project_company(&reference_fields(), &reference_assumptions(), &rate);
        assert!(result.pv_of_terminal > Decimal::ZERO);
        assert!(result.enterprise_value > Decimal::ZERO);
    }

    #[test]
    fn test_grid_attached_with_base_case_consistency() {
        let result = project_company(&reference_fields(), &reference_assumptions(), &reference_rate());
        let grid = &result.sensitivity;
        assert_eq!(grid.wacc_points[2], dec!(0.08925));
        assert_eq!(grid.growth_points[1], dec!(0.025));
        // Centre cell reproduces the base implied price
        let centre = grid.implied_prices[1][2].unwrap();
        assert!(relative_close(centre, result.implied_price.unwrap()));
    }

    #[test]
    fn test_levered_beta_feeds_through_from_leverage() {
        let mut fields = reference_fields();
        fields.de_ratio = dec!(0.5);
        let rate = discount_rate(
            dec!(0.85),
            reference_assumptions().tax_rate,
            fields.de_ratio,
            dec!(0.04),
            dec!(0.055),
        );
        let result = project_company(&fields, &reference_assumptions(), &rate);
        // B_L = 0.85 * (1 + 0.75 * 0.5) = 1.16875; WACC = 4% + 1.16875 * 5.5%
        assert_eq!(result.levered_beta, dec!(1.16875));
        assert_eq!(result.wacc, dec!(0.104281250));
    }

    #[test]
    fn test_determinism() {
        let a = project_company(&reference_fields(), &reference_assumptions(), &reference_rate());
        let b = project_company(&reference_fields(), &reference_assumptions(), &reference_rate());
        assert_eq!(a.enterprise_value, b.enterprise_value);
        assert_eq!(a.implied_price, b.implied_price);
        assert_eq!(a.sensitivity.implied_prices, b.sensitivity.implied_prices);
    }
}
