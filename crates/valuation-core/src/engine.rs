use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::comps::{build_peer_table, PeerRow};
use crate::dcf::{project_company, DcfResult};
use crate::overrides::{self, OverrideSource};
use crate::portfolio::{summarize, PortfolioRow};
use crate::resolver::{resolve_fields, CrossSection};
use crate::types::{
    with_metadata, Assumptions, ComputationOutput, FinancialProfile, Money, Ticker,
};
use crate::wacc::discount_rate;
use crate::ValuationResult;

/// Already-materialized engine inputs. The engine never touches files,
/// formats or the network; collaborators own all of that.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineInput {
    pub profiles: BTreeMap<Ticker, FinancialProfile>,
    pub prices: BTreeMap<Ticker, Money>,
    pub assumptions: Assumptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineOutput {
    /// Derived comps table, one row per ticker
    pub comps: BTreeMap<Ticker, PeerRow>,
    /// Per-company DCF models
    pub companies: BTreeMap<Ticker, DcfResult>,
    /// Implied vs. market summary, ordered by ticker
    pub portfolio: Vec<PortfolioRow>,
}

/// Run the full valuation batch.
///
/// Pipeline: comps table, cross-sectional statistics, then per ticker the
/// field resolution, override merge, beta relevering and DCF projection,
/// finishing with the portfolio join. The only hard failure is a missing
/// risk-free rate; every per-company anomaly degrades to a default or a
/// `None` with a warning, so the batch always covers the whole portfolio.
pub fn run_valuation(
    input: &EngineInput,
    overrides: &dyn OverrideSource,
) -> ValuationResult<ComputationOutput<EngineOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let rates = input.assumptions.resolve()?;

    let comps = build_peer_table(&input.profiles, &input.prices);

    // First pass over the whole pack; feeds the third resolver tier.
    let cross = CrossSection::from_peer_table(&comps);

    let mut companies: BTreeMap<Ticker, DcfResult> = BTreeMap::new();
    for (ticker, peer) in &comps {
        let fields = resolve_fields(
            ticker,
            input.profiles.get(ticker),
            peer,
            &cross,
            &mut warnings,
        );

        let prior = overrides.load(ticker);
        let resolved = overrides::resolve(&prior, fields.ebit_margin, &rates);

        let rate = discount_rate(
            rates.unlevered_beta,
            resolved.tax_rate,
            fields.de_ratio,
            rates.risk_free,
            rates.erp,
        );

        companies.insert(ticker.clone(), project_company(&fields, &resolved, &rate));
    }

    let portfolio = summarize(&companies, &input.prices);

    let output = EngineOutput {
        comps,
        companies,
        portfolio,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Override-aware FCFF DCF with trading comps",
        &input.assumptions,
        warnings,
        elapsed,
        output,
    ))
}
