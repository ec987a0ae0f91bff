//! Lognormal risk-neutral distribution of the underlying at expiry, calibrated
//! to the ATM implied volatility of one chain.

use chrono::NaiveDate;
use tracing::debug;

use crate::market::types::{finite, MarketParams, OptionSide};
use crate::models::bs::{implied_vol, norm_cdf, IvInputs};
use crate::models::chain::types::{OptionChain, ResolvedQuote};
use crate::models::utils::forward_price;

/// Volatility assumed when no ATM quote yields one
pub const DEFAULT_DISTRIBUTION_SIGMA: f64 = 0.25;
/// Number of price points in the density grid
pub const DISTRIBUTION_GRID_POINTS: usize = 260;
/// Grid spans `[0.25·S, 1.75·S]`
pub const GRID_LOW_MULTIPLIER: f64 = 0.25;
pub const GRID_HIGH_MULTIPLIER: f64 = 1.75;
/// Strikes this close to the best ATM distance count as tied
const ATM_TOLERANCE: f64 = 1e-8;

/// Where the distribution's volatility came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SigmaSource {
    Vendor,
    Solved,
    Default,
}

/// Density and cumulative probability sampled over terminal prices
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DistributionGrid {
    pub x: Vec<f64>,
    pub pdf: Vec<f64>,
    pub cdf: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DistributionStats {
    /// One standard deviation move, S·σ·√T
    pub expected_move: f64,
    pub expected_move_upper: f64,
    /// Floored at zero
    pub expected_move_lower: f64,
    pub prob_above_spot: f64,
    pub prob_below_spot: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RiskNeutralDistribution {
    pub symbol: String,
    pub expiry: NaiveDate,
    pub spot: f64,
    pub forward: f64,
    pub params: MarketParams,
    pub t_years: f64,
    pub sigma: f64,
    pub sigma_source: SigmaSource,
    /// Strike the volatility was read from (spot when the chain is empty)
    pub atm_strike: f64,
    pub grid: DistributionGrid,
    pub stats: DistributionStats,
    pub warnings: Vec<String>,
}

/// Mid of a two-sided positive quote, else a positive last trade
fn quote_mid(quote: &ResolvedQuote) -> Option<f64> {
    let bid = finite(quote.bid).filter(|b| *b > 0.0);
    let ask = finite(quote.ask).filter(|a| *a > 0.0);
    match (bid, ask) {
        (Some(bid), Some(ask)) => Some((bid + ask) / 2.0),
        _ => finite(quote.last).filter(|l| *l > 0.0),
    }
}

/// Quotes at the strike(s) nearest spot, rows in order and calls before puts
fn atm_quotes(chain: &OptionChain) -> Vec<(f64, OptionSide, &ResolvedQuote)> {
    let mut best = f64::INFINITY;
    let mut matches = Vec::new();
    for row in &chain.rows {
        let distance = (row.strike - chain.spot).abs();
        if !distance.is_finite() {
            continue;
        }
        if distance < best - ATM_TOLERANCE {
            best = distance;
            matches.clear();
        } else if (distance - best).abs() > ATM_TOLERANCE {
            continue;
        }
        for side in [OptionSide::Call, OptionSide::Put] {
            if let Some(quote) = row.quote(side) {
                matches.push((row.strike, side, quote));
            }
        }
    }
    matches
}

/// ATM volatility: a vendor IV first, then a mid price inverted, then the default
fn pick_sigma(
    chain: &OptionChain,
    t_years: f64,
    warnings: &mut Vec<String>,
) -> (f64, SigmaSource, f64) {
    let candidates = atm_quotes(chain);
    let atm_strike = candidates.first().map_or(chain.spot, |(strike, _, _)| *strike);

    if let Some(vendor) = candidates.iter().find_map(|(_, _, quote)| quote.iv_vendor) {
        return (vendor, SigmaSource::Vendor, atm_strike);
    }

    let solved = candidates.iter().find_map(|&(strike, side, quote)| {
        let mid = quote_mid(quote)?;
        implied_vol(&IvInputs::new(side, chain.spot, strike, chain.params, t_years, mid))
    });
    if let Some(sigma) = solved {
        return (sigma, SigmaSource::Solved, atm_strike);
    }

    warnings.push(format!(
        "ATM implied volatility unavailable. Using {}% default.",
        DEFAULT_DISTRIBUTION_SIGMA * 100.0
    ));
    (DEFAULT_DISTRIBUTION_SIGMA, SigmaSource::Default, atm_strike)
}

/// Lognormal density and CDF of the terminal price over the default grid
pub fn lognormal_grid(spot: f64, params: MarketParams, t_years: f64, sigma: f64) -> DistributionGrid {
    let grid_min = (spot * GRID_LOW_MULTIPLIER).max(0.01);
    let grid_max = (spot * GRID_HIGH_MULTIPLIER).max(grid_min * 1.1);
    let step = (grid_max - grid_min) / (DISTRIBUTION_GRID_POINTS - 1) as f64;

    let variance = sigma * sigma * t_years;
    let denom = sigma * t_years.sqrt();
    let mu = spot.ln() + (params.r - params.q - 0.5 * sigma * sigma) * t_years;

    let mut grid = DistributionGrid {
        x: Vec::with_capacity(DISTRIBUTION_GRID_POINTS),
        pdf: Vec::with_capacity(DISTRIBUTION_GRID_POINTS),
        cdf: Vec::with_capacity(DISTRIBUTION_GRID_POINTS),
    };
    for i in 0..DISTRIBUTION_GRID_POINTS {
        let price = grid_min + step * i as f64;
        grid.x.push((price * 1e6).round() / 1e6);

        if !price.is_finite() || price <= 0.0 || !(denom > 0.0) {
            grid.pdf.push(0.0);
            grid.cdf.push(0.0);
            continue;
        }
        let z = (price.ln() - mu) / denom;
        let density =
            (-0.5 * z * z).exp() / (price * (2.0 * std::f64::consts::PI * variance).sqrt());
        grid.pdf.push(if density.is_finite() { density } else { 0.0 });
        grid.cdf.push(if z.is_finite() { norm_cdf(z) } else { 0.0 });
    }
    grid
}

/// Risk-neutral distribution implied by the chain's ATM volatility.
///
/// `None` when the chain has expired or its spot is unusable. A missing ATM
/// volatility falls back to [`DEFAULT_DISTRIBUTION_SIGMA`] with a warning.
pub fn build_distribution(chain: &OptionChain) -> Option<RiskNeutralDistribution> {
    let spot = chain.spot;
    if !spot.is_finite() || spot <= 0.0 {
        debug!(symbol = %chain.symbol, spot, "unusable spot, no distribution");
        return None;
    }
    let Some(t_years) = chain.t_years.filter(|t| *t > 0.0) else {
        debug!(symbol = %chain.symbol, expiry = %chain.expiry, "chain expired, no distribution");
        return None;
    };

    let mut warnings = Vec::new();
    let (sigma, sigma_source, atm_strike) = pick_sigma(chain, t_years, &mut warnings);
    let params = chain.params;
    let grid = lognormal_grid(spot, params, t_years, sigma);

    let denom = sigma * t_years.sqrt();
    let mu = spot.ln() + (params.r - params.q - 0.5 * sigma * sigma) * t_years;
    let cdf_spot = if denom > 0.0 {
        norm_cdf((spot.ln() - mu) / denom).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let expected_move = spot * denom;

    debug!(
        symbol = %chain.symbol,
        expiry = %chain.expiry,
        sigma,
        ?sigma_source,
        "built risk-neutral distribution"
    );

    Some(RiskNeutralDistribution {
        symbol: chain.symbol.clone(),
        expiry: chain.expiry,
        spot,
        forward: forward_price(spot, params.r, params.q, t_years),
        params,
        t_years,
        sigma,
        sigma_source,
        atm_strike,
        grid,
        stats: DistributionStats {
            expected_move,
            expected_move_upper: spot + expected_move,
            expected_move_lower: (spot - expected_move).max(0.0),
            prob_above_spot: 1.0 - cdf_spot,
            prob_below_spot: cdf_spot,
        },
        warnings,
    })
}
