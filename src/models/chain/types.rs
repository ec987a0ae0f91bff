use chrono::{DateTime, NaiveDate, Utc};

use crate::market::types::{IvSource, MarketParams, OptionSide, PriceSource, QuotedContract};
use crate::models::bs::Greeks;

/// Everything the normalizer needs besides the raw quote
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuoteContext {
    pub side: OptionSide,
    pub spot: f64,
    pub strike: f64,
    /// Time to expiry in years; `None` when the contract has expired
    pub t_years: Option<f64>,
    pub params: MarketParams,
    pub price_source: PriceSource,
    pub iv_source: IvSource,
}

/// Canonical per-contract quote, recomputed whenever pricing inputs change.
///
/// Any field that could not be resolved is `None` and must be excluded from
/// aggregation rather than read as zero.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResolvedQuote {
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub last: Option<f64>,
    pub mid: Option<f64>,
    /// Premium picked by the price-source policy
    pub premium: Option<f64>,
    /// Field the premium actually came from (differs from the policy after a fallback to mid)
    pub premium_source: Option<PriceSource>,
    /// Implied volatility used downstream
    pub iv: Option<f64>,
    /// Volatility inverted from the premium
    pub iv_solved: Option<f64>,
    /// Vendor-reported volatility, when finite and positive
    pub iv_vendor: Option<f64>,
    pub greeks: Option<Greeks>,
    pub delta: Option<f64>,
    pub volume: Option<f64>,
    pub open_interest: Option<f64>,
    /// Black-Scholes value at the resolved volatility
    pub model_price: Option<f64>,
    /// `model_price - premium`
    pub pricing_error: Option<f64>,
}

/// Calls and puts sharing one strike
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChainRow {
    pub strike: f64,
    pub call: Option<ResolvedQuote>,
    pub put: Option<ResolvedQuote>,
}

impl ChainRow {
    pub fn quote(&self, side: OptionSide) -> Option<&ResolvedQuote> {
        match side {
            OptionSide::Call => self.call.as_ref(),
            OptionSide::Put => self.put.as_ref(),
        }
    }
}

/// Inputs for building one expiry of an option chain
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChainInputs {
    pub symbol: String,
    pub expiry: NaiveDate,
    pub spot: f64,
    pub contracts: Vec<QuotedContract>,
    pub params: MarketParams,
    pub price_source: PriceSource,
    pub iv_source: IvSource,
    /// Valuation instant used to derive time to expiry
    pub as_of: DateTime<Utc>,
}

/// Normalized option chain for one `(symbol, expiry)`.
///
/// Rows are sorted ascending by strike; every strike is positive and unique.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OptionChain {
    pub symbol: String,
    pub expiry: NaiveDate,
    pub spot: f64,
    /// `None` once the expiry has passed
    pub t_years: Option<f64>,
    pub dte_days: Option<i64>,
    pub params: MarketParams,
    pub price_source: PriceSource,
    pub iv_source: IvSource,
    pub rows: Vec<ChainRow>,
}

impl OptionChain {
    /// Strike closest to spot. Ties go to the lower strike.
    pub fn atm_strike(&self) -> Option<f64> {
        nearest_strike(&self.rows, self.spot)
    }

    pub fn atm_row(&self) -> Option<&ChainRow> {
        let strike = self.atm_strike()?;
        self.row(strike)
    }

    pub fn row(&self, strike: f64) -> Option<&ChainRow> {
        self.rows
            .iter()
            .find(|row| (row.strike - strike).abs() < crate::market::types::STRIKE_EPSILON)
    }

    /// Number of resolved quotes across both sides
    pub fn quote_count(&self) -> usize {
        self.rows
            .iter()
            .map(|row| row.call.is_some() as usize + row.put.is_some() as usize)
            .sum()
    }
}

/// First row strike minimizing `|strike - spot|`, scanning rows in order
pub(crate) fn nearest_strike(rows: &[ChainRow], spot: f64) -> Option<f64> {
    if !spot.is_finite() {
        return None;
    }
    let mut best: Option<(f64, f64)> = None;
    for row in rows {
        let distance = (row.strike - spot).abs();
        if !distance.is_finite() {
            continue;
        }
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((row.strike, distance)),
        }
    }
    best.map(|(strike, _)| strike)
}
