use chrono::NaiveDate;

use super::types::SideView;
use crate::market::types::OptionSide;
use crate::models::chain::types::{OptionChain, ResolvedQuote};
use crate::models::utils::{log_moneyness, moneyness};

/// One quote of a single-expiry smile
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SmilePoint {
    pub strike: f64,
    pub side: OptionSide,
    /// K/S
    pub moneyness: f64,
    /// ln(K/S)
    pub log_moneyness: f64,
    pub iv: Option<f64>,
    pub iv_solved: Option<f64>,
    pub iv_vendor: Option<f64>,
    pub mid: Option<f64>,
    pub premium: Option<f64>,
    pub delta: Option<f64>,
}

/// ATM quote of the smile, call preferred
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AtmQuote {
    pub strike: f64,
    pub side: OptionSide,
    pub quote: ResolvedQuote,
}

/// IV smile of one expiry
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Smile {
    pub symbol: String,
    pub expiry: NaiveDate,
    pub spot: f64,
    pub t_years: Option<f64>,
    pub dte_days: Option<i64>,
    /// Ordered by strike, calls before puts at equal strikes
    pub points: Vec<SmilePoint>,
    pub atm: Option<AtmQuote>,
}

impl Smile {
    /// Points with a resolved IV, for plotting
    pub fn resolved_points(&self) -> impl Iterator<Item = &SmilePoint> {
        self.points.iter().filter(|point| point.iv.is_some())
    }
}

/// Flatten one chain into smile points for the sides in view. Unlike the
/// surface no quality filters are applied; unresolved IVs stay `None`.
pub fn build_smile(chain: &OptionChain, side_view: SideView) -> Smile {
    let mut points = Vec::new();
    for row in &chain.rows {
        for side in [OptionSide::Call, OptionSide::Put] {
            if !side_view.includes(side) {
                continue;
            }
            let Some(quote) = row.quote(side) else {
                continue;
            };
            points.push(SmilePoint {
                strike: row.strike,
                side,
                moneyness: moneyness(chain.spot, row.strike),
                log_moneyness: log_moneyness(row.strike, chain.spot),
                iv: quote.iv,
                iv_solved: quote.iv_solved,
                iv_vendor: quote.iv_vendor,
                mid: quote.mid,
                premium: quote.premium,
                delta: quote.delta,
            });
        }
    }

    let atm = chain.atm_row().and_then(|row| {
        let (side, quote) = match (&row.call, &row.put) {
            (Some(call), _) => (OptionSide::Call, call),
            (None, Some(put)) => (OptionSide::Put, put),
            (None, None) => return None,
        };
        Some(AtmQuote {
            strike: row.strike,
            side,
            quote: quote.clone(),
        })
    });

    Smile {
        symbol: chain.symbol.clone(),
        expiry: chain.expiry,
        spot: chain.spot,
        t_years: chain.t_years,
        dte_days: chain.dte_days,
        points,
        atm,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::types::{Contract, IvSource, MarketParams, PriceSource, QuotedContract, RawQuote};
    use crate::models::chain::{build_chain, ChainInputs};
    use chrono::{TimeZone, Utc};

    fn sample_chain() -> OptionChain {
        let expiry = NaiveDate::from_ymd_opt(2025, 6, 20).unwrap();
        let quoted = |strike: f64, side: OptionSide, bid: f64, ask: f64| QuotedContract {
            contract: Contract::new("SPY", expiry, strike, side),
            quote: RawQuote::from_bid_ask(bid, ask),
        };
        build_chain(&ChainInputs {
            symbol: "SPY".to_string(),
            expiry,
            spot: 100.0,
            contracts: vec![
                quoted(95.0, OptionSide::Put, 2.4, 2.6),
                quoted(100.0, OptionSide::Put, 4.3, 4.5),
                quoted(100.0, OptionSide::Call, 5.2, 5.4),
                quoted(105.0, OptionSide::Call, 2.9, 3.1),
            ],
            params: MarketParams { r: 0.04, q: 0.0 },
            price_source: PriceSource::Mid,
            iv_source: IvSource::Solved,
            as_of: Utc.with_ymd_and_hms(2025, 3, 20, 15, 0, 0).unwrap(),
        })
    }

    #[test]
    fn test_smile_orders_points_and_picks_atm_call() {
        let smile = build_smile(&sample_chain(), SideView::Both);
        let strikes: Vec<(f64, OptionSide)> = smile.points.iter().map(|p| (p.strike, p.side)).collect();
        assert_eq!(
            strikes,
            vec![
                (95.0, OptionSide::Put),
                (100.0, OptionSide::Call),
                (100.0, OptionSide::Put),
                (105.0, OptionSide::Call),
            ]
        );
        let atm = smile.atm.unwrap();
        assert_eq!(atm.side, OptionSide::Call);
        assert_eq!(atm.strike, 100.0);
        assert!(smile.points[1].log_moneyness.abs() < 1e-12);
    }

    #[test]
    fn test_smile_side_view() {
        let smile = build_smile(&sample_chain(), SideView::Put);
        assert_eq!(smile.points.len(), 2);
        assert!(smile.points.iter().all(|p| p.side == OptionSide::Put));
        assert_eq!(smile.resolved_points().count(), 2);
    }
}
