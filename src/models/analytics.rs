//! Single-contract analytics: market snapshot, model valuation and data
//! quality warnings for one listed option.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use crate::expiry::{days_to_expiry, time_to_expiry_years};
use crate::market::types::{Contract, IvSource, MarketParams, OptionSide, PriceSource, RawQuote};
use crate::models::bs::{bs_greeks, bs_price, prob_itm, BsInputs, Greeks};
use crate::models::chain::quote::normalize_quote;
use crate::models::chain::types::QuoteContext;
use crate::models::utils::{forward_price, spread_pct};

/// Spreads wider than this percentage of mid draw a warning
pub const WIDE_SPREAD_PCT: f64 = 10.0;
pub const HIGH_IV_WARNING: f64 = 3.0;
pub const LOW_IV_WARNING: f64 = 0.05;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContractAnalyticsRequest {
    pub contract: Contract,
    pub quote: RawQuote,
    pub spot: f64,
    pub params: MarketParams,
    pub price_source: PriceSource,
    pub iv_source: IvSource,
    pub as_of: DateTime<Utc>,
}

/// Quoted market data for the contract
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MarketSnapshot {
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub last: Option<f64>,
    pub mid: Option<f64>,
    pub premium: Option<f64>,
    pub spread_abs: Option<f64>,
    pub spread_pct: Option<f64>,
    pub volume: Option<f64>,
    pub open_interest: Option<f64>,
    pub vendor_iv: Option<f64>,
}

/// Black-Scholes view of the contract at the resolved IV
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelValuation {
    pub iv_used: f64,
    pub bsm_price: f64,
    pub greeks: Greeks,
    pub prob_itm: f64,
    /// Underlying price at expiry where the position breaks even
    pub breakeven: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContractAnalytics {
    pub symbol: String,
    pub expiry: NaiveDate,
    pub side: OptionSide,
    pub strike: f64,
    pub spot: f64,
    pub t_years: Option<f64>,
    pub dte_days: Option<i64>,
    pub forward: Option<f64>,
    pub market: MarketSnapshot,
    pub model: Option<ModelValuation>,
    pub warnings: Vec<String>,
}

/// Breakeven at expiry: `K + premium` for calls, `K - premium` for puts
pub fn breakeven(side: OptionSide, strike: f64, premium: f64) -> f64 {
    match side {
        OptionSide::Call => strike + premium,
        OptionSide::Put => strike - premium,
    }
}

/// Analyze one contract. Never fails; missing inputs leave `model` empty
/// and are listed in `warnings`.
pub fn analyze_contract(request: &ContractAnalyticsRequest) -> ContractAnalytics {
    let contract = &request.contract;
    let t_years = time_to_expiry_years(contract.expiry, request.as_of);
    let dte_days = days_to_expiry(contract.expiry, request.as_of);

    let resolved = normalize_quote(
        &request.quote,
        &QuoteContext {
            side: contract.side,
            spot: request.spot,
            strike: contract.strike,
            t_years,
            params: request.params,
            price_source: request.price_source,
            iv_source: request.iv_source,
        },
    );

    let spread_abs = match (resolved.bid, resolved.ask) {
        (Some(bid), Some(ask)) => Some(ask - bid),
        _ => None,
    };
    let market = MarketSnapshot {
        bid: resolved.bid,
        ask: resolved.ask,
        last: resolved.last,
        mid: resolved.mid,
        premium: resolved.premium,
        spread_abs,
        spread_pct: spread_pct(resolved.bid, resolved.ask),
        volume: resolved.volume,
        open_interest: resolved.open_interest,
        vendor_iv: resolved.iv_vendor,
    };

    let mut warnings = Vec::new();
    if t_years.is_none() {
        warnings.push("Contract has expired.".to_string());
    }
    if let Some(pct) = market.spread_pct.filter(|pct| *pct > WIDE_SPREAD_PCT) {
        warnings.push(format!("Wide bid/ask spread: {:.1}%", pct));
    }
    if market.open_interest.map_or(true, |oi| oi <= 0.0) {
        warnings.push("Open interest unavailable or zero.".to_string());
    }
    if market.volume.map_or(true, |volume| volume <= 0.0) {
        warnings.push("Volume unavailable or zero.".to_string());
    }
    if market.vendor_iv.is_none() {
        warnings.push("Vendor implied volatility unavailable.".to_string());
    }

    let premium = resolved.premium.filter(|p| *p > 0.0);
    let model = match (premium, resolved.iv, t_years) {
        (None, _, _) => {
            warnings.push(format!("Premium unavailable for price source \"{}\".", request.price_source));
            None
        }
        (Some(_), None, _) | (Some(_), _, None) => {
            warnings.push("Implied volatility could not be resolved.".to_string());
            None
        }
        (Some(premium), Some(iv), Some(t)) => {
            let inputs = BsInputs::new(contract.side, request.spot, contract.strike, request.params, t, iv);
            let bsm_price = bs_price(&inputs);
            match (bs_greeks(&inputs), prob_itm(&inputs)) {
                (Some(greeks), Some(prob)) if bsm_price.is_finite() => {
                    if iv > HIGH_IV_WARNING {
                        warnings.push("Implied volatility exceeds 300%.".to_string());
                    } else if iv < LOW_IV_WARNING {
                        warnings.push("Implied volatility below 5%.".to_string());
                    }
                    Some(ModelValuation {
                        iv_used: iv,
                        bsm_price,
                        greeks,
                        prob_itm: prob,
                        breakeven: breakeven(contract.side, contract.strike, premium),
                    })
                }
                _ => {
                    warnings.push("Model valuation failed for the resolved inputs.".to_string());
                    None
                }
            }
        }
    };

    let forward = t_years
        .map(|t| forward_price(request.spot, request.params.r, request.params.q, t))
        .filter(|f| f.is_finite() && *f > 0.0);

    debug!(
        symbol = %contract.symbol,
        strike = contract.strike,
        side = %contract.side,
        modeled = model.is_some(),
        warnings = warnings.len(),
        "analyzed contract"
    );

    ContractAnalytics {
        symbol: contract.symbol.clone(),
        expiry: contract.expiry,
        side: contract.side,
        strike: contract.strike,
        spot: request.spot,
        t_years,
        dte_days,
        forward,
        market,
        model,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request(side: OptionSide, strike: f64, quote: RawQuote) -> ContractAnalyticsRequest {
        ContractAnalyticsRequest {
            contract: Contract::new("AAPL", NaiveDate::from_ymd_opt(2025, 9, 19).unwrap(), strike, side),
            quote,
            spot: 200.0,
            params: MarketParams { r: 0.04, q: 0.005 },
            price_source: PriceSource::Mid,
            iv_source: IvSource::Solved,
            as_of: Utc.with_ymd_and_hms(2025, 6, 20, 14, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_liquid_contract_has_model_block() {
        let quote = RawQuote {
            bid: Some(7.9),
            ask: Some(8.1),
            volume: Some(1200.0),
            open_interest: Some(5400.0),
            vendor_iv: Some(0.27),
            ..RawQuote::default()
        };
        let analytics = analyze_contract(&request(OptionSide::Call, 205.0, quote));

        assert!(analytics.warnings.is_empty(), "{:?}", analytics.warnings);
        let model = analytics.model.unwrap();
        assert!((model.breakeven - 213.0).abs() < 1e-9);
        assert!((model.bsm_price - 8.0).abs() < 1e-4);
        assert!(model.prob_itm > 0.0 && model.prob_itm < 1.0);
        assert!((analytics.market.spread_abs.unwrap() - 0.2).abs() < 1e-12);
        assert!(analytics.forward.unwrap() > 200.0);
        assert_eq!(analytics.dte_days, Some(91));
    }

    #[test]
    fn test_thin_contract_collects_warnings() {
        let quote = RawQuote {
            bid: Some(1.0),
            ask: Some(1.5),
            ..RawQuote::default()
        };
        let analytics = analyze_contract(&request(OptionSide::Put, 180.0, quote));

        let joined = analytics.warnings.join(" | ");
        assert!(joined.contains("Wide bid/ask spread: 40.0%"));
        assert!(joined.contains("Open interest"));
        assert!(joined.contains("Volume"));
        assert!(joined.contains("Vendor implied volatility"));
        let model = analytics.model.unwrap();
        assert!((model.breakeven - 178.75).abs() < 1e-9);
    }

    #[test]
    fn test_no_premium_skips_model() {
        let analytics = analyze_contract(&request(OptionSide::Call, 200.0, RawQuote::default()));
        assert!(analytics.model.is_none());
        assert!(analytics.warnings.iter().any(|w| w.starts_with("Premium unavailable")));
    }
}
