use tracing::debug;

use super::types::{ScenarioBase, ScenarioContract, ScenarioPriceSource};
use crate::market::types::{finite, RawQuote};
use crate::models::bs::{bs_price, implied_vol, BsInputs, IvInputs};
use crate::models::utils::{forward_price, mid_price};

/// Volatility assumed when neither the premium nor the vendor yields one
pub const DEFAULT_SCENARIO_SIGMA: f64 = 0.30;

fn positive(value: Option<f64>) -> Option<f64> {
    finite(value).filter(|v| *v > 0.0)
}

/// Resolve the base premium and volatility a scenario grid is measured against.
///
/// Quoted sources fall back to mid and then last; `Model` values the contract
/// at the vendor IV (or [`DEFAULT_SCENARIO_SIGMA`]). Sigma is inverted from
/// the premium, then taken from the vendor, then defaulted. Every fallback
/// adds a warning.
pub fn resolve_scenario_base(
    quote: &RawQuote,
    price_source: ScenarioPriceSource,
    contract: &ScenarioContract,
) -> ScenarioBase {
    let mut warnings = Vec::new();
    let bid = positive(quote.bid);
    let ask = positive(quote.ask);
    let mid = mid_price(finite(quote.bid), finite(quote.ask)).filter(|m| *m > 0.0);
    let last = positive(quote.last);
    let vendor_iv = positive(quote.vendor_iv);

    let solve = |price: f64| {
        implied_vol(&IvInputs::new(
            contract.side,
            contract.spot,
            contract.strike,
            contract.params,
            contract.t_years,
            price,
        ))
    };

    let mut sigma: Option<f64> = None;
    let premium = match price_source {
        ScenarioPriceSource::Model => {
            let model_sigma = vendor_iv.unwrap_or_else(|| {
                warnings.push("Vendor implied volatility unavailable. Using 30% default.".to_string());
                DEFAULT_SCENARIO_SIGMA
            });
            let price = bs_price(&BsInputs::new(
                contract.side,
                contract.spot,
                contract.strike,
                contract.params,
                contract.t_years,
                model_sigma,
            ));
            if price.is_finite() && price > 0.0 {
                sigma = Some(solve(price).unwrap_or(model_sigma));
                Some(price)
            } else {
                warnings.push("Unable to compute model premium.".to_string());
                None
            }
        }
        quoted => {
            let candidate = match quoted {
                ScenarioPriceSource::Bid => bid,
                ScenarioPriceSource::Ask => ask,
                _ => mid,
            };
            match (candidate, mid, last) {
                (Some(price), _, _) => Some(price),
                (None, Some(mid), _) => {
                    warnings.push(format!(
                        "Price source \"{}\" unavailable. Using mid price instead.",
                        quoted
                    ));
                    Some(mid)
                }
                (None, None, Some(last)) => {
                    warnings.push(format!(
                        "Price source \"{}\" unavailable. Using last price instead.",
                        quoted
                    ));
                    Some(last)
                }
                (None, None, None) => {
                    warnings.push(format!("Selected price source \"{}\" is unavailable.", quoted));
                    None
                }
            }
        }
    };

    if let (Some(price), None) = (premium, sigma) {
        sigma = match (solve(price), vendor_iv) {
            (Some(solved), _) => Some(solved),
            (None, Some(vendor)) => {
                warnings.push("Unable to solve implied volatility. Using vendor IV instead.".to_string());
                Some(vendor)
            }
            (None, None) => {
                warnings.push("Unable to solve implied volatility. Using 30% default.".to_string());
                Some(DEFAULT_SCENARIO_SIGMA)
            }
        };
    }

    let forward = Some(forward_price(
        contract.spot,
        contract.params.r,
        contract.params.q,
        contract.t_years,
    ))
    .filter(|f| f.is_finite() && *f > 0.0);

    debug!(
        source = %price_source,
        premium = ?premium,
        sigma = ?sigma,
        warnings = warnings.len(),
        "resolved scenario base"
    );

    ScenarioBase {
        price_source,
        premium,
        sigma,
        forward,
        warnings,
    }
}
