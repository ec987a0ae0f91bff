use super::normal::norm_cdf;
use crate::market::types::{MarketParams, OptionSide};

/// Inputs to the closed-form Black-Scholes-Merton formulas
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BsInputs {
    pub side: OptionSide,
    /// Spot price of the underlying
    pub spot: f64,
    pub strike: f64,
    /// Risk-free rate (continuous)
    pub r: f64,
    /// Dividend yield (continuous)
    pub q: f64,
    /// Time to expiry in years
    pub t: f64,
    /// Annualized volatility (decimal)
    pub sigma: f64,
}

impl BsInputs {
    pub fn new(
        side: OptionSide,
        spot: f64,
        strike: f64,
        params: MarketParams,
        t: f64,
        sigma: f64,
    ) -> Self {
        Self {
            side,
            spot,
            strike,
            r: params.r,
            q: params.q,
            t,
            sigma,
        }
    }

    /// Same contract and market, different volatility
    pub fn with_sigma(self, sigma: f64) -> Self {
        Self { sigma, ..self }
    }
}

/// d1/d2 terms and the discounted spot and strike
pub(crate) struct D1D2 {
    pub d1: f64,
    pub d2: f64,
    pub sqrt_t: f64,
    pub discounted_spot: f64,
    pub discounted_strike: f64,
}

pub(crate) fn d1_d2(inputs: &BsInputs) -> Option<D1D2> {
    let BsInputs {
        spot,
        strike,
        r,
        q,
        t,
        sigma,
        ..
    } = *inputs;

    if ![spot, strike, r, q, t, sigma].iter().all(|v| v.is_finite()) {
        return None;
    }
    if spot <= 0.0 || strike <= 0.0 || t <= 0.0 || sigma <= 0.0 {
        return None;
    }

    let sqrt_t = t.sqrt();
    let denominator = sigma * sqrt_t;
    if denominator == 0.0 {
        return None;
    }

    let d1 = ((spot / strike).ln() + (r - q + 0.5 * sigma * sigma) * t) / denominator;
    let d2 = d1 - denominator;

    Some(D1D2 {
        d1,
        d2,
        sqrt_t,
        discounted_spot: spot * (-q * t).exp(),
        discounted_strike: strike * (-r * t).exp(),
    })
}

/// Black-Scholes-Merton value of a European option (per share).
///
/// Returns NaN when any input is non-finite or any of spot, strike, `t`,
/// `sigma` is not strictly positive. Callers treat a non-finite result as
/// "not priceable".
pub fn bs_price(inputs: &BsInputs) -> f64 {
    let Some(state) = d1_d2(inputs) else {
        return f64::NAN;
    };

    match inputs.side {
        OptionSide::Call => {
            state.discounted_spot * norm_cdf(state.d1)
                - state.discounted_strike * norm_cdf(state.d2)
        }
        OptionSide::Put => {
            state.discounted_strike * norm_cdf(-state.d2)
                - state.discounted_spot * norm_cdf(-state.d1)
        }
    }
}

/// Risk-neutral probability of finishing in the money, `N(d2)` for calls and `N(-d2)` for puts
pub fn prob_itm(inputs: &BsInputs) -> Option<f64> {
    let state = d1_d2(inputs)?;
    let prob = match inputs.side {
        OptionSide::Call => norm_cdf(state.d2),
        OptionSide::Put => norm_cdf(-state.d2),
    };
    prob.is_finite().then_some(prob)
}
