use super::pricing::{bs_price, BsInputs};
use crate::market::types::{MarketParams, OptionSide};
use crate::models::utils::intrinsic_value;

/// Lower end of the volatility search bracket
pub const IV_LOWER_BOUND: f64 = 1e-6;
/// Upper end of the volatility search bracket (500% annualized)
pub const IV_UPPER_BOUND: f64 = 5.0;
/// Bisection iteration budget
pub const IV_MAX_ITERATIONS: usize = 80;
/// Absolute price tolerance for convergence
pub const IV_PRICE_TOLERANCE: f64 = 1e-6;
/// Bracket width below which the search stops
pub const IV_VOL_TOLERANCE: f64 = 1e-6;

/// Inputs for implied-volatility inversion: the pricer inputs with an
/// observed premium in place of sigma
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IvInputs {
    pub side: OptionSide,
    pub spot: f64,
    pub strike: f64,
    pub r: f64,
    pub q: f64,
    pub t: f64,
    /// Observed option premium
    pub price: f64,
}

impl IvInputs {
    pub fn new(
        side: OptionSide,
        spot: f64,
        strike: f64,
        params: MarketParams,
        t: f64,
        price: f64,
    ) -> Self {
        Self {
            side,
            spot,
            strike,
            r: params.r,
            q: params.q,
            t,
            price,
        }
    }

    /// Pricer inputs at a trial volatility
    pub fn at_sigma(&self, sigma: f64) -> BsInputs {
        BsInputs {
            side: self.side,
            spot: self.spot,
            strike: self.strike,
            r: self.r,
            q: self.q,
            t: self.t,
            sigma,
        }
    }
}

/// Solve for the volatility that reproduces `inputs.price` by bisection on
/// `[IV_LOWER_BOUND, IV_UPPER_BOUND]`.
///
/// Returns `None` when no volatility meaningfully solves the equation: the
/// premium does not exceed intrinsic value, it lies outside the discounted
/// no-arbitrage band, time is not positive, or the pricer stops producing
/// finite values. When the iteration budget runs out the bracket midpoint
/// is returned.
pub fn implied_vol(inputs: &IvInputs) -> Option<f64> {
    let IvInputs {
        side,
        spot,
        strike,
        r,
        q,
        t,
        price,
    } = *inputs;

    if !t.is_finite() || t <= 0.0 || !price.is_finite() {
        return None;
    }

    let intrinsic = intrinsic_value(side, spot, strike);
    if !intrinsic.is_finite() || price <= intrinsic + IV_PRICE_TOLERANCE {
        return None;
    }

    let discounted_spot = spot * (-q * t).exp();
    let discounted_strike = strike * (-r * t).exp();
    let (lower, upper) = match side {
        OptionSide::Call => ((discounted_spot - discounted_strike).max(0.0), discounted_spot),
        OptionSide::Put => ((discounted_strike - discounted_spot).max(0.0), discounted_strike),
    };
    if price < lower - IV_PRICE_TOLERANCE || price > upper + IV_PRICE_TOLERANCE {
        return None;
    }

    let mut low = IV_LOWER_BOUND;
    let mut high = IV_UPPER_BOUND;

    for _ in 0..IV_MAX_ITERATIONS {
        let mid = 0.5 * (low + high);
        let theoretical = bs_price(&inputs.at_sigma(mid));
        if !theoretical.is_finite() {
            return None;
        }

        let diff = theoretical - price;
        if diff.abs() < IV_PRICE_TOLERANCE || (high - low).abs() < IV_VOL_TOLERANCE {
            return Some(mid);
        }

        if theoretical > price {
            high = mid;
        } else {
            low = mid;
        }
    }

    Some(0.5 * (low + high))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv_inputs(price: f64) -> IvInputs {
        IvInputs {
            side: OptionSide::Call,
            spot: 100.0,
            strike: 105.0,
            r: 0.02,
            q: 0.0,
            t: 45.0 / 365.0,
            price,
        }
    }

    #[test]
    fn test_recovers_known_volatility() {
        let price = bs_price(&iv_inputs(0.0).at_sigma(0.25));
        let recovered = implied_vol(&iv_inputs(price)).expect("should invert");
        assert!((recovered - 0.25).abs() < 1e-4, "recovered={}", recovered);
    }

    #[test]
    fn test_rejects_premium_at_or_below_intrinsic() {
        let itm = IvInputs {
            strike: 90.0,
            ..iv_inputs(10.0)
        };
        assert!(implied_vol(&itm).is_none());
        assert!(implied_vol(&IvInputs { price: 9.0, ..itm }).is_none());
        assert!(implied_vol(&iv_inputs(0.0)).is_none());
    }

    #[test]
    fn test_rejects_price_above_upper_band() {
        // a call can never be worth more than the discounted spot
        assert!(implied_vol(&iv_inputs(150.0)).is_none());
    }

    #[test]
    fn test_rejects_non_positive_time_and_nan() {
        assert!(implied_vol(&IvInputs { t: 0.0, ..iv_inputs(2.0) }).is_none());
        assert!(implied_vol(&IvInputs {
            t: f64::NAN,
            ..iv_inputs(2.0)
        })
        .is_none());
        assert!(implied_vol(&iv_inputs(f64::NAN)).is_none());
    }

    #[test]
    fn test_put_inversion() {
        let inputs = IvInputs {
            side: OptionSide::Put,
            strike: 95.0,
            t: 0.5,
            ..iv_inputs(0.0)
        };
        let price = bs_price(&inputs.at_sigma(0.6));
        let recovered = implied_vol(&IvInputs { price, ..inputs }).unwrap();
        assert!((recovered - 0.6).abs() < 1e-4);
    }
}
