pub mod analytics;
pub mod bs;
pub mod chain;
pub mod distribution;
pub mod scenario;
pub mod surface;

/// Small pricing helpers shared by the chain, surface and scenario modules
pub mod utils {
    use crate::market::types::OptionSide;

    /// Intrinsic value of an option (per share). NaN for non-finite inputs.
    pub fn intrinsic_value(side: OptionSide, spot: f64, strike: f64) -> f64 {
        if !spot.is_finite() || !strike.is_finite() {
            return f64::NAN;
        }
        match side {
            OptionSide::Call => (spot - strike).max(0.0),
            OptionSide::Put => (strike - spot).max(0.0),
        }
    }

    /// Strike-to-spot ratio K/S. NaN unless spot is positive and both are finite.
    pub fn moneyness(spot: f64, strike: f64) -> f64 {
        if !spot.is_finite() || spot <= 0.0 || !strike.is_finite() {
            return f64::NAN;
        }
        strike / spot
    }

    /// Calculate log-moneyness: ln(K/S)
    pub fn log_moneyness(strike: f64, spot: f64) -> f64 {
        (strike / spot).ln()
    }

    /// Forward price S·e^((r-q)t)
    pub fn forward_price(spot: f64, r: f64, q: f64, t: f64) -> f64 {
        spot * ((r - q) * t).exp()
    }

    /// Midpoint of a two-sided quote when both sides are finite
    pub fn mid_price(bid: Option<f64>, ask: Option<f64>) -> Option<f64> {
        match (bid, ask) {
            (Some(b), Some(a)) if b.is_finite() && a.is_finite() => {
                let mid = 0.5 * (b + a);
                mid.is_finite().then_some(mid)
            }
            _ => None,
        }
    }

    /// Bid-ask spread as a percentage of mid, `(ask - bid) / mid * 100`.
    /// `None` when either side is missing or mid is not positive.
    pub fn spread_pct(bid: Option<f64>, ask: Option<f64>) -> Option<f64> {
        let mid = mid_price(bid, ask)?;
        if mid <= 0.0 {
            return None;
        }
        let pct = (ask? - bid?) / mid * 100.0;
        pct.is_finite().then_some(pct)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_intrinsic_value() {
            assert_eq!(intrinsic_value(OptionSide::Call, 110.0, 100.0), 10.0);
            assert_eq!(intrinsic_value(OptionSide::Call, 90.0, 100.0), 0.0);
            assert_eq!(intrinsic_value(OptionSide::Put, 90.0, 100.0), 10.0);
            assert!(intrinsic_value(OptionSide::Put, f64::NAN, 100.0).is_nan());
        }

        #[test]
        fn test_moneyness_guards() {
            assert!((moneyness(100.0, 120.0) - 1.2).abs() < 1e-12);
            assert!(moneyness(0.0, 120.0).is_nan());
            assert!(moneyness(100.0, f64::INFINITY).is_nan());
        }

        #[test]
        fn test_spread_pct() {
            let pct = spread_pct(Some(9.8), Some(10.2)).unwrap();
            assert!((pct - 4.0).abs() < 1e-9);
            assert!(spread_pct(Some(0.0), Some(0.0)).is_none());
            assert!(spread_pct(None, Some(1.0)).is_none());
        }
    }
}
