use super::normal::{norm_cdf, norm_pdf};
use super::pricing::{d1_d2, BsInputs};
use crate::market::types::OptionSide;

/// First and second order Black-Scholes sensitivities.
///
/// - Vega is per 1.00 of volatility (divide by 100 for a one-point move).
/// - Theta is annualized.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub vega: f64,
    pub theta: f64,
    pub rho: f64,
}

/// Closed-form Greeks. `None` when the inputs are not priceable or any
/// sensitivity comes out non-finite.
pub fn bs_greeks(inputs: &BsInputs) -> Option<Greeks> {
    let state = d1_d2(inputs)?;
    let BsInputs {
        side,
        spot,
        r,
        q,
        t,
        sigma,
        ..
    } = *inputs;

    let pdf = norm_pdf(state.d1);
    let carry = (-q * t).exp();

    let delta = match side {
        OptionSide::Call => carry * norm_cdf(state.d1),
        OptionSide::Put => carry * (norm_cdf(state.d1) - 1.0),
    };
    let gamma = carry * pdf / (spot * sigma * state.sqrt_t);
    let vega = state.discounted_spot * pdf * state.sqrt_t;

    let theta_base = -(state.discounted_spot * pdf * sigma) / (2.0 * state.sqrt_t);
    let theta = match side {
        OptionSide::Call => {
            theta_base - r * state.discounted_strike * norm_cdf(state.d2)
                + q * state.discounted_spot * norm_cdf(state.d1)
        }
        OptionSide::Put => {
            theta_base + r * state.discounted_strike * norm_cdf(-state.d2)
                - q * state.discounted_spot * norm_cdf(-state.d1)
        }
    };
    let rho = match side {
        OptionSide::Call => state.discounted_strike * t * norm_cdf(state.d2),
        OptionSide::Put => -state.discounted_strike * t * norm_cdf(-state.d2),
    };

    let greeks = Greeks {
        delta,
        gamma,
        vega,
        theta,
        rho,
    };
    [delta, gamma, vega, theta, rho]
        .iter()
        .all(|v| v.is_finite())
        .then_some(greeks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bs::pricing::bs_price;

    fn inputs(side: OptionSide) -> BsInputs {
        BsInputs {
            side,
            spot: 100.0,
            strike: 105.0,
            r: 0.03,
            q: 0.01,
            t: 0.5,
            sigma: 0.25,
        }
    }

    #[test]
    fn test_delta_signs_and_parity() {
        let call = bs_greeks(&inputs(OptionSide::Call)).unwrap();
        let put = bs_greeks(&inputs(OptionSide::Put)).unwrap();
        assert!(call.delta > 0.0 && call.delta < 1.0);
        assert!(put.delta < 0.0 && put.delta > -1.0);
        // call delta - put delta = e^{-qT}
        assert!((call.delta - put.delta - (-0.01f64 * 0.5).exp()).abs() < 1e-9);
        // gamma and vega do not depend on side
        assert!((call.gamma - put.gamma).abs() < 1e-12);
        assert!((call.vega - put.vega).abs() < 1e-12);
        assert!(call.rho > 0.0 && put.rho < 0.0);
    }

    #[test]
    fn test_against_finite_differences() {
        let base = inputs(OptionSide::Call);
        let greeks = bs_greeks(&base).unwrap();

        let h = 1e-3;
        let up = bs_price(&BsInputs {
            spot: base.spot + h,
            ..base
        });
        let down = bs_price(&BsInputs {
            spot: base.spot - h,
            ..base
        });
        let fd_delta = (up - down) / (2.0 * h);
        assert!((fd_delta - greeks.delta).abs() < 1e-4);

        let vol_up = bs_price(&base.with_sigma(base.sigma + h));
        let vol_down = bs_price(&base.with_sigma(base.sigma - h));
        let fd_vega = (vol_up - vol_down) / (2.0 * h);
        assert!((fd_vega - greeks.vega).abs() < 1e-3);

        // theta is the derivative with respect to calendar time, i.e. -dV/dT
        let t_up = bs_price(&BsInputs { t: base.t + h, ..base });
        let t_down = bs_price(&BsInputs { t: base.t - h, ..base });
        let fd_theta = -(t_up - t_down) / (2.0 * h);
        assert!((fd_theta - greeks.theta).abs() < 1e-3);
    }

    #[test]
    fn test_no_greeks_without_volatility() {
        let base = inputs(OptionSide::Put);
        assert!(bs_greeks(&base.with_sigma(0.0)).is_none());
        assert!(bs_greeks(&base.with_sigma(f64::NAN)).is_none());
    }
}
