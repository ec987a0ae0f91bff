use std::f64::consts::{PI, SQRT_2};

/// Standard normal cumulative distribution function.
///
/// Uses the Abramowitz-Stegun 7.1.26 approximation of `erf` (absolute error
/// around 1.5e-7). Returns NaN for non-finite input.
pub fn norm_cdf(x: f64) -> f64 {
    if !x.is_finite() {
        return f64::NAN;
    }
    0.5 * (1.0 + erf(x / SQRT_2))
}

/// Standard normal probability density function. Returns NaN for non-finite input.
pub fn norm_pdf(x: f64) -> f64 {
    if !x.is_finite() {
        return f64::NAN;
    }
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Error function approximation
fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cdf_center_and_tails() {
        assert!((norm_cdf(0.0) - 0.5).abs() < 1e-8);
        assert!(norm_cdf(8.0) > 0.999_999);
        assert!(norm_cdf(-8.0) < 1e-6);
        assert!((norm_cdf(1.96) - 0.975).abs() < 1e-4);
    }

    #[test]
    fn test_cdf_symmetry() {
        for i in -60..=60 {
            let x = i as f64 * 0.1;
            assert!((norm_cdf(x) + norm_cdf(-x) - 1.0).abs() < 1e-12, "x={}", x);
        }
    }

    #[test]
    fn test_non_finite_inputs() {
        assert!(norm_cdf(f64::NAN).is_nan());
        assert!(norm_cdf(f64::INFINITY).is_nan());
        assert!(norm_pdf(f64::NEG_INFINITY).is_nan());
    }

    #[test]
    fn test_pdf_peak() {
        assert!((norm_pdf(0.0) - 0.398_942_280_4).abs() < 1e-9);
        assert!((norm_pdf(1.0) - norm_pdf(-1.0)).abs() < 1e-15);
    }
}
