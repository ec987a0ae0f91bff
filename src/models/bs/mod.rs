//! Black-Scholes-Merton primitives: normal distribution helpers, the
//! closed-form pricer, analytic Greeks and the implied-volatility solver.
//!
//! All functions are pure. Invalid inputs never panic: the pricer answers
//! NaN, everything else answers `None`.

pub mod greeks;
pub mod implied_vol;
pub mod normal;
pub mod pricing;

pub use greeks::{bs_greeks, Greeks};
pub use implied_vol::{implied_vol, IvInputs, IV_LOWER_BOUND, IV_UPPER_BOUND};
pub use normal::{norm_cdf, norm_pdf};
pub use pricing::{bs_price, prob_itm, BsInputs};
