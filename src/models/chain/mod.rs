//! Quote normalization and option-chain assembly

pub mod builder;
pub mod quote;
pub mod types;

pub use builder::build_chain;
pub use quote::{normalize_quote, select_premium};
pub use types::*;
