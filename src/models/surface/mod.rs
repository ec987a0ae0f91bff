//! Implied-volatility surface and single-expiry smiles built from option chains

pub mod aggregate;
pub mod selection;
pub mod smile;
pub mod types;

pub use aggregate::build_surface;
pub use selection::{select_samples, side_selection, SideSelection};
pub use smile::{build_smile, AtmQuote, Smile, SmilePoint};
pub use types::*;
