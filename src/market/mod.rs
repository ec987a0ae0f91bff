//! Market inputs: contracts, raw quotes and pricing policies

pub mod types;

pub use types::*;
