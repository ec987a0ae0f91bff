//! Spot x volatility shock grids for a single contract

pub mod base;
pub mod grid;
pub mod types;

pub use base::{resolve_scenario_base, DEFAULT_SCENARIO_SIGMA};
pub use grid::{axis_truncated, build_axis, build_scenario_grid, MAX_AXIS_POINTS};
pub use types::*;

use crate::market::types::RawQuote;

/// Resolve the base from a quote and build the grid in one step. Warnings
/// from base resolution come first.
pub fn run_scenario(
    quote: &RawQuote,
    price_source: ScenarioPriceSource,
    contract: ScenarioContract,
    horizon_days: f64,
    spot_range: ScenarioRange,
    iv_range: ScenarioRange,
) -> ScenarioGrid {
    let base = resolve_scenario_base(quote, price_source, &contract);
    let request = ScenarioRequest::from_base(contract, &base, horizon_days, spot_range, iv_range);
    let mut grid = build_scenario_grid(&request);

    let mut warnings = base.warnings;
    warnings.append(&mut grid.warnings);
    grid.warnings = warnings;
    grid
}
