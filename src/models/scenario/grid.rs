use tracing::debug;

use super::types::{ScenarioExtreme, ScenarioGrid, ScenarioRange, ScenarioRequest};
use crate::expiry::DAYS_PER_YEAR;
use crate::models::bs::{bs_price, BsInputs};

/// Axis length cap
pub const MAX_AXIS_POINTS: usize = 400;
/// Floor on time and volatility when repricing
pub const SCENARIO_EPSILON: f64 = 1e-6;
/// Base sigma above this draws a warning
pub const HIGH_SIGMA_WARNING: f64 = 3.0;
/// Base sigma below this draws a warning
pub const LOW_SIGMA_WARNING: f64 = 0.05;

/// Shock values `min + i·step` up to `max` (with 1e-12 slack), rounded to six
/// decimals. Empty for an invalid range.
pub fn build_axis(range: &ScenarioRange) -> Vec<f64> {
    if range.problem().is_some() {
        return Vec::new();
    }
    (0..MAX_AXIS_POINTS)
        .map(|i| range.min + i as f64 * range.step)
        .take_while(|value| *value <= range.max + 1e-12)
        .map(|value| (value * 1e6).round() / 1e6)
        .collect()
}

/// True when the range has more than [`MAX_AXIS_POINTS`] points and the axis stops short of `max`
pub fn axis_truncated(range: &ScenarioRange) -> bool {
    range.problem().is_none()
        && range.min + MAX_AXIS_POINTS as f64 * range.step <= range.max + 1e-12
}

/// Reprice one contract across every `(iv_shift, spot_move)` pair.
///
/// Never fails: invalid ranges and missing base inputs become warnings and
/// leave the grids empty.
pub fn build_scenario_grid(request: &ScenarioRequest) -> ScenarioGrid {
    let contract = &request.contract;
    let mut warnings = Vec::new();

    for (label, range) in [("spot", &request.spot_range), ("iv", &request.iv_range)] {
        if let Some(problem) = range.problem() {
            warnings.push(format!("Invalid {} range: {}", label, problem));
        } else if axis_truncated(range) {
            warnings.push(format!(
                "{} range truncated to {} points.",
                label, MAX_AXIS_POINTS
            ));
        }
    }
    let spot_moves = build_axis(&request.spot_range);
    let iv_shifts = build_axis(&request.iv_range);

    let dte = if contract.dte_days.is_finite() {
        contract.dte_days.max(0.0)
    } else {
        0.0
    };
    let mut horizon_days = request.horizon_days;
    if !horizon_days.is_finite() || horizon_days < 0.0 {
        warnings.push("Horizon must be a non-negative number of days. Using 0.".to_string());
        horizon_days = 0.0;
    }
    if horizon_days > dte {
        warnings.push(format!(
            "Horizon exceeds DTE ({} days). Clamped to expiry.",
            dte
        ));
        horizon_days = dte;
    }
    let t_years = if contract.t_years.is_finite() && contract.t_years > 0.0 {
        contract.t_years
    } else {
        dte / DAYS_PER_YEAR
    };
    let t_eff = (t_years - horizon_days / DAYS_PER_YEAR).max(SCENARIO_EPSILON);

    let base_premium = request.base_premium.filter(|p| p.is_finite() && *p > 0.0);
    let base_sigma = request.base_sigma.filter(|s| s.is_finite() && *s > 0.0);
    let spot_ok = contract.spot.is_finite() && contract.spot > 0.0;
    let strike_ok = contract.strike.is_finite() && contract.strike > 0.0;

    if base_premium.is_none() {
        warnings.push("Base premium unavailable.".to_string());
    }
    match base_sigma {
        None => warnings.push("Base implied volatility unavailable.".to_string()),
        Some(sigma) if sigma > HIGH_SIGMA_WARNING => {
            warnings.push("Implied volatility exceeds 300%.".to_string())
        }
        Some(sigma) if sigma < LOW_SIGMA_WARNING => {
            warnings.push("Implied volatility below 5%.".to_string())
        }
        Some(_) => {}
    }
    if !spot_ok {
        warnings.push("Spot price unavailable.".to_string());
    }
    if !strike_ok {
        warnings.push("Strike must be a positive number.".to_string());
    }

    let mut grid = ScenarioGrid {
        spot_moves,
        iv_shifts,
        base_premium,
        base_sigma,
        horizon_days,
        t_eff,
        ..ScenarioGrid::default()
    };

    let (Some(premium), Some(sigma)) = (base_premium, base_sigma) else {
        grid.warnings = warnings;
        return grid;
    };
    if !spot_ok || !strike_ok || grid.spot_moves.is_empty() || grid.iv_shifts.is_empty() {
        grid.warnings = warnings;
        return grid;
    }

    let base_inputs = BsInputs::new(
        contract.side,
        contract.spot,
        contract.strike,
        contract.params,
        t_eff,
        sigma,
    );

    for &iv_shift in &grid.iv_shifts {
        let scenario_sigma = (sigma * (1.0 + iv_shift)).max(SCENARIO_EPSILON);
        let mut price_row = Vec::with_capacity(grid.spot_moves.len());
        let mut pnl_row = Vec::with_capacity(grid.spot_moves.len());

        for &spot_move in &grid.spot_moves {
            let inputs = BsInputs {
                spot: contract.spot * (1.0 + spot_move),
                sigma: scenario_sigma,
                ..base_inputs
            };
            let price = Some(bs_price(&inputs)).filter(|p| p.is_finite());
            let pnl = price.map(|p| p - premium);

            if let Some(pnl) = pnl {
                grid.pnl_min = Some(grid.pnl_min.map_or(pnl, |min| min.min(pnl)));
                grid.pnl_max = Some(grid.pnl_max.map_or(pnl, |max| max.max(pnl)));
                let cell = ScenarioExtreme {
                    spot_move,
                    iv_shift,
                    pnl,
                };
                // strict comparisons: first encountered wins ties
                if grid.best.map_or(true, |best| pnl > best.pnl) {
                    grid.best = Some(cell);
                }
                if grid.worst.map_or(true, |worst| pnl < worst.pnl) {
                    grid.worst = Some(cell);
                }
            }
            price_row.push(price);
            pnl_row.push(pnl);
        }
        grid.price.push(price_row);
        grid.pnl.push(pnl_row);
    }

    debug!(
        side = %contract.side,
        strike = contract.strike,
        rows = grid.iv_shifts.len(),
        columns = grid.spot_moves.len(),
        t_eff,
        "built scenario grid"
    );

    grid.warnings = warnings;
    grid
}
