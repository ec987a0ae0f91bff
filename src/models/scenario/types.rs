use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use std::str::FromStr;

use crate::expiry::{days_to_expiry, time_to_expiry_years};
use crate::market::types::{MarketParams, OptionSide};

/// Shock range given as fractions, e.g. `-0.10..=0.10` step `0.05`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScenarioRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl ScenarioRange {
    pub fn new(min: f64, max: f64, step: f64) -> Self {
        Self { min, max, step }
    }

    /// Single-point range at zero
    pub fn flat() -> Self {
        Self::new(0.0, 0.0, 0.05)
    }

    /// Describe what is wrong with the range, if anything
    pub fn problem(&self) -> Option<String> {
        if !self.min.is_finite() || !self.max.is_finite() || !self.step.is_finite() {
            return Some("range bounds and step must be finite".to_string());
        }
        if self.step <= 0.0 {
            return Some(format!("step must be positive (got {})", self.step));
        }
        if self.min > self.max {
            return Some(format!("min {} exceeds max {}", self.min, self.max));
        }
        None
    }
}

/// Premium basis for the scenario base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ScenarioPriceSource {
    #[default]
    Mid,
    Bid,
    Ask,
    /// Black-Scholes value at the vendor IV
    Model,
}

impl ScenarioPriceSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ScenarioPriceSource::Mid => "mid",
            ScenarioPriceSource::Bid => "bid",
            ScenarioPriceSource::Ask => "ask",
            ScenarioPriceSource::Model => "model",
        }
    }
}

impl fmt::Display for ScenarioPriceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioPriceSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mid" => Ok(ScenarioPriceSource::Mid),
            "bid" => Ok(ScenarioPriceSource::Bid),
            "ask" => Ok(ScenarioPriceSource::Ask),
            "model" => Ok(ScenarioPriceSource::Model),
            other => Err(anyhow!(
                "Invalid scenario price source: {} (expected mid, bid, ask or model)",
                other
            )),
        }
    }
}

/// The contract being shocked
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScenarioContract {
    pub side: OptionSide,
    pub spot: f64,
    pub strike: f64,
    pub params: MarketParams,
    /// Exact time to expiry. The base and every grid cell are priced from it.
    pub t_years: f64,
    /// Whole calendar days to expiry; the horizon is clamped to this
    pub dte_days: f64,
}

impl ScenarioContract {
    /// Contract valued at `as_of`. `None` once the expiry has passed.
    pub fn at(
        side: OptionSide,
        spot: f64,
        strike: f64,
        params: MarketParams,
        expiry: NaiveDate,
        as_of: DateTime<Utc>,
    ) -> Option<Self> {
        let t_years = time_to_expiry_years(expiry, as_of)?;
        let dte_days = days_to_expiry(expiry, as_of)? as f64;
        Some(Self {
            side,
            spot,
            strike,
            params,
            t_years,
            dte_days,
        })
    }
}

/// Resolved base premium and volatility
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScenarioBase {
    pub price_source: ScenarioPriceSource,
    pub premium: Option<f64>,
    pub sigma: Option<f64>,
    /// S·e^((r-q)t)
    pub forward: Option<f64>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScenarioRequest {
    pub contract: ScenarioContract,
    pub base_premium: Option<f64>,
    pub base_sigma: Option<f64>,
    /// Days forward in time, clamped to `[0, dte]`
    pub horizon_days: f64,
    pub spot_range: ScenarioRange,
    pub iv_range: ScenarioRange,
}

impl ScenarioRequest {
    pub fn from_base(
        contract: ScenarioContract,
        base: &ScenarioBase,
        horizon_days: f64,
        spot_range: ScenarioRange,
        iv_range: ScenarioRange,
    ) -> Self {
        Self {
            contract,
            base_premium: base.premium,
            base_sigma: base.sigma,
            horizon_days,
            spot_range,
            iv_range,
        }
    }
}

/// A grid cell with its shock coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScenarioExtreme {
    pub spot_move: f64,
    pub iv_shift: f64,
    pub pnl: f64,
}

/// Repriced premium and P&L across spot moves and IV shifts.
///
/// `price[i][j]` and `pnl[i][j]` belong to `iv_shifts[i]` and
/// `spot_moves[j]`. A cell the pricer could not value is `None`.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScenarioGrid {
    pub spot_moves: Vec<f64>,
    pub iv_shifts: Vec<f64>,
    pub price: Vec<Vec<Option<f64>>>,
    pub pnl: Vec<Vec<Option<f64>>>,
    pub base_premium: Option<f64>,
    pub base_sigma: Option<f64>,
    /// Horizon after clamping
    pub horizon_days: f64,
    /// Remaining time to expiry at the horizon, in years
    pub t_eff: f64,
    pub pnl_min: Option<f64>,
    pub pnl_max: Option<f64>,
    pub best: Option<ScenarioExtreme>,
    pub worst: Option<ScenarioExtreme>,
    pub warnings: Vec<String>,
}

impl ScenarioGrid {
    pub fn is_empty(&self) -> bool {
        self.price.is_empty()
    }

    pub fn pnl_at(&self, iv_index: usize, spot_index: usize) -> Option<f64> {
        self.pnl.get(iv_index)?.get(spot_index).copied().flatten()
    }
}
