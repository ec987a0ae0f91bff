use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};

use crate::market::types::{IvSource, MarketParams, PriceSource, QuotedContract};
use crate::models::bs::IV_UPPER_BOUND;
use crate::models::chain::types::ChainInputs;
use crate::models::scenario::types::{
    ScenarioBase, ScenarioContract, ScenarioPriceSource, ScenarioRange, ScenarioRequest,
};
use crate::models::surface::types::{AxisMode, SideView, SurfaceFilters, SurfaceRequest};

/// Rates and quote policies used when normalizing chains
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PricingConfig {
    /// Risk-free rate (continuous)
    #[cfg_attr(feature = "serde", serde(default = "default_r"))]
    pub r: f64,

    /// Dividend yield (continuous)
    #[cfg_attr(feature = "serde", serde(default = "default_q"))]
    pub q: f64,

    #[cfg_attr(feature = "serde", serde(default))]
    pub price_source: PriceSource,

    #[cfg_attr(feature = "serde", serde(default))]
    pub iv_source: IvSource,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            r: default_r(),
            q: default_q(),
            price_source: PriceSource::default(),
            iv_source: IvSource::default(),
        }
    }
}

impl PricingConfig {
    pub fn market_params(&self) -> MarketParams {
        MarketParams { r: self.r, q: self.q }
    }

    /// Chain inputs carrying this configuration's rates and policies
    pub fn chain_inputs(
        &self,
        symbol: &str,
        expiry: NaiveDate,
        spot: f64,
        contracts: Vec<QuotedContract>,
        as_of: DateTime<Utc>,
    ) -> ChainInputs {
        ChainInputs {
            symbol: symbol.to_string(),
            expiry,
            spot,
            contracts,
            params: self.market_params(),
            price_source: self.price_source,
            iv_source: self.iv_source,
            as_of,
        }
    }
}

/// Surface view and quality filters
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SurfaceConfig {
    #[cfg_attr(feature = "serde", serde(default))]
    pub side_view: SideView,

    #[cfg_attr(feature = "serde", serde(default))]
    pub axis_mode: AxisMode,

    /// Maximum bid-ask spread, percent of mid
    #[cfg_attr(feature = "serde", serde(default = "default_max_spread_pct"))]
    pub max_spread_pct: f64,

    #[cfg_attr(feature = "serde", serde(default = "default_min_open_interest"))]
    pub min_open_interest: f64,

    /// IV plausibility ceiling (decimal)
    #[cfg_attr(feature = "serde", serde(default = "default_max_iv"))]
    pub max_iv: f64,

    #[cfg_attr(feature = "serde", serde(default = "default_moneyness_min"))]
    pub moneyness_min: f64,

    #[cfg_attr(feature = "serde", serde(default = "default_moneyness_max"))]
    pub moneyness_max: f64,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            side_view: SideView::default(),
            axis_mode: AxisMode::default(),
            max_spread_pct: default_max_spread_pct(),
            min_open_interest: default_min_open_interest(),
            max_iv: default_max_iv(),
            moneyness_min: default_moneyness_min(),
            moneyness_max: default_moneyness_max(),
        }
    }
}

impl SurfaceConfig {
    pub fn request(&self) -> SurfaceRequest {
        SurfaceRequest {
            side_view: self.side_view,
            axis_mode: self.axis_mode,
            filters: SurfaceFilters {
                max_spread_pct: self.max_spread_pct,
                min_open_interest: self.min_open_interest,
                max_iv: self.max_iv,
                moneyness_min: self.moneyness_min,
                moneyness_max: self.moneyness_max,
            },
        }
    }
}

/// Default shocks for scenario grids
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScenarioConfig {
    #[cfg_attr(feature = "serde", serde(default))]
    pub price_source: ScenarioPriceSource,

    #[cfg_attr(feature = "serde", serde(default))]
    pub horizon_days: f64,

    #[cfg_attr(feature = "serde", serde(default = "default_spot_range"))]
    pub spot_range: ScenarioRange,

    #[cfg_attr(feature = "serde", serde(default = "default_iv_range"))]
    pub iv_range: ScenarioRange,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            price_source: ScenarioPriceSource::default(),
            horizon_days: 0.0,
            spot_range: default_spot_range(),
            iv_range: default_iv_range(),
        }
    }
}

impl ScenarioConfig {
    /// Grid request for a resolved base using the configured shocks
    pub fn request(&self, contract: ScenarioContract, base: &ScenarioBase) -> ScenarioRequest {
        ScenarioRequest::from_base(contract, base, self.horizon_days, self.spot_range, self.iv_range)
    }
}

/// Top-level configuration, usually loaded from TOML
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnalyticsConfig {
    #[cfg_attr(feature = "serde", serde(default))]
    pub pricing: PricingConfig,

    #[cfg_attr(feature = "serde", serde(default))]
    pub surface: SurfaceConfig,

    #[cfg_attr(feature = "serde", serde(default))]
    pub scenario: ScenarioConfig,
}

impl AnalyticsConfig {
    /// Default filters and rates
    pub fn standard() -> Self {
        Self::default()
    }

    /// Tight filters for liquid underlyings
    pub fn strict() -> Self {
        Self {
            pricing: PricingConfig::default(),
            surface: SurfaceConfig {
                max_spread_pct: 5.0,
                min_open_interest: 100.0,
                max_iv: 2.0,
                moneyness_min: 0.9,
                moneyness_max: 1.1,
                ..SurfaceConfig::default()
            },
            scenario: ScenarioConfig::default(),
        }
    }

    /// Loose filters for thin chains; trusts vendor IVs when present
    pub fn relaxed() -> Self {
        Self {
            pricing: PricingConfig {
                iv_source: IvSource::Vendor,
                ..PricingConfig::default()
            },
            surface: SurfaceConfig {
                max_spread_pct: 25.0,
                min_open_interest: 0.0,
                moneyness_min: 0.5,
                moneyness_max: 1.5,
                ..SurfaceConfig::default()
            },
            scenario: ScenarioConfig {
                spot_range: ScenarioRange::new(-0.3, 0.3, 0.05),
                iv_range: ScenarioRange::new(-0.5, 0.5, 0.1),
                ..ScenarioConfig::default()
            },
        }
    }

    /// Parse and validate a TOML document; missing keys take defaults
    #[cfg(feature = "serde")]
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: AnalyticsConfig =
            toml::from_str(text).map_err(|e| anyhow!("Failed to parse analytics config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "serde")]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        use anyhow::Context;

        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        let pricing = &self.pricing;
        if !pricing.r.is_finite() || !pricing.q.is_finite() {
            return Err(anyhow!("Rates must be finite: r={}, q={}", pricing.r, pricing.q));
        }

        let surface = &self.surface;
        if !surface.max_spread_pct.is_finite() || surface.max_spread_pct <= 0.0 {
            return Err(anyhow!("max_spread_pct must be positive: {}", surface.max_spread_pct));
        }
        if !surface.min_open_interest.is_finite() || surface.min_open_interest < 0.0 {
            return Err(anyhow!(
                "min_open_interest must be non-negative: {}",
                surface.min_open_interest
            ));
        }
        if !(surface.max_iv > 0.0 && surface.max_iv <= IV_UPPER_BOUND) {
            return Err(anyhow!(
                "max_iv must be in (0, {}]: {}",
                IV_UPPER_BOUND,
                surface.max_iv
            ));
        }
        if !(surface.moneyness_min > 0.0 && surface.moneyness_min < surface.moneyness_max)
            || !surface.moneyness_max.is_finite()
        {
            return Err(anyhow!(
                "Invalid moneyness window: [{}, {}]",
                surface.moneyness_min,
                surface.moneyness_max
            ));
        }

        let scenario = &self.scenario;
        if !scenario.horizon_days.is_finite() || scenario.horizon_days < 0.0 {
            return Err(anyhow!("horizon_days must be non-negative: {}", scenario.horizon_days));
        }
        if let Some(problem) = scenario.spot_range.problem() {
            return Err(anyhow!("Invalid spot_range: {}", problem));
        }
        if let Some(problem) = scenario.iv_range.problem() {
            return Err(anyhow!("Invalid iv_range: {}", problem));
        }
        Ok(())
    }
}

fn default_r() -> f64 {
    0.05
}

fn default_q() -> f64 {
    0.005
}

fn default_max_spread_pct() -> f64 {
    10.0
}

fn default_min_open_interest() -> f64 {
    20.0
}

fn default_max_iv() -> f64 {
    crate::models::surface::types::MAX_SURFACE_IV
}

fn default_moneyness_min() -> f64 {
    0.8
}

fn default_moneyness_max() -> f64 {
    1.2
}

fn default_spot_range() -> ScenarioRange {
    ScenarioRange::new(-0.10, 0.10, 0.05)
}

fn default_iv_range() -> ScenarioRange {
    ScenarioRange::new(-0.20, 0.20, 0.10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        for config in [
            AnalyticsConfig::standard(),
            AnalyticsConfig::strict(),
            AnalyticsConfig::relaxed(),
        ] {
            config.validate().unwrap();
        }
    }

    #[test]
    fn test_surface_request_matches_filter_defaults() {
        let request = AnalyticsConfig::standard().surface.request();
        assert_eq!(request, SurfaceRequest::default());
    }

    #[test]
    fn test_validate_rejects_bad_window() {
        let mut config = AnalyticsConfig::standard();
        config.surface.moneyness_min = 1.3;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("moneyness window"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_partial_toml_takes_defaults() {
        let config = AnalyticsConfig::from_toml_str(
            r#"
            [pricing]
            r = 0.043
            iv_source = "vendor"

            [surface]
            axis_mode = "moneyness"
            min_open_interest = 50.0

            [scenario]
            price_source = "model"
            spot_range = { min = -0.2, max = 0.2, step = 0.1 }
            "#,
        )
        .unwrap();

        assert_eq!(config.pricing.r, 0.043);
        assert_eq!(config.pricing.q, 0.005);
        assert_eq!(config.pricing.iv_source, IvSource::Vendor);
        assert_eq!(config.surface.axis_mode, AxisMode::Moneyness);
        assert_eq!(config.surface.max_spread_pct, 10.0);
        assert_eq!(config.scenario.price_source, ScenarioPriceSource::Model);
        assert_eq!(config.scenario.iv_range, default_iv_range());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_invalid_toml_reports_error() {
        assert!(AnalyticsConfig::from_toml_str("[surface]\nmax_iv = 9.0").is_err());
        assert!(AnalyticsConfig::from_toml_str("pricing = 3").is_err());
        assert!(AnalyticsConfig::from_file("does/not/exist.toml").is_err());
    }
}
