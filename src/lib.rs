//! # Options-Lib: Option Pricing, Implied Volatility and Chain Analytics
//!
//! `options-lib` is the numerical core of an options analytics service. It turns raw
//! vendor quotes into normalized option chains, inverts premiums into implied
//! volatilities, aggregates chains into IV surfaces and reprices single contracts
//! under spot and volatility shocks.
//!
//! ## Core Features
//!
//! - **Black-Scholes-Merton**: closed-form pricing with continuous dividend yield,
//!   analytic Greeks and risk-neutral ITM probability
//! - **Implied Volatility**: bracketed bisection solver with no-arbitrage guards
//! - **Option Chains**: quote normalization under configurable premium and IV policies
//! - **IV Surfaces**: expiry x strike (or moneyness) grids with data-quality filters
//! - **Scenario Grids**: P&L across spot moves and IV shifts for one contract
//! - **Risk-Neutral Distribution**: lognormal terminal-price density at the ATM volatility
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{NaiveDate, TimeZone, Utc};
//! use options_lib::{
//!     build_chain, build_surface, default_configs, Contract, OptionSide, QuotedContract,
//!     RawQuote,
//! };
//!
//! let config = default_configs::standard();
//! let expiry = NaiveDate::from_ymd_opt(2025, 3, 21).unwrap();
//! let as_of = Utc.with_ymd_and_hms(2025, 1, 21, 15, 0, 0).unwrap();
//!
//! let contracts = vec![QuotedContract {
//!     contract: Contract::new("SPY", expiry, 100.0, OptionSide::Call),
//!     quote: RawQuote::from_bid_ask(4.9, 5.1),
//! }];
//! let chain = build_chain(&config.pricing.chain_inputs("SPY", expiry, 100.0, contracts, as_of));
//! assert_eq!(chain.rows.len(), 1);
//!
//! let surface = build_surface(&[chain], &config.surface.request());
//! println!("ATM IV: {:?}", surface.stats.atm_iv);
//! ```
//!
//! ## Configuration Presets
//!
//! - `standard()`: default filters (spread <= 10%, OI >= 20, moneyness 0.8-1.2)
//! - `strict()`: liquid underlyings only
//! - `relaxed()`: thin chains, vendor IVs trusted

// ================================================================================================
// MODULES
// ================================================================================================

pub mod config;
pub mod expiry;
pub mod market;
pub mod models;

// ================================================================================================
// PUBLIC RE-EXPORTS
// ================================================================================================

// Market inputs and configuration
pub use config::{AnalyticsConfig, PricingConfig, ScenarioConfig, SurfaceConfig};
pub use market::types::{
    normalize_symbol, Contract, IvSource, MarketParams, OptionSide, PriceSource, QuotedContract,
    RawQuote, STRIKE_EPSILON,
};

// Expiry helpers
pub use expiry::{days_to_expiry, expiry_timestamp, parse_expiry, time_to_expiry_years};

// Black-Scholes primitives
pub use models::bs::{
    bs_greeks, bs_price, implied_vol, norm_cdf, norm_pdf, prob_itm, BsInputs, Greeks, IvInputs,
};

// Chains
pub use models::chain::{
    build_chain, normalize_quote, ChainInputs, ChainRow, OptionChain, QuoteContext, ResolvedQuote,
};

// Surfaces and smiles
pub use models::surface::{
    build_smile, build_surface, AxisMode, SideSelection, SideView, Smile, SmilePoint,
    SurfaceCell, SurfaceFilters, SurfaceGrid, SurfaceRequest, SurfaceRow, SurfaceStats,
};

// Scenario analysis
pub use models::scenario::{
    build_scenario_grid, resolve_scenario_base, run_scenario, ScenarioBase, ScenarioContract,
    ScenarioExtreme, ScenarioGrid, ScenarioPriceSource, ScenarioRange, ScenarioRequest,
};

// Risk-neutral distribution
pub use models::distribution::{
    build_distribution, lognormal_grid, DistributionGrid, DistributionStats,
    RiskNeutralDistribution, SigmaSource,
};

// Single-contract analytics
pub use models::analytics::{
    analyze_contract, ContractAnalytics, ContractAnalyticsRequest, MarketSnapshot,
    ModelValuation,
};

// ================================================================================================
// DEFAULT CONFIGURATIONS
// ================================================================================================

/// Pre-configured analytics settings for common use cases.
///
/// # Available Configurations
///
/// - [`standard()`]: Default rates, filters and shocks
/// - [`strict()`]: Tight quality filters
/// - [`relaxed()`]: Loose filters for illiquid chains
pub mod default_configs {
    use crate::config::AnalyticsConfig;

    /// Default configuration.
    ///
    /// **Characteristics:**
    /// - r = 5%, q = 0.5%
    /// - Mid premiums, solved IVs
    /// - Spread <= 10%, open interest >= 20, IV <= 300%
    /// - Moneyness window 0.8 to 1.2
    ///
    /// # Example
    ///
    /// ```rust
    /// use options_lib::default_configs;
    ///
    /// let config = default_configs::standard();
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn standard() -> AnalyticsConfig {
        AnalyticsConfig::standard()
    }

    /// Tight filters for liquid underlyings.
    ///
    /// **Characteristics:**
    /// - Spread <= 5%, open interest >= 100, IV <= 200%
    /// - Moneyness window 0.9 to 1.1
    pub fn strict() -> AnalyticsConfig {
        AnalyticsConfig::strict()
    }

    /// Loose filters for thin or noisy chains.
    ///
    /// **Characteristics:**
    /// - Vendor IVs used when present
    /// - Spread <= 25%, no open interest floor
    /// - Moneyness window 0.5 to 1.5, wider scenario shocks
    pub fn relaxed() -> AnalyticsConfig {
        AnalyticsConfig::relaxed()
    }
}
