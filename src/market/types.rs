use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

/// Option side: call or put
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum OptionSide {
    Call,
    Put,
}

impl OptionSide {
    pub fn is_call(self) -> bool {
        matches!(self, OptionSide::Call)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OptionSide::Call => "call",
            OptionSide::Put => "put",
        }
    }
}

impl fmt::Display for OptionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionSide {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "call" | "c" => Ok(OptionSide::Call),
            "put" | "p" => Ok(OptionSide::Put),
            other => Err(anyhow!("Invalid option side: {} (expected call or put)", other)),
        }
    }
}

/// Which quoted field is used as the option premium
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PriceSource {
    #[default]
    Mid,
    Bid,
    Ask,
    Last,
}

impl PriceSource {
    pub const ALL: [PriceSource; 4] = [
        PriceSource::Mid,
        PriceSource::Bid,
        PriceSource::Ask,
        PriceSource::Last,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PriceSource::Mid => "mid",
            PriceSource::Bid => "bid",
            PriceSource::Ask => "ask",
            PriceSource::Last => "last",
        }
    }
}

impl fmt::Display for PriceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriceSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mid" => Ok(PriceSource::Mid),
            "bid" => Ok(PriceSource::Bid),
            "ask" => Ok(PriceSource::Ask),
            "last" => Ok(PriceSource::Last),
            other => Err(anyhow!(
                "Invalid price source: {} (expected mid, bid, ask or last)",
                other
            )),
        }
    }
}

/// Where a quote's implied volatility comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum IvSource {
    /// Always invert the selected premium
    #[default]
    Solved,
    /// Trust the vendor IV when present, invert the premium otherwise
    Vendor,
}

impl FromStr for IvSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "solved" | "mid" => Ok(IvSource::Solved),
            "vendor" | "yahoo" => Ok(IvSource::Vendor),
            other => Err(anyhow!(
                "Invalid IV source: {} (expected solved or vendor)",
                other
            )),
        }
    }
}

/// Rate inputs that are supplied by the caller rather than read from quotes
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MarketParams {
    /// Continuously compounded risk-free rate
    pub r: f64,
    /// Continuous dividend yield
    pub q: f64,
}

impl Default for MarketParams {
    fn default() -> Self {
        Self { r: 0.05, q: 0.005 }
    }
}

/// Identity of a listed option. Two contracts are the same instrument when
/// symbol, expiry, strike and side all match.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Contract {
    pub symbol: String,
    pub expiry: NaiveDate,
    pub strike: f64,
    pub side: OptionSide,
}

impl Contract {
    pub fn new(symbol: impl Into<String>, expiry: NaiveDate, strike: f64, side: OptionSide) -> Self {
        Self {
            symbol: normalize_symbol(&symbol.into()),
            expiry,
            strike,
            side,
        }
    }

    /// Same instrument, with strikes compared to within `STRIKE_EPSILON`
    pub fn same_instrument(&self, other: &Contract) -> bool {
        self.symbol == other.symbol
            && self.expiry == other.expiry
            && self.side == other.side
            && (self.strike - other.strike).abs() < STRIKE_EPSILON
    }
}

/// Strikes closer than this are treated as the same strike
pub const STRIKE_EPSILON: f64 = 1e-6;

/// Raw market observation for one contract. Every field may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RawQuote {
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub last: Option<f64>,
    pub volume: Option<f64>,
    pub open_interest: Option<f64>,
    /// Implied volatility reported by the data vendor (decimal)
    pub vendor_iv: Option<f64>,
}

impl RawQuote {
    pub fn from_bid_ask(bid: f64, ask: f64) -> Self {
        Self {
            bid: Some(bid),
            ask: Some(ask),
            ..Self::default()
        }
    }

    /// True when at least one pricing signal (bid/ask pair, last, vendor IV) is present
    pub fn has_pricing_signal(&self) -> bool {
        let pair = finite(self.bid).is_some() && finite(self.ask).is_some();
        pair || finite(self.last).is_some() || finite(self.vendor_iv).is_some()
    }
}

/// A contract together with its latest quote
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuotedContract {
    pub contract: Contract,
    pub quote: RawQuote,
}

/// Trim and upper-case a ticker symbol
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Keep a value only when it is a finite number
pub(crate) fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}
