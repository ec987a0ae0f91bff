#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use options_lib::{
    build_chain, AnalyticsConfig, Contract, OptionChain, OptionSide, QuotedContract, RawQuote,
};
use serde::Deserialize;

/// Spot the fixture chain was generated at
pub const SAMPLE_SPOT: f64 = 100.0;

/// Path of the fixture chain
pub const SAMPLE_CHAIN: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/sample_chain.csv");

/// CSV row structure matching the fixture format
#[derive(Debug, Deserialize)]
struct CsvRow {
    symbol: String,
    expiry: String,
    side: String,
    strike: f64,
    bid: Option<f64>,
    ask: Option<f64>,
    last: Option<f64>,
    volume: Option<f64>,
    open_interest: Option<f64>,
    vendor_iv: Option<f64>,
}

/// Valuation instant the fixture was generated for
pub fn sample_as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 21, 15, 0, 0).unwrap()
}

pub fn march_expiry() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 21).unwrap()
}

pub fn april_expiry() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 4, 17).unwrap()
}

/// Load quoted contracts from a CSV file
pub fn load_quotes(file_path: &str) -> Result<Vec<QuotedContract>, Box<dyn std::error::Error>> {
    let mut reader = csv::Reader::from_path(file_path)?;
    let mut quotes = Vec::new();

    for result in reader.deserialize() {
        let row: CsvRow = result?;
        let expiry = options_lib::parse_expiry(&row.expiry)?;
        let side: OptionSide = row.side.parse()?;

        quotes.push(QuotedContract {
            contract: Contract::new(row.symbol, expiry, row.strike, side),
            quote: RawQuote {
                bid: row.bid,
                ask: row.ask,
                last: row.last,
                volume: row.volume,
                open_interest: row.open_interest,
                vendor_iv: row.vendor_iv,
            },
        });
    }

    Ok(quotes)
}

/// Build one chain per fixture expiry with the given configuration
pub fn load_sample_chains(config: &AnalyticsConfig) -> Vec<OptionChain> {
    let quotes = load_quotes(SAMPLE_CHAIN).expect("fixture chain should load");
    [march_expiry(), april_expiry()]
        .into_iter()
        .map(|expiry| {
            let contracts = quotes
                .iter()
                .filter(|q| q.contract.expiry == expiry)
                .cloned()
                .collect();
            build_chain(&config.pricing.chain_inputs(
                "SPY",
                expiry,
                SAMPLE_SPOT,
                contracts,
                sample_as_of(),
            ))
        })
        .collect()
}
