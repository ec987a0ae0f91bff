use tracing::{debug, warn};

use super::quote::normalize_quote;
use super::types::{ChainInputs, ChainRow, OptionChain, QuoteContext};
use crate::expiry::{days_to_expiry, time_to_expiry_years};
use crate::market::types::{normalize_symbol, OptionSide, QuotedContract, STRIKE_EPSILON};

/// Build a normalized option chain for one `(symbol, expiry)`.
///
/// Every contract is run through [`normalize_quote`] and grouped into rows
/// keyed by strike, sorted ascending. Contracts belonging to another symbol
/// or expiry, contracts with a non-positive strike and contracts without
/// any pricing signal are skipped. When the same side is observed twice at
/// one strike the first observation is kept.
pub fn build_chain(inputs: &ChainInputs) -> OptionChain {
    let symbol = normalize_symbol(&inputs.symbol);
    let t_years = time_to_expiry_years(inputs.expiry, inputs.as_of);
    let dte_days = days_to_expiry(inputs.expiry, inputs.as_of);

    if t_years.is_none() {
        debug!(%symbol, expiry = %inputs.expiry, "expiry has passed, quotes will not be inverted");
    }
    if !inputs.spot.is_finite() || inputs.spot <= 0.0 {
        warn!(%symbol, spot = inputs.spot, "unusable spot price, chain cannot be priced");
    }

    let mut accepted: Vec<&QuotedContract> = inputs
        .contracts
        .iter()
        .filter(|entry| accept_contract(entry, &symbol, inputs))
        .collect();
    // stable: equal strikes keep observation order
    accepted.sort_by(|a, b| a.contract.strike.total_cmp(&b.contract.strike));

    let mut rows: Vec<ChainRow> = Vec::new();
    for entry in accepted {
        let strike = entry.contract.strike;
        let side = entry.contract.side;

        let same_strike = rows
            .last()
            .is_some_and(|row| (row.strike - strike).abs() < STRIKE_EPSILON);
        if !same_strike {
            rows.push(ChainRow {
                strike,
                call: None,
                put: None,
            });
        }
        let Some(row) = rows.last_mut() else {
            continue;
        };

        let slot = match side {
            OptionSide::Call => &mut row.call,
            OptionSide::Put => &mut row.put,
        };
        if slot.is_some() {
            debug!(%symbol, strike, %side, "duplicate contract, keeping first observation");
            continue;
        }

        let ctx = QuoteContext {
            side,
            spot: inputs.spot,
            strike,
            t_years,
            params: inputs.params,
            price_source: inputs.price_source,
            iv_source: inputs.iv_source,
        };
        *slot = Some(normalize_quote(&entry.quote, &ctx));
    }

    debug!(
        %symbol,
        expiry = %inputs.expiry,
        contracts = inputs.contracts.len(),
        rows = rows.len(),
        "built option chain"
    );

    OptionChain {
        symbol,
        expiry: inputs.expiry,
        spot: inputs.spot,
        t_years,
        dte_days,
        params: inputs.params,
        price_source: inputs.price_source,
        iv_source: inputs.iv_source,
        rows,
    }
}

fn accept_contract(entry: &QuotedContract, symbol: &str, inputs: &ChainInputs) -> bool {
    let contract = &entry.contract;
    if normalize_symbol(&contract.symbol) != symbol || contract.expiry != inputs.expiry {
        warn!(
            contract_symbol = %contract.symbol,
            contract_expiry = %contract.expiry,
            %symbol,
            expiry = %inputs.expiry,
            "contract does not belong to this chain, skipping"
        );
        return false;
    }
    if !contract.strike.is_finite() || contract.strike <= 0.0 {
        warn!(%symbol, strike = contract.strike, "invalid strike, skipping contract");
        return false;
    }
    if !entry.quote.has_pricing_signal() {
        debug!(%symbol, strike = contract.strike, side = %contract.side, "no pricing signal, skipping contract");
        return false;
    }
    true
}
