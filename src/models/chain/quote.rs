use super::types::{QuoteContext, ResolvedQuote};
use crate::market::types::{finite, IvSource, PriceSource, RawQuote};
use crate::models::bs::{bs_greeks, bs_price, implied_vol, BsInputs, IvInputs};
use crate::models::utils::mid_price;

/// Pick the premium for a price-source policy, falling back to mid when the
/// selected field is missing. Returns the premium and the field it came from.
pub fn select_premium(quote: &RawQuote, price_source: PriceSource) -> Option<(f64, PriceSource)> {
    let mid = mid_price(finite(quote.bid), finite(quote.ask));
    let selected = match price_source {
        PriceSource::Mid => mid,
        PriceSource::Bid => finite(quote.bid),
        PriceSource::Ask => finite(quote.ask),
        PriceSource::Last => finite(quote.last),
    };

    match (selected, mid) {
        (Some(premium), _) => Some((premium, price_source)),
        (None, Some(mid)) => Some((mid, PriceSource::Mid)),
        (None, None) => None,
    }
}

/// Normalize a raw quote into a [`ResolvedQuote`].
///
/// 1. `mid` when both bid and ask are finite.
/// 2. `premium` from the price-source policy, falling back to mid.
/// 3. `iv` from the vendor when the policy trusts it and the value is
///    usable, otherwise inverted from a positive premium.
/// 4. Greeks only when `iv` resolved.
///
/// Never fails: anything that cannot be resolved is left as `None`.
pub fn normalize_quote(quote: &RawQuote, ctx: &QuoteContext) -> ResolvedQuote {
    let bid = finite(quote.bid);
    let ask = finite(quote.ask);
    let last = finite(quote.last);
    let mid = mid_price(bid, ask);
    let selection = select_premium(quote, ctx.price_source);
    let premium = selection.map(|(p, _)| p);

    let iv_vendor = finite(quote.vendor_iv).filter(|iv| *iv > 0.0);
    let t = ctx.t_years.unwrap_or(f64::NAN);

    let iv_solved = premium.filter(|p| *p > 0.0).and_then(|price| {
        implied_vol(&IvInputs::new(
            ctx.side, ctx.spot, ctx.strike, ctx.params, t, price,
        ))
    });

    let iv = match ctx.iv_source {
        IvSource::Vendor => iv_vendor.or(iv_solved),
        IvSource::Solved => iv_solved,
    };

    let pricing = iv.map(|sigma| BsInputs::new(ctx.side, ctx.spot, ctx.strike, ctx.params, t, sigma));
    let greeks = pricing.as_ref().and_then(bs_greeks);
    let model_price = pricing
        .as_ref()
        .map(bs_price)
        .filter(|price| price.is_finite());
    let pricing_error = match (model_price, premium) {
        (Some(model), Some(premium)) => Some(model - premium),
        _ => None,
    };

    ResolvedQuote {
        bid,
        ask,
        last,
        mid,
        premium,
        premium_source: selection.map(|(_, source)| source),
        iv,
        iv_solved,
        iv_vendor,
        delta: greeks.map(|g| g.delta),
        greeks,
        volume: finite(quote.volume),
        open_interest: finite(quote.open_interest),
        model_price,
        pricing_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::types::{MarketParams, OptionSide};

    fn context(price_source: PriceSource, iv_source: IvSource) -> QuoteContext {
        QuoteContext {
            side: OptionSide::Call,
            spot: 100.0,
            strike: 100.0,
            t_years: Some(0.25),
            params: MarketParams { r: 0.01, q: 0.0 },
            price_source,
            iv_source,
        }
    }

    #[test]
    fn test_premium_selection_and_fallback() {
        let quote = RawQuote {
            bid: Some(9.8),
            ask: Some(10.2),
            last: None,
            ..RawQuote::default()
        };
        let (mid, source) = select_premium(&quote, PriceSource::Mid).unwrap();
        assert!((mid - 10.0).abs() < 1e-12);
        assert_eq!(source, PriceSource::Mid);

        assert_eq!(select_premium(&quote, PriceSource::Bid), Some((9.8, PriceSource::Bid)));
        // last is missing: falls back to mid
        let (fallback, source) = select_premium(&quote, PriceSource::Last).unwrap();
        assert!((fallback - 10.0).abs() < 1e-12);
        assert_eq!(source, PriceSource::Mid);

        assert!(select_premium(&RawQuote::default(), PriceSource::Mid).is_none());
    }

    #[test]
    fn test_vendor_policy() {
        let quote = RawQuote {
            bid: Some(4.9),
            ask: Some(5.1),
            vendor_iv: Some(0.42),
            ..RawQuote::default()
        };
        let vendor = normalize_quote(&quote, &context(PriceSource::Mid, IvSource::Vendor));
        assert_eq!(vendor.iv, Some(0.42));
        assert!(vendor.iv_solved.is_some());

        let solved = normalize_quote(&quote, &context(PriceSource::Mid, IvSource::Solved));
        assert_eq!(solved.iv, solved.iv_solved);
        assert_ne!(solved.iv, Some(0.42));
    }

    #[test]
    fn test_zero_premium_leaves_iv_unresolved() {
        let quote = RawQuote {
            bid: Some(0.0),
            ask: Some(0.4),
            ..RawQuote::default()
        };
        let resolved = normalize_quote(&quote, &context(PriceSource::Bid, IvSource::Solved));
        assert_eq!(resolved.premium, Some(0.0));
        assert!(resolved.iv.is_none());
        assert!(resolved.greeks.is_none());
        assert!(resolved.delta.is_none());
        assert!(resolved.pricing_error.is_none());
    }

    #[test]
    fn test_expired_contract_has_no_solved_iv() {
        let quote = RawQuote::from_bid_ask(1.0, 1.2);
        let ctx = QuoteContext {
            t_years: None,
            ..context(PriceSource::Mid, IvSource::Solved)
        };
        let resolved = normalize_quote(&quote, &ctx);
        assert!((resolved.mid.unwrap() - 1.1).abs() < 1e-12);
        assert!(resolved.iv.is_none());
    }

    #[test]
    fn test_model_price_round_trips_premium() {
        let quote = RawQuote::from_bid_ask(4.0, 4.4);
        let resolved = normalize_quote(&quote, &context(PriceSource::Mid, IvSource::Solved));
        let error = resolved.pricing_error.unwrap();
        assert!(error.abs() < 1e-5, "error={}", error);
        assert!(resolved.delta.unwrap() > 0.0);
    }
}
