use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::selection::{select_samples, side_selection};
use super::types::{
    AxisMode, CellSide, MeanAccumulator, SurfaceCell, SurfaceDiagnostics, SurfaceFilters,
    SurfaceGrid, SurfaceRequest, SurfaceRow, SurfaceStats,
};
use crate::market::types::OptionSide;
use crate::models::chain::types::{nearest_strike, OptionChain, ResolvedQuote};
use crate::models::utils::spread_pct;

/// Axis values closer than this are the same column
const AXIS_EPSILON: f64 = 1e-9;

/// Cells of one expiry, in first-seen order plus a key index
struct RowBuilder {
    dte_days: Option<i64>,
    t_years: f64,
    spot: f64,
    cells: Vec<SurfaceCell>,
    index: HashMap<String, usize>,
}

impl RowBuilder {
    fn add(&mut self, cell: SurfaceCell) {
        match self.index.get(&cell.key) {
            Some(&position) => self.cells[position].merge(&cell),
            None => {
                self.index.insert(cell.key.clone(), self.cells.len());
                self.cells.push(cell);
            }
        }
    }
}

/// Aggregate several chains into an expiry x strike (or moneyness) IV grid.
///
/// Moneyness is measured against the first chain's spot so every expiry
/// shares one reference. Chains whose expiry has passed are skipped. Each
/// quote must pass [`SurfaceFilters`]; the surviving IVs are chosen by the
/// side-selection policy and merged into `(expiry, bucket)` cells as running
/// means.
pub fn build_surface(chains: &[OptionChain], request: &SurfaceRequest) -> SurfaceGrid {
    let filters = &request.filters;
    let mut diagnostics = SurfaceDiagnostics::default();
    let reference_spot = chains
        .first()
        .map(|chain| chain.spot)
        .filter(|spot| spot.is_finite() && *spot > 0.0);

    let mut rows: BTreeMap<NaiveDate, RowBuilder> = BTreeMap::new();

    for chain in chains {
        let spot = reference_spot.unwrap_or(chain.spot);
        let Some(t_years) = chain.t_years else {
            debug!(symbol = %chain.symbol, expiry = %chain.expiry, "expired chain left out of surface");
            diagnostics.skipped_chains += 1;
            continue;
        };
        if !spot.is_finite() || spot <= 0.0 {
            warn!(symbol = %chain.symbol, expiry = %chain.expiry, spot, "no usable spot, chain left out of surface");
            diagnostics.skipped_chains += 1;
            continue;
        }

        let atm_strike = nearest_strike(&chain.rows, spot);
        let row = rows.entry(chain.expiry).or_insert_with(|| RowBuilder {
            dte_days: chain.dte_days,
            t_years,
            spot,
            cells: Vec::new(),
            index: HashMap::new(),
        });

        for chain_row in &chain.rows {
            let strike = chain_row.strike;
            let moneyness = strike / spot;

            if request.axis_mode == AxisMode::Strike
                && !(filters.moneyness_min..=filters.moneyness_max).contains(&moneyness)
            {
                diagnostics.outside_moneyness += [OptionSide::Call, OptionSide::Put]
                    .into_iter()
                    .filter(|side| request.side_view.includes(*side) && chain_row.quote(*side).is_some())
                    .count();
                continue;
            }

            let mut usable = |side: OptionSide| {
                if !request.side_view.includes(side) {
                    return None;
                }
                let quote = chain_row.quote(side)?;
                usable_iv(quote, filters, &mut diagnostics)
            };
            let call_iv = usable(OptionSide::Call);
            let put_iv = usable(OptionSide::Put);

            let selection = side_selection(request.side_view, strike, atm_strike, spot);
            for (side, iv) in select_samples(selection, call_iv, put_iv) {
                let (key, axis_value) = bucket(request.axis_mode, strike, moneyness);
                let mid = chain_row
                    .quote(side)
                    .and_then(|quote| quote.mid)
                    .map(MeanAccumulator::from_value)
                    .unwrap_or_default();
                row.add(SurfaceCell {
                    expiry: chain.expiry,
                    key,
                    strike,
                    moneyness,
                    axis_value,
                    side: CellSide::from(side),
                    iv: MeanAccumulator::from_value(iv),
                    mid,
                });
            }
        }
    }

    let rows: Vec<SurfaceRow> = rows
        .into_iter()
        .map(|(expiry, builder)| {
            let mut cells = builder.cells;
            cells.sort_by(|a, b| a.axis_value.total_cmp(&b.axis_value));
            SurfaceRow {
                expiry,
                dte_days: builder.dte_days,
                t_years: builder.t_years,
                spot: builder.spot,
                cells,
            }
        })
        .collect();

    let axis_values = collect_axis_values(&rows);
    let stats = surface_stats(&rows, request.axis_mode);

    debug!(
        chains = chains.len(),
        expiries = rows.len(),
        points = stats.points_plotted,
        considered = diagnostics.quotes_considered,
        "built IV surface"
    );

    SurfaceGrid {
        axis_mode: request.axis_mode,
        side_view: request.side_view,
        rows,
        axis_values,
        stats,
        diagnostics,
    }
}

/// IV of a quote if it passes every data-quality filter
fn usable_iv(quote: &ResolvedQuote, filters: &SurfaceFilters, diagnostics: &mut SurfaceDiagnostics) -> Option<f64> {
    diagnostics.quotes_considered += 1;

    let Some(iv) = quote.iv.filter(|iv| iv.is_finite()) else {
        diagnostics.unresolved_iv += 1;
        return None;
    };
    if iv <= 0.0 || iv > filters.max_iv {
        diagnostics.iv_out_of_range += 1;
        return None;
    }
    // a missing two-sided quote fails the spread filter
    let spread_ok = spread_pct(quote.bid, quote.ask).is_some_and(|pct| pct <= filters.max_spread_pct);
    if !spread_ok {
        diagnostics.wide_spread += 1;
        return None;
    }
    if quote.open_interest.unwrap_or(0.0) < filters.min_open_interest {
        diagnostics.low_open_interest += 1;
        return None;
    }
    Some(iv)
}

/// Bucket key and rounded axis position
fn bucket(axis_mode: AxisMode, strike: f64, moneyness: f64) -> (String, f64) {
    match axis_mode {
        AxisMode::Strike => (format!("{:.2}", strike), (strike * 100.0).round() / 100.0),
        AxisMode::Moneyness => (format!("{:.3}", moneyness), (moneyness * 1000.0).round() / 1000.0),
    }
}

fn collect_axis_values(rows: &[SurfaceRow]) -> Vec<f64> {
    let mut values: Vec<f64> = rows
        .iter()
        .flat_map(|row| row.cells.iter().map(|cell| cell.axis_value))
        .collect();
    values.sort_by(|a, b| a.total_cmp(b));
    values.dedup_by(|a, b| (*a - *b).abs() < AXIS_EPSILON);
    values
}

/// Summary statistics; ties for the ATM cell go to the first cell in
/// expiry-then-axis order
fn surface_stats(rows: &[SurfaceRow], axis_mode: AxisMode) -> SurfaceStats {
    let mut stats = SurfaceStats::default();
    let mut best_distance = f64::INFINITY;

    for row in rows {
        for cell in &row.cells {
            stats.points_plotted += cell.sample_count();
            let Some(iv) = cell.iv.mean() else {
                continue;
            };
            stats.min_iv = Some(stats.min_iv.map_or(iv, |min| min.min(iv)));
            stats.max_iv = Some(stats.max_iv.map_or(iv, |max| max.max(iv)));

            let distance = match axis_mode {
                AxisMode::Strike => (cell.axis_value - row.spot).abs(),
                AxisMode::Moneyness => (cell.axis_value - 1.0).abs(),
            };
            if distance < best_distance {
                best_distance = distance;
                stats.atm_iv = Some(iv);
            }
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::types::{IvSource, MarketParams, PriceSource};
    use crate::models::chain::types::ChainRow;
    use crate::models::surface::types::SideView;

    fn quote(iv: f64, bid: f64, ask: f64, open_interest: f64) -> ResolvedQuote {
        ResolvedQuote {
            bid: Some(bid),
            ask: Some(ask),
            last: None,
            mid: Some(0.5 * (bid + ask)),
            premium: Some(0.5 * (bid + ask)),
            premium_source: Some(PriceSource::Mid),
            iv: Some(iv),
            iv_solved: Some(iv),
            iv_vendor: None,
            greeks: None,
            delta: None,
            volume: None,
            open_interest: Some(open_interest),
            model_price: None,
            pricing_error: None,
        }
    }

    fn chain(expiry: NaiveDate, spot: f64, rows: Vec<ChainRow>) -> OptionChain {
        OptionChain {
            symbol: "SPY".to_string(),
            expiry,
            spot,
            t_years: Some(0.25),
            dte_days: Some(91),
            params: MarketParams::default(),
            price_source: PriceSource::Mid,
            iv_source: IvSource::Solved,
            rows,
        }
    }

    fn row(strike: f64, call: Option<ResolvedQuote>, put: Option<ResolvedQuote>) -> ChainRow {
        ChainRow { strike, call, put }
    }

    fn june() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 20).unwrap()
    }

    #[test]
    fn test_atm_blend_averages_both_sides() {
        let chains = vec![chain(
            june(),
            100.2,
            vec![
                row(95.0, Some(quote(0.26, 7.0, 7.2, 100.0)), Some(quote(0.27, 1.9, 2.0, 100.0))),
                row(100.0, Some(quote(0.20, 4.0, 4.2, 100.0)), Some(quote(0.24, 3.8, 4.0, 100.0))),
                row(105.0, Some(quote(0.19, 1.9, 2.0, 100.0)), Some(quote(0.30, 6.0, 6.3, 100.0))),
            ],
        )];

        let grid = build_surface(&chains, &SurfaceRequest::default());
        let row = grid.row(june()).unwrap();

        let atm = row.cell("100.00").unwrap();
        assert_eq!(atm.sample_count(), 2);
        assert!((atm.mean_iv() - 0.22).abs() < 1e-12);
        assert_eq!(atm.side, CellSide::Mixed);

        // OTM side away from the money
        assert_eq!(row.cell("95.00").unwrap().side, CellSide::Put);
        assert!((row.cell("105.00").unwrap().mean_iv() - 0.19).abs() < 1e-12);

        assert_eq!(grid.stats.points_plotted, 4);
        assert!((grid.stats.atm_iv.unwrap() - 0.22).abs() < 1e-12);
        assert_eq!(grid.stats.min_iv, Some(0.19));
        assert_eq!(grid.axis_values, vec![95.0, 100.0, 105.0]);
    }

    #[test]
    fn test_filters_drop_bad_quotes() {
        let chains = vec![chain(
            june(),
            100.0,
            vec![
                // spread 40%
                row(98.0, Some(quote(0.25, 2.0, 3.0, 100.0)), None),
                // open interest below threshold
                row(99.0, Some(quote(0.25, 2.0, 2.1, 5.0)), None),
                // implausible IV
                row(101.0, Some(quote(3.5, 2.0, 2.1, 100.0)), None),
                // outside the moneyness window
                row(130.0, Some(quote(0.40, 0.5, 0.52, 100.0)), None),
                row(102.0, Some(quote(0.21, 2.0, 2.1, 100.0)), None),
            ],
        )];
        let request = SurfaceRequest {
            side_view: SideView::Call,
            ..SurfaceRequest::default()
        };

        let grid = build_surface(&chains, &request);
        let keys: Vec<&str> = grid.rows[0].cells.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["102.00"]);
        assert_eq!(grid.diagnostics.wide_spread, 1);
        assert_eq!(grid.diagnostics.low_open_interest, 1);
        assert_eq!(grid.diagnostics.iv_out_of_range, 1);
        assert_eq!(grid.diagnostics.outside_moneyness, 1);
    }

    #[test]
    fn test_missing_spread_fails_filter() {
        let mut no_ask = quote(0.25, 2.0, 2.1, 100.0);
        no_ask.ask = None;
        let chains = vec![chain(june(), 100.0, vec![row(100.0, Some(no_ask), None)])];
        let grid = build_surface(&chains, &SurfaceRequest::default());
        assert!(grid.is_empty());
        assert_eq!(grid.stats.points_plotted, 0);
        assert!(grid.stats.atm_iv.is_none());
    }

    #[test]
    fn test_moneyness_axis_uses_first_chain_spot() {
        let july = NaiveDate::from_ymd_opt(2025, 7, 18).unwrap();
        let chains = vec![
            chain(june(), 100.0, vec![row(110.0, Some(quote(0.20, 1.0, 1.05, 50.0)), None)]),
            // spot drifted; moneyness still measured against 100
            chain(july, 104.0, vec![row(110.0, Some(quote(0.22, 2.0, 2.1, 50.0)), None)]),
        ];
        let request = SurfaceRequest {
            axis_mode: AxisMode::Moneyness,
            ..SurfaceRequest::default()
        };

        let grid = build_surface(&chains, &request);
        assert_eq!(grid.rows.len(), 2);
        assert!(grid.rows[1].cell("1.100").is_some());
        assert_eq!(grid.axis_values, vec![1.1]);
        // first encountered cell wins the ATM tie
        assert_eq!(grid.stats.atm_iv, Some(0.20));
    }

    #[test]
    fn test_expired_chain_is_skipped() {
        let mut expired = chain(june(), 100.0, vec![row(100.0, Some(quote(0.2, 4.0, 4.1, 50.0)), None)]);
        expired.t_years = None;
        let grid = build_surface(&[expired], &SurfaceRequest::default());
        assert!(grid.rows.is_empty());
        assert_eq!(grid.diagnostics.skipped_chains, 1);
    }

    #[test]
    fn test_cells_merge_across_chains_of_same_expiry() {
        let chains = vec![
            chain(june(), 100.0, vec![row(100.0, Some(quote(0.20, 4.0, 4.1, 50.0)), None)]),
            chain(june(), 100.0, vec![row(100.0, Some(quote(0.30, 4.0, 4.1, 50.0)), None)]),
        ];
        let request = SurfaceRequest {
            side_view: SideView::Call,
            ..SurfaceRequest::default()
        };
        let grid = build_surface(&chains, &request);
        let cell = grid.rows[0].cell("100.00").unwrap();
        assert_eq!(cell.sample_count(), 2);
        assert!((cell.mean_iv() - 0.25).abs() < 1e-12);
    }
}
