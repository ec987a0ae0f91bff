use chrono::NaiveDate;

use crate::market::types::OptionSide;

/// Which sides of the chain feed the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SideView {
    Call,
    Put,
    /// ATM average, out-of-the-money side elsewhere
    #[default]
    Both,
}

impl SideView {
    pub fn includes(self, side: OptionSide) -> bool {
        match self {
            SideView::Both => true,
            SideView::Call => side == OptionSide::Call,
            SideView::Put => side == OptionSide::Put,
        }
    }
}

/// Horizontal axis of the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum AxisMode {
    #[default]
    Strike,
    /// strike / spot
    Moneyness,
}

/// Data-quality filters applied to every quote before it reaches a cell
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SurfaceFilters {
    /// Maximum bid-ask spread in percent of mid
    pub max_spread_pct: f64,
    /// Minimum open interest (missing counts as zero)
    pub min_open_interest: f64,
    /// Largest plausible IV (decimal); anything above is a bad tick
    pub max_iv: f64,
    /// Moneyness window, strike axis only
    pub moneyness_min: f64,
    pub moneyness_max: f64,
}

/// Plausibility ceiling for surface IVs (300%). Separate from the solver's
/// 500% search bound: solved values above this are display noise.
pub const MAX_SURFACE_IV: f64 = 3.0;

impl Default for SurfaceFilters {
    fn default() -> Self {
        Self {
            max_spread_pct: 10.0,
            min_open_interest: 20.0,
            max_iv: MAX_SURFACE_IV,
            moneyness_min: 0.8,
            moneyness_max: 1.2,
        }
    }
}

/// Surface construction request
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SurfaceRequest {
    pub side_view: SideView,
    pub axis_mode: AxisMode,
    pub filters: SurfaceFilters,
}

/// Running `(sum, count)` mean. Merging is commutative and associative, so
/// cells can be combined incrementally in any order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeanAccumulator {
    sum: f64,
    count: usize,
}

impl MeanAccumulator {
    pub fn from_value(value: f64) -> Self {
        Self {
            sum: value,
            count: 1,
        }
    }

    pub fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub fn merge(&mut self, other: &MeanAccumulator) {
        self.sum += other.sum;
        self.count += other.count;
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Side(s) that contributed to a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CellSide {
    Call,
    Put,
    Mixed,
}

impl From<OptionSide> for CellSide {
    fn from(side: OptionSide) -> Self {
        match side {
            OptionSide::Call => CellSide::Call,
            OptionSide::Put => CellSide::Put,
        }
    }
}

impl CellSide {
    pub(crate) fn combine(self, other: CellSide) -> CellSide {
        if self == other {
            self
        } else {
            CellSide::Mixed
        }
    }
}

/// One bucket of the surface: an expiry and a strike or moneyness bucket
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SurfaceCell {
    pub expiry: NaiveDate,
    /// Bucket key: strike to 2 dp or moneyness to 3 dp
    pub key: String,
    /// Strike of the first quote merged into the bucket
    pub strike: f64,
    pub moneyness: f64,
    /// Rounded position on the horizontal axis
    pub axis_value: f64,
    pub side: CellSide,
    pub iv: MeanAccumulator,
    pub mid: MeanAccumulator,
}

impl SurfaceCell {
    /// Mean implied volatility of every sample merged so far
    pub fn mean_iv(&self) -> f64 {
        self.iv.mean().unwrap_or(f64::NAN)
    }

    pub fn sample_count(&self) -> usize {
        self.iv.count()
    }

    /// Fold another cell of the same bucket into this one
    pub fn merge(&mut self, other: &SurfaceCell) {
        self.iv.merge(&other.iv);
        self.mid.merge(&other.mid);
        self.side = self.side.combine(other.side);
    }
}

/// All cells of one expiry, ordered by axis value
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SurfaceRow {
    pub expiry: NaiveDate,
    pub dte_days: Option<i64>,
    pub t_years: f64,
    /// Spot the row's moneyness was measured against
    pub spot: f64,
    pub cells: Vec<SurfaceCell>,
}

impl SurfaceRow {
    pub fn cell(&self, key: &str) -> Option<&SurfaceCell> {
        self.cells.iter().find(|cell| cell.key == key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SurfaceStats {
    /// Total samples merged into cells
    pub points_plotted: usize,
    pub min_iv: Option<f64>,
    pub max_iv: Option<f64>,
    /// IV of the single cell closest to ATM
    pub atm_iv: Option<f64>,
}

/// Why quotes were left out of the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SurfaceDiagnostics {
    pub quotes_considered: usize,
    pub unresolved_iv: usize,
    pub iv_out_of_range: usize,
    pub wide_spread: usize,
    pub low_open_interest: usize,
    pub outside_moneyness: usize,
    pub skipped_chains: usize,
}

/// Expiry x strike (or moneyness) implied-volatility grid
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SurfaceGrid {
    pub axis_mode: AxisMode,
    pub side_view: SideView,
    /// Rows ordered by expiry
    pub rows: Vec<SurfaceRow>,
    /// Sorted union of the axis values of every cell
    pub axis_values: Vec<f64>,
    pub stats: SurfaceStats,
    pub diagnostics: SurfaceDiagnostics,
}

impl SurfaceGrid {
    pub fn row(&self, expiry: NaiveDate) -> Option<&SurfaceRow> {
        self.rows.iter().find(|row| row.expiry == expiry)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| row.cells.is_empty())
    }
}
