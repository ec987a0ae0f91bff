//! Side-selection policy for the surface.
//!
//! For every strike of every expiry the policy decides which quotes feed the
//! cell. With both sides in view the policy has three branches: at the money
//! both sides are blended, away from the money the out-of-the-money side is
//! preferred (ITM quotes carry dividend and borrow-cost distortion).

use super::types::SideView;
use crate::market::types::{OptionSide, STRIKE_EPSILON};

/// Resolved policy for one strike
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideSelection {
    /// Only this side is in view
    Single(OptionSide),
    /// ATM strike: use every side that resolves
    AtmBlend,
    /// Away from ATM: this side first, the other only when it does not resolve
    OutOfTheMoney(OptionSide),
}

/// Policy branch for a strike given the ATM strike and the reference spot
pub fn side_selection(view: SideView, strike: f64, atm_strike: Option<f64>, spot: f64) -> SideSelection {
    match view {
        SideView::Call => SideSelection::Single(OptionSide::Call),
        SideView::Put => SideSelection::Single(OptionSide::Put),
        SideView::Both => {
            let is_atm = atm_strike.is_some_and(|atm| (atm - strike).abs() < STRIKE_EPSILON);
            if is_atm {
                SideSelection::AtmBlend
            } else if strike < spot {
                SideSelection::OutOfTheMoney(OptionSide::Put)
            } else {
                SideSelection::OutOfTheMoney(OptionSide::Call)
            }
        }
    }
}

/// IV samples to merge for a strike, given the IVs that survived filtering
pub fn select_samples(
    selection: SideSelection,
    call_iv: Option<f64>,
    put_iv: Option<f64>,
) -> Vec<(OptionSide, f64)> {
    let pick = |side: OptionSide| match side {
        OptionSide::Call => call_iv.map(|iv| (OptionSide::Call, iv)),
        OptionSide::Put => put_iv.map(|iv| (OptionSide::Put, iv)),
    };

    match selection {
        SideSelection::Single(side) => pick(side).into_iter().collect(),
        SideSelection::AtmBlend => pick(OptionSide::Call)
            .into_iter()
            .chain(pick(OptionSide::Put))
            .collect(),
        SideSelection::OutOfTheMoney(preferred) => {
            let fallback = match preferred {
                OptionSide::Call => OptionSide::Put,
                OptionSide::Put => OptionSide::Call,
            };
            pick(preferred).or_else(|| pick(fallback)).into_iter().collect()
        }
    }
}
