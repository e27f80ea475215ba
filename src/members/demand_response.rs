use rand::Rng;

use crate::sim::event::TodSignal;
use crate::sim::power_balance::total;
use crate::sim::types::{DaySeries, SLOTS_PER_DAY, Uncertainties};

/// Result of applying a time-of-day shift to one member's demand.
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftOutcome {
    /// Demand after the shift.
    pub adjusted: DaySeries,
    /// `|Σ adjusted − Σ original|`.
    pub shifted_load: f64,
}

/// Draws the share of realised demand moved today.
///
/// The available share is `U(lo, hi)` with the availability bounds from
/// X1/X2, scaled by the member's flexibility.
pub fn draw_shift_factor<R: Rng + ?Sized>(
    flexibility: f64,
    uncertainties: &Uncertainties,
    rng: &mut R,
) -> f64 {
    let (lo, hi) = uncertainties.availability_range();
    let availability = if hi > lo {
        rng.random_range(lo..=hi)
    } else {
        lo
    };
    (flexibility * availability).clamp(0.0, 1.0)
}

/// Moves load into surplus hours and out of deficit hours.
///
/// Each surplus slot grows by `factor × realised`; each deficit slot
/// shrinks by the same share and never drops below zero. Slots outside
/// both windows are unchanged.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeSet;
/// use chrono::NaiveDate;
/// use ec_sim::members::demand_response::apply_tod_shift;
/// use ec_sim::sim::event::TodSignal;
///
/// let day = NaiveDate::from_ymd_opt(2021, 4, 1).unwrap();
/// let signal = TodSignal::new(day, BTreeSet::from([12]), BTreeSet::new()).unwrap();
/// let out = apply_tod_shift(&[1.0; 96], &signal, 0.5);
/// assert_eq!(out.adjusted[48], 1.5);
/// assert_eq!(out.adjusted[0], 1.0);
/// assert_eq!(out.shifted_load, 2.0);
/// ```
pub fn apply_tod_shift(realised: &DaySeries, signal: &TodSignal, factor: f64) -> ShiftOutcome {
    let mut adjusted = *realised;
    for slot in 0..SLOTS_PER_DAY {
        let delta = factor * realised[slot];
        if signal.is_surplus_slot(slot) {
            adjusted[slot] = realised[slot] + delta;
        } else if signal.is_deficit_slot(slot) {
            adjusted[slot] = (realised[slot] - delta).max(0.0);
        }
    }
    let shifted_load = (total(&adjusted) - total(realised)).abs();
    ShiftOutcome {
        adjusted,
        shifted_load,
    }
}
