use std::collections::BTreeSet;

use chrono::NaiveDate;

use super::power_balance::hour_of_slot;
use super::schedule::DayAheadTiming;
use crate::error::{Result, SimError};

/// Time-of-day demand-response signal published by the coordinator.
///
/// Holds the hours of `target_date` forecast as community surplus or
/// deficit. The coordinator publishes it one day ahead; members consume
/// it on the tick whose date equals `target_date`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodSignal {
    /// Day the signal applies to.
    pub target_date: NaiveDate,
    /// Hours with forecast net supply.
    pub surplus_hours: BTreeSet<usize>,
    /// Hours with forecast net demand.
    pub deficit_hours: BTreeSet<usize>,
}

impl TodSignal {
    /// Creates a signal for `target_date`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if an hour is flagged as both surplus
    /// and deficit.
    pub fn new(
        target_date: NaiveDate,
        surplus_hours: BTreeSet<usize>,
        deficit_hours: BTreeSet<usize>,
    ) -> Result<Self> {
        if let Some(hour) = surplus_hours.intersection(&deficit_hours).next() {
            return Err(SimError::config(
                "signal",
                format!("hour {hour} of {target_date} is both surplus and deficit"),
            ));
        }
        Ok(Self {
            target_date,
            surplus_hours,
            deficit_hours,
        })
    }

    /// Wraps a computed day-ahead timing, whose windows never overlap.
    pub(crate) fn from_timing(target_date: NaiveDate, timing: DayAheadTiming) -> Self {
        Self {
            target_date,
            surplus_hours: timing.surplus_hours,
            deficit_hours: timing.deficit_hours,
        }
    }

    /// A signal with no surplus or deficit windows.
    pub fn empty(target_date: NaiveDate) -> Self {
        Self::from_timing(target_date, DayAheadTiming::default())
    }

    /// Returns `true` when the signal was published for `date`.
    pub fn applies_to(&self, date: NaiveDate) -> bool {
        self.target_date == date
    }

    /// Returns `true` when neither window has any hour.
    pub fn is_empty(&self) -> bool {
        self.surplus_hours.is_empty() && self.deficit_hours.is_empty()
    }

    /// Whether the 15-minute `slot` falls in a surplus hour.
    pub fn is_surplus_slot(&self, slot: usize) -> bool {
        self.surplus_hours.contains(&hour_of_slot(slot))
    }

    /// Whether the 15-minute `slot` falls in a deficit hour.
    pub fn is_deficit_slot(&self, slot: usize) -> bool {
        self.deficit_hours.contains(&hour_of_slot(slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 5, 2).unwrap()
    }

    #[test]
    fn slots_map_onto_their_hour() {
        let signal = TodSignal::new(day(), BTreeSet::from([12]), BTreeSet::from([18])).unwrap();
        assert!(!signal.is_surplus_slot(47));
        assert!(signal.is_surplus_slot(48));
        assert!(signal.is_surplus_slot(51));
        assert!(!signal.is_surplus_slot(52));
        assert!(signal.is_deficit_slot(72));
        assert!(!signal.is_deficit_slot(48));
    }

    #[test]
    fn applies_only_to_target_date() {
        let signal = TodSignal::empty(day());
        assert!(signal.applies_to(day()));
        assert!(!signal.applies_to(day().succ_opt().unwrap()));
        assert!(signal.is_empty());
    }

    #[test]
    fn overlapping_windows_are_rejected() {
        let err =
            TodSignal::new(day(), BTreeSet::from([2, 3]), BTreeSet::from([3, 4])).unwrap_err();
        let SimError::Configuration(inner) = &err else {
            panic!("unexpected error: {err:?}");
        };
        assert_eq!(inner.field, "signal");
        assert!(inner.message.contains("hour 3"));
    }
}
