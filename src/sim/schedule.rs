//! Day-ahead surplus/deficit timing.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::types::{HOURS_PER_DAY, HourlySeries};

/// Rule selecting which forecast hours become demand-response windows.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimingRule {
    /// Every hour with a strictly positive surplus (or deficit).
    Positive,
    /// Positive hours strictly above the given percentile (0-100) of all
    /// 24 hourly values.
    Percentile(f64),
}

impl Default for TimingRule {
    fn default() -> Self {
        Self::Positive
    }
}

/// Surplus and deficit hours computed from an aggregate day-ahead forecast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayAheadTiming {
    /// Hours where forecast supply exceeds forecast demand.
    pub surplus_hours: BTreeSet<usize>,
    /// Hours where forecast demand exceeds forecast supply.
    pub deficit_hours: BTreeSet<usize>,
}

impl DayAheadTiming {
    /// Flags surplus and deficit hours of tomorrow's community forecast.
    ///
    /// `surplus = supply - demand` and `deficit = demand - supply` per hour.
    /// A forecast without any positive hour yields empty sets.
    ///
    /// # Examples
    ///
    /// ```
    /// use ec_sim::sim::schedule::{DayAheadTiming, TimingRule};
    ///
    /// let mut demand = [1.0; 24];
    /// let mut supply = [1.0; 24];
    /// supply[12] = 3.0;
    /// demand[19] = 4.0;
    /// let timing = DayAheadTiming::compute(&demand, &supply, TimingRule::Positive);
    /// assert_eq!(timing.surplus_hours.into_iter().collect::<Vec<_>>(), vec![12]);
    /// assert_eq!(timing.deficit_hours.into_iter().collect::<Vec<_>>(), vec![19]);
    /// ```
    pub fn compute(demand: &HourlySeries, supply: &HourlySeries, rule: TimingRule) -> Self {
        let mut surplus = [0.0; HOURS_PER_DAY];
        let mut deficit = [0.0; HOURS_PER_DAY];
        for hour in 0..HOURS_PER_DAY {
            surplus[hour] = supply[hour] - demand[hour];
            deficit[hour] = demand[hour] - supply[hour];
        }
        Self {
            surplus_hours: select_hours(&surplus, rule),
            deficit_hours: select_hours(&deficit, rule),
        }
    }
}

fn select_hours(values: &HourlySeries, rule: TimingRule) -> BTreeSet<usize> {
    let threshold = match rule {
        TimingRule::Positive => None,
        TimingRule::Percentile(q) => percentile(values, q),
    };
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| **v > 0.0 && threshold.is_none_or(|t| **v > t))
        .map(|(hour, _)| hour)
        .collect()
}

/// Linear-interpolation percentile of `values`, `q` in `[0, 100]`.
///
/// Returns `None` for an empty slice.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_forecast_has_no_windows() {
        let flat = [2.0; HOURS_PER_DAY];
        let timing = DayAheadTiming::compute(&flat, &flat, TimingRule::Positive);
        assert!(timing.surplus_hours.is_empty());
        assert!(timing.deficit_hours.is_empty());
    }

    #[test]
    fn empty_community_has_no_windows() {
        let zero = [0.0; HOURS_PER_DAY];
        let timing = DayAheadTiming::compute(&zero, &zero, TimingRule::Percentile(70.0));
        assert_eq!(timing, DayAheadTiming::default());
    }

    #[test]
    fn surplus_and_deficit_are_disjoint() {
        let mut demand = [0.0; HOURS_PER_DAY];
        let mut supply = [0.0; HOURS_PER_DAY];
        for h in 0..HOURS_PER_DAY {
            demand[h] = 5.0;
            supply[h] = h as f64 / 2.0;
        }
        let timing = DayAheadTiming::compute(&demand, &supply, TimingRule::Positive);
        assert!(timing.surplus_hours.is_disjoint(&timing.deficit_hours));
        assert_eq!(timing.deficit_hours.len(), 10);
        assert_eq!(timing.surplus_hours.len(), 13);
    }

    #[test]
    fn percentile_rule_keeps_top_hours() {
        let demand = [0.0; HOURS_PER_DAY];
        let mut supply = [0.0; HOURS_PER_DAY];
        for (i, h) in (8..18).enumerate() {
            supply[h] = (i + 1) as f64;
        }
        let timing = DayAheadTiming::compute(&demand, &supply, TimingRule::Percentile(70.0));
        // 14 zeros then 1..=10: the 70th percentile is 3.1, so 4..=10 remain.
        assert_eq!(
            timing.surplus_hours.into_iter().collect::<Vec<_>>(),
            (11..18).collect::<Vec<_>>()
        );
        assert!(timing.deficit_hours.is_empty());
    }

    #[test]
    fn percentile_rule_is_strict() {
        let flat = [1.0; HOURS_PER_DAY];
        let zero = [0.0; HOURS_PER_DAY];
        let positive = DayAheadTiming::compute(&zero, &flat, TimingRule::Positive);
        let top = DayAheadTiming::compute(&zero, &flat, TimingRule::Percentile(70.0));
        assert_eq!(positive.surplus_hours.len(), HOURS_PER_DAY);
        assert!(top.surplus_hours.is_empty());
    }

    #[test]
    fn percentile_rule_keeps_a_lone_positive_hour() {
        let demand = [2.0; HOURS_PER_DAY];
        let mut supply = [1.0; HOURS_PER_DAY];
        supply[13] = 6.0;
        let timing = DayAheadTiming::compute(&demand, &supply, TimingRule::Percentile(70.0));
        assert_eq!(timing.surplus_hours, BTreeSet::from([13]));
        // Every other hour ties at the threshold.
        assert!(timing.deficit_hours.is_empty());
    }

    #[test]
    fn percentile_interpolates() {
        assert_eq!(percentile(&[], 50.0), None);
        assert_eq!(percentile(&[4.0], 70.0), Some(4.0));
        assert_eq!(percentile(&[1.0, 3.0], 50.0), Some(2.0));
        assert_eq!(percentile(&[3.0, 1.0, 2.0], 100.0), Some(3.0));
    }
}
