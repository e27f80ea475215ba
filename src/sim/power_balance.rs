//! Captive-consumption netting and series arithmetic.
//!
//! All series are per 15-minute slot in kWh. Netting never produces a
//! negative value on either side: residuals below zero are clipped.

use super::types::{DaySeries, HOURS_PER_DAY, HourlySeries, SLOTS_PER_DAY, SLOTS_PER_HOUR};

/// An all-zero day.
pub const ZERO_DAY: DaySeries = [0.0; SLOTS_PER_DAY];

/// Nets demand against generation slot by slot.
///
/// # Returns
///
/// `(residual_demand, residual_generation)` where
/// `residual_demand = max(demand - generation, 0)` and
/// `residual_generation = max(generation - demand, 0)`.
pub fn net_captive(demand: &DaySeries, generation: &DaySeries) -> (DaySeries, DaySeries) {
    let mut residual_demand = ZERO_DAY;
    let mut residual_generation = ZERO_DAY;
    for slot in 0..SLOTS_PER_DAY {
        residual_demand[slot] = (demand[slot] - generation[slot]).max(0.0);
        residual_generation[slot] = (generation[slot] - demand[slot]).max(0.0);
    }
    (residual_demand, residual_generation)
}

/// Adds `other` into `acc` slot by slot.
pub fn add_into(acc: &mut DaySeries, other: &DaySeries) {
    for (a, b) in acc.iter_mut().zip(other) {
        *a += b;
    }
}

/// Sums any number of day series.
pub fn sum_series<'a>(series: impl IntoIterator<Item = &'a DaySeries>) -> DaySeries {
    let mut acc = ZERO_DAY;
    for s in series {
        add_into(&mut acc, s);
    }
    acc
}

/// Total energy over the day.
pub fn total(series: &DaySeries) -> f64 {
    series.iter().sum()
}

/// Clips every slot to be non-negative.
pub fn clip_non_negative(series: &mut DaySeries) {
    for v in series.iter_mut() {
        *v = v.max(0.0);
    }
}

/// Sums consecutive 15-minute slots into hourly buckets.
pub fn to_hourly(series: &DaySeries) -> HourlySeries {
    let mut hourly = [0.0; HOURS_PER_DAY];
    for (hour, chunk) in series.chunks_exact(SLOTS_PER_HOUR).enumerate() {
        hourly[hour] = chunk.iter().sum();
    }
    hourly
}

/// Hour bucket that contains `slot`.
pub fn hour_of_slot(slot: usize) -> usize {
    slot / SLOTS_PER_HOUR
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn constant(v: f64) -> DaySeries {
        [v; SLOTS_PER_DAY]
    }

    #[test]
    fn demand_above_generation() {
        let (d, g) = net_captive(&constant(5.0), &constant(3.0));
        assert_eq!(d, constant(2.0));
        assert_eq!(g, ZERO_DAY);
    }

    #[test]
    fn generation_above_demand() {
        let (d, g) = net_captive(&constant(5.0), &constant(10.0));
        assert_eq!(d, ZERO_DAY);
        assert_eq!(g, constant(5.0));
    }

    #[test]
    fn no_generation_leaves_demand_untouched() {
        let mut demand = ZERO_DAY;
        for (i, v) in demand.iter_mut().enumerate() {
            *v = i as f64 * 0.1;
        }
        let (d, g) = net_captive(&demand, &ZERO_DAY);
        assert_eq!(d, demand);
        assert_eq!(g, ZERO_DAY);
    }

    #[test]
    fn hourly_buckets_sum_four_slots() {
        let mut series = ZERO_DAY;
        series[4..8].copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        let hourly = to_hourly(&series);
        assert_eq!(hourly[0], 0.0);
        assert_eq!(hourly[1], 10.0);
        assert_eq!(hourly.iter().sum::<f64>(), total(&series));
        assert_eq!(hour_of_slot(7), 1);
        assert_eq!(hour_of_slot(95), 23);
    }

    #[test]
    fn sum_and_clip() {
        let a = constant(1.0);
        let b = constant(-3.0);
        let mut s = sum_series([&a, &b]);
        assert_eq!(s, constant(-2.0));
        clip_non_negative(&mut s);
        assert_eq!(s, ZERO_DAY);
    }

    proptest! {
        #[test]
        fn netting_residuals_are_never_negative(
            demand in prop::collection::vec(-5.0f64..50.0, SLOTS_PER_DAY),
            generation in prop::collection::vec(-5.0f64..50.0, SLOTS_PER_DAY),
        ) {
            let mut d = ZERO_DAY;
            let mut g = ZERO_DAY;
            d.copy_from_slice(&demand);
            g.copy_from_slice(&generation);
            let (residual_demand, residual_generation) = net_captive(&d, &g);
            for slot in 0..SLOTS_PER_DAY {
                prop_assert!(residual_demand[slot] >= 0.0);
                prop_assert!(residual_generation[slot] >= 0.0);
                // At most one side is non-zero in any slot.
                prop_assert!(residual_demand[slot] == 0.0 || residual_generation[slot] == 0.0);
            }
        }
    }
}
