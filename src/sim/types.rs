//! Core simulation types: time resolution, levers, uncertainties, and tick records.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::assets::AssetKind;
use crate::config::ConfigError;
use crate::members::MemberCategory;

/// Number of 15-minute slots in one simulated day.
pub const SLOTS_PER_DAY: usize = 96;
/// Number of 15-minute slots in one hour.
pub const SLOTS_PER_HOUR: usize = 4;
/// Number of hourly buckets in one day.
pub const HOURS_PER_DAY: usize = SLOTS_PER_DAY / SLOTS_PER_HOUR;

/// One day of 15-minute values.
pub type DaySeries = [f64; SLOTS_PER_DAY];
/// One day of hourly values.
pub type HourlySeries = [f64; HOURS_PER_DAY];

/// Unique identifier assigned to every agent at model construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AgentId(pub usize);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Policy levers of one simulation run.
///
/// # Examples
///
/// ```
/// use ec_sim::sim::types::Levers;
///
/// let mut levers = Levers::default();
/// levers.set("L1", 0.5).unwrap();
/// assert_eq!(levers.participation_rate, 0.5);
/// assert!(levers.validate().is_empty());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Levers {
    /// L1: probability that a member takes part in demand response on a given day.
    #[serde(rename = "l1")]
    pub participation_rate: f64,
    /// L2: shiftable share of residential demand.
    #[serde(rename = "l2")]
    pub residential_flexibility: f64,
    /// L3: shiftable share of non-residential demand.
    #[serde(rename = "l3")]
    pub non_residential_flexibility: f64,
}

impl Default for Levers {
    fn default() -> Self {
        Self {
            participation_rate: 0.5,
            residential_flexibility: 0.5,
            non_residential_flexibility: 0.45,
        }
    }
}

impl Levers {
    /// Parameter names understood by [`Levers::set`].
    pub const NAMES: &[&str] = &["L1", "L2", "L3"];

    /// Assigns a lever by its experiment parameter name.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for an unknown name.
    pub fn set(&mut self, name: &str, value: f64) -> Result<(), ConfigError> {
        match name {
            "L1" => self.participation_rate = value,
            "L2" => self.residential_flexibility = value,
            "L3" => self.non_residential_flexibility = value,
            other => {
                return Err(ConfigError::new(
                    "levers",
                    format!("unknown lever \"{other}\", expected one of {:?}", Self::NAMES),
                ));
            }
        }
        Ok(())
    }

    /// Checks every lever lies in `[0.0, 1.0]`.
    pub fn validate(&self) -> Vec<ConfigError> {
        [
            ("levers.l1", self.participation_rate),
            ("levers.l2", self.residential_flexibility),
            ("levers.l3", self.non_residential_flexibility),
        ]
        .into_iter()
        .filter(|(_, v)| !(0.0..=1.0).contains(v))
        .map(|(field, v)| ConfigError::new(field, format!("must be in [0.0, 1.0], got {v}")))
        .collect()
    }
}

/// Exogenous uncertainties of one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Uncertainties {
    /// X1: lower bound of the flexible share actually available on a day.
    #[serde(rename = "x1")]
    pub min_availability: f64,
    /// X2: upper bound of the flexible share actually available on a day.
    #[serde(rename = "x2")]
    pub max_availability: f64,
    /// X3: accuracy of day-ahead generation forecasts (1.0 = perfect).
    #[serde(rename = "x3")]
    pub forecast_accuracy: f64,
}

impl Default for Uncertainties {
    fn default() -> Self {
        Self {
            min_availability: 0.4,
            max_availability: 1.0,
            forecast_accuracy: 0.9,
        }
    }
}

impl Uncertainties {
    /// Parameter names understood by [`Uncertainties::set`].
    pub const NAMES: &[&str] = &["X1", "X2", "X3"];

    /// Assigns an uncertainty by its experiment parameter name.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for an unknown name.
    pub fn set(&mut self, name: &str, value: f64) -> Result<(), ConfigError> {
        match name {
            "X1" => self.min_availability = value,
            "X2" => self.max_availability = value,
            "X3" => self.forecast_accuracy = value,
            other => {
                return Err(ConfigError::new(
                    "uncertainties",
                    format!(
                        "unknown uncertainty \"{other}\", expected one of {:?}",
                        Self::NAMES
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Availability draw bounds as `(low, high)`.
    ///
    /// X1 and X2 are swept independently, so a combination may carry
    /// `X1 > X2`; the bounds are ordered here instead of rejected.
    pub fn availability_range(&self) -> (f64, f64) {
        let lo = self.min_availability.min(self.max_availability);
        let hi = self.min_availability.max(self.max_availability);
        (lo, hi)
    }

    /// Checks every uncertainty lies in `[0.0, 1.0]`.
    pub fn validate(&self) -> Vec<ConfigError> {
        [
            ("uncertainties.x1", self.min_availability),
            ("uncertainties.x2", self.max_availability),
            ("uncertainties.x3", self.forecast_accuracy),
        ]
        .into_iter()
        .filter(|(_, v)| !(0.0..=1.0).contains(v))
        .map(|(field, v)| ConfigError::new(field, format!("must be in [0.0, 1.0], got {v}")))
        .collect()
    }
}

/// Per-category totals for one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryMetrics {
    /// Number of members in the category.
    pub members: usize,
    /// Scheduled demand before netting and demand response (kWh).
    pub scheduled_demand: f64,
    /// Realised demand after netting and demand response (kWh).
    pub realised_demand: f64,
    /// Load moved by demand response (kWh).
    pub shifted_load: f64,
    /// Own-asset generation (kWh).
    pub generation: f64,
    /// Energy cost net of savings.
    pub energy_cost: f64,
    /// Savings earned by shifting load.
    pub savings: f64,
    /// Slot-wise mean realised demand across the category's members.
    pub avg_demand_profile: Vec<f64>,
    /// Slot-wise total realised demand across the category's members.
    pub total_demand_profile: Vec<f64>,
}

/// Complete record of one simulated tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickRecord {
    /// Replication index inside an experiment combination (0 for single runs).
    pub replication: usize,
    /// Tick index.
    pub tick: usize,
    /// Calendar day of the tick.
    pub date: NaiveDate,
    /// Community scheduled demand (kWh).
    pub scheduled_demand: f64,
    /// Community realised demand (kWh).
    pub realised_demand: f64,
    /// Community load moved by demand response (kWh).
    pub shifted_load: f64,
    /// Generation of all assets, owned and community (kWh).
    pub total_generation: f64,
    /// Member generation left after self-consumption (kWh).
    pub excess_generation: f64,
    /// Community energy cost net of savings.
    pub energy_cost: f64,
    /// Community savings from demand response.
    pub savings: f64,
    /// Coordinator's aggregate import for the tick (kWh).
    pub energy_import: f64,
    /// Coordinator's aggregate export for the tick (kWh).
    pub energy_export: f64,
    /// Number of hours flagged as surplus for the next day.
    pub surplus_hours: usize,
    /// Number of hours flagged as deficit for the next day.
    pub deficit_hours: usize,
    /// Members that shifted load this tick.
    pub participants: usize,
    /// Totals per member category.
    pub categories: BTreeMap<MemberCategory, CategoryMetrics>,
    /// Slot-wise total supply per asset kind.
    pub supply_by_asset: BTreeMap<AssetKind, Vec<f64>>,
}

impl fmt::Display for TickRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>3} {} | demand={:>9.2} (sched={:>9.2}) kWh  gen={:>9.2} kWh \
             | import={:>9.2} export={:>9.2} kWh | shifted={:>7.2} kWh ({} members) \
             | cost={:>8.2} saved={:>6.2} | ToD(+{} / -{})",
            self.tick,
            self.date,
            self.realised_demand,
            self.scheduled_demand,
            self.total_generation,
            self.energy_import,
            self.energy_export,
            self.shifted_load,
            self.participants,
            self.energy_cost,
            self.savings,
            self.surplus_hours,
            self.deficit_hours,
        )
    }
}
