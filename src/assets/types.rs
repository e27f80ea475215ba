//! Common types and traits for generation assets.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::battery::Battery;
use super::solar::Solar;
use super::wind::Wind;
use crate::config::ConfigError;
use crate::error::{Result, SimError};
use crate::profiles::ProfileSource;
use crate::sim::clock::next_day;
use crate::sim::power_balance::ZERO_DAY;
use crate::sim::types::{AgentId, DaySeries};

/// Hours in a (non-leap) year, used to turn capacity factors into energy.
pub const HOURS_PER_YEAR: f64 = 8760.0;

/// Kind of a generation or storage asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Solar,
    Wind,
    Battery,
}

impl AssetKind {
    /// All kinds, in reporting order.
    pub const ALL: [AssetKind; 3] = [AssetKind::Solar, AssetKind::Wind, AssetKind::Battery];

    /// Typical annual capacity factor used when no lifetime generation estimate is given.
    pub fn capacity_factor(self) -> f64 {
        match self {
            AssetKind::Solar => 0.20,
            AssetKind::Wind => 0.35,
            AssetKind::Battery => 0.15,
        }
    }

    /// Default technical lifetime in years.
    pub fn default_lifetime_years(self) -> f64 {
        match self {
            AssetKind::Solar => 25.0,
            AssetKind::Wind => 20.0,
            AssetKind::Battery => 15.0,
        }
    }

    /// Default capital cost per kW of capacity.
    pub fn default_capex_per_kw(self) -> f64 {
        match self {
            AssetKind::Solar => 900.0,
            AssetKind::Wind => 1300.0,
            AssetKind::Battery => 500.0,
        }
    }

    /// Default operating cost per kW of capacity and year.
    pub fn default_opex_per_kw_year(self) -> f64 {
        match self {
            AssetKind::Solar => 15.0,
            AssetKind::Wind => 40.0,
            AssetKind::Battery => 10.0,
        }
    }

    /// Lower-case label used in reports.
    pub fn label(self) -> &'static str {
        match self {
            AssetKind::Solar => "solar",
            AssetKind::Wind => "wind",
            AssetKind::Battery => "battery",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Trait implemented by every asset model that produces a supply schedule.
///
/// Schedules are pure functions of the asset parameters, the date, and the
/// profile source: calling twice with the same inputs yields the same
/// output.
pub trait Generator {
    /// Supply per 15-minute slot on `date` (kWh).
    ///
    /// # Errors
    ///
    /// Propagates [`crate::error::SimError::DataUnavailable`] from the profile source.
    fn supply_schedule(&self, date: NaiveDate, profiles: &dyn ProfileSource) -> Result<DaySeries>;

    /// Forecast supply for the day after `date`.
    fn day_ahead_supply_schedule(
        &self,
        date: NaiveDate,
        profiles: &dyn ProfileSource,
    ) -> Result<DaySeries> {
        self.supply_schedule(next_day(date), profiles)
    }

    /// Rated capacity (kW, or kWh for storage).
    fn capacity(&self) -> f64;

    /// Conversion efficiency in `(0, 1]`.
    fn efficiency(&self) -> f64;

    /// Asset kind.
    fn kind(&self) -> AssetKind;
}

/// Cost and lifetime assumptions of one asset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssetFinancials {
    /// Capital expenditure.
    pub capex: f64,
    /// Operating expenditure over the remaining lifetime.
    pub opex: f64,
    /// Discount rate in `[0, 1)`.
    pub discount_rate: f64,
    /// Technical lifetime in years.
    pub lifetime_years: f64,
    /// Age at simulation start in years.
    pub age_years: f64,
    /// Lifetime generation estimate (kWh); derived from the capacity factor when absent.
    pub estimated_lifetime_generation: Option<f64>,
}

impl AssetFinancials {
    /// Default assumptions for a new asset of `kind` and `capacity`.
    pub fn default_for(kind: AssetKind, capacity: f64) -> Self {
        let lifetime_years = kind.default_lifetime_years();
        Self {
            capex: capacity * kind.default_capex_per_kw(),
            opex: capacity * kind.default_opex_per_kw_year() * lifetime_years,
            discount_rate: 0.05,
            lifetime_years,
            age_years: 0.0,
            estimated_lifetime_generation: None,
        }
    }

    /// Years of operation left.
    pub fn remaining_years(&self) -> f64 {
        self.lifetime_years - self.age_years
    }

    /// Lifetime generation, falling back to the capacity-factor table.
    pub fn lifetime_generation(&self, kind: AssetKind, capacity: f64) -> f64 {
        self.estimated_lifetime_generation.unwrap_or_else(|| {
            capacity * kind.capacity_factor() * HOURS_PER_YEAR * self.remaining_years()
        })
    }

    /// Checks the assumptions are usable for an LCOE.
    pub fn validate(&self, field: &str) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if self.capex < 0.0 || self.opex < 0.0 {
            errors.push(ConfigError::new(
                format!("{field}.capex"),
                "capex and opex must be >= 0",
            ));
        }
        if !(0.0..1.0).contains(&self.discount_rate) {
            errors.push(ConfigError::new(
                format!("{field}.discount_rate"),
                "must be in [0.0, 1.0)",
            ));
        }
        if self.age_years < 0.0 || self.remaining_years() <= 0.0 {
            errors.push(ConfigError::new(
                format!("{field}.age_years"),
                "must be >= 0 and below lifetime_years",
            ));
        }
        if self.estimated_lifetime_generation.is_some_and(|g| g <= 0.0) {
            errors.push(ConfigError::new(
                format!("{field}.estimated_lifetime_generation"),
                "must be > 0",
            ));
        }
        errors
    }
}

/// Levelized cost of energy.
///
/// Numerator and denominator are both scaled by `(1 - r)^(n + 1)` with
/// `n` the remaining lifetime, so the discount rate cancels and does not
/// change the result.
pub fn levelized_cost(financials: &AssetFinancials, kind: AssetKind, capacity: f64) -> f64 {
    let lifespan = financials.remaining_years();
    let discount = (1.0 - financials.discount_rate).powf(lifespan + 1.0);
    let discounted_cost = (financials.capex + financials.opex) / discount;
    let discounted_generation = financials.lifetime_generation(kind, capacity) / discount;
    discounted_cost / discounted_generation
}

/// Concrete asset model behind an [`Asset`].
#[derive(Debug, Clone, PartialEq)]
pub enum AssetModel {
    Solar(Solar),
    Wind(Wind),
    Battery(Battery),
}

impl AssetModel {
    fn generator(&self) -> &dyn Generator {
        match self {
            AssetModel::Solar(s) => s,
            AssetModel::Wind(w) => w,
            AssetModel::Battery(b) => b,
        }
    }
}

/// A generation or storage asset, owned by a prosumer or by the community.
///
/// The LCOE is fixed at construction. Supply schedules are cached by
/// [`Asset::refresh_supply`] and [`Asset::refresh_day_ahead`] each tick.
#[derive(Debug, Clone)]
pub struct Asset {
    /// Unique agent identifier.
    pub id: AgentId,
    /// Owning member; `None` for a community asset.
    pub owner: Option<AgentId>,
    model: AssetModel,
    financials: AssetFinancials,
    lcoe: f64,
    supply_schedule: DaySeries,
    day_ahead_schedule: DaySeries,
}

impl Asset {
    /// Creates an asset and computes its LCOE.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::SimError::Configuration`] for a non-positive
    /// capacity, an efficiency outside `(0, 1]`, or unusable financials.
    pub fn new(
        id: AgentId,
        owner: Option<AgentId>,
        model: AssetModel,
        financials: AssetFinancials,
    ) -> Result<Self> {
        let field = format!("asset {id}");
        let generator = model.generator();
        if !(generator.capacity() > 0.0) {
            return Err(SimError::config(format!("{field}.capacity"), "must be > 0"));
        }
        if !(generator.efficiency() > 0.0 && generator.efficiency() <= 1.0) {
            return Err(SimError::config(
                format!("{field}.efficiency"),
                "must be in (0.0, 1.0]",
            ));
        }
        if let Some(first) = financials.validate(&field).into_iter().next() {
            return Err(first.into());
        }
        let lcoe = levelized_cost(&financials, generator.kind(), generator.capacity());
        Ok(Self {
            id,
            owner,
            model,
            financials,
            lcoe,
            supply_schedule: ZERO_DAY,
            day_ahead_schedule: ZERO_DAY,
        })
    }

    /// Asset kind.
    pub fn kind(&self) -> AssetKind {
        self.model.generator().kind()
    }

    /// Rated capacity.
    pub fn capacity(&self) -> f64 {
        self.model.generator().capacity()
    }

    /// Conversion efficiency.
    pub fn efficiency(&self) -> f64 {
        self.model.generator().efficiency()
    }

    pub fn model(&self) -> &AssetModel {
        &self.model
    }

    pub fn financials(&self) -> &AssetFinancials {
        &self.financials
    }

    /// Levelized cost of energy computed at construction.
    pub fn lcoe(&self) -> f64 {
        self.lcoe
    }

    /// Supply for the current tick, as of the last refresh.
    pub fn supply_schedule(&self) -> &DaySeries {
        &self.supply_schedule
    }

    /// Supply forecast for the next day, as of the last refresh.
    pub fn day_ahead_schedule(&self) -> &DaySeries {
        &self.day_ahead_schedule
    }

    /// Recomputes today's supply. The cached value is left untouched on error.
    pub fn refresh_supply(
        &mut self,
        date: NaiveDate,
        profiles: &dyn ProfileSource,
    ) -> Result<&DaySeries> {
        self.supply_schedule = self.model.generator().supply_schedule(date, profiles)?;
        Ok(&self.supply_schedule)
    }

    /// Recomputes tomorrow's supply forecast.
    pub fn refresh_day_ahead(
        &mut self,
        date: NaiveDate,
        profiles: &dyn ProfileSource,
    ) -> Result<&DaySeries> {
        self.day_ahead_schedule = self
            .model
            .generator()
            .day_ahead_supply_schedule(date, profiles)?;
        Ok(&self.day_ahead_schedule)
    }
}
