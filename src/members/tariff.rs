use std::collections::BTreeMap;

use chrono::{Datelike, Month, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::error::{Result, SimError};
use crate::sim::power_balance::total;
use crate::sim::types::DaySeries;

/// Tariff components for one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TariffRecord {
    /// Fixed transport charge per day.
    pub fixed_transport: f64,
    /// Fixed delivery charge per day.
    pub fixed_delivery: f64,
    /// Variable delivery rate per kWh.
    pub variable_delivery: f64,
    /// ODE (renewable energy surcharge) per kWh.
    pub ode_tax: f64,
    /// Energy tax per kWh.
    pub energy_tax: f64,
}

impl Default for TariffRecord {
    fn default() -> Self {
        Self {
            fixed_transport: 0.6,
            fixed_delivery: 0.15,
            variable_delivery: 0.07,
            ode_tax: 0.03,
            energy_tax: 0.09,
        }
    }
}

impl TariffRecord {
    /// Fixed charge per day.
    pub fn fixed_daily(&self) -> f64 {
        self.fixed_transport + self.fixed_delivery
    }

    /// Sum of all per-kWh components.
    pub fn per_kwh(&self) -> f64 {
        self.variable_delivery + self.ode_tax + self.energy_tax
    }

    pub fn validate(&self, field: &str) -> Vec<ConfigError> {
        [
            ("fixed_transport", self.fixed_transport),
            ("fixed_delivery", self.fixed_delivery),
            ("variable_delivery", self.variable_delivery),
            ("ode_tax", self.ode_tax),
            ("energy_tax", self.energy_tax),
        ]
        .into_iter()
        .filter(|(_, v)| !(v.is_finite() && *v >= 0.0))
        .map(|(name, v)| ConfigError::new(format!("{field}.{name}"), format!("must be >= 0, got {v}")))
        .collect()
    }
}

/// Tariff records keyed by English month name ("January" .. "December").
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use ec_sim::members::{TariffRecord, TariffTable};
///
/// let table = TariffTable::uniform(TariffRecord::default());
/// let day = NaiveDate::from_ymd_opt(2021, 2, 1).unwrap();
/// let cost = table.daily_cost(day, &[0.0; 96]).unwrap();
/// assert!((cost - 0.75).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TariffTable {
    months: BTreeMap<String, TariffRecord>,
}

impl TariffTable {
    /// An empty table; every lookup fails until months are inserted.
    pub fn new() -> Self {
        Self::default()
    }

    /// The same record for all twelve months.
    pub fn uniform(record: TariffRecord) -> Self {
        let mut table = Self::new();
        let mut month = Month::January;
        for _ in 0..12 {
            table.insert(month, record);
            month = month.succ();
        }
        table
    }

    /// Sets the record for `month`.
    pub fn insert(&mut self, month: Month, record: TariffRecord) {
        self.months.insert(month.name().to_string(), record);
    }

    /// Sets the record for a month given by name.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `name` is not an English month name.
    pub fn insert_named(&mut self, name: &str, record: TariffRecord) -> std::result::Result<(), ConfigError> {
        let month = name.parse::<Month>().map_err(|_| {
            ConfigError::new("tariff.months", format!("unknown month \"{name}\""))
        })?;
        self.insert(month, record);
        Ok(())
    }

    /// Record applying to `date`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::DataUnavailable`] (series = month name) when the
    /// month is missing.
    pub fn for_date(&self, date: NaiveDate) -> Result<&TariffRecord> {
        let name = month_name(date);
        self.months
            .get(name)
            .ok_or_else(|| SimError::data_unavailable(name, date))
    }

    /// Cost of consuming `realised` on `date`: fixed daily charges plus
    /// the per-kWh rate on the total.
    pub fn daily_cost(&self, date: NaiveDate, realised: &DaySeries) -> Result<f64> {
        let record = self.for_date(date)?;
        Ok(record.fixed_daily() + total(realised) * record.per_kwh())
    }

    /// Savings credited for `shifted_load` kWh moved on `date`.
    pub fn savings(&self, date: NaiveDate, shifted_load: f64) -> Result<f64> {
        Ok(shifted_load * self.for_date(date)?.per_kwh())
    }
}

fn month_name(date: NaiveDate) -> &'static str {
    const NAMES: [&str; 12] = [
        "January",
        "February",
        "March",
        "April",
        "May",
        "June",
        "July",
        "August",
        "September",
        "October",
        "November",
        "December",
    ];
    NAMES[date.month0() as usize]
}
