//! Demand and weather profile sources.
//!
//! Members look up their 96-slot load series by profile name; assets look
//! up [`IRRADIANCE`] (W/m²) and [`WINDSPEED`] (m/s). Every source must
//! answer for `date + 1` so day-ahead forecasts can be built, and fails
//! with [`SimError::DataUnavailable`] outside its loaded range.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::error::{Result, SimError};
use crate::sim::power_balance::ZERO_DAY;
use crate::sim::types::{DaySeries, SLOTS_PER_DAY};

/// Series name of global horizontal irradiance (W/m²).
pub const IRRADIANCE: &str = "irradiance";
/// Series name of hub-height wind speed (m/s).
pub const WINDSPEED: &str = "windspeed";

/// Read-only source of daily 96-slot series.
///
/// Sources are shared across replications, so implementations must not
/// mutate state on lookup.
pub trait ProfileSource: Send + Sync {
    /// Returns the series `name` for `date`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::DataUnavailable`] for an unknown name or a date
    /// outside the loaded range.
    fn series(&self, date: NaiveDate, name: &str) -> Result<DaySeries>;
}

/// In-memory profile table keyed by series name and date.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use ec_sim::profiles::{ProfileSource, ProfileTable};
///
/// let day = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
/// let mut table = ProfileTable::new();
/// table.insert_constant("irradiance", day, 500.0);
/// assert_eq!(table.series(day, "irradiance").unwrap()[40], 500.0);
/// assert!(table.series(day.succ_opt().unwrap(), "irradiance").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProfileTable {
    series: HashMap<String, BTreeMap<NaiveDate, DaySeries>>,
}

impl ProfileTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `values` for `name` on `date`, replacing any previous entry.
    pub fn insert(&mut self, name: impl Into<String>, date: NaiveDate, values: DaySeries) {
        self.series
            .entry(name.into())
            .or_default()
            .insert(date, values);
    }

    /// Stores a flat series for `name` on `date`.
    pub fn insert_constant(&mut self, name: impl Into<String>, date: NaiveDate, value: f64) {
        self.insert(name, date, [value; SLOTS_PER_DAY]);
    }

    /// Stores a flat series for every day in `first..=last`.
    pub fn insert_constant_range(
        &mut self,
        name: &str,
        first: NaiveDate,
        last: NaiveDate,
        value: f64,
    ) {
        for date in first.iter_days().take_while(|d| *d <= last) {
            self.insert_constant(name, date, value);
        }
    }

    /// Names of all stored series, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.series.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl ProfileSource for ProfileTable {
    fn series(&self, date: NaiveDate, name: &str) -> Result<DaySeries> {
        self.series
            .get(name)
            .and_then(|by_date| by_date.get(&date))
            .copied()
            .ok_or_else(|| SimError::data_unavailable(name, date))
    }
}

/// Parameters of a synthetic daily load shape (kWh per 15-minute slot).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadShape {
    /// Mean consumption per slot.
    pub base: f64,
    /// Amplitude of the daily sinusoid.
    pub amplitude: f64,
    /// Phase offset of the daily sinusoid (radians).
    pub phase_rad: f64,
    /// Relative seasonal swing, peaking mid-January.
    pub seasonal: f64,
    /// Standard deviation of per-slot Gaussian noise.
    pub noise_std: f64,
}

impl LoadShape {
    /// Household shape with an evening peak.
    pub const fn household(base: f64) -> Self {
        Self {
            base,
            amplitude: base * 0.6,
            phase_rad: 3.6,
            seasonal: 0.25,
            noise_std: base * 0.1,
        }
    }

    /// Business-hours shape peaking around midday.
    pub const fn business(base: f64) -> Self {
        Self {
            base,
            amplitude: base * 0.8,
            phase_rad: -1.57,
            seasonal: 0.1,
            noise_std: base * 0.05,
        }
    }

    /// Overnight charging shape peaking after midnight.
    pub const fn overnight(base: f64) -> Self {
        Self {
            base,
            amplitude: base * 0.9,
            phase_rad: 1.57,
            seasonal: 0.05,
            noise_std: base * 0.05,
        }
    }
}

/// Deterministic generator of load and weather series over a date range.
///
/// Every series is a pure function of `(seed, name, date)`; repeated
/// lookups return identical values.
#[derive(Debug, Clone)]
pub struct SyntheticProfiles {
    first: NaiveDate,
    last: NaiveDate,
    seed: u64,
    shapes: HashMap<String, LoadShape>,
}

impl SyntheticProfiles {
    /// Creates a generator answering for `first..=last` with the default shape catalogue.
    pub fn new(first: NaiveDate, last: NaiveDate, seed: u64) -> Self {
        let mut profiles = Self {
            first,
            last,
            seed,
            shapes: HashMap::new(),
        };
        for (name, shape) in default_shapes() {
            profiles.add_shape(name, shape);
        }
        profiles
    }

    /// Registers or replaces a load shape.
    pub fn add_shape(&mut self, name: impl Into<String>, shape: LoadShape) {
        self.shapes.insert(name.into(), shape);
    }

    /// Whether `date` lies inside the generated range.
    pub fn covers(&self, date: NaiveDate) -> bool {
        (self.first..=self.last).contains(&date)
    }

    fn rng_for(&self, name: &str, date: NaiveDate) -> StdRng {
        let mut h = fnv1a(name.as_bytes());
        h ^= date.num_days_from_ce() as u64;
        StdRng::seed_from_u64(h ^ self.seed.rotate_left(17))
    }

    fn load(&self, shape: &LoadShape, name: &str, date: NaiveDate) -> DaySeries {
        let mut rng = self.rng_for(name, date);
        let season = 1.0 + shape.seasonal * seasonal_cosine(date);
        let mut out = ZERO_DAY;
        for (slot, v) in out.iter_mut().enumerate() {
            let day_pos = slot as f64 / SLOTS_PER_DAY as f64;
            let angle = 2.0 * std::f64::consts::PI * day_pos + shape.phase_rad;
            let noise = gaussian_noise(&mut rng, shape.noise_std);
            *v = ((shape.base + shape.amplitude * angle.sin()) * season + noise).max(0.0);
        }
        out
    }

    fn irradiance(&self, date: NaiveDate) -> DaySeries {
        let mut rng = self.rng_for(IRRADIANCE, date);
        // Summer peaks near 850 W/m², winter near 250 W/m².
        let summer = -seasonal_cosine(date);
        let peak = 550.0 + 300.0 * summer;
        let half_daylight = 4.0 * (6.0 + 2.5 * summer);
        let sunrise = 48.0 - half_daylight;
        let sunset = 48.0 + half_daylight;
        let cloud = rng.random_range(0.3..=1.0);
        let mut out = ZERO_DAY;
        for (slot, v) in out.iter_mut().enumerate() {
            let t = slot as f64 + 0.5;
            if t <= sunrise || t >= sunset {
                continue;
            }
            let frac = ((t - sunrise) / (sunset - sunrise) * std::f64::consts::PI).sin();
            let flicker = 1.0 + gaussian_noise(&mut rng, 0.05);
            *v = (peak * frac * cloud * flicker).max(0.0);
        }
        out
    }

    fn windspeed(&self, date: NaiveDate) -> DaySeries {
        let mut rng = self.rng_for(WINDSPEED, date);
        let mean = rng.random_range(3.0..=12.0) * (1.0 + 0.2 * seasonal_cosine(date));
        let mut out = ZERO_DAY;
        let mut gust = 0.0;
        for (slot, v) in out.iter_mut().enumerate() {
            let day_pos = slot as f64 / SLOTS_PER_DAY as f64;
            let diurnal = 0.15 * mean * (2.0 * std::f64::consts::PI * day_pos - 1.57).sin();
            gust = 0.8 * gust + gaussian_noise(&mut rng, 0.6);
            *v = (mean + diurnal + gust).max(0.0);
        }
        out
    }
}

impl ProfileSource for SyntheticProfiles {
    fn series(&self, date: NaiveDate, name: &str) -> Result<DaySeries> {
        if !self.covers(date) {
            return Err(SimError::data_unavailable(name, date));
        }
        match name {
            IRRADIANCE => Ok(self.irradiance(date)),
            WINDSPEED => Ok(self.windspeed(date)),
            _ => self
                .shapes
                .get(name)
                .map(|shape| self.load(shape, name, date))
                .ok_or_else(|| SimError::data_unavailable(name, date)),
        }
    }
}

/// Load shapes for every profile name used by the bundled communities.
fn default_shapes() -> Vec<(&'static str, LoadShape)> {
    vec![
        ("hh1_consumption", LoadShape::household(0.07)),
        ("hh2_consumption", LoadShape::household(0.10)),
        ("hh3_consumption", LoadShape::household(0.14)),
        ("drink_packaging_sme", LoadShape::business(60.0)),
        ("food_packaging_sme", LoadShape::business(90.0)),
        ("school_mbo", LoadShape::business(25.0)),
        ("community_centre", LoadShape::business(4.0)),
        ("EV_bus_charging_station", LoadShape::overnight(40.0)),
    ]
}

/// Cosine of the day of year, +1 in mid-January and -1 in mid-July.
fn seasonal_cosine(date: NaiveDate) -> f64 {
    let doy = date.ordinal0() as f64;
    (2.0 * std::f64::consts::PI * (doy - 15.0) / 365.25).cos()
}

/// Gaussian noise via Box-Muller.
fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }
    let u1: f64 = rng.random::<f64>().clamp(1e-12, 1.0);
    let u2: f64 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos() * std_dev
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |h, b| {
        (h ^ u64::from(*b)).wrapping_mul(0x0100_0000_01b3)
    })
}
