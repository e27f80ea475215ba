use chrono::NaiveDate;

use crate::assets::types::{AssetKind, Generator};
use crate::error::Result;
use crate::profiles::{ProfileSource, WINDSPEED};
use crate::sim::types::DaySeries;

/// Sea-level air density (kg/m³).
pub const AIR_DENSITY: f64 = 1.225;
/// Wind speed above which turbines shut down (m/s).
pub const CUTOUT_SPEED: f64 = 30.0;

/// A group of identical wind turbines driven by the wind-speed profile.
///
/// Power per turbine is `0.5 × ρ × A × v³ × efficiency` in W, reported in
/// kW per slot and capped at the group's rated capacity. Speeds above
/// [`CUTOUT_SPEED`] produce nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Wind {
    /// Rated capacity of the whole group in kW.
    pub capacity_kw: f64,
    /// Power coefficient (0..1.0).
    pub efficiency: f64,
    /// Rotor diameter in metres.
    pub rotor_diameter_m: f64,
    /// Number of turbines.
    pub turbine_count: u32,
}

impl Wind {
    /// Creates a turbine group.
    pub fn new(capacity_kw: f64, efficiency: f64, rotor_diameter_m: f64, turbine_count: u32) -> Self {
        Self {
            capacity_kw,
            efficiency,
            rotor_diameter_m,
            turbine_count,
        }
    }

    /// Area swept by one rotor (m²).
    pub fn swept_area(&self) -> f64 {
        let r = self.rotor_diameter_m / 2.0;
        std::f64::consts::PI * r * r
    }

    /// Group output in kW for a single wind-speed reading (m/s), at most
    /// `capacity_kw`.
    pub fn output(&self, speed: f64) -> f64 {
        if speed > CUTOUT_SPEED || speed <= 0.0 {
            return 0.0;
        }
        let watts = 0.5
            * AIR_DENSITY
            * self.swept_area()
            * speed.powi(3)
            * self.efficiency
            * f64::from(self.turbine_count);
        (watts / 1000.0).min(self.capacity_kw)
    }
}

impl Generator for Wind {
    fn supply_schedule(&self, date: NaiveDate, profiles: &dyn ProfileSource) -> Result<DaySeries> {
        let speed = profiles.series(date, WINDSPEED)?;
        Ok(speed.map(|v| self.output(v)))
    }

    fn capacity(&self) -> f64 {
        self.capacity_kw
    }

    fn efficiency(&self) -> f64 {
        self.efficiency
    }

    fn kind(&self) -> AssetKind {
        AssetKind::Wind
    }
}
