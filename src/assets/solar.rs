use chrono::NaiveDate;

use crate::assets::types::{AssetKind, Generator};
use crate::error::Result;
use crate::profiles::{IRRADIANCE, ProfileSource};
use crate::sim::types::DaySeries;

/// A solar PV array driven by the irradiance profile.
///
/// Supply per slot is `capacity × efficiency × irradiance / 1000`, with
/// irradiance in W/m² and capacity in kW.
#[derive(Debug, Clone, PartialEq)]
pub struct Solar {
    /// Installed capacity in kW.
    pub capacity_kw: f64,
    /// Panel efficiency (0..1.0).
    pub efficiency: f64,
}

impl Solar {
    /// Creates a new solar array.
    ///
    /// # Arguments
    ///
    /// * `capacity_kw` - Installed capacity in kW
    /// * `efficiency` - Panel efficiency (0..1.0)
    pub fn new(capacity_kw: f64, efficiency: f64) -> Self {
        Self {
            capacity_kw,
            efficiency,
        }
    }

    /// Supply for a single irradiance reading (W/m²).
    pub fn output(&self, irradiance: f64) -> f64 {
        (self.capacity_kw * self.efficiency * irradiance / 1000.0).max(0.0)
    }
}

impl Generator for Solar {
    fn supply_schedule(&self, date: NaiveDate, profiles: &dyn ProfileSource) -> Result<DaySeries> {
        let irradiance = profiles.series(date, IRRADIANCE)?;
        Ok(irradiance.map(|w| self.output(w)))
    }

    fn capacity(&self) -> f64 {
        self.capacity_kw
    }

    fn efficiency(&self) -> f64 {
        self.efficiency
    }

    fn kind(&self) -> AssetKind {
        AssetKind::Solar
    }
}
