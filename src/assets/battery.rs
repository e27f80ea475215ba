use chrono::NaiveDate;

use crate::assets::types::{AssetKind, Generator};
use crate::error::Result;
use crate::profiles::ProfileSource;
use crate::sim::power_balance::ZERO_DAY;
use crate::sim::types::DaySeries;

/// A stationary battery.
///
/// Storage has no primary energy source, so its supply schedule is always
/// zero; it takes part in the community for cost accounting (LCOE) and
/// asset reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct Battery {
    /// Energy capacity in kWh.
    pub capacity_kwh: f64,
    /// Round-trip efficiency (0..1.0).
    pub efficiency: f64,
}

impl Battery {
    /// Creates a new battery.
    pub fn new(capacity_kwh: f64, efficiency: f64) -> Self {
        Self {
            capacity_kwh,
            efficiency,
        }
    }
}

impl Generator for Battery {
    fn supply_schedule(&self, _date: NaiveDate, _profiles: &dyn ProfileSource) -> Result<DaySeries> {
        Ok(ZERO_DAY)
    }

    fn capacity(&self) -> f64 {
        self.capacity_kwh
    }

    fn efficiency(&self) -> f64 {
        self.efficiency
    }

    fn kind(&self) -> AssetKind {
        AssetKind::Battery
    }
}
