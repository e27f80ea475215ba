//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use rand::SeedableRng;
use rand::rngs::StdRng;

use ec_sim::community::{AssetSpec, MemberSpec, RosterEntry, roster};
use ec_sim::members::MemberCategory;
use ec_sim::profiles::{IRRADIANCE, ProfileTable, SyntheticProfiles, WINDSPEED};
use ec_sim::sim::engine::{ModelSetup, SimulationModel};

/// Start date used across integration tests.
pub fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 6, 1).unwrap()
}

/// `start() + days`.
pub fn day(days: u64) -> NaiveDate {
    start() + chrono::Days::new(days)
}

/// Flat profile table over `start()..=day(last)`.
///
/// Every name in `loads` gets `demand` per slot; irradiance and wind
/// speed are flat at the given values.
pub fn flat_profiles(loads: &[&str], demand: f64, irradiance: f64, windspeed: f64, last: u64) -> Arc<ProfileTable> {
    let mut table = ProfileTable::new();
    for name in loads {
        table.insert_constant_range(name, start(), day(last), demand);
    }
    table.insert_constant_range(IRRADIANCE, start(), day(last), irradiance);
    table.insert_constant_range(WINDSPEED, start(), day(last), windspeed);
    Arc::new(table)
}

/// Synthetic profiles covering the first 60 days from `start()`.
pub fn synthetic_profiles(seed: u64) -> Arc<SyntheticProfiles> {
    Arc::new(SyntheticProfiles::new(start(), day(60), seed))
}

/// A coordinator and one residential consumer using profile `"home"`.
pub fn single_consumer() -> Vec<RosterEntry> {
    vec![
        RosterEntry::Coordinator,
        RosterEntry::Member(MemberSpec::consumer("home", MemberCategory::Residential)),
    ]
}

/// A coordinator and one prosumer with a 100 kW, 20% solar array.
pub fn single_solar_prosumer() -> Vec<RosterEntry> {
    vec![
        RosterEntry::Coordinator,
        RosterEntry::Member(MemberSpec::prosumer(
            "workshop",
            MemberCategory::NonResidential,
            vec![AssetSpec::solar(100.0, 0.20)],
        )),
    ]
}

/// Setup starting at `start()` with default levers and uncertainties.
pub fn default_setup() -> ModelSetup {
    ModelSetup::new(start())
}

/// A bundled community on synthetic data.
pub fn community_model(name: &str, setup: ModelSetup, seed: u64) -> SimulationModel {
    SimulationModel::new(
        setup,
        &roster(name).unwrap(),
        synthetic_profiles(seed),
        StdRng::seed_from_u64(seed),
    )
    .unwrap()
}
