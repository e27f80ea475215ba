//! TOML-based scenario configuration and community presets.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Days, NaiveDate};
use serde::Deserialize;
use thiserror::Error;

use crate::community::{self, COMMUNITIES, RosterEntry};
use crate::experiment::{Parameter, ParameterSpace, default_levers, default_uncertainties};
use crate::members::{TariffRecord, TariffTable};
use crate::profiles::{ProfileSource, SyntheticProfiles};
use crate::sim::engine::ModelSetup;
use crate::sim::schedule::TimingRule;
use crate::sim::scheduler::ActivationPolicy;
use crate::sim::types::{Levers, Uncertainties};

/// Top-level scenario configuration parsed from TOML.
///
/// Every section is optional and defaults to the baseline scenario. Load
/// from TOML with [`ScenarioConfig::from_toml_file`] or start from a
/// community preset with [`ScenarioConfig::from_preset`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Community, calendar, and run-level switches.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Lever values for single runs.
    #[serde(default)]
    pub levers: Levers,
    /// Uncertainty values for single runs.
    #[serde(default)]
    pub uncertainties: Uncertainties,
    /// Parameter sweep settings.
    #[serde(default)]
    pub experiment: ExperimentConfig,
    /// Energy tariff.
    #[serde(default)]
    pub tariff: TariffConfig,
    /// Synthetic profile data range.
    #[serde(default)]
    pub profiles: ProfilesConfig,
}

/// Community, calendar, and run-level switches.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Community preset name.
    pub community: String,
    /// Date of tick 0, written as a quoted `"YYYY-MM-DD"` string.
    pub start_date: NaiveDate,
    /// Number of days to simulate (must be > 0).
    pub steps: usize,
    /// Master random seed.
    pub seed: u64,
    /// Member activation order.
    pub activation: ActivationPolicy,
    /// Whether the coordinator publishes time-of-day signals.
    pub demand_response: bool,
    /// Timing rule: `"positive"` or `"percentile"`.
    pub timing: String,
    /// Percentile (0-100) used by the `"percentile"` rule.
    pub timing_percentile: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            community: "gridflex_heeten".to_string(),
            start_date: ymd(2021, 1, 1),
            steps: 365,
            seed: 42,
            activation: ActivationPolicy::Sequential,
            demand_response: true,
            timing: "positive".to_string(),
            timing_percentile: 70.0,
        }
    }
}

/// Parameter sweep settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExperimentConfig {
    /// Runs per combination (must be >= 1).
    pub replications: usize,
    /// Number of segments the table is split into (must be >= 1).
    pub segments: usize,
    /// Segment run by this job (must be < segments).
    pub segment_index: usize,
    /// Directory receiving one CSV per combination.
    pub output_dir: PathBuf,
    /// Swept uncertainties, outermost first.
    pub uncertainties: Vec<Parameter>,
    /// Swept levers, after the uncertainties.
    pub levers: Vec<Parameter>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            replications: 10,
            segments: 1,
            segment_index: 0,
            output_dir: PathBuf::from("results"),
            uncertainties: default_uncertainties(),
            levers: default_levers(),
        }
    }
}

/// Energy tariff: a base record plus optional per-month overrides.
///
/// An override replaces the whole record for its month; fields it leaves
/// out take the built-in defaults, not the base values.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TariffConfig {
    pub base: TariffRecord,
    /// Keyed by English month name (`"January"`, `"Feb"`, ...).
    pub months: BTreeMap<String, TariffRecord>,
}

impl TariffConfig {
    /// Builds the monthly tariff table.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for an unknown month name.
    pub fn table(&self) -> Result<TariffTable, ConfigError> {
        let mut table = TariffTable::uniform(self.base);
        for (name, record) in &self.months {
            table.insert_named(name, *record)?;
        }
        Ok(table)
    }
}

/// Date range and seed of the synthetic profile generator.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfilesConfig {
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub seed: u64,
}

impl Default for ProfilesConfig {
    fn default() -> Self {
        Self {
            first_date: ymd(2021, 1, 1),
            last_date: ymd(2022, 12, 31),
            seed: 2021,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.steps"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: the `gridflex_heeten` community over 2021.
    pub fn baseline() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            levers: Levers::default(),
            uncertainties: Uncertainties::default(),
            experiment: ExperimentConfig::default(),
            tariff: TariffConfig::default(),
            profiles: ProfilesConfig::default(),
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = COMMUNITIES;

    /// Loads the baseline scenario for a named community.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the community is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        if !Self::PRESETS.contains(&name) {
            return Err(unknown_community(name));
        }
        let mut cfg = Self::baseline();
        cfg.simulation.community = name.to_string();
        Ok(cfg)
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// The configured timing rule.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for an unknown rule name.
    pub fn timing_rule(&self) -> Result<TimingRule, ConfigError> {
        match self.simulation.timing.as_str() {
            "positive" => Ok(TimingRule::Positive),
            "percentile" => Ok(TimingRule::Percentile(self.simulation.timing_percentile)),
            other => Err(ConfigError::new(
                "simulation.timing",
                format!("must be \"positive\" or \"percentile\", got \"{other}\""),
            )),
        }
    }

    /// Run-level settings for the simulation model.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for an unknown timing rule or month name.
    pub fn model_setup(&self) -> Result<ModelSetup, ConfigError> {
        let s = &self.simulation;
        Ok(ModelSetup {
            levers: self.levers,
            uncertainties: self.uncertainties,
            demand_response: s.demand_response,
            timing_rule: self.timing_rule()?,
            activation: s.activation,
            tariffs: self.tariff.table()?,
            ..ModelSetup::new(s.start_date)
        })
    }

    /// Roster of the configured community.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the community is unknown.
    pub fn roster(&self) -> Result<Vec<RosterEntry>, ConfigError> {
        community::roster(&self.simulation.community)
            .ok_or_else(|| unknown_community(&self.simulation.community))
    }

    /// Synthetic profile source over the configured date range.
    pub fn profile_source(&self) -> Arc<dyn ProfileSource> {
        let p = &self.profiles;
        Arc::new(SyntheticProfiles::new(p.first_date, p.last_date, p.seed))
    }

    /// Swept parameters of the experiment section.
    pub fn parameter_space(&self) -> ParameterSpace {
        ParameterSpace {
            uncertainties: self.experiment.uncertainties.clone(),
            levers: self.experiment.levers.clone(),
        }
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if !COMMUNITIES.contains(&s.community.as_str()) {
            errors.push(unknown_community(&s.community));
        }
        if s.steps == 0 {
            errors.push(ConfigError::new("simulation.steps", "must be > 0"));
        }
        if let Err(e) = self.timing_rule() {
            errors.push(e);
        }
        if !(0.0..=100.0).contains(&s.timing_percentile) {
            errors.push(ConfigError::new(
                "simulation.timing_percentile",
                format!("must be in [0, 100], got {}", s.timing_percentile),
            ));
        }

        errors.extend(self.levers.validate());
        errors.extend(self.uncertainties.validate());

        let e = &self.experiment;
        if e.replications == 0 {
            errors.push(ConfigError::new("experiment.replications", "must be >= 1"));
        }
        if e.segments == 0 {
            errors.push(ConfigError::new("experiment.segments", "must be >= 1"));
        } else if e.segment_index >= e.segments {
            errors.push(ConfigError::new(
                "experiment.segment_index",
                format!("must be < experiment.segments ({})", e.segments),
            ));
        }
        errors.extend(self.parameter_space().validate());

        errors.extend(self.tariff.base.validate("tariff.base"));
        for (name, record) in &self.tariff.months {
            errors.extend(record.validate(&format!("tariff.months.{name}")));
        }
        if let Err(e) = self.tariff.table() {
            errors.push(e);
        }

        let p = &self.profiles;
        if p.first_date > p.last_date {
            errors.push(ConfigError::new(
                "profiles.first_date",
                "must not be after profiles.last_date",
            ));
        }
        if s.start_date < p.first_date {
            errors.push(ConfigError::new(
                "simulation.start_date",
                format!("must not be before profiles.first_date ({})", p.first_date),
            ));
        }
        // The last tick forecasts the day after it.
        match s.start_date.checked_add_days(Days::new(s.steps as u64)) {
            Some(needed) if needed <= p.last_date => {}
            _ => errors.push(ConfigError::new(
                "profiles.last_date",
                format!(
                    "must cover {} days after simulation.start_date ({})",
                    s.steps, s.start_date
                ),
            )),
        }

        errors
    }
}

fn unknown_community(name: &str) -> ConfigError {
    ConfigError::new(
        "simulation.community",
        format!(
            "unknown community \"{name}\", available: {}",
            COMMUNITIES.join(", ")
        ),
    )
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}
