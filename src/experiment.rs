//! Parameter sweeps over levers and uncertainties.
//!
//! The experiment table is the Cartesian product of every uncertainty and
//! lever value list, uncertainties outer and levers inner, each in
//! declaration order. A batch job runs one contiguous segment of that
//! table, `replications` times per combination, and writes one CSV per
//! combination.

use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use itertools::Itertools;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::community::RosterEntry;
use crate::config::ConfigError;
use crate::error::{Result, SimError};
use crate::io::export::{export_csv, result_path};
use crate::profiles::ProfileSource;
use crate::sim::engine::{ModelSetup, SimulationModel};
use crate::sim::kpi::RunSummary;
use crate::sim::types::{Levers, TickRecord, Uncertainties};

/// A named parameter and the values it sweeps over.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Parameter {
    pub name: String,
    pub values: Vec<f64>,
}

impl Parameter {
    pub fn new(name: &str, values: &[f64]) -> Self {
        Self {
            name: name.to_string(),
            values: values.to_vec(),
        }
    }
}

/// Ordered uncertainty and lever value lists.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpace {
    pub uncertainties: Vec<Parameter>,
    pub levers: Vec<Parameter>,
}

impl Default for ParameterSpace {
    fn default() -> Self {
        Self {
            uncertainties: default_uncertainties(),
            levers: default_levers(),
        }
    }
}

/// X1 {0.4, 0.8}, X2 {0.5, 1.0}, X3 {0.5, 0.9}.
pub fn default_uncertainties() -> Vec<Parameter> {
    vec![
        Parameter::new("X1", &[0.4, 0.8]),
        Parameter::new("X2", &[0.5, 1.0]),
        Parameter::new("X3", &[0.5, 0.9]),
    ]
}

/// L1 {0.0, 0.5, 0.75}, L2 {0.1, 0.5, 1.0}, L3 {0.1, 0.45, 0.9}.
pub fn default_levers() -> Vec<Parameter> {
    vec![
        Parameter::new("L1", &[0.0, 0.5, 0.75]),
        Parameter::new("L2", &[0.1, 0.5, 1.0]),
        Parameter::new("L3", &[0.1, 0.45, 0.9]),
    ]
}

impl ParameterSpace {
    /// Checks names, duplicates, empty lists, and value ranges.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let groups = [
            ("experiment.uncertainties", &self.uncertainties, Uncertainties::NAMES),
            ("experiment.levers", &self.levers, Levers::NAMES),
        ];
        let mut seen = Vec::new();
        for (field, params, known) in groups {
            for p in params {
                if !known.contains(&p.name.as_str()) {
                    errors.push(ConfigError::new(
                        field,
                        format!("unknown parameter \"{}\", expected one of {known:?}", p.name),
                    ));
                }
                if seen.contains(&p.name) {
                    errors.push(ConfigError::new(field, format!("\"{}\" listed twice", p.name)));
                }
                seen.push(p.name.clone());
                if p.values.is_empty() {
                    errors.push(ConfigError::new(
                        format!("{field}.{}", p.name),
                        "value list must not be empty",
                    ));
                }
                if let Some(v) = p.values.iter().find(|v| !(0.0..=1.0).contains(*v)) {
                    errors.push(ConfigError::new(
                        format!("{field}.{}", p.name),
                        format!("values must be in [0.0, 1.0], got {v}"),
                    ));
                }
            }
        }
        errors
    }

    /// Parameter names in column order.
    pub fn names(&self) -> Vec<&str> {
        self.uncertainties
            .iter()
            .chain(&self.levers)
            .map(|p| p.name.as_str())
            .collect()
    }

    /// Number of combinations in the full table.
    pub fn len(&self) -> usize {
        self.uncertainties
            .iter()
            .chain(&self.levers)
            .map(|p| p.values.len())
            .product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One row of the experiment table.
#[derive(Debug, Clone, PartialEq)]
pub struct Combination {
    /// Row index in the full table.
    pub index: usize,
    /// `(name, value)` pairs in column order.
    pub values: Vec<(String, f64)>,
    pub uncertainties: Uncertainties,
    pub levers: Levers,
}

/// Builds the full combination table.
///
/// Parameters not named in `space` keep their values from `base_levers`
/// and `base_uncertainties`.
///
/// # Errors
///
/// Returns a `ConfigError` for an unknown parameter name.
pub fn prepare_experiment_setup(
    space: &ParameterSpace,
    base_levers: Levers,
    base_uncertainties: Uncertainties,
) -> std::result::Result<Vec<Combination>, ConfigError> {
    let params: Vec<&Parameter> = space.uncertainties.iter().chain(&space.levers).collect();
    let rows: Vec<Vec<f64>> = if params.is_empty() {
        vec![Vec::new()]
    } else {
        params
            .iter()
            .map(|p| p.values.iter().copied())
            .multi_cartesian_product()
            .collect()
    };

    rows.into_iter()
        .enumerate()
        .map(|(index, row)| {
            let mut levers = base_levers;
            let mut uncertainties = base_uncertainties;
            let mut values = Vec::with_capacity(row.len());
            for (p, v) in params.iter().zip(row) {
                if Uncertainties::NAMES.contains(&p.name.as_str()) {
                    uncertainties.set(&p.name, v)?;
                } else {
                    levers.set(&p.name, v)?;
                }
                values.push((p.name.clone(), v));
            }
            Ok(Combination {
                index,
                values,
                uncertainties,
                levers,
            })
        })
        .collect()
}

/// Rows of the table handled by segment `index` of `segments`.
///
/// Every segment has `total / segments` rows; the `total % segments`
/// trailing rows belong to no segment.
///
/// ```
/// use ec_sim::experiment::segment_range;
///
/// assert_eq!(segment_range(10, 3, 0), 0..3);
/// assert_eq!(segment_range(10, 3, 2), 6..9);
/// ```
pub fn segment_range(total: usize, segments: usize, index: usize) -> Range<usize> {
    if segments == 0 || index >= segments {
        return 0..0;
    }
    let size = total / segments;
    index * size..(index + 1) * size
}

/// Seed of one replication, derived from the base seed and its position.
pub fn replication_seed(base: u64, combination: usize, replication: usize) -> u64 {
    splitmix64(
        base ^ splitmix64(((combination as u64) << 32) ^ replication as u64),
    )
}

/// Progress is logged after every fifth completed condition.
fn is_progress_point(completed: usize) -> bool {
    completed % 5 == 0
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Outcome of one successfully run combination.
#[derive(Debug, Clone)]
pub struct CombinationOutcome {
    pub combination: Combination,
    /// Rows across all replications.
    pub rows: usize,
    pub summary: RunSummary,
    /// Output file, when the driver writes files.
    pub path: Option<PathBuf>,
}

/// Result of a segment run.
#[derive(Debug, Clone, Default)]
pub struct ExperimentReport {
    pub completed: Vec<CombinationOutcome>,
    /// Index and error message of each failed combination.
    pub failed: Vec<(usize, String)>,
}

/// Runs replications of a community over a parameter table.
pub struct ExperimentDriver {
    community: String,
    roster: Vec<RosterEntry>,
    setup: ModelSetup,
    profiles: Arc<dyn ProfileSource>,
    space: ParameterSpace,
    base_seed: u64,
    output_dir: Option<PathBuf>,
}

impl ExperimentDriver {
    /// Creates a driver. `setup` supplies the start date, tariffs, and
    /// the lever and uncertainty values not swept by `space`.
    pub fn new(
        community: impl Into<String>,
        roster: Vec<RosterEntry>,
        setup: ModelSetup,
        profiles: Arc<dyn ProfileSource>,
        space: ParameterSpace,
        base_seed: u64,
    ) -> Self {
        Self {
            community: community.into(),
            roster,
            setup,
            profiles,
            space,
            base_seed,
            output_dir: None,
        }
    }

    /// Writes one CSV per combination into `dir`.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// The full combination table.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Configuration`] for an invalid parameter space.
    pub fn prepare_experiment_setup(&self) -> Result<Vec<Combination>> {
        if let Some(first) = self.space.validate().into_iter().next() {
            return Err(first.into());
        }
        Ok(prepare_experiment_setup(
            &self.space,
            self.setup.levers,
            self.setup.uncertainties,
        )?)
    }

    /// Runs every replication of one combination and concatenates the rows.
    ///
    /// # Errors
    ///
    /// The first failing replication aborts the combination.
    pub fn run_combination(
        &self,
        combination: &Combination,
        replications: usize,
        steps: usize,
    ) -> Result<Vec<TickRecord>> {
        let mut records = Vec::with_capacity(replications * steps);
        for replication in 0..replications {
            let started = Instant::now();
            let setup = ModelSetup {
                levers: combination.levers,
                uncertainties: combination.uncertainties,
                replication,
                ..self.setup.clone()
            };
            let rng = StdRng::seed_from_u64(replication_seed(
                self.base_seed,
                combination.index,
                replication,
            ));
            let mut model =
                SimulationModel::new(setup, &self.roster, Arc::clone(&self.profiles), rng)?;
            model.run(steps)?;
            records.extend(model.into_records());
            debug!(
                combination = combination.index,
                replication,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "replication finished"
            );
        }
        Ok(records)
    }

    /// Runs segment `segment_index` of `segments`.
    ///
    /// A failing combination is logged and recorded in the report; the
    /// remaining combinations still run. Files of completed combinations
    /// are written as soon as each finishes.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Configuration`] for invalid arguments or an
    /// invalid parameter space.
    pub fn run_experiments(
        &self,
        replications: usize,
        steps: usize,
        segments: usize,
        segment_index: usize,
    ) -> Result<ExperimentReport> {
        if replications == 0 {
            return Err(SimError::config("experiment.replications", "must be >= 1"));
        }
        if segments == 0 || segment_index >= segments {
            return Err(SimError::config(
                "experiment.segment_index",
                format!("must be below segments ({segments})"),
            ));
        }
        let table = self.prepare_experiment_setup()?;
        let range = segment_range(table.len(), segments, segment_index);
        let block = &table[range.clone()];
        info!(
            community = %self.community,
            total = table.len(),
            first = range.start,
            end = range.end,
            replications,
            steps,
            "running experiment segment"
        );

        let mut report = ExperimentReport::default();
        for (n, combination) in block.iter().enumerate() {
            match self.finish_combination(combination, replications, steps) {
                Ok(outcome) => report.completed.push(outcome),
                Err(e) => {
                    warn!(condition = combination.index, error = %e, "combination failed");
                    report.failed.push((combination.index, e.to_string()));
                }
            }
            if is_progress_point(n + 1) {
                info!(
                    condition = combination.index,
                    done = n + 1,
                    of = block.len(),
                    "experiment progress"
                );
            }
        }
        info!(
            completed = report.completed.len(),
            failed = report.failed.len(),
            "experiment segment finished"
        );
        Ok(report)
    }

    fn finish_combination(
        &self,
        combination: &Combination,
        replications: usize,
        steps: usize,
    ) -> Result<CombinationOutcome> {
        let records = self.run_combination(combination, replications, steps)?;
        let path = match &self.output_dir {
            Some(dir) => {
                let path = result_path(dir, &self.community, combination.index);
                export_csv(&records, &combination.values, &path)?;
                Some(path)
            }
            None => None,
        };
        Ok(CombinationOutcome {
            combination: combination.clone(),
            rows: records.len(),
            summary: RunSummary::from_records(&records),
            path,
        })
    }
}
