//! Command-line parsing for the `ec-sim` binary.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::{ConfigError, ScenarioConfig};

/// Parsed command-line options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOptions {
    pub scenario: Option<PathBuf>,
    pub community: Option<String>,
    pub steps: Option<usize>,
    pub seed: Option<u64>,
    /// Run the parameter sweep instead of a single model.
    pub experiment: bool,
    pub replications: Option<usize>,
    pub segments: Option<usize>,
    pub segment_index: Option<usize>,
    /// Experiment output directory.
    pub output: Option<PathBuf>,
    /// CSV file for a single run's records.
    pub results_out: Option<PathBuf>,
    pub help: bool,
}

impl CliOptions {
    /// Loads the scenario named by the options and applies the overrides.
    ///
    /// `--scenario` is read first; `--community` then replaces its
    /// community. Without either, the baseline scenario is used.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for an unreadable scenario or unknown community.
    pub fn load_config(&self) -> Result<ScenarioConfig, ConfigError> {
        let mut cfg = match (&self.scenario, &self.community) {
            (Some(path), _) => ScenarioConfig::from_toml_file(path)?,
            (None, Some(name)) => ScenarioConfig::from_preset(name)?,
            (None, None) => ScenarioConfig::baseline(),
        };
        self.apply(&mut cfg);
        Ok(cfg)
    }

    /// Overrides scenario fields with the values given on the command line.
    pub fn apply(&self, cfg: &mut ScenarioConfig) {
        if let Some(name) = &self.community {
            cfg.simulation.community = name.clone();
        }
        if let Some(steps) = self.steps {
            cfg.simulation.steps = steps;
        }
        if let Some(seed) = self.seed {
            cfg.simulation.seed = seed;
        }
        let e = &mut cfg.experiment;
        if let Some(n) = self.replications {
            e.replications = n;
        }
        if let Some(n) = self.segments {
            e.segments = n;
        }
        if let Some(i) = self.segment_index {
            e.segment_index = i;
        }
        if let Some(dir) = &self.output {
            e.output_dir = dir.clone();
        }
    }
}

pub fn parse_args() -> Result<CliOptions, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(args)
}

/// Parses arguments, excluding the program name.
pub fn parse_args_from(args: Vec<String>) -> Result<CliOptions, String> {
    let mut opts = CliOptions::default();
    let mut i = 0usize;

    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--help" | "-h" => {
                opts.help = true;
                return Ok(opts);
            }
            "--experiment" => opts.experiment = true,
            "--scenario" => {
                i += 1;
                let path = args.next_or_err(i, "missing value for --scenario (expected a TOML file path)")?;
                set_once(&mut opts.scenario, PathBuf::from(path), flag)?;
            }
            "--community" => {
                i += 1;
                let name = args.next_or_err(i, "missing value for --community (expected a community name)")?;
                set_once(&mut opts.community, name.to_string(), flag)?;
            }
            "--output" => {
                i += 1;
                let dir = args.next_or_err(i, "missing value for --output (expected a directory)")?;
                set_once(&mut opts.output, PathBuf::from(dir), flag)?;
            }
            "--results-out" => {
                i += 1;
                let path = args.next_or_err(i, "missing value for --results-out (expected a file path)")?;
                set_once(&mut opts.results_out, PathBuf::from(path), flag)?;
            }
            "--steps" => {
                i += 1;
                set_once(&mut opts.steps, args.parse_at(i, flag)?, flag)?;
            }
            "--seed" => {
                i += 1;
                set_once(&mut opts.seed, args.parse_at(i, flag)?, flag)?;
            }
            "--replications" => {
                i += 1;
                set_once(&mut opts.replications, args.parse_at(i, flag)?, flag)?;
            }
            "--segments" => {
                i += 1;
                set_once(&mut opts.segments, args.parse_at(i, flag)?, flag)?;
            }
            "--segment-index" => {
                i += 1;
                set_once(&mut opts.segment_index, args.parse_at(i, flag)?, flag)?;
            }
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    if opts.results_out.is_some() && opts.experiment {
        return Err(
            "--results-out applies to single runs; use --output with --experiment".to_string(),
        );
    }

    Ok(opts)
}

fn set_once<T>(slot: &mut Option<T>, value: T, flag: &str) -> Result<(), String> {
    if slot.replace(value).is_some() {
        return Err(format!("{flag} provided more than once"));
    }
    Ok(())
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
    fn parse_at<T: FromStr>(&self, index: usize, flag: &str) -> Result<T, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }

    fn parse_at<T: FromStr>(&self, index: usize, flag: &str) -> Result<T, String> {
        let raw = self.next_or_err(index, &format!("missing value for {flag} (expected a number)"))?;
        raw.parse()
            .map_err(|_| format!("{flag} value \"{raw}\" is not a valid non-negative integer"))
    }
}

pub fn print_usage() {
    eprintln!("ec-sim: agent-based energy community simulator");
    eprintln!();
    eprintln!("Usage: ec-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!(
        "  --community <name>       Community preset ({})",
        ScenarioConfig::PRESETS.join(", ")
    );
    eprintln!("  --steps <n>              Days to simulate");
    eprintln!("  --seed <u64>             Override random seed");
    eprintln!("  --results-out <path>     Export a single run's records to CSV");
    eprintln!("  --experiment             Run the lever/uncertainty sweep");
    eprintln!("  --replications <n>       Runs per experiment combination");
    eprintln!("  --segments <n>           Split the experiment table into n segments");
    eprintln!("  --segment-index <i>      Segment run by this job (0-based)");
    eprintln!("  --output <dir>           Experiment output directory");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If neither --scenario nor --community is given, gridflex_heeten is used.");
}
