//! Energy community simulator entry point: CLI wiring and config-driven model construction.

use std::process;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use ec_sim::cli::{self, CliOptions};
use ec_sim::config::ScenarioConfig;
use ec_sim::error::Result;
use ec_sim::experiment::ExperimentDriver;
use ec_sim::io::export::export_csv;
use ec_sim::sim::engine::SimulationModel;
use ec_sim::sim::kpi::RunSummary;
use ec_sim::telemetry;

/// Runs one model over the configured days, prints every record and the summary.
fn run_single(cfg: &ScenarioConfig, cli: &CliOptions) -> Result<()> {
    let s = &cfg.simulation;
    info!(community = %s.community, start = %s.start_date, steps = s.steps, seed = s.seed, "single run");
    let mut model = SimulationModel::new(
        cfg.model_setup()?,
        &cfg.roster()?,
        cfg.profile_source(),
        StdRng::seed_from_u64(s.seed),
    )?;
    let records = model.run(s.steps)?;

    for r in records {
        println!("{r}");
    }
    println!("\n{}", RunSummary::from_records(records));

    if let Some(path) = &cli.results_out {
        export_csv(records, &[], path)?;
        eprintln!("Results written to {}", path.display());
    }
    Ok(())
}

/// Runs the configured experiment segment and prints one line per combination.
fn run_experiment(cfg: &ScenarioConfig) -> Result<()> {
    let e = &cfg.experiment;
    let driver = ExperimentDriver::new(
        cfg.simulation.community.clone(),
        cfg.roster()?,
        cfg.model_setup()?,
        cfg.profile_source(),
        cfg.parameter_space(),
        cfg.simulation.seed,
    )
    .with_output_dir(&e.output_dir);

    let report =
        driver.run_experiments(e.replications, cfg.simulation.steps, e.segments, e.segment_index)?;

    for outcome in &report.completed {
        let params: Vec<String> = outcome
            .combination
            .values
            .iter()
            .map(|(name, v)| format!("{name}={v}"))
            .collect();
        println!(
            "#{:<4} {} | rows={} shifted={:.1} kWh cost={:.2} saved={:.2}",
            outcome.combination.index,
            params.join(" "),
            outcome.rows,
            outcome.summary.shifted_load,
            outcome.summary.energy_cost,
            outcome.summary.savings,
        );
    }
    for (index, error) in &report.failed {
        eprintln!("combination #{index} failed: {error}");
    }
    println!(
        "\n{} combinations completed, {} failed, output in {}",
        report.completed.len(),
        report.failed.len(),
        e.output_dir.display()
    );
    Ok(())
}

fn main() {
    telemetry::init_tracing();

    let cli = match cli::parse_args() {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("error: {e}");
            cli::print_usage();
            process::exit(2);
        }
    };
    if cli.help {
        cli::print_usage();
        return;
    }

    let scenario = match cli.load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    // Validate
    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let outcome = if cli.experiment {
        run_experiment(&scenario)
    } else {
        run_single(&scenario, &cli)
    };
    if let Err(e) = outcome {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
