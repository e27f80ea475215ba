//! CSV export for tick records.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::assets::AssetKind;
use crate::error::Result;
use crate::members::MemberCategory;
use crate::sim::types::{CategoryMetrics, TickRecord};

/// Community-wide columns written for every row, after the parameter columns.
const BASE_COLUMNS: &[&str] = &[
    "replication",
    "tick",
    "date",
    "scheduled_demand",
    "realised_demand",
    "shifted_load",
    "total_generation",
    "excess_generation",
    "energy_cost",
    "savings",
    "energy_import",
    "energy_export",
    "surplus_hours",
    "deficit_hours",
    "participants",
];

/// Per-category columns, prefixed with the category label.
const CATEGORY_COLUMNS: &[&str] = &[
    "members",
    "scheduled_demand",
    "realised_demand",
    "shifted_load",
    "generation",
    "energy_cost",
    "savings",
    "avg_demand_profile",
    "total_demand_profile",
];

/// Output file of one experiment combination.
///
/// ```
/// use std::path::Path;
/// use ec_sim::io::export::result_path;
///
/// let p = result_path(Path::new("out"), "minimal", 7);
/// assert_eq!(p, Path::new("out/minimal_results_7.csv"));
/// ```
pub fn result_path(dir: &Path, community: &str, index: usize) -> PathBuf {
    dir.join(format!("{community}_results_{index}.csv"))
}

/// Column names for the given parameter names.
pub fn header(parameters: &[(String, f64)]) -> Vec<String> {
    let mut columns: Vec<String> = parameters.iter().map(|(name, _)| name.clone()).collect();
    columns.extend(BASE_COLUMNS.iter().map(|c| c.to_string()));
    for category in MemberCategory::ALL {
        columns.extend(
            CATEGORY_COLUMNS
                .iter()
                .map(|c| format!("{}_{c}", category.label())),
        );
    }
    for kind in AssetKind::ALL {
        columns.push(format!("{}_total_supply_profile", kind.label()));
    }
    columns
}

/// Exports records to a CSV file, creating parent directories.
///
/// # Arguments
///
/// * `records` - Tick records, in order
/// * `parameters` - Experiment parameter values repeated on every row
/// * `path` - Output file path
///
/// # Errors
///
/// Returns an I/O, CSV, or JSON error if writing fails.
pub fn export_csv(records: &[TickRecord], parameters: &[(String, f64)], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    write_csv(records, parameters, io::BufWriter::new(file))
}

/// Writes records as CSV to any writer.
///
/// Profile columns hold a JSON array of 96 values.
///
/// # Errors
///
/// Returns a CSV or JSON error if writing fails.
pub fn write_csv(
    records: &[TickRecord],
    parameters: &[(String, f64)],
    writer: impl Write,
) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(header(parameters))?;

    let empty = CategoryMetrics::default();
    for r in records {
        let mut row: Vec<String> = parameters.iter().map(|(_, v)| v.to_string()).collect();
        row.extend([
            r.replication.to_string(),
            r.tick.to_string(),
            r.date.to_string(),
            format!("{:.4}", r.scheduled_demand),
            format!("{:.4}", r.realised_demand),
            format!("{:.4}", r.shifted_load),
            format!("{:.4}", r.total_generation),
            format!("{:.4}", r.excess_generation),
            format!("{:.4}", r.energy_cost),
            format!("{:.4}", r.savings),
            format!("{:.4}", r.energy_import),
            format!("{:.4}", r.energy_export),
            r.surplus_hours.to_string(),
            r.deficit_hours.to_string(),
            r.participants.to_string(),
        ]);
        for category in MemberCategory::ALL {
            let m = r.categories.get(&category).unwrap_or(&empty);
            row.extend([
                m.members.to_string(),
                format!("{:.4}", m.scheduled_demand),
                format!("{:.4}", m.realised_demand),
                format!("{:.4}", m.shifted_load),
                format!("{:.4}", m.generation),
                format!("{:.4}", m.energy_cost),
                format!("{:.4}", m.savings),
                serde_json::to_string(&m.avg_demand_profile)?,
                serde_json::to_string(&m.total_demand_profile)?,
            ]);
        }
        for kind in AssetKind::ALL {
            let supply = r.supply_by_asset.get(&kind).map(Vec::as_slice).unwrap_or(&[]);
            row.push(serde_json::to_string(supply)?);
        }
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}
