//! Post-hoc run summary computed from tick records.

use std::fmt;

use super::types::TickRecord;

/// Aggregate indicators of a complete run.
///
/// Computed post-hoc from `&[TickRecord]` so reported totals always agree
/// with the exported rows.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Number of ticks summarised.
    pub ticks: usize,
    /// Total scheduled demand (kWh).
    pub scheduled_demand: f64,
    /// Total realised demand (kWh).
    pub realised_demand: f64,
    /// Total generation of all assets (kWh).
    pub generation: f64,
    /// Share of generation consumed inside the community (0..1).
    pub self_consumed_share: f64,
    /// Total load moved by demand response (kWh).
    pub shifted_load: f64,
    /// Energy cost net of savings.
    pub energy_cost: f64,
    /// Total savings from demand response.
    pub savings: f64,
    /// Largest daily import (kWh).
    pub peak_import: f64,
    /// Largest daily export (kWh).
    pub peak_export: f64,
    /// Member-days on which load was shifted.
    pub participations: usize,
}

impl RunSummary {
    /// Summarises `records`; an empty slice yields an all-zero summary.
    pub fn from_records(records: &[TickRecord]) -> Self {
        let mut summary = Self {
            ticks: records.len(),
            scheduled_demand: 0.0,
            realised_demand: 0.0,
            generation: 0.0,
            self_consumed_share: 0.0,
            shifted_load: 0.0,
            energy_cost: 0.0,
            savings: 0.0,
            peak_import: 0.0,
            peak_export: 0.0,
            participations: 0,
        };
        let mut exported = 0.0;

        for r in records {
            summary.scheduled_demand += r.scheduled_demand;
            summary.realised_demand += r.realised_demand;
            summary.generation += r.total_generation;
            summary.shifted_load += r.shifted_load;
            summary.energy_cost += r.energy_cost;
            summary.savings += r.savings;
            summary.peak_import = summary.peak_import.max(r.energy_import);
            summary.peak_export = summary.peak_export.max(r.energy_export);
            summary.participations += r.participants;
            exported += r.energy_export;
        }

        if summary.generation > 0.0 {
            summary.self_consumed_share =
                ((summary.generation - exported) / summary.generation).clamp(0.0, 1.0);
        }
        summary
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Run Summary ({} days) ---", self.ticks)?;
        writeln!(f, "Scheduled demand:      {:.1} kWh", self.scheduled_demand)?;
        writeln!(f, "Realised demand:       {:.1} kWh", self.realised_demand)?;
        writeln!(
            f,
            "Generation:            {:.1} kWh ({:.1}% self-consumed)",
            self.generation,
            100.0 * self.self_consumed_share
        )?;
        writeln!(
            f,
            "Shifted load:          {:.1} kWh ({} member-days)",
            self.shifted_load, self.participations
        )?;
        writeln!(f, "Energy cost:           {:.2}", self.energy_cost)?;
        writeln!(f, "Savings:               {:.2}", self.savings)?;
        write!(
            f,
            "Peak daily import:     {:.1} kWh, export {:.1} kWh",
            self.peak_import, self.peak_export
        )
    }
}
