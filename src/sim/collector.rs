//! Per-tick result rows.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::coordinator::Coordinator;
use super::power_balance::{ZERO_DAY, add_into, total};
use super::types::{CategoryMetrics, DaySeries, TickRecord};
use crate::assets::{Asset, AssetKind};
use crate::members::{Member, MemberCategory};

/// Collects one [`TickRecord`] per simulated tick.
#[derive(Debug, Clone, Default)]
pub struct ResultCollector {
    replication: usize,
    records: Vec<TickRecord>,
}

impl ResultCollector {
    pub fn new(replication: usize) -> Self {
        Self {
            replication,
            records: Vec::new(),
        }
    }

    pub fn records(&self) -> &[TickRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<TickRecord> {
        self.records
    }

    /// Builds and stores the record of a completed tick.
    pub fn collect(
        &mut self,
        tick: usize,
        date: NaiveDate,
        members: &[Member],
        community_assets: &[Asset],
        coordinator: &Coordinator,
    ) -> &TickRecord {
        let record = build_record(
            self.replication,
            tick,
            date,
            members,
            community_assets,
            coordinator,
        );
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }
}

fn build_record(
    replication: usize,
    tick: usize,
    date: NaiveDate,
    members: &[Member],
    community_assets: &[Asset],
    coordinator: &Coordinator,
) -> TickRecord {
    let mut categories = BTreeMap::new();
    for category in MemberCategory::ALL {
        let in_category: Vec<&Member> = members.iter().filter(|m| m.category == category).collect();
        categories.insert(category, category_metrics(&in_category));
    }

    let mut supply: BTreeMap<AssetKind, DaySeries> =
        AssetKind::ALL.iter().map(|k| (*k, ZERO_DAY)).collect();
    let owned = members.iter().flat_map(|m| m.assets.iter());
    for asset in owned.chain(community_assets.iter()) {
        if let Some(acc) = supply.get_mut(&asset.kind()) {
            add_into(acc, asset.supply_schedule());
        }
    }

    let member_generation: f64 = members.iter().map(|m| total(&m.generation_schedule)).sum();
    let community_generation: f64 = community_assets
        .iter()
        .map(|a| total(a.supply_schedule()))
        .sum();

    TickRecord {
        replication,
        tick,
        date,
        scheduled_demand: members.iter().map(|m| total(&m.scheduled_demand)).sum(),
        realised_demand: members.iter().map(|m| total(&m.realised_demand)).sum(),
        shifted_load: members.iter().map(|m| m.shifted_load).sum(),
        total_generation: member_generation + community_generation,
        excess_generation: members.iter().map(|m| total(&m.excess_generation)).sum(),
        energy_cost: members.iter().map(|m| m.energy_cost).sum(),
        savings: members.iter().map(|m| m.savings).sum(),
        energy_import: coordinator.total_energy_import(),
        energy_export: coordinator.total_energy_export(),
        surplus_hours: coordinator.surplus_timing().len(),
        deficit_hours: coordinator.deficit_timing().len(),
        participants: members.iter().filter(|m| m.participated).count(),
        categories,
        supply_by_asset: supply.into_iter().map(|(k, s)| (k, s.to_vec())).collect(),
    }
}

fn category_metrics(members: &[&Member]) -> CategoryMetrics {
    let mut total_profile = ZERO_DAY;
    for m in members {
        add_into(&mut total_profile, &m.realised_demand);
    }
    let n = members.len();
    let avg_profile: Vec<f64> = if n == 0 {
        ZERO_DAY.to_vec()
    } else {
        total_profile.iter().map(|v| v / n as f64).collect()
    };
    CategoryMetrics {
        members: n,
        scheduled_demand: members.iter().map(|m| total(&m.scheduled_demand)).sum(),
        realised_demand: members.iter().map(|m| total(&m.realised_demand)).sum(),
        shifted_load: members.iter().map(|m| m.shifted_load).sum(),
        generation: members.iter().map(|m| total(&m.generation_schedule)).sum(),
        energy_cost: members.iter().map(|m| m.energy_cost).sum(),
        savings: members.iter().map(|m| m.savings).sum(),
        avg_demand_profile: avg_profile,
        total_demand_profile: total_profile.to_vec(),
    }
}
