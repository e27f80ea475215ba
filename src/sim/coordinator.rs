//! Community coordinator: aggregate position and day-ahead ToD signal.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use tracing::debug;

use super::clock::next_day;
use super::event::TodSignal;
use super::power_balance::{ZERO_DAY, add_into, to_hourly, total};
use super::schedule::{DayAheadTiming, TimingRule};
use super::types::{AgentId, DaySeries};
use crate::members::{AgentType, Member, MemberCategory};

static NO_HOURS: BTreeSet<usize> = BTreeSet::new();

/// Read-only view of one member, taken after all members have stepped.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberSnapshot {
    pub id: AgentId,
    pub category: MemberCategory,
    pub agent_type: AgentType,
    pub realised_demand: DaySeries,
    pub excess_generation: DaySeries,
    pub day_ahead_demand: DaySeries,
    pub day_ahead_supply: DaySeries,
}

impl From<&Member> for MemberSnapshot {
    fn from(m: &Member) -> Self {
        Self {
            id: m.id,
            category: m.category,
            agent_type: m.agent_type,
            realised_demand: m.realised_demand,
            excess_generation: m.excess_generation,
            day_ahead_demand: m.day_ahead_demand,
            day_ahead_supply: m.day_ahead_supply,
        }
    }
}

/// Community state the coordinator aggregates for one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct CommunitySnapshot {
    pub date: NaiveDate,
    pub members: Vec<MemberSnapshot>,
    /// Today's supply of ownerless community assets.
    pub community_supply: DaySeries,
    /// Tomorrow's forecast supply of ownerless community assets.
    pub community_day_ahead_supply: DaySeries,
}

impl CommunitySnapshot {
    /// A snapshot with no members and no community generation.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            members: Vec::new(),
            community_supply: ZERO_DAY,
            community_day_ahead_supply: ZERO_DAY,
        }
    }

    /// Captures `members` in roster order.
    pub fn capture(
        date: NaiveDate,
        members: &[Member],
        community_supply: DaySeries,
        community_day_ahead_supply: DaySeries,
    ) -> Self {
        Self {
            date,
            members: members.iter().map(MemberSnapshot::from).collect(),
            community_supply,
            community_day_ahead_supply,
        }
    }
}

/// Singleton agent tracking the community's net position.
///
/// `step` aggregates the snapshot of the current tick and, with demand
/// response enabled, publishes a [`TodSignal`] for the following day. The
/// signal is read by members on the next tick.
#[derive(Debug, Clone)]
pub struct Coordinator {
    pub id: AgentId,
    date: Option<NaiveDate>,
    total_energy_import: f64,
    total_energy_export: f64,
    demand_response: bool,
    timing_rule: TimingRule,
    signal: Option<TodSignal>,
}

impl Coordinator {
    pub fn new(id: AgentId, demand_response: bool, timing_rule: TimingRule) -> Self {
        Self {
            id,
            date: None,
            total_energy_import: 0.0,
            total_energy_export: 0.0,
            demand_response,
            timing_rule,
            signal: None,
        }
    }

    /// Aggregates one tick.
    ///
    /// Import is the members' realised demand. Export is prosumer excess
    /// generation plus community-asset supply. Neither is fed back into
    /// the tick that produced it.
    pub fn step(&mut self, snapshot: &CommunitySnapshot) {
        self.date = Some(snapshot.date);

        self.total_energy_import = snapshot
            .members
            .iter()
            .map(|m| total(&m.realised_demand))
            .sum();
        self.total_energy_export = snapshot
            .members
            .iter()
            .filter(|m| m.agent_type == AgentType::Prosumer)
            .map(|m| total(&m.excess_generation))
            .sum::<f64>()
            + total(&snapshot.community_supply);

        self.signal = if self.demand_response {
            Some(self.day_ahead_signal(snapshot))
        } else {
            None
        };

        debug!(
            date = %snapshot.date,
            import = self.total_energy_import,
            export = self.total_energy_export,
            surplus_hours = self.surplus_timing().len(),
            deficit_hours = self.deficit_timing().len(),
            "coordinator aggregated tick"
        );
    }

    fn day_ahead_signal(&self, snapshot: &CommunitySnapshot) -> TodSignal {
        let mut demand = ZERO_DAY;
        let mut supply = snapshot.community_day_ahead_supply;
        for m in &snapshot.members {
            add_into(&mut demand, &m.day_ahead_demand);
            add_into(&mut supply, &m.day_ahead_supply);
        }
        let timing =
            DayAheadTiming::compute(&to_hourly(&demand), &to_hourly(&supply), self.timing_rule);
        TodSignal::from_timing(next_day(snapshot.date), timing)
    }

    /// Date of the last aggregated tick.
    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn total_energy_import(&self) -> f64 {
        self.total_energy_import
    }

    pub fn total_energy_export(&self) -> f64 {
        self.total_energy_export
    }

    pub fn demand_response(&self) -> bool {
        self.demand_response
    }

    /// Signal published on the last tick, if demand response is enabled.
    pub fn signal(&self) -> Option<&TodSignal> {
        self.signal.as_ref()
    }

    /// Surplus hours of the published signal (empty when none).
    pub fn surplus_timing(&self) -> &BTreeSet<usize> {
        self.signal.as_ref().map_or(&NO_HOURS, |s| &s.surplus_hours)
    }

    /// Deficit hours of the published signal (empty when none).
    pub fn deficit_timing(&self) -> &BTreeSet<usize> {
        self.signal.as_ref().map_or(&NO_HOURS, |s| &s.deficit_hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::types::SLOTS_PER_DAY;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 3, 3).unwrap()
    }

    fn snapshot_member(id: usize, agent_type: AgentType, demand: f64, excess: f64) -> MemberSnapshot {
        MemberSnapshot {
            id: AgentId(id),
            category: MemberCategory::Residential,
            agent_type,
            realised_demand: [demand; SLOTS_PER_DAY],
            excess_generation: [excess; SLOTS_PER_DAY],
            day_ahead_demand: [demand; SLOTS_PER_DAY],
            day_ahead_supply: [excess; SLOTS_PER_DAY],
        }
    }

    #[test]
    fn empty_community_is_quiet() {
        let mut c = Coordinator::new(AgentId(0), true, TimingRule::Positive);
        c.step(&CommunitySnapshot::empty(day()));
        assert_eq!(c.total_energy_import(), 0.0);
        assert_eq!(c.total_energy_export(), 0.0);
        assert!(c.surplus_timing().is_empty());
        assert!(c.deficit_timing().is_empty());
        assert_eq!(c.signal().map(|s| s.target_date), Some(next_day(day())));
    }

    #[test]
    fn aggregates_import_and_export() {
        let mut c = Coordinator::new(AgentId(0), false, TimingRule::Positive);
        let mut snapshot = CommunitySnapshot::empty(day());
        snapshot.members.push(snapshot_member(1, AgentType::Consumer, 0.5, 0.0));
        snapshot.members.push(snapshot_member(2, AgentType::Prosumer, 0.0, 1.0));
        snapshot.community_supply = [0.25; SLOTS_PER_DAY];
        c.step(&snapshot);
        assert!((c.total_energy_import() - 48.0).abs() < 1e-9);
        assert!((c.total_energy_export() - 120.0).abs() < 1e-9);
        assert!(c.signal().is_none());
        assert_eq!(c.date(), Some(day()));
    }

    #[test]
    fn publishes_next_day_windows() {
        let mut c = Coordinator::new(AgentId(0), true, TimingRule::Positive);
        let mut snapshot = CommunitySnapshot::empty(day());
        let mut m = snapshot_member(1, AgentType::Prosumer, 1.0, 0.0);
        // Forecast supply of 2 per slot from 10:00 to 14:00.
        for slot in 40..56 {
            m.day_ahead_supply[slot] = 2.0;
        }
        snapshot.members.push(m);
        c.step(&snapshot);
        let surplus: Vec<usize> = c.surplus_timing().iter().copied().collect();
        assert_eq!(surplus, vec![10, 11, 12, 13]);
        assert_eq!(c.deficit_timing().len(), 20);
        assert!(c.surplus_timing().is_disjoint(c.deficit_timing()));
    }
}
