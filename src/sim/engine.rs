//! Simulation model owning the agent population, clock, and results.

use std::sync::Arc;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use tracing::debug;

use super::clock::SimulationClock;
use super::collector::ResultCollector;
use super::coordinator::Coordinator;
use super::schedule::TimingRule;
use super::scheduler::{ActivationPolicy, Scheduler};
use super::types::{AgentId, Levers, TickRecord, Uncertainties};
use crate::assets::Asset;
use crate::community::{MemberSpec, RosterEntry};
use crate::config::ConfigError;
use crate::error::{Result, SimError};
use crate::members::{AgentType, Member, MemberCategory, TariffTable, TickContext};
use crate::profiles::ProfileSource;

/// Run-level settings of one simulation model.
#[derive(Debug, Clone)]
pub struct ModelSetup {
    /// Date of tick 0.
    pub start_date: NaiveDate,
    pub levers: Levers,
    pub uncertainties: Uncertainties,
    /// Whether the coordinator publishes ToD signals.
    pub demand_response: bool,
    pub timing_rule: TimingRule,
    pub activation: ActivationPolicy,
    pub tariffs: TariffTable,
    /// Replication index recorded on every tick row.
    pub replication: usize,
}

impl ModelSetup {
    /// Demand response on, default levers and uncertainties, uniform default tariff.
    pub fn new(start_date: NaiveDate) -> Self {
        Self {
            start_date,
            levers: Levers::default(),
            uncertainties: Uncertainties::default(),
            demand_response: true,
            timing_rule: TimingRule::default(),
            activation: ActivationPolicy::default(),
            tariffs: TariffTable::uniform(Default::default()),
            replication: 0,
        }
    }

    /// Every lever and uncertainty problem at once.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = self.levers.validate();
        errors.extend(self.uncertainties.validate());
        match self.timing_rule {
            TimingRule::Percentile(q) if !(0.0..=100.0).contains(&q) => {
                errors.push(ConfigError::new(
                    "simulation.timing_percentile",
                    format!("must be in [0, 100], got {q}"),
                ));
            }
            _ => {}
        }
        errors
    }
}

/// An energy community simulated one day per tick.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use chrono::NaiveDate;
/// use rand::{SeedableRng, rngs::StdRng};
/// use ec_sim::community::roster;
/// use ec_sim::profiles::SyntheticProfiles;
/// use ec_sim::sim::engine::{ModelSetup, SimulationModel};
///
/// let start = NaiveDate::from_ymd_opt(2021, 5, 1).unwrap();
/// let end = NaiveDate::from_ymd_opt(2021, 5, 31).unwrap();
/// let profiles = Arc::new(SyntheticProfiles::new(start, end, 1));
/// let mut model = SimulationModel::new(
///     ModelSetup::new(start),
///     &roster("minimal").unwrap(),
///     profiles,
///     StdRng::seed_from_u64(7),
/// )
/// .unwrap();
/// let records = model.run(3).unwrap();
/// assert_eq!(records.len(), 3);
/// assert_eq!(records[2].date, NaiveDate::from_ymd_opt(2021, 5, 3).unwrap());
/// ```
pub struct SimulationModel {
    setup: ModelSetup,
    clock: SimulationClock,
    profiles: Arc<dyn ProfileSource>,
    coordinator: Coordinator,
    members: Vec<Member>,
    community_assets: Vec<Asset>,
    scheduler: Scheduler,
    collector: ResultCollector,
    rng: StdRng,
}

impl SimulationModel {
    /// Validates the setup and instantiates every roster entry.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Configuration`] for invalid levers or
    /// uncertainties and for a malformed roster.
    pub fn new(
        setup: ModelSetup,
        roster: &[RosterEntry],
        profiles: Arc<dyn ProfileSource>,
        mut rng: StdRng,
    ) -> Result<Self> {
        if let Some(first) = setup.validate().into_iter().next() {
            return Err(first.into());
        }
        let (coordinator, members, community_assets) = create_agents(&setup, roster, &mut rng)?;
        debug!(
            members = members.len(),
            community_assets = community_assets.len(),
            start = %setup.start_date,
            "agents created"
        );
        Ok(Self {
            clock: SimulationClock::new(setup.start_date),
            scheduler: Scheduler::new(setup.activation),
            collector: ResultCollector::new(setup.replication),
            setup,
            profiles,
            coordinator,
            members,
            community_assets,
            rng,
        })
    }

    /// Runs one tick: scheduler round, result row, clock advance.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::StepFailed`] when an agent fails; the clock is
    /// not advanced and no row is collected.
    pub fn step(&mut self) -> Result<&TickRecord> {
        let tick = self.clock.tick();
        let date = self.clock.date();
        let signal = self.coordinator.signal().cloned();
        let ctx = TickContext {
            date,
            profiles: self.profiles.as_ref(),
            tariffs: &self.setup.tariffs,
            levers: &self.setup.levers,
            uncertainties: &self.setup.uncertainties,
            signal: signal.as_ref(),
            demand_response: self.setup.demand_response,
        };
        self.scheduler.step(
            tick,
            &ctx,
            &mut self.members,
            &mut self.community_assets,
            &mut self.coordinator,
            &mut self.rng,
        )?;
        self.clock.advance();
        let record = self.collector.collect(
            tick,
            date,
            &self.members,
            &self.community_assets,
            &self.coordinator,
        );
        debug!(%record, "tick complete");
        Ok(record)
    }

    /// Runs `steps` ticks and returns every row collected so far.
    ///
    /// # Errors
    ///
    /// Aborts on the first failing tick.
    pub fn run(&mut self, steps: usize) -> Result<&[TickRecord]> {
        for _ in 0..steps {
            self.step()?;
        }
        Ok(self.collector.records())
    }

    /// Consumes the model and returns its rows.
    pub fn into_records(self) -> Vec<TickRecord> {
        self.collector.into_records()
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn setup(&self) -> &ModelSetup {
        &self.setup
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn community_assets(&self) -> &[Asset] {
        &self.community_assets
    }

    /// Members of one category, in roster order.
    pub fn members_by_category(&self, category: MemberCategory) -> impl Iterator<Item = &Member> {
        self.members.iter().filter(move |m| m.category == category)
    }

    pub fn records(&self) -> &[TickRecord] {
        self.collector.records()
    }
}

/// Instantiates the roster: one coordinator, members with their assets,
/// and ownerless community assets, numbered in roster order.
fn create_agents(
    setup: &ModelSetup,
    roster: &[RosterEntry],
    rng: &mut StdRng,
) -> Result<(Coordinator, Vec<Member>, Vec<Asset>)> {
    let mut next_id = 0usize;
    let mut issue = || {
        let id = AgentId(next_id);
        next_id += 1;
        id
    };

    let mut coordinator = None;
    let mut members = Vec::new();
    let mut community_assets = Vec::new();

    for entry in roster {
        match entry {
            RosterEntry::Coordinator => {
                if coordinator.is_some() {
                    return Err(SimError::config("roster", "more than one coordinator"));
                }
                coordinator = Some(Coordinator::new(
                    issue(),
                    setup.demand_response,
                    setup.timing_rule,
                ));
            }
            RosterEntry::Member(spec) => {
                check_member(spec)?;
                let id = issue();
                let profile = pick_profile(spec, rng)?;
                let assets = spec
                    .assets
                    .iter()
                    .map(|a| a.build(issue(), Some(id)))
                    .collect::<Result<Vec<_>>>()?;
                let flexibility = match spec.category {
                    MemberCategory::Residential => setup.levers.residential_flexibility,
                    MemberCategory::NonResidential | MemberCategory::EvCharging => {
                        setup.levers.non_residential_flexibility
                    }
                };
                members.push(Member::new(
                    id,
                    spec.name.clone(),
                    profile,
                    spec.category,
                    flexibility,
                    assets,
                ));
            }
            RosterEntry::CommunityAsset(spec) => {
                community_assets.push(spec.build(issue(), None)?);
            }
        }
    }

    let coordinator =
        coordinator.ok_or_else(|| SimError::config("roster", "exactly one coordinator is required"))?;
    Ok((coordinator, members, community_assets))
}

fn check_member(spec: &MemberSpec) -> Result<()> {
    let field = format!("roster.{}", spec.name);
    match (spec.agent_type, spec.assets.is_empty()) {
        (AgentType::Prosumer, true) => Err(SimError::config(field, "prosumer without assets")),
        (AgentType::Consumer, false) => Err(SimError::config(field, "consumer with assets")),
        _ => Ok(()),
    }
}

fn pick_profile(spec: &MemberSpec, rng: &mut StdRng) -> Result<String> {
    let chosen = match spec.profiles.as_slice() {
        [only] => Some(only),
        many => many.choose(rng),
    };
    chosen
        .cloned()
        .ok_or_else(|| SimError::config(format!("roster.{}", spec.name), "no profile given"))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::community::{AssetSpec, roster};
    use crate::profiles::ProfileTable;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()
    }

    fn flat_profiles(names: &[&str]) -> Arc<ProfileTable> {
        let mut t = ProfileTable::new();
        let last = NaiveDate::from_ymd_opt(2021, 1, 10).unwrap();
        for name in names {
            t.insert_constant_range(name, day(), last, 0.1);
        }
        Arc::new(t)
    }

    #[test]
    fn ids_are_unique_and_in_roster_order() {
        let entries = roster("gridflex_heeten").unwrap();
        let model = SimulationModel::new(
            ModelSetup::new(day()),
            &entries,
            flat_profiles(&[]),
            StdRng::seed_from_u64(1),
        )
        .unwrap();
        let mut ids: Vec<usize> = model.members().iter().map(|m| m.id.0).collect();
        ids.extend(model.members().iter().flat_map(|m| m.assets.iter().map(|a| a.id.0)));
        ids.push(model.coordinator().id.0);
        let n = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), n);
        assert_eq!(model.coordinator().id, AgentId(0));
        assert_eq!(model.members_by_category(MemberCategory::Residential).count(), 10);
    }

    #[test]
    fn flexibility_follows_category_levers() {
        let mut setup = ModelSetup::new(day());
        setup.levers = Levers {
            participation_rate: 0.5,
            residential_flexibility: 0.1,
            non_residential_flexibility: 0.9,
        };
        let model = SimulationModel::new(
            setup,
            &roster("gridflex_heeten").unwrap(),
            flat_profiles(&[]),
            StdRng::seed_from_u64(1),
        )
        .unwrap();
        for m in model.members() {
            let expected = if m.category == MemberCategory::Residential { 0.1 } else { 0.9 };
            assert_eq!(m.demand_flexibility, expected, "{}", m.name);
        }
    }

    #[test]
    fn roster_without_coordinator_is_rejected() {
        let entries = vec![RosterEntry::Member(MemberSpec::consumer(
            "a",
            MemberCategory::Residential,
        ))];
        let err = SimulationModel::new(
            ModelSetup::new(day()),
            &entries,
            flat_profiles(&["a"]),
            StdRng::seed_from_u64(1),
        )
        .err()
        .unwrap();
        assert!(matches!(err, SimError::Configuration(_)));
    }

    #[test]
    fn inconsistent_member_type_is_rejected() {
        let mut spec = MemberSpec::consumer("a", MemberCategory::Residential);
        spec.assets.push(AssetSpec::solar(5.0, 0.2));
        let entries = vec![RosterEntry::Coordinator, RosterEntry::Member(spec)];
        assert!(SimulationModel::new(
            ModelSetup::new(day()),
            &entries,
            flat_profiles(&["a"]),
            StdRng::seed_from_u64(1),
        )
        .is_err());
    }

    #[test]
    fn invalid_levers_fail_before_any_tick() {
        let mut setup = ModelSetup::new(day());
        setup.levers.participation_rate = 7.5;
        let err = SimulationModel::new(
            setup,
            &[RosterEntry::Coordinator],
            flat_profiles(&[]),
            StdRng::seed_from_u64(1),
        )
        .err()
        .unwrap();
        assert!(matches!(err, SimError::Configuration(_)));
    }

    #[test]
    fn run_past_profile_range_fails_with_location() {
        let entries = vec![
            RosterEntry::Coordinator,
            RosterEntry::Member(MemberSpec::consumer("a", MemberCategory::Residential)),
        ];
        let mut model = SimulationModel::new(
            ModelSetup::new(day()),
            &entries,
            flat_profiles(&["a"]),
            StdRng::seed_from_u64(1),
        )
        .unwrap();
        // Data covers Jan 1..=10; tick 9 needs Jan 11 for its day-ahead forecast.
        let err = model.run(12).unwrap_err();
        match &err {
            SimError::StepFailed { tick, .. } => assert_eq!(*tick, 9),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(err.root_cause(), SimError::DataUnavailable { .. }));
        assert_eq!(model.records().len(), 9);
        assert_eq!(model.clock().tick(), 9);
    }
}
