//! Community member and its per-tick lifecycle.

use chrono::NaiveDate;
use rand::Rng;
use tracing::trace;

use super::demand_response::{apply_tod_shift, draw_shift_factor};
use super::tariff::TariffTable;
use super::{AgentType, MemberCategory};
use crate::assets::Asset;
use crate::error::Result;
use crate::forecast::ForecastError;
use crate::profiles::ProfileSource;
use crate::sim::clock::next_day;
use crate::sim::event::TodSignal;
use crate::sim::power_balance::{ZERO_DAY, add_into, net_captive, total};
use crate::sim::types::{AgentId, DaySeries, Levers, Uncertainties};

/// Stage reached by a member within the current tick.
///
/// Stages advance strictly in declaration order. A failing stage leaves
/// the member at the last stage that completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MemberStage {
    Idle,
    DemandScheduled,
    GenerationScheduled,
    ForecastComputed,
    Netted,
    ResponseAdjusted,
    CostComputed,
}

/// Read-only inputs a member needs for one tick.
#[derive(Clone, Copy)]
pub struct TickContext<'a> {
    /// Calendar day being simulated.
    pub date: NaiveDate,
    pub profiles: &'a dyn ProfileSource,
    pub tariffs: &'a TariffTable,
    pub levers: &'a Levers,
    pub uncertainties: &'a Uncertainties,
    /// Signal published by the coordinator on the previous tick, if any.
    pub signal: Option<&'a TodSignal>,
    /// Whether demand response is enabled for the run.
    pub demand_response: bool,
}

/// A household, business, or charging site in the community.
#[derive(Debug, Clone)]
pub struct Member {
    pub id: AgentId,
    pub name: String,
    /// Key of the demand series in the profile source.
    pub profile: String,
    pub category: MemberCategory,
    pub agent_type: AgentType,
    /// Shiftable share of demand in `[0, 1]`.
    pub demand_flexibility: f64,
    /// Owned assets; empty for consumers.
    pub assets: Vec<Asset>,
    stage: MemberStage,

    pub scheduled_demand: DaySeries,
    pub generation_schedule: DaySeries,
    pub day_ahead_demand: DaySeries,
    pub day_ahead_supply: DaySeries,
    pub realised_demand: DaySeries,
    pub excess_generation: DaySeries,
    pub shifted_load: f64,
    pub energy_cost: f64,
    pub savings: f64,
    /// Whether the member shifted load this tick.
    pub participated: bool,
}

impl Member {
    /// Creates a member with zeroed per-tick state.
    pub fn new(
        id: AgentId,
        name: impl Into<String>,
        profile: impl Into<String>,
        category: MemberCategory,
        demand_flexibility: f64,
        assets: Vec<Asset>,
    ) -> Self {
        let agent_type = if assets.is_empty() {
            AgentType::Consumer
        } else {
            AgentType::Prosumer
        };
        Self {
            id,
            name: name.into(),
            profile: profile.into(),
            category,
            agent_type,
            demand_flexibility,
            assets,
            stage: MemberStage::Idle,
            scheduled_demand: ZERO_DAY,
            generation_schedule: ZERO_DAY,
            day_ahead_demand: ZERO_DAY,
            day_ahead_supply: ZERO_DAY,
            realised_demand: ZERO_DAY,
            excess_generation: ZERO_DAY,
            shifted_load: 0.0,
            energy_cost: 0.0,
            savings: 0.0,
            participated: false,
        }
    }

    pub fn stage(&self) -> MemberStage {
        self.stage
    }

    /// Label used in logs and error reports.
    pub fn label(&self) -> String {
        format!("member {} ({})", self.id, self.name)
    }

    /// Runs one tick of the member lifecycle.
    ///
    /// 1. scheduled demand from the profile source
    /// 2. generation from owned assets
    /// 3. day-ahead demand and supply, netted and floored at zero
    /// 4. captive consumption netting
    /// 5. time-of-day demand response
    /// 6. energy cost and savings
    ///
    /// # Errors
    ///
    /// Propagates [`crate::error::SimError::DataUnavailable`] from profile
    /// or tariff lookups. Fields of stages that did not complete keep their
    /// values from the previous tick.
    pub fn step<R: Rng + ?Sized>(&mut self, ctx: &TickContext<'_>, rng: &mut R) -> Result<()> {
        self.stage = MemberStage::Idle;

        self.scheduled_demand = ctx.profiles.series(ctx.date, &self.profile)?;
        self.stage = MemberStage::DemandScheduled;

        self.generation_schedule = self.refresh_generation(ctx)?;
        self.stage = MemberStage::GenerationScheduled;

        let (demand_ahead, supply_ahead) = self.forecast_day_ahead(ctx, rng)?;
        self.day_ahead_demand = demand_ahead;
        self.day_ahead_supply = supply_ahead;
        self.stage = MemberStage::ForecastComputed;

        let (realised, excess) = net_captive(&self.scheduled_demand, &self.generation_schedule);
        self.realised_demand = realised;
        self.excess_generation = excess;
        self.stage = MemberStage::Netted;

        self.respond_to_signal(ctx, rng);
        self.stage = MemberStage::ResponseAdjusted;

        let cost = ctx.tariffs.daily_cost(ctx.date, &self.realised_demand)?;
        let savings = ctx.tariffs.savings(ctx.date, self.shifted_load)?;
        self.savings = savings;
        self.energy_cost = cost - savings;
        self.stage = MemberStage::CostComputed;

        trace!(
            member = %self.id,
            realised = total(&self.realised_demand),
            shifted = self.shifted_load,
            "member stepped"
        );
        Ok(())
    }

    fn refresh_generation(&mut self, ctx: &TickContext<'_>) -> Result<DaySeries> {
        let mut generation = ZERO_DAY;
        for asset in &mut self.assets {
            add_into(&mut generation, asset.refresh_supply(ctx.date, ctx.profiles)?);
        }
        Ok(generation)
    }

    fn forecast_day_ahead<R: Rng + ?Sized>(
        &mut self,
        ctx: &TickContext<'_>,
        rng: &mut R,
    ) -> Result<(DaySeries, DaySeries)> {
        let demand = ctx.profiles.series(next_day(ctx.date), &self.profile)?;
        let error = ForecastError::new(ctx.uncertainties.forecast_accuracy);
        let mut supply = ZERO_DAY;
        for asset in &mut self.assets {
            let forecast = asset.refresh_day_ahead(ctx.date, ctx.profiles)?;
            add_into(&mut supply, &error.apply(forecast, rng));
        }
        Ok(net_captive(&demand, &supply))
    }

    fn respond_to_signal<R: Rng + ?Sized>(&mut self, ctx: &TickContext<'_>, rng: &mut R) {
        self.shifted_load = 0.0;
        self.participated = false;
        if !ctx.demand_response {
            return;
        }
        let p = ctx.levers.participation_rate.clamp(0.0, 1.0);
        if !rng.random_bool(p) {
            return;
        }
        let Some(signal) = ctx.signal.filter(|s| s.applies_to(ctx.date) && !s.is_empty()) else {
            return;
        };
        let factor = draw_shift_factor(self.demand_flexibility, ctx.uncertainties, rng);
        let outcome = apply_tod_shift(&self.realised_demand, signal, factor);
        self.realised_demand = outcome.adjusted;
        self.shifted_load = outcome.shifted_load;
        self.participated = true;
    }

    /// Today's supply of each owned asset.
    pub fn asset_supply(&self) -> impl Iterator<Item = (&Asset, &DaySeries)> {
        self.assets.iter().map(|a| (a, a.supply_schedule()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::assets::{AssetFinancials, AssetKind, AssetModel, Solar};
    use crate::error::SimError;
    use crate::members::TariffRecord;
    use crate::profiles::{IRRADIANCE, ProfileTable};
    use crate::sim::types::SLOTS_PER_DAY;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 6, 1).unwrap()
    }

    fn table(demand: f64, irradiance: f64) -> ProfileTable {
        let mut t = ProfileTable::new();
        for d in [day(), next_day(day())] {
            t.insert_constant("home", d, demand);
            t.insert_constant(IRRADIANCE, d, irradiance);
        }
        t
    }

    fn solar(cap: f64) -> Asset {
        Asset::new(
            AgentId(2),
            Some(AgentId(1)),
            AssetModel::Solar(Solar::new(cap, 0.20)),
            AssetFinancials::default_for(AssetKind::Solar, cap),
        )
        .unwrap()
    }

    struct Inputs {
        profiles: ProfileTable,
        tariffs: TariffTable,
        levers: Levers,
        uncertainties: Uncertainties,
    }

    impl Inputs {
        fn new(profiles: ProfileTable) -> Self {
            Self {
                profiles,
                tariffs: TariffTable::uniform(TariffRecord::default()),
                levers: Levers::default(),
                uncertainties: Uncertainties {
                    forecast_accuracy: 1.0,
                    ..Uncertainties::default()
                },
            }
        }

        fn ctx<'a>(&'a self, signal: Option<&'a TodSignal>, dr: bool) -> TickContext<'a> {
            TickContext {
                date: day(),
                profiles: &self.profiles,
                tariffs: &self.tariffs,
                levers: &self.levers,
                uncertainties: &self.uncertainties,
                signal,
                demand_response: dr,
            }
        }
    }

    #[test]
    fn consumer_without_response_keeps_schedule() {
        let inputs = Inputs::new(table(0.25, 0.0));
        let mut m = Member::new(AgentId(1), "h", "home", MemberCategory::Residential, 0.5, vec![]);
        let mut rng = StdRng::seed_from_u64(1);
        m.step(&inputs.ctx(None, false), &mut rng).unwrap();
        assert_eq!(m.agent_type, AgentType::Consumer);
        assert_eq!(m.realised_demand, m.scheduled_demand);
        assert_eq!(m.excess_generation, ZERO_DAY);
        assert_eq!(m.shifted_load, 0.0);
        assert_eq!(m.stage(), MemberStage::CostComputed);
        // 24 kWh * 0.19 + 0.75
        assert!((m.energy_cost - (24.0 * 0.19 + 0.75)).abs() < 1e-9);
    }

    #[test]
    fn prosumer_nets_solar_against_demand() {
        let inputs = Inputs::new(table(5.0, 500.0));
        let mut m = Member::new(
            AgentId(1),
            "sme",
            "home",
            MemberCategory::NonResidential,
            0.45,
            vec![solar(100.0)],
        );
        let mut rng = StdRng::seed_from_u64(1);
        m.step(&inputs.ctx(None, false), &mut rng).unwrap();
        assert_eq!(m.agent_type, AgentType::Prosumer);
        assert!(m.generation_schedule.iter().all(|v| (*v - 10.0).abs() < 1e-12));
        assert!(m.realised_demand.iter().all(|v| *v == 0.0));
        assert!(m.excess_generation.iter().all(|v| (*v - 5.0).abs() < 1e-12));
        assert!(m.day_ahead_demand.iter().all(|v| *v == 0.0));
        assert!(m.day_ahead_supply.iter().all(|v| (*v - 5.0).abs() < 1e-12));
    }

    #[test]
    fn missing_signal_means_no_shift() {
        let mut inputs = Inputs::new(table(1.0, 0.0));
        inputs.levers.participation_rate = 1.0;
        let mut m = Member::new(AgentId(1), "h", "home", MemberCategory::Residential, 1.0, vec![]);
        let mut rng = StdRng::seed_from_u64(9);
        m.step(&inputs.ctx(None, true), &mut rng).unwrap();
        assert_eq!(m.shifted_load, 0.0);
        assert!(!m.participated);

        // A stale signal for another day is ignored as well.
        let stale = TodSignal::new(
            next_day(day()),
            BTreeSet::from([12]),
            BTreeSet::from([18]),
        )
        .unwrap();
        m.step(&inputs.ctx(Some(&stale), true), &mut rng).unwrap();
        assert_eq!(m.shifted_load, 0.0);
    }

    #[test]
    fn participation_shifts_into_surplus_hours() {
        let mut inputs = Inputs::new(table(1.0, 0.0));
        inputs.levers.participation_rate = 1.0;
        inputs.uncertainties.min_availability = 0.5;
        inputs.uncertainties.max_availability = 0.5;
        let signal = TodSignal::new(day(), BTreeSet::from([12]), BTreeSet::new()).unwrap();
        let mut m = Member::new(AgentId(1), "h", "home", MemberCategory::Residential, 0.8, vec![]);
        let mut rng = StdRng::seed_from_u64(9);
        m.step(&inputs.ctx(Some(&signal), true), &mut rng).unwrap();
        assert!(m.participated);
        // 4 slots * 1.0 * 0.8 * 0.5
        assert!((m.shifted_load - 1.6).abs() < 1e-12);
        assert!((m.realised_demand[48] - 1.4).abs() < 1e-12);
        assert!((m.savings - 1.6 * 0.19).abs() < 1e-12);
        let gross = 0.75 + total(&m.realised_demand) * 0.19;
        assert!((m.energy_cost - (gross - m.savings)).abs() < 1e-9);
    }

    #[test]
    fn zero_participation_never_shifts() {
        let mut inputs = Inputs::new(table(1.0, 0.0));
        inputs.levers.participation_rate = 0.0;
        let signal = TodSignal::new(day(), BTreeSet::from([12]), BTreeSet::from([1])).unwrap();
        let mut m = Member::new(AgentId(1), "h", "home", MemberCategory::Residential, 1.0, vec![]);
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..20 {
            m.step(&inputs.ctx(Some(&signal), true), &mut rng).unwrap();
            assert_eq!(m.shifted_load, 0.0);
        }
    }

    #[test]
    fn failure_leaves_last_completed_stage() {
        let mut profiles = ProfileTable::new();
        profiles.insert_constant("home", day(), 1.0);
        // No irradiance: the asset refresh fails in stage 2.
        let inputs = Inputs::new(profiles);
        let mut m = Member::new(
            AgentId(1),
            "sme",
            "home",
            MemberCategory::NonResidential,
            0.45,
            vec![solar(10.0)],
        );
        let mut rng = StdRng::seed_from_u64(1);
        let err = m.step(&inputs.ctx(None, false), &mut rng).unwrap_err();
        assert!(matches!(err, SimError::DataUnavailable { .. }));
        assert_eq!(m.stage(), MemberStage::DemandScheduled);
        assert_eq!(m.scheduled_demand, [1.0; SLOTS_PER_DAY]);
        assert_eq!(m.realised_demand, ZERO_DAY);
    }

    #[test]
    fn missing_next_day_fails_in_forecast_stage() {
        let mut profiles = ProfileTable::new();
        profiles.insert_constant("home", day(), 1.0);
        let inputs = Inputs::new(profiles);
        let mut m = Member::new(AgentId(1), "h", "home", MemberCategory::Residential, 0.5, vec![]);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(m.step(&inputs.ctx(None, false), &mut rng).is_err());
        assert_eq!(m.stage(), MemberStage::GenerationScheduled);
    }
}
