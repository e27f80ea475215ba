//! End-to-end runs of small and bundled communities.

mod common;

use rand::SeedableRng;
use rand::rngs::StdRng;

use ec_sim::community::RosterEntry;
use ec_sim::error::SimError;
use ec_sim::members::{MemberCategory, MemberStage};
use ec_sim::sim::engine::SimulationModel;
use ec_sim::sim::kpi::RunSummary;
use ec_sim::sim::power_balance::hour_of_slot;
use ec_sim::sim::schedule::TimingRule;
use ec_sim::sim::scheduler::ActivationPolicy;
use ec_sim::sim::types::{Levers, SLOTS_PER_DAY, Uncertainties};

#[test]
fn lone_consumer_without_demand_response_keeps_its_schedule() {
    let mut setup = common::default_setup();
    setup.demand_response = false;
    let mut model = SimulationModel::new(
        setup,
        &common::single_consumer(),
        common::flat_profiles(&["home"], 0.3, 0.0, 0.0, 1),
        StdRng::seed_from_u64(1),
    )
    .unwrap();

    let record = model.step().unwrap().clone();
    let member = &model.members()[0];
    assert_eq!(member.realised_demand, member.scheduled_demand);
    assert_eq!(member.shifted_load, 0.0);
    assert!(member.excess_generation.iter().all(|v| *v == 0.0));
    assert_eq!(member.stage(), MemberStage::CostComputed);
    assert!(model.coordinator().signal().is_none());
    assert_eq!(record.surplus_hours + record.deficit_hours, 0);
    assert!((record.energy_import - 0.3 * SLOTS_PER_DAY as f64).abs() < 1e-9);
}

#[test]
fn solar_prosumer_covers_flat_demand() {
    let mut model = SimulationModel::new(
        common::default_setup(),
        &common::single_solar_prosumer(),
        common::flat_profiles(&["workshop"], 5.0, 500.0, 0.0, 1),
        StdRng::seed_from_u64(2),
    )
    .unwrap();

    let record = model.step().unwrap().clone();
    let member = &model.members()[0];
    assert!(member.generation_schedule.iter().all(|v| (*v - 10.0).abs() < 1e-12));
    assert!(member.realised_demand.iter().all(|v| *v == 0.0));
    assert!(member.excess_generation.iter().all(|v| (*v - 5.0).abs() < 1e-12));

    assert!((record.total_generation - 960.0).abs() < 1e-9);
    assert_eq!(record.energy_import, 0.0);
    assert!((record.energy_export - 480.0).abs() < 1e-9);
    // Tomorrow's forecast surplus is roughly 5 per slot in every hour.
    assert_eq!(record.surplus_hours, 24);
    assert_eq!(record.deficit_hours, 0);
}

#[test]
fn coordinator_alone_aggregates_nothing() {
    let mut model = SimulationModel::new(
        common::default_setup(),
        &[RosterEntry::Coordinator],
        common::flat_profiles(&[], 0.0, 0.0, 0.0, 0),
        StdRng::seed_from_u64(3),
    )
    .unwrap();

    let records = model.run(3).unwrap();
    assert_eq!(records.len(), 3);
    for r in records {
        assert_eq!(r.energy_import, 0.0);
        assert_eq!(r.energy_export, 0.0);
        assert_eq!(r.surplus_hours, 0);
        assert_eq!(r.deficit_hours, 0);
    }
    assert!(model.coordinator().surplus_timing().is_empty());
    assert!(model.coordinator().deficit_timing().is_empty());
}

#[test]
fn consumers_shift_out_of_deficit_hours() {
    let mut setup = common::default_setup();
    setup.levers = Levers {
        participation_rate: 1.0,
        residential_flexibility: 0.5,
        non_residential_flexibility: 0.5,
    };
    setup.uncertainties = Uncertainties {
        min_availability: 0.4,
        max_availability: 0.8,
        forecast_accuracy: 1.0,
    };
    let mut model = SimulationModel::new(
        setup,
        &common::single_consumer(),
        common::flat_profiles(&["home"], 1.0, 0.0, 0.0, 5),
        StdRng::seed_from_u64(4),
    )
    .unwrap();

    // No signal exists on the first tick.
    let first = model.step().unwrap().clone();
    assert_eq!(first.shifted_load, 0.0);
    assert_eq!(first.deficit_hours, 24);

    for _ in 0..4 {
        let record = model.step().unwrap().clone();
        let member = &model.members()[0];
        let original = SLOTS_PER_DAY as f64;
        let realised: f64 = member.realised_demand.iter().sum();
        assert!(member.participated);
        assert!((member.shifted_load - (original - realised)).abs() < 1e-9);
        assert!(member.shifted_load <= 0.5 * 0.8 * original + 1e-9);
        assert!(member.shifted_load >= 0.5 * 0.4 * original - 1e-9);
        assert!(member.realised_demand.iter().all(|v| *v >= 0.0));
        assert!(record.savings > 0.0);
        assert_eq!(record.participants, 1);
    }
}

fn timed_model(rule: TimingRule) -> SimulationModel {
    let mut setup = common::default_setup();
    setup.timing_rule = rule;
    setup.levers.participation_rate = 1.0;
    common::community_model("gridflex_heeten", setup, 13)
}

#[test]
fn percentile_timing_narrows_the_positive_windows() {
    let mut positive = timed_model(TimingRule::Positive);
    let mut top = timed_model(TimingRule::Percentile(70.0));
    positive.step().unwrap();
    top.step().unwrap();

    // Nothing has shifted yet, so both coordinators saw the same forecast.
    let (p, t) = (positive.coordinator(), top.coordinator());
    assert!(t.surplus_timing().is_subset(p.surplus_timing()));
    assert!(t.deficit_timing().is_subset(p.deficit_timing()));
    // At most 7 of 24 hourly values lie strictly above the 70th percentile.
    let kept = t.surplus_timing().len() + t.deficit_timing().len();
    let flagged = p.surplus_timing().len() + p.deficit_timing().len();
    assert!(t.surplus_timing().len() <= 7 && t.deficit_timing().len() <= 7);
    assert!(kept > 0);
    assert!(kept < flagged, "kept {kept} of {flagged}");
}

#[test]
fn members_shift_only_inside_percentile_windows() {
    let mut model = timed_model(TimingRule::Percentile(70.0));
    model.step().unwrap();
    let signal = model.coordinator().signal().unwrap().clone();
    assert!(!signal.is_empty());

    let record = model.step().unwrap().clone();
    assert!(signal.applies_to(record.date));
    assert!(record.shifted_load > 0.0);
    for m in model.members().iter().filter(|m| m.assets.is_empty()) {
        for slot in 0..SLOTS_PER_DAY {
            let hour = hour_of_slot(slot);
            if !signal.surplus_hours.contains(&hour) && !signal.deficit_hours.contains(&hour) {
                assert_eq!(m.realised_demand[slot], m.scheduled_demand[slot], "{}", m.name);
            }
        }
    }
}

#[test]
fn zero_participation_never_shifts() {
    let mut setup = common::default_setup();
    setup.levers.participation_rate = 0.0;
    let mut model = common::community_model("gridflex_heeten", setup, 5);
    let records = model.run(10).unwrap();
    assert!(records.iter().all(|r| r.shifted_load == 0.0 && r.participants == 0));
}

#[test]
fn bundled_communities_keep_series_non_negative() {
    for name in ["gridflex_heeten", "groene_mient", "minimal"] {
        let mut setup = common::default_setup();
        setup.levers.participation_rate = 0.75;
        let mut model = common::community_model(name, setup, 11);
        for _ in 0..20 {
            model.step().unwrap();
            for m in model.members() {
                assert!(m.realised_demand.iter().all(|v| *v >= 0.0), "{name}: {}", m.name);
                assert!(m.excess_generation.iter().all(|v| *v >= 0.0), "{name}: {}", m.name);
                assert!(m.energy_cost.is_finite());
            }
        }
        let summary = RunSummary::from_records(model.records());
        assert_eq!(summary.ticks, 20);
        assert!((0.0..=1.0).contains(&summary.self_consumed_share));
    }
}

#[test]
fn records_cover_every_category_and_asset_kind() {
    let mut model = common::community_model("groene_mient", common::default_setup(), 6);
    let record = model.step().unwrap();
    assert_eq!(record.categories.len(), MemberCategory::ALL.len());
    assert_eq!(record.categories[&MemberCategory::Residential].members, 24);
    assert_eq!(record.categories[&MemberCategory::EvCharging].members, 0);
    assert_eq!(record.supply_by_asset.len(), 3);
    for profile in record.supply_by_asset.values() {
        assert_eq!(profile.len(), SLOTS_PER_DAY);
    }
    assert_eq!(model.community_assets().len(), 3);
}

#[test]
fn same_seed_same_records() {
    for policy in [ActivationPolicy::Sequential, ActivationPolicy::Random] {
        let run = || {
            let mut setup = common::default_setup();
            setup.activation = policy;
            let mut model = common::community_model("gridflex_heeten", setup, 21);
            model.run(15).unwrap().to_vec()
        };
        assert_eq!(run(), run(), "{policy}");
    }
}

#[test]
fn different_seeds_diverge() {
    let mut a = common::community_model("gridflex_heeten", common::default_setup(), 1);
    let mut b = common::community_model("gridflex_heeten", common::default_setup(), 2);
    assert_ne!(a.run(10).unwrap(), b.run(10).unwrap());
}

#[test]
fn missing_profile_data_aborts_with_location() {
    let mut model = SimulationModel::new(
        common::default_setup(),
        &common::single_consumer(),
        common::flat_profiles(&["home"], 1.0, 0.0, 0.0, 3),
        StdRng::seed_from_u64(8),
    )
    .unwrap();

    let err = model.run(10).unwrap_err();
    let SimError::StepFailed { tick, date, agent, .. } = &err else {
        panic!("unexpected error: {err:?}");
    };
    assert_eq!(*tick, 3);
    assert_eq!(*date, common::day(3));
    assert!(agent.contains("home"));
    assert!(matches!(err.root_cause(), SimError::DataUnavailable { .. }));
    assert_eq!(model.records().len(), 3);
}
