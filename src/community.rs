//! Agent rosters and the bundled community presets.

use crate::assets::{Asset, AssetFinancials, AssetKind, AssetModel, Battery, Solar, Wind};
use crate::error::Result;
use crate::members::{AgentType, MemberCategory};
use crate::sim::types::AgentId;

/// Names accepted by [`roster`].
pub const COMMUNITIES: &[&str] = &["gridflex_heeten", "groene_mient", "minimal"];

/// Household profiles a residential member is drawn from.
pub const HOUSEHOLD_PROFILES: &[&str] = &["hh1_consumption", "hh2_consumption", "hh3_consumption"];

/// Specification of one asset in a roster.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetSpec {
    pub kind: AssetKind,
    /// kW for generators, kWh for storage.
    pub capacity: f64,
    pub efficiency: f64,
    /// Wind only.
    pub rotor_diameter_m: f64,
    /// Wind only.
    pub turbine_count: u32,
    pub age_years: f64,
    pub estimated_lifetime_generation: Option<f64>,
}

impl AssetSpec {
    pub fn solar(capacity_kw: f64, efficiency: f64) -> Self {
        Self {
            kind: AssetKind::Solar,
            capacity: capacity_kw,
            efficiency,
            rotor_diameter_m: 0.0,
            turbine_count: 0,
            age_years: 0.0,
            estimated_lifetime_generation: None,
        }
    }

    pub fn wind(capacity_kw: f64, efficiency: f64, rotor_diameter_m: f64, turbine_count: u32) -> Self {
        Self {
            kind: AssetKind::Wind,
            rotor_diameter_m,
            turbine_count,
            ..Self::solar(capacity_kw, efficiency)
        }
    }

    pub fn battery(capacity_kwh: f64, efficiency: f64) -> Self {
        Self {
            kind: AssetKind::Battery,
            ..Self::solar(capacity_kwh, efficiency)
        }
    }

    /// Sets the age at simulation start.
    pub fn aged(mut self, years: f64) -> Self {
        self.age_years = years;
        self
    }

    /// Instantiates the asset with default financials for its kind.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid parameters.
    pub fn build(&self, id: AgentId, owner: Option<AgentId>) -> Result<Asset> {
        let model = match self.kind {
            AssetKind::Solar => AssetModel::Solar(Solar::new(self.capacity, self.efficiency)),
            AssetKind::Wind => AssetModel::Wind(Wind::new(
                self.capacity,
                self.efficiency,
                self.rotor_diameter_m,
                self.turbine_count,
            )),
            AssetKind::Battery => AssetModel::Battery(Battery::new(self.capacity, self.efficiency)),
        };
        let financials = AssetFinancials {
            age_years: self.age_years,
            estimated_lifetime_generation: self.estimated_lifetime_generation,
            ..AssetFinancials::default_for(self.kind, self.capacity)
        };
        Asset::new(id, owner, model, financials)
    }
}

/// Specification of one member in a roster.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberSpec {
    pub name: String,
    /// Candidate profile keys; one is drawn with the model RNG when there
    /// is more than one.
    pub profiles: Vec<String>,
    pub category: MemberCategory,
    pub agent_type: AgentType,
    pub assets: Vec<AssetSpec>,
}

impl MemberSpec {
    /// A consumer using a single fixed profile.
    pub fn consumer(name: &str, category: MemberCategory) -> Self {
        Self {
            name: name.to_string(),
            profiles: vec![name.to_string()],
            category,
            agent_type: AgentType::Consumer,
            assets: Vec::new(),
        }
    }

    /// A prosumer using a single fixed profile.
    pub fn prosumer(name: &str, category: MemberCategory, assets: Vec<AssetSpec>) -> Self {
        Self {
            agent_type: AgentType::Prosumer,
            assets,
            ..Self::consumer(name, category)
        }
    }

    /// A residential consumer whose household profile is drawn at model construction.
    pub fn household(index: usize) -> Self {
        Self {
            name: format!("household_{index}"),
            profiles: HOUSEHOLD_PROFILES.iter().map(|p| p.to_string()).collect(),
            category: MemberCategory::Residential,
            agent_type: AgentType::Consumer,
            assets: Vec::new(),
        }
    }
}

/// One row of an agent roster.
#[derive(Debug, Clone, PartialEq)]
pub enum RosterEntry {
    Coordinator,
    Member(MemberSpec),
    /// An asset with no owning member.
    CommunityAsset(AssetSpec),
}

/// Roster of a bundled community.
///
/// Returns `None` for an unknown name.
pub fn roster(name: &str) -> Option<Vec<RosterEntry>> {
    match name {
        "gridflex_heeten" => Some(gridflex_heeten()),
        "groene_mient" => Some(groene_mient()),
        "minimal" => Some(minimal()),
        _ => None,
    }
}

/// Ten households, two solar SMEs, a school, and an EV bus charging station.
fn gridflex_heeten() -> Vec<RosterEntry> {
    let mut entries = vec![RosterEntry::Coordinator];
    entries.extend((0..10).map(|i| RosterEntry::Member(MemberSpec::household(i))));
    entries.extend([
        RosterEntry::Member(MemberSpec::prosumer(
            "drink_packaging_sme",
            MemberCategory::NonResidential,
            vec![AssetSpec::solar(1285.0, 0.20)],
        )),
        RosterEntry::Member(MemberSpec::prosumer(
            "food_packaging_sme",
            MemberCategory::NonResidential,
            vec![AssetSpec::solar(2000.0, 0.20)],
        )),
        RosterEntry::Member(MemberSpec::consumer(
            "school_mbo",
            MemberCategory::NonResidential,
        )),
        RosterEntry::Member(MemberSpec::consumer(
            "EV_bus_charging_station",
            MemberCategory::EvCharging,
        )),
    ]);
    entries
}

/// Twenty-four households around a community centre with shared wind,
/// rooftop solar, and a battery.
fn groene_mient() -> Vec<RosterEntry> {
    let mut entries = vec![RosterEntry::Coordinator];
    entries.extend((0..24).map(|i| RosterEntry::Member(MemberSpec::household(i))));
    entries.extend([
        RosterEntry::Member(MemberSpec::prosumer(
            "community_centre",
            MemberCategory::NonResidential,
            vec![AssetSpec::solar(30.0, 0.19).aged(4.0)],
        )),
        RosterEntry::CommunityAsset(AssetSpec::wind(250.0, 0.35, 30.0, 1).aged(6.0)),
        RosterEntry::CommunityAsset(AssetSpec::solar(120.0, 0.20)),
        RosterEntry::CommunityAsset(AssetSpec::battery(200.0, 0.9)),
    ]);
    entries
}

/// A coordinator, two households, and one solar prosumer.
fn minimal() -> Vec<RosterEntry> {
    vec![
        RosterEntry::Coordinator,
        RosterEntry::Member(MemberSpec::consumer("hh1_consumption", MemberCategory::Residential)),
        RosterEntry::Member(MemberSpec::consumer("hh2_consumption", MemberCategory::Residential)),
        RosterEntry::Member(MemberSpec::prosumer(
            "school_mbo",
            MemberCategory::NonResidential,
            vec![AssetSpec::solar(50.0, 0.20)],
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_community_has_a_roster() {
        for name in COMMUNITIES {
            let entries = roster(name).unwrap();
            let coordinators = entries
                .iter()
                .filter(|e| matches!(e, RosterEntry::Coordinator))
                .count();
            assert_eq!(coordinators, 1, "{name}");
        }
        assert!(roster("atlantis").is_none());
    }

    #[test]
    fn gridflex_heeten_matches_description() {
        let entries = roster("gridflex_heeten").unwrap();
        let members: Vec<&MemberSpec> = entries
            .iter()
            .filter_map(|e| match e {
                RosterEntry::Member(m) => Some(m),
                _ => None,
            })
            .collect();
        assert_eq!(members.len(), 14);
        let households = members
            .iter()
            .filter(|m| m.category == MemberCategory::Residential)
            .count();
        assert_eq!(households, 10);
        let prosumers: Vec<f64> = members
            .iter()
            .filter(|m| m.agent_type == AgentType::Prosumer)
            .flat_map(|m| m.assets.iter().map(|a| a.capacity))
            .collect();
        assert_eq!(prosumers, vec![1285.0, 2000.0]);
    }

    #[test]
    fn asset_specs_build() {
        let owner = Some(AgentId(1));
        for spec in [
            AssetSpec::solar(10.0, 0.2),
            AssetSpec::wind(250.0, 0.35, 30.0, 2).aged(3.0),
            AssetSpec::battery(20.0, 0.9),
        ] {
            let asset = spec.build(AgentId(7), owner).unwrap();
            assert_eq!(asset.kind(), spec.kind);
            assert_eq!(asset.owner, owner);
            assert!(asset.lcoe().is_finite());
        }
        assert!(AssetSpec::solar(0.0, 0.2).build(AgentId(7), None).is_err());
    }
}
