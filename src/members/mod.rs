//! Community members: demand, captive consumption, demand response, and cost.

/// Time-of-day load shifting.
pub mod demand_response;
pub mod member;
/// Monthly tariff table.
pub mod tariff;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use member::{Member, MemberStage, TickContext};
pub use tariff::{TariffRecord, TariffTable};

/// Reporting category of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberCategory {
    Residential,
    NonResidential,
    EvCharging,
}

impl MemberCategory {
    /// All categories, in reporting order.
    pub const ALL: [MemberCategory; 3] = [
        MemberCategory::Residential,
        MemberCategory::NonResidential,
        MemberCategory::EvCharging,
    ];

    /// Snake-case label used in reports and column names.
    pub fn label(self) -> &'static str {
        match self {
            MemberCategory::Residential => "residential",
            MemberCategory::NonResidential => "non_residential",
            MemberCategory::EvCharging => "ev_charging",
        }
    }
}

impl fmt::Display for MemberCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether a member only consumes or also owns generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    Consumer,
    Prosumer,
}
