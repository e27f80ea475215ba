//! Agent activation within one tick.

use std::fmt;

use chrono::NaiveDate;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::coordinator::{CommunitySnapshot, Coordinator};
use super::power_balance::{ZERO_DAY, add_into};
use crate::assets::Asset;
use crate::error::{Result, SimError};
use crate::forecast::ForecastError;
use crate::members::{Member, TickContext};

/// Order in which members are activated each tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationPolicy {
    /// Roster declaration order.
    #[default]
    Sequential,
    /// A fresh seeded shuffle of the roster every tick.
    Random,
}

impl fmt::Display for ActivationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivationPolicy::Sequential => f.write_str("sequential"),
            ActivationPolicy::Random => f.write_str("random"),
        }
    }
}

/// Runs one round of agent updates.
///
/// Tick order is fixed: every member (in policy order), then the
/// community assets in roster order, then a snapshot, then the
/// coordinator. Members therefore see the signal the coordinator published
/// on the previous tick.
#[derive(Debug, Clone)]
pub struct Scheduler {
    policy: ActivationPolicy,
    order: Vec<usize>,
}

impl Scheduler {
    pub fn new(policy: ActivationPolicy) -> Self {
        Self {
            policy,
            order: Vec::new(),
        }
    }

    pub fn policy(&self) -> ActivationPolicy {
        self.policy
    }

    /// Member indices in the order used by the last round.
    pub fn last_order(&self) -> &[usize] {
        &self.order
    }

    /// Steps every agent exactly once.
    ///
    /// # Errors
    ///
    /// The first agent failure aborts the round and is returned as
    /// [`SimError::StepFailed`] carrying the tick, date, and agent label.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        tick: usize,
        ctx: &TickContext<'_>,
        members: &mut [Member],
        community_assets: &mut [Asset],
        coordinator: &mut Coordinator,
        rng: &mut R,
    ) -> Result<()> {
        let date = ctx.date;
        self.order.clear();
        self.order.extend(0..members.len());
        if self.policy == ActivationPolicy::Random {
            self.order.shuffle(rng);
        }

        for &i in &self.order {
            let member = &mut members[i];
            member
                .step(ctx, rng)
                .map_err(|e| step_failed(tick, date, member.label(), e))?;
        }

        let error = ForecastError::new(ctx.uncertainties.forecast_accuracy);
        let mut supply = ZERO_DAY;
        let mut day_ahead = ZERO_DAY;
        for asset in community_assets.iter_mut() {
            let label = format!("community asset {} ({})", asset.id, asset.kind());
            add_into(
                &mut supply,
                asset
                    .refresh_supply(date, ctx.profiles)
                    .map_err(|e| step_failed(tick, date, label.clone(), e))?,
            );
            let forecast = asset
                .refresh_day_ahead(date, ctx.profiles)
                .map_err(|e| step_failed(tick, date, label, e))?;
            add_into(&mut day_ahead, &error.apply(forecast, rng));
        }

        let snapshot = CommunitySnapshot::capture(date, members, supply, day_ahead);
        coordinator.step(&snapshot);
        Ok(())
    }
}

fn step_failed(tick: usize, date: NaiveDate, agent: String, source: SimError) -> SimError {
    SimError::StepFailed {
        tick,
        date,
        agent,
        source: Box::new(source),
    }
}
