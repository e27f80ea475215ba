//! Simulation engine, agent scheduling, and per-tick bookkeeping.

/// Simulation clock: tick and calendar day.
pub mod clock;
pub mod collector;
/// Community coordinator and snapshots.
pub mod coordinator;
pub mod engine;
/// Time-of-day demand-response signal.
pub mod event;
pub mod kpi;
pub mod power_balance;
/// Day-ahead surplus/deficit timing.
pub mod schedule;
pub mod scheduler;
pub mod types;
