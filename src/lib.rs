//! Agent-based simulation of local energy communities.

pub mod assets;
pub mod cli;
pub mod community;
pub mod config;
pub mod error;
pub mod experiment;
pub mod forecast;
pub mod io;
pub mod members;
pub mod profiles;
/// Clock, coordinator, scheduling, and result collection.
pub mod sim;
pub mod telemetry;
