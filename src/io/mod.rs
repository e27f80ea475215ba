//! File output of simulation results.

pub mod export;
