//! Error taxonomy shared by every layer of the simulator.

use chrono::NaiveDate;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while setting up or running a simulation.
///
/// Negative demand or supply residuals are not errors: they are clipped to
/// zero where they arise and never reach this type.
#[derive(Debug, Error)]
pub enum SimError {
    /// A profile or tariff lookup fell outside the loaded data.
    #[error("no data for `{series}` on {date}")]
    DataUnavailable { series: String, date: NaiveDate },

    /// Malformed lever, uncertainty, roster, or asset specification.
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// An agent failed during a tick; the run is aborted.
    #[error("tick {tick} ({date}) failed in {agent}: {source}")]
    StepFailed {
        tick: usize,
        date: NaiveDate,
        agent: String,
        #[source]
        source: Box<SimError>,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimError {
    /// Shorthand for a [`SimError::DataUnavailable`] lookup miss.
    pub fn data_unavailable(series: impl Into<String>, date: NaiveDate) -> Self {
        Self::DataUnavailable {
            series: series.into(),
            date,
        }
    }

    /// Shorthand for a single-field configuration error.
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration(ConfigError::new(field, message))
    }

    /// Returns the innermost error, unwrapping any [`SimError::StepFailed`] layers.
    pub fn root_cause(&self) -> &SimError {
        match self {
            Self::StepFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SimError>;
