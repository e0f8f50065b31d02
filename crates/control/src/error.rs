use std::path::PathBuf;

use simcore::EngineError;
use thiserror::Error;

use crate::driver::DriverState;

/// Failure of a co-simulation run.
///
/// Every variant except `Config` and `Lifecycle` carries the engine error
/// that caused it. The session has already been released when a driver run
/// returns one of these.
#[derive(Error, Debug)]
pub enum CoSimError {
    #[error("Invalid scenario configuration: {0}")]
    Config(#[from] ConfigError),

    /// Session start was refused or failed, or the priming step failed.
    #[error("Failed to initialize session '{session}'")]
    Initialization {
        session: String,
        #[source]
        source: EngineError,
    },

    #[error("Failed to read state of '{target}'")]
    Query {
        target: String,
        #[source]
        source: EngineError,
    },

    #[error("Failed to apply force to '{target}'")]
    Apply {
        target: String,
        #[source]
        source: EngineError,
    },

    #[error("Engine failed to advance session '{session}'")]
    Integration {
        session: String,
        #[source]
        source: EngineError,
    },

    #[error("Failed to close session '{session}'")]
    Close {
        session: String,
        #[source]
        source: EngineError,
    },

    #[error("Cannot {operation} while {state:?}")]
    Lifecycle {
        operation: &'static str,
        state: DriverState,
    },
}

impl CoSimError {
    /// Engine error behind this failure, if any
    pub fn engine_error(&self) -> Option<&EngineError> {
        match self {
            CoSimError::Initialization { source, .. }
            | CoSimError::Query { source, .. }
            | CoSimError::Apply { source, .. }
            | CoSimError::Integration { source, .. }
            | CoSimError::Close { source, .. } => Some(source),
            CoSimError::Config(_) | CoSimError::Lifecycle { .. } => None,
        }
    }
}

/// Errors in scenario settings, found before any engine call.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse scenario: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Step size must be positive and finite, got {0}")]
    InvalidStep(f64),

    #[error("End time {end} must not precede start time {start}")]
    InvalidTimeSpan { start: f64, end: f64 },

    #[error("Damping coefficient must be finite, got {0}")]
    InvalidDamping(f64),

    #[error("'{0}' must not be empty")]
    EmptyField(&'static str),
}
