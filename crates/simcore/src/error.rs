//! Errors reported by engine backends.

use thiserror::Error;

use crate::properties::Property;

/// Failure of a single engine call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The engine declined to start a session.
    #[error("Engine refused to start: {0}")]
    Refused(String),

    /// No running session carries this name.
    #[error("No active session named '{0}'")]
    UnknownSession(String),

    /// A session with this name is already running.
    #[error("Session '{0}' is already running")]
    SessionConflict(String),

    /// The target object does not exist in the session.
    #[error("Object not found: {0}")]
    UnknownObject(String),

    /// The target object has no joint force accumulator.
    #[error("Object '{0}' is not force-actuatable")]
    NotActuatable(String),

    /// The property cannot be used with this call.
    #[error("Unsupported property: {0}")]
    UnsupportedProperty(Property),

    /// A vector call carried the wrong number of values.
    #[error("Expected {expected} values for {property}, got {got}")]
    LengthMismatch {
        /// Property being read or written.
        property: Property,
        /// Number of values the engine needs.
        expected: usize,
        /// Number of values supplied or returned.
        got: usize,
    },

    /// A scalar setting was outside its valid range.
    #[error("Invalid value {value} for {property}")]
    InvalidValue {
        /// Property being written.
        property: Property,
        /// Rejected value.
        value: f64,
    },

    /// Time step duration was negative or not finite.
    #[error("Invalid step duration: {0} s")]
    InvalidDuration(f64),

    /// Integration produced a non-finite state.
    #[error("Integration diverged at t = {time} s")]
    Diverged {
        /// Simulation time at the start of the failed step.
        time: f64,
    },

    /// Error raised inside a foreign engine binding.
    #[error("Engine backend error: {0}")]
    Backend(String),
}
