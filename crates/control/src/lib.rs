//! Co-simulation step driver for externally damped joints.
//!
//! The driver owns the time-stepping loop and talks to an engine only through
//! [`simcore::Engine`]:
//! - [`Session`] wraps one running engine session and releases it on every exit path
//! - [`DampingModel`] computes the joint force, `F = -c * v`
//! - [`SimulationClock`] counts fixed steps up to the end time
//! - [`CoSimDriver`] runs a [`ScenarioConfig`] and reports a [`RunSummary`]

pub mod clock;
pub mod config;
pub mod damping;
pub mod driver;
pub mod error;
pub mod session;

pub use clock::{ClockConfig, SimulationClock};
pub use config::ScenarioConfig;
pub use damping::{DampingModel, ForceLaw, compute_damping_force};
pub use driver::{CoSimDriver, DriverState, IterationRecord, RunOutcome, RunSummary};
pub use error::{CoSimError, ConfigError};
pub use session::{ForceAccumulator, Session};
