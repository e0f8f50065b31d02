//! Boundary types for co-simulating against an external rigid-body engine.
//!
//! This crate provides:
//! - The [`Engine`] call contract every engine backend implements
//! - Joint state and force command types exchanged each step
//! - Engine property identifiers ([`Property`])
//! - Single-DOF joint integrators
//! - A recording `mock::MockEngine` for tests (`test-utils` feature)

pub mod error;
pub mod integrators;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod properties;
pub mod traits;

pub use error::EngineError;
pub use properties::Property;
pub use traits::*;
