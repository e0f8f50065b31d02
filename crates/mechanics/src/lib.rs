//! Reference engine for prismatic joint bodies in waves.
//!
//! This crate provides:
//! - Prismatic joints with spring, friction and an external force accumulator
//! - Regular and irregular wave excitation
//! - Scene files describing a session's objects
//! - [`PistonEngine`], an in-process implementation of [`simcore::Engine`]

pub mod error;
pub mod joint;
pub mod piston;
pub mod scene;
pub mod waves;

pub use error::SceneError;
pub use joint::{FrictionModel, PrismaticJoint, PrismaticJointConfig};
pub use piston::{ENGINE_VERSION, PistonEngine};
pub use scene::{IntegratorKind, ObjectKind, PistonScene, SceneObject};
pub use waves::{WaveConfig, WaveField, WaveType};
