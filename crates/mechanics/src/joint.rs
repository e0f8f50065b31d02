//! Prismatic Joint - Single-DOF articulated body connection
//!
//! Provides abstractions for:
//! - Internal joint friction (Coulomb, viscous, combined)
//! - Restoring spring about a rest position
//! - An external force accumulator with a per-step force rate
//! - Joint acceleration from applied, spring, friction and wave forces

use serde::{Deserialize, Serialize};
use simcore::JointState;
use simcore::integrators::{Integrator, JointVector};

/// Friction model for the joint's own bearings and seals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FrictionModel {
    /// No friction
    #[default]
    None,
    /// Coulomb (dry) friction of constant magnitude
    Coulomb {
        /// Kinetic friction force (N)
        force: f64,
    },
    /// Viscous friction (proportional to velocity)
    Viscous {
        /// Damping coefficient (N·s/m)
        damping: f64,
    },
    /// Combined Coulomb + viscous friction
    Combined {
        /// Kinetic friction force (N)
        force: f64,
        /// Viscous damping coefficient (N·s/m)
        viscous_damping: f64,
    },
}

impl FrictionModel {
    /// Compute friction force given joint velocity
    ///
    /// For Coulomb friction, uses a small velocity threshold to avoid
    /// discontinuity at zero velocity (stiction zone).
    pub fn compute(&self, velocity: f64) -> f64 {
        const STICTION_THRESHOLD: f64 = 0.001;

        let coulomb = |force: f64| {
            if velocity.abs() < STICTION_THRESHOLD {
                0.0
            } else {
                -force * velocity.signum()
            }
        };

        match self {
            FrictionModel::None => 0.0,
            FrictionModel::Coulomb { force } => coulomb(*force),
            FrictionModel::Viscous { damping } => -damping * velocity,
            FrictionModel::Combined {
                force,
                viscous_damping,
            } => coulomb(*force) - viscous_damping * velocity,
        }
    }
}

/// Configuration for a prismatic joint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrismaticJointConfig {
    /// Moving mass along the joint axis (kg)
    pub mass: f64,

    /// Restoring stiffness (N/m), e.g. hydrostatic stiffness of the float
    #[serde(default)]
    pub stiffness: f64,

    /// Position at which the spring force is zero (m)
    #[serde(default)]
    pub rest_position: f64,

    /// Excitation force per metre of wave elevation (N/m)
    #[serde(default)]
    pub wave_coupling: f64,

    /// Joint friction model
    #[serde(default)]
    pub friction: FrictionModel,

    #[serde(default)]
    pub initial_position: f64,

    #[serde(default)]
    pub initial_velocity: f64,
}

impl Default for PrismaticJointConfig {
    fn default() -> Self {
        PrismaticJointConfig {
            mass: 2000.0,
            stiffness: 30000.0,
            rest_position: 0.0,
            wave_coupling: 50000.0,
            friction: FrictionModel::None,
            initial_position: 0.0,
            initial_velocity: 0.0,
        }
    }
}

impl PrismaticJointConfig {
    /// Create a joint with the given moving mass and no spring or waves
    pub fn free(mass: f64) -> Self {
        PrismaticJointConfig {
            mass,
            stiffness: 0.0,
            wave_coupling: 0.0,
            ..Default::default()
        }
    }

    /// Set stiffness (builder pattern)
    pub fn with_stiffness(mut self, stiffness: f64) -> Self {
        self.stiffness = stiffness;
        self
    }

    /// Set wave coupling
    pub fn with_wave_coupling(mut self, coupling: f64) -> Self {
        self.wave_coupling = coupling;
        self
    }

    /// Set friction model
    pub fn with_friction(mut self, friction: FrictionModel) -> Self {
        self.friction = friction;
        self
    }

    /// Set the initial joint state
    pub fn with_initial_state(mut self, velocity: f64, position: f64) -> Self {
        self.initial_velocity = velocity;
        self.initial_position = position;
        self
    }

    /// Check physical parameters, returning a reason on failure
    pub fn check(&self) -> Result<(), String> {
        if !(self.mass.is_finite() && self.mass > 0.0) {
            return Err(format!("mass must be positive, got {}", self.mass));
        }
        if !(self.stiffness.is_finite() && self.stiffness >= 0.0) {
            return Err(format!("stiffness must be non-negative, got {}", self.stiffness));
        }
        if !self.wave_coupling.is_finite() {
            return Err("wave coupling must be finite".to_string());
        }
        Ok(())
    }
}

/// Prismatic joint with its kinematic state and external force accumulator
#[derive(Debug, Clone)]
pub struct PrismaticJoint {
    pub config: PrismaticJointConfig,
    state: JointVector,
    force: f64,
    force_rate: f64,
}

impl PrismaticJoint {
    pub fn new(config: PrismaticJointConfig) -> Self {
        let state = JointVector::new(config.initial_velocity, config.initial_position);
        Self {
            config,
            state,
            force: 0.0,
            force_rate: 0.0,
        }
    }

    pub fn state(&self) -> JointState {
        JointState::new(self.state[0], self.state[1])
    }

    /// Accumulated external force and its rate
    pub fn accumulated(&self) -> (f64, f64) {
        (self.force, self.force_rate)
    }

    /// Reset the external force accumulator
    pub fn clear_forces(&mut self) {
        self.force = 0.0;
        self.force_rate = 0.0;
    }

    /// Add a force (N) and its time derivative (N/s) to the accumulator
    pub fn add_force(&mut self, force: f64, force_rate: f64) {
        self.force += force;
        self.force_rate += force_rate;
    }

    /// Joint acceleration for a given state
    ///
    /// `elapsed` is the time since the start of the engine step, used to
    /// ramp the applied force by its rate.
    pub fn acceleration(&self, state: &JointVector, excitation: f64, elapsed: f64) -> f64 {
        let applied = self.force + self.force_rate * elapsed;
        let spring = -self.config.stiffness * (state[1] - self.config.rest_position);
        let friction = self.config.friction.compute(state[0]);
        (applied + spring + friction + excitation) / self.config.mass
    }

    /// Integrate one sub-step with the excitation force held constant
    pub fn step(&mut self, integrator: &dyn Integrator, dt: f64, elapsed: f64, excitation: f64) {
        let mut next = self.state;
        integrator.step(dt, &mut next, &|s| self.acceleration(s, excitation, elapsed));
        self.state = next;
    }

    pub fn is_finite(&self) -> bool {
        self.state.iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simcore::integrators::SemiImplicitEuler;

    #[test]
    fn test_viscous_friction_opposes_motion() {
        let friction = FrictionModel::Viscous { damping: 10.0 };
        assert!((friction.compute(2.0) + 20.0).abs() < 1e-9);
        assert!((friction.compute(-2.0) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_coulomb_stiction_zone() {
        let friction = FrictionModel::Coulomb { force: 50.0 };
        assert_eq!(friction.compute(0.0005), 0.0);
        assert!((friction.compute(1.0) + 50.0).abs() < 1e-9);

        let combined = FrictionModel::Combined {
            force: 50.0,
            viscous_damping: 10.0,
        };
        assert!((combined.compute(-1.0) - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_spring_pulls_toward_rest() {
        let joint = PrismaticJoint::new(PrismaticJointConfig::free(2.0).with_stiffness(100.0));
        let a = joint.acceleration(&JointVector::new(0.0, 0.5), 0.0, 0.0);
        assert!((a + 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_accumulator_adds_and_clears() {
        let mut joint = PrismaticJoint::new(PrismaticJointConfig::free(1.0));
        joint.add_force(3.0, 1.0);
        joint.add_force(2.0, 0.5);
        assert_eq!(joint.accumulated(), (5.0, 1.5));

        joint.clear_forces();
        assert_eq!(joint.accumulated(), (0.0, 0.0));
    }

    #[test]
    fn test_step_applies_force() {
        let mut joint = PrismaticJoint::new(PrismaticJointConfig::free(4.0));
        joint.add_force(8.0, 0.0);
        joint.step(&SemiImplicitEuler, 0.5, 0.0, 0.0);

        let state = joint.state();
        assert!((state.velocity - 1.0).abs() < 1e-9);
        assert!((state.position - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_config_check() {
        assert!(PrismaticJointConfig::default().check().is_ok());
        assert!(PrismaticJointConfig::free(0.0).check().is_err());
        assert!(PrismaticJointConfig::free(1.0).with_stiffness(-1.0).check().is_err());
    }
}
