//! External joint damping
//!
//! Linear viscous damping computed outside the engine and fed back as a joint
//! force every step: `F = -c * v`.

use serde::{Deserialize, Serialize};
use simcore::{JointForceCommand, JointState};

/// Computes the joint force command for one iteration from the joint state
/// read in that same iteration.
pub trait ForceLaw {
    fn command(&self, state: &JointState) -> JointForceCommand;
}

impl<F> ForceLaw for F
where
    F: Fn(&JointState) -> JointForceCommand,
{
    fn command(&self, state: &JointState) -> JointForceCommand {
        self(state)
    }
}

/// Linear damping model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DampingModel {
    /// Damping coefficient (N·s/m)
    pub coefficient: f64,
}

impl Default for DampingModel {
    fn default() -> Self {
        Self { coefficient: 10000.0 }
    }
}

impl DampingModel {
    pub fn new(coefficient: f64) -> Self {
        Self { coefficient }
    }

    /// Damping force for a joint velocity
    pub fn force(&self, velocity: f64) -> f64 {
        compute_damping_force(self.coefficient, velocity)
    }
}

impl ForceLaw for DampingModel {
    fn command(&self, state: &JointState) -> JointForceCommand {
        JointForceCommand::new(self.force(state.velocity))
    }
}

/// `-coefficient * velocity`
pub fn compute_damping_force(coefficient: f64, velocity: f64) -> f64 {
    -coefficient * velocity
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reference_damping_force() {
        let model = DampingModel::default();
        assert_relative_eq!(model.force(0.5), -5000.0);
    }

    #[test]
    fn test_force_is_odd_and_linear() {
        let model = DampingModel::new(250.0);
        for v in [0.1, 1.0, 3.7, 42.0] {
            assert_relative_eq!(model.force(-v), -model.force(v));
            assert_relative_eq!(model.force(2.0 * v), 2.0 * model.force(v));
        }
        assert_eq!(model.force(0.0), 0.0);
    }

    #[test]
    fn test_command_uses_velocity_only() {
        let model = DampingModel::new(100.0);
        let cmd = model.command(&JointState::new(-0.25, 12.0));
        assert_relative_eq!(cmd.force, 25.0);
        assert_eq!(cmd.force_derivative, 0.0);
    }

    #[test]
    fn test_closure_force_law() {
        let spring = |state: &JointState| JointForceCommand::new(-10.0 * state.position);
        let cmd = spring.command(&JointState::new(0.0, 0.5));
        assert_relative_eq!(cmd.force, -5.0);
    }
}
