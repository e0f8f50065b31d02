use nalgebra::Vector2;

/// Single-DOF joint state in engine order: `[velocity, position]`.
pub type JointVector = Vector2<f64>;

/// A generic integration strategy for one joint degree of freedom.
pub trait Integrator {
    /// Advances `state` by `dt`, with `acceleration` evaluated on the
    /// (possibly intermediate) state.
    fn step(&self, dt: f64, state: &mut JointVector, acceleration: &dyn Fn(&JointVector) -> f64);
}

/// Semi-implicit Euler integrator (Symplectic Euler).
/// This is first-order accurate but conserves energy better than explicit Euler.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemiImplicitEuler;

impl Integrator for SemiImplicitEuler {
    fn step(&self, dt: f64, state: &mut JointVector, acceleration: &dyn Fn(&JointVector) -> f64) {
        // Semi-implicit: use the NEW velocity to update position.
        let a = acceleration(&*state);
        state[0] += a * dt;
        let v = state[0];
        state[1] += v * dt;
    }
}

/// Fourth-order Runge-Kutta integrator.
/// More accurate than Euler methods but evaluates the acceleration four times per step.
#[derive(Debug, Clone, Copy, Default)]
pub struct RungeKutta4;

impl Integrator for RungeKutta4 {
    fn step(&self, dt: f64, state: &mut JointVector, acceleration: &dyn Fn(&JointVector) -> f64) {
        let derivative = |s: &JointVector| JointVector::new(acceleration(s), s[0]);

        let k1 = derivative(&*state);
        let k2 = derivative(&(*state + k1 * (dt / 2.0)));
        let k3 = derivative(&(*state + k2 * (dt / 2.0)));
        let k4 = derivative(&(*state + k3 * dt));

        *state += (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0);
    }
}
