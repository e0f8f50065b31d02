//! Recording engine double for driver tests.
//!
//! [`MockEngine`] logs every call it receives and models each actuated body
//! as a free point mass, so the effect of an applied force after one step is
//! known in closed form: `v' = v + F / m * dt`, `x' = x + v' * dt`.

use std::collections::BTreeMap;

use crate::error::EngineError;
use crate::properties::Property;
use crate::traits::{Engine, IoConfig, JointState, Scalar, SessionFlags, join_engine_list};

/// One call received by a [`MockEngine`].
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Start { name: String, args: String },
    Step { duration: f64 },
    QueryString { property: Property },
    QueryVector { property: Property, target: String },
    SetScalar { property: Property, target: String, value: Scalar },
    SetVector { property: Property, target: String, values: Vec<f64> },
    End { name: String },
}

#[derive(Debug, Clone)]
struct MockBody {
    state: JointState,
    accumulated_force: f64,
    actuatable: bool,
}

/// Point-mass engine with a call log and failure injection.
///
/// The force accumulator persists across steps until cleared, like a real
/// engine, so a driver that forgets to clear it is caught by the state.
#[derive(Debug, Clone)]
pub struct MockEngine {
    mass: f64,
    bodies: BTreeMap<String, MockBody>,
    session: Option<String>,
    calls: Vec<EngineCall>,
    time: f64,
    reject_start: bool,
    fail_query_vector_at: Option<usize>,
    fail_step_at: Option<usize>,
    fail_end: bool,
    query_vector_count: usize,
    step_count: usize,
}

impl MockEngine {
    /// Engine whose actuated bodies all have mass `mass` (kg).
    pub fn new(mass: f64) -> Self {
        MockEngine {
            mass,
            bodies: BTreeMap::new(),
            session: None,
            calls: Vec::new(),
            time: 0.0,
            reject_start: false,
            fail_query_vector_at: None,
            fail_step_at: None,
            fail_end: false,
            query_vector_count: 0,
            step_count: 0,
        }
    }

    /// Add a force-actuatable joint body with an initial state.
    pub fn with_body(mut self, name: &str, state: JointState) -> Self {
        self.bodies.insert(
            name.to_string(),
            MockBody {
                state,
                accumulated_force: 0.0,
                actuatable: true,
            },
        );
        self
    }

    /// Add a body that can be queried but not actuated.
    pub fn with_fixed_body(mut self, name: &str) -> Self {
        self.bodies.insert(
            name.to_string(),
            MockBody {
                state: JointState::default(),
                accumulated_force: 0.0,
                actuatable: false,
            },
        );
        self
    }

    /// Make `start_session` decline.
    pub fn rejecting_start(mut self) -> Self {
        self.reject_start = true;
        self
    }

    /// Fail the `n`-th `query_vector` call (1-based).
    pub fn failing_query_at(mut self, n: usize) -> Self {
        self.fail_query_vector_at = Some(n);
        self
    }

    /// Fail the `n`-th `step_session` call (1-based, priming included).
    pub fn failing_step_at(mut self, n: usize) -> Self {
        self.fail_step_at = Some(n);
        self
    }

    /// Make `end_session` fail and keep the session running.
    pub fn failing_end(mut self) -> Self {
        self.fail_end = true;
        self
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> &[EngineCall] {
        &self.calls
    }

    /// Number of logged calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&EngineCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    pub fn body_state(&self, name: &str) -> Option<JointState> {
        self.bodies.get(name).map(|body| body.state)
    }

    pub fn accumulated_force(&self, name: &str) -> Option<f64> {
        self.bodies.get(name).map(|body| body.accumulated_force)
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    fn check_session(&self, name: &str) -> Result<(), EngineError> {
        match &self.session {
            Some(active) if active == name => Ok(()),
            _ => Err(EngineError::UnknownSession(name.to_string())),
        }
    }

    fn actuatable_body(&mut self, target: &str) -> Result<&mut MockBody, EngineError> {
        let body = self
            .bodies
            .get_mut(target)
            .ok_or_else(|| EngineError::UnknownObject(target.to_string()))?;
        if !body.actuatable {
            return Err(EngineError::NotActuatable(target.to_string()));
        }
        Ok(body)
    }
}

impl Engine for MockEngine {
    fn start_session(
        &mut self,
        name: &str,
        io: &IoConfig,
        _flags: SessionFlags,
    ) -> Result<bool, EngineError> {
        self.calls.push(EngineCall::Start {
            name: name.to_string(),
            args: io.to_args(),
        });
        if self.reject_start {
            return Ok(false);
        }
        if self.session.is_some() {
            return Err(EngineError::SessionConflict(name.to_string()));
        }
        self.session = Some(name.to_string());
        Ok(true)
    }

    fn step_session(&mut self, name: &str, duration: f64) -> Result<(), EngineError> {
        self.calls.push(EngineCall::Step { duration });
        self.check_session(name)?;
        self.step_count += 1;
        if self.fail_step_at == Some(self.step_count) {
            return Err(EngineError::Diverged { time: self.time });
        }
        if !duration.is_finite() || duration < 0.0 {
            return Err(EngineError::InvalidDuration(duration));
        }

        let mass = self.mass;
        for body in self.bodies.values_mut().filter(|body| body.actuatable) {
            body.state.velocity += body.accumulated_force / mass * duration;
            body.state.position += body.state.velocity * duration;
        }
        self.time += duration;
        Ok(())
    }

    fn query_string(
        &mut self,
        name: &str,
        property: Property,
        _filter: &str,
    ) -> Result<String, EngineError> {
        self.calls.push(EngineCall::QueryString { property });
        self.check_session(name)?;
        match property {
            Property::DObjectNames => Ok(join_engine_list(self.bodies.keys())),
            Property::DObjectTypes => Ok(join_engine_list(
                self.bodies.values().map(|_| "RigidBody"),
            )),
            other => Err(EngineError::UnsupportedProperty(other)),
        }
    }

    fn query_vector(
        &mut self,
        name: &str,
        property: Property,
        target: &str,
        len: usize,
    ) -> Result<Vec<f64>, EngineError> {
        self.calls.push(EngineCall::QueryVector {
            property,
            target: target.to_string(),
        });
        self.check_session(name)?;
        self.query_vector_count += 1;
        if self.fail_query_vector_at == Some(self.query_vector_count) {
            return Err(EngineError::UnknownObject(target.to_string()));
        }

        let values = match property {
            Property::State | Property::RigidBodyState => self
                .bodies
                .get(target)
                .map(|body| body.state.to_array().to_vec())
                .ok_or_else(|| EngineError::UnknownObject(target.to_string()))?,
            Property::Time => vec![self.time],
            other => return Err(EngineError::UnsupportedProperty(other)),
        };

        let mut out = vec![0.0; len];
        for (slot, value) in out.iter_mut().zip(values) {
            *slot = value;
        }
        Ok(out)
    }

    fn set_scalar(
        &mut self,
        name: &str,
        property: Property,
        target: &str,
        value: Scalar,
    ) -> Result<(), EngineError> {
        self.calls.push(EngineCall::SetScalar {
            property,
            target: target.to_string(),
            value,
        });
        self.check_session(name)?;
        match property {
            Property::RigidBodyClearForcesMoments => {
                let body = self.actuatable_body(target)?;
                if value.as_f64() != 0.0 {
                    body.accumulated_force = 0.0;
                }
                Ok(())
            }
            other => Err(EngineError::UnsupportedProperty(other)),
        }
    }

    fn set_vector(
        &mut self,
        name: &str,
        property: Property,
        target: &str,
        values: &[f64],
    ) -> Result<(), EngineError> {
        self.calls.push(EngineCall::SetVector {
            property,
            target: target.to_string(),
            values: values.to_vec(),
        });
        self.check_session(name)?;
        match property {
            Property::RigidBodyJointForceAndDeriv => {
                let force = *values.first().ok_or(EngineError::LengthMismatch {
                    property,
                    expected: 2,
                    got: values.len(),
                })?;
                self.actuatable_body(target)?.accumulated_force += force;
                Ok(())
            }
            other => Err(EngineError::UnsupportedProperty(other)),
        }
    }

    fn end_session(&mut self, name: &str) -> Result<(), EngineError> {
        self.calls.push(EngineCall::End {
            name: name.to_string(),
        });
        self.check_session(name)?;
        if self.fail_end {
            return Err(EngineError::Backend("close failed".to_string()));
        }
        self.session = None;
        Ok(())
    }

    fn error_message(&mut self, _name: &str) -> Option<String> {
        self.reject_start
            .then(|| "license unavailable".to_string())
    }
}
