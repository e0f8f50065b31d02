//! Exclusive handle over one running engine session.
//!
//! [`Session`] borrows the engine mutably for its whole lifetime and ends the
//! engine session when closed or dropped, so every exit path releases it.
//! Force writes go through [`ForceAccumulator`], which can only be obtained by
//! clearing the body's accumulator first.

use simcore::{
    Engine, EngineError, IoConfig, JointForceCommand, JointState, ObjectInfo, Property, Scalar,
    SessionFlags, split_engine_list,
};

use crate::error::CoSimError;

pub struct Session<'e, E: Engine + ?Sized> {
    engine: &'e mut E,
    name: String,
    open: bool,
}

impl<'e, E: Engine + ?Sized> Session<'e, E> {
    /// Start a named engine session.
    ///
    /// A refusal is reported with the engine's own error message when it
    /// provides one.
    pub fn initialize(
        engine: &'e mut E,
        name: &str,
        io: &IoConfig,
        flags: SessionFlags,
    ) -> Result<Self, CoSimError> {
        log::info!("Initializing session '{}' ({})", name, io.to_args());
        let initialization = |source| CoSimError::Initialization {
            session: name.to_string(),
            source,
        };

        match engine.start_session(name, io, flags) {
            Ok(true) => Ok(Session {
                engine,
                name: name.to_string(),
                open: true,
            }),
            Ok(false) => {
                let reason = engine
                    .error_message(name)
                    .unwrap_or_else(|| "no reason given".to_string());
                log::error!("Engine refused session '{}': {}", name, reason);
                Err(initialization(EngineError::Refused(reason)))
            }
            Err(source) => {
                log::error!("Failed to start session '{}': {}", name, source);
                Err(initialization(source))
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Zero-duration step that brings the engine to a consistent initial
    /// state. Part of bring-up, so failures are initialization errors.
    pub fn prime(&mut self) -> Result<(), CoSimError> {
        self.engine
            .step_session(&self.name, 0.0)
            .map_err(|source| CoSimError::Initialization {
                session: self.name.clone(),
                source,
            })
    }

    pub fn read_joint_state(&mut self, body: &str) -> Result<JointState, CoSimError> {
        let query = |source| CoSimError::Query {
            target: body.to_string(),
            source,
        };
        let values = self
            .engine
            .query_vector(&self.name, Property::State, body, JointState::LEN)
            .map_err(query)?;
        JointState::from_slice(&values).ok_or_else(|| {
            query(EngineError::LengthMismatch {
                property: Property::State,
                expected: JointState::LEN,
                got: values.len(),
            })
        })
    }

    /// Clear the body's external force accumulator.
    ///
    /// The returned guard is the only way to apply a force, so each apply is
    /// preceded by exactly one clear.
    pub fn clear_force_accumulator<'s>(
        &'s mut self,
        body: &'s str,
    ) -> Result<ForceAccumulator<'s, 'e, E>, CoSimError> {
        self.engine
            .set_scalar(
                &self.name,
                Property::RigidBodyClearForcesMoments,
                body,
                Scalar::Int(1),
            )
            .map_err(|source| CoSimError::Apply {
                target: body.to_string(),
                source,
            })?;
        Ok(ForceAccumulator {
            session: self,
            body,
        })
    }

    pub fn advance_time(&mut self, step: f64) -> Result<(), CoSimError> {
        self.engine
            .step_session(&self.name, step)
            .map_err(|source| CoSimError::Integration {
                session: self.name.clone(),
                source,
            })
    }

    /// Names and types of every object in the session.
    pub fn list_objects(&mut self) -> Result<Vec<ObjectInfo>, CoSimError> {
        let query = |source| CoSimError::Query {
            target: self.name.clone(),
            source,
        };
        let names = self
            .engine
            .query_string(&self.name, Property::DObjectNames, "")
            .map_err(query)?;
        let kinds = self
            .engine
            .query_string(&self.name, Property::DObjectTypes, "")
            .map_err(query)?;

        let kinds = split_engine_list(&kinds);
        Ok(split_engine_list(&names)
            .into_iter()
            .enumerate()
            .map(|(i, name)| ObjectInfo {
                name,
                kind: kinds.get(i).cloned().unwrap_or_default(),
            })
            .collect())
    }

    /// End the session, reporting any engine failure.
    pub fn close(mut self) -> Result<(), CoSimError> {
        self.open = false;
        log::info!("Closing session '{}'", self.name);
        self.engine
            .end_session(&self.name)
            .map_err(|source| CoSimError::Close {
                session: self.name.clone(),
                source,
            })
    }
}

impl<'e, E: Engine + ?Sized> Drop for Session<'e, E> {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        log::warn!("Session '{}' dropped without close, releasing", self.name);
        if let Err(e) = self.engine.end_session(&self.name) {
            log::error!("Failed to release session '{}': {}", self.name, e);
        }
    }
}

/// A cleared force accumulator, ready for one force write
pub struct ForceAccumulator<'s, 'e, E: Engine + ?Sized> {
    session: &'s mut Session<'e, E>,
    body: &'s str,
}

impl<E: Engine + ?Sized> ForceAccumulator<'_, '_, E> {
    pub fn apply(self, command: JointForceCommand) -> Result<(), CoSimError> {
        let session = self.session;
        session
            .engine
            .set_vector(
                &session.name,
                Property::RigidBodyJointForceAndDeriv,
                self.body,
                &command.to_array(),
            )
            .map_err(|source| CoSimError::Apply {
                target: self.body.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simcore::mock::{EngineCall, MockEngine};

    fn start(engine: &mut MockEngine) -> Result<Session<'_, MockEngine>, CoSimError> {
        Session::initialize(engine, "Sim1", &IoConfig::default(), SessionFlags::default())
    }

    fn mock() -> MockEngine {
        MockEngine::new(100.0)
            .with_body("cylinder", JointState::new(0.5, 1.0))
            .with_fixed_body("buoy")
    }

    fn is_end(call: &EngineCall) -> bool {
        matches!(call, EngineCall::End { .. })
    }

    #[test]
    fn test_initialize_passes_engine_arguments() {
        let mut engine = mock();
        let io = IoConfig::new("in", "out").with_overwrite(true);
        let session =
            Session::initialize(&mut engine, "Sim1", &io, SessionFlags::default()).unwrap();
        assert_eq!(session.name(), "Sim1");
        session.close().unwrap();

        assert_eq!(
            engine.calls()[0],
            EngineCall::Start {
                name: "Sim1".to_string(),
                args: "-i in -o out -overwrite on".to_string(),
            }
        );
    }

    #[test]
    fn test_refusal_carries_engine_message() {
        let mut engine = mock().rejecting_start();
        let err = start(&mut engine).err().unwrap();

        match err {
            CoSimError::Initialization { session, source } => {
                assert_eq!(session, "Sim1");
                assert_eq!(source, EngineError::Refused("license unavailable".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(engine.count(is_end), 0);
    }

    #[test]
    fn test_read_and_apply() {
        let mut engine = mock();
        {
            let mut session = start(&mut engine).unwrap();
            let state = session.read_joint_state("cylinder").unwrap();
            assert_eq!(state, JointState::new(0.5, 1.0));

            session
                .clear_force_accumulator("cylinder")
                .unwrap()
                .apply(JointForceCommand::new(-50.0).with_derivative(2.0))
                .unwrap();
            session.close().unwrap();
        }

        let writes: Vec<_> = engine
            .calls()
            .iter()
            .filter_map(|call| match call {
                EngineCall::SetVector { values, .. } => Some(values.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(writes, vec![vec![-50.0, 2.0]]);
    }

    #[test]
    fn test_unknown_body_is_query_error() {
        let mut engine = mock();
        let mut session = start(&mut engine).unwrap();
        let err = session.read_joint_state("ghost").unwrap_err();
        assert!(matches!(err, CoSimError::Query { ref target, .. } if target == "ghost"));
    }

    #[test]
    fn test_fixed_body_clear_is_apply_error() {
        let mut engine = mock();
        let mut session = start(&mut engine).unwrap();
        let err = session.clear_force_accumulator("buoy").err().unwrap();
        assert!(matches!(
            err,
            CoSimError::Apply { source: EngineError::NotActuatable(_), .. }
        ));
    }

    #[test]
    fn test_drop_releases_session() {
        let mut engine = mock();
        {
            let mut session = start(&mut engine).unwrap();
            session.prime().unwrap();
        }
        assert_eq!(engine.count(is_end), 1);
        assert!(!engine.is_running());
    }

    #[test]
    fn test_close_ends_exactly_once() {
        let mut engine = mock();
        let session = start(&mut engine).unwrap();
        session.close().unwrap();
        assert_eq!(engine.count(is_end), 1);
    }

    #[test]
    fn test_list_objects() {
        let mut engine = mock();
        let mut session = start(&mut engine).unwrap();
        let objects = session.list_objects().unwrap();
        let names: Vec<_> = objects.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["buoy", "cylinder"]);
        assert!(objects.iter().all(|o| o.kind == "RigidBody"));
    }
}
