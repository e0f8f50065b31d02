//! In-process reference engine.
//!
//! [`PistonEngine`] implements the [`Engine`] call contract for scenes of
//! rigid bodies on prismatic joints excited by waves. Each named session owns
//! its own copy of the scene, so several sessions can run side by side.
//!
//! Per engine step the joint is integrated in `substeps` equal sub-steps. The
//! wave excitation is sampled at the start of each sub-step, and the applied
//! force ramps by its derivative from the start of the engine step.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use simcore::{
    Engine, EngineError, IoConfig, JointState, Property, Scalar, SessionFlags, join_engine_list,
};

use crate::joint::PrismaticJoint;
use crate::scene::{IntegratorKind, ObjectKind, PistonScene};
use crate::waves::{WaveConfig, WaveField};

/// Version string reported for [`Property::Version`]
pub const ENGINE_VERSION: &str = concat!("PistonEngine ", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
struct Body {
    name: String,
    kind: ObjectKind,
    joint: Option<PrismaticJoint>,
}

#[derive(Debug, Clone)]
struct PistonSession {
    bodies: Vec<Body>,
    wave_config: WaveConfig,
    waves: WaveField,
    integrator: IntegratorKind,
    substeps: u32,
    time: f64,
}

impl PistonSession {
    fn from_scene(scene: PistonScene) -> Self {
        let bodies = scene
            .objects
            .into_iter()
            .map(|object| Body {
                name: object.name,
                kind: object.kind,
                joint: object.joint.map(PrismaticJoint::new),
            })
            .collect();
        PistonSession {
            bodies,
            waves: WaveField::new(&scene.waves),
            wave_config: scene.waves,
            integrator: scene.integrator,
            substeps: scene.substeps,
            time: 0.0,
        }
    }

    fn body(&self, target: &str) -> Result<&Body, EngineError> {
        self.bodies
            .iter()
            .find(|body| body.name == target)
            .ok_or_else(|| EngineError::UnknownObject(target.to_string()))
    }

    fn joint_mut(&mut self, target: &str) -> Result<&mut PrismaticJoint, EngineError> {
        let body = self
            .bodies
            .iter_mut()
            .find(|body| body.name == target)
            .ok_or_else(|| EngineError::UnknownObject(target.to_string()))?;
        body.joint
            .as_mut()
            .ok_or_else(|| EngineError::NotActuatable(target.to_string()))
    }

    fn matching<'a>(&'a self, filter: &'a str) -> impl Iterator<Item = &'a Body> + 'a {
        self.bodies
            .iter()
            .filter(move |body| filter.is_empty() || body.kind.type_name() == filter)
    }

    fn rebuild_waves(&mut self) {
        self.waves = WaveField::new(&self.wave_config);
    }

    fn step(&mut self, duration: f64) -> Result<(), EngineError> {
        let start = self.time;
        if duration > 0.0 {
            let h = duration / self.substeps as f64;
            let integrator = self.integrator.integrator();
            for i in 0..self.substeps {
                let elapsed = i as f64 * h;
                let elevation = self.waves.elevation(start + elapsed);
                for joint in self.bodies.iter_mut().filter_map(|body| body.joint.as_mut()) {
                    let excitation = joint.config.wave_coupling * elevation;
                    joint.step(integrator, h, elapsed, excitation);
                }
            }
        }

        if let Some(body) = self
            .bodies
            .iter()
            .find(|body| body.joint.as_ref().is_some_and(|joint| !joint.is_finite()))
        {
            log::error!("Joint '{}' diverged during step from t = {:.3} s", body.name, start);
            return Err(EngineError::Diverged { time: start });
        }

        self.time = start + duration;
        Ok(())
    }
}

/// Reference engine with named sessions
#[derive(Debug, Clone, Default)]
pub struct PistonEngine {
    scene: Option<PistonScene>,
    sessions: BTreeMap<String, PistonSession>,
    last_errors: HashMap<String, String>,
}

impl PistonEngine {
    /// Engine that loads each session's scene from its input directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine that starts every session from `scene`, ignoring scene files.
    pub fn with_scene(scene: PistonScene) -> Self {
        PistonEngine {
            scene: Some(scene),
            ..Default::default()
        }
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.sessions.contains_key(name)
    }

    pub fn session_names(&self) -> Vec<String> {
        self.sessions.keys().cloned().collect()
    }

    pub fn session_time(&self, name: &str) -> Option<f64> {
        self.sessions.get(name).map(|session| session.time)
    }

    pub fn joint_state(&self, name: &str, body: &str) -> Option<JointState> {
        self.sessions
            .get(name)?
            .body(body)
            .ok()?
            .joint
            .as_ref()
            .map(PrismaticJoint::state)
    }

    fn session(&self, name: &str) -> Result<&PistonSession, EngineError> {
        self.sessions
            .get(name)
            .ok_or_else(|| EngineError::UnknownSession(name.to_string()))
    }

    fn session_mut(&mut self, name: &str) -> Result<&mut PistonSession, EngineError> {
        self.sessions
            .get_mut(name)
            .ok_or_else(|| EngineError::UnknownSession(name.to_string()))
    }

    /// Prepare a session, returning the refusal reason on failure.
    fn open(&self, name: &str, io: &IoConfig) -> Result<PistonSession, String> {
        if self.sessions.contains_key(name) {
            return Err(format!("session '{}' is already running", name));
        }
        if !io.input_dir.is_dir() {
            return Err(format!(
                "input directory {} not found",
                io.input_dir.display()
            ));
        }
        if !io.overwrite && has_entries(&io.output_dir) {
            return Err(format!(
                "output directory {} is not empty and overwrite is off",
                io.output_dir.display()
            ));
        }

        let scene = match &self.scene {
            Some(scene) => scene.clone(),
            None => PistonScene::load_or_default(&io.input_dir).map_err(|e| e.to_string())?,
        };
        scene.validate().map_err(|e| e.to_string())?;
        Ok(PistonSession::from_scene(scene))
    }
}

fn has_entries(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

fn single(value: f64) -> Vec<f64> {
    vec![value]
}

impl Engine for PistonEngine {
    fn start_session(
        &mut self,
        name: &str,
        io: &IoConfig,
        flags: SessionFlags,
    ) -> Result<bool, EngineError> {
        log::debug!("Session '{}' arguments: {} flags: {:?}", name, io.to_args(), flags.0);
        match self.open(name, io) {
            Ok(session) => {
                log::info!(
                    "Started session '{}' with {} objects",
                    name,
                    session.bodies.len()
                );
                self.sessions.insert(name.to_string(), session);
                self.last_errors.remove(name);
                Ok(true)
            }
            Err(reason) => {
                log::warn!("Refused to start session '{}': {}", name, reason);
                self.last_errors.insert(name.to_string(), reason);
                Ok(false)
            }
        }
    }

    fn step_session(&mut self, name: &str, duration: f64) -> Result<(), EngineError> {
        if !duration.is_finite() || duration < 0.0 {
            return Err(EngineError::InvalidDuration(duration));
        }
        self.session_mut(name)?.step(duration)
    }

    fn query_string(
        &mut self,
        name: &str,
        property: Property,
        filter: &str,
    ) -> Result<String, EngineError> {
        let session = self.session(name)?;
        match property {
            Property::DObjectNames => Ok(join_engine_list(
                session.matching(filter).map(|body| body.name.as_str()),
            )),
            Property::DObjectTypes => Ok(join_engine_list(
                session.matching(filter).map(|body| body.kind.type_name()),
            )),
            Property::Version => Ok(ENGINE_VERSION.to_string()),
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
        let session = self.session(name)?;
        let mut values = match property {
            Property::State | Property::RigidBodyState => {
                let state = session
                    .body(target)?
                    .joint
                    .as_ref()
                    .map(PrismaticJoint::state)
                    .unwrap_or_default();
                state.to_array().to_vec()
            }
            Property::RigidBodyPosition => {
                let body = session.body(target)?;
                single(body.joint.as_ref().map_or(0.0, |joint| joint.state().position))
            }
            Property::RigidBodyJointForceAndDeriv => {
                let (force, rate) = session
                    .body(target)?
                    .joint
                    .as_ref()
                    .map_or((0.0, 0.0), PrismaticJoint::accumulated);
                vec![force, rate]
            }
            Property::Time => single(session.time),
            Property::SimulationRunning => single(1.0),
            Property::NumberOfDObjects => single(session.bodies.len() as f64),
            Property::EnvironmentWaveReferenceHeight => {
                single(session.wave_config.reference_height)
            }
            Property::EnvironmentWaveReferencePeriod => {
                single(session.wave_config.reference_period)
            }
            Property::EnvironmentWaveSeed => single(session.wave_config.seed as f64),
            other => return Err(EngineError::UnsupportedProperty(other)),
        };
        values.resize(len, 0.0);
        Ok(values)
    }

    fn set_scalar(
        &mut self,
        name: &str,
        property: Property,
        target: &str,
        value: Scalar,
    ) -> Result<(), EngineError> {
        let session = self.session_mut(name)?;
        let v = value.as_f64();
        let invalid = EngineError::InvalidValue { property, value: v };
        match property {
            Property::RigidBodyClearForcesMoments => {
                let joint = session.joint_mut(target)?;
                if v != 0.0 {
                    joint.clear_forces();
                }
            }
            Property::EnvironmentWaveReferenceHeight => {
                if !(v.is_finite() && v >= 0.0) {
                    return Err(invalid);
                }
                session.wave_config.reference_height = v;
                session.rebuild_waves();
            }
            Property::EnvironmentWaveReferencePeriod => {
                if !(v.is_finite() && v > 0.0) {
                    return Err(invalid);
                }
                session.wave_config.reference_period = v;
                session.rebuild_waves();
            }
            Property::EnvironmentWaveSeed => {
                if !(v.is_finite() && v >= 0.0 && v.fract() == 0.0) {
                    return Err(invalid);
                }
                session.wave_config.seed = v as u64;
                session.rebuild_waves();
            }
            other => return Err(EngineError::UnsupportedProperty(other)),
        }
        Ok(())
    }

    fn set_vector(
        &mut self,
        name: &str,
        property: Property,
        target: &str,
        values: &[f64],
    ) -> Result<(), EngineError> {
        let session = self.session_mut(name)?;
        match property {
            Property::RigidBodyJointForceAndDeriv => {
                let (force, rate) = match values {
                    [force] => (*force, 0.0),
                    [force, rate] => (*force, *rate),
                    _ => {
                        return Err(EngineError::LengthMismatch {
                            property,
                            expected: 2,
                            got: values.len(),
                        });
                    }
                };
                session.joint_mut(target)?.add_force(force, rate);
                Ok(())
            }
            other => Err(EngineError::UnsupportedProperty(other)),
        }
    }

    fn end_session(&mut self, name: &str) -> Result<(), EngineError> {
        let session = self
            .sessions
            .remove(name)
            .ok_or_else(|| EngineError::UnknownSession(name.to_string()))?;
        log::info!("Closed session '{}' at t = {:.3} s", name, session.time);
        Ok(())
    }

    fn error_message(&mut self, name: &str) -> Option<String> {
        self.last_errors.get(name).cloned()
    }
}
