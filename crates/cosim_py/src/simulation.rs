//! Joint damping runs and step-by-step piston sessions for Python
//!
//! `run_joint_damping` executes a whole scenario in Rust and hands back the
//! time series as numpy arrays. `PistonSimulation` exposes the engine's own
//! call sequence so a script can drive each step itself.

use std::error::Error;

use numpy::ToPyArray;
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use control::{ClockConfig, CoSimDriver, CoSimError, RunOutcome, ScenarioConfig};
use mechanics::{PistonEngine, PistonScene};
use simcore::{
    split_engine_list, Engine, EngineError, IoConfig, JointState, Property, Scalar, SessionFlags,
};

use crate::api_engine::ApiModuleEngine;

fn run_error(err: CoSimError) -> PyErr {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    match err {
        CoSimError::Config(_) => PyValueError::new_err(message),
        _ => PyRuntimeError::new_err(message),
    }
}

fn engine_error(err: EngineError) -> PyErr {
    PyRuntimeError::new_err(err.to_string())
}

fn parse_scene(json: &str) -> PyResult<PistonScene> {
    PistonScene::from_json_str(json).map_err(|e| PyValueError::new_err(e.to_string()))
}

/// Time series of a joint damping run
#[pyclass]
pub struct DampingResult {
    times: Vec<f64>,
    positions: Vec<f64>,
    velocities: Vec<f64>,
    forces: Vec<f64>,
    #[pyo3(get)]
    iterations: u64,
    #[pyo3(get)]
    final_time: f64,
    #[pyo3(get)]
    cancelled: bool,
    #[pyo3(get)]
    objects: Vec<(String, String)>,
}

#[pymethods]
impl DampingResult {
    /// Convert to dictionary of numpy arrays
    fn to_dict<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let dict = PyDict::new_bound(py);
        dict.set_item("time", self.times.to_pyarray_bound(py))?;
        dict.set_item("position", self.positions.to_pyarray_bound(py))?;
        dict.set_item("velocity", self.velocities.to_pyarray_bound(py))?;
        dict.set_item("force", self.forces.to_pyarray_bound(py))?;
        Ok(dict)
    }

    /// Position, velocity and force of the last iteration
    fn final_state(&self) -> (f64, f64, f64) {
        (
            *self.positions.last().unwrap_or(&0.0),
            *self.velocities.last().unwrap_or(&0.0),
            *self.forces.last().unwrap_or(&0.0),
        )
    }

    fn __len__(&self) -> usize {
        self.times.len()
    }

    fn __repr__(&self) -> String {
        format!(
            "DampingResult(iterations={}, final_time={:.3}, cancelled={})",
            self.iterations,
            self.final_time,
            if self.cancelled { "True" } else { "False" }
        )
    }
}

/// Run the external damping loop and return its time series.
///
/// Args:
///     api: Vendor engine API module. The in-process piston engine is used when omitted.
///     session: Engine session name
///     input_dir, output_dir, overwrite: Engine input/output settings
///     body: Body whose joint is damped
///     damping: Damping coefficient (N·s/m)
///     start_time, end_time, dt: Clock settings (s)
///     scene_json: Scene for the piston engine, instead of `<input_dir>/scene.json`
///     list_objects: Collect the session's object inventory
///     verbose: Print one line per iteration
#[pyfunction]
#[pyo3(signature = (
    api=None,
    session="Sim1",
    input_dir="./Inputs",
    output_dir="./Results",
    overwrite=true,
    body="cylinder",
    damping=10000.0,
    start_time=0.0,
    end_time=20.0,
    dt=1.0 / 60.0,
    scene_json=None,
    list_objects=true,
    verbose=false
))]
#[allow(clippy::too_many_arguments)]
pub fn run_joint_damping(
    api: Option<Bound<'_, PyAny>>,
    session: &str,
    input_dir: &str,
    output_dir: &str,
    overwrite: bool,
    body: &str,
    damping: f64,
    start_time: f64,
    end_time: f64,
    dt: f64,
    scene_json: Option<&str>,
    list_objects: bool,
    verbose: bool,
) -> PyResult<DampingResult> {
    let config = ScenarioConfig::default()
        .with_session_name(session)
        .with_io(IoConfig::new(input_dir, output_dir).with_overwrite(overwrite))
        .with_body(body)
        .with_damping(damping)
        .with_clock(ClockConfig::new(start_time, end_time, dt))
        .with_list_objects(list_objects);

    let mut engine: Box<dyn Engine> = match (api, scene_json) {
        (Some(module), _) => Box::new(ApiModuleEngine::new(module.unbind())),
        (None, Some(json)) => Box::new(PistonEngine::with_scene(parse_scene(json)?)),
        (None, None) => Box::new(PistonEngine::new()),
    };

    let mut result = DampingResult {
        times: Vec::new(),
        positions: Vec::new(),
        velocities: Vec::new(),
        forces: Vec::new(),
        iterations: 0,
        final_time: start_time,
        cancelled: false,
        objects: Vec::new(),
    };

    let summary = CoSimDriver::new(config)
        .run(engine.as_mut(), |record| {
            if verbose {
                println!("{record}");
            }
            result.times.push(record.time);
            result.positions.push(record.state.position);
            result.velocities.push(record.state.velocity);
            result.forces.push(record.command.force);
        })
        .map_err(run_error)?;

    result.iterations = summary.iterations;
    result.final_time = summary.final_time;
    result.cancelled = summary.outcome == RunOutcome::Cancelled;
    result.objects = summary
        .objects
        .into_iter()
        .map(|object| (object.name, object.kind))
        .collect();
    Ok(result)
}

/// Step-by-step session on the in-process piston engine
///
/// Mirrors the engine's own call sequence: read a joint state, clear and
/// apply joint forces, advance time. The session is primed on creation.
#[pyclass]
pub struct PistonSimulation {
    engine: PistonEngine,
    session: String,
}

impl PistonSimulation {
    fn ensure_running(&self) -> PyResult<()> {
        if self.engine.is_running(&self.session) {
            Ok(())
        } else {
            Err(PyRuntimeError::new_err(format!(
                "Session '{}' is closed",
                self.session
            )))
        }
    }
}

#[pymethods]
impl PistonSimulation {
    #[new]
    #[pyo3(signature = (
        input_dir="./Inputs",
        output_dir="./Results",
        overwrite=true,
        session="Sim1",
        scene_json=None
    ))]
    fn new(
        input_dir: &str,
        output_dir: &str,
        overwrite: bool,
        session: &str,
        scene_json: Option<&str>,
    ) -> PyResult<Self> {
        let mut engine = match scene_json {
            Some(json) => PistonEngine::with_scene(parse_scene(json)?),
            None => PistonEngine::new(),
        };

        let io = IoConfig::new(input_dir, output_dir).with_overwrite(overwrite);
        if !engine
            .start_session(session, &io, SessionFlags::default())
            .map_err(engine_error)?
        {
            let reason = engine.error_message(session).unwrap_or_default();
            return Err(PyRuntimeError::new_err(format!(
                "Engine refused to start session '{session}': {reason}"
            )));
        }
        engine.step_session(session, 0.0).map_err(engine_error)?;

        Ok(PistonSimulation {
            engine,
            session: session.to_string(),
        })
    }

    /// Joint (velocity, position) of a body
    fn joint_state(&mut self, body: &str) -> PyResult<(f64, f64)> {
        self.ensure_running()?;
        let values = self
            .engine
            .query_vector(&self.session, Property::State, body, JointState::LEN)
            .map_err(engine_error)?;
        let state = JointState::from_slice(&values).unwrap_or_default();
        Ok((state.velocity, state.position))
    }

    /// Clear the body's force accumulator and apply a joint force
    #[pyo3(signature = (body, force, force_derivative=0.0))]
    fn apply_joint_force(&mut self, body: &str, force: f64, force_derivative: f64) -> PyResult<()> {
        self.ensure_running()?;
        self.engine
            .set_scalar(
                &self.session,
                Property::RigidBodyClearForcesMoments,
                body,
                Scalar::Int(1),
            )
            .map_err(engine_error)?;
        self.engine
            .set_vector(
                &self.session,
                Property::RigidBodyJointForceAndDeriv,
                body,
                &[force, force_derivative],
            )
            .map_err(engine_error)
    }

    fn advance_time(&mut self, dt: f64) -> PyResult<()> {
        self.ensure_running()?;
        self.engine
            .step_session(&self.session, dt)
            .map_err(engine_error)
    }

    /// Set the reference wave height (m) and period (s)
    fn set_waves(&mut self, height: f64, period: f64) -> PyResult<()> {
        self.ensure_running()?;
        for (property, value) in [
            (Property::EnvironmentWaveReferenceHeight, height),
            (Property::EnvironmentWaveReferencePeriod, period),
        ] {
            self.engine
                .set_scalar(&self.session, property, "", Scalar::Double(value))
                .map_err(|e| PyValueError::new_err(e.to_string()))?;
        }
        Ok(())
    }

    /// (name, type) of every object in the session
    fn objects(&mut self) -> PyResult<Vec<(String, String)>> {
        self.ensure_running()?;
        let names = self
            .engine
            .query_string(&self.session, Property::DObjectNames, "")
            .map_err(engine_error)?;
        let kinds = self
            .engine
            .query_string(&self.session, Property::DObjectTypes, "")
            .map_err(engine_error)?;
        Ok(split_engine_list(&names)
            .into_iter()
            .zip(split_engine_list(&kinds))
            .collect())
    }

    #[getter]
    fn time(&self) -> f64 {
        self.engine.session_time(&self.session).unwrap_or(0.0)
    }

    #[getter]
    fn is_running(&self) -> bool {
        self.engine.is_running(&self.session)
    }

    /// End the session. Closing twice is a no-op.
    fn close(&mut self) -> PyResult<()> {
        if !self.engine.is_running(&self.session) {
            return Ok(());
        }
        self.engine.end_session(&self.session).map_err(engine_error)
    }
}
