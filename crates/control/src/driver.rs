//! Co-simulation step driver.
//!
//! Each iteration reads the joint state, computes a force from it, clears the
//! body's force accumulator, applies the force and advances the engine by one
//! step. The loop runs while the clock is below the end time, so the last
//! step may overshoot it.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use simcore::{Engine, JointForceCommand, JointState, ObjectInfo};

use crate::clock::SimulationClock;
use crate::config::ScenarioConfig;
use crate::damping::{DampingModel, ForceLaw};
use crate::error::CoSimError;
use crate::session::Session;

/// Driver lifecycle: `Uninitialized -> Primed -> Running -> Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverState {
    Uninitialized,
    Primed,
    Running,
    Closed,
}

/// Data exchanged in one iteration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// Zero-based iteration index
    pub iteration: u64,
    /// Simulation time when the state was read (s)
    pub time: f64,
    pub state: JointState,
    pub command: JointForceCommand,
}

impl fmt::Display for IterationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Time: {:.3} s\tJoint Position: {:.3} m\tJoint Velocity: {:.3} m/s\tJoint Reaction Force: {} N",
            self.time,
            self.state.position,
            self.state.velocity,
            self.command.force.round() as i64
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Completed iterations, each ending in an engine step
    pub iterations: u64,
    /// Clock time after the last step (s)
    pub final_time: f64,
    pub outcome: RunOutcome,
    /// Session inventory, empty unless object listing is enabled
    pub objects: Vec<ObjectInfo>,
}

/// Runs one scenario against an engine
///
/// A driver is single-use: once a run has finished, successfully or not, it
/// is `Closed` and further runs are rejected.
pub struct CoSimDriver<L: ForceLaw = DampingModel> {
    config: ScenarioConfig,
    law: L,
    state: DriverState,
    cancel: Option<Arc<AtomicBool>>,
}

impl CoSimDriver<DampingModel> {
    /// Driver applying the scenario's damping model
    pub fn new(config: ScenarioConfig) -> Self {
        let law = config.damping;
        CoSimDriver {
            config,
            law,
            state: DriverState::Uninitialized,
            cancel: None,
        }
    }
}

impl<L: ForceLaw> CoSimDriver<L> {
    /// Replace the force law
    pub fn with_force_law<M: ForceLaw>(self, law: M) -> CoSimDriver<M> {
        CoSimDriver {
            config: self.config,
            law,
            state: self.state,
            cancel: self.cancel,
        }
    }

    /// Stop at the next iteration boundary once `flag` is set
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Run the scenario to its end time, passing each iteration to `observer`.
    ///
    /// The session is closed on every exit path before this returns. When
    /// both the run and the close fail, the run error is returned.
    pub fn run<E, F>(&mut self, engine: &mut E, mut observer: F) -> Result<RunSummary, CoSimError>
    where
        E: Engine + ?Sized,
        F: FnMut(&IterationRecord),
    {
        if self.state != DriverState::Uninitialized {
            return Err(CoSimError::Lifecycle {
                operation: "run",
                state: self.state,
            });
        }
        self.config.validate()?;
        let mut clock = self.config.clock.build()?;

        let session = Session::initialize(
            engine,
            &self.config.session_name,
            &self.config.io,
            self.config.flags,
        );
        let mut session = match session {
            Ok(session) => session,
            Err(e) => {
                self.state = DriverState::Closed;
                return Err(e);
            }
        };

        let result = self.drive(&mut session, &mut clock, &mut observer);
        let closed = session.close();
        self.state = DriverState::Closed;

        match (result, closed) {
            (Ok(summary), Ok(())) => {
                log::info!(
                    "Run {:?} after {} iterations at t = {:.3} s",
                    summary.outcome,
                    summary.iterations,
                    summary.final_time
                );
                Ok(summary)
            }
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => {
                log::error!("Run failed: {}", e);
                Err(e)
            }
            (Err(e), Err(close_error)) => {
                log::error!("Run failed: {}", e);
                log::warn!("Closing after failure also failed: {}", close_error);
                Err(e)
            }
        }
    }

    fn drive<E: Engine + ?Sized>(
        &mut self,
        session: &mut Session<'_, E>,
        clock: &mut SimulationClock,
        observer: &mut dyn FnMut(&IterationRecord),
    ) -> Result<RunSummary, CoSimError> {
        session.prime()?;
        self.state = DriverState::Primed;

        let objects = if self.config.list_objects {
            let objects = session.list_objects()?;
            for object in &objects {
                log::info!("Object: {} ({})", object.name, object.kind);
            }
            objects
        } else {
            Vec::new()
        };

        let body = self.config.body_name.as_str();
        let mut outcome = RunOutcome::Completed;
        while clock.is_running() {
            if self.is_cancelled() {
                log::info!("Cancelled at t = {:.3} s", clock.current_time());
                outcome = RunOutcome::Cancelled;
                break;
            }
            self.state = DriverState::Running;

            let state = session.read_joint_state(body)?;
            let command = self.law.command(&state);
            session.clear_force_accumulator(body)?.apply(command)?;

            let record = IterationRecord {
                iteration: clock.steps_taken(),
                time: clock.current_time(),
                state,
                command,
            };
            log::debug!("{}", record);
            observer(&record);

            session.advance_time(clock.step_size())?;
            clock.advance();
        }

        Ok(RunSummary {
            iterations: clock.steps_taken(),
            final_time: clock.current_time(),
            outcome,
            objects,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ClockConfig;
    use approx::assert_relative_eq;
    use simcore::mock::{EngineCall, MockEngine};
    use simcore::{EngineError, Property};

    fn config(end_time: f64, step_size: f64) -> ScenarioConfig {
        ScenarioConfig::default()
            .with_clock(ClockConfig::new(0.0, end_time, step_size))
            .with_list_objects(false)
    }

    fn engine(velocity: f64) -> MockEngine {
        MockEngine::new(1000.0).with_body("cylinder", JointState::new(velocity, 0.0))
    }

    fn collect(
        driver: &mut CoSimDriver,
        engine: &mut MockEngine,
    ) -> (Result<RunSummary, CoSimError>, Vec<IterationRecord>) {
        let mut records = Vec::new();
        let result = driver.run(engine, |record| records.push(*record));
        (result, records)
    }

    fn is_end(call: &EngineCall) -> bool {
        matches!(call, EngineCall::End { .. })
    }

    fn is_step(call: &EngineCall) -> bool {
        matches!(call, EngineCall::Step { .. })
    }

    #[test]
    fn test_reference_scenario_runs_1200_iterations() {
        let mut engine = engine(0.5).with_fixed_body("buoy");
        let mut driver = CoSimDriver::new(ScenarioConfig::default());
        let (result, records) = collect(&mut driver, &mut engine);
        let summary = result.unwrap();

        assert_eq!(summary.iterations, 1200);
        assert_eq!(records.len(), 1200);
        assert_eq!(summary.outcome, RunOutcome::Completed);
        assert!(summary.final_time >= 20.0);
        assert_relative_eq!(summary.final_time, 20.0, epsilon = 1e-9);

        // Priming step plus one per iteration, then a single close
        assert_eq!(engine.count(is_step), 1201);
        assert_eq!(engine.count(is_end), 1);
        assert!(is_end(engine.calls().last().unwrap()));
        assert_eq!(driver.state(), DriverState::Closed);

        let names: Vec<_> = summary.objects.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["buoy", "cylinder"]);
    }

    #[test]
    fn test_first_command_is_damping_force() {
        let mut engine = engine(0.5);
        let mut driver = CoSimDriver::new(config(0.1, 0.05));
        let (result, records) = collect(&mut driver, &mut engine);
        result.unwrap();

        assert_relative_eq!(records[0].command.force, -5000.0);
        assert_eq!(records[0].command.force_derivative, 0.0);
        assert_eq!(records[0].time, 0.0);
        assert_eq!(
            records[0].to_string(),
            "Time: 0.000 s\tJoint Position: 0.000 m\tJoint Velocity: 0.500 m/s\tJoint Reaction Force: -5000 N"
        );
    }

    #[test]
    fn test_query_failure_closes_session_once() {
        // 10 iterations, fifth state read fails
        let mut engine = engine(0.5).failing_query_at(5);
        let mut driver = CoSimDriver::new(config(1.25, 0.125));
        let (result, records) = collect(&mut driver, &mut engine);

        assert!(matches!(
            result,
            Err(CoSimError::Query { ref target, .. }) if target == "cylinder"
        ));
        assert_eq!(records.len(), 4);
        assert_eq!(engine.count(is_end), 1);

        let calls = engine.calls();
        let failed_at = calls
            .iter()
            .enumerate()
            .filter(|(_, call)| matches!(call, EngineCall::QueryVector { .. }))
            .nth(4)
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(calls[failed_at + 1..].iter().filter(|c| is_step(c)).count(), 0);
        assert_eq!(driver.state(), DriverState::Closed);
    }

    #[test]
    fn test_clear_precedes_every_apply() {
        let mut engine = engine(0.5);
        let mut driver = CoSimDriver::new(config(0.5, 0.05));
        collect(&mut driver, &mut engine).0.unwrap();

        let calls = engine.calls();
        let clears = engine.count(|call| {
            matches!(
                call,
                EngineCall::SetScalar { property: Property::RigidBodyClearForcesMoments, .. }
            )
        });
        let applies = engine.count(|call| matches!(call, EngineCall::SetVector { .. }));
        assert_eq!(clears, applies);
        assert_eq!(applies, 10);

        for (i, call) in calls.iter().enumerate() {
            if matches!(call, EngineCall::SetVector { .. }) {
                assert!(matches!(
                    calls[i - 1],
                    EngineCall::SetScalar { property: Property::RigidBodyClearForcesMoments, .. }
                ));
            }
        }
    }

    #[test]
    fn test_velocity_decays_monotonically() {
        // m = 1000 kg, c = 10000 N·s/m, dt = 1/60 s: v shrinks by 1/6 per step
        let mut engine = engine(1.0);
        let mut driver = CoSimDriver::new(config(1.0, 1.0 / 60.0));
        let (result, records) = collect(&mut driver, &mut engine);
        result.unwrap();

        for pair in records.windows(2) {
            assert!(pair[1].state.velocity.abs() < pair[0].state.velocity.abs());
            assert!(pair[1].state.velocity > 0.0);
            assert_relative_eq!(
                pair[1].state.velocity,
                pair[0].state.velocity * 5.0 / 6.0,
                epsilon = 1e-12
            );
        }
        assert_eq!(engine.accumulated_force("cylinder").map(f64::is_sign_negative), Some(true));
    }

    #[test]
    fn test_final_step_overshoots_end_time() {
        let mut engine = engine(0.5);
        let mut driver = CoSimDriver::new(config(1.0, 0.3));
        let summary = collect(&mut driver, &mut engine).0.unwrap();

        assert_eq!(summary.iterations, 4);
        assert_relative_eq!(summary.final_time, 1.2, epsilon = 1e-9);
        assert_relative_eq!(engine.time(), 1.2, epsilon = 1e-9);
    }

    #[test]
    fn test_refused_start_is_not_closed() {
        let mut engine = engine(0.5).rejecting_start();
        let mut driver = CoSimDriver::new(config(1.0, 0.1));
        let result = collect(&mut driver, &mut engine).0;

        match result {
            Err(CoSimError::Initialization { source, .. }) => {
                assert_eq!(source, EngineError::Refused("license unavailable".to_string()));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(engine.count(is_end), 0);
        assert_eq!(driver.state(), DriverState::Closed);
    }

    #[test]
    fn test_priming_failure_is_initialization_error() {
        let mut engine = engine(0.5).failing_step_at(1);
        let mut driver = CoSimDriver::new(config(1.0, 0.1));
        let result = collect(&mut driver, &mut engine).0;

        assert!(matches!(result, Err(CoSimError::Initialization { .. })));
        assert_eq!(engine.count(is_end), 1);
    }

    #[test]
    fn test_step_failure_is_integration_error() {
        let mut engine = engine(0.5).failing_step_at(3);
        let mut driver = CoSimDriver::new(config(1.0, 0.1));
        let (result, records) = collect(&mut driver, &mut engine);

        let err = result.unwrap_err();
        assert!(matches!(err, CoSimError::Integration { .. }));
        assert_eq!(err.engine_error(), Some(&EngineError::Diverged { time: 0.1 }));
        assert_eq!(records.len(), 2);
        assert_eq!(engine.count(is_end), 1);
    }

    #[test]
    fn test_close_failure_after_clean_run_is_reported() {
        let mut engine = engine(0.5).failing_end();
        let mut driver = CoSimDriver::new(config(0.3, 0.1));
        let (result, records) = collect(&mut driver, &mut engine);

        match result {
            Err(CoSimError::Close { session, source }) => {
                assert_eq!(session, "Sim1");
                assert_eq!(source, EngineError::Backend("close failed".to_string()));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(records.len(), 3);
        assert_eq!(engine.count(is_end), 1);
        assert_eq!(driver.state(), DriverState::Closed);
    }

    #[test]
    fn test_run_error_wins_over_close_failure() {
        let mut engine = engine(0.5).failing_query_at(2).failing_end();
        let mut driver = CoSimDriver::new(config(1.0, 0.1));
        let (result, records) = collect(&mut driver, &mut engine);

        assert!(matches!(
            result,
            Err(CoSimError::Query { ref target, .. }) if target == "cylinder"
        ));
        assert_eq!(records.len(), 1);
        assert_eq!(engine.count(is_end), 1);
        assert_eq!(driver.state(), DriverState::Closed);
    }

    #[test]
    fn test_fixed_body_is_apply_error() {
        let mut engine = MockEngine::new(1.0).with_fixed_body("cylinder");
        let mut driver = CoSimDriver::new(config(1.0, 0.1));
        let result = collect(&mut driver, &mut engine).0;

        assert!(matches!(
            result,
            Err(CoSimError::Apply { source: EngineError::NotActuatable(_), .. })
        ));
        assert_eq!(engine.count(is_end), 1);
    }

    #[test]
    fn test_invalid_config_makes_no_engine_calls() {
        let mut engine = engine(0.5);
        let mut driver = CoSimDriver::new(config(1.0, 0.0));
        let result = collect(&mut driver, &mut engine).0;

        assert!(matches!(result, Err(CoSimError::Config(_))));
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn test_cancel_before_first_iteration() {
        let flag = Arc::new(AtomicBool::new(true));
        let mut engine = engine(0.5);
        let mut driver = CoSimDriver::new(config(1.0, 0.1)).with_cancel_flag(flag);
        let summary = collect(&mut driver, &mut engine).0.unwrap();

        assert_eq!(summary.outcome, RunOutcome::Cancelled);
        assert_eq!(summary.iterations, 0);
        assert_eq!(engine.count(is_end), 1);
    }

    #[test]
    fn test_cancel_takes_effect_at_iteration_boundary() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut engine = engine(0.5);
        let mut driver = CoSimDriver::new(config(1.0, 0.1)).with_cancel_flag(flag.clone());

        let summary = driver
            .run(&mut engine, |record| {
                if record.iteration == 3 {
                    flag.store(true, Ordering::Relaxed);
                }
            })
            .unwrap();

        // The iteration that raised the flag still advances
        assert_eq!(summary.outcome, RunOutcome::Cancelled);
        assert_eq!(summary.iterations, 4);
        assert_eq!(engine.count(is_step), 5);
    }

    #[test]
    fn test_second_run_is_rejected() {
        let mut engine = engine(0.5);
        let mut driver = CoSimDriver::new(config(0.2, 0.1));
        collect(&mut driver, &mut engine).0.unwrap();
        let calls_after_first = engine.calls().len();

        let result = collect(&mut driver, &mut engine).0;
        assert!(matches!(
            result,
            Err(CoSimError::Lifecycle { operation: "run", state: DriverState::Closed })
        ));
        assert_eq!(engine.calls().len(), calls_after_first);
    }

    #[test]
    fn test_custom_force_law() {
        let mut engine = engine(0.0);
        let mut driver = CoSimDriver::new(config(0.3, 0.1))
            .with_force_law(|_: &JointState| JointForceCommand::new(100.0).with_derivative(1.0));

        let mut records = Vec::new();
        driver.run(&mut engine, |r| records.push(*r)).unwrap();

        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.command.force == 100.0));
        assert!(records[2].state.velocity > records[1].state.velocity);
    }
}
