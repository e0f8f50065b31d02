//! Fixed-step simulation clock.
//!
//! Time is derived from the number of completed steps, `start + n * step`,
//! so no rounding error accumulates over long runs.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Clock settings as written in a scenario file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Simulation start time (s)
    pub start_time: f64,
    /// The loop runs while the current time is below this (s)
    pub end_time: f64,
    /// Engine step (s)
    pub step_size: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            start_time: 0.0,
            end_time: 20.0,
            step_size: 1.0 / 60.0,
        }
    }
}

impl ClockConfig {
    pub fn new(start_time: f64, end_time: f64, step_size: f64) -> Self {
        Self {
            start_time,
            end_time,
            step_size,
        }
    }

    pub fn build(&self) -> Result<SimulationClock, ConfigError> {
        SimulationClock::new(self.start_time, self.end_time, self.step_size)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationClock {
    start_time: f64,
    end_time: f64,
    step_size: f64,
    steps: u64,
}

impl SimulationClock {
    pub fn new(start_time: f64, end_time: f64, step_size: f64) -> Result<Self, ConfigError> {
        if !(step_size.is_finite() && step_size > 0.0) {
            return Err(ConfigError::InvalidStep(step_size));
        }
        if !(start_time.is_finite() && end_time.is_finite()) || end_time < start_time {
            return Err(ConfigError::InvalidTimeSpan {
                start: start_time,
                end: end_time,
            });
        }
        Ok(Self {
            start_time,
            end_time,
            step_size,
            steps: 0,
        })
    }

    fn time_at(&self, steps: u64) -> f64 {
        self.start_time + steps as f64 * self.step_size
    }

    pub fn current_time(&self) -> f64 {
        self.time_at(self.steps)
    }

    pub fn is_running(&self) -> bool {
        self.current_time() < self.end_time
    }

    /// Record one completed engine step
    pub fn advance(&mut self) {
        self.steps += 1;
    }

    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    pub fn steps_taken(&self) -> u64 {
        self.steps
    }

    /// Number of steps a full run takes, including a final overshooting step
    pub fn planned_steps(&self) -> u64 {
        let estimate = ((self.end_time - self.start_time) / self.step_size).ceil() as u64;
        // Settle rounding at the boundary against the loop condition
        let mut n = estimate.saturating_sub(1);
        while n > 0 && self.time_at(n - 1) >= self.end_time {
            n -= 1;
        }
        while self.time_at(n) < self.end_time {
            n += 1;
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn run_to_end(clock: &mut SimulationClock) -> u64 {
        while clock.is_running() {
            clock.advance();
        }
        clock.steps_taken()
    }

    #[test]
    fn test_reference_scenario_step_count() {
        let mut clock = ClockConfig::default().build().unwrap();
        assert_eq!(clock.planned_steps(), 1200);
        assert_eq!(run_to_end(&mut clock), 1200);
        assert_relative_eq!(clock.current_time(), 20.0, epsilon = 1e-9);
        assert!(clock.current_time() >= 20.0);
    }

    #[test]
    fn test_final_step_overshoots_end() {
        let mut clock = SimulationClock::new(0.0, 1.0, 0.3).unwrap();
        assert_eq!(run_to_end(&mut clock), 4);
        assert_relative_eq!(clock.current_time(), 1.2, epsilon = 1e-9);
        assert_eq!(clock.planned_steps(), 4);
    }

    #[test]
    fn test_no_drift_over_long_runs() {
        let mut clock = SimulationClock::new(0.0, 1000.0, 0.1).unwrap();
        for _ in 0..10_000 {
            clock.advance();
        }
        assert_relative_eq!(clock.current_time(), 1000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_span_runs_no_steps() {
        let clock = SimulationClock::new(5.0, 5.0, 0.1).unwrap();
        assert!(!clock.is_running());
        assert_eq!(clock.planned_steps(), 0);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        assert!(matches!(
            SimulationClock::new(0.0, 1.0, 0.0),
            Err(ConfigError::InvalidStep(_))
        ));
        assert!(matches!(
            SimulationClock::new(0.0, 1.0, f64::NAN),
            Err(ConfigError::InvalidStep(_))
        ));
        assert!(matches!(
            SimulationClock::new(2.0, 1.0, 0.1),
            Err(ConfigError::InvalidTimeSpan { .. })
        ));
    }
}
