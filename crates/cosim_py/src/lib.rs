//! Joint Damping Co-Simulation Python Bindings
//!
//! This module provides Python bindings for the co-simulation driver:
//! - Whole runs execute in Rust and return numpy arrays, so Python is only
//!   crossed once per run
//! - A step-by-step piston session for scripts that compute their own forces
//! - An adapter that drives the vendor's engine through its Python API module

use pyo3::prelude::*;

mod api_engine;
mod simulation;

pub use api_engine::ApiModuleEngine;
pub use simulation::*;

/// Python module for joint damping co-simulation
#[pymodule]
fn cosim_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Whole-scenario runs
    m.add_function(wrap_pyfunction!(simulation::run_joint_damping, m)?)?;
    m.add_class::<simulation::DampingResult>()?;

    // Step-by-step sessions on the in-process engine
    m.add_class::<simulation::PistonSimulation>()?;

    m.add("ENGINE_VERSION", mechanics::ENGINE_VERSION)?;
    Ok(())
}
