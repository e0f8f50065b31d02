//! Engine backed by the vendor's Python API module
//!
//! The vendor ships its engine API as a Python extension module exposing
//! `InitializeProteusDS`, `AdvanceTime`, `GetDoubleArray`, `SetDoubleArray`
//! and friends, with property ids in the `PDSAPI` enum. [`ApiModuleEngine`]
//! forwards every [`Engine`] call to that module, so the driver can run
//! against the real engine without a native link to it.

use pyo3::prelude::*;

use simcore::{Engine, EngineError, IoConfig, Property, Scalar, SessionFlags};

pub struct ApiModuleEngine {
    module: PyObject,
}

impl ApiModuleEngine {
    pub fn new(module: PyObject) -> Self {
        ApiModuleEngine { module }
    }

    /// Run `f` against the API module with the GIL held
    fn with_api<T>(
        &self,
        f: impl FnOnce(&Bound<'_, PyAny>) -> PyResult<T>,
    ) -> Result<T, EngineError> {
        Python::with_gil(|py| f(self.module.bind(py)))
            .map_err(|e| EngineError::Backend(e.to_string()))
    }

    /// Call a function that reports success as a bool
    fn call_status<A>(&mut self, name: &str, function: &str, args: A) -> Result<(), EngineError>
    where
        A: IntoPy<Py<pyo3::types::PyTuple>>,
    {
        let status = self.with_api(|api| {
            let returned = api.getattr(function)?.call1(args)?;
            Ok(returned.extract::<bool>().ok())
        })?;

        if status == Some(false) {
            let message = self
                .error_message(name)
                .unwrap_or_else(|| "no message".to_string());
            return Err(EngineError::Backend(format!("{function} failed: {message}")));
        }
        Ok(())
    }
}

/// Member of the module's `PDSAPI` enum for `property`
fn command<'py>(api: &Bound<'py, PyAny>, property: Property) -> PyResult<Bound<'py, PyAny>> {
    api.getattr("PDSAPI")?.getattr(property.api_name())
}

impl Engine for ApiModuleEngine {
    fn start_session(
        &mut self,
        name: &str,
        io: &IoConfig,
        flags: SessionFlags,
    ) -> Result<bool, EngineError> {
        let [first, second] = flags.0;
        self.with_api(|api| {
            api.getattr("InitializeProteusDS")?
                .call1((name, io.to_args(), first, second))?
                .extract::<bool>()
        })
    }

    fn step_session(&mut self, name: &str, duration: f64) -> Result<(), EngineError> {
        self.call_status(name, "AdvanceTime", (name, duration))
    }

    fn query_string(
        &mut self,
        name: &str,
        property: Property,
        filter: &str,
    ) -> Result<String, EngineError> {
        self.with_api(|api| {
            api.getattr("GetString")?
                .call1((name, command(api, property)?, filter))?
                .extract::<String>()
        })
    }

    fn query_vector(
        &mut self,
        name: &str,
        property: Property,
        target: &str,
        len: usize,
    ) -> Result<Vec<f64>, EngineError> {
        let values = self.with_api(|api| {
            api.getattr("GetDoubleArray")?
                .call1((name, command(api, property)?, target, len))?
                .extract::<Vec<f64>>()
        })?;
        if values.len() != len {
            return Err(EngineError::LengthMismatch {
                property,
                expected: len,
                got: values.len(),
            });
        }
        Ok(values)
    }

    fn set_scalar(
        &mut self,
        name: &str,
        property: Property,
        target: &str,
        value: Scalar,
    ) -> Result<(), EngineError> {
        let cmd = self.with_api(|api| Ok(command(api, property)?.unbind()))?;
        match value {
            Scalar::Int(v) => self.call_status(name, "SetInt", (name, cmd, target, v)),
            Scalar::Double(v) => self.call_status(name, "SetDouble", (name, cmd, target, v)),
        }
    }

    fn set_vector(
        &mut self,
        name: &str,
        property: Property,
        target: &str,
        values: &[f64],
    ) -> Result<(), EngineError> {
        let cmd = self.with_api(|api| Ok(command(api, property)?.unbind()))?;
        self.call_status(name, "SetDoubleArray", (name, cmd, target, values.to_vec()))
    }

    fn end_session(&mut self, name: &str) -> Result<(), EngineError> {
        self.call_status(name, "Close", (name,))
    }

    fn error_message(&mut self, name: &str) -> Option<String> {
        self.with_api(|api| api.getattr("GetErrorMessage")?.call1((name,))?.extract::<String>())
            .ok()
            .filter(|message| !message.is_empty())
    }
}
