use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::properties::Property;

// Joint data exchanged every step

/// Kinematic state of a single-DOF joint as reported by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JointState {
    /// Joint velocity (m/s for prismatic joints)
    pub velocity: f64,
    /// Joint position (m for prismatic joints)
    pub position: f64,
}

impl JointState {
    /// Length of the engine's joint state vector.
    pub const LEN: usize = 2;

    pub fn new(velocity: f64, position: f64) -> Self {
        JointState { velocity, position }
    }

    /// Build from the engine's `[velocity, position]` vector.
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        match values {
            [velocity, position, ..] => Some(JointState::new(*velocity, *position)),
            _ => None,
        }
    }

    pub fn to_array(self) -> [f64; 2] {
        [self.velocity, self.position]
    }
}

/// Force written to a joint's force accumulator before the next step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JointForceCommand {
    /// Joint force (N)
    pub force: f64,
    /// Time derivative of the force over the coming step (N/s)
    #[serde(default)]
    pub force_derivative: f64,
}

impl JointForceCommand {
    /// Constant force over the step.
    pub fn new(force: f64) -> Self {
        JointForceCommand {
            force,
            force_derivative: 0.0,
        }
    }

    pub fn with_derivative(mut self, force_derivative: f64) -> Self {
        self.force_derivative = force_derivative;
        self
    }

    /// Engine vector layout: `[force, dforce/dt]`.
    pub fn to_array(self) -> [f64; 2] {
        [self.force, self.force_derivative]
    }
}

// Session setup

/// Input/output directories handed to the engine when a session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoConfig {
    /// Directory holding the engine's project input files
    pub input_dir: PathBuf,
    /// Directory receiving engine results
    pub output_dir: PathBuf,
    /// Whether existing results may be overwritten
    #[serde(default)]
    pub overwrite: bool,
}

impl Default for IoConfig {
    fn default() -> Self {
        IoConfig {
            input_dir: PathBuf::from("./Inputs"),
            output_dir: PathBuf::from("./Results"),
            overwrite: true,
        }
    }
}

impl IoConfig {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        IoConfig {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            overwrite: false,
        }
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Render as the engine's command-line argument string.
    pub fn to_args(&self) -> String {
        format!(
            "-i {} -o {} -overwrite {}",
            self.input_dir.display(),
            self.output_dir.display(),
            if self.overwrite { "on" } else { "off" }
        )
    }
}

/// Two engine-defined switches passed through verbatim at session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFlags(pub [bool; 2]);

impl Default for SessionFlags {
    fn default() -> Self {
        SessionFlags([false, true])
    }
}

/// Scalar written through [`Engine::set_scalar`].
///
/// The engine API keeps separate integer and floating-point setters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Int(i32),
    Double(f64),
}

impl Scalar {
    pub fn as_f64(self) -> f64 {
        match self {
            Scalar::Int(v) => v as f64,
            Scalar::Double(v) => v,
        }
    }
}

/// One entry of a session's object inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub name: String,
    /// Engine type name, e.g. `RigidBody`
    pub kind: String,
}

/// Split a comma-separated engine list.
///
/// Engine lists end with a separator, so the empty element after it is
/// dropped. Empty entries inside the list are kept, which keeps parallel
/// lists such as names and types aligned by index.
pub fn split_engine_list(raw: &str) -> Vec<String> {
    let mut items: Vec<String> = raw.split(',').map(String::from).collect();
    if items.last().is_some_and(|last| last.is_empty()) {
        items.pop();
    }
    items
}

/// Join items into the engine's list format (trailing separator included).
pub fn join_engine_list<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items.into_iter().fold(String::new(), |mut out, item| {
        out.push_str(item.as_ref());
        out.push(',');
        out
    })
}

// Engine call contract

/// Call contract of an external simulation engine.
///
/// Every call blocks until the engine has finished and is addressed to a
/// named session. Simulated time only moves inside [`Engine::step_session`].
pub trait Engine {
    /// Start a session. `Ok(false)` means the engine declined; the reason may
    /// be available from [`Engine::error_message`].
    fn start_session(
        &mut self,
        name: &str,
        io: &IoConfig,
        flags: SessionFlags,
    ) -> Result<bool, EngineError>;

    /// Integrate the session forward by `duration` seconds.
    fn step_session(&mut self, name: &str, duration: f64) -> Result<(), EngineError>;

    /// Read a list-valued property as a comma-separated string.
    fn query_string(
        &mut self,
        name: &str,
        property: Property,
        filter: &str,
    ) -> Result<String, EngineError>;

    /// Read `len` values of a vector property of `target`.
    fn query_vector(
        &mut self,
        name: &str,
        property: Property,
        target: &str,
        len: usize,
    ) -> Result<Vec<f64>, EngineError>;

    fn set_scalar(
        &mut self,
        name: &str,
        property: Property,
        target: &str,
        value: Scalar,
    ) -> Result<(), EngineError>;

    fn set_vector(
        &mut self,
        name: &str,
        property: Property,
        target: &str,
        values: &[f64],
    ) -> Result<(), EngineError>;

    /// Release the session and everything the engine holds for it.
    fn end_session(&mut self, name: &str) -> Result<(), EngineError>;

    /// Last error message the engine recorded for the session.
    fn error_message(&mut self, _name: &str) -> Option<String> {
        None
    }
}
