use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating a piston scene.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("Failed to read scene file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse scene: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Scene contains no objects")]
    Empty,

    #[error("Duplicate object name: {0}")]
    DuplicateObject(String),

    /// Names must be non-empty and free of the engine list separator.
    #[error("Invalid object name: '{0}'")]
    InvalidName(String),

    #[error("Invalid joint on '{object}': {reason}")]
    InvalidJoint { object: String, reason: String },

    #[error("Invalid wave settings: {0}")]
    InvalidWaves(String),

    #[error("Scene needs at least one substep per engine step")]
    NoSubsteps,
}
