//! Scenario configuration.
//!
//! Defaults reproduce the reference joint-damping scenario: session `Sim1`
//! reading `./Inputs` and writing `./Results` with overwrite on, damping the
//! `cylinder` joint at 10000 N·s/m from 0 to 20 s in 1/60 s steps.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use simcore::{IoConfig, SessionFlags};

use crate::clock::ClockConfig;
use crate::damping::DampingModel;
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Engine session name
    pub session_name: String,
    pub io: IoConfig,
    pub flags: SessionFlags,
    /// Body whose joint is damped
    pub body_name: String,
    pub damping: DampingModel,
    pub clock: ClockConfig,
    /// Log the session's object inventory before the loop
    pub list_objects: bool,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            session_name: "Sim1".to_string(),
            io: IoConfig::default(),
            flags: SessionFlags::default(),
            body_name: "cylinder".to_string(),
            damping: DampingModel::default(),
            clock: ClockConfig::default(),
            list_objects: true,
        }
    }
}

impl ScenarioConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: ScenarioConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_session_name(mut self, name: &str) -> Self {
        self.session_name = name.to_string();
        self
    }

    pub fn with_io(mut self, io: IoConfig) -> Self {
        self.io = io;
        self
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body_name = body.to_string();
        self
    }

    /// Set damping coefficient (N·s/m)
    pub fn with_damping(mut self, coefficient: f64) -> Self {
        self.damping = DampingModel::new(coefficient);
        self
    }

    pub fn with_clock(mut self, clock: ClockConfig) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_end_time(mut self, end_time: f64) -> Self {
        self.clock.end_time = end_time;
        self
    }

    pub fn with_list_objects(mut self, list_objects: bool) -> Self {
        self.list_objects = list_objects;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_name.trim().is_empty() {
            return Err(ConfigError::EmptyField("session_name"));
        }
        if self.body_name.trim().is_empty() {
            return Err(ConfigError::EmptyField("body_name"));
        }
        if self.io.input_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyField("io.input_dir"));
        }
        if self.io.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyField("io.output_dir"));
        }
        if !self.damping.coefficient.is_finite() {
            return Err(ConfigError::InvalidDamping(self.damping.coefficient));
        }
        self.clock.build().map(|_| ())
    }
}
