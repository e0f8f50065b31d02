//! Engine property identifiers.
//!
//! Each variant corresponds to a member of the engine API's command enum.
//! [`Property::api_name`] gives the member name used by foreign bindings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Property addressed by an engine get/set call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Property {
    /// Full state vector of an object. For a prismatic joint body this is
    /// `[joint velocity, joint position]`.
    State,
    /// Current simulation time.
    Time,
    /// Whether the session is running (1.0 or 0.0).
    SimulationRunning,
    /// Number of objects in the session.
    NumberOfDObjects,
    /// Comma-separated object names.
    DObjectNames,
    /// Comma-separated object types, in the same order as the names.
    DObjectTypes,
    /// Engine version string.
    Version,
    /// Rigid body position.
    RigidBodyPosition,
    /// Rigid body state vector.
    RigidBodyState,
    /// Joint force and its time derivative, added to the force accumulator.
    RigidBodyJointForceAndDeriv,
    /// Clears the external force and moment accumulator.
    RigidBodyClearForcesMoments,
    /// Reference wave height (m).
    EnvironmentWaveReferenceHeight,
    /// Reference wave period (s).
    EnvironmentWaveReferencePeriod,
    /// Seed for irregular wave phases.
    EnvironmentWaveSeed,
}

impl Property {
    /// Every property, in declaration order.
    pub const ALL: [Property; 14] = [
        Property::State,
        Property::Time,
        Property::SimulationRunning,
        Property::NumberOfDObjects,
        Property::DObjectNames,
        Property::DObjectTypes,
        Property::Version,
        Property::RigidBodyPosition,
        Property::RigidBodyState,
        Property::RigidBodyJointForceAndDeriv,
        Property::RigidBodyClearForcesMoments,
        Property::EnvironmentWaveReferenceHeight,
        Property::EnvironmentWaveReferencePeriod,
        Property::EnvironmentWaveSeed,
    ];

    /// Member name in the engine API's command enum.
    pub fn api_name(self) -> &'static str {
        match self {
            Property::State => "state",
            Property::Time => "time",
            Property::SimulationRunning => "simulationRunning",
            Property::NumberOfDObjects => "numberOfDObjects",
            Property::DObjectNames => "dObjectNames",
            Property::DObjectTypes => "dObjectTypes",
            Property::Version => "version",
            Property::RigidBodyPosition => "rigidBodyPosition",
            Property::RigidBodyState => "rigidBodyState",
            Property::RigidBodyJointForceAndDeriv => "rigidBodyJointForceAndDeriv",
            Property::RigidBodyClearForcesMoments => "rigidBodyClearForcesMoments",
            Property::EnvironmentWaveReferenceHeight => "environmentWaveReferenceHeight",
            Property::EnvironmentWaveReferencePeriod => "environmentWaveReferencePeriod",
            Property::EnvironmentWaveSeed => "environmentWaveSeed",
        }
    }

    /// Look up a property by its API member name.
    pub fn from_api_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.api_name() == name)
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_name_lookup_is_inverse() {
        for property in Property::ALL {
            assert_eq!(Property::from_api_name(property.api_name()), Some(property));
        }
        assert_eq!(Property::from_api_name("noSuchCommand"), None);
    }

    #[test]
    fn test_serde_uses_api_names() {
        let json = serde_json::to_string(&Property::DObjectNames).unwrap();
        assert_eq!(json, "\"dObjectNames\"");

        let parsed: Property = serde_json::from_str("\"rigidBodyJointForceAndDeriv\"").unwrap();
        assert_eq!(parsed, Property::RigidBodyJointForceAndDeriv);
    }
}
