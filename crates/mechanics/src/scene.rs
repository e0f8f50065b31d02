//! Scene description for the in-process piston engine.
//!
//! A scene lists the session's objects, the wave environment, and the
//! integration settings. It is read from `scene.json` in the session's input
//! directory, falling back to [`PistonScene::default`] when no file exists.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use simcore::integrators::{Integrator, RungeKutta4, SemiImplicitEuler};

use crate::error::SceneError;
use crate::joint::PrismaticJointConfig;
use crate::waves::WaveConfig;

/// Engine object type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    RigidBody,
    DCable,
}

impl ObjectKind {
    /// Type name reported in object inventories
    pub fn type_name(self) -> &'static str {
        match self {
            ObjectKind::RigidBody => "RigidBody",
            ObjectKind::DCable => "DCable",
        }
    }
}

/// One named object in a scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    pub kind: ObjectKind,
    /// Prismatic joint to the parent; bodies without one are not actuatable
    #[serde(default)]
    pub joint: Option<PrismaticJointConfig>,
}

impl SceneObject {
    pub fn rigid_body(name: &str) -> Self {
        SceneObject {
            name: name.to_string(),
            kind: ObjectKind::RigidBody,
            joint: None,
        }
    }

    pub fn jointed_body(name: &str, joint: PrismaticJointConfig) -> Self {
        SceneObject {
            name: name.to_string(),
            kind: ObjectKind::RigidBody,
            joint: Some(joint),
        }
    }

    pub fn cable(name: &str) -> Self {
        SceneObject {
            name: name.to_string(),
            kind: ObjectKind::DCable,
            joint: None,
        }
    }
}

/// Joint integration scheme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegratorKind {
    SemiImplicitEuler,
    #[default]
    RungeKutta4,
}

impl IntegratorKind {
    pub fn integrator(self) -> &'static dyn Integrator {
        match self {
            IntegratorKind::SemiImplicitEuler => &SemiImplicitEuler,
            IntegratorKind::RungeKutta4 => &RungeKutta4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PistonScene {
    pub objects: Vec<SceneObject>,
    pub waves: WaveConfig,
    pub integrator: IntegratorKind,
    /// Integration substeps per engine step
    pub substeps: u32,
}

impl Default for PistonScene {
    fn default() -> Self {
        PistonScene {
            objects: vec![
                SceneObject::rigid_body("buoy"),
                SceneObject::jointed_body("cylinder", PrismaticJointConfig::default()),
                SceneObject::cable("mooring"),
            ],
            waves: WaveConfig::default(),
            integrator: IntegratorKind::default(),
            substeps: 4,
        }
    }
}

impl PistonScene {
    /// Scene file name looked up in a session's input directory
    pub const FILE_NAME: &'static str = "scene.json";

    /// Empty scene, to be filled with [`PistonScene::with_object`]
    pub fn empty() -> Self {
        PistonScene {
            objects: Vec::new(),
            ..Default::default()
        }
    }

    pub fn with_object(mut self, object: SceneObject) -> Self {
        self.objects.push(object);
        self
    }

    pub fn with_waves(mut self, waves: WaveConfig) -> Self {
        self.waves = waves;
        self
    }

    pub fn with_integrator(mut self, integrator: IntegratorKind) -> Self {
        self.integrator = integrator;
        self
    }

    pub fn with_substeps(mut self, substeps: u32) -> Self {
        self.substeps = substeps;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, SceneError> {
        let scene: PistonScene = serde_json::from_str(json)?;
        scene.validate()?;
        Ok(scene)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, SceneError> {
        let json = fs::read_to_string(path).map_err(|source| SceneError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Load `scene.json` from `input_dir`, or the default scene if absent.
    pub fn load_or_default(input_dir: &Path) -> Result<Self, SceneError> {
        let path = input_dir.join(Self::FILE_NAME);
        if path.is_file() {
            log::debug!("Loading scene from {}", path.display());
            Self::from_json_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), SceneError> {
        if self.objects.is_empty() {
            return Err(SceneError::Empty);
        }
        if self.substeps == 0 {
            return Err(SceneError::NoSubsteps);
        }

        let mut seen = HashSet::new();
        for object in &self.objects {
            if object.name.trim().is_empty() || object.name.contains(',') {
                return Err(SceneError::InvalidName(object.name.clone()));
            }
            if !seen.insert(object.name.as_str()) {
                return Err(SceneError::DuplicateObject(object.name.clone()));
            }
            if let Some(joint) = &object.joint {
                joint.check().map_err(|reason| SceneError::InvalidJoint {
                    object: object.name.clone(),
                    reason,
                })?;
                if object.kind == ObjectKind::DCable {
                    return Err(SceneError::InvalidJoint {
                        object: object.name.clone(),
                        reason: "cables cannot carry a prismatic joint".to_string(),
                    });
                }
            }
        }

        self.waves.check().map_err(SceneError::InvalidWaves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scene_is_valid() {
        let scene = PistonScene::default();
        assert!(scene.validate().is_ok());
        let names: Vec<_> = scene.objects.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["buoy", "cylinder", "mooring"]);
    }

    #[test]
    fn test_parse_minimal_scene() {
        let json = r#"{
            "objects": [
                { "name": "cylinder", "kind": "RigidBody", "joint": { "mass": 500.0 } }
            ],
            "waves": { "wave_type": { "type": "calm" } },
            "integrator": "semi_implicit_euler"
        }"#;
        let scene = PistonScene::from_json_str(json).unwrap();

        assert_eq!(scene.objects.len(), 1);
        assert_eq!(scene.integrator, IntegratorKind::SemiImplicitEuler);
        assert_eq!(scene.substeps, 4);
        let joint = scene.objects[0].joint.as_ref().unwrap();
        assert!((joint.mass - 500.0).abs() < 1e-12);
        assert_eq!(joint.stiffness, 0.0);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let scene = PistonScene::empty()
            .with_object(SceneObject::rigid_body("a"))
            .with_object(SceneObject::cable("a"));
        assert!(matches!(scene.validate(), Err(SceneError::DuplicateObject(name)) if name == "a"));
    }

    #[test]
    fn test_separator_in_name_rejected() {
        let scene = PistonScene::empty().with_object(SceneObject::rigid_body("a,b"));
        assert!(matches!(scene.validate(), Err(SceneError::InvalidName(_))));
    }

    #[test]
    fn test_empty_and_substeps() {
        assert!(matches!(PistonScene::empty().validate(), Err(SceneError::Empty)));
        assert!(matches!(
            PistonScene::default().with_substeps(0).validate(),
            Err(SceneError::NoSubsteps)
        ));
    }

    #[test]
    fn test_bad_joint_reports_object() {
        let scene = PistonScene::empty()
            .with_object(SceneObject::jointed_body("cylinder", PrismaticJointConfig::free(-1.0)));
        match scene.validate() {
            Err(SceneError::InvalidJoint { object, .. }) => assert_eq!(object, "cylinder"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_falls_back_to_default() {
        let dir = std::env::temp_dir().join("mechanics-scene-missing");
        let scene = PistonScene::load_or_default(&dir).unwrap();
        assert_eq!(scene, PistonScene::default());
    }
}
