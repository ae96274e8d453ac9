use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Geometry file references making up the static part of the scene.
///
/// The black variants replace every material with a non-reflective one and
/// are used for the direct-only passes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneFiles {
    pub opaque: Vec<PathBuf>,
    #[serde(default)]
    pub opaque_black: Vec<PathBuf>,
    #[serde(default)]
    pub glazing: Vec<PathBuf>,
    #[serde(default)]
    pub glazing_black: Vec<PathBuf>,
    /// Additional files added to every pass unchanged.
    #[serde(default)]
    pub extra: Vec<PathBuf>,
}

impl SceneFiles {
    pub fn new(opaque: Vec<PathBuf>) -> Self {
        Self {
            opaque,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.opaque.is_empty() {
            return Err(Error::Configuration(
                "scene has no opaque geometry".to_string(),
            ));
        }
        Ok(())
    }
}
