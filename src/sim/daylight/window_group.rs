use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::name::HasName;

use super::project::is_plain_name;
use crate::{Error, Result};

/// One operable state of a window group, e.g. a blind position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowGroupState {
    pub name: String,
    /// Geometry and materials of the group in this state.
    pub geometry: PathBuf,
}

/// Glazing surfaces that share an operable state and are simulated together.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowGroup {
    name: String,
    states: Vec<WindowGroupState>,
    /// Blacked-out geometry used while another source is being isolated.
    black_geometry: PathBuf,
}

impl WindowGroup {
    pub fn new(name: &str, states: Vec<WindowGroupState>, black_geometry: PathBuf) -> Result<Self> {
        if !is_plain_name(name) {
            return Err(Error::Configuration(format!(
                "invalid window group name '{name}'"
            )));
        }
        if states.is_empty() {
            return Err(Error::Configuration(format!(
                "window group '{name}' has no states"
            )));
        }
        Ok(Self {
            name: name.to_string(),
            states,
            black_geometry,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn states(&self) -> &[WindowGroupState] {
        &self.states
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn black_geometry(&self) -> &PathBuf {
        &self.black_geometry
    }
}

impl HasName for WindowGroup {
    fn get_name(&self) -> &str {
        &self.name
    }
}
