//! JSON recipe description, as consumed by the command line tool.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Point, Result, Vector};

use super::grid::AnalysisGrid;
use super::parameters::RfluxmtxParameters;
use super::recipe::DaylightCoeffRecipe;
use super::scene::SceneFiles;
use super::sky::{SimulationKind, SkyDescriptor};
use super::window_group::{WindowGroup, WindowGroupState};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeConfig {
    #[serde(default = "default_name")]
    pub name: String,
    pub sky: SkyConfig,
    /// 0: illuminance, 1: radiation, 2: luminance.
    #[serde(default)]
    pub simulation_kind: u8,
    #[serde(default = "default_true")]
    pub reuse_matrix: bool,
    /// Emit the environment header in the script.
    #[serde(default = "default_true")]
    pub header: bool,
    #[serde(default)]
    pub radiance_path: Option<PathBuf>,
    #[serde(default)]
    pub parameters: RfluxmtxParameters,
    pub grids: Vec<GridConfig>,
    pub scene: SceneFiles,
    #[serde(default)]
    pub window_groups: Vec<WindowGroupConfig>,
}

fn default_name() -> String {
    "untitled".to_string()
}

fn default_true() -> bool {
    true
}

fn default_density() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SkyConfig {
    Epw {
        epw: PathBuf,
        #[serde(default = "default_density")]
        density: u32,
    },
    Uniform {
        /// Diffuse horizontal irradiance in W/m^2.
        uniform: f64,
        hoys: Vec<f64>,
        #[serde(default = "default_density")]
        density: u32,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GridConfig {
    File {
        name: String,
        points_file: PathBuf,
    },
    Inline {
        name: String,
        points: Vec<[f64; 3]>,
        #[serde(default)]
        vectors: Vec<[f64; 3]>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowGroupConfig {
    pub name: String,
    pub black_geometry: PathBuf,
    pub states: Vec<WindowGroupState>,
}

impl RecipeConfig {
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Builds a recipe, resolving relative paths against `base_dir`.
    pub fn into_recipe(self, base_dir: &Path) -> Result<DaylightCoeffRecipe> {
        let resolve = |p: &PathBuf| -> PathBuf {
            if p.is_absolute() {
                p.clone()
            } else {
                base_dir.join(p)
            }
        };
        let resolve_all = |paths: &[PathBuf]| -> Vec<PathBuf> { paths.iter().map(resolve).collect() };

        let simulation_kind = SimulationKind::try_from(self.simulation_kind)?;
        let sky = match &self.sky {
            SkyConfig::Epw { epw, density } => SkyDescriptor::from_epw(&resolve(epw), *density)?,
            SkyConfig::Uniform {
                uniform,
                hoys,
                density,
            } => SkyDescriptor::uniform(&self.name, *uniform, hoys.clone(), *density)?,
        };

        let grids = self
            .grids
            .iter()
            .map(|grid| match grid {
                GridConfig::File { name, points_file } => {
                    AnalysisGrid::from_points_file(name, &resolve(points_file))
                }
                GridConfig::Inline {
                    name,
                    points,
                    vectors,
                } => AnalysisGrid::from_points_and_vectors(
                    name,
                    points.iter().copied().map(Point::from).collect(),
                    vectors.iter().copied().map(Vector::from).collect(),
                ),
            })
            .collect::<Result<Vec<_>>>()?;

        let scene = SceneFiles {
            opaque: resolve_all(&self.scene.opaque),
            opaque_black: resolve_all(&self.scene.opaque_black),
            glazing: resolve_all(&self.scene.glazing),
            glazing_black: resolve_all(&self.scene.glazing_black),
            extra: resolve_all(&self.scene.extra),
        };

        let window_groups = self
            .window_groups
            .iter()
            .map(|wg| {
                let states = wg
                    .states
                    .iter()
                    .map(|s| WindowGroupState {
                        name: s.name.clone(),
                        geometry: resolve(&s.geometry),
                    })
                    .collect();
                WindowGroup::new(&wg.name, states, resolve(&wg.black_geometry))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut recipe = DaylightCoeffRecipe::configure(
            sky,
            grids,
            simulation_kind,
            self.parameters,
            self.reuse_matrix,
            window_groups,
            scene,
        )?;
        recipe.set_radiance_path(self.radiance_path);
        Ok(recipe)
    }
}
