//! Daylight-coefficient recipes driven by the Radiance command line tools.
//!
//! A [`DaylightCoeffRecipe`] compiles to a project directory and a command
//! script. The script is run outside this crate; afterwards the result files
//! listed in the [`ResultManifest`] are merged back onto the analysis grids.

pub mod command;
pub mod config;
pub mod grid;
pub mod manifest;
pub mod merge;
pub mod parameters;
pub mod project;
pub mod recipe;
pub mod scene;
pub mod sky;
pub mod stages;
pub mod weather;
pub mod window_group;

pub use command::Command;
pub use config::RecipeConfig;
pub use grid::{AnalysisGrid, read_points_file};
pub use manifest::{ResultFile, ResultManifest, SourceState};
pub use merge::{GridSummary, merge, merge_manifest, summarize};
pub use parameters::RfluxmtxParameters;
pub use recipe::{CompiledRecipe, DaylightCoeffRecipe, RecipeState};
pub use scene::SceneFiles;
pub use sky::{SimulationKind, SkyDescriptor, SkySource, SkySpan};
pub use stages::{Stage, StageKind};
pub use window_group::{WindowGroup, WindowGroupState};
