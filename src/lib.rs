pub mod error;
pub mod geom;
pub mod name;
pub mod sim;
mod uid;

// Prelude
pub use error::{Error, Result};
pub use geom::point::Point;
pub use geom::vector::Vector;
pub use uid::UID;

pub use sim::daylight::{
    AnalysisGrid, CompiledRecipe, DaylightCoeffRecipe, RecipeConfig, RecipeState, ResultManifest,
    SceneFiles, SimulationKind, SkyDescriptor, SourceState, WindowGroup, WindowGroupState,
};
