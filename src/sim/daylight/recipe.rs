//! Grid-based daylight-coefficient recipe.
//!
//! The recipe turns a sky, analysis grids, scene geometry and window groups
//! into one ordered command script:
//!
//! 1. sky matrices, shared by every later stage and reused when present,
//! 2. the base scene with all window groups blacked,
//! 3. one stage per window group and operable state.
//!
//! Matrix reuse is decided per `(source, state)`, so a partially reused run is
//! normal. After the script has been run externally, [`DaylightCoeffRecipe::results`]
//! merges the produced files back onto the grids.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::name::{HasName, NameLookup};
use crate::{Error, Result};

use super::command::{Command, render_script};
use super::grid::AnalysisGrid;
use super::manifest::{GridEntry, ResultFile, ResultManifest};
use super::merge::merge_manifest;
use super::parameters::RfluxmtxParameters;
use super::project::{
    ProjectLayout, SUN_DENSITY, read_geometry, sky_receiver_content, uniform_wea_content,
    write_atomic,
};
use super::scene::SceneFiles;
use super::sky::{SimulationKind, SkyDescriptor, SkySource};
use super::stages::{
    DaylightCoeffInputs, SceneLayout, SkyFiles, Stage, StageKind, WindowGroupFiles, scene_stage,
    sky_stage, window_group_stages,
};
use super::window_group::WindowGroup;

/// Lifecycle of a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeState {
    Configured,
    Compiled,
    /// The script was run by the caller.
    Executed,
    ResultsLoaded,
}

/// Output of [`DaylightCoeffRecipe::compile`].
#[derive(Debug, Clone)]
pub struct CompiledRecipe {
    pub script_path: PathBuf,
    pub project_dir: PathBuf,
    /// Script lines in emission order, without the leading `@echo off`.
    pub commands: Vec<Command>,
    /// Sky stage first, then the base scene, then window group states.
    pub stages: Vec<Stage>,
    pub manifest: ResultManifest,
}

impl CompiledRecipe {
    pub fn daylight_coeff_stages(&self) -> impl Iterator<Item = &Stage> {
        self.stages.iter().filter(|s| s.is_daylight_coeff())
    }

    pub fn reused_stage_count(&self) -> usize {
        self.stages.iter().filter(|s| s.reused).count()
    }

    pub fn script(&self) -> String {
        render_script(&self.commands)
    }
}

/// A geometry file the compiler writes into the project.
struct GeometryWrite {
    target: String,
    content: String,
}

#[derive(Debug, Clone)]
pub struct DaylightCoeffRecipe {
    sky: SkyDescriptor,
    grids: Vec<AnalysisGrid>,
    window_groups: Vec<WindowGroup>,
    scene: SceneFiles,
    parameters: RfluxmtxParameters,
    reuse_matrix: bool,
    radiance_path: Option<PathBuf>,
    state: RecipeState,
    manifest: Option<ResultManifest>,
}

impl DaylightCoeffRecipe {
    /// Recipe with default parameters, no window groups and matrix reuse on.
    pub fn new(sky: SkyDescriptor, grids: Vec<AnalysisGrid>, scene: SceneFiles) -> Result<Self> {
        let kind = sky.simulation_kind();
        Self::configure(
            sky,
            grids,
            kind,
            RfluxmtxParameters::default(),
            true,
            Vec::new(),
            scene,
        )
    }

    /// Validates every input eagerly so an inconsistent recipe cannot exist.
    pub fn configure(
        sky: SkyDescriptor,
        grids: Vec<AnalysisGrid>,
        simulation_kind: SimulationKind,
        parameters: RfluxmtxParameters,
        reuse_matrix: bool,
        window_groups: Vec<WindowGroup>,
        scene: SceneFiles,
    ) -> Result<Self> {
        if grids.is_empty() {
            return Err(Error::Configuration(
                "recipe needs at least one analysis grid".to_string(),
            ));
        }
        if let Some(name) = grids.duplicate_name() {
            return Err(Error::Configuration(format!(
                "duplicate analysis grid name '{name}'"
            )));
        }
        scene.validate()?;

        let mut recipe = Self {
            sky: Self::check_sky(sky)?,
            grids,
            window_groups: Vec::new(),
            scene,
            parameters: RfluxmtxParameters::default(),
            reuse_matrix,
            radiance_path: None,
            state: RecipeState::Configured,
            manifest: None,
        };
        recipe.set_simulation_kind(simulation_kind)?;
        recipe.set_parameters(parameters)?;
        recipe.set_window_groups(window_groups)?;
        Ok(recipe)
    }

    /// Climate-based recipe from an EPW weather file.
    pub fn from_epw(
        epw: &Path,
        sky_density: u32,
        grids: Vec<AnalysisGrid>,
        scene: SceneFiles,
    ) -> Result<Self> {
        Self::new(SkyDescriptor::from_epw(epw, sky_density)?, grids, scene)
    }

    fn check_sky(sky: SkyDescriptor) -> Result<SkyDescriptor> {
        if sky.is_point_in_time() {
            return Err(Error::Configuration(format!(
                "sky '{}' for a daylight coefficient recipe must be a sky matrix",
                sky.name()
            )));
        }
        Ok(sky)
    }

    pub fn sky(&self) -> &SkyDescriptor {
        &self.sky
    }

    /// Replaces the sky, keeping the current simulation kind.
    pub fn set_sky(&mut self, sky: SkyDescriptor) -> Result<()> {
        let kind = self.simulation_kind();
        let mut sky = Self::check_sky(sky)?;
        sky.set_simulation_kind(kind)?;
        self.sky = sky;
        Ok(())
    }

    /// Read through the sky, which owns the value.
    pub fn simulation_kind(&self) -> SimulationKind {
        self.sky.simulation_kind()
    }

    pub fn set_simulation_kind(&mut self, kind: SimulationKind) -> Result<()> {
        self.sky.set_simulation_kind(kind)
    }

    /// 0: illuminance, 1: radiation, 2: luminance.
    pub fn set_simulation_kind_index(&mut self, value: u8) -> Result<()> {
        self.set_simulation_kind(SimulationKind::try_from(value)?)
    }

    pub fn parameters(&self) -> &RfluxmtxParameters {
        &self.parameters
    }

    pub fn set_parameters(&mut self, parameters: RfluxmtxParameters) -> Result<()> {
        parameters.validate()?;
        self.parameters = parameters;
        Ok(())
    }

    pub fn window_groups(&self) -> &[WindowGroup] {
        &self.window_groups
    }

    pub fn set_window_groups(&mut self, window_groups: Vec<WindowGroup>) -> Result<()> {
        if let Some(name) = window_groups.duplicate_name() {
            return Err(Error::Configuration(format!(
                "duplicate window group name '{name}'"
            )));
        }
        if let Some(wg) = window_groups.iter().find(|wg| wg.get_name() == "scene") {
            return Err(Error::Configuration(format!(
                "window group name '{}' is reserved for the base case",
                wg.name()
            )));
        }
        self.window_groups = window_groups;
        Ok(())
    }

    pub fn reuse_matrix(&self) -> bool {
        self.reuse_matrix
    }

    pub fn set_reuse_matrix(&mut self, reuse: bool) {
        self.reuse_matrix = reuse;
    }

    /// Radiance installation used in the script header (`bin/`, `lib/`).
    pub fn set_radiance_path(&mut self, path: Option<PathBuf>) {
        self.radiance_path = path;
    }

    pub fn grids(&self) -> &[AnalysisGrid] {
        &self.grids
    }

    pub fn grid(&self, name: &str) -> Option<&AnalysisGrid> {
        self.grids.find_by_name(name)
    }

    pub fn state(&self) -> RecipeState {
        self.state
    }

    /// Base case plus one run per window group state.
    pub fn total_runs_count(&self) -> usize {
        1 + self
            .window_groups
            .iter()
            .map(WindowGroup::state_count)
            .sum::<usize>()
    }

    pub fn total_point_count(&self) -> usize {
        self.grids.iter().map(AnalysisGrid::len).sum()
    }

    /// Writes the project under `<target>/<project_name>/` and returns the
    /// script and result manifest.
    ///
    /// Every command and file is prepared before the first write, so a failure
    /// leaves no partial project behind. Compiling again returns a fresh
    /// script; nothing accumulates between calls.
    pub fn compile(
        &mut self,
        target: &Path,
        project_name: &str,
        include_header: bool,
    ) -> Result<CompiledRecipe> {
        let layout = ProjectLayout::new(target, project_name)?;
        info!(
            "compiling daylight coefficient recipe '{}' ({} grids, {} runs)",
            project_name,
            self.grids.len(),
            self.total_runs_count()
        );

        let (scene_layout, geometry) = self.prepare_geometry(&layout)?;
        let points_file = layout.points_file();
        let points: Vec<String> = self
            .grids
            .iter()
            .flat_map(AnalysisGrid::to_points_lines)
            .collect();

        let mut commands = Vec::new();
        if include_header {
            commands.extend(self.header(&layout));
        }
        commands.push(Command::comment(format!(
            "scene: {} geometry files in scene/",
            geometry.len()
        )));
        commands.push(Command::comment(format!(
            "points: {} ({} points in {} grids)",
            points_file,
            points.len(),
            self.grids.len()
        )));

        // Sky matrices are shared by every stage and always reused.
        let sky_files = SkyFiles::for_sky(&self.sky, SUN_DENSITY);
        let mut sky = sky_stage(&self.sky, &sky_files, SUN_DENSITY)?;
        sky.reused = sky.matrices.iter().all(|m| layout.exists(m));

        let sky_receiver = layout.sky_receiver(self.sky.density());
        let sun_receiver = layout.sky_receiver(SUN_DENSITY);
        let inputs = DaylightCoeffInputs {
            project_name,
            sky_files: &sky_files,
            sky_receiver: &sky_receiver,
            sun_receiver: &sun_receiver,
            points_file: &points_file,
            point_count: points.len(),
            parameters: &self.parameters,
            simulation_kind: self.simulation_kind(),
            total_runs: self.total_runs_count(),
        };
        let mut stages = vec![sky, scene_stage(&inputs, &scene_layout)?];
        stages.extend(window_group_stages(&inputs, &scene_layout)?);

        let mut results = Vec::new();
        for stage in stages.iter_mut() {
            if let StageKind::DaylightCoeff(key) = &stage.kind {
                stage.reused =
                    self.reuse_matrix && stage.matrices.iter().all(|m| layout.exists(m));
                if let Some(result) = &stage.result {
                    results.push(ResultFile::new(key.clone(), layout.resolve(result)));
                }
            }
            if stage.reused {
                debug!("reusing {:?} matrices", stage.kind);
            } else {
                debug!("emitting {:?} with {} commands", stage.kind, stage.generation.len());
            }
            commands.extend(stage.commands());
        }

        let manifest = ResultManifest {
            project: project_name.to_string(),
            project_dir: layout.root().to_path_buf(),
            points_file: layout.resolve(&points_file),
            hoys: self.sky.hoys(),
            grids: self
                .grids
                .iter()
                .map(|g| GridEntry {
                    name: g.name().to_string(),
                    uid: g.uid.clone(),
                    point_count: g.len(),
                })
                .collect(),
            results,
        };

        // Everything is known; write the project.
        layout.create_dirs()?;
        for file in &geometry {
            layout.write(&file.target, &file.content)?;
        }
        layout.write(&points_file, &(points.join("\n") + "\n"))?;
        layout.write(&sky_receiver, &sky_receiver_content(self.sky.density()))?;
        layout.write(&sun_receiver, &sky_receiver_content(SUN_DENSITY))?;
        if let SkySource::Uniform { diffuse_horizontal } = self.sky.source() {
            let wea = uniform_wea_content(self.sky.name(), *diffuse_horizontal, &self.sky.hoys());
            layout.write(&sky_files.wea, &wea)?;
        }
        let script_path = layout.script_file();
        write_atomic(&script_path, &render_script(&commands))?;
        manifest.write(&layout.manifest_file())?;

        let compiled = CompiledRecipe {
            script_path,
            project_dir: layout.root().to_path_buf(),
            commands,
            stages,
            manifest: manifest.clone(),
        };
        info!(
            "wrote {} ({} stages, {} reused)",
            compiled.script_path.display(),
            compiled.stages.len(),
            compiled.reused_stage_count()
        );

        for grid in self.grids.iter_mut() {
            grid.clear_results();
        }
        self.manifest = Some(manifest);
        self.state = RecipeState::Compiled;
        Ok(compiled)
    }

    /// Records that the compiled script has been run.
    pub fn mark_executed(&mut self) -> Result<()> {
        if self.state != RecipeState::Compiled {
            return Err(Error::InvalidState(format!(
                "recipe can only be marked as executed after compile, current state is {:?}",
                self.state
            )));
        }
        self.state = RecipeState::Executed;
        Ok(())
    }

    /// Loads the results of an executed recipe onto its grids.
    pub fn results(&mut self) -> Result<&[AnalysisGrid]> {
        match (self.state, &self.manifest) {
            (RecipeState::ResultsLoaded, _) => Ok(&self.grids),
            (RecipeState::Executed, Some(manifest)) => {
                merge_manifest(&mut self.grids, &manifest.hoys, &manifest.results)?;
                info!("loaded {} result files", manifest.results.len());
                self.state = RecipeState::ResultsLoaded;
                Ok(&self.grids)
            }
            _ => Err(Error::InvalidState(
                "recipe has not been run; compile it, run the script and call mark_executed"
                    .to_string(),
            )),
        }
    }

    fn header(&self, layout: &ProjectLayout) -> Vec<Command> {
        let mut commands = vec![Command::comment(format!(
            "daylight coefficient recipe: {}",
            layout.name()
        ))];
        if let Some(radiance) = &self.radiance_path {
            commands.push(Command::exec(format!(
                "SET RAYPATH=.;{}",
                radiance.join("lib").display()
            )));
            commands.push(Command::exec(format!(
                "SET PATH={};%PATH%",
                radiance.join("bin").display()
            )));
        }
        commands.push(Command::exec(format!("cd /d \"{}\"", layout.root().display())));
        commands
    }

    /// Reads every referenced geometry file and maps it to its canonical name.
    fn prepare_geometry(&self, layout: &ProjectLayout) -> Result<(SceneLayout, Vec<GeometryWrite>)> {
        let mut writes = Vec::new();
        let mut add = |target: String, sources: &[PathBuf]| -> Result<String> {
            writes.push(GeometryWrite {
                target: target.clone(),
                content: read_geometry(sources)?,
            });
            Ok(target)
        };

        let opaque = add(layout.scene_file("opq"), &self.scene.opaque)?;
        let opaque_black = if self.scene.opaque_black.is_empty() {
            warn!("no black opaque geometry given, direct passes use the normal opaque files");
            opaque.clone()
        } else {
            add(layout.scene_file("opq_blk"), &self.scene.opaque_black)?
        };
        let glazing = if self.scene.glazing.is_empty() {
            None
        } else {
            Some(add(layout.scene_file("glz"), &self.scene.glazing)?)
        };
        let glazing_black = if !self.scene.glazing_black.is_empty() {
            Some(add(layout.scene_file("glz_blk"), &self.scene.glazing_black)?)
        } else if glazing.is_some() && !self.window_groups.is_empty() {
            warn!("no black glazing geometry given, window group passes keep glazing open");
            glazing.clone()
        } else {
            None
        };
        let extra = if self.scene.extra.is_empty() {
            None
        } else {
            Some(add(layout.scene_file("extra"), &self.scene.extra)?)
        };

        let mut window_groups = Vec::with_capacity(self.window_groups.len());
        for wg in &self.window_groups {
            let black = add(
                layout.window_group_file(wg.name(), "blk"),
                std::slice::from_ref(wg.black_geometry()),
            )?;
            let states = wg
                .states()
                .iter()
                .enumerate()
                .map(|(i, state)| {
                    add(
                        layout.window_group_file(wg.name(), &i.to_string()),
                        std::slice::from_ref(&state.geometry),
                    )
                })
                .collect::<Result<Vec<_>>>()?;
            window_groups.push(WindowGroupFiles {
                name: wg.name().to_string(),
                black,
                states,
            });
        }

        let scene_layout = SceneLayout {
            opaque,
            opaque_black,
            glazing,
            glazing_black,
            extra,
            window_groups,
        };
        Ok((scene_layout, writes))
    }
}
