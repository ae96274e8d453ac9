//! Stage command builders.
//!
//! Each builder only looks at the values passed to it and returns the commands
//! of one stage together with the files those commands produce. The compiler
//! can therefore declare a stage's outputs without emitting its generation
//! commands, and later stages stay valid because they only refer to file names.

use crate::{Error, Result};

use super::command::Command;
use super::manifest::{SEGMENT_SEPARATOR, SourceState};
use super::parameters::RfluxmtxParameters;
use super::sky::{SimulationKind, SkyDescriptor, SkySource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageKind {
    Sky,
    /// Daylight coefficients of one `(source, state)` pair.
    DaylightCoeff(SourceState),
}

/// Commands of one stage plus the files they declare.
#[derive(Debug, Clone)]
pub struct Stage {
    pub kind: StageKind,
    /// Expensive commands producing reusable matrices.
    pub generation: Vec<Command>,
    /// Commands that always run, combining matrices with the sky.
    pub finishing: Vec<Command>,
    /// Files written by the generation commands.
    pub matrices: Vec<String>,
    /// Final result file, for daylight-coefficient stages.
    pub result: Option<String>,
    /// Set by the compiler when the generation commands were skipped.
    pub reused: bool,
}

impl Stage {
    /// Commands emitted into the script, honoring the reuse decision.
    pub fn commands(&self) -> Vec<Command> {
        let mut commands = Vec::new();
        if !self.reused {
            commands.extend(self.generation.iter().cloned());
        }
        commands.extend(self.finishing.iter().cloned());
        commands
    }

    pub fn is_daylight_coeff(&self) -> bool {
        matches!(self.kind, StageKind::DaylightCoeff(_))
    }
}

/// Sky matrices shared by every daylight-coefficient stage.
#[derive(Debug, Clone, PartialEq)]
pub struct SkyFiles {
    pub wea: String,
    pub total: String,
    pub direct: String,
    /// Direct sun only, at the sun receiver density.
    pub sun: String,
}

impl SkyFiles {
    pub fn for_sky(sky: &SkyDescriptor, sun_density: u32) -> Self {
        let fingerprint = sky.fingerprint();
        let spectrum = sky.simulation_kind().spectrum_label();
        let base = format!("sky/{}_{spectrum}", sky.name());
        Self {
            wea: format!("sky/{}_{fingerprint}.wea", sky.name()),
            total: format!("{base}_{}_{fingerprint}_total.smx", sky.density_label()),
            direct: format!("{base}_{}_{fingerprint}_direct.smx", sky.density_label()),
            sun: format!("{base}_r{sun_density}_{fingerprint}_sun.smx"),
        }
    }
}

/// Builds the sky generation stage.
///
/// For an EPW source the weather file is converted by `epw2wea`; a uniform sky
/// expects the `.wea` file to be written by the caller.
pub fn sky_stage(sky: &SkyDescriptor, sky_files: &SkyFiles, sun_density: u32) -> Result<Stage> {
    if sky.is_point_in_time() {
        return Err(Error::BuilderInput(format!(
            "sky '{}' is a single instant, a sky matrix is required",
            sky.name()
        )));
    }
    check_file_name(&sky_files.wea)?;
    check_file_name(&sky_files.total)?;
    check_file_name(&sky_files.direct)?;
    check_file_name(&sky_files.sun)?;

    let spectrum = sky.simulation_kind().spectrum_flag();
    let density = sky.density();
    let mut generation = vec![Command::comment(format!(
        "generating sky matrices for {} ({} time steps)",
        sky.name(),
        sky.hoys().len()
    ))];
    if let SkySource::Epw(epw) = sky.source() {
        let epw = epw.to_string_lossy();
        if epw.trim().is_empty() {
            return Err(Error::BuilderInput("empty weather file path".to_string()));
        }
        generation.push(Command::exec(format!(
            "epw2wea \"{epw}\" {}",
            sky_files.wea
        )));
    }
    generation.push(Command::exec(format!(
        "gendaymtx -m {density} {spectrum} {} > {}",
        sky_files.wea, sky_files.total
    )));
    generation.push(Command::exec(format!(
        "gendaymtx -m {density} -d {spectrum} {} > {}",
        sky_files.wea, sky_files.direct
    )));
    generation.push(Command::exec(format!(
        "gendaymtx -5 0.533 -d -m {sun_density} {spectrum} {} > {}",
        sky_files.wea, sky_files.sun
    )));

    Ok(Stage {
        kind: StageKind::Sky,
        generation,
        finishing: Vec::new(),
        matrices: vec![
            sky_files.total.clone(),
            sky_files.direct.clone(),
            sky_files.sun.clone(),
        ],
        result: None,
        reused: false,
    })
}

/// Inputs shared by every daylight-coefficient stage of one recipe.
#[derive(Debug, Clone)]
pub struct DaylightCoeffInputs<'a> {
    pub project_name: &'a str,
    pub sky_files: &'a SkyFiles,
    pub sky_receiver: &'a str,
    pub sun_receiver: &'a str,
    pub points_file: &'a str,
    pub point_count: usize,
    pub parameters: &'a RfluxmtxParameters,
    pub simulation_kind: SimulationKind,
    /// `1 + sum of window group states`, used for progress annotations.
    pub total_runs: usize,
}

/// Scene files of one pass: the full-bounce scene and the blacked scene used
/// for the direct passes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenePasses {
    pub normal: Vec<String>,
    pub black: Vec<String>,
}

/// Canonical project-relative scene files, as written by the compiler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneLayout {
    pub opaque: String,
    pub opaque_black: String,
    pub glazing: Option<String>,
    pub glazing_black: Option<String>,
    pub extra: Option<String>,
    pub window_groups: Vec<WindowGroupFiles>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowGroupFiles {
    pub name: String,
    pub black: String,
    /// One file per operable state, in state order.
    pub states: Vec<String>,
}

impl SceneLayout {
    /// Base case: glazing open, every window group blacked.
    pub fn base_passes(&self) -> ScenePasses {
        let blacked_groups: Vec<String> =
            self.window_groups.iter().map(|wg| wg.black.clone()).collect();

        let mut normal = vec![self.opaque.clone()];
        normal.extend(self.glazing.clone());
        normal.extend(blacked_groups.iter().cloned());
        normal.extend(self.extra.clone());

        let mut black = vec![self.opaque_black.clone()];
        black.extend(self.glazing.clone());
        black.extend(blacked_groups);
        black.extend(self.extra.clone());

        ScenePasses { normal, black }
    }

    /// Window group `group` in state `state`, glazing and other groups blacked.
    pub fn window_group_passes(&self, group: usize, state: usize) -> Option<ScenePasses> {
        let wg = self.window_groups.get(group)?;
        let state_file = wg.states.get(state)?.clone();
        let others: Vec<String> = self
            .window_groups
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != group)
            .map(|(_, other)| other.black.clone())
            .collect();

        let mut normal = vec![self.opaque.clone()];
        normal.extend(self.glazing_black.clone());
        normal.extend(others.iter().cloned());
        normal.push(state_file.clone());
        normal.extend(self.extra.clone());

        let mut black = vec![self.opaque_black.clone()];
        black.extend(self.glazing_black.clone());
        black.extend(others);
        black.push(state_file);
        black.extend(self.extra.clone());

        Some(ScenePasses { normal, black })
    }
}

/// Builds the daylight-coefficient stage of one `(source, state)` pair.
///
/// Generation: total sky, direct sky and direct sun coefficients.
/// Finishing: sky multiplication of each and `total - direct + sun`.
pub fn daylight_coeff_stage(
    inputs: &DaylightCoeffInputs,
    key: &SourceState,
    passes: &ScenePasses,
    run_index: usize,
) -> Result<Stage> {
    if inputs.point_count == 0 {
        return Err(Error::BuilderInput(format!(
            "no analysis points for {key}"
        )));
    }
    if passes.normal.is_empty() || passes.black.is_empty() {
        return Err(Error::BuilderInput(format!("no scene files for {key}")));
    }
    for name in [
        inputs.project_name,
        inputs.sky_receiver,
        inputs.sun_receiver,
        inputs.points_file,
        key.source.as_str(),
        key.state.as_str(),
    ] {
        check_file_name(name)?;
    }
    if key.source.contains(SEGMENT_SEPARATOR) || key.state.contains(SEGMENT_SEPARATOR) {
        return Err(Error::BuilderInput(format!(
            "'{SEGMENT_SEPARATOR}' is reserved in source and state names: {key}"
        )));
    }
    for name in passes.normal.iter().chain(&passes.black) {
        check_file_name(name)?;
    }

    let tag = key.file_tag();
    let matrix = |pass: &str, ext: &str| format!("result/matrix/{pass}{SEGMENT_SEPARATOR}{tag}.{ext}");
    let progress = format!("[{} of {}]", run_index, inputs.total_runs);
    let n = inputs.point_count;
    let pts = inputs.points_file;

    let total_args = inputs.parameters.to_args();
    let direct_args = inputs.parameters.with_bounces(1).to_args();
    let sun_args = inputs.parameters.with_bounces(0).to_args();
    let normal = passes.normal.join(" ");
    let black = passes.black.join(" ");

    let generation = vec![
        Command::comment(format!("{progress} daylight coefficients for {key}")),
        Command::exec(format!(
            "rfluxmtx {total_args} -y {n} - {} {normal} < {pts} > {}",
            inputs.sky_receiver,
            matrix("total", "dc")
        )),
        Command::exec(format!(
            "rfluxmtx {direct_args} -y {n} - {} {black} < {pts} > {}",
            inputs.sky_receiver,
            matrix("direct", "dc")
        )),
        Command::exec(format!(
            "rfluxmtx {sun_args} -y {n} - {} {black} < {pts} > {}",
            inputs.sun_receiver,
            matrix("sun", "dc")
        )),
    ];

    let sky = inputs.sky_files;
    let [r, g, b] = inputs.simulation_kind.rgb_coefficients();
    let coeffs = format!("-c {r} {g} {b}");
    let result = format!("result/{}{SEGMENT_SEPARATOR}{tag}.ill", inputs.project_name);
    let finishing = vec![
        Command::comment(format!("{progress} sky multiplication for {key}")),
        Command::exec(format!(
            "dctimestep {} {} > {}",
            matrix("total", "dc"),
            sky.total,
            matrix("total", "ill")
        )),
        Command::exec(format!(
            "dctimestep {} {} > {}",
            matrix("direct", "dc"),
            sky.direct,
            matrix("direct", "ill")
        )),
        Command::exec(format!(
            "dctimestep {} {} > {}",
            matrix("sun", "dc"),
            sky.sun,
            matrix("sun", "ill")
        )),
        Command::exec(format!(
            "rmtxop -fa {coeffs} {} + -s -1.0 {coeffs} {} + {coeffs} {} > {result}",
            matrix("total", "ill"),
            matrix("direct", "ill"),
            matrix("sun", "ill")
        )),
    ];

    Ok(Stage {
        kind: StageKind::DaylightCoeff(key.clone()),
        generation,
        finishing,
        matrices: vec![matrix("total", "dc"), matrix("direct", "dc"), matrix("sun", "dc")],
        result: Some(result),
        reused: false,
    })
}

/// Base-scene stage: the contribution with every window group blacked.
pub fn scene_stage(inputs: &DaylightCoeffInputs, layout: &SceneLayout) -> Result<Stage> {
    daylight_coeff_stage(inputs, &SourceState::base(), &layout.base_passes(), 1)
}

/// One stage per window group and state, in declaration order.
///
/// States are identified by their index within the group.
pub fn window_group_stages(inputs: &DaylightCoeffInputs, layout: &SceneLayout) -> Result<Vec<Stage>> {
    let mut stages = Vec::new();
    let mut run_index = 1;
    for (g, wg) in layout.window_groups.iter().enumerate() {
        for s in 0..wg.states.len() {
            run_index += 1;
            let passes = layout.window_group_passes(g, s).ok_or_else(|| {
                Error::BuilderInput(format!("missing state {s} of window group {}", wg.name))
            })?;
            let key = SourceState::new(&wg.name, &s.to_string());
            stages.push(daylight_coeff_stage(inputs, &key, &passes, run_index)?);
        }
    }
    Ok(stages)
}

fn check_file_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::BuilderInput("empty file name".to_string()));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(Error::BuilderInput(format!(
            "file name '{name}' contains whitespace"
        )));
    }
    Ok(())
}
