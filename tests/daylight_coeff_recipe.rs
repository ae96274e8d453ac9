use daylight_recipe::sim::daylight::{
    RecipeConfig, RfluxmtxParameters, merge, merge_manifest, summarize,
};
use daylight_recipe::{
    AnalysisGrid, CompiledRecipe, DaylightCoeffRecipe, Error, Point, RecipeState, ResultManifest,
    SceneFiles, SimulationKind, SkyDescriptor, SourceState, WindowGroup, WindowGroupState,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn write_rad(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(
        &path,
        format!("void plastic {name}\n0\n0\n5 0.5 0.5 0.5 0 0\n"),
    )
    .unwrap();
    path
}

fn office_scene(dir: &Path) -> SceneFiles {
    SceneFiles {
        opaque: vec![write_rad(dir, "walls.rad"), write_rad(dir, "floor.rad")],
        opaque_black: vec![write_rad(dir, "walls_blk.rad")],
        glazing: vec![write_rad(dir, "glass.rad")],
        glazing_black: vec![write_rad(dir, "glass_blk.rad")],
        extra: vec![write_rad(dir, "furniture.rad")],
    }
}

fn window_group(dir: &Path, name: &str, states: &[&str]) -> WindowGroup {
    let states = states
        .iter()
        .map(|state| WindowGroupState {
            name: state.to_string(),
            geometry: write_rad(dir, &format!("{name}_{state}.rad")),
        })
        .collect();
    WindowGroup::new(name, states, write_rad(dir, &format!("{name}_blk.rad"))).unwrap()
}

fn grid(name: &str, n: usize, z: f64) -> AnalysisGrid {
    let points = (0..n)
        .map(|i| Point::new(0.5 + i as f64, 1.0, z))
        .collect();
    AnalysisGrid::new(name, points).unwrap()
}

fn epw(dir: &Path, hours: &[(u8, u8, u8)]) -> PathBuf {
    let mut content = String::from(
        "LOCATION,Berlin,BE,DEU,IWEC,103840,52.47,13.40,1.0,49.0\n\
         DESIGN CONDITIONS,0\n\
         TYPICAL/EXTREME PERIODS,0\n\
         GROUND TEMPERATURES,0\n\
         HOLIDAYS/DAYLIGHT SAVINGS,No,0,0,0\n\
         COMMENTS 1,\n\
         COMMENTS 2,\n\
         DATA PERIODS,1,1,Data,Sunday,1/1,12/31\n",
    );
    for (month, day, hour) in hours {
        content.push_str(&format!(
            "1999,{month},{day},{hour},60,*,2.0,1.0,80,101300,0,0,0,0,410,95,0,0,0,0,200,2.5,0,0,0,0,0,0,0,0,0,0,0,0,0\n"
        ));
    }
    let path = dir.join("berlin.epw");
    fs::write(&path, content).unwrap();
    path
}

/// Stands in for running the script: writes one result file per manifest
/// entry with a Radiance header and `value(row, column)` data.
fn fake_run(compiled: &CompiledRecipe, value: impl Fn(usize, usize, usize) -> f64) {
    let manifest = &compiled.manifest;
    let rows: usize = manifest.grids.iter().map(|g| g.point_count).sum();
    for (f, result) in manifest.results.iter().enumerate() {
        let mut content = format!(
            "#?RADIANCE\nrmtxop -fa\nNROWS={rows}\nNCOLS={}\nNCOMP=1\nFORMAT=ascii\n\n",
            manifest.hoys.len()
        );
        for r in 0..rows {
            let row: Vec<String> = (0..manifest.hoys.len())
                .map(|c| value(f, r, c).to_string())
                .collect();
            content.push_str(&row.join("\t"));
            content.push('\n');
        }
        fs::write(&result.path, content).unwrap();
    }
}

#[test]
fn test_window_groups_multiply_runs() {
    let dir = tempdir().unwrap();
    let sky = SkyDescriptor::uniform("cie_overcast", 120.0, vec![9.0, 10.0, 11.0, 12.0], 2).unwrap();
    let mut recipe = DaylightCoeffRecipe::configure(
        sky,
        vec![grid("desk", 3, 0.75)],
        SimulationKind::Illuminance,
        RfluxmtxParameters::default(),
        true,
        vec![
            window_group(dir.path(), "south", &["open", "half", "closed"]),
            window_group(dir.path(), "east", &["open", "closed"]),
        ],
        office_scene(dir.path()),
    )
    .unwrap();
    assert_eq!(recipe.total_runs_count(), 6);

    let compiled = recipe.compile(&dir.path().join("out"), "office", true).unwrap();
    assert_eq!(compiled.daylight_coeff_stages().count(), 6);

    let keys: Vec<SourceState> = compiled
        .manifest
        .results
        .iter()
        .map(|r| r.key.clone())
        .collect();
    assert_eq!(keys[0], SourceState::base());
    assert_eq!(keys[1], SourceState::new("south", "0"));
    assert_eq!(keys[5], SourceState::new("east", "1"));

    let script = fs::read_to_string(&compiled.script_path).unwrap();
    assert!(script.contains("[6 of 6]"));
    assert!(script.contains("gendaymtx -m 2 -O0"));
    assert!(script.contains("rfluxSky_r2.rad"));
    assert!(script.contains("rfluxSky_r6.rad"));
    assert_eq!(script.lines().filter(|l| l.starts_with("rmtxop")).count(), 6);

    let project = dir.path().join("out/office");
    assert!(project.join("sky/rfluxSky_r2.rad").is_file());
    assert!(project.join("scene/office..extra.rad").is_file());
    let opaque = fs::read_to_string(project.join("scene/office..opq.rad")).unwrap();
    assert!(opaque.contains("walls.rad") && opaque.contains("floor.rad"));
    assert!(project.join("result/manifest.json").is_file());
}

#[test]
fn test_script_layout() {
    let dir = tempdir().unwrap();
    let sky = SkyDescriptor::uniform("overcast", 100.0, vec![12.0], 1).unwrap();
    let mut recipe =
        DaylightCoeffRecipe::new(sky, vec![grid("g", 2, 0.8)], office_scene(dir.path())).unwrap();
    let compiled = recipe.compile(dir.path(), "office", true).unwrap();
    let script = compiled.script();

    let mut lines = script.lines();
    assert_eq!(lines.next(), Some("@echo off"));
    assert!(script.lines().any(|l| l.starts_with("cd /d")));
    for line in script.lines().skip(1) {
        assert!(!line.starts_with("::"), "comment not echoed: {line}");
    }
    assert!(script.contains("echo :: [1 of 1] daylight coefficients for scene::default"));
    assert_eq!(fs::read_to_string(&compiled.script_path).unwrap(), script);

    let compiled = recipe.compile(dir.path(), "office", false).unwrap();
    assert!(!compiled.script().contains("cd /d"));
}

#[test]
fn test_existing_matrices_are_reused() {
    let dir = tempdir().unwrap();
    let sky = SkyDescriptor::uniform("overcast", 100.0, vec![12.0], 1).unwrap();
    let mut recipe =
        DaylightCoeffRecipe::new(sky, vec![grid("g", 2, 0.8)], office_scene(dir.path())).unwrap();
    let first = recipe.compile(dir.path(), "office", false).unwrap();
    assert_eq!(first.reused_stage_count(), 0);

    for stage in &first.stages {
        for matrix in &stage.matrices {
            fs::write(first.project_dir.join(matrix), "").unwrap();
        }
    }

    let second = recipe.compile(dir.path(), "office", false).unwrap();
    assert_eq!(second.reused_stage_count(), 2);
    let script = second.script();
    assert!(!script.contains("rfluxmtx"));
    assert!(!script.contains("gendaymtx"));
    assert!(script.contains("dctimestep"));
    assert!(script.contains("rmtxop"));
    // Outputs are still declared for reused stages.
    assert_eq!(second.manifest.results, first.manifest.results);

    recipe.set_reuse_matrix(false);
    let third = recipe.compile(dir.path(), "office", false).unwrap();
    assert_eq!(third.script().matches("rfluxmtx").count(), 3);
    // Sky matrices do not depend on the reuse flag.
    assert!(!third.script().contains("gendaymtx"));
}

#[test]
fn test_radiation_needs_climate_sky() {
    let dir = tempdir().unwrap();
    let uniform = SkyDescriptor::uniform("overcast", 100.0, vec![12.0], 1).unwrap();
    let err = DaylightCoeffRecipe::configure(
        uniform,
        vec![grid("g", 2, 0.8)],
        SimulationKind::Radiation,
        RfluxmtxParameters::default(),
        true,
        Vec::new(),
        office_scene(dir.path()),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));

    let path = epw(dir.path(), &[(6, 21, 10), (6, 21, 11), (6, 21, 12)]);
    let mut recipe = DaylightCoeffRecipe::from_epw(
        &path,
        1,
        vec![grid("g", 2, 0.8)],
        office_scene(dir.path()),
    )
    .unwrap();
    recipe.set_simulation_kind(SimulationKind::Radiation).unwrap();
    assert_eq!(recipe.sky().simulation_kind(), SimulationKind::Radiation);

    let script = recipe.compile(dir.path(), "solar", true).unwrap().script();
    assert!(script.contains("epw2wea"));
    assert!(script.contains("gendaymtx -m 1 -O1"));
    assert!(script.contains("rmtxop -fa -c 0.265 0.67 0.065"));
}

#[test]
fn test_results_before_run() {
    let dir = tempdir().unwrap();
    let sky = SkyDescriptor::uniform("overcast", 100.0, vec![12.0], 1).unwrap();
    let mut recipe =
        DaylightCoeffRecipe::new(sky, vec![grid("g", 2, 0.8)], office_scene(dir.path())).unwrap();
    assert_eq!(recipe.state(), RecipeState::Configured);
    let err = recipe.results().unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
    assert!(err.to_string().contains("has not been run"));
}

#[test]
fn test_compile_run_and_merge() {
    let dir = tempdir().unwrap();
    let hoys = vec![8.0, 9.0, 10.0, 11.0, 12.0];
    let sky = SkyDescriptor::uniform("overcast", 100.0, hoys.clone(), 1).unwrap();
    let grids = vec![grid("desk", 3, 0.75), grid("floor", 4, 0.0)];
    let mut recipe = DaylightCoeffRecipe::new(sky, grids, office_scene(dir.path())).unwrap();
    recipe
        .set_window_groups(vec![window_group(dir.path(), "south", &["open", "closed"])])
        .unwrap();

    let compiled = recipe.compile(dir.path(), "office", true).unwrap();
    fake_run(&compiled, |f, r, c| (f * 1000 + r * 10 + c) as f64);
    recipe.mark_executed().unwrap();

    let grids = recipe.results().unwrap();
    // 3 (source, state) pairs with N points by T time steps each.
    assert_eq!(grids[0].result_count(), 3 * 3 * hoys.len());
    assert_eq!(grids[1].result_count(), 3 * 4 * hoys.len());
    // The second grid starts at row 3 of every file.
    assert_eq!(grids[1].value(0, 8.0, "scene", "default"), Some(30.0));
    assert_eq!(grids[1].value(2, 10.0, "south", "1"), Some(2052.0));
    assert_eq!(grids[0].values_at(12.0, "south", "0"), Some(vec![1004.0, 1014.0, 1024.0]));
    assert_eq!(recipe.state(), RecipeState::ResultsLoaded);

    // A later process can merge from the manifest on disk.
    let manifest = ResultManifest::read(&compiled.project_dir.join("result/manifest.json")).unwrap();
    let mut fresh = manifest.load_grids().unwrap();
    merge_manifest(&mut fresh, &manifest.hoys, &manifest.results).unwrap();
    assert_eq!(fresh[1].value(2, 10.0, "south", "1"), Some(2052.0));
    assert_eq!(fresh[0].uid, recipe.grids()[0].uid);
    assert_eq!(fresh[1].uid, recipe.grids()[1].uid);

    let summary = summarize(&fresh);
    assert_eq!(summary.len(), 2);
    assert_eq!(summary[1].uid, fresh[1].uid.as_str());
    assert_eq!(summary[0].sources.len(), 3);

    // Recompiling discards loaded results.
    recipe.compile(dir.path(), "office", true).unwrap();
    assert_eq!(recipe.state(), RecipeState::Compiled);
    assert_eq!(recipe.grids()[0].result_count(), 0);
}

#[test]
fn test_merge_shape_mismatch() {
    let dir = tempdir().unwrap();
    let sky = SkyDescriptor::uniform("overcast", 100.0, vec![12.0, 13.0], 1).unwrap();
    let mut recipe =
        DaylightCoeffRecipe::new(sky, vec![grid("g", 2, 0.8)], office_scene(dir.path())).unwrap();
    let compiled = recipe.compile(dir.path(), "office", true).unwrap();

    fs::write(&compiled.manifest.results[0].path, "1 2\n3 4\n5 6\n").unwrap();
    recipe.mark_executed().unwrap();
    let err = recipe.results().unwrap_err();
    assert!(matches!(err, Error::ResultShapeMismatch { .. }));
    assert_eq!(recipe.state(), RecipeState::Executed);

    let mut grids = vec![grid("g", 2, 0.8)];
    let err = merge(&mut grids, &[12.0], &[dir.path().join("no_identity.ill")]).unwrap_err();
    assert!(matches!(err, Error::MalformedResultFile(_)));
}

#[test]
fn test_recipe_from_config_file() {
    let dir = tempdir().unwrap();
    office_scene(dir.path());
    window_group(dir.path(), "south", &["open"]);
    fs::write(dir.path().join("desk.pts"), "0 0 0.75\n1 0 0.75\n").unwrap();
    let config = r#"{
        "name": "studio",
        "sky": { "uniform": 80.0, "hoys": [10, 11], "density": 1 },
        "reuse_matrix": false,
        "grids": [
            { "name": "desk", "points_file": "desk.pts" },
            { "name": "wall", "points": [[0, 2, 1.5]], "vectors": [[0, -1, 0]] }
        ],
        "scene": { "opaque": ["walls.rad"], "glazing": ["glass.rad"] },
        "window_groups": [ {
            "name": "south",
            "black_geometry": "south_blk.rad",
            "states": [ { "name": "open", "geometry": "south_open.rad" } ]
        } ]
    }"#;
    let config_path = dir.path().join("studio.json");
    fs::write(&config_path, config).unwrap();

    let config = RecipeConfig::read(&config_path).unwrap();
    let name = config.name.clone();
    let mut recipe = config.into_recipe(dir.path()).unwrap();
    assert_eq!(recipe.total_point_count(), 3);
    assert!(!recipe.reuse_matrix());

    let compiled = recipe.compile(&dir.path().join("out"), &name, true).unwrap();
    assert_eq!(compiled.daylight_coeff_stages().count(), 2);
    let points = fs::read_to_string(compiled.project_dir.join("studio.pts")).unwrap();
    assert_eq!(points.lines().count(), 3);
    assert_eq!(points.lines().last(), Some("0 2 1.5 0 -1 0"));
}

#[test]
fn test_window_group_with_path_name_never_reaches_disk() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("out");
    let black = write_rad(dir.path(), "blk.rad");
    let state = WindowGroupState {
        name: "open".to_string(),
        geometry: write_rad(dir.path(), "open.rad"),
    };

    for name in ["a/b", "a\\b", "south east"] {
        let err = WindowGroup::new(name, vec![state.clone()], black.clone()).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)), "{name:?}");
    }

    let config = r#"{
        "sky": { "uniform": 100.0, "hoys": [12] },
        "grids": [ { "name": "g", "points": [[0, 0, 0.8]] } ],
        "scene": { "opaque": ["walls.rad"] },
        "window_groups": [ {
            "name": "a/b",
            "black_geometry": "blk.rad",
            "states": [ { "name": "open", "geometry": "open.rad" } ]
        } ]
    }"#;
    write_rad(dir.path(), "walls.rad");
    let config_path = dir.path().join("bad.json");
    fs::write(&config_path, config).unwrap();
    let err = RecipeConfig::read(&config_path)
        .unwrap()
        .into_recipe(dir.path())
        .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
    assert!(!target.exists());
}
