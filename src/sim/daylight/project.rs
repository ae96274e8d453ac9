//! On-disk layout of a compiled project and the file writes it needs.
//!
//! Every path handed to a stage builder is relative to the project directory,
//! because the generated script changes into that directory before running.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::{Error, Result};

use super::manifest::SEGMENT_SEPARATOR;
use super::weather::date_from_hoy;

/// Density of the sky receiver used for the direct sun pass.
pub const SUN_DENSITY: u32 = 6;

/// Subfolders created under `<target>/<project>/`.
pub const SUBFOLDERS: [&str; 6] = ["scene", "scene/wgroup", "sky", "tmp", "result", "result/matrix"];

/// `<target>/<project>/` and the canonical names inside it.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    name: String,
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(target: &Path, name: &str) -> Result<Self> {
        if !is_plain_name(name) {
            return Err(Error::InvalidInput(format!("invalid project name '{name}'")));
        }
        Ok(Self {
            name: name.to_string(),
            root: target.join(name),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a project-relative name.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.resolve(relative).is_file()
    }

    pub fn points_file(&self) -> String {
        format!("{}.pts", self.name)
    }

    pub fn script_file(&self) -> PathBuf {
        self.root.join("commands.bat")
    }

    pub fn manifest_file(&self) -> PathBuf {
        self.root.join("result").join("manifest.json")
    }

    /// `scene/<project>..<suffix>.rad`
    pub fn scene_file(&self, suffix: &str) -> String {
        format!("scene/{}{SEGMENT_SEPARATOR}{suffix}.rad", self.name)
    }

    /// `scene/wgroup/<group>..<suffix>.rad`
    pub fn window_group_file(&self, group: &str, suffix: &str) -> String {
        format!("scene/wgroup/{group}{SEGMENT_SEPARATOR}{suffix}.rad")
    }

    /// `sky/rfluxSky_r<density>.rad`
    pub fn sky_receiver(&self, density: u32) -> String {
        format!("sky/rfluxSky_r{density}.rad")
    }

    pub fn create_dirs(&self) -> Result<()> {
        for sub in SUBFOLDERS {
            let dir = self.root.join(sub);
            fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        }
        Ok(())
    }

    /// Writes a project-relative file atomically.
    pub fn write(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.resolve(relative);
        write_atomic(&path, content)?;
        Ok(path)
    }
}

/// Names used as a single file name segment: non-empty, no whitespace, no
/// path separators and no `..`.
pub fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains(SEGMENT_SEPARATOR)
        && !name.chars().any(|c| c.is_whitespace() || c == '/' || c == '\\')
}

/// Writes into a temporary file next to `path` and renames it into place.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
    tmp.write_all(content.as_bytes())
        .map_err(|e| Error::io(path, e))?;
    tmp.persist(path).map_err(|e| Error::io(path, e.error))?;
    Ok(())
}

/// Concatenates geometry files into one string, in the given order.
pub fn read_geometry(sources: &[PathBuf]) -> Result<String> {
    let mut content = String::new();
    for source in sources {
        let text = fs::read_to_string(source).map_err(|e| {
            Error::InvalidInput(format!(
                "couldn't read geometry file {}: {e}",
                source.display()
            ))
        })?;
        content.push_str(&text);
        if !text.ends_with('\n') {
            content.push('\n');
        }
    }
    Ok(content)
}

/// Sky and ground receiver hemispheres for `rfluxmtx`.
pub fn sky_receiver_content(density: u32) -> String {
    format!(
        "#@rfluxmtx h=u u=Y\n\
         void glow ground_glow\n0\n0\n4 1 1 1 0\n\n\
         ground_glow source ground\n0\n0\n4 0 0 -1 180\n\n\
         #@rfluxmtx h=r{density} u=Y\n\
         void glow sky_glow\n0\n0\n4 1 1 1 0\n\n\
         sky_glow source sky\n0\n0\n4 0 0 1 180\n"
    )
}

/// `.wea` weather data with a constant diffuse sky and no direct sun.
pub fn uniform_wea_content(place: &str, diffuse_horizontal: f64, hoys: &[f64]) -> String {
    let mut content = format!(
        "place {place}\nlatitude 0.0\nlongitude 0.0\ntime_zone 0.0\nsite_elevation 0.0\nweather_data_file_units 1\n"
    );
    for hoy in hoys {
        let (month, day, hour) = date_from_hoy(*hoy);
        content.push_str(&format!("{month} {day} {hour:.3} 0 {diffuse_horizontal}\n"));
    }
    content
}
