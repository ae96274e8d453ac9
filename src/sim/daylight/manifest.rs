//! Typed identity of every result file a compiled recipe declares.
//!
//! Result files are still named `<project>..<source>..<state>.ill` so they can
//! be recognized on disk, but the recipe carries the `(source, state)` pair as
//! data and never needs to recover it from the name.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result, UID};

use super::grid::{AnalysisGrid, read_points_file};

/// Separator between identity segments in generated file names.
pub const SEGMENT_SEPARATOR: &str = "..";

/// Source of light (base scene or a window group) and its operable state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceState {
    pub source: String,
    pub state: String,
}

impl SourceState {
    pub fn new(source: &str, state: &str) -> Self {
        Self {
            source: source.to_string(),
            state: state.to_string(),
        }
    }

    /// The base case: every window group blacked out.
    pub fn base() -> Self {
        Self::new("scene", "default")
    }

    /// `<source>..<state>`
    pub fn file_tag(&self) -> String {
        format!("{}{SEGMENT_SEPARATOR}{}", self.source, self.state)
    }
}

impl fmt::Display for SourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.source, self.state)
    }
}

/// A result file and the `(source, state)` pair it holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultFile {
    pub key: SourceState,
    pub path: PathBuf,
}

impl ResultFile {
    pub fn new(key: SourceState, path: PathBuf) -> Self {
        Self { key, path }
    }

    /// Recovers `(source, state)` from a `<...>..<source>..<state>.<ext>` name.
    pub fn from_path(path: &Path) -> Result<Self> {
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| Error::MalformedResultFile(path.to_path_buf()))?;
        let segments: Vec<&str> = stem.split(SEGMENT_SEPARATOR).collect();
        match segments.as_slice() {
            [.., source, state] if !source.is_empty() && !state.is_empty() => Ok(Self {
                key: SourceState::new(source, state),
                path: path.to_path_buf(),
            }),
            _ => Err(Error::MalformedResultFile(path.to_path_buf())),
        }
    }
}

/// Grid entry of a manifest: name and number of points in the points file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridEntry {
    pub name: String,
    pub uid: UID,
    pub point_count: usize,
}

/// Everything needed to merge results after the script has run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultManifest {
    pub project: String,
    pub project_dir: PathBuf,
    pub points_file: PathBuf,
    pub hoys: Vec<f64>,
    /// Grids in the order they were written to the points file.
    pub grids: Vec<GridEntry>,
    /// Base case first, then window groups and states in declaration order.
    pub results: Vec<ResultFile>,
}

impl ResultManifest {
    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Rebuilds the analysis grids from the points file, splitting its rows
    /// by the recorded point counts.
    pub fn load_grids(&self) -> Result<Vec<AnalysisGrid>> {
        let (points, vectors) = read_points_file(&self.points_file)?;
        let expected: usize = self.grids.iter().map(|g| g.point_count).sum();
        if points.len() != expected {
            return Err(Error::InvalidInput(format!(
                "{} has {} points, manifest lists {expected}",
                self.points_file.display(),
                points.len()
            )));
        }

        let mut points = points.into_iter();
        let mut vectors = vectors.into_iter();
        self.grids
            .iter()
            .map(|entry| {
                let mut grid = AnalysisGrid::from_points_and_vectors(
                    &entry.name,
                    points.by_ref().take(entry.point_count).collect(),
                    vectors.by_ref().take(entry.point_count).collect(),
                )?;
                grid.uid = entry.uid.clone();
                Ok(grid)
            })
            .collect()
    }
}
