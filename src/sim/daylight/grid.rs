use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::name::HasName;
use crate::{Error, Point, Result, UID, Vector};

use super::manifest::SourceState;

/// Ordered analysis points plus the per-time-step results attached to them.
///
/// Results are stored per `(source, state)` as a `[point][time step]` table.
/// The point set is fixed at construction.
#[derive(Debug, Clone)]
pub struct AnalysisGrid {
    pub uid: UID,
    name: String,
    points: Vec<Point>,
    vectors: Vec<Vector>,
    hoys: Vec<f64>,
    results: HashMap<SourceState, Vec<Vec<f64>>>,
}

impl AnalysisGrid {
    /// Creates a grid where every point faces up.
    pub fn new(name: &str, points: Vec<Point>) -> Result<Self> {
        Self::from_points_and_vectors(name, points, Vec::new())
    }

    /// Creates a grid from points and optional direction vectors.
    ///
    /// `vectors` must be empty (all points face up) or have one entry per point.
    pub fn from_points_and_vectors(
        name: &str,
        points: Vec<Point>,
        vectors: Vec<Vector>,
    ) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::InvalidInput(format!(
                "analysis grid '{name}' has no points"
            )));
        }
        let vectors = if vectors.is_empty() {
            vec![Vector::up(); points.len()]
        } else if vectors.len() == points.len() {
            vectors
        } else {
            return Err(Error::InvalidInput(format!(
                "analysis grid '{name}' has {} points but {} vectors",
                points.len(),
                vectors.len()
            )));
        };

        Ok(Self {
            uid: UID::new(),
            name: name.to_string(),
            points,
            vectors,
            hoys: Vec::new(),
            results: HashMap::new(),
        })
    }

    /// Creates a grid from a whitespace separated `x y z [dx dy dz]` file.
    pub fn from_points_file(name: &str, path: &Path) -> Result<Self> {
        let (points, vectors) = read_points_file(path)?;
        Self::from_points_and_vectors(name, points, vectors)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn vectors(&self) -> &[Vector] {
        &self.vectors
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Hours of the year the stored results refer to.
    pub fn hoys(&self) -> &[f64] {
        &self.hoys
    }

    /// Stores one row per point, each row holding one value per time step.
    pub fn set_values(&mut self, key: SourceState, hoys: &[f64], rows: Vec<Vec<f64>>) -> Result<()> {
        if rows.len() != self.points.len() {
            return Err(Error::InvalidInput(format!(
                "grid '{}' has {} points but {} result rows were given",
                self.name,
                self.points.len(),
                rows.len()
            )));
        }
        if let Some(row) = rows.iter().find(|row| row.len() != hoys.len()) {
            return Err(Error::InvalidInput(format!(
                "grid '{}' expected {} values per point, got {}",
                self.name,
                hoys.len(),
                row.len()
            )));
        }
        if !self.accepts_hoys(hoys) {
            return Err(Error::InvalidInput(format!(
                "grid '{}' already holds results for a different time-step list",
                self.name
            )));
        }
        if self.hoys.is_empty() {
            self.hoys = hoys.to_vec();
        }

        self.results.insert(key, rows);
        Ok(())
    }

    /// True if results for `hoys` can be stored next to the existing ones.
    pub fn accepts_hoys(&self, hoys: &[f64]) -> bool {
        self.hoys.is_empty() || self.hoys == hoys
    }

    /// Value of one point at one hour for a `(source, state)` pair.
    pub fn value(&self, point: usize, hoy: f64, source: &str, state: &str) -> Option<f64> {
        let t = self.hoy_index(hoy)?;
        self.results
            .get(&SourceState::new(source, state))
            .and_then(|rows| rows.get(point))
            .map(|row| row[t])
    }

    /// Values of every point at one hour for a `(source, state)` pair.
    pub fn values_at(&self, hoy: f64, source: &str, state: &str) -> Option<Vec<f64>> {
        let t = self.hoy_index(hoy)?;
        self.results
            .get(&SourceState::new(source, state))
            .map(|rows| rows.iter().map(|row| row[t]).collect())
    }

    /// Mean over all points and time steps for a `(source, state)` pair.
    pub fn average(&self, key: &SourceState) -> Option<f64> {
        let rows = self.results.get(key)?;
        let count: usize = rows.iter().map(Vec::len).sum();
        if count == 0 {
            return None;
        }
        let sum: f64 = rows.iter().flatten().sum();
        Some(sum / count as f64)
    }

    /// Number of stored `(point, time step, source, state)` entries.
    pub fn result_count(&self) -> usize {
        self.results
            .values()
            .map(|rows| rows.iter().map(Vec::len).sum::<usize>())
            .sum()
    }

    /// Sorted `(source, state)` pairs with stored results.
    pub fn sources(&self) -> Vec<&SourceState> {
        let mut keys: Vec<&SourceState> = self.results.keys().collect();
        keys.sort();
        keys
    }

    /// Drops stored results so a recompiled recipe starts clean.
    pub fn clear_results(&mut self) {
        self.results.clear();
        self.hoys.clear();
    }

    /// Lines of the points file fed to the external tool.
    pub fn to_points_lines(&self) -> Vec<String> {
        self.points
            .iter()
            .zip(&self.vectors)
            .map(|(p, v)| format!("{} {} {} {} {} {}", p.x, p.y, p.z, v.dx, v.dy, v.dz))
            .collect()
    }

    fn hoy_index(&self, hoy: f64) -> Option<usize> {
        self.hoys.iter().position(|h| (h - hoy).abs() < 1e-6)
    }
}

impl HasName for AnalysisGrid {
    fn get_name(&self) -> &str {
        &self.name
    }
}

/// Reads `x y z [dx dy dz]` rows. Blank lines are skipped.
pub fn read_points_file(path: &Path) -> Result<(Vec<Point>, Vec<Vector>)> {
    let content = fs::read_to_string(path).map_err(|e| {
        Error::InvalidInput(format!("couldn't import points from {}: {e}", path.display()))
    })?;

    let mut points = Vec::new();
    let mut vectors = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let values = line
            .split_whitespace()
            .map(str::parse::<f64>)
            .collect::<std::result::Result<Vec<f64>, _>>()
            .map_err(|e| {
                Error::InvalidInput(format!(
                    "invalid number in {} at line {}: {e}",
                    path.display(),
                    i + 1
                ))
            })?;
        match values.as_slice() {
            [x, y, z] => {
                points.push(Point::new(*x, *y, *z));
                vectors.push(Vector::up());
            }
            [x, y, z, dx, dy, dz] => {
                points.push(Point::new(*x, *y, *z));
                vectors.push(Vector::new(*dx, *dy, *dz));
            }
            _ => {
                return Err(Error::InvalidInput(format!(
                    "expected 3 or 6 columns in {} at line {}, found {}",
                    path.display(),
                    i + 1,
                    values.len()
                )));
            }
        }
    }

    Ok((points, vectors))
}
