use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::{Error, Result};

use super::grid::AnalysisGrid;
use super::manifest::ResultFile;

/// Merges result files whose `(source, state)` is encoded in the file name.
pub fn merge(grids: &mut [AnalysisGrid], hoys: &[f64], result_files: &[PathBuf]) -> Result<()> {
    let files = result_files
        .iter()
        .map(|path| ResultFile::from_path(path))
        .collect::<Result<Vec<_>>>()?;
    merge_manifest(grids, hoys, &files)
}

/// Merges typed result files onto the grids.
///
/// Each file holds one row per point for all grids, packed in grid order,
/// and one column per time step. Grid `i` starts at the row equal to the sum
/// of the sizes of grids `0..i`.
pub fn merge_manifest(grids: &mut [AnalysisGrid], hoys: &[f64], files: &[ResultFile]) -> Result<()> {
    if grids.is_empty() {
        return Err(Error::InvalidInput("no analysis grids to merge into".to_string()));
    }
    if let Some(grid) = grids.iter().find(|g| !g.accepts_hoys(hoys)) {
        return Err(Error::InvalidInput(format!(
            "grid '{}' already holds results for a different time-step list",
            grid.name()
        )));
    }
    let expected_rows: usize = grids.iter().map(AnalysisGrid::len).sum();

    let parsed = files
        .par_iter()
        .map(|file| read_result_rows(&file.path, expected_rows, hoys.len()))
        .collect::<Result<Vec<_>>>()?;

    for (file, rows) in files.iter().zip(parsed) {
        debug!(
            "loading results for {} from {}",
            file.key,
            file.path.display()
        );
        let mut rows = rows.into_iter();
        for grid in grids.iter_mut() {
            let chunk: Vec<Vec<f64>> = rows.by_ref().take(grid.len()).collect();
            grid.set_values(file.key.clone(), hoys, chunk)?;
        }
    }
    Ok(())
}

/// Reads the data rows of a result matrix, skipping a Radiance header.
///
/// Fails when the file does not hold exactly `expected_rows` rows of
/// `columns` values each.
pub fn read_result_rows(path: &Path, expected_rows: usize, columns: usize) -> Result<Vec<Vec<f64>>> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let reader = BufReader::new(file);
    let mismatch = |message: String| Error::ResultShapeMismatch {
        path: path.to_path_buf(),
        message,
    };

    let mut rows = Vec::with_capacity(expected_rows);
    let mut in_header = false;
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| Error::io(path, e))?;
        if i == 0 && line.starts_with("#?RADIANCE") {
            in_header = true;
            continue;
        }
        if in_header {
            if line.trim().is_empty() {
                in_header = false;
            }
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }

        let row = line
            .split_whitespace()
            .map(str::parse::<f64>)
            .collect::<std::result::Result<Vec<f64>, _>>()
            .map_err(|e| mismatch(format!("invalid value at line {}: {e}", i + 1)))?;
        if row.len() != columns {
            return Err(mismatch(format!(
                "expected {columns} values at line {}, found {}",
                i + 1,
                row.len()
            )));
        }
        rows.push(row);
    }

    if rows.len() != expected_rows {
        return Err(mismatch(format!(
            "expected {expected_rows} rows (sum of grid sizes), found {}",
            rows.len()
        )));
    }
    Ok(rows)
}

/// Per-grid overview of merged results.
#[derive(Debug, Clone, Serialize)]
pub struct GridSummary {
    pub name: String,
    pub uid: String,
    pub point_count: usize,
    pub hoy_count: usize,
    pub sources: Vec<SourceSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub source: String,
    pub state: String,
    pub average: f64,
}

pub fn summarize(grids: &[AnalysisGrid]) -> Vec<GridSummary> {
    grids
        .iter()
        .map(|grid| GridSummary {
            name: grid.name().to_string(),
            uid: grid.uid.as_str().to_string(),
            point_count: grid.len(),
            hoy_count: grid.hoys().len(),
            sources: grid
                .sources()
                .into_iter()
                .map(|key| SourceSummary {
                    source: key.source.clone(),
                    state: key.state.clone(),
                    average: grid.average(key).unwrap_or(0.0),
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::manifest::SourceState;
    use crate::Point;
    use tempfile::tempdir;

    fn grid(name: &str, n: usize) -> AnalysisGrid {
        let points = (0..n).map(|i| Point::new(i as f64, 0.0, 0.8)).collect();
        AnalysisGrid::new(name, points).unwrap()
    }

    #[test]
    fn test_header_is_skipped() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("p..scene..default.ill");
        std::fs::write(
            &path,
            "#?RADIANCE\nrmtxop -fa\nNROWS=2\nNCOLS=2\nNCOMP=1\nFORMAT=ascii\n\n1\t2\n3\t4\n",
        )
        .unwrap();
        let rows = read_result_rows(&path, 2, 2)?;
        assert_eq!(rows, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        Ok(())
    }

    #[test]
    fn test_row_count_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("p..scene..default.ill");
        std::fs::write(&path, "1 2\n3 4\n5 6\n").unwrap();
        let err = read_result_rows(&path, 2, 2).unwrap_err();
        assert!(matches!(err, Error::ResultShapeMismatch { .. }));
    }

    #[test]
    fn test_column_count_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("p..scene..default.ill");
        std::fs::write(&path, "1 2 3\n").unwrap();
        let err = read_result_rows(&path, 1, 2).unwrap_err();
        assert!(matches!(err, Error::ResultShapeMismatch { .. }));
    }

    #[test]
    fn test_second_grid_starts_after_first() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("office..scene..default.ill");
        std::fs::write(&path, "10\n11\n20\n21\n22\n").unwrap();

        let mut grids = vec![grid("a", 2), grid("b", 3)];
        merge(&mut grids, &[12.0], &[path])?;

        assert_eq!(grids[0].values_at(12.0, "scene", "default"), Some(vec![10.0, 11.0]));
        assert_eq!(
            grids[1].values_at(12.0, "scene", "default"),
            Some(vec![20.0, 21.0, 22.0])
        );
        Ok(())
    }

    #[test]
    fn test_incompatible_hoys_leave_grids_untouched() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("office..scene..default.ill");
        std::fs::write(&path, "1\n2\n3\n").unwrap();

        let mut grids = vec![grid("a", 2), grid("b", 1)];
        grids[1].set_values(SourceState::new("south", "0"), &[9.0], vec![vec![5.0]])?;

        let err = merge(&mut grids, &[12.0], &[path]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(grids[0].result_count(), 0);
        assert!(grids[0].hoys().is_empty());
        assert_eq!(grids[1].result_count(), 1);
        Ok(())
    }

    #[test]
    fn test_malformed_name_is_rejected_before_reading() {
        let mut grids = vec![grid("a", 1)];
        let err = merge(&mut grids, &[12.0], &[PathBuf::from("result.ill")]).unwrap_err();
        assert!(matches!(err, Error::MalformedResultFile(_)));
        assert_eq!(grids[0].result_count(), 0);
    }

    #[test]
    fn test_summarize() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("office..south..0.ill");
        std::fs::write(&path, "1 3\n5 7\n").unwrap();
        let mut grids = vec![grid("a", 2)];
        merge(&mut grids, &[8.0, 9.0], &[path])?;

        let summary = summarize(&grids);
        assert_eq!(summary[0].hoy_count, 2);
        assert_eq!(summary[0].sources[0].source, "south");
        assert!((summary[0].sources[0].average - 4.0).abs() < 1e-10);
        Ok(())
    }
}
