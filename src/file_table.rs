//! The coordinate table: one row per file, one column per logical axis
//!
//! Built once at reader construction and read-only afterwards. Columns
//! are kept in canonical axis priority order and rows are sorted by the
//! same order, so distinct-value counting, grouping, and the unpack
//! reshape downstream all agree on one deterministic ordering.

use crate::dimensions::{axis_rank, AXIS_PRIORITY};
use crate::errors::{Result, TiffGlobError};
use crate::indexing::Indexer;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One file and its coordinates, aligned with the table's columns
#[derive(Debug, Clone)]
struct FileRow {
    coords: Vec<i64>,
    path: PathBuf,
}

/// Immutable coordinate table over a file collection
#[derive(Debug, Clone)]
pub struct FileTable {
    columns: Vec<String>,
    rows: Vec<FileRow>,
}

impl FileTable {
    /// Build the table from a resolved file list and an indexer.
    ///
    /// Every canonical axis that the indexer does not provide and that is
    /// not an in-file axis is inserted as a constant-zero column. Columns
    /// are then ordered by canonical priority (non-canonical axes after,
    /// in first-seen order) and rows are sorted by all columns in that
    /// order.
    ///
    /// # Errors
    ///
    /// Returns an argument error when the indexer fails on a file or
    /// yields a different axis set for different files.
    pub fn build(
        paths: &[PathBuf],
        indexer: &Indexer,
        single_file_axes: &[String],
    ) -> Result<Self> {
        let mut axis_names: Vec<String> = Vec::new();
        let mut raw_rows: Vec<(Vec<i64>, PathBuf)> = Vec::with_capacity(paths.len());

        for (i, path) in paths.iter().enumerate() {
            let coords = indexer.coords_for(i, path)?;
            if i == 0 {
                axis_names = coords.iter().map(|(n, _)| n.clone()).collect();
            } else {
                let names: Vec<&String> = coords.iter().map(|(n, _)| n).collect();
                if names.len() != axis_names.len()
                    || !axis_names.iter().zip(names.iter()).all(|(a, b)| &a == b)
                {
                    return Err(TiffGlobError::Argument(format!(
                        "indexer produced axes {:?} for {} but {:?} for the first file",
                        names,
                        path.display(),
                        axis_names
                    )));
                }
            }
            raw_rows.push((coords.into_iter().map(|(_, v)| v).collect(), path.clone()));
        }

        // Insert absent canonical axes as constant-zero columns
        for dim in AXIS_PRIORITY {
            let known = axis_names.iter().any(|n| n == dim)
                || single_file_axes.iter().any(|n| n == dim);
            if !known {
                axis_names.push(dim.to_string());
                for (coords, _) in raw_rows.iter_mut() {
                    coords.push(0);
                }
            }
        }

        // Normalize column order to canonical priority
        let mut order: Vec<usize> = (0..axis_names.len()).collect();
        order.sort_by_key(|&i| (axis_rank(&axis_names[i]), i));

        let columns: Vec<String> = order.iter().map(|&i| axis_names[i].clone()).collect();
        let mut rows: Vec<FileRow> = raw_rows
            .into_iter()
            .map(|(coords, path)| FileRow {
                coords: order.iter().map(|&i| coords[i]).collect(),
                path,
            })
            .collect();

        // Deterministic row order: sort by every column, left to right
        rows.sort_by(|a, b| a.coords.cmp(&b.coords));

        Ok(Self { columns, rows })
    }

    /// Axis column names, in canonical order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of files in the table
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Path of the row at `i` (post-sort order)
    pub fn path(&self, i: usize) -> &Path {
        &self.rows[i].path
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Sorted distinct values of the scene column.
    ///
    /// A table without the scene column is a single scene `0`.
    pub fn scene_values(&self, scene_axis: &str) -> Vec<i64> {
        match self.column_index(scene_axis) {
            Some(idx) => {
                let mut values: Vec<i64> = self.rows.iter().map(|r| r.coords[idx]).collect();
                values.sort_unstable();
                values.dedup();
                values
            }
            None => vec![0],
        }
    }

    /// Restrict the table to one scene and drop the scene column
    pub fn scene_view(&self, scene_axis: &str, scene_value: i64) -> SceneTable {
        match self.column_index(scene_axis) {
            Some(idx) => {
                let columns: Vec<String> = self
                    .columns
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != idx)
                    .map(|(_, c)| c.clone())
                    .collect();
                let rows = self
                    .rows
                    .iter()
                    .filter(|r| r.coords[idx] == scene_value)
                    .map(|r| {
                        let coords = r
                            .coords
                            .iter()
                            .enumerate()
                            .filter(|(i, _)| *i != idx)
                            .map(|(_, v)| *v)
                            .collect();
                        (coords, r.path.clone())
                    })
                    .collect();
                SceneTable { columns, rows }
            }
            None => SceneTable {
                columns: self.columns.clone(),
                rows: self
                    .rows
                    .iter()
                    .map(|r| (r.coords.clone(), r.path.clone()))
                    .collect(),
            },
        }
    }
}

/// The per-scene sub-table consumed by the sizing planner and assembler
#[derive(Debug, Clone)]
pub struct SceneTable {
    columns: Vec<String>,
    rows: Vec<(Vec<i64>, PathBuf)>,
}

impl SceneTable {
    /// Axis column names, scene column excluded
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of files in the scene
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the scene has no files
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Paths in table (sorted) order
    pub fn paths(&self) -> Vec<PathBuf> {
        self.rows.iter().map(|(_, p)| p.clone()).collect()
    }

    /// Path of the scene's first file
    pub fn first_path(&self) -> Option<&Path> {
        self.rows.first().map(|(_, p)| p.as_path())
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Distinct-value count per column, in column order
    pub fn nunique(&self) -> Vec<(String, usize)> {
        self.columns
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let mut values: Vec<i64> = self.rows.iter().map(|(c, _)| c[idx]).collect();
                values.sort_unstable();
                values.dedup();
                (name.clone(), values.len())
            })
            .collect()
    }

    /// Sorted distinct values of one column
    pub fn distinct_values(&self, name: &str) -> Vec<i64> {
        match self.column_index(name) {
            Some(idx) => {
                let mut values: Vec<i64> = self.rows.iter().map(|(c, _)| c[idx]).collect();
                values.sort_unstable();
                values.dedup();
                values
            }
            None => Vec::new(),
        }
    }

    /// Partition the scene's files by their values along `group_axes`.
    ///
    /// Keys iterate in ascending coordinate order; rows within a group
    /// keep the table's sorted order.
    pub fn group_by(&self, group_axes: &[String]) -> BTreeMap<Vec<i64>, Vec<PathBuf>> {
        let indices: Vec<usize> = group_axes
            .iter()
            .filter_map(|a| self.column_index(a))
            .collect();

        let mut groups: BTreeMap<Vec<i64>, Vec<PathBuf>> = BTreeMap::new();
        for (coords, path) in &self.rows {
            let key: Vec<i64> = indices.iter().map(|&i| coords[i]).collect();
            groups.entry(key).or_default().push(path.clone());
        }
        groups
    }
}
