//! File collections and filename indexers
//!
//! A [`FileSource`] names the files to assemble; an [`Indexer`] assigns
//! each file its integer coordinate along every logical axis, either by
//! running a function over the filename or by looking the file up in a
//! pre-built coordinate frame.

use crate::dimensions::{CHANNEL, DEPTH, SAMPLES, TIME};
use crate::errors::{Result, TiffGlobError};
use regex::Regex;
use std::path::{Path, PathBuf};

/// Where the files of a dataset come from
#[derive(Debug, Clone)]
pub enum FileSource {
    /// A glob pattern (or a plain path, which globs to itself)
    Pattern(String),
    /// An explicit ordered collection of paths
    Paths(Vec<PathBuf>),
}

impl FileSource {
    /// Create a source from a pattern or path string.
    ///
    /// Remote URL schemes are rejected; only the local filesystem is
    /// supported as the file-location collaborator.
    pub fn from_pattern_str(s: &str) -> Result<Self> {
        if s.starts_with("s3://") || s.starts_with("gs://") || s.starts_with("http://")
            || s.starts_with("https://")
        {
            return Err(TiffGlobError::Argument(format!(
                "remote file sources are not supported, got {}",
                s
            )));
        }
        Ok(FileSource::Pattern(s.to_string()))
    }

    /// Expand the source into an ordered list of paths.
    ///
    /// # Errors
    ///
    /// Returns an argument error when the pattern is invalid or when no
    /// file matches.
    pub fn resolve(&self) -> Result<Vec<PathBuf>> {
        let paths = match self {
            FileSource::Pattern(pattern) => {
                let mut matched = Vec::new();
                for entry in glob::glob(pattern)? {
                    match entry {
                        Ok(path) => matched.push(path),
                        Err(e) => return Err(TiffGlobError::Io(e.into_error())),
                    }
                }
                matched
            }
            FileSource::Paths(paths) => paths.clone(),
        };

        if paths.is_empty() {
            return Err(TiffGlobError::Argument(
                "no files found matching the file source".to_string(),
            ));
        }
        Ok(paths)
    }
}

impl From<&str> for FileSource {
    fn from(s: &str) -> Self {
        FileSource::Pattern(s.to_string())
    }
}

impl From<String> for FileSource {
    fn from(s: String) -> Self {
        FileSource::Pattern(s)
    }
}

impl From<Vec<PathBuf>> for FileSource {
    fn from(paths: Vec<PathBuf>) -> Self {
        FileSource::Paths(paths)
    }
}

/// Coordinates of one file along a set of named axes
pub type AxisCoords = Vec<(String, i64)>;

/// A pre-built coordinate frame: one column per axis, one row per file,
/// aligned positionally with the resolved file list.
#[derive(Debug, Clone)]
pub struct CoordFrame {
    columns: Vec<String>,
    rows: Vec<Vec<i64>>,
}

impl CoordFrame {
    /// Build a frame from column names and row values.
    ///
    /// # Errors
    ///
    /// Returns an argument error when any row length differs from the
    /// column count.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<i64>>) -> Result<Self> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(TiffGlobError::Argument(format!(
                    "coordinate frame row {} has {} values for {} columns",
                    i,
                    row.len(),
                    columns.len()
                )));
            }
        }
        Ok(Self { columns, rows })
    }

    /// Column names in frame order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the frame has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn row(&self, i: usize) -> &[i64] {
        &self.rows[i]
    }
}

/// How files are assigned their per-axis coordinates
pub enum Indexer {
    /// Run a function over each path
    Function(Box<dyn Fn(&Path) -> Result<AxisCoords> + Send + Sync>),
    /// Look coordinates up in a pre-built frame, by file position
    Table(CoordFrame),
}

impl Default for Indexer {
    fn default() -> Self {
        Indexer::Function(Box::new(default_indexer))
    }
}

impl std::fmt::Debug for Indexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Indexer::Function(_) => f.write_str("Indexer::Function(..)"),
            Indexer::Table(frame) => f.debug_tuple("Indexer::Table").field(frame).finish(),
        }
    }
}

impl Indexer {
    /// Wrap a filename-to-coordinates function
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&Path) -> Result<AxisCoords> + Send + Sync + 'static,
    {
        Indexer::Function(Box::new(f))
    }

    /// The MicroManager MDA filename indexer.
    ///
    /// MicroManager names images
    /// `img_channel000_position001_time000000003_z004.tif`, so the four
    /// digit groups map to `C`, `S`, `T`, `Z` in that fixed order.
    pub fn micro_manager() -> Self {
        Indexer::Function(Box::new(micro_manager_indexer))
    }

    /// Coordinates for the file at position `i` in the resolved list.
    ///
    /// # Errors
    ///
    /// Function indexers propagate their own errors; table indexers fail
    /// with an argument error when the frame is shorter than the file
    /// list.
    pub fn coords_for(&self, i: usize, path: &Path) -> Result<AxisCoords> {
        match self {
            Indexer::Function(f) => f(path),
            Indexer::Table(frame) => {
                if i >= frame.len() {
                    return Err(TiffGlobError::Argument(format!(
                        "coordinate frame has {} rows but file {} was requested",
                        frame.len(),
                        i
                    )));
                }
                Ok(frame
                    .columns()
                    .iter()
                    .cloned()
                    .zip(frame.row(i).iter().copied())
                    .collect())
            }
        }
    }
}

/// Extract the first `n` runs of digits from a filename.
fn digit_groups(path: &Path, n: usize) -> Result<Vec<i64>> {
    static DIGITS: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let re = DIGITS.get_or_init(|| Regex::new(r"\d+").expect("digit pattern is valid"));
    let name = path
        .file_name()
        .and_then(|f| f.to_str())
        .ok_or_else(|| TiffGlobError::Argument(format!("invalid filename: {:?}", path)))?;

    let groups: Vec<i64> = re
        .find_iter(name)
        .take(n)
        .map(|m| m.as_str().parse::<i64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| {
            TiffGlobError::Argument(format!("non-numeric index in {}: {}", name, e))
        })?;

    if groups.len() < n {
        return Err(TiffGlobError::Argument(format!(
            "expected at least {} digit groups in filename {}, found {}",
            n,
            name,
            groups.len()
        )));
    }
    Ok(groups)
}

/// Default filename indexer.
///
/// The first four runs of digits in the filename become the `S`, `T`,
/// `C`, `Z` coordinates, so `S0_T1_C2_Z3.tif` maps to
/// `[(S,0), (T,1), (C,2), (Z,3)]`. Extra digit runs are ignored.
pub fn default_indexer(path: &Path) -> Result<AxisCoords> {
    let groups = digit_groups(path, 4)?;
    let axes = [SAMPLES, TIME, CHANNEL, DEPTH];
    Ok(axes
        .iter()
        .map(|a| a.to_string())
        .zip(groups.into_iter())
        .collect())
}

/// MicroManager MDA filename indexer; see [`Indexer::micro_manager`].
pub fn micro_manager_indexer(path: &Path) -> Result<AxisCoords> {
    let groups = digit_groups(path, 4)?;
    let axes = [CHANNEL, SAMPLES, TIME, DEPTH];
    Ok(axes
        .iter()
        .map(|a| a.to_string())
        .zip(groups.into_iter())
        .collect())
}
