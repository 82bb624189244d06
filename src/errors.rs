//! Centralized error handling for tiffglob
//!
//! This module provides structured error types for the whole crate,
//! enabling better error context and type safety than a generic
//! `Box<dyn Error>`.

use std::fmt;
use std::path::PathBuf;

/// Main error type for tiffglob operations
#[derive(Debug)]
pub enum TiffGlobError {
    /// Invalid or empty construction input
    Argument(String),

    /// Mutually inconsistent construction or read arguments
    ConflictingArguments(String),

    /// The probed file does not open as a TIFF container
    UnsupportedFormat { path: PathBuf },

    /// Array shape or permutation error, propagated unmodified from ndarray
    Shape(ndarray::ShapeError),

    /// TIFF decode/encode errors
    Tiff(tiff::TiffError),

    /// Invalid glob pattern
    Pattern(glob::PatternError),

    /// I/O operation errors
    Io(std::io::Error),
}

impl fmt::Display for TiffGlobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TiffGlobError::Argument(msg) => write!(f, "Invalid argument: {}", msg),
            TiffGlobError::ConflictingArguments(msg) => {
                write!(f, "Conflicting arguments: {}", msg)
            }
            TiffGlobError::UnsupportedFormat { path } => {
                write!(f, "File is not a readable TIFF: {}", path.display())
            }
            TiffGlobError::Shape(e) => write!(f, "Array shape error: {}", e),
            TiffGlobError::Tiff(e) => write!(f, "TIFF error: {}", e),
            TiffGlobError::Pattern(e) => write!(f, "Glob pattern error: {}", e),
            TiffGlobError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for TiffGlobError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TiffGlobError::Shape(e) => Some(e),
            TiffGlobError::Tiff(e) => Some(e),
            TiffGlobError::Pattern(e) => Some(e),
            TiffGlobError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ndarray::ShapeError> for TiffGlobError {
    fn from(error: ndarray::ShapeError) -> Self {
        TiffGlobError::Shape(error)
    }
}

impl From<tiff::TiffError> for TiffGlobError {
    fn from(error: tiff::TiffError) -> Self {
        TiffGlobError::Tiff(error)
    }
}

impl From<glob::PatternError> for TiffGlobError {
    fn from(error: glob::PatternError) -> Self {
        TiffGlobError::Pattern(error)
    }
}

impl From<std::io::Error> for TiffGlobError {
    fn from(error: std::io::Error) -> Self {
        TiffGlobError::Io(error)
    }
}

/// Result type alias for tiffglob operations
pub type Result<T> = std::result::Result<T, TiffGlobError>;
