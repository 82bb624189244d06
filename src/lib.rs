//! tiffglob: multi-dimensional image assembly from TIFF file collections
//!
//! Acquisition software often writes one TIFF file per (scene, timepoint,
//! channel, z-slice) combination instead of one combined file. tiffglob
//! reconstructs the single logical multi-dimensional image from such a
//! collection, reading each file's axis coordinates out of its filename
//! (or out of a caller-supplied index table).
//!
//! ## Key Features
//!
//! - **Filename Indexing**: a default indexer for `S/T/C/Z`-numbered
//!   names, a MicroManager indexer, custom indexer functions, and
//!   pre-built coordinate tables
//! - **Dimension Assembly**: merges axes that vary both across files and
//!   within a file, in a caller-controlled global axis order
//! - **Lazy Chunked Reads**: per-file-group chunks as deferred units of
//!   work, materialized in parallel through Rayon
//! - **Scene Support**: independently addressable sub-datasets selected
//!   by a scene column
//! - **Metadata**: raw TIFF tag tables and channel coordinate labels on
//!   every assembled array
//!
//! ## Module Organization
//!
//! - [`reader`]: the [`GlobReader`] entry point
//! - [`indexing`]: file sources and filename indexers
//! - [`file_table`]: the per-file coordinate table
//! - [`sizing`]: dimension sizing and chunk planning
//! - [`assembly`]: the reshape/permute assembly engine
//! - [`lazy`]: the deferred chunk grid and its materialization
//! - [`dim_array`]: labeled arrays with named dimensions
//! - [`metadata`]: scene/channel identifiers and channel-name handling
//! - [`tiff_io`]: TIFF decoding, probing, and tag extraction
//! - [`dimensions`]: the axis vocabulary
//! - [`errors`]: centralized error handling
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use tiffglob::prelude::*;
//!
//! // Files named like S0_T1_C2_Z3.tif
//! let reader = GlobReader::from_glob("path/to/data/*.tif").unwrap();
//!
//! // One scene at a time, fully decoded ...
//! let image = reader.read(0).unwrap();
//! println!("dims {:?} shape {:?}", image.dims(), image.shape());
//!
//! // ... or as a lazy grid of per-file-group chunks
//! let lazy = reader.read_lazy(0).unwrap();
//! println!("{} chunks", lazy.chunk_count());
//! let image = lazy.materialize().unwrap();
//! # let _ = image;
//! ```
//!
//! The library is designed around one immutable coordinate table built at
//! construction; every scene read is an independent, idempotent
//! computation over it.

// Core modules
pub mod assembly;
pub mod dim_array;
pub mod dimensions;
pub mod errors;
pub mod file_table;
pub mod indexing;
pub mod lazy;
pub mod metadata;
pub mod reader;
pub mod sizing;
pub mod tiff_io;

// Direct re-exports for the public API
pub use dim_array::{DimArray, ImageAttrs};
pub use errors::{Result, TiffGlobError};
pub use lazy::{LazyChunk, LazyImage};
pub use reader::{DimOrder, GlobReader, GlobReaderConfig};

// High-level convenience API
pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::dim_array::{DimArray, ImageAttrs};
    pub use crate::dimensions::AxisSizes;
    pub use crate::errors::{Result, TiffGlobError};
    pub use crate::indexing::{FileSource, Indexer};
    pub use crate::lazy::{LazyChunk, LazyImage};
    pub use crate::metadata::ChannelNames;
    pub use crate::reader::{DimOrder, GlobReader, GlobReaderConfig};
}
