//! The lazy chunked-array runtime
//!
//! A [`LazyImage`] is a grid of deferred per-group computations: no
//! pixel is decoded until [`LazyImage::materialize`] (whole image) or
//! [`LazyChunk::compute`] (one unit of work) runs. Chunk boundaries are
//! file-group boundaries, so independent chunks decode independently;
//! materialization fans the chunks out over the rayon pool.

use crate::assembly::reorder_stack;
use crate::dim_array::{DimArray, ImageAttrs};
use crate::errors::{Result, TiffGlobError};
use crate::tiff_io;
use log::debug;
use ndarray::{ArrayD, IxDyn, Slice};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::PathBuf;

/// One deferred unit of work: a file group and its assembly recipe
#[derive(Debug, Clone)]
pub struct LazyChunk {
    paths: Vec<PathBuf>,
    reshape: Vec<usize>,
    order: Vec<usize>,
    shape: Vec<usize>,
    grid_index: Vec<usize>,
}

impl LazyChunk {
    pub(crate) fn new(
        paths: Vec<PathBuf>,
        reshape: Vec<usize>,
        order: Vec<usize>,
        shape: Vec<usize>,
        grid_index: Vec<usize>,
    ) -> Self {
        Self {
            paths,
            reshape,
            order,
            shape,
            grid_index,
        }
    }

    /// Files backing this chunk, in table order
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// The chunk's extents (expanded per-chunk shape)
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// The chunk's position in the block grid
    pub fn grid_index(&self) -> &[usize] {
        &self.grid_index
    }

    /// Decode the chunk's files and assemble them into the chunk shape.
    ///
    /// # Errors
    ///
    /// Decode failures and Cartesian-product violations (as reshape
    /// errors) surface here.
    pub fn compute(&self) -> Result<ArrayD<f32>> {
        let stacked = tiff_io::read_sequence(&self.paths)?;
        reorder_stack(stacked, &self.reshape, &self.order, &self.shape)
    }
}

/// A scene as a grid of lazy chunks plus its labels and metadata
#[derive(Debug, Clone)]
pub struct LazyImage {
    /// Dimension names in assembly (grid) order
    dims: Vec<String>,
    /// Block-grid extents, one per dimension
    grid_shape: Vec<usize>,
    /// Per-chunk extents right-aligned against the grid (leading
    /// singletons prepended)
    chunk_shape: Vec<usize>,
    /// Full extents in assembly order
    full_shape: Vec<usize>,
    chunks: Vec<LazyChunk>,
    coords: HashMap<String, Vec<String>>,
    attrs: ImageAttrs,
    /// Final dimension order applied on materialization
    output_order: Vec<String>,
}

impl LazyImage {
    pub(crate) fn new(
        dims: Vec<String>,
        grid_shape: Vec<usize>,
        raw_chunk_shape: &[usize],
        chunks: Vec<LazyChunk>,
        coords: HashMap<String, Vec<String>>,
        attrs: ImageAttrs,
        output_order: Vec<String>,
    ) -> Result<Self> {
        if raw_chunk_shape.len() > grid_shape.len() {
            return Err(TiffGlobError::Argument(format!(
                "chunk rank {} exceeds grid rank {}",
                raw_chunk_shape.len(),
                grid_shape.len()
            )));
        }
        if output_order.len() != dims.len()
            || !dims.iter().all(|d| output_order.contains(d))
        {
            return Err(TiffGlobError::ConflictingArguments(format!(
                "dimension order {:?} is not a permutation of the assembled dimensions {:?}",
                output_order, dims
            )));
        }

        // Right-align the chunk shape against the grid
        let mut chunk_shape = vec![1; grid_shape.len() - raw_chunk_shape.len()];
        chunk_shape.extend(raw_chunk_shape);

        let full_shape: Vec<usize> = grid_shape
            .iter()
            .zip(chunk_shape.iter())
            .map(|(g, c)| g * c)
            .collect();

        Ok(Self {
            dims,
            grid_shape,
            chunk_shape,
            full_shape,
            chunks,
            coords,
            attrs,
            output_order,
        })
    }

    fn output_permutation(&self) -> Vec<usize> {
        self.output_order
            .iter()
            .filter_map(|d| self.dims.iter().position(|n| n == d))
            .collect()
    }

    /// Dimension names in the final (output) order
    pub fn dims(&self) -> &[String] {
        &self.output_order
    }

    /// Full extents in the final (output) order
    pub fn shape(&self) -> Vec<usize> {
        self.output_permutation()
            .into_iter()
            .map(|i| self.full_shape[i])
            .collect()
    }

    /// Dimension names in assembly (grid) order
    pub fn assembly_dims(&self) -> &[String] {
        &self.dims
    }

    /// Block-grid extents in assembly order
    pub fn grid_shape(&self) -> &[usize] {
        &self.grid_shape
    }

    /// Aligned per-chunk extents in assembly order
    pub fn chunk_shape(&self) -> &[usize] {
        &self.chunk_shape
    }

    /// Number of deferred chunks
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// The deferred chunks, addressable by [`LazyChunk::grid_index`]
    pub fn chunks(&self) -> &[LazyChunk] {
        &self.chunks
    }

    /// Coordinate labels attached to the image
    pub fn coords(&self) -> &HashMap<String, Vec<String>> {
        &self.coords
    }

    /// Raw and processed metadata attributes
    pub fn attrs(&self) -> &ImageAttrs {
        &self.attrs
    }

    /// Compute every chunk and concatenate the grid into one labeled
    /// array in the final dimension order.
    ///
    /// Chunks compute in parallel on the rayon pool; placement copies
    /// each chunk at offset `grid index * chunk extent` per axis.
    ///
    /// # Errors
    ///
    /// The first chunk failure aborts the whole materialization.
    pub fn materialize(&self) -> Result<DimArray> {
        debug!(
            "materializing {} chunks into shape {:?}",
            self.chunks.len(),
            self.full_shape
        );

        let computed: Vec<(&LazyChunk, ArrayD<f32>)> = self
            .chunks
            .par_iter()
            .map(|chunk| chunk.compute().map(|arr| (chunk, arr)))
            .collect::<Result<Vec<_>>>()?;

        let mut out = ArrayD::<f32>::zeros(IxDyn(&self.full_shape));
        for (chunk, arr) in computed {
            let aligned = arr.into_shape(IxDyn(&self.chunk_shape))?;
            let offsets: Vec<usize> = chunk
                .grid_index()
                .iter()
                .zip(self.chunk_shape.iter())
                .map(|(g, c)| g * c)
                .collect();

            out.slice_each_axis_mut(|ax| {
                let i = ax.axis.index();
                let start = offsets[i] as isize;
                let end = (offsets[i] + self.chunk_shape[i]) as isize;
                Slice::from(start..end)
            })
            .assign(&aligned);
        }

        DimArray::new(out, self.dims.clone(), self.coords.clone(), self.attrs.clone())?
            .transpose_to(&self.output_order)
    }
}
