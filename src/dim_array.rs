//! The labeled-array container
//!
//! A [`DimArray`] keeps the pixel data, its ordered dimension names,
//! per-axis coordinate labels, and the image metadata attributes
//! together, so downstream code never has to guess which axis is which.

use crate::errors::{Result, TiffGlobError};
use ndarray::{ArrayD, IxDyn};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap};

/// Metadata attributes attached to an assembled image
#[derive(Debug, Clone, Default)]
pub struct ImageAttrs {
    /// Raw TIFF tag table of the scene's first file, keyed by tag code
    pub tags: BTreeMap<u16, JsonValue>,
    /// The ImageDescription tag value, when present
    pub description: Option<String>,
}

/// An `f32` array with named dimensions, coordinate labels, and attrs
#[derive(Debug, Clone)]
pub struct DimArray {
    data: ArrayD<f32>,
    dims: Vec<String>,
    coords: HashMap<String, Vec<String>>,
    attrs: ImageAttrs,
}

impl DimArray {
    /// Wrap an array with its dimension names and labels.
    ///
    /// # Errors
    ///
    /// Fails when the number of names differs from the array rank or a
    /// coordinate list's length differs from its axis extent.
    pub fn new(
        data: ArrayD<f32>,
        dims: Vec<String>,
        coords: HashMap<String, Vec<String>>,
        attrs: ImageAttrs,
    ) -> Result<Self> {
        if dims.len() != data.ndim() {
            return Err(TiffGlobError::Argument(format!(
                "{} dimension names for an array of rank {}",
                dims.len(),
                data.ndim()
            )));
        }
        for (axis, labels) in &coords {
            if let Some(pos) = dims.iter().position(|d| d == axis) {
                if labels.len() != data.shape()[pos] {
                    return Err(TiffGlobError::Argument(format!(
                        "{} labels for axis {} of extent {}",
                        labels.len(),
                        axis,
                        data.shape()[pos]
                    )));
                }
            }
        }
        Ok(Self {
            data,
            dims,
            coords,
            attrs,
        })
    }

    /// The pixel data
    pub fn data(&self) -> &ArrayD<f32> {
        &self.data
    }

    /// Consume into the pixel data
    pub fn into_data(self) -> ArrayD<f32> {
        self.data
    }

    /// Dimension names, in axis order
    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    /// Array extents, in axis order
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Coordinate labels of one axis, if any
    pub fn coords(&self, axis: &str) -> Option<&[String]> {
        self.coords.get(axis).map(|v| v.as_slice())
    }

    /// Metadata attributes
    pub fn attrs(&self) -> &ImageAttrs {
        &self.attrs
    }

    /// Permute the array into the requested dimension order.
    ///
    /// # Errors
    ///
    /// Fails with a conflicting-arguments error unless `order` is a
    /// permutation of the current dimension names.
    pub fn transpose_to(self, order: &[String]) -> Result<Self> {
        if order.len() != self.dims.len() || !self.dims.iter().all(|d| order.contains(d)) {
            return Err(TiffGlobError::ConflictingArguments(format!(
                "dimension order {:?} is not a permutation of {:?}",
                order, self.dims
            )));
        }

        let permutation: Vec<usize> = order
            .iter()
            .map(|d| self.dims.iter().position(|n| n == d).expect("checked above"))
            .collect();

        let data = self
            .data
            .permuted_axes(IxDyn(&permutation))
            .as_standard_layout()
            .into_owned();

        Ok(Self {
            data,
            dims: order.to_vec(),
            coords: self.coords,
            attrs: self.attrs,
        })
    }
}
