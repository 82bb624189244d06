//! The multi-file TIFF reader
//!
//! [`GlobReader`] wires the components together: it builds the
//! coordinate table once at construction, enumerates scenes, probes the
//! single-file shape, and serves per-scene reads in an immediate
//! (fully-decoded) and a lazy (chunk-grid) mode.

use crate::assembly::{self, ScenePlan};
use crate::dim_array::{DimArray, ImageAttrs};
use crate::dimensions::{
    AxisSizes, DEFAULT_CHUNK_AXES, DEFAULT_DIMENSION_ORDER, DEFAULT_SCENE_AXIS,
    DEFAULT_SINGLE_FILE_AXES, REQUIRED_CHUNK_AXES,
};
use crate::errors::{Result, TiffGlobError};
use crate::file_table::{FileTable, SceneTable};
use crate::indexing::{FileSource, Indexer};
use crate::lazy::LazyImage;
use crate::metadata::{self, ChannelNames};
use crate::tiff_io::{self, IMAGE_DESCRIPTION_TAG};
use log::debug;
use std::path::PathBuf;

/// Global axis order of the assembled arrays
#[derive(Debug, Clone, Default)]
pub enum DimOrder {
    /// Derive the order from the canonical order and the axes present
    #[default]
    Inferred,
    /// One explicit order applied to every scene
    Same(Vec<String>),
    /// One explicit order per scene; outer length must equal the scene
    /// count
    PerScene(Vec<Vec<String>>),
}

impl DimOrder {
    /// An explicit order from one-letter axis names, e.g. `"TCZYX"`
    pub fn same(order: &str) -> Self {
        DimOrder::Same(order.chars().map(|c| c.to_string()).collect())
    }

    /// One explicit order per scene, each from one-letter axis names
    pub fn per_scene(orders: &[&str]) -> Self {
        DimOrder::PerScene(
            orders
                .iter()
                .map(|o| o.chars().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    fn validate_scene_count(&self, scene_count: usize) -> Result<()> {
        if let DimOrder::PerScene(orders) = self {
            if orders.len() != scene_count {
                return Err(TiffGlobError::ConflictingArguments(format!(
                    "number of dimension orders ({}) does not match the number of scenes ({})",
                    orders.len(),
                    scene_count
                )));
            }
        }
        Ok(())
    }
}

/// Construction options for [`GlobReader`].
///
/// Built fresh per reader; the defaults reproduce the common
/// one-plane-per-file microscopy layout.
#[derive(Debug)]
pub struct GlobReaderConfig {
    /// Name of the coordinate-table column that separates scenes
    pub scene_axis: String,
    /// Axes kept resident inside every computed chunk; the mandatory
    /// spatial/sample axes are always added
    pub chunk_axes: Vec<String>,
    /// Global axis order of the output
    pub dim_order: DimOrder,
    /// Caller-supplied channel names
    pub channel_names: ChannelNames,
    /// Shape of one file; probed from the first file when absent
    pub single_file_shape: Option<Vec<usize>>,
    /// Axis names of one file, matching `single_file_shape`
    pub single_file_axes: Vec<String>,
}

impl Default for GlobReaderConfig {
    fn default() -> Self {
        Self {
            scene_axis: DEFAULT_SCENE_AXIS.to_string(),
            chunk_axes: DEFAULT_CHUNK_AXES.iter().map(|a| a.to_string()).collect(),
            dim_order: DimOrder::default(),
            channel_names: ChannelNames::default(),
            single_file_shape: None,
            single_file_axes: DEFAULT_SINGLE_FILE_AXES
                .iter()
                .map(|a| a.to_string())
                .collect(),
        }
    }
}

fn normalize_chunk_axes(chunk_axes: &[String]) -> Vec<String> {
    let mut axes: Vec<String> = chunk_axes.iter().map(|a| a.to_uppercase()).collect();
    for required in REQUIRED_CHUNK_AXES {
        if !axes.iter().any(|a| a == required) {
            axes.push(required.to_string());
        }
    }
    axes
}

/// Reader over a collection of TIFF files indexed by filename
#[derive(Debug)]
pub struct GlobReader {
    table: FileTable,
    scene_axis: String,
    scene_values: Vec<i64>,
    scene_ids: Vec<String>,
    chunk_axes: Vec<String>,
    dim_order: DimOrder,
    channel_names: ChannelNames,
    single_file_sizes: AxisSizes,
}

impl GlobReader {
    /// Construct a reader over `source` with the default indexer and
    /// configuration.
    ///
    /// Remote URL schemes are rejected.
    pub fn from_glob(pattern: &str) -> Result<Self> {
        Self::new(
            FileSource::from_pattern_str(pattern)?,
            Indexer::default(),
            GlobReaderConfig::default(),
        )
    }

    /// Construct a reader over an explicit path list with the default
    /// indexer and configuration.
    pub fn from_paths(paths: Vec<PathBuf>) -> Result<Self> {
        Self::new(
            FileSource::Paths(paths),
            Indexer::default(),
            GlobReaderConfig::default(),
        )
    }

    /// Construct a reader from a file source, an indexer, and options.
    ///
    /// Builds the coordinate table, enumerates scenes, validates the
    /// per-scene option lists, and probes the first file (for the
    /// single-file shape when none was supplied, and to verify it opens
    /// as a TIFF at all).
    ///
    /// # Errors
    ///
    /// - argument error: empty file source or indexer failure
    /// - conflicting-arguments error: per-scene list length mismatches;
    ///   single-file axis count differing from the (probed) shape rank
    /// - unsupported-format error: the first file is not a TIFF
    pub fn new(source: FileSource, indexer: Indexer, config: GlobReaderConfig) -> Result<Self> {
        let paths = source.resolve()?;
        let table = FileTable::build(&paths, &indexer, &config.single_file_axes)?;

        let scene_values = table.scene_values(&config.scene_axis);
        let scene_ids: Vec<String> = (0..scene_values.len()).map(metadata::scene_id).collect();

        config.channel_names.validate_scene_count(scene_values.len())?;
        config.dim_order.validate_scene_count(scene_values.len())?;

        let chunk_axes = normalize_chunk_axes(&config.chunk_axes);

        let first_path = table.path(0).to_path_buf();
        let single_file_shape = match config.single_file_shape {
            Some(shape) => {
                if !tiff_io::is_supported(&first_path) {
                    return Err(TiffGlobError::UnsupportedFormat { path: first_path });
                }
                shape
            }
            None => tiff_io::probe_shape(&first_path)
                .map_err(|_| TiffGlobError::UnsupportedFormat { path: first_path })?,
        };

        if config.single_file_axes.len() != single_file_shape.len() {
            return Err(TiffGlobError::ConflictingArguments(format!(
                "number of single file dimensions ({}) does not match the number of \
                 dimensions in a test file ({})",
                config.single_file_axes.len(),
                single_file_shape.len()
            )));
        }

        let single_file_sizes = AxisSizes::from_pairs(
            config
                .single_file_axes
                .iter()
                .cloned()
                .zip(single_file_shape.into_iter()),
        );

        debug!(
            "built reader: {} files, {} scenes, single file {:?}",
            table.len(),
            scene_ids.len(),
            single_file_sizes
        );

        Ok(Self {
            table,
            scene_axis: config.scene_axis,
            scene_values,
            scene_ids,
            chunk_axes,
            dim_order: config.dim_order,
            channel_names: config.channel_names,
            single_file_sizes,
        })
    }

    /// Scene identifiers, one per distinct scene value, in increasing
    /// scene-value order
    pub fn scenes(&self) -> &[String] {
        &self.scene_ids
    }

    /// Number of scenes
    pub fn scene_count(&self) -> usize {
        self.scene_ids.len()
    }

    /// The coordinate table
    pub fn file_table(&self) -> &FileTable {
        &self.table
    }

    /// The single-file axis extents
    pub fn single_file_sizes(&self) -> &AxisSizes {
        &self.single_file_sizes
    }

    /// The normalized chunk axis set
    pub fn chunk_axes(&self) -> &[String] {
        &self.chunk_axes
    }

    fn scene_table(&self, scene_index: usize) -> Result<SceneTable> {
        let value = self.scene_values.get(scene_index).ok_or_else(|| {
            TiffGlobError::Argument(format!(
                "scene index {} out of range for {} scenes",
                scene_index,
                self.scene_values.len()
            ))
        })?;
        Ok(self.table.scene_view(&self.scene_axis, *value))
    }

    /// Full per-scene axis extents, in assembly order.
    ///
    /// For a complete Cartesian layout the product of these extents
    /// equals the scene's file count times the single-file element
    /// count.
    pub fn sizing_plan(&self, scene_index: usize) -> Result<AxisSizes> {
        let scene = self.scene_table(scene_index)?;
        Ok(crate::sizing::sizing_plan(
            &scene,
            &self.single_file_sizes,
            &self.chunk_axes,
        ))
    }

    fn scene_attrs(&self, scene: &SceneTable) -> Result<ImageAttrs> {
        let first = scene.first_path().ok_or_else(|| {
            TiffGlobError::Argument("scene contains no files".to_string())
        })?;
        let tags = tiff_io::read_tags(first)?;
        let description = tags
            .get(&IMAGE_DESCRIPTION_TAG)
            .and_then(|v| v.as_str().map(String::from));
        Ok(ImageAttrs { tags, description })
    }

    fn resolve_dim_order(&self, scene_index: usize, dims: &[String]) -> Result<Vec<String>> {
        match &self.dim_order {
            DimOrder::Inferred => {
                let mut order: Vec<String> = DEFAULT_DIMENSION_ORDER
                    .iter()
                    .filter(|d| {
                        self.table.columns().iter().any(|c| c == *d)
                            || self.chunk_axes.iter().any(|c| c == *d)
                    })
                    .map(|d| d.to_string())
                    .collect();
                order.retain(|d| dims.contains(d));
                for d in dims {
                    if !order.contains(d) {
                        order.push(d.clone());
                    }
                }
                Ok(order)
            }
            DimOrder::Same(order) => Ok(order.clone()),
            DimOrder::PerScene(orders) => orders.get(scene_index).cloned().ok_or_else(|| {
                TiffGlobError::ConflictingArguments(format!(
                    "no dimension order provided for scene {}",
                    scene_index
                ))
            }),
        }
    }

    /// Decode and assemble one scene immediately.
    ///
    /// Returns the fully materialized labeled array in the resolved
    /// global axis order, with channel coordinates and the first file's
    /// tag metadata attached.
    pub fn read(&self, scene_index: usize) -> Result<DimArray> {
        let scene = self.scene_table(scene_index)?;
        let attrs = self.scene_attrs(&scene)?;

        let (data, dims) =
            assembly::assemble_immediate(&scene, &self.single_file_sizes, &self.chunk_axes)?;

        let resolved = metadata::resolve_channel_names(
            &self.channel_names,
            scene_index,
            &dims,
            data.shape(),
        )?;
        let coords = metadata::scene_coords(resolved, scene_index, &dims, data.shape());
        let order = self.resolve_dim_order(scene_index, &dims)?;

        DimArray::new(data, dims, coords, attrs)?.transpose_to(&order)
    }

    /// Plan one scene as a lazy chunk grid.
    ///
    /// No pixel data is decoded; the returned [`LazyImage`] carries one
    /// deferred chunk per grouping-axis value combination (a single
    /// chunk when no grouping axis exists) and materializes on demand.
    pub fn read_lazy(&self, scene_index: usize) -> Result<LazyImage> {
        let scene = self.scene_table(scene_index)?;
        let attrs = self.scene_attrs(&scene)?;

        let plan = ScenePlan::new(&scene, &self.single_file_sizes, &self.chunk_axes);
        let chunks = assembly::build_chunks(&scene, &plan, &self.single_file_sizes);

        let dims = plan.expanded_blocks.names();
        let grid_shape = plan.expanded_blocks.extents();
        let raw_chunk_shape = plan.expanded_chunks.extents();
        if raw_chunk_shape.len() > grid_shape.len() {
            return Err(TiffGlobError::Argument(format!(
                "chunk rank {} exceeds grid rank {}",
                raw_chunk_shape.len(),
                grid_shape.len()
            )));
        }

        let mut padded = vec![1; grid_shape.len() - raw_chunk_shape.len()];
        padded.extend(&raw_chunk_shape);
        let full_shape: Vec<usize> = grid_shape
            .iter()
            .zip(padded.iter())
            .map(|(g, c)| g * c)
            .collect();

        let resolved = metadata::resolve_channel_names(
            &self.channel_names,
            scene_index,
            &dims,
            &full_shape,
        )?;
        let coords = metadata::scene_coords(resolved, scene_index, &dims, &full_shape);
        let order = self.resolve_dim_order(scene_index, &dims)?;

        LazyImage::new(dims, grid_shape, &raw_chunk_shape, chunks, coords, attrs, order)
    }
}
