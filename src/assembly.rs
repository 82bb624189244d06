//! Axes reordering and array assembly
//!
//! Both read modes share one core sequence: reshape the stacked file
//! axis into separated table axes, permute so each merge axis's table
//! copy sits next to its in-file copy, then reshape down to the planned
//! chunk extents. The immediate path runs it once over the whole scene;
//! the lazy path runs it per file group and leaves the grid assembly to
//! the [`crate::lazy`] runtime.

use crate::dimensions::AxisSizes;
use crate::errors::Result;
use crate::file_table::SceneTable;
use crate::lazy::LazyChunk;
use crate::sizing;
use crate::tiff_io;
use log::debug;
use ndarray::{ArrayD, IxDyn};

/// reshape → permute → reshape-to-target, the shared core sequence.
///
/// `reshape` separates the stacked leading axis into its contributing
/// table axes; `order` is the interleaving permutation from
/// [`sizing::axes_order`]; `target` collapses adjacent merge-axis pairs
/// into their final extents.
///
/// # Errors
///
/// A layout violating the Cartesian-product invariant surfaces here as
/// an [`ndarray::ShapeError`], unmodified.
pub fn reorder_stack(
    stacked: ArrayD<f32>,
    reshape: &[usize],
    order: &[usize],
    target: &[usize],
) -> Result<ArrayD<f32>> {
    let unpacked = stacked.into_shape(IxDyn(reshape))?;
    let permuted = unpacked.permuted_axes(IxDyn(order));
    let relaid = permuted.as_standard_layout().into_owned();
    Ok(relaid.into_shape(IxDyn(target))?)
}

/// Everything the assembly of one scene needs, derived once per read
#[derive(Debug, Clone)]
pub struct ScenePlan {
    /// Grouping axes, in column order
    pub group_axes: Vec<String>,
    /// Distinct counts of the grouping axes
    pub group_sizes: AxisSizes,
    /// Chunk-resident extents, in assembly order
    pub chunk_sizes: AxisSizes,
    /// Table axes unpacked out of the stacked file axis
    pub unpack_sizes: AxisSizes,
    /// Interleaving permutation over unpacked + in-file axes
    pub axes_order: Vec<usize>,
    /// Block-grid extents padded with singletons
    pub expanded_blocks: AxisSizes,
    /// Per-chunk extents padded with singletons
    pub expanded_chunks: AxisSizes,
}

impl ScenePlan {
    /// Plan one scene against the single-file shape and chunk axis set
    pub fn new(scene: &SceneTable, single_file: &AxisSizes, chunk_axes: &[String]) -> Self {
        let nunique = scene.nunique();
        let group_axes = sizing::group_axes(scene, chunk_axes);
        let group_sizes = sizing::group_sizes(&nunique, &group_axes);
        let chunk_sizes = sizing::chunk_sizes(&nunique, &group_axes, single_file, chunk_axes);
        let unpack_sizes = sizing::unpack_sizes(&nunique, &chunk_sizes, &group_axes);
        let axes_order = sizing::axes_order(&chunk_sizes, &unpack_sizes, single_file);
        let (expanded_blocks, expanded_chunks) = sizing::expanded_shapes(&group_sizes, &chunk_sizes);

        debug!(
            "scene plan: groups {:?}, chunk {:?}, unpack {:?}",
            group_sizes, chunk_sizes, unpack_sizes
        );

        ScenePlan {
            group_axes,
            group_sizes,
            chunk_sizes,
            unpack_sizes,
            axes_order,
            expanded_blocks,
            expanded_chunks,
        }
    }

    /// The shape the stacked per-group array is first separated into
    fn reshape_extents(&self, single_file: &AxisSizes) -> Vec<usize> {
        let mut extents = self.unpack_sizes.extents();
        extents.extend(single_file.extents());
        extents
    }
}

/// Decode and assemble a whole scene as one array.
///
/// The scene is planned with an empty grouping set, so the chunk plan
/// covers the full per-scene extents. Returns the array together with
/// its dimension names in assembly order.
pub fn assemble_immediate(
    scene: &SceneTable,
    single_file: &AxisSizes,
    chunk_axes: &[String],
) -> Result<(ArrayD<f32>, Vec<String>)> {
    let nunique = scene.nunique();
    let full = sizing::chunk_sizes(&nunique, &[], single_file, chunk_axes);
    let unpack = sizing::unpack_sizes(&nunique, &full, &[]);
    let order = sizing::axes_order(&full, &unpack, single_file);

    let mut reshape = unpack.extents();
    reshape.extend(single_file.extents());

    let stacked = tiff_io::read_sequence(&scene.paths())?;
    let assembled = reorder_stack(stacked, &reshape, &order, &full.extents())?;
    Ok((assembled, full.names()))
}

/// Build the lazy chunk grid for a scene.
///
/// Files are partitioned by grouping-axis value combinations; each
/// group becomes one deferred [`LazyChunk`] shaped to the expanded
/// per-chunk extents, addressed in the expanded block grid by the rank
/// of each grouping value among that axis's sorted distinct values.
/// A scene without grouping axes yields a single chunk covering it.
pub fn build_chunks(
    scene: &SceneTable,
    plan: &ScenePlan,
    single_file: &AxisSizes,
) -> Vec<LazyChunk> {
    let reshape = plan.reshape_extents(single_file);
    let chunk_shape = plan.expanded_chunks.extents();

    // Rank lookup per grouping axis
    let ranks: Vec<Vec<i64>> = plan
        .group_axes
        .iter()
        .map(|a| scene.distinct_values(a))
        .collect();

    let mut chunks = Vec::new();
    for (key, paths) in scene.group_by(&plan.group_axes) {
        let grid_index: Vec<usize> = plan
            .expanded_blocks
            .iter()
            .map(|(dim, _)| {
                match plan.group_axes.iter().position(|a| a == dim) {
                    Some(g) => ranks[g]
                        .iter()
                        .position(|v| *v == key[g])
                        .expect("group key value is a distinct value of its axis"),
                    None => 0,
                }
            })
            .collect();

        chunks.push(LazyChunk::new(
            paths,
            reshape.clone(),
            plan.axes_order.clone(),
            chunk_shape.clone(),
            grid_index,
        ));
    }

    debug!(
        "scene partitioned into {} chunks over grid {:?}",
        chunks.len(),
        plan.expanded_blocks
    );
    chunks
}
