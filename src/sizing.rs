//! Dimension sizing and chunk planning
//!
//! Given one scene's sub-table and the declared chunk axis set, these
//! functions partition axes into grouping axes (vary across files,
//! outside every chunk) and chunk axes (resident in every chunk), and
//! size each axis of the output. An axis present both in the table and
//! in the single-file shape is a merge axis: its extent is the product
//! of both occurrences, table-driven sizing taking priority.
//!
//! All plans are ordered [`AxisSizes`] sequences; order is part of the
//! contract the assembly engine builds arrays against.

use crate::dimensions::AxisSizes;
use crate::file_table::SceneTable;
use log::debug;

/// Table axes that partition a scene's files into lazy units of work:
/// every column outside the chunk axis set, in column order.
pub fn group_axes(scene: &SceneTable, chunk_axes: &[String]) -> Vec<String> {
    scene
        .columns()
        .iter()
        .filter(|c| !chunk_axes.contains(c))
        .cloned()
        .collect()
}

/// Distinct-value counts of the grouping axes, in grouping order
pub fn group_sizes(nunique: &[(String, usize)], group_axes: &[String]) -> AxisSizes {
    AxisSizes::from_pairs(
        group_axes
            .iter()
            .filter_map(|a| {
                nunique
                    .iter()
                    .find(|(n, _)| n == a)
                    .map(|(n, s)| (n.clone(), *s))
            })
            .collect::<Vec<_>>(),
    )
}

/// Extent of every chunk-resident axis, in assembly order.
///
/// Table columns outside the grouping set come first (column order),
/// sized by their distinct count, multiplied by the in-file extent for
/// merge axes. Single-file axes outside the chunk axis set and not yet
/// planned follow, then single-file axes absent from the table, all at
/// native extent.
pub fn chunk_sizes(
    nunique: &[(String, usize)],
    group_axes: &[String],
    single_file: &AxisSizes,
    chunk_axes: &[String],
) -> AxisSizes {
    let mut sizes = AxisSizes::new();

    for (name, count) in nunique {
        if group_axes.contains(name) {
            continue;
        }
        match single_file.get(name) {
            None => sizes.insert(name, *count),
            Some(file_extent) => sizes.insert(name, file_extent * count),
        }
    }

    for (name, extent) in single_file.iter() {
        if !chunk_axes.iter().any(|c| c == name) && !sizes.contains(name) {
            sizes.insert(name, extent);
        }
    }

    for (name, extent) in single_file.iter() {
        if !nunique.iter().any(|(n, _)| n == name) {
            sizes.insert(name, extent);
        }
    }

    sizes
}

/// The full per-scene extents: chunk sizing with an empty grouping set.
///
/// The product of these extents equals the scene's file count times the
/// single-file element count whenever the layout is a complete
/// Cartesian product.
pub fn sizing_plan(scene: &SceneTable, single_file: &AxisSizes, chunk_axes: &[String]) -> AxisSizes {
    chunk_sizes(&scene.nunique(), &[], single_file, chunk_axes)
}

/// Table axes that unpack out of the stacked file axis: chunk-resident
/// columns with their distinct counts, in column order.
pub fn unpack_sizes(
    nunique: &[(String, usize)],
    chunk: &AxisSizes,
    group_axes: &[String],
) -> AxisSizes {
    AxisSizes::from_pairs(
        nunique
            .iter()
            .filter(|(n, _)| chunk.contains(n) && !group_axes.contains(n))
            .map(|(n, s)| (n.clone(), *s))
            .collect::<Vec<_>>(),
    )
}

/// The interleaving permutation applied after the unpack reshape.
///
/// For every axis in chunk-plan order, emit its unpacked table position
/// first (if any), then its single-file position offset by the unpack
/// count. This leaves each merge axis's table copy adjacent to (and
/// ahead of) its in-file copy, so the final reshape collapses the pair.
pub fn axes_order(chunk: &AxisSizes, unpack: &AxisSizes, single_file: &AxisSizes) -> Vec<usize> {
    let mut order = Vec::with_capacity(unpack.len() + single_file.len());
    for (name, _) in chunk.iter() {
        if let Some(i) = unpack.index_of(name) {
            order.push(i);
        }
        if let Some(j) = single_file.index_of(name) {
            order.push(unpack.len() + j);
        }
    }
    order
}

/// Expand the block-grid and per-chunk shapes with singleton axes so a
/// grid of chunks concatenates into the full per-scene extents.
///
/// Placement is order-dependent: a grouping axis that is also
/// chunk-resident claims a grid position aligned with its chunk
/// position (padding every earlier chunk axis into the grid at extent
/// one); once any axis has claimed grid residency ahead of a pure
/// grouping axis, that axis and the rest of the chunk plan are spelled
/// out on the chunk side, grouping axes contributing singleton extents.
pub fn expanded_shapes(group: &AxisSizes, chunk: &AxisSizes) -> (AxisSizes, AxisSizes) {
    let mut blocks = AxisSizes::new();
    let mut chunks = AxisSizes::new();
    let chunk_names = chunk.names();

    for (i, (name, extent)) in group.iter().enumerate() {
        if chunk.contains(name) {
            if !blocks.contains(name) {
                let chunk_pos = chunk.index_of(name).expect("axis is in the chunk plan");
                for earlier in &chunk_names[..chunk_pos] {
                    if !blocks.contains(earlier) {
                        blocks.insert(earlier, 1);
                    }
                }
                blocks.insert(name, extent);
            }
        } else if blocks.len() <= i {
            blocks.insert(name, extent);
        } else {
            for placed in blocks.names() {
                chunks.insert(&placed, chunk.get(&placed).unwrap_or(1));
            }
            chunks.insert(name, 1);
            blocks.insert(name, extent);
            for (rest, rest_extent) in chunk.iter() {
                if !chunks.contains(rest) {
                    chunks.insert(rest, rest_extent);
                }
            }
        }
    }

    for (name, _) in chunk.iter() {
        if !blocks.contains(name) {
            blocks.insert(name, 1);
        }
    }

    if chunks.is_empty() {
        chunks = chunk.clone();
    }

    debug!(
        "expanded block grid {:?}, expanded chunk {:?}",
        blocks, chunks
    );
    (blocks, chunks)
}
