//! Scene and channel identifiers, channel-name resolution
//!
//! Default axis labels are deterministic strings derived from numeric
//! indices; caller-supplied channel names are validated against the
//! realized channel extent of each scene.

use crate::dimensions::CHANNEL;
use crate::errors::{Result, TiffGlobError};
use std::collections::HashMap;

/// Deterministic scene identifier for a scene index
pub fn scene_id(scene_index: usize) -> String {
    format!("Image:{}", scene_index)
}

/// Deterministic channel identifier for a channel of a scene
pub fn channel_id(scene_index: usize, channel_index: usize) -> String {
    format!("Channel:{}:{}", scene_index, channel_index)
}

/// Caller-supplied channel names
#[derive(Debug, Clone, Default)]
pub enum ChannelNames {
    /// Synthesize deterministic identifiers
    #[default]
    None,
    /// One list applied to every scene
    Flat(Vec<String>),
    /// One list per scene; outer length must equal the scene count
    PerScene(Vec<Vec<String>>),
}

impl ChannelNames {
    /// Validate the outer list length against the scene count.
    ///
    /// # Errors
    ///
    /// Per-scene name lists whose count differs from the number of
    /// scenes fail with a conflicting-arguments error.
    pub fn validate_scene_count(&self, scene_count: usize) -> Result<()> {
        if let ChannelNames::PerScene(lists) = self {
            if lists.len() != scene_count {
                return Err(TiffGlobError::ConflictingArguments(format!(
                    "number of channel name lists ({}) does not match the number of scenes ({})",
                    lists.len(),
                    scene_count
                )));
            }
        }
        Ok(())
    }

    /// The names that apply to one scene, if any were supplied
    fn for_scene(&self, scene_index: usize) -> Option<&[String]> {
        match self {
            ChannelNames::None => None,
            ChannelNames::Flat(names) => Some(names),
            ChannelNames::PerScene(lists) => lists.get(scene_index).map(|l| l.as_slice()),
        }
    }
}

/// Resolve the channel names for one scene against its realized shape.
///
/// Returns `None` when no names were supplied (callers synthesize
/// defaults instead).
///
/// # Errors
///
/// Names supplied for a scene without a channel axis, or with a length
/// differing from the realized channel extent, fail with a
/// conflicting-arguments error naming the realized shape.
pub fn resolve_channel_names(
    channel_names: &ChannelNames,
    scene_index: usize,
    dims: &[String],
    shape: &[usize],
) -> Result<Option<Vec<String>>> {
    let supplied = match channel_names.for_scene(scene_index) {
        None => return Ok(None),
        Some(names) => names,
    };

    let channel_pos = match dims.iter().position(|d| d == CHANNEL) {
        Some(pos) => pos,
        None => {
            return Err(TiffGlobError::ConflictingArguments(format!(
                "channel names provided for a scene with no channel dimension; \
                 scene dims: {:?}, provided channel names: {:?}",
                dims, supplied
            )));
        }
    };

    if supplied.len() != shape[channel_pos] {
        return Err(TiffGlobError::ConflictingArguments(format!(
            "number of channel names provided ({}) does not match the size of the \
             channel dimension; scene shape: {:?}, dims: {:?}, provided channel names: {:?}",
            supplied.len(),
            shape,
            dims,
            supplied
        )));
    }

    Ok(Some(supplied.to_vec()))
}

/// Coordinate labels for one scene: the resolved channel names, or
/// synthesized channel identifiers when none were supplied.
pub fn scene_coords(
    resolved: Option<Vec<String>>,
    scene_index: usize,
    dims: &[String],
    shape: &[usize],
) -> HashMap<String, Vec<String>> {
    let mut coords = HashMap::new();
    match resolved {
        Some(names) => {
            coords.insert(CHANNEL.to_string(), names);
        }
        None => {
            if let Some(pos) = dims.iter().position(|d| d == CHANNEL) {
                let ids = (0..shape[pos]).map(|i| channel_id(scene_index, i)).collect();
                coords.insert(CHANNEL.to_string(), ids);
            }
        }
    }
    coords
}
