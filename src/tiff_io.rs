//! TIFF I/O operations
//!
//! The decoding collaborator: probing single-file shapes, decoding one
//! file or a whole file sequence into `ndarray`, and extracting the raw
//! tag table of a file's first page. Every decoded sample is widened to
//! `f32`, the crate's array currency.

use crate::errors::{Result, TiffGlobError};
use log::debug;
use ndarray::{ArrayD, IxDyn};
use rayon::prelude::*;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tiff::decoder::ifd::Value as TagValue;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tiff::ColorType;

/// TIFF tag code whose value is surfaced as the processed description
pub const IMAGE_DESCRIPTION_TAG: u16 = 270;

fn open_decoder(path: &Path) -> Result<Decoder<BufReader<File>>> {
    let file = File::open(path)?;
    let decoder = Decoder::new(BufReader::new(file))?;
    Ok(decoder.with_limits(Limits::unlimited()))
}

/// Whether `path` opens as a TIFF container
pub fn is_supported(path: &Path) -> bool {
    match File::open(path) {
        Ok(file) => Decoder::new(BufReader::new(file)).is_ok(),
        Err(_) => false,
    }
}

fn samples_per_pixel(color: ColorType) -> Result<usize> {
    match color {
        ColorType::Gray(_) => Ok(1),
        ColorType::GrayA(_) => Ok(2),
        ColorType::RGB(_) => Ok(3),
        ColorType::RGBA(_) => Ok(4),
        ColorType::CMYK(_) => Ok(4),
        other => Err(TiffGlobError::Argument(format!(
            "unsupported TIFF color type {:?}",
            other
        ))),
    }
}

fn decode_to_f32(decoded: DecodingResult) -> Vec<f32> {
    match decoded {
        DecodingResult::U8(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U16(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I8(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I16(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
    }
}

/// Shape of one decoded file without reading its pixels.
///
/// A single-page grayscale file probes as `[rows, cols]`; multi-page
/// files prepend the page count and multi-sample color types append the
/// samples extent, mirroring the axis layout [`read_image`] produces.
pub fn probe_shape(path: &Path) -> Result<Vec<usize>> {
    let mut decoder = open_decoder(path)?;
    let (width, height) = decoder.dimensions()?;
    let samples = samples_per_pixel(decoder.colortype()?)?;

    let mut pages = 1usize;
    while decoder.more_images() {
        decoder.next_image()?;
        pages += 1;
    }

    let mut shape = Vec::new();
    if pages > 1 {
        shape.push(pages);
    }
    shape.push(height as usize);
    shape.push(width as usize);
    if samples > 1 {
        shape.push(samples);
    }
    Ok(shape)
}

/// Decode one file into an `f32` array.
///
/// Pages are stacked along a leading axis when the file holds more than
/// one; multi-sample color types get a trailing samples axis.
///
/// # Errors
///
/// Fails when the file cannot be decoded or its pages disagree on shape.
pub fn read_image(path: &Path) -> Result<ArrayD<f32>> {
    let mut decoder = open_decoder(path)?;

    let mut page_shape: Option<Vec<usize>> = None;
    let mut data: Vec<f32> = Vec::new();
    let mut pages = 0usize;

    loop {
        let (width, height) = decoder.dimensions()?;
        let samples = samples_per_pixel(decoder.colortype()?)?;

        let mut shape = vec![height as usize, width as usize];
        if samples > 1 {
            shape.push(samples);
        }
        match &page_shape {
            None => page_shape = Some(shape),
            Some(expected) if *expected == shape => {}
            Some(expected) => {
                return Err(TiffGlobError::Argument(format!(
                    "page {} of {} has shape {:?}, expected {:?}",
                    pages,
                    path.display(),
                    shape,
                    expected
                )));
            }
        }

        data.extend(decode_to_f32(decoder.read_image()?));
        pages += 1;

        if !decoder.more_images() {
            break;
        }
        decoder.next_image()?;
    }

    let page_shape = page_shape.expect("at least one page was decoded");
    let mut shape = Vec::new();
    if pages > 1 {
        shape.push(pages);
    }
    shape.extend(page_shape);

    Ok(ArrayD::from_shape_vec(IxDyn(&shape), data)?)
}

/// Decode an ordered file sequence into one stacked array.
///
/// The result has shape `[paths.len(), file shape...]`; files decode in
/// parallel on the rayon pool but the stacking order is the input order.
///
/// # Errors
///
/// Fails when any file cannot be decoded or the files disagree on shape.
pub fn read_sequence(paths: &[std::path::PathBuf]) -> Result<ArrayD<f32>> {
    if paths.is_empty() {
        return Err(TiffGlobError::Argument(
            "cannot decode an empty file sequence".to_string(),
        ));
    }
    debug!("decoding a sequence of {} TIFF files", paths.len());

    let arrays: Vec<ArrayD<f32>> = paths
        .par_iter()
        .map(|p| read_image(p))
        .collect::<Result<Vec<_>>>()?;

    let file_shape = arrays[0].shape().to_vec();
    for (path, arr) in paths.iter().zip(arrays.iter()).skip(1) {
        if arr.shape() != file_shape.as_slice() {
            return Err(TiffGlobError::Argument(format!(
                "file {} has shape {:?}, expected {:?}",
                path.display(),
                arr.shape(),
                file_shape
            )));
        }
    }

    let mut shape = vec![arrays.len()];
    shape.extend(&file_shape);
    let mut data = Vec::with_capacity(shape.iter().product());
    for arr in arrays {
        data.extend(arr.into_raw_vec());
    }

    Ok(ArrayD::from_shape_vec(IxDyn(&shape), data)?)
}

fn tag_to_json(value: TagValue) -> JsonValue {
    match value {
        TagValue::Byte(v) => JsonValue::from(v),
        TagValue::Short(v) => JsonValue::from(v),
        TagValue::Signed(v) => JsonValue::from(v),
        TagValue::SignedBig(v) => JsonValue::from(v),
        TagValue::Unsigned(v) => JsonValue::from(v),
        TagValue::UnsignedBig(v) => JsonValue::from(v),
        TagValue::Float(v) => JsonValue::from(v),
        TagValue::Double(v) => JsonValue::from(v),
        TagValue::Rational(n, d) => JsonValue::from(vec![n, d]),
        TagValue::SRational(n, d) => JsonValue::from(vec![n, d]),
        // TIFF ASCII values are NUL-terminated on disk
        TagValue::Ascii(s) => JsonValue::from(s.trim_end_matches('\0')),
        TagValue::List(values) => {
            JsonValue::Array(values.into_iter().map(tag_to_json).collect())
        }
        other => JsonValue::from(format!("{:?}", other)),
    }
}

const CANDIDATE_TAGS: [Tag; 17] = [
    Tag::ImageWidth,
    Tag::ImageLength,
    Tag::BitsPerSample,
    Tag::Compression,
    Tag::PhotometricInterpretation,
    Tag::ImageDescription,
    Tag::StripOffsets,
    Tag::SamplesPerPixel,
    Tag::RowsPerStrip,
    Tag::StripByteCounts,
    Tag::XResolution,
    Tag::YResolution,
    Tag::ResolutionUnit,
    Tag::Software,
    Tag::DateTime,
    Tag::Orientation,
    Tag::SampleFormat,
];

/// Raw tag table of the first page of `path`.
///
/// Tags are returned verbatim, keyed by numeric tag code; tags absent
/// from the file are simply omitted.
pub fn read_tags(path: &Path) -> Result<BTreeMap<u16, JsonValue>> {
    let mut decoder = open_decoder(path)?;

    let mut tags = BTreeMap::new();
    for tag in CANDIDATE_TAGS {
        if let Some(value) = decoder.find_tag(tag)? {
            tags.insert(tag.to_u16(), tag_to_json(value));
        }
    }
    Ok(tags)
}
