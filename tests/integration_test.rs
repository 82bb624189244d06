//! Integration tests over real TIFF files
//!
//! Fixtures are written into temp directories through `tiff::encoder`,
//! then assembled back through the reader, so every test exercises the
//! whole pipeline: glob/indexing, planning, decoding, assembly, labels.

use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::tempdir;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;
use tiffglob::indexing::{CoordFrame, FileSource, Indexer};
use tiffglob::metadata::ChannelNames;
use tiffglob::{DimOrder, GlobReader, GlobReaderConfig, TiffGlobError};

/// Write a single grayscale plane filled with one constant value
fn write_plane(path: &Path, width: usize, height: usize, value: u16) {
    let data = vec![value; width * height];
    let mut file = File::create(path).expect("Failed to create TIFF file");
    let mut tiff = TiffEncoder::new(&mut file).expect("Failed to create encoder");
    tiff.write_image::<colortype::Gray16>(width as u32, height as u32, &data)
        .expect("Failed to write image");
}

/// Write a multi-page grayscale file, one constant value per page
fn write_pages(path: &Path, width: usize, height: usize, page_values: &[u16]) {
    let mut file = File::create(path).expect("Failed to create TIFF file");
    let mut tiff = TiffEncoder::new(&mut file).expect("Failed to create encoder");
    for value in page_values {
        let data = vec![*value; width * height];
        tiff.write_image::<colortype::Gray16>(width as u32, height as u32, &data)
            .expect("Failed to write page");
    }
}

/// The concrete S/T/C/Z scenario: one constant-valued plane per file,
/// value = s*1000 + t*100 + c*10 + z
fn write_scenario(
    dir: &Path,
    scenes: usize,
    times: usize,
    channels: usize,
    depths: usize,
    width: usize,
    height: usize,
) {
    for s in 0..scenes {
        for t in 0..times {
            for c in 0..channels {
                for z in 0..depths {
                    let value = (s * 1000 + t * 100 + c * 10 + z) as u16;
                    let name = format!("S{}_T{}_C{}_Z{}.tif", s, t, c, z);
                    write_plane(&dir.join(name), width, height, value);
                }
            }
        }
    }
}

fn pattern(dir: &Path) -> String {
    dir.join("*.tif").to_string_lossy().to_string()
}

#[test]
fn test_concrete_scenario() {
    // 2 timepoints x 2 channels x 3 depths, single scene, 512x512 planes
    let temp_dir = tempdir().expect("Failed to create temp dir");
    write_scenario(temp_dir.path(), 1, 2, 2, 3, 512, 512);

    let reader = GlobReader::from_glob(&pattern(temp_dir.path())).expect("Failed to construct");
    assert_eq!(reader.scenes(), &["Image:0".to_string()]);
    assert_eq!(reader.file_table().len(), 12);

    let image = reader.read(0).expect("Failed to read scene");
    assert_eq!(
        image.dims(),
        &["T".to_string(), "C".to_string(), "Z".to_string(), "Y".to_string(), "X".to_string()]
    );
    assert_eq!(image.shape(), &[2, 2, 3, 512, 512]);

    // Default channel identifiers, one per channel
    assert_eq!(
        image.coords("C").expect("channel coords"),
        &["Channel:0:0".to_string(), "Channel:0:1".to_string()]
    );

    // Every file landed on its (t, c, z) coordinate
    for t in 0..2 {
        for c in 0..2 {
            for z in 0..3 {
                let expected = (t * 100 + c * 10 + z) as f32;
                assert_eq!(image.data()[[t, c, z, 0, 0]], expected);
                assert_eq!(image.data()[[t, c, z, 511, 511]], expected);
            }
        }
    }
}

#[test]
fn test_multi_scene() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    write_scenario(temp_dir.path(), 2, 2, 2, 3, 16, 16);

    let reader = GlobReader::from_glob(&pattern(temp_dir.path())).expect("Failed to construct");
    assert_eq!(reader.scene_count(), 2);
    assert_eq!(reader.scenes(), &["Image:0".to_string(), "Image:1".to_string()]);
    assert_eq!(reader.file_table().len(), 24);

    // Scene 1 must only include files whose S column equals 1
    let image = reader.read(1).expect("Failed to read scene 1");
    assert_eq!(image.shape(), &[2, 2, 3, 16, 16]);
    for t in 0..2 {
        for c in 0..2 {
            for z in 0..3 {
                let expected = (1000 + t * 100 + c * 10 + z) as f32;
                assert_eq!(image.data()[[t, c, z, 8, 8]], expected);
            }
        }
    }

    // Scene 1 gets scene-1 channel identifiers
    assert_eq!(
        image.coords("C").expect("channel coords"),
        &["Channel:1:0".to_string(), "Channel:1:1".to_string()]
    );
}

#[test]
fn test_read_is_idempotent() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    write_scenario(temp_dir.path(), 1, 2, 2, 2, 16, 16);

    let reader = GlobReader::from_glob(&pattern(temp_dir.path())).expect("Failed to construct");
    let first = reader.read(0).expect("first read");
    let second = reader.read(0).expect("second read");

    assert_eq!(first.data(), second.data());
    assert_eq!(first.dims(), second.dims());
    assert_eq!(first.coords("C"), second.coords("C"));
}

#[test]
fn test_lazy_matches_immediate() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    write_scenario(temp_dir.path(), 1, 2, 2, 3, 16, 16);

    let reader = GlobReader::from_glob(&pattern(temp_dir.path())).expect("Failed to construct");

    let lazy = reader.read_lazy(0).expect("Failed to plan lazy read");
    // Grouped by T and C, chunked over Z/Y/X: one chunk per (t, c)
    assert_eq!(lazy.chunk_count(), 4);
    assert_eq!(lazy.grid_shape(), &[2, 2, 1, 1, 1]);
    assert_eq!(lazy.chunk_shape(), &[1, 1, 3, 16, 16]);
    assert_eq!(lazy.shape(), vec![2, 2, 3, 16, 16]);

    let materialized = lazy.materialize().expect("Failed to materialize");
    let immediate = reader.read(0).expect("Failed to read");

    assert_eq!(materialized.dims(), immediate.dims());
    assert_eq!(materialized.data(), immediate.data());
    assert_eq!(materialized.coords("C"), immediate.coords("C"));
}

#[test]
fn test_lazy_chunk_access() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    write_scenario(temp_dir.path(), 1, 2, 1, 3, 8, 8);

    let reader = GlobReader::from_glob(&pattern(temp_dir.path())).expect("Failed to construct");
    let lazy = reader.read_lazy(0).expect("Failed to plan lazy read");

    // One chunk per timepoint; each one computes independently
    assert_eq!(lazy.chunk_count(), 2);
    assert_eq!(lazy.chunk_shape(), &[1, 1, 3, 8, 8]);
    for chunk in lazy.chunks() {
        assert_eq!(chunk.paths().len(), 3);
        let arr = chunk.compute().expect("Failed to compute chunk");
        assert_eq!(arr.shape(), &[3, 8, 8]);

        let t = chunk.grid_index()[0];
        for z in 0..3 {
            let expected = (t * 100 + z) as f32;
            assert_eq!(arr[[z, 4, 4]], expected);
        }
    }
}

#[test]
fn test_merge_axis_multipage_files() {
    // Two timepoints, each file a 3-page z-stack: the Z axis merges the
    // in-file pages with the (constant) table column.
    let temp_dir = tempdir().expect("Failed to create temp dir");
    for t in 0..2u16 {
        let name = format!("S0_T{}_C0_Z0.tif", t);
        write_pages(&temp_dir.path().join(name), 8, 8, &[t * 100, t * 100 + 10, t * 100 + 20]);
    }

    let config = GlobReaderConfig {
        single_file_axes: vec!["Z".to_string(), "Y".to_string(), "X".to_string()],
        ..Default::default()
    };
    let reader = GlobReader::new(
        FileSource::Pattern(pattern(temp_dir.path())),
        Indexer::default(),
        config,
    )
    .expect("Failed to construct");

    let plan = reader.sizing_plan(0).expect("plan");
    assert_eq!(plan.get("Z"), Some(3));

    let image = reader.read(0).expect("Failed to read");
    assert_eq!(image.shape(), &[2, 1, 3, 8, 8]);
    for t in 0..2 {
        for z in 0..3 {
            let expected = (t * 100 + z * 10) as f32;
            assert_eq!(image.data()[[t, 0, z, 0, 0]], expected);
        }
    }

    // The lazy path agrees
    let materialized = reader
        .read_lazy(0)
        .expect("lazy plan")
        .materialize()
        .expect("materialize");
    assert_eq!(materialized.data(), image.data());
}

#[test]
fn test_interleaved_channel_merge() {
    // Channels split across files (C column 0..1) and within files
    // (3 pages per file declared as C), plus a varying Z column. The
    // realized channel axis interleaves table-major: index = ct*3 + cf.
    let temp_dir = tempdir().expect("Failed to create temp dir");
    for c in 0..2u16 {
        for z in 0..2u16 {
            let name = format!("S0_T0_C{}_Z{}.tif", c, z);
            let values = [c * 1000 + z * 100, c * 1000 + z * 100 + 10, c * 1000 + z * 100 + 20];
            write_pages(&temp_dir.path().join(name), 4, 4, &values);
        }
    }

    let config = GlobReaderConfig {
        single_file_axes: vec!["C".to_string(), "Y".to_string(), "X".to_string()],
        ..Default::default()
    };
    let reader = GlobReader::new(
        FileSource::Pattern(pattern(temp_dir.path())),
        Indexer::default(),
        config,
    )
    .expect("Failed to construct");

    let plan = reader.sizing_plan(0).expect("plan");
    assert_eq!(plan.get("C"), Some(6));
    assert_eq!(plan.get("Z"), Some(2));

    let image = reader.read(0).expect("Failed to read");
    assert_eq!(
        image.dims(),
        &["T".to_string(), "C".to_string(), "Z".to_string(), "Y".to_string(), "X".to_string()]
    );
    assert_eq!(image.shape(), &[1, 6, 2, 4, 4]);

    for ct in 0..2 {
        for cf in 0..3 {
            for z in 0..2 {
                let expected = (ct * 1000 + z * 100 + cf * 10) as f32;
                assert_eq!(image.data()[[0, ct * 3 + cf, z, 1, 1]], expected);
            }
        }
    }

    // Round-trip through the lazy grid (C is both grouped and in-file
    // here, exercising the expanded-shape placement)
    let lazy = reader.read_lazy(0).expect("lazy plan");
    let materialized = lazy.materialize().expect("materialize");
    assert_eq!(materialized.dims(), image.dims());
    assert_eq!(materialized.data(), image.data());
}

#[test]
fn test_grouped_depth_chunks() {
    // Chunk only over Y/X: every (T, C, Z) combination becomes its own
    // unit of work.
    let temp_dir = tempdir().expect("Failed to create temp dir");
    write_scenario(temp_dir.path(), 1, 2, 2, 3, 16, 16);

    let config = GlobReaderConfig {
        chunk_axes: vec!["Y".to_string(), "X".to_string()],
        ..Default::default()
    };
    let reader = GlobReader::new(
        FileSource::Pattern(pattern(temp_dir.path())),
        Indexer::default(),
        config,
    )
    .expect("Failed to construct");

    let lazy = reader.read_lazy(0).expect("lazy plan");
    assert_eq!(lazy.chunk_count(), 12);
    assert_eq!(lazy.grid_shape(), &[2, 2, 3, 1, 1]);

    let materialized = lazy.materialize().expect("materialize");
    let immediate = reader.read(0).expect("read");
    assert_eq!(materialized.data(), immediate.data());
    assert_eq!(materialized.shape(), &[2, 2, 3, 16, 16]);
}

#[test]
fn test_conservation_law() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    write_scenario(temp_dir.path(), 2, 2, 2, 3, 16, 16);

    let reader = GlobReader::from_glob(&pattern(temp_dir.path())).expect("Failed to construct");
    let file_elements = reader.single_file_sizes().element_count();

    for scene in 0..reader.scene_count() {
        let plan = reader.sizing_plan(scene).expect("plan");
        // 12 files per scene, one 16x16 plane each
        assert_eq!(plan.element_count(), 12 * file_elements);
    }
}

#[test]
fn test_channel_names() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    write_scenario(temp_dir.path(), 1, 1, 2, 1, 8, 8);

    // A matching flat list is applied as the channel coordinates
    let config = GlobReaderConfig {
        channel_names: ChannelNames::Flat(vec!["DAPI".to_string(), "GFP".to_string()]),
        ..Default::default()
    };
    let reader = GlobReader::new(
        FileSource::Pattern(pattern(temp_dir.path())),
        Indexer::default(),
        config,
    )
    .expect("Failed to construct");
    let image = reader.read(0).expect("read");
    assert_eq!(
        image.coords("C").expect("channel coords"),
        &["DAPI".to_string(), "GFP".to_string()]
    );

    // A length mismatch surfaces at read time
    let config = GlobReaderConfig {
        channel_names: ChannelNames::Flat(vec![
            "a".to_string(),
            "b".to_string(),
            "c".to_string(),
        ]),
        ..Default::default()
    };
    let reader = GlobReader::new(
        FileSource::Pattern(pattern(temp_dir.path())),
        Indexer::default(),
        config,
    )
    .expect("Failed to construct");
    let err = reader.read(0).unwrap_err();
    assert!(matches!(err, TiffGlobError::ConflictingArguments(_)));

    // A per-scene list with the wrong outer length fails at construction
    let config = GlobReaderConfig {
        channel_names: ChannelNames::PerScene(vec![
            vec!["a".to_string()],
            vec!["b".to_string()],
        ]),
        ..Default::default()
    };
    let err = GlobReader::new(
        FileSource::Pattern(pattern(temp_dir.path())),
        Indexer::default(),
        config,
    )
    .unwrap_err();
    assert!(matches!(err, TiffGlobError::ConflictingArguments(_)));
}

#[test]
fn test_channel_names_without_channel_axis() {
    // Using C as the scene column removes the channel axis from every
    // scene, so supplying channel names must fail.
    let temp_dir = tempdir().expect("Failed to create temp dir");
    write_scenario(temp_dir.path(), 1, 1, 2, 1, 8, 8);

    let config = GlobReaderConfig {
        scene_axis: "C".to_string(),
        channel_names: ChannelNames::Flat(vec!["DAPI".to_string()]),
        ..Default::default()
    };
    let reader = GlobReader::new(
        FileSource::Pattern(pattern(temp_dir.path())),
        Indexer::default(),
        config,
    )
    .expect("Failed to construct");
    assert_eq!(reader.scene_count(), 2);

    let err = reader.read(0).unwrap_err();
    assert!(matches!(err, TiffGlobError::ConflictingArguments(_)));
}

#[test]
fn test_explicit_dim_order() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    write_scenario(temp_dir.path(), 1, 2, 2, 3, 8, 8);

    let config = GlobReaderConfig {
        dim_order: DimOrder::same("ZCTYX"),
        ..Default::default()
    };
    let reader = GlobReader::new(
        FileSource::Pattern(pattern(temp_dir.path())),
        Indexer::default(),
        config,
    )
    .expect("Failed to construct");

    let image = reader.read(0).expect("read");
    assert_eq!(
        image.dims(),
        &["Z".to_string(), "C".to_string(), "T".to_string(), "Y".to_string(), "X".to_string()]
    );
    assert_eq!(image.shape(), &[3, 2, 2, 8, 8]);
    // value = t*100 + c*10 + z, now indexed [z, c, t, y, x]
    assert_eq!(image.data()[[2, 1, 0, 0, 0]], 12.0);
    assert_eq!(image.data()[[0, 0, 1, 0, 0]], 100.0);
}

#[test]
fn test_rgb_samples_axis() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("S0_T0_C0_Z0.tif");
    let mut data = Vec::with_capacity(4 * 4 * 3);
    for _ in 0..16 {
        data.extend_from_slice(&[10u8, 20, 30]);
    }
    let mut file = File::create(&path).expect("Failed to create TIFF file");
    let mut tiff = TiffEncoder::new(&mut file).expect("Failed to create encoder");
    tiff.write_image::<colortype::RGB8>(4, 4, &data)
        .expect("Failed to write image");

    // The probed shape has rank 3, so the default Y/X axes are rejected
    let err = GlobReader::from_glob(&pattern(temp_dir.path())).unwrap_err();
    assert!(matches!(err, TiffGlobError::ConflictingArguments(_)));

    let config = GlobReaderConfig {
        single_file_axes: vec!["Y".to_string(), "X".to_string(), "S".to_string()],
        ..Default::default()
    };
    let reader = GlobReader::new(
        FileSource::Pattern(pattern(temp_dir.path())),
        Indexer::default(),
        config,
    )
    .expect("Failed to construct");

    let image = reader.read(0).expect("read");
    assert_eq!(
        image.dims(),
        &[
            "T".to_string(),
            "C".to_string(),
            "Z".to_string(),
            "Y".to_string(),
            "X".to_string(),
            "S".to_string()
        ]
    );
    assert_eq!(image.shape(), &[1, 1, 1, 4, 4, 3]);
    assert_eq!(image.data()[[0, 0, 0, 2, 2, 0]], 10.0);
    assert_eq!(image.data()[[0, 0, 0, 2, 2, 1]], 20.0);
    assert_eq!(image.data()[[0, 0, 0, 2, 2, 2]], 30.0);
}

#[test]
fn test_description_and_tags() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("S0_T0_C0_Z0.tif");
    let data = vec![7u16; 8 * 8];
    {
        let mut file = File::create(&path).expect("Failed to create TIFF file");
        let mut tiff = TiffEncoder::new(&mut file).expect("Failed to create encoder");
        let mut image = tiff
            .new_image::<colortype::Gray16>(8, 8)
            .expect("Failed to start image");
        image
            .encoder()
            .write_tag(Tag::ImageDescription, "acquisition notes")
            .expect("Failed to write tag");
        image.write_data(&data).expect("Failed to write data");
    }

    let reader = GlobReader::from_glob(&pattern(temp_dir.path())).expect("Failed to construct");
    let image = reader.read(0).expect("read");

    assert_eq!(image.attrs().description.as_deref(), Some("acquisition notes"));
    // The raw tag table carries at least the geometry and the
    // description verbatim
    assert_eq!(image.attrs().tags.get(&256), Some(&serde_json::json!(8)));
    assert_eq!(image.attrs().tags.get(&257), Some(&serde_json::json!(8)));
    assert_eq!(
        image.attrs().tags.get(&270),
        Some(&serde_json::json!("acquisition notes"))
    );

    // Files without a description still read fine
    let temp_dir2 = tempdir().expect("Failed to create temp dir");
    write_scenario(temp_dir2.path(), 1, 1, 1, 1, 8, 8);
    let reader = GlobReader::from_glob(&pattern(temp_dir2.path())).expect("Failed to construct");
    let image = reader.read(0).expect("read");
    assert!(image.attrs().description.is_none());
    assert!(!image.attrs().tags.is_empty());
}

#[test]
fn test_unsupported_format() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("S0_T0_C0_Z0.tif");
    std::fs::write(&path, b"this is not a tiff").expect("Failed to write file");

    let err = GlobReader::from_glob(&pattern(temp_dir.path())).unwrap_err();
    assert!(matches!(err, TiffGlobError::UnsupportedFormat { .. }));
}

#[test]
fn test_empty_sources() {
    let temp_dir = tempdir().expect("Failed to create temp dir");

    let err = GlobReader::from_glob(&pattern(temp_dir.path())).unwrap_err();
    assert!(matches!(err, TiffGlobError::Argument(_)));

    let err = GlobReader::from_paths(Vec::new()).unwrap_err();
    assert!(matches!(err, TiffGlobError::Argument(_)));
}

#[test]
fn test_scene_index_out_of_range() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    write_scenario(temp_dir.path(), 1, 1, 1, 1, 8, 8);

    let reader = GlobReader::from_glob(&pattern(temp_dir.path())).expect("Failed to construct");
    let err = reader.read(5).unwrap_err();
    assert!(matches!(err, TiffGlobError::Argument(_)));
}

#[test]
fn test_single_file_axes_rank_mismatch() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    write_scenario(temp_dir.path(), 1, 1, 1, 1, 8, 8);

    // Three declared axes against a probed rank-2 plane
    let config = GlobReaderConfig {
        single_file_axes: vec!["Z".to_string(), "Y".to_string(), "X".to_string()],
        ..Default::default()
    };
    let err = GlobReader::new(
        FileSource::Pattern(pattern(temp_dir.path())),
        Indexer::default(),
        config,
    )
    .unwrap_err();
    assert!(matches!(err, TiffGlobError::ConflictingArguments(_)));
}

#[test]
fn test_micro_manager_layout() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    for c in 0..2u16 {
        let name = format!("img_channel00{}_position000_time000000000_z000.tif", c);
        write_plane(&temp_dir.path().join(name), 8, 8, c * 10 + 5);
    }

    let reader = GlobReader::new(
        FileSource::Pattern(pattern(temp_dir.path())),
        Indexer::micro_manager(),
        GlobReaderConfig::default(),
    )
    .expect("Failed to construct");

    assert_eq!(reader.scene_count(), 1);
    let image = reader.read(0).expect("read");
    assert_eq!(image.shape(), &[1, 2, 1, 8, 8]);
    assert_eq!(image.data()[[0, 0, 0, 0, 0]], 5.0);
    assert_eq!(image.data()[[0, 1, 0, 0, 0]], 15.0);
}

#[test]
fn test_prebuilt_coordinate_frame() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let mut paths: Vec<PathBuf> = Vec::new();
    for (i, name) in ["alpha.tif", "beta.tif"].iter().enumerate() {
        let path = temp_dir.path().join(name);
        write_plane(&path, 8, 8, (i * 100) as u16);
        paths.push(path);
    }

    // Filenames carry no indices at all; the frame supplies them
    let frame = CoordFrame::new(
        vec!["S".to_string(), "T".to_string()],
        vec![vec![0, 0], vec![0, 1]],
    )
    .expect("frame");

    let reader = GlobReader::new(
        FileSource::Paths(paths),
        Indexer::Table(frame),
        GlobReaderConfig::default(),
    )
    .expect("Failed to construct");

    let image = reader.read(0).expect("read");
    assert_eq!(image.shape(), &[2, 1, 1, 8, 8]);
    assert_eq!(image.data()[[0, 0, 0, 0, 0]], 0.0);
    assert_eq!(image.data()[[1, 0, 0, 0, 0]], 100.0);
}
