//! End-to-end hub builds: conversion, sidecars, merging and the compiled
//! hierarchy.

use std::collections::HashMap;
use std::fs;

use tracknado::{
    builder::SIDECAR_FILE_NAME,
    design::RowTags,
    extractors::from_parent_dirs,
    prelude::*,
    test_utilities::{random_table, touch, CopyConverter},
};

fn no_metadata() -> Vec<(String, String)> {
    Vec::new()
}

#[test]
fn test_composites_per_format_with_conversion() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    let chrom_sizes = touch(dir.path(), "hg38.chrom.sizes");
    let outdir = dir.path().join("hub");

    let tracks = vec![
        Track::new(touch(&data, "a.bigWig")).with_metadata("sample", "X"),
        Track::new(touch(&data, "b.bigWig")).with_metadata("sample", "Y"),
        Track::new(touch(&data, "c.bed")).with_metadata("sample", "X"),
    ];
    let built = HubBuilder::new()
        .add_track_records(tracks)
        .group_by(["sample"], false)
        .with_convert_files(true)
        .with_chrom_sizes(&chrom_sizes)
        .with_converter(CopyConverter)
        .build(&BuildOptions::new("HUB", "hg38", &outdir))
        .unwrap();

    let names: Vec<&str> = built
        .design
        .composites()
        .values()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["bigWig", "bigBed"]);
    for composite in built.design.composites().values() {
        assert_eq!(composite.dimension_string.as_deref(), Some("dimX=sample"));
        assert!(composite.supertrack.is_none());
    }
    assert!(built.design.supertracks().is_empty());

    let converted = &built.tracks[2];
    assert_eq!(converted.path, outdir.join("converted/c.bb"));
    assert_eq!(converted.format(), TrackFormat::BigBed);
    assert_eq!(converted.original_path, Some(data.join("c.bed")));

    let trackdb = fs::read_to_string(&built.staged.trackdb).unwrap();
    assert!(trackdb.contains("dimensions dimX=sample"));
    assert!(trackdb.contains("bigDataUrl c.bb"));
    assert!(built.report.is_empty(), "{:?}", built.report);
}

#[test]
fn test_merge_sidecars_into_supertracks() {
    let dir = tempfile::tempdir().unwrap();
    let mut sidecars = Vec::new();
    for assay in ["ATAC", "ChIP"] {
        let data = dir.path().join(assay);
        let outdir = dir.path().join(format!("{}_hub", assay));
        HubBuilder::new()
            .add_tracks(
                [touch(&data, "s1.bigWig"), touch(&data, "s2.bigWig")],
                [("assay", assay)],
            )
            .group_by(["assay"], true)
            .build(&BuildOptions::new(assay, "hg38", &outdir))
            .unwrap();
        sidecars.push(outdir.join(SIDECAR_FILE_NAME));
    }

    let mut builders = sidecars
        .iter()
        .map(|path| HubBuilder::from_json_file(path).unwrap());
    let first = builders.next().unwrap();
    let merged = first.merge(builders);
    assert_eq!(merged.supergroup_columns, vec!["assay"]);
    assert_eq!(merged.tracks.len(), 4);

    let design = merged.compile().unwrap();
    let supertracks: Vec<&str> = design
        .supertracks()
        .values()
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(supertracks, vec!["ATAC", "ChIP"]);
    assert_eq!(design.root_nodes().len(), 2);
    for supertrack in design.supertracks().values() {
        assert_eq!(supertrack.children.len(), 1);
    }
}

#[test]
fn test_sidecar_reproduces_hierarchy() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    let outdir = dir.path().join("hub");

    let builder = HubBuilder::new()
        .add_track_records([
            Track::new(touch(&data, "a.bigWig"))
                .with_metadata("cell", "K562")
                .with_metadata("mark", "CTCF"),
            Track::new(touch(&data, "b.bigWig"))
                .with_metadata("cell", "HeLa")
                .with_metadata("mark", "CTCF"),
            Track::new(touch(&data, "c.bigBed")).with_metadata("cell", "HeLa"),
        ])
        .group_by(["cell"], true)
        .group_by(["mark"], false)
        .overlay_by(["mark"])
        .color_by(["cell"], "set2");
    let built = builder
        .build(&BuildOptions::new("HUB", "hg38", &outdir))
        .unwrap();

    let restored = HubBuilder::from_json_file(outdir.join(SIDECAR_FILE_NAME)).unwrap();
    let design = restored.compile().unwrap();

    assert_eq!(design.root_nodes(), built.design.root_nodes());
    assert_eq!(design.tags(), built.design.tags());
    assert_eq!(design.to_groups(), built.design.to_groups());
}

#[test]
fn test_sidecar_with_extracted_axes_and_conversion() {
    let dir = tempfile::tempdir().unwrap();
    let chrom_sizes = touch(dir.path(), "hg38.chrom.sizes");
    let outdir = dir.path().join("hub");
    let atac = dir.path().join("ATAC");
    let chip = dir.path().join("ChIP");
    let peaks = touch(&chip, "peaks.bed");
    let assay = || from_parent_dirs(1, vec!["assay".to_string()]);

    let built = HubBuilder::new()
        .add_tracks(
            [touch(&atac, "s1.bigWig"), touch(&atac, "s2.bigWig")],
            [("sample", "S1")],
        )
        .add_tracks([touch(&chip, "s1.bigWig"), peaks.clone()], [("sample", "S2")])
        .with_metadata_extractor(assay())
        .group_by(["assay"], true)
        .group_by(["sample"], false)
        .color_by(["assay"], "tab10")
        .with_convert_files(true)
        .with_chrom_sizes(&chrom_sizes)
        .with_converter(CopyConverter)
        .build(&BuildOptions::new("HUB", "hg38", &outdir))
        .unwrap();
    let supertracks: Vec<&str> = built
        .design
        .supertracks()
        .values()
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(supertracks, vec!["ATAC", "ChIP"]);

    let restored = HubBuilder::from_json_file(outdir.join(SIDECAR_FILE_NAME)).unwrap();
    let converted = &restored.tracks[3];
    assert_eq!(converted.path, outdir.join("converted/peaks.bb"));
    assert_eq!(converted.original_path.as_ref(), Some(&peaks));

    let design = restored.with_metadata_extractor(assay()).compile().unwrap();
    assert_eq!(design.tags(), built.design.tags());
    assert_eq!(design.root_nodes(), built.design.root_nodes());
    assert_eq!(design.to_groups(), built.design.to_groups());

    // the converted track is filed under its source directory's assay
    let chip_groups = design.to_groups();
    let bigbed = chip_groups
        .subgroup("ChIP")
        .and_then(|group| group.subgroup("ChIP_bigBed"))
        .unwrap();
    assert_eq!(bigbed.tracks[0].original_path.as_ref(), Some(&peaks));
}

#[test]
fn test_overlays_only_hold_signal_tracks() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    let builder = HubBuilder::new()
        .add_tracks(
            [touch(&data, "a.bigWig"), touch(&data, "b.bigWig")],
            [("mark", "H3K27ac")],
        )
        .add_tracks([touch(&data, "peaks.bigBed")], [("mark", "H3K27ac")])
        .add_tracks([touch(&data, "other.bigWig")], no_metadata())
        .overlay_by(["mark"]);
    let built = builder
        .build(&BuildOptions::new("HUB", "hg38", dir.path().join("hub")))
        .unwrap();
    let design = &built.design;

    assert_eq!(design.overlays().len(), 1);
    let overlay = design.overlays().values().next().unwrap();
    assert_eq!(overlay.name, "H3K27ac_overlay");
    assert_eq!(overlay.subtracks, vec![0, 1]);

    // the bigBed keeps its overlay tag, is reported, and is left at the root
    assert_eq!(design.tags()[2].overlay, Some(overlay.key.clone()));
    assert!(design.tags()[3].overlay.is_none());
    assert_eq!(built.report.len(), 1);
    assert!(built.report.issues()[0].contains("peaks"));
    assert!(design.root_nodes().contains(&Node::Track(2)));
    assert!(design.root_nodes().contains(&Node::Track(3)));
}

#[test]
fn test_random_tables_compile_consistently() {
    let table = random_table(1000);
    let axes = GroupingAxes {
        supergroup_columns: vec!["assay".to_string()],
        group_columns: vec!["sample".to_string(), "mark".to_string()],
        overlay_columns: vec!["mark".to_string()],
        color_columns: vec!["sample".to_string()],
        ..Default::default()
    };
    let design = TrackDesign::compile(table, &axes).unwrap();

    // each row is in exactly one composite
    let placed: usize = design.composites().values().map(|c| c.subtracks.len()).sum();
    assert_eq!(placed, design.table().len());
    assert!(design.tags().iter().all(|tags| tags.composite.is_some()));

    // overlays only hold bigWig rows, each in at most one overlay
    let mut overlaid = vec![0; design.table().len()];
    for overlay in design.overlays().values() {
        for &index in &overlay.subtracks {
            assert_eq!(design.table().rows()[index].ext, TrackFormat::BigWig);
            overlaid[index] += 1;
        }
    }
    assert!(overlaid.iter().all(|&n| n <= 1));

    // every row with a mark is tagged with an overlay, bigWig or not
    for (row, tags) in design.table().rows().iter().zip(design.tags()) {
        assert_eq!(tags.overlay.is_some(), row.get("mark").is_some());
    }

    // composites sit under the SuperTrack of their rows
    for composite in design.composites().values() {
        for &index in &composite.subtracks {
            let RowTags { supertrack, .. } = design.row_tags(index).unwrap();
            assert_eq!(supertrack, &composite.supertrack);
        }
    }

    // rows with the same sample share a color
    let mut colors = HashMap::new();
    for (row, tags) in design.table().rows().iter().zip(design.tags()) {
        let color = tags.color.unwrap();
        assert_eq!(*colors.entry(row.get("sample")).or_insert(color), color);
    }
}
