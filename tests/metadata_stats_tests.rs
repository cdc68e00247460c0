//! Block metadata, execution stats and batch-format resolution.


use std::time::Duration;

use strata_block::{merge_sorted_blocks, Block, SortKey};
use strata_core::config::BlockConfig;
use strata_core::format::{apply_batch_format, apply_batch_size, BatchFormat, BatchSize};
use strata_core::metadata::BlockMetadata;
use strata_core::runtime::node_id;
use strata_core::stats::ExecStats;
use test_data_gen::{grouped_rows, people_blocks};

#[test]
fn test_unknown_metadata_keeps_unknowns() {
    let meta = BlockMetadata::unknown(None);
    assert_eq!(meta.num_rows, None);
    assert_eq!(meta.size_bytes, None);
    assert!(meta.input_files.is_empty());
    assert!(!meta.exceeds_target_size(&BlockConfig::default()));
}

#[test]
fn test_size_bytes_normalisation() {
    let meta = BlockMetadata::unknown(None).with_size_bytes(1024i64).unwrap();
    assert_eq!(meta.size_bytes, Some(1024));
    assert!(BlockMetadata::unknown(None).with_size_bytes(-1i32).is_err());

    let cfg = BlockConfig {
        target_max_block_size: 100,
        ..BlockConfig::default()
    };
    assert!(meta.exceeds_target_size(&cfg));
}

#[test]
fn test_metadata_serializes() {
    let [arrow, _] = people_blocks(3);
    let meta = arrow
        .accessor()
        .get_metadata(None, Some(ExecStats::builder().build()));
    let json = serde_json::to_string(&meta).unwrap();
    let back: BlockMetadata = serde_json::from_str(&json).unwrap();
    assert_eq!(back, meta);
}

#[test]
fn test_exec_stats_measure_work() {
    let mut builder = ExecStats::builder().with_task_idx(3);
    let answer = builder.time_udf(|| {
        std::thread::sleep(Duration::from_millis(5));
        42
    });
    assert_eq!(answer, 42);
    let stats = builder.build();

    assert_eq!(stats.task_idx, Some(3));
    assert_eq!(stats.node_id, node_id());
    assert!(stats.udf_time_s >= 0.005);
    let wall = stats.wall_time_s.unwrap();
    assert!(wall >= stats.udf_time_s);
    let (start, end) = (stats.start_time_s.unwrap(), stats.end_time_s.unwrap());
    assert!(end >= start);
    assert!((end - start - wall).abs() < 1e-3);
    assert!(stats.cpu_time_s.map_or(true, |cpu| cpu >= 0.0));
    assert!(stats.max_rss_bytes > 0);
}

#[test]
fn test_merge_reports_exec_stats() {
    let rows = grouped_rows(30, 3, 5);
    let key = SortKey::ascending(["k"]);
    let sorted = Block::Pandas(rows)
        .accessor()
        .sort_and_partition(&[], &key)
        .unwrap();
    let (_, meta) = merge_sorted_blocks(&sorted, &key).unwrap();
    let stats = meta.exec_stats.unwrap();
    assert!(stats.wall_time_s.is_some());
    assert!(!stats.node_id.is_empty());
}

#[test]
fn test_batch_format_and_size_resolution() {
    let cfg = BlockConfig::default();
    assert_eq!(apply_batch_format(None, &cfg).unwrap(), None);
    assert_eq!(
        apply_batch_format(Some("default"), &cfg).unwrap(),
        Some(BatchFormat::Numpy)
    );
    assert_eq!(
        apply_batch_format(Some("pyarrow"), &cfg).unwrap(),
        Some(BatchFormat::PyArrow)
    );
    assert!(apply_batch_format(Some("xml"), &cfg).is_err());

    assert_eq!(apply_batch_size(None, &cfg), None);
    assert_eq!(apply_batch_size(Some(BatchSize::Default), &cfg), Some(4096));
    assert_eq!(
        apply_batch_size(Some(BatchSize::rows(10).unwrap()), &cfg),
        Some(10)
    );
    assert!(BatchSize::rows(0).is_err());
}
