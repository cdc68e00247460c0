//! Multi-block sort and grouped aggregation, checked against a single pass
//! over the whole input.


use std::collections::BTreeMap;
use std::sync::Arc;

use strata_block::{
    aggregate_combined_blocks, for_block, merge_sorted_blocks, AggregateFn, Block, Count, Max,
    Mean, Min, SortKey, Std, Sum,
};
use strata_core::format::BlockType;
use strata_core::types::{RowBatch, Scalar};
use test_data_gen::{grouped_rows, i64_values, split_rows};

fn as_blocks(parts: &[RowBatch], block_type: BlockType) -> Vec<Block> {
    parts
        .iter()
        .map(|rows| match block_type {
            BlockType::Pandas => Block::Pandas(rows.clone()),
            BlockType::Arrow => Block::Arrow(for_block(rows).unwrap().to_arrow().unwrap()),
        })
        .collect()
}

fn sorted_block(block: &Block, key: &SortKey) -> Block {
    let mut parts = block.accessor().sort_and_partition(&[], key).unwrap();
    assert_eq!(parts.len(), 1);
    parts.remove(0)
}

#[derive(Default)]
struct Reference {
    count: i64,
    sum: i64,
    min: i64,
    max: i64,
    values: Vec<f64>,
}

fn single_pass(rows: &RowBatch) -> BTreeMap<i64, Reference> {
    let keys = i64_values(&rows.column("k").unwrap().values);
    let values = i64_values(&rows.column("v").unwrap().values);
    let mut groups: BTreeMap<i64, Reference> = BTreeMap::new();
    for (k, v) in keys.into_iter().zip(values) {
        let g = groups.entry(k).or_insert_with(|| Reference {
            min: i64::MAX,
            max: i64::MIN,
            ..Reference::default()
        });
        g.count += 1;
        g.sum += v;
        g.min = g.min.min(v);
        g.max = g.max.max(v);
        g.values.push(v as f64);
    }
    groups
}

fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some((ss / (n - 1.0)).sqrt())
}

#[test]
fn test_combine_then_aggregate_matches_single_pass() {
    let rows = grouped_rows(400, 9, 42);
    let expected = single_pass(&rows);
    let key = SortKey::ascending(["k"]);
    let aggs: Vec<Arc<dyn AggregateFn>> = vec![
        Arc::new(Count::rows()),
        Arc::new(Sum::new("v")),
        Arc::new(Min::new("v")),
        Arc::new(Max::new("v")),
        Arc::new(Mean::new("v")),
        Arc::new(Std::new("v")),
    ];

    for block_type in [BlockType::Arrow, BlockType::Pandas] {
        let combined: Vec<Block> = as_blocks(&split_rows(&rows, 5), block_type)
            .iter()
            .map(|block| {
                sorted_block(block, &key)
                    .accessor()
                    .combine(&key, &aggs)
                    .unwrap()
            })
            .collect();
        let (out, meta) = aggregate_combined_blocks(&combined, &key, &aggs).unwrap();

        assert_eq!(out.block_type(), block_type);
        assert_eq!(meta.num_rows, Some(expected.len() as u64));
        let acc = out.accessor();
        assert_eq!(
            acc.schema().names(),
            vec!["k", "count()", "sum(v)", "min(v)", "max(v)", "mean(v)", "std(v)"]
        );

        let keys = i64_values(&acc.column_values("k").unwrap());
        assert_eq!(keys, expected.keys().copied().collect::<Vec<_>>());
        let counts = i64_values(&acc.column_values("count()").unwrap());
        let sums = i64_values(&acc.column_values("sum(v)").unwrap());
        let mins = i64_values(&acc.column_values("min(v)").unwrap());
        let maxs = i64_values(&acc.column_values("max(v)").unwrap());
        let means = acc.column_values("mean(v)").unwrap();
        let stds = acc.column_values("std(v)").unwrap();

        for (i, g) in expected.values().enumerate() {
            assert_eq!(counts[i], g.count);
            assert_eq!(sums[i], g.sum);
            assert_eq!(mins[i], g.min);
            assert_eq!(maxs[i], g.max);
            let mean = means[i].as_f64().unwrap();
            assert!((mean - g.sum as f64 / g.count as f64).abs() < 1e-9);
            match sample_std(&g.values) {
                Some(std) => assert!((stds[i].as_f64().unwrap() - std).abs() < 1e-6),
                None => assert!(stds[i].is_null()),
            }
        }
    }
}

#[test]
fn test_partitioned_sort_then_merge_is_globally_sorted() {
    let rows = grouped_rows(300, 50, 7);
    let key = SortKey::ascending(["k"]);
    let boundaries = vec![vec![Scalar::I64(15)], vec![Scalar::I64(35)]];

    for block_type in [BlockType::Arrow, BlockType::Pandas] {
        let inputs = as_blocks(&split_rows(&rows, 4), block_type);

        // partitions[p] holds partition p of every input block.
        let mut partitions: Vec<Vec<Block>> = vec![Vec::new(); boundaries.len() + 1];
        for block in &inputs {
            let parts = block.accessor().sort_and_partition(&boundaries, &key).unwrap();
            assert_eq!(parts.len(), boundaries.len() + 1);
            for (p, part) in parts.into_iter().enumerate() {
                partitions[p].push(part);
            }
        }

        let mut all = Vec::new();
        for (p, blocks) in partitions.iter().enumerate() {
            let (merged, meta) = merge_sorted_blocks(blocks, &key).unwrap();
            assert_eq!(merged.block_type(), block_type);
            assert_eq!(meta.num_rows, Some(merged.num_rows() as u64));
            let keys = i64_values(&merged.accessor().column_values("k").unwrap());
            match p {
                0 => assert!(keys.iter().all(|&k| k < 15)),
                1 => assert!(keys.iter().all(|&k| (15..35).contains(&k))),
                _ => assert!(keys.iter().all(|&k| k >= 35)),
            }
            all.extend(keys);
        }

        let mut expected = i64_values(&rows.column("k").unwrap().values);
        expected.sort_unstable();
        assert_eq!(all, expected);
    }
}

#[test]
fn test_descending_multi_column_merge() {
    let rows = grouped_rows(120, 4, 99);
    let key = SortKey::new(vec!["k".into(), "v".into()], vec![true, false]).unwrap();
    let sorted: Vec<Block> = as_blocks(&split_rows(&rows, 3), BlockType::Pandas)
        .iter()
        .map(|b| sorted_block(b, &key))
        .collect();
    let (merged, _) = merge_sorted_blocks(&sorted, &key).unwrap();
    let acc = merged.accessor();
    let ks = i64_values(&acc.column_values("k").unwrap());
    let vs = i64_values(&acc.column_values("v").unwrap());
    assert_eq!(ks.len(), 120);
    for i in 1..ks.len() {
        assert!(ks[i - 1] > ks[i] || (ks[i - 1] == ks[i] && vs[i - 1] <= vs[i]));
    }
}

#[test]
fn test_mixed_representations_merge_into_pandas() {
    let rows = grouped_rows(40, 5, 3);
    let key = SortKey::ascending(["k"]);
    let parts = split_rows(&rows, 2);
    let blocks = vec![
        sorted_block(&as_blocks(&parts[..1], BlockType::Arrow)[0], &key),
        sorted_block(&as_blocks(&parts[1..], BlockType::Pandas)[0], &key),
    ];
    let (merged, _) = merge_sorted_blocks(&blocks, &key).unwrap();
    assert_eq!(merged.block_type(), BlockType::Pandas);
    assert_eq!(merged.num_rows(), 40);
}

#[test]
fn test_sample_returns_key_columns() {
    let rows = grouped_rows(64, 8, 11);
    for block in as_blocks(&[rows], BlockType::Arrow) {
        let sample = block.accessor().sample(10, &SortKey::ascending(["k"])).unwrap();
        assert_eq!(sample.num_rows(), 10);
        assert_eq!(sample.accessor().schema().names(), vec!["k"]);
    }
}

#[test]
fn test_grouped_rows_are_reproducible_per_seed() {
    let rows = grouped_rows(200, 7, 42);
    assert_eq!(rows, grouped_rows(200, 7, 42));
    assert_ne!(rows, grouped_rows(200, 7, 43));

    let keys = i64_values(&rows.column("k").unwrap().values);
    assert!(keys.iter().all(|k| (0..7).contains(k)));
    let values = i64_values(&rows.column("v").unwrap().values);
    assert!(values.iter().all(|v| (-500..500).contains(v)));
}
