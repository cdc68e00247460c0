use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use strata_block::{
    aggregate_combined_blocks, batch_to_block, merge_sorted_blocks, AggregateFn, Block, Count,
    DataBatch, Mean, SortKey, Sum,
};
use strata_core::types::{Column, ColumnMap, RowBatch, Scalar};

fn make_columns(rows: usize) -> ColumnMap {
    let mut columns = ColumnMap::new();
    columns.insert(
        "group".into(),
        (0..rows).map(|i| Scalar::I64((i % 16) as i64)).collect(),
    );
    columns.insert(
        "order".into(),
        (0..rows).map(|i| Scalar::I64(i as i64)).collect(),
    );
    columns.insert(
        "value".into(),
        (0..rows).map(|i| Scalar::F64((i % 10) as f64)).collect(),
    );
    columns
}

fn make_batch(rows: usize) -> RowBatch {
    RowBatch::from_columns(make_columns(rows)).unwrap()
}

fn sorted_runs(runs: usize, rows: usize, key: &SortKey) -> Vec<Block> {
    (0..runs)
        .map(|r| {
            let batch = RowBatch::new(vec![
                Column::new(
                    "group",
                    (0..rows).map(|i| Scalar::I64((i * runs + r) as i64)).collect(),
                ),
                Column::new("value", (0..rows).map(|i| Scalar::F64(i as f64)).collect()),
            ])
            .unwrap();
            let block = batch_to_block(DataBatch::Pandas(batch), None).unwrap();
            block
                .accessor()
                .sort_and_partition(&[], key)
                .unwrap()
                .remove(0)
        })
        .collect()
}

fn bench_conversion(c: &mut Criterion) {
    let columns = make_columns(4096);
    c.bench_function("batch_to_block_arrow", |b| {
        b.iter(|| batch_to_block(DataBatch::Columns(columns.clone()), None).unwrap())
    });

    let block = Block::Pandas(make_batch(4096));
    c.bench_function("pandas_to_arrow", |b| {
        b.iter(|| block.accessor().to_arrow().unwrap())
    });
}

fn bench_slice_take(c: &mut Criterion) {
    let rows = make_batch(4096);
    let arrow = Block::Arrow(block_to_arrow(&rows));
    let indices: Vec<usize> = (0..4096).rev().step_by(3).collect();

    c.bench_function("arrow_slice_view", |b| {
        b.iter(|| arrow.accessor().slice(100, 3000, false).unwrap())
    });
    c.bench_function("arrow_slice_copy", |b| {
        b.iter(|| arrow.accessor().slice(100, 3000, true).unwrap())
    });
    c.bench_function("arrow_take", |b| {
        b.iter(|| arrow.accessor().take(&indices).unwrap())
    });
    let pandas = Block::Pandas(rows);
    c.bench_function("pandas_take", |b| {
        b.iter(|| pandas.accessor().take(&indices).unwrap())
    });
}

fn block_to_arrow(rows: &RowBatch) -> arrow::record_batch::RecordBatch {
    Block::Pandas(rows.clone()).accessor().to_arrow().unwrap()
}

fn bench_merge(c: &mut Criterion) {
    let key = SortKey::ascending(["group"]);
    let runs = sorted_runs(8, 512, &key);
    c.bench_function("merge_sorted_blocks_8x512", |b| {
        b.iter(|| merge_sorted_blocks(&runs, &key).unwrap())
    });
}

fn bench_aggregate(c: &mut Criterion) {
    let key = SortKey::ascending(["group"]);
    let aggs: Vec<Arc<dyn AggregateFn>> = vec![
        Arc::new(Count::rows()),
        Arc::new(Sum::new("value")),
        Arc::new(Mean::new("value")),
    ];
    let sorted = Block::Pandas(make_batch(4096))
        .accessor()
        .sort_and_partition(&[], &key)
        .unwrap()
        .remove(0);
    c.bench_function("combine_4096", |b| {
        b.iter(|| sorted.accessor().combine(&key, &aggs).unwrap())
    });

    let combined: Vec<Block> = (0..4)
        .map(|_| sorted.accessor().combine(&key, &aggs).unwrap())
        .collect();
    c.bench_function("aggregate_combined_4", |b| {
        b.iter(|| aggregate_combined_blocks(&combined, &key, &aggs).unwrap())
    });
}

criterion_group!(
    blocks,
    bench_conversion,
    bench_slice_take,
    bench_merge,
    bench_aggregate
);
criterion_main!(blocks);
