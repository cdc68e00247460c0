//! Multi-block operations: k-way merge of sorted blocks and the final pass of
//! a grouped aggregation.
//!
//! Both walk the inputs with a min-heap holding the current head row of each
//! block. Ties on the key break by block then row index, so the merge is
//! stable.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use strata_core::error::Result;
use strata_core::format::BlockType;
use strata_core::metadata::BlockMetadata;
use strata_core::stats::ExecStats;
use strata_core::types::Scalar;

use crate::aggregate::{AggState, AggregateFn};
use crate::block::Block;
use crate::builder::builder_for;
use crate::row::PublicRow;
use crate::sort::SortKey;
use crate::table::key_tuples;

/// Heap entry for one block's head row.
struct MergeEntry<'k> {
    key: Vec<Scalar>,
    block: usize,
    row: usize,
    sort_key: &'k SortKey,
}

impl PartialEq for MergeEntry<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MergeEntry<'_> {}

impl PartialOrd for MergeEntry<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergeEntry<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap and we pop the smallest key.
        self.sort_key
            .compare(&self.key, &other.key)
            .then(self.block.cmp(&other.block))
            .then(self.row.cmp(&other.row))
            .reverse()
    }
}

/// Visit every row of `keys` (one key list per block, each already sorted)
/// in merged order.
fn merge_order(keys: &[Vec<Vec<Scalar>>], sort_key: &SortKey) -> Vec<(usize, usize)> {
    let total = keys.iter().map(Vec::len).sum();
    let mut order = Vec::with_capacity(total);
    let mut heap = BinaryHeap::with_capacity(keys.len());
    for (block, block_keys) in keys.iter().enumerate() {
        if let Some(first) = block_keys.first() {
            heap.push(MergeEntry {
                key: first.clone(),
                block,
                row: 0,
                sort_key,
            });
        }
    }
    while let Some(entry) = heap.pop() {
        order.push((entry.block, entry.row));
        let next = entry.row + 1;
        if let Some(key) = keys[entry.block].get(next) {
            heap.push(MergeEntry {
                key: key.clone(),
                block: entry.block,
                row: next,
                sort_key,
            });
        }
    }
    order
}

/// Representation of a result built from `blocks`: theirs when they agree,
/// otherwise dataframe-style, which can hold anything.
fn output_type(blocks: &[Block]) -> BlockType {
    let mut types = blocks.iter().map(Block::block_type);
    match types.next() {
        None => BlockType::Arrow,
        Some(first) if types.all(|t| t == first) => first,
        Some(_) => BlockType::Pandas,
    }
}

/// Merge blocks that are each sorted by `sort_key` into one sorted block.
pub fn merge_sorted_blocks(blocks: &[Block], sort_key: &SortKey) -> Result<(Block, BlockMetadata)> {
    let stats = ExecStats::builder();
    let block_type = output_type(blocks);
    let non_empty: Vec<&Block> = blocks.iter().filter(|b| b.num_rows() > 0).collect();

    let merged = if non_empty.is_empty() {
        blocks
            .first()
            .cloned()
            .unwrap_or_else(|| Block::empty(block_type))
    } else {
        let keys = non_empty
            .iter()
            .map(|b| key_tuples(b.accessor().as_ref(), sort_key))
            .collect::<Result<Vec<_>>>()?;
        let order = merge_order(&keys, sort_key);

        let mut builder = builder_for(block_type);
        let mut offsets = Vec::with_capacity(non_empty.len());
        for block in &non_empty {
            offsets.push(builder.num_rows());
            builder.add_block(block)?;
        }
        let indices: Vec<usize> = order.iter().map(|&(b, r)| offsets[b] + r).collect();
        builder.build()?.accessor().take(&indices)?
    };

    tracing::debug!(
        inputs = blocks.len(),
        rows = merged.num_rows(),
        block_type = %block_type,
        "merged sorted blocks"
    );
    let meta = merged.accessor().get_metadata(None, Some(stats.build()));
    Ok((merged, meta))
}

/// Final pass of a grouped aggregation over blocks produced by `combine`.
///
/// Partial states of equal keys are merged across blocks, then finalized into
/// one row per group: the key columns followed by one column per aggregate.
pub fn aggregate_combined_blocks(
    blocks: &[Block],
    sort_key: &SortKey,
    aggs: &[Arc<dyn AggregateFn>],
) -> Result<(Block, BlockMetadata)> {
    let stats = ExecStats::builder();
    let block_type = output_type(blocks);
    let non_empty: Vec<&Block> = blocks.iter().filter(|b| b.num_rows() > 0).collect();

    let keys = non_empty
        .iter()
        .map(|b| key_tuples(b.accessor().as_ref(), sort_key))
        .collect::<Result<Vec<_>>>()?;
    // states[block][agg][field] is a column of partial state values.
    let states = non_empty
        .iter()
        .map(|b| {
            let acc = b.accessor();
            aggs.iter()
                .map(|agg| {
                    agg.state_fields()
                        .iter()
                        .map(|field| acc.column_values(&agg.state_column(field)))
                        .collect::<Result<Vec<_>>>()
                })
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;
    let state_at = |block: usize, agg: usize, row: usize| -> AggState {
        states[block][agg].iter().map(|col| col[row].clone()).collect()
    };

    let mut builder = builder_for(block_type);
    let mut current: Option<(Vec<Scalar>, Vec<AggState>)> = None;
    let mut groups = 0usize;
    for (block, row) in merge_order(&keys, sort_key) {
        let key = &keys[block][row];
        match current.as_mut() {
            Some((group_key, acc)) if sort_key.compare(group_key, key) == Ordering::Equal => {
                for (i, agg) in aggs.iter().enumerate() {
                    agg.merge(&mut acc[i], &state_at(block, i, row))?;
                }
            }
            _ => {
                if let Some((group_key, acc)) = current.take() {
                    builder.add_row(final_row(sort_key, group_key, aggs, &acc))?;
                    groups += 1;
                }
                let acc = (0..aggs.len()).map(|i| state_at(block, i, row)).collect();
                current = Some((key.clone(), acc));
            }
        }
    }
    if let Some((group_key, acc)) = current {
        builder.add_row(final_row(sort_key, group_key, aggs, &acc))?;
        groups += 1;
    }

    let out = builder.build()?;
    tracing::debug!(inputs = blocks.len(), groups, "aggregated combined blocks");
    let meta = out.accessor().get_metadata(None, Some(stats.build()));
    Ok((out, meta))
}

fn final_row(
    sort_key: &SortKey,
    key: Vec<Scalar>,
    aggs: &[Arc<dyn AggregateFn>],
    states: &[AggState],
) -> PublicRow {
    let mut row: PublicRow = sort_key.columns().iter().cloned().zip(key).collect();
    for (agg, state) in aggs.iter().zip(states) {
        row.insert(agg.name(), agg.finalize(state));
    }
    row
}
