//! Algorithms shared by both accessors. They only go through the
//! `BlockAccessor` surface, so each representation keeps its own slicing and
//! gathering (zero-copy for Arrow).

use std::cmp::Ordering;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use strata_core::error::{Error, Result};
use strata_core::types::{ColumnMap, Scalar};

use crate::accessor::BlockAccessor;
use crate::aggregate::{AggState, AggregateFn};
use crate::block::{Block, ColumnSelection, NumpyBatch};
use crate::builder::builder_for;
use crate::row::PublicRow;
use crate::sort::SortKey;

pub(crate) fn check_slice_bounds(start: usize, end: usize, num_rows: usize) -> Result<()> {
    if start > end || end > num_rows {
        return Err(Error::InvalidArgument(format!(
            "slice [{start}, {end}) out of bounds for block of {num_rows} rows"
        )));
    }
    Ok(())
}

pub(crate) fn check_indices(indices: &[usize], num_rows: usize) -> Result<()> {
    if let Some(bad) = indices.iter().find(|&&i| i >= num_rows) {
        return Err(Error::InvalidArgument(format!(
            "row index {bad} out of bounds for block of {num_rows} rows"
        )));
    }
    Ok(())
}

pub(crate) fn rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

pub(crate) fn shuffled_indices(num_rows: usize, seed: Option<u64>) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..num_rows).collect();
    indices.shuffle(&mut rng(seed));
    indices
}

/// Key tuple of every row, in row order.
pub(crate) fn key_tuples(acc: &dyn BlockAccessor, key: &SortKey) -> Result<Vec<Vec<Scalar>>> {
    let columns = key
        .columns()
        .iter()
        .map(|c| acc.column_values(c))
        .collect::<Result<Vec<_>>>()?;
    Ok((0..acc.num_rows())
        .map(|row| columns.iter().map(|col| col[row].clone()).collect())
        .collect())
}

pub(crate) fn to_numpy(
    acc: &dyn BlockAccessor,
    columns: Option<&ColumnSelection>,
) -> Result<NumpyBatch> {
    let names: Vec<String> = match columns {
        Some(ColumnSelection::Single(name)) => {
            return Ok(NumpyBatch::Array(acc.column_values(name)?));
        }
        Some(ColumnSelection::Multiple(names)) => names.clone(),
        None => acc.schema().fields.into_iter().map(|f| f.name).collect(),
    };
    let columns = names
        .into_iter()
        .map(|name| {
            let values = acc.column_values(&name)?;
            Ok((name, values))
        })
        .collect::<Result<ColumnMap>>()?;
    Ok(NumpyBatch::Columns(columns))
}

pub(crate) fn sample(acc: &dyn BlockAccessor, n: usize, key: &SortKey) -> Result<Block> {
    let num_rows = acc.num_rows();
    let amount = n.min(num_rows);
    let indices = rand::seq::index::sample(&mut rng(None), num_rows, amount).into_vec();
    let columns: Vec<&str> = key.columns().iter().map(String::as_str).collect();
    acc.take(&indices)?.accessor().select(&columns)
}

pub(crate) fn sort_and_partition(
    acc: &dyn BlockAccessor,
    boundaries: &[Vec<Scalar>],
    key: &SortKey,
) -> Result<Vec<Block>> {
    key.validate_schema(&acc.schema())?;
    let keys = key_tuples(acc, key)?;
    let order = key.sort_indices(&keys);
    let sorted = acc.take(&order)?;
    let sorted_keys: Vec<&Vec<Scalar>> = order.iter().map(|&i| &keys[i]).collect();

    // A row lands in the first bucket whose upper boundary sorts after it.
    let mut cuts = Vec::with_capacity(boundaries.len() + 2);
    cuts.push(0);
    for boundary in boundaries {
        let cut = sorted_keys.partition_point(|k| key.compare(k, boundary) == Ordering::Less);
        let prev = cuts.last().copied().unwrap_or(0);
        cuts.push(cut.max(prev));
    }
    cuts.push(sorted_keys.len());

    let sorted = sorted.accessor();
    let parts = cuts
        .windows(2)
        .map(|w| sorted.slice(w[0], w[1], false))
        .collect::<Result<Vec<_>>>()?;
    Ok(parts)
}

/// Fold runs of equal keys into one state row per group. The block must be
/// sorted by `key`; an empty key is a single global group.
pub(crate) fn combine(
    acc: &dyn BlockAccessor,
    key: &SortKey,
    aggs: &[Arc<dyn AggregateFn>],
) -> Result<Block> {
    key.validate_schema(&acc.schema())?;
    let keys = key_tuples(acc, key)?;
    let inputs = aggs
        .iter()
        .map(|agg| agg.on().map(|c| acc.column_values(c)).transpose())
        .collect::<Result<Vec<_>>>()?;

    let mut builder = builder_for(acc.block_type());
    let mut current: Option<(usize, Vec<AggState>)> = None;
    for row in 0..acc.num_rows() {
        let starts_group = match &current {
            Some((first, _)) => key.compare(&keys[*first], &keys[row]) != Ordering::Equal,
            None => true,
        };
        if starts_group {
            if let Some((first, states)) = current.take() {
                builder.add_row(state_row(key, &keys[first], aggs, states))?;
            }
            current = Some((row, aggs.iter().map(|agg| agg.init()).collect()));
        }
        if let Some((_, states)) = current.as_mut() {
            for ((agg, state), input) in aggs.iter().zip(states.iter_mut()).zip(&inputs) {
                agg.accumulate(state, input.as_ref().map(|values| &values[row]))?;
            }
        }
    }
    if let Some((first, states)) = current {
        builder.add_row(state_row(key, &keys[first], aggs, states))?;
    }
    builder.build()
}

/// Key columns followed by each aggregate's state columns.
pub(crate) fn state_row(
    key: &SortKey,
    key_values: &[Scalar],
    aggs: &[Arc<dyn AggregateFn>],
    states: Vec<AggState>,
) -> PublicRow {
    let mut row: PublicRow = key
        .columns()
        .iter()
        .cloned()
        .zip(key_values.iter().cloned())
        .collect();
    for (agg, state) in aggs.iter().zip(states) {
        for (field, value) in agg.state_fields().iter().zip(state) {
            row.insert(agg.state_column(field), value);
        }
    }
    row
}
