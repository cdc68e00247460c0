//! Sort keys: the column list and direction used by sort, sample, merge and
//! grouped aggregation.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use strata_core::error::{Error, Result};
use strata_core::schema::Schema;
use strata_core::types::{scalar_cmp, Scalar};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortKey {
    columns: Vec<String>,
    descending: Vec<bool>,
}

impl SortKey {
    /// `descending` has one flag per column, or a single flag for all of them.
    pub fn new(columns: Vec<String>, descending: Vec<bool>) -> Result<Self> {
        let descending = match descending.len() {
            0 => vec![false; columns.len()],
            1 => vec![descending[0]; columns.len()],
            n if n == columns.len() => descending,
            n => {
                return Err(Error::InvalidArgument(format!(
                    "got {n} descending flags for {} sort columns",
                    columns.len()
                )))
            }
        };
        Ok(Self {
            columns,
            descending,
        })
    }

    pub fn ascending<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let descending = vec![false; columns.len()];
        Self {
            columns,
            descending,
        }
    }

    /// No key columns: every row belongs to one group.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn descending(&self) -> &[bool] {
        &self.descending
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Every key column must exist in `schema`.
    pub fn validate_schema(&self, schema: &Schema) -> Result<()> {
        for column in &self.columns {
            if schema.index_of(column).is_none() {
                return Err(Error::Schema(format!(
                    "sort key column '{column}' not found in schema {:?}",
                    schema.names()
                )));
            }
        }
        Ok(())
    }

    /// Compare two key tuples, honouring each column's direction.
    pub fn compare(&self, a: &[Scalar], b: &[Scalar]) -> Ordering {
        for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
            let ord = scalar_cmp(x, y);
            let ord = if self.descending.get(i).copied().unwrap_or(false) {
                ord.reverse()
            } else {
                ord
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        a.len().cmp(&b.len())
    }

    /// Stable permutation that orders `keys`.
    pub fn sort_indices(&self, keys: &[Vec<Scalar>]) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..keys.len()).collect();
        indices.sort_by(|&a, &b| self.compare(&keys[a], &keys[b]));
        indices
    }
}
