//! Batch-format, batch-size and block-type enumerations.
//!
//! These are the only configuration values callers hand to the block layer.
//! Every parse failure names the full accepted set.

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::BlockConfig;
use crate::error::{Error, Result};

/// Tags accepted by `to_batch_format`. An unset format means the native block.
pub const VALID_BATCH_FORMATS: &[&str] = &["default", "native", "pandas", "pyarrow", "numpy"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchFormat {
    /// `"default"` / `"native"`: the accessor's default representation.
    Default,
    Pandas,
    #[serde(rename = "pyarrow")]
    PyArrow,
    Numpy,
}

impl BatchFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchFormat::Default => "default",
            BatchFormat::Pandas => "pandas",
            BatchFormat::PyArrow => "pyarrow",
            BatchFormat::Numpy => "numpy",
        }
    }
}

impl FromStr for BatchFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "default" | "native" => Ok(BatchFormat::Default),
            "pandas" => Ok(BatchFormat::Pandas),
            "pyarrow" => Ok(BatchFormat::PyArrow),
            "numpy" => Ok(BatchFormat::Numpy),
            other => Err(Error::InvalidArgument(format!(
                "The batch format must be one of {VALID_BATCH_FORMATS:?} or unset, got: {other:?}"
            ))),
        }
    }
}

impl fmt::Display for BatchFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve a user-supplied batch format for a UDF boundary.
///
/// `"default"` resolves to the configured default format (numpy unless
/// overridden); unset stays unset, meaning "hand over the native block".
pub fn apply_batch_format(given: Option<&str>, cfg: &BlockConfig) -> Result<Option<BatchFormat>> {
    match given {
        None => Ok(None),
        Some("default") => Ok(Some(cfg.default_batch_format)),
        Some(s) => s.parse().map(Some),
    }
}

/// Requested number of rows per batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchSize {
    /// Use the configured default batch size.
    Default,
    Rows(NonZeroUsize),
}

impl BatchSize {
    /// Explicit row count; zero is rejected.
    pub fn rows(n: usize) -> Result<Self> {
        NonZeroUsize::new(n).map(BatchSize::Rows).ok_or_else(|| {
            Error::InvalidArgument("batch_size must be a positive integer or \"default\"".into())
        })
    }
}

/// Resolve a batch size. `None` means unbounded (whole blocks).
pub fn apply_batch_size(given: Option<BatchSize>, cfg: &BlockConfig) -> Option<usize> {
    match given {
        None => None,
        Some(BatchSize::Default) => Some(cfg.default_batch_size),
        Some(BatchSize::Rows(n)) => Some(n.get()),
    }
}

pub const VALID_BLOCK_TYPES: &[&str] = &["arrow", "pandas"];

/// Which of the two representations a block uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Arrow,
    Pandas,
}

impl BlockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Arrow => "arrow",
            BlockType::Pandas => "pandas",
        }
    }
}

impl FromStr for BlockType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "arrow" => Ok(BlockType::Arrow),
            "pandas" => Ok(BlockType::Pandas),
            other => Err(Error::InvalidArgument(format!(
                "The block type must be one of {VALID_BLOCK_TYPES:?}, got: {other:?}"
            ))),
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_batch_format() {
        assert_eq!("native".parse::<BatchFormat>().unwrap(), BatchFormat::Default);
        assert_eq!("pyarrow".parse::<BatchFormat>().unwrap(), BatchFormat::PyArrow);

        let err = "arrow".parse::<BatchFormat>().unwrap_err().to_string();
        for tag in VALID_BATCH_FORMATS {
            assert!(err.contains(tag), "{err} should list {tag}");
        }
    }

    #[test]
    fn test_apply_batch_format_default_is_numpy() {
        let cfg = BlockConfig::default();
        assert_eq!(apply_batch_format(None, &cfg).unwrap(), None);
        assert_eq!(
            apply_batch_format(Some("default"), &cfg).unwrap(),
            Some(BatchFormat::Numpy)
        );
        assert_eq!(
            apply_batch_format(Some("pandas"), &cfg).unwrap(),
            Some(BatchFormat::Pandas)
        );
        assert!(apply_batch_format(Some("csv"), &cfg).is_err());
    }

    #[test]
    fn test_apply_batch_size() {
        let cfg = BlockConfig::default();
        assert_eq!(apply_batch_size(None, &cfg), None);
        assert_eq!(
            apply_batch_size(Some(BatchSize::Default), &cfg),
            Some(cfg.default_batch_size)
        );
        assert_eq!(apply_batch_size(Some(BatchSize::rows(7).unwrap()), &cfg), Some(7));
        assert!(BatchSize::rows(0).is_err());
    }

    #[test]
    fn test_block_type_round_trip() {
        for tag in VALID_BLOCK_TYPES {
            assert_eq!(tag.parse::<BlockType>().unwrap().as_str(), *tag);
        }
        assert!(matches!(
            "parquet".parse::<BlockType>(),
            Err(Error::InvalidArgument(_))
        ));
    }
}
