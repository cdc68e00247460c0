#![forbid(unsafe_code)]
//! strata-core: shared kernel for strata blocks.
//!
//! This crate contains the *pure* types every block representation agrees on:
//! the dynamically typed value model, schemas, block metadata, execution stats,
//! batch-format enumerations and configuration. The accessor interface and the
//! concrete representations live in `strata-block`.
//!
//! Arrow interop (schema mapping, `ArrowError` conversion) is gated behind the
//! `arrow` feature so the kernel stays lean for consumers that only read
//! metadata.

pub mod config;
pub mod error;
pub mod format;
pub mod metadata;
pub mod prelude;
pub mod repr;
pub mod runtime;
pub mod schema;
pub mod stats;
pub mod types;

#[cfg(feature = "arrow")]
pub mod arrow;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
