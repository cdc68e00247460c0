//! Aggregate functions for `combine` and `aggregate_combined_blocks`.
//!
//! An aggregation runs in three phases: each block folds its rows into
//! per-group accumulator state (`init` + `accumulate`), combined blocks carry
//! that state as ordinary columns named `"{name}:{field}"`, and the final pass
//! merges states of equal keys before `finalize` produces the output value.

use std::fmt;

use strata_core::error::{Error, Result};
use strata_core::types::{scalar_cmp, Scalar};

/// Accumulator state, one scalar per entry of `state_fields`.
pub type AggState = Vec<Scalar>;

pub trait AggregateFn: Send + Sync + fmt::Debug {
    /// Output column name, e.g. `sum(x)`.
    fn name(&self) -> String;

    /// Input column; `None` aggregates whole rows.
    fn on(&self) -> Option<&str>;

    /// Names of the state fields persisted in combined blocks.
    fn state_fields(&self) -> &'static [&'static str];

    fn init(&self) -> AggState;

    /// Fold one input value into `state`. `value` is `None` when `on()` is.
    fn accumulate(&self, state: &mut AggState, value: Option<&Scalar>) -> Result<()>;

    /// Fold another partial state into `state`.
    fn merge(&self, state: &mut AggState, other: &AggState) -> Result<()>;

    fn finalize(&self, state: &AggState) -> Scalar;

    fn state_column(&self, field: &str) -> String {
        format!("{}:{}", self.name(), field)
    }
}

fn non_null(value: Option<&Scalar>) -> Option<&Scalar> {
    value.filter(|v| !v.is_null())
}

/// Numeric addition with integer widening; overflow falls back to floats.
fn add(acc: &Scalar, value: &Scalar) -> Result<Scalar> {
    if acc.is_null() {
        return match value {
            Scalar::I32(v) => Ok(Scalar::I64(*v as i64)),
            Scalar::F32(v) => Ok(Scalar::F64(*v as f64)),
            v if v.data_type().is_numeric() || v.is_null() => Ok(v.clone()),
            v => Err(Error::TypeMismatch(format!(
                "cannot add non-numeric value {v} ({})",
                v.data_type()
            ))),
        };
    }
    if value.is_null() {
        return Ok(acc.clone());
    }
    match (acc.as_i64(), value.as_i64()) {
        (Some(a), Some(b)) => Ok(a
            .checked_add(b)
            .map(Scalar::I64)
            .unwrap_or(Scalar::F64(a as f64 + b as f64))),
        _ => match (acc.as_f64(), value.as_f64()) {
            (Some(a), Some(b)) => Ok(Scalar::F64(a + b)),
            _ => Err(Error::TypeMismatch(format!(
                "cannot add {value} ({}) to {acc} ({})",
                value.data_type(),
                acc.data_type()
            ))),
        },
    }
}

fn numeric(value: &Scalar, agg: &str) -> Result<f64> {
    value.as_f64().ok_or_else(|| {
        Error::TypeMismatch(format!(
            "{agg} expects numeric values, got {value} ({})",
            value.data_type()
        ))
    })
}

fn count_of(state: &Scalar) -> i64 {
    state.as_i64().unwrap_or(0)
}

/// Number of rows, or of non-null values when `on` is set.
#[derive(Debug, Clone, Default)]
pub struct Count {
    on: Option<String>,
}

impl Count {
    pub fn rows() -> Self {
        Self { on: None }
    }

    pub fn column(column: impl Into<String>) -> Self {
        Self {
            on: Some(column.into()),
        }
    }
}

impl AggregateFn for Count {
    fn name(&self) -> String {
        format!("count({})", self.on.as_deref().unwrap_or(""))
    }

    fn on(&self) -> Option<&str> {
        self.on.as_deref()
    }

    fn state_fields(&self) -> &'static [&'static str] {
        &["count"]
    }

    fn init(&self) -> AggState {
        vec![Scalar::I64(0)]
    }

    fn accumulate(&self, state: &mut AggState, value: Option<&Scalar>) -> Result<()> {
        let counts = match (&self.on, value) {
            (None, _) => true,
            (Some(_), v) => non_null(v).is_some(),
        };
        if counts {
            state[0] = Scalar::I64(count_of(&state[0]) + 1);
        }
        Ok(())
    }

    fn merge(&self, state: &mut AggState, other: &AggState) -> Result<()> {
        state[0] = Scalar::I64(count_of(&state[0]) + count_of(&other[0]));
        Ok(())
    }

    fn finalize(&self, state: &AggState) -> Scalar {
        Scalar::I64(count_of(&state[0]))
    }
}

/// Sum of non-null values; null when there are none.
#[derive(Debug, Clone)]
pub struct Sum {
    on: String,
}

impl Sum {
    pub fn new(on: impl Into<String>) -> Self {
        Self { on: on.into() }
    }
}

impl AggregateFn for Sum {
    fn name(&self) -> String {
        format!("sum({})", self.on)
    }

    fn on(&self) -> Option<&str> {
        Some(&self.on)
    }

    fn state_fields(&self) -> &'static [&'static str] {
        &["sum"]
    }

    fn init(&self) -> AggState {
        vec![Scalar::Null]
    }

    fn accumulate(&self, state: &mut AggState, value: Option<&Scalar>) -> Result<()> {
        if let Some(v) = non_null(value) {
            state[0] = add(&state[0], v)?;
        }
        Ok(())
    }

    fn merge(&self, state: &mut AggState, other: &AggState) -> Result<()> {
        state[0] = add(&state[0], &other[0])?;
        Ok(())
    }

    fn finalize(&self, state: &AggState) -> Scalar {
        state[0].clone()
    }
}

fn keep_extreme(state: &mut AggState, value: &Scalar, want: std::cmp::Ordering) {
    if value.is_null() {
        return;
    }
    if state[0].is_null() || scalar_cmp(value, &state[0]) == want {
        state[0] = value.clone();
    }
}

#[derive(Debug, Clone)]
pub struct Min {
    on: String,
}

impl Min {
    pub fn new(on: impl Into<String>) -> Self {
        Self { on: on.into() }
    }
}

impl AggregateFn for Min {
    fn name(&self) -> String {
        format!("min({})", self.on)
    }

    fn on(&self) -> Option<&str> {
        Some(&self.on)
    }

    fn state_fields(&self) -> &'static [&'static str] {
        &["min"]
    }

    fn init(&self) -> AggState {
        vec![Scalar::Null]
    }

    fn accumulate(&self, state: &mut AggState, value: Option<&Scalar>) -> Result<()> {
        if let Some(v) = value {
            keep_extreme(state, v, std::cmp::Ordering::Less);
        }
        Ok(())
    }

    fn merge(&self, state: &mut AggState, other: &AggState) -> Result<()> {
        keep_extreme(state, &other[0], std::cmp::Ordering::Less);
        Ok(())
    }

    fn finalize(&self, state: &AggState) -> Scalar {
        state[0].clone()
    }
}

#[derive(Debug, Clone)]
pub struct Max {
    on: String,
}

impl Max {
    pub fn new(on: impl Into<String>) -> Self {
        Self { on: on.into() }
    }
}

impl AggregateFn for Max {
    fn name(&self) -> String {
        format!("max({})", self.on)
    }

    fn on(&self) -> Option<&str> {
        Some(&self.on)
    }

    fn state_fields(&self) -> &'static [&'static str] {
        &["max"]
    }

    fn init(&self) -> AggState {
        vec![Scalar::Null]
    }

    fn accumulate(&self, state: &mut AggState, value: Option<&Scalar>) -> Result<()> {
        if let Some(v) = value {
            keep_extreme(state, v, std::cmp::Ordering::Greater);
        }
        Ok(())
    }

    fn merge(&self, state: &mut AggState, other: &AggState) -> Result<()> {
        keep_extreme(state, &other[0], std::cmp::Ordering::Greater);
        Ok(())
    }

    fn finalize(&self, state: &AggState) -> Scalar {
        state[0].clone()
    }
}

/// Arithmetic mean of non-null values.
#[derive(Debug, Clone)]
pub struct Mean {
    on: String,
}

impl Mean {
    pub fn new(on: impl Into<String>) -> Self {
        Self { on: on.into() }
    }
}

impl AggregateFn for Mean {
    fn name(&self) -> String {
        format!("mean({})", self.on)
    }

    fn on(&self) -> Option<&str> {
        Some(&self.on)
    }

    fn state_fields(&self) -> &'static [&'static str] {
        &["sum", "count"]
    }

    fn init(&self) -> AggState {
        vec![Scalar::Null, Scalar::I64(0)]
    }

    fn accumulate(&self, state: &mut AggState, value: Option<&Scalar>) -> Result<()> {
        if let Some(v) = non_null(value) {
            numeric(v, "mean")?;
            state[0] = add(&state[0], v)?;
            state[1] = Scalar::I64(count_of(&state[1]) + 1);
        }
        Ok(())
    }

    fn merge(&self, state: &mut AggState, other: &AggState) -> Result<()> {
        state[0] = add(&state[0], &other[0])?;
        state[1] = Scalar::I64(count_of(&state[1]) + count_of(&other[1]));
        Ok(())
    }

    fn finalize(&self, state: &AggState) -> Scalar {
        let count = count_of(&state[1]);
        match state[0].as_f64() {
            Some(sum) if count > 0 => Scalar::F64(sum / count as f64),
            _ => Scalar::Null,
        }
    }
}

/// Standard deviation with `ddof` delta degrees of freedom (sample standard
/// deviation by default). State is Welford's `(count, mean, m2)`; partial
/// states merge with Chan's parallel update.
#[derive(Debug, Clone)]
pub struct Std {
    on: String,
    ddof: u32,
}

impl Std {
    pub fn new(on: impl Into<String>) -> Self {
        Self {
            on: on.into(),
            ddof: 1,
        }
    }

    pub fn with_ddof(mut self, ddof: u32) -> Self {
        self.ddof = ddof;
        self
    }
}

impl AggregateFn for Std {
    fn name(&self) -> String {
        format!("std({})", self.on)
    }

    fn on(&self) -> Option<&str> {
        Some(&self.on)
    }

    fn state_fields(&self) -> &'static [&'static str] {
        &["count", "mean", "m2"]
    }

    fn init(&self) -> AggState {
        vec![Scalar::I64(0), Scalar::F64(0.0), Scalar::F64(0.0)]
    }

    fn accumulate(&self, state: &mut AggState, value: Option<&Scalar>) -> Result<()> {
        let Some(v) = non_null(value) else {
            return Ok(());
        };
        let x = numeric(v, "std")?;
        let count = count_of(&state[0]) + 1;
        let mean = state[1].as_f64().unwrap_or(0.0);
        let m2 = state[2].as_f64().unwrap_or(0.0);

        let delta = x - mean;
        let mean = mean + delta / count as f64;
        let m2 = m2 + delta * (x - mean);
        *state = vec![Scalar::I64(count), Scalar::F64(mean), Scalar::F64(m2)];
        Ok(())
    }

    fn merge(&self, state: &mut AggState, other: &AggState) -> Result<()> {
        let (na, nb) = (count_of(&state[0]), count_of(&other[0]));
        if nb == 0 {
            return Ok(());
        }
        if na == 0 {
            *state = other.clone();
            return Ok(());
        }
        let (mean_a, m2_a) = (state[1].as_f64().unwrap_or(0.0), state[2].as_f64().unwrap_or(0.0));
        let (mean_b, m2_b) = (other[1].as_f64().unwrap_or(0.0), other[2].as_f64().unwrap_or(0.0));

        let n = na + nb;
        let delta = mean_b - mean_a;
        let mean = mean_a + delta * nb as f64 / n as f64;
        let m2 = m2_a + m2_b + delta * delta * (na as f64 * nb as f64) / n as f64;
        *state = vec![Scalar::I64(n), Scalar::F64(mean), Scalar::F64(m2)];
        Ok(())
    }

    fn finalize(&self, state: &AggState) -> Scalar {
        let count = count_of(&state[0]);
        let dof = count - self.ddof as i64;
        if dof <= 0 {
            return Scalar::Null;
        }
        let m2 = state[2].as_f64().unwrap_or(0.0);
        Scalar::F64((m2 / dof as f64).sqrt())
    }
}
