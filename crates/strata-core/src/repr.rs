//! Bounded value rendering for error messages.

use std::fmt::Debug;

/// Longest rendering kept in an error message.
pub const MAX_REPR_LEN: usize = 200;

/// Debug-render `value`, cut to [`MAX_REPR_LEN`] characters with a `...` tail.
pub fn truncated_repr<T: Debug + ?Sized>(value: &T) -> String {
    let full = format!("{value:?}");
    if full.chars().count() <= MAX_REPR_LEN {
        return full;
    }
    let mut out: String = full.chars().take(MAX_REPR_LEN).collect();
    out.push_str("...");
    out
}
