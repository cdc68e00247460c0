use thiserror::Error;

/// Canonical result for strata.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A deprecated or ambiguous input shape (bare list, bare array).
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// An enumerated option outside its accepted set, or an out-of-range argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A value whose runtime type is not a known block representation.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Structural failure converting columns into the Arrow representation.
    #[error("Conversion failure: {0}")]
    Conversion(String),

    /// Mismatched row counts or representations in paired operations.
    #[error("Shape error: {0}")]
    Shape(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[cfg(feature = "arrow")]
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),
}

impl Error {
    /// Whether this error is the structural Arrow conversion failure that the
    /// batch dispatcher may recover from.
    pub fn is_conversion(&self) -> bool {
        matches!(self, Error::Conversion(_))
    }
}
