//! Configuration errors, one variant per violated invariant.

use std::path::PathBuf;
use thiserror::Error;

/// Raised while loading a scenario, before any solve starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A referenced file (scenario, template, override table) does not exist.
    #[error("{what} not found: {}", path.display())]
    NotFound { what: &'static str, path: PathBuf },

    /// The scenario file is not valid TOML or has mistyped values.
    #[error("parsing scenario '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// A required key is absent.
    #[error("missing required key '{key}' in [{section}]")]
    MissingKey {
        section: &'static str,
        key: &'static str,
    },

    /// A value falls outside its allowed range.
    #[error("{field}: {message}")]
    Range { field: String, message: String },

    /// A per-year policy series does not have one entry per year.
    #[error("{field}: list length {found} does not match Years list length {expected}")]
    LengthMismatch {
        field: String,
        expected: usize,
        found: usize,
    },

    /// A list that must be non-empty is empty.
    #[error("{field}: list must not be empty")]
    Empty { field: &'static str },

    /// An override table is malformed.
    #[error("override table '{}': {message}", path.display())]
    Table { path: PathBuf, message: String },
}
