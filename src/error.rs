//! Error types shared across the crate.

use thiserror::Error;

/// Errors produced by chain stores, samplers and model oracles.
#[derive(Error, Debug)]
pub enum Error {
    /// A summary statistic or state query hit a chain with no recorded values.
    #[error("chain has no recorded values for `{0}`")]
    Empty(&'static str),

    /// A record handed to `update` lacks a field the chain's schema declares.
    #[error("record is missing required field `{0}`")]
    MissingField(&'static str),

    /// A chain file's field set disagrees with the schema declared at
    /// construction.
    #[error("chain file does not match declared schema: {0}")]
    SchemaMismatch(String),

    /// Sequence lengths or array dimensions disagree.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// The batch loader produced no batches where at least one is required.
    #[error("batch loader yielded no batches")]
    EmptyLoader,

    /// The model oracle failed; the source error is passed through unchanged.
    #[error("model evaluation failed: {0}")]
    Model(#[from] Box<dyn std::error::Error + Send + Sync>),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV writer error
    #[cfg(feature = "csv")]
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
