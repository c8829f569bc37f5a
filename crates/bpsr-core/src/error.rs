//! Error types for the decoding and aggregation layers.
//!
//! Parsing anomalies inside the framer and the decoders are silent skips
//! plus counters, never `Err`. The types here cover the places where failing
//! loudly is the correct behavior: malformed reducer input (which would mask
//! upstream bugs if skipped) and item-catalog I/O.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reducing decoded combat JSONL.
#[derive(Debug, Error)]
pub enum ReduceError {
    /// A JSONL line failed to parse. One bad line aborts the run.
    #[error("malformed record on line {line}: {source}")]
    MalformedRecord {
        /// One-based line number of the offending record.
        line: usize,
        /// The underlying JSON parse error.
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised while loading or writing item catalogs.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A source or destination file could not be read or written.
    #[error("failed to access {path}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A source file was not valid JSON.
    #[error("invalid JSON in {path}: {source}")]
    InvalidJson {
        /// The file involved.
        path: PathBuf,
        /// The underlying JSON parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The mapping could not be serialized.
    #[error("failed to serialize item mapping: {0}")]
    Serialize(#[from] serde_json::Error),
}
