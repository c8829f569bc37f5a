//! CLI errors and their process exit codes.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the subcommands.
///
/// Usage-class failures (missing input) exit with code 2, matching what the
/// argument parser does for malformed invocations; everything else exits 1.
#[derive(Debug, Error)]
pub enum CliError {
    /// The input file does not exist.
    #[error("input file not found: {0}")]
    InputNotFound(PathBuf),

    /// The input file exceeds the per-command size cap.
    #[error("input file too large ({size} bytes, cap {cap} bytes): {path}")]
    InputTooLarge {
        /// The offending file.
        path: PathBuf,
        /// Observed size in bytes.
        size: u64,
        /// The applicable cap in bytes.
        cap: u64,
    },

    /// The capture parsed cleanly but contained no trading listings.
    ///
    /// Distinguishes "ran but found nothing" from success.
    #[error("no trading center listings found in capture")]
    NoListings,

    /// No candidate item-table files were discovered.
    #[error("no item table sources discovered")]
    NoSources,

    /// The discovered sources produced an empty mapping.
    #[error("no item entries found in the discovered sources")]
    EmptyMapping,

    /// Reducing decoded combat data failed.
    #[error(transparent)]
    Reduce(#[from] bpsr_core::ReduceError),

    /// Loading or writing an item catalog failed.
    #[error(transparent)]
    Catalog(#[from] bpsr_core::CatalogError),

    /// Serializing an output surface failed.
    #[error("failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Reading an input or writing an output failed.
    #[error("{context}: {source}")]
    Io {
        /// What the I/O operation was doing.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    /// The process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InputNotFound(_) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_input_is_a_usage_error() {
        assert_eq!(CliError::InputNotFound(PathBuf::from("x.bin")).exit_code(), 2);
    }

    #[test]
    fn other_failures_exit_one() {
        assert_eq!(CliError::NoListings.exit_code(), 1);
        assert_eq!(
            CliError::InputTooLarge { path: PathBuf::from("x"), size: 10, cap: 5 }.exit_code(),
            1
        );
    }
}
