//! Command-line front-end for the BPSR capture decoding toolkit.
//!
//! The binary (`bpsr`) is a thin dispatch layer; all subcommand behavior
//! lives in [`commands`] so integration tests can exercise it without
//! spawning processes.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod commands;
mod error;

pub use error::CliError;
