//! Wire-level parsing for BPSR network captures.
//!
//! A capture is an untrusted byte stream of length-prefixed frames, some of
//! them zstd-compressed, some of them carriers for further nested frames.
//! This crate turns such a stream into application-level messages without
//! ever trusting a length field or a compression header:
//!
//! - [`FrameReader`]: resynchronizing parser producing [`NotifyFrame`]s and
//!   [`FramerStats`] counters
//! - [`iter_raw_frames`]: flat walk over top-level fragments for consumers
//!   that inspect raw bodies themselves
//! - [`maybe_decompress`]: zstd decompression with hard window/output caps
//!
//! All parsing failures are local: the reader slides one byte and keeps
//! going, and decompression failures fall back to the raw bytes. Nothing in
//! this crate returns a parse error to the caller; anomalies are counted
//! instead.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod decompress;
mod frame;
mod header;
mod raw;
mod stats;

pub use decompress::{ZSTD_MAGIC, maybe_decompress};
pub use frame::{FrameReader, NotifyFrame, NotifyFrames};
pub use header::{FragmentType, FrameHeader, NotifyHeader};
pub use raw::{RawFrame, RawFrames, iter_raw_frames};
pub use stats::FramerStats;
