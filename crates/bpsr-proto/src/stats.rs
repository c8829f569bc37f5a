//! Counters accumulated while walking a capture.

use std::collections::BTreeMap;

/// Observable outcome of a capture walk.
///
/// Counters are cumulative across multiple walks by the same reader. The
/// fragment histogram is keyed by the raw 15-bit fragment type code, so
/// unknown fragment types still show up with their wire value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FramerStats {
    /// Total bytes handed to the parser (outer buffers only; decompressed
    /// nested streams are not re-counted).
    pub bytes_scanned: u64,
    /// Frames with a plausible header, all fragment types.
    pub frames_parsed: u64,
    /// Notify frames successfully parsed.
    pub notify_frames: u64,
    /// Single-byte slides after implausible headers, plus truncated Notify
    /// bodies and rejected decompressions.
    pub resync_events: u64,
    /// Payloads flagged compressed that did not start with the zstd magic.
    pub zstd_flag_without_magic: u64,
    /// Frame count per fragment type code.
    pub fragment_histogram: BTreeMap<u16, u64>,
}

impl FramerStats {
    /// Record one parsed frame of the given fragment type code.
    pub(crate) fn record_frame(&mut self, fragment_code: u16) {
        self.frames_parsed += 1;
        *self.fragment_histogram.entry(fragment_code).or_default() += 1;
    }
}
