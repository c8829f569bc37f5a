//! Bounded zstd decompression for untrusted payloads.
//!
//! Frames flag compression per packet, but flagged payloads are not always
//! actually compressed, and a hostile capture can carry a decompression
//! bomb. Decompression therefore only runs when the payload starts with the
//! zstd magic, decodes through the streaming reader with a capped window,
//! and stops as soon as the expanded size crosses a hard limit. On any
//! failure the raw bytes come back unchanged so the caller can keep walking
//! the stream.

use std::borrow::Cow;
use std::io::Read;

use crate::stats::FramerStats;

/// Four-byte prefix identifying a zstandard stream.
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Largest zstd window accepted from a capture: 2^23 bytes (8 MiB).
const MAX_WINDOW_LOG: u32 = 23;

/// Hard cap on the expanded payload size (10 MiB).
const MAX_DECOMPRESSED_LEN: usize = 10 * 1024 * 1024;

/// Read granularity of the streaming decoder.
const READ_CHUNK_LEN: usize = 16 * 1024;

/// Decompress `data` if it was flagged compressed and looks like zstd.
///
/// Returns the payload and whether decompression actually ran:
///
/// - unflagged or empty input is returned as-is
/// - a flagged payload without the magic bumps
///   [`FramerStats::zstd_flag_without_magic`] and is returned as-is
///   (captures exist where the flag bit is set on plain payloads)
/// - a decoder error, or expansion past the 10 MiB cap, bumps
///   [`FramerStats::resync_events`] and returns the input as-is
///
/// The window and output caps are deliberate: they bound memory for
/// adversarial captures, which is why the one-shot decompress-everything
/// API is not used here.
pub fn maybe_decompress<'a>(
    data: &'a [u8],
    flagged: bool,
    stats: &mut FramerStats,
) -> (Cow<'a, [u8]>, bool) {
    if !flagged || data.is_empty() {
        return (Cow::Borrowed(data), false);
    }
    if !data.starts_with(&ZSTD_MAGIC) {
        stats.zstd_flag_without_magic += 1;
        return (Cow::Borrowed(data), false);
    }
    match decompress_bounded(data) {
        Ok(expanded) => (Cow::Owned(expanded), true),
        Err(err) => {
            tracing::debug!("rejected zstd payload: {err}");
            stats.resync_events += 1;
            (Cow::Borrowed(data), false)
        }
    }
}

/// Streaming decode with the window and output caps applied.
fn decompress_bounded(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = zstd::stream::read::Decoder::new(data)?;
    decoder.window_log_max(MAX_WINDOW_LOG)?;

    let mut expanded = Vec::new();
    let mut chunk = [0_u8; READ_CHUNK_LEN];
    loop {
        let read = decoder.read(&mut chunk)?;
        if read == 0 {
            return Ok(expanded);
        }
        if expanded.len() + read > MAX_DECOMPRESSED_LEN {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "expanded payload exceeds the 10 MiB cap",
            ));
        }
        expanded.extend_from_slice(&chunk[..read]);
    }
}
