//! Resynchronizing Notify frame parser.
//!
//! Captures arrive truncated, reordered, and interleaved with garbage. The
//! parser walks a buffer one frame at a time; on any implausible header it
//! slides forward a single byte and retries. One corrupt region therefore
//! costs exactly one resync event per garbage byte and every later frame is
//! still recovered.
//!
//! FrameDown carriers hold a nested frame stream, usually compressed. Nested
//! streams are parsed by the same state machine through an explicit stack of
//! in-progress walks, so capture content cannot grow the call stack; the
//! stack depth is capped.

use std::borrow::Cow;

use crate::decompress::maybe_decompress;
use crate::header::{FragmentType, FrameHeader, NotifyHeader};
use crate::stats::FramerStats;

/// Maximum FrameDown nesting depth; deeper carriers are not descended into.
const MAX_NESTING_DEPTH: usize = 8;

/// A successfully parsed application-level message.
///
/// Produced by [`FrameReader::iter_notify_frames`]; single-use, consumed by a
/// schema decoder. The payload borrows the capture buffer unless the frame
/// was decompressed or lifted out of a nested stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyFrame<'a> {
    /// Originating service identifier.
    pub service_uid: u64,
    /// RPC stub identifier.
    pub stub_id: u32,
    /// Method identifier; selects the payload schema.
    pub method_id: u32,
    /// Message payload, decompressed when the frame carried the flag and the
    /// zstd magic.
    pub payload: Cow<'a, [u8]>,
    /// Whether decompression actually ran and succeeded.
    pub was_compressed: bool,
    /// Byte offset of the frame header within its containing stream (the
    /// capture itself, or the decompressed FrameDown body for nested frames).
    pub offset: u64,
}

impl NotifyFrame<'_> {
    /// Copy the payload out of the capture buffer, detaching the lifetime.
    #[must_use]
    pub fn into_owned(self) -> NotifyFrame<'static> {
        NotifyFrame {
            service_uid: self.service_uid,
            stub_id: self.stub_id,
            method_id: self.method_id,
            payload: Cow::Owned(self.payload.into_owned()),
            was_compressed: self.was_compressed,
            offset: self.offset,
        }
    }
}

/// Incremental capture parser; owns the counters across one or more walks.
#[derive(Debug, Default)]
pub struct FrameReader {
    stats: FramerStats,
}

impl FrameReader {
    /// Create a reader with zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters accumulated so far.
    #[must_use]
    pub fn stats(&self) -> &FramerStats {
        &self.stats
    }

    /// Lazily yield the Notify frames contained in `data`.
    ///
    /// Frames nested inside FrameDown carriers are yielded in DFS pre-order.
    /// The iterator borrows the reader mutably; counters are readable once it
    /// is dropped. Peak memory is one decompressed payload regardless of
    /// capture size.
    pub fn iter_notify_frames<'a>(&'a mut self, data: &'a [u8]) -> NotifyFrames<'a> {
        self.stats.bytes_scanned += data.len() as u64;
        NotifyFrames {
            stats: &mut self.stats,
            streams: vec![Stream { data: StreamBuf::Capture(data), offset: 0 }],
        }
    }
}

/// One in-progress walk: the capture itself or a nested FrameDown body.
struct Stream<'a> {
    data: StreamBuf<'a>,
    offset: usize,
}

enum StreamBuf<'a> {
    /// Borrowed view of the outer capture buffer.
    Capture(&'a [u8]),
    /// Owned nested stream lifted out of a FrameDown carrier.
    Nested(Vec<u8>),
}

/// Lazy iterator over the Notify frames of one capture buffer.
pub struct NotifyFrames<'a> {
    stats: &'a mut FramerStats,
    streams: Vec<Stream<'a>>,
}

impl<'a> Iterator for NotifyFrames<'a> {
    type Item = NotifyFrame<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let depth = self.streams.len();
            let stream = self.streams.last_mut()?;
            let Stream { data, offset } = stream;

            let step = match data {
                StreamBuf::Capture(capture) => advance(*capture, offset, self.stats),
                // Frames found inside an owned nested stream cannot borrow
                // from it; detach them before the stream is popped.
                StreamBuf::Nested(nested) => match advance(nested, offset, self.stats) {
                    Step::Yield(frame) => Step::Yield(frame.into_owned()),
                    Step::Descend(buf) => Step::Descend(buf),
                    Step::Exhausted => Step::Exhausted,
                },
            };

            match step {
                Step::Yield(frame) => return Some(frame),
                Step::Descend(nested) => {
                    if depth < MAX_NESTING_DEPTH {
                        self.streams.push(Stream { data: StreamBuf::Nested(nested), offset: 0 });
                    }
                },
                Step::Exhausted => {
                    self.streams.pop();
                },
            }
        }
    }
}

/// Outcome of advancing one stream walk.
enum Step<'b> {
    /// A Notify frame was parsed.
    Yield(NotifyFrame<'b>),
    /// A FrameDown carrier produced a nested stream to walk next.
    Descend(Vec<u8>),
    /// The stream has no more parseable bytes.
    Exhausted,
}

/// Walk `data` from `*offset` until something reportable happens.
///
/// Resyncs and uninteresting fragment types are handled internally; the
/// function only returns for a parsed Notify, a nested stream, or stream end.
fn advance<'b>(data: &'b [u8], offset: &mut usize, stats: &mut FramerStats) -> Step<'b> {
    while *offset + FrameHeader::SIZE <= data.len() {
        let Some(header) = FrameHeader::from_prefix(&data[*offset..]) else {
            return Step::Exhausted;
        };

        let frame_len = header.length() as usize;
        if frame_len < FrameHeader::SIZE || *offset + frame_len > data.len() {
            // Framing miss: slide one byte and retry. This tolerates leading
            // garbage and recovers the remainder of the stream after any
            // malformed frame.
            *offset += 1;
            stats.resync_events += 1;
            continue;
        }

        let frame_offset = *offset as u64;
        let body = &data[*offset + FrameHeader::SIZE..*offset + frame_len];
        let is_compressed = header.is_compressed();
        let fragment = header.fragment_type();
        stats.record_frame(fragment.code());
        *offset += frame_len;

        match fragment {
            FragmentType::Notify => {
                if let Some(frame) = parse_notify(body, is_compressed, frame_offset, stats) {
                    stats.notify_frames += 1;
                    return Step::Yield(frame);
                }
            },
            FragmentType::FrameDown => {
                // Body layout: [server_sequence: u32][nested stream]. The
                // sequence is only meaningful to the trading path, which
                // walks raw bodies itself; here it is skipped.
                if body.len() > 4 {
                    let (nested, _) = maybe_decompress(&body[4..], is_compressed, stats);
                    if !nested.is_empty() {
                        return Step::Descend(nested.into_owned());
                    }
                }
            },
            FragmentType::Other(_) => {},
        }
    }
    Step::Exhausted
}

/// Parse a Notify body into a frame, decompressing the payload if flagged.
///
/// A body too short for the routing prefix counts as a resync event but does
/// not slide the cursor: the outer framing was valid, only the inner Notify
/// is truncated.
fn parse_notify<'b>(
    body: &'b [u8],
    flagged: bool,
    frame_offset: u64,
    stats: &mut FramerStats,
) -> Option<NotifyFrame<'b>> {
    let Some(header) = NotifyHeader::from_prefix(body) else {
        stats.resync_events += 1;
        return None;
    };

    let (payload, was_compressed) = maybe_decompress(&body[NotifyHeader::SIZE..], flagged, stats);
    Some(NotifyFrame {
        service_uid: header.service_uid(),
        stub_id: header.stub_id(),
        method_id: header.method_id(),
        payload,
        was_compressed,
        offset: frame_offset,
    })
}
