//! Fuzz target for the resynchronizing framer.
//!
//! The framer must terminate on arbitrary bytes without panicking, and its
//! resync count must stay bounded by the positions it visited. Decompression
//! runs behind the same entry point, so hostile zstd payloads (bad headers,
//! bombs) are exercised too.

#![no_main]

use bpsr_proto::FrameReader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut reader = FrameReader::new();
    let frames = reader.iter_notify_frames(data).count();

    let stats = reader.stats();
    assert_eq!(stats.bytes_scanned, data.len() as u64);
    assert_eq!(frames as u64, stats.notify_frames);
    assert!(stats.resync_events <= data.len() as u64 + stats.frames_parsed);
});
