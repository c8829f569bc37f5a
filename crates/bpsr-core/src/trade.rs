//! Trading-house listing extraction from FrameDown fragments.
//!
//! Listings do not travel as Notify frames: they sit inside FrameDown bodies
//! whose nested stream is a concatenation of length-delimited protobuf
//! messages rather than further frames. The extractor walks the raw capture
//! itself, decompresses FrameDown tails, and scans for the `0x0A` tag byte
//! (field 1, length-delimited) that opens a listing block. The tag-byte
//! heuristic is intentional: it finds listing blocks without a schema, which
//! keeps the extractor working on fragments whose outer framing was
//! truncated or reordered.

use bpsr_proto::{FragmentType, FramerStats, iter_raw_frames, maybe_decompress};
use serde_json::{Map, Value};

use crate::wiretree;

/// One trading-house entry observed in a capture fragment.
///
/// Only constructed when price, quantity, and the nested item details are
/// all present and well-typed.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Listing {
    /// Byte offset of the carrier frame in the capture.
    pub frame_offset: u64,
    /// Server sequence of the carrier frame.
    pub server_sequence: u32,
    /// Asking price in luno.
    pub price_luno: u64,
    /// Listed quantity.
    pub quantity: u64,
    /// Item configuration id, when the details carry one.
    pub item_config_id: Option<u64>,
    /// The undigested entry subtree, for audit.
    pub raw_entry: Value,
}

/// Scan a raw capture buffer for trading listings.
///
/// Returns listings in capture order, duplicates included; see
/// [`crate::consolidate::consolidate`] for deduplication.
#[must_use]
pub fn extract_listings(data: &[u8]) -> Vec<Listing> {
    let mut stats = FramerStats::default();
    let mut listings = Vec::new();

    for frame in iter_raw_frames(data) {
        if frame.fragment_code != FragmentType::FRAME_DOWN {
            continue;
        }
        let body = frame.body;
        if body.len() <= 4 {
            continue;
        }
        let server_sequence = u32::from_be_bytes([body[0], body[1], body[2], body[3]]);
        let (nested, _) = maybe_decompress(&body[4..], frame.is_compressed, &mut stats);
        if nested.is_empty() {
            continue;
        }
        scan_listing_blocks(&nested, frame.offset, server_sequence, &mut listings);
    }

    if stats.resync_events > 0 || stats.zstd_flag_without_magic > 0 {
        tracing::debug!(
            resync_events = stats.resync_events,
            zstd_flag_without_magic = stats.zstd_flag_without_magic,
            "decompression anomalies while scanning for listings"
        );
    }
    listings
}

/// Scan one nested FrameDown stream for listing blocks.
///
/// Failures slide one byte, the same resync discipline the framer applies;
/// a declared length that overruns the stream abandons the block entirely.
fn scan_listing_blocks(
    nested: &[u8],
    frame_offset: u64,
    server_sequence: u32,
    out: &mut Vec<Listing>,
) {
    let mut idx = 0;
    while idx < nested.len() {
        // Field 1, wire type 2: the only shape a listing block starts with.
        if nested[idx] != 0x0A {
            idx += 1;
            continue;
        }
        let Some((msg_len, len_end)) = wiretree::read_varint(nested, idx + 1) else {
            idx += 1;
            continue;
        };
        let Ok(msg_len) = usize::try_from(msg_len) else {
            idx += 1;
            continue;
        };
        let Some(segment_end) = len_end.checked_add(msg_len) else {
            idx += 1;
            continue;
        };
        if segment_end > nested.len() {
            break;
        }

        let segment = &nested[idx..segment_end];
        let Some(message) = wiretree::decode_message(segment) else {
            idx += 1;
            continue;
        };

        let added = collect_entries(&message, frame_offset, server_sequence, out);
        if added > 0 {
            tracing::debug!(
                frame_offset,
                server_sequence,
                entries = added,
                "trade listing block detected"
            );
        }
        idx = segment_end;
    }
}

/// Pull well-formed listing entries out of a decoded block.
///
/// Expected shape: `message["1"]["2"]` is the entry list; each entry has
/// price at `"1"`, quantity at `"2"`, and item details at `"3"` with the
/// config id at `"3"]["2"`.
fn collect_entries(
    message: &Map<String, Value>,
    frame_offset: u64,
    server_sequence: u32,
    out: &mut Vec<Listing>,
) -> usize {
    let Some(Value::Object(inner)) = message.get("1") else {
        return 0;
    };
    let Some(Value::Array(entries)) = inner.get("2") else {
        return 0;
    };

    let mut added = 0;
    for entry in entries {
        let Value::Object(fields) = entry else {
            continue;
        };
        let Some(price_luno) = fields.get("1").and_then(Value::as_u64) else {
            continue;
        };
        let Some(quantity) = fields.get("2").and_then(Value::as_u64) else {
            continue;
        };
        let Some(Value::Object(details)) = fields.get("3") else {
            continue;
        };
        if !details.contains_key("2") {
            continue;
        }
        let item_config_id = details.get("2").and_then(Value::as_u64);

        out.push(Listing {
            frame_offset,
            server_sequence,
            price_luno,
            quantity,
            item_config_id,
            raw_entry: entry.clone(),
        });
        added += 1;
    }
    added
}

#[cfg(test)]
mod tests {
    use bytes::BufMut;

    use super::*;

    fn put_varint(out: &mut Vec<u8>, mut value: u64) {
        loop {
            let mut byte = (value & 0x7F) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            out.push(byte);
            if value == 0 {
                return;
            }
        }
    }

    fn put_field_varint(out: &mut Vec<u8>, field_number: u64, value: u64) {
        put_varint(out, field_number << 3);
        put_varint(out, value);
    }

    fn put_field_message(out: &mut Vec<u8>, field_number: u64, body: &[u8]) {
        put_varint(out, (field_number << 3) | 2);
        put_varint(out, body.len() as u64);
        out.extend_from_slice(body);
    }

    /// One listing entry: price, quantity, details with item config id.
    fn listing_entry(price: u64, quantity: u64, item_id: u64) -> Vec<u8> {
        let mut details = Vec::new();
        put_field_varint(&mut details, 2, item_id);

        let mut entry = Vec::new();
        put_field_varint(&mut entry, 1, price);
        put_field_varint(&mut entry, 2, quantity);
        put_field_message(&mut entry, 3, &details);
        entry
    }

    /// A listing block as found in FrameDown nested streams: field 1 wraps
    /// the reply, whose field 2 repeats the entries.
    fn listing_block(entries: &[Vec<u8>]) -> Vec<u8> {
        let mut reply = Vec::new();
        for entry in entries {
            put_field_message(&mut reply, 2, entry);
        }
        let mut block = Vec::new();
        put_field_message(&mut block, 1, &reply);
        block
    }

    fn frame_down(server_sequence: u32, compressed: bool, nested: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.put_u32(server_sequence);
        body.put_slice(nested);

        let mut out = Vec::new();
        out.put_u32((body.len() + 6) as u32);
        let mut pkt_type = FragmentType::FRAME_DOWN;
        if compressed {
            pkt_type |= 0x8000;
        }
        out.put_u16(pkt_type);
        out.put_slice(&body);
        out
    }

    #[test]
    fn extracts_listings_from_a_frame_down() {
        let block =
            listing_block(&[listing_entry(1500, 3, 100_001), listing_entry(900, 1, 100_002)]);
        let data = frame_down(7, false, &block);

        let listings = extract_listings(&data);
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].price_luno, 1500);
        assert_eq!(listings[0].quantity, 3);
        assert_eq!(listings[0].item_config_id, Some(100_001));
        assert_eq!(listings[0].server_sequence, 7);
        assert_eq!(listings[0].frame_offset, 0);
        assert_eq!(listings[1].item_config_id, Some(100_002));
    }

    #[test]
    fn extracts_from_compressed_frame_down() {
        let block =
            listing_block(&[listing_entry(250, 10, 55_555), listing_entry(260, 2, 55_556)]);
        let compressed = zstd::encode_all(block.as_slice(), 0).unwrap();
        let data = frame_down(3, true, &compressed);

        let listings = extract_listings(&data);
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].price_luno, 250);
    }

    #[test]
    fn skips_entries_missing_required_fields() {
        // Entry without the item details message.
        let mut bare = Vec::new();
        put_field_varint(&mut bare, 1, 100);
        put_field_varint(&mut bare, 2, 1);

        let block = listing_block(&[bare, listing_entry(200, 2, 42), listing_entry(9, 9, 43)]);
        let data = frame_down(1, false, &block);

        let listings = extract_listings(&data);
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].price_luno, 200);
    }

    #[test]
    fn notify_frames_produce_no_listings() {
        let mut data = Vec::new();
        data.put_u32(6 + 20);
        data.put_u16(FragmentType::NOTIFY);
        data.put_slice(&[0_u8; 20]);

        assert!(extract_listings(&data).is_empty());
    }

    #[test]
    fn garbage_between_blocks_is_skipped() {
        let block = listing_block(&[listing_entry(77, 7, 777), listing_entry(78, 8, 778)]);
        let mut nested = vec![0x13, 0x37, 0x00];
        nested.extend_from_slice(&block);
        let data = frame_down(2, false, &nested);

        let listings = extract_listings(&data);
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].price_luno, 77);
    }

    #[test]
    fn overrunning_declared_length_abandons_the_block() {
        // 0x0A then a huge declared length.
        let mut nested = vec![0x0A];
        put_varint(&mut nested, 1_000_000);
        nested.extend_from_slice(&[0x01, 0x02, 0x03]);
        let data = frame_down(4, false, &nested);

        assert!(extract_listings(&data).is_empty());
    }

    #[test]
    fn raw_entry_preserves_the_decoded_subtree() {
        let block = listing_block(&[listing_entry(5, 6, 7), listing_entry(8, 9, 10)]);
        let data = frame_down(1, false, &block);

        let listings = extract_listings(&data);
        assert_eq!(listings[0].raw_entry["1"], 5);
        assert_eq!(listings[0].raw_entry["2"], 6);
        assert_eq!(listings[0].raw_entry["3"]["2"], 7);
    }
}
