//! Schema-less protobuf decoding into field-number-keyed trees.
//!
//! The trading path has no usable schema: listing blocks are located by
//! scanning for a tag byte and decoded structurally. This walker classifies
//! the four scalar wire types and guesses at length-delimited payloads:
//! nested message if the bytes parse to completion, UTF-8 string if they
//! read as text, hex string otherwise. Callers only ever read a handful of
//! low field numbers out of the result.
//!
//! The walker is deliberately hand-rolled; dragging in a dynamic-protobuf
//! dependency for three field reads is not worth it.

use bytes::Buf;
use serde_json::{Map, Value};

/// Maximum depth of nested-message classification attempts.
const MAX_NESTING_DEPTH: usize = 16;

/// Decode an unsigned LEB128 varint starting at `pos`.
///
/// Returns the value and the index one past its last byte, or `None` when
/// the buffer ends mid-varint or the varint overruns 64 bits.
#[must_use]
pub fn read_varint(data: &[u8], pos: usize) -> Option<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift: u32 = 0;
    let mut idx = pos;
    while idx < data.len() {
        if shift >= 64 {
            return None;
        }
        let byte = data[idx];
        value |= u64::from(byte & 0x7F) << shift;
        idx += 1;
        if byte & 0x80 == 0 {
            return Some((value, idx));
        }
        shift += 7;
    }
    None
}

/// Try to decode `data` as one complete protobuf message.
///
/// Field numbers become decimal-string keys; repeated occurrences of a field
/// collapse into an array. `None` when any byte fails to classify; the
/// caller treats that as a resync point, mirroring the framer's discipline.
#[must_use]
pub fn decode_message(data: &[u8]) -> Option<Map<String, Value>> {
    decode_at_depth(data, 0)
}

fn decode_at_depth(data: &[u8], depth: usize) -> Option<Map<String, Value>> {
    if depth > MAX_NESTING_DEPTH {
        return None;
    }

    let mut fields = Map::new();
    let mut idx = 0;
    while idx < data.len() {
        let (tag, next) = read_varint(data, idx)?;
        idx = next;

        let field_number = tag >> 3;
        if field_number == 0 {
            return None;
        }

        let value = match tag & 0x7 {
            0 => {
                let (value, next) = read_varint(data, idx)?;
                idx = next;
                Value::from(value)
            },
            1 => {
                if data.len() - idx < 8 {
                    return None;
                }
                let mut chunk = &data[idx..idx + 8];
                let value = chunk.get_u64_le();
                idx += 8;
                Value::from(value)
            },
            2 => {
                let (len, next) = read_varint(data, idx)?;
                let len = usize::try_from(len).ok()?;
                idx = next;
                if data.len() - idx < len {
                    return None;
                }
                let chunk = &data[idx..idx + len];
                idx += len;
                classify_delimited(chunk, depth)
            },
            5 => {
                if data.len() - idx < 4 {
                    return None;
                }
                let mut chunk = &data[idx..idx + 4];
                let value = chunk.get_u32_le();
                idx += 4;
                Value::from(value)
            },
            // Groups (3/4) and reserved wire types.
            _ => return None,
        };

        insert_field(&mut fields, field_number, value);
    }
    Some(fields)
}

/// Best-effort classification of a length-delimited payload.
fn classify_delimited(chunk: &[u8], depth: usize) -> Value {
    if !chunk.is_empty() {
        if let Some(nested) = decode_at_depth(chunk, depth + 1) {
            return Value::Object(nested);
        }
    }
    match std::str::from_utf8(chunk) {
        Ok(text) => Value::from(text),
        Err(_) => Value::from(hex::encode(chunk)),
    }
}

/// Insert a field value, collapsing repeats into an array.
fn insert_field(fields: &mut Map<String, Value>, field_number: u64, value: Value) {
    let key = field_number.to_string();
    match fields.get_mut(&key) {
        None => {
            fields.insert(key, value);
        },
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        },
    }
}
