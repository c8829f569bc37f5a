//! End-to-end subcommand tests over synthetic captures.
//!
//! These drive the command implementations directly (no subprocess) against
//! temp files: build a capture byte-for-byte, decode it, reduce it, and
//! check the artifacts the way a user would read them.

use std::fs;

use bpsr_cli::CliError;
use bpsr_cli::commands::{run_decode, run_dps, run_trade_decode, run_update_items};
use bpsr_core::blueproto::{
    AoiSyncDelta, AoiSyncToMeDelta, SyncDamageInfo, SyncServerTime, SyncSkillEffects,
    SyncToMeDeltaInfo,
};
use bpsr_core::{COMBAT_SERVICE_UID, METHOD_SYNC_SERVER_TIME, METHOD_SYNC_TO_ME_DELTA_INFO};
use prost::Message;
use serde_json::Value;

fn frame(fragment_code: u16, compressed: bool, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&((body.len() + 6) as u32).to_be_bytes());
    let mut pkt_type = fragment_code;
    if compressed {
        pkt_type |= 0x8000;
    }
    out.extend_from_slice(&pkt_type.to_be_bytes());
    out.extend_from_slice(body);
    out
}

fn notify(service_uid: u64, method_id: u32, payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&service_uid.to_be_bytes());
    body.extend_from_slice(&1_u32.to_be_bytes());
    body.extend_from_slice(&method_id.to_be_bytes());
    body.extend_from_slice(payload);
    frame(0x0002, false, &body)
}

fn server_time_frame(ms: i64) -> Vec<u8> {
    let message = SyncServerTime { server_milliseconds: Some(ms), client_milliseconds: None };
    notify(COMBAT_SERVICE_UID, METHOD_SYNC_SERVER_TIME, &message.encode_to_vec())
}

fn damage_frame(attacker: i64, value: i64, crit: bool) -> Vec<u8> {
    let message = SyncToMeDeltaInfo {
        delta_info: Some(AoiSyncToMeDelta {
            uuid: Some(attacker),
            base_delta: Some(AoiSyncDelta {
                uuid: Some(999),
                skill_effects: Some(SyncSkillEffects {
                    damages: vec![SyncDamageInfo {
                        actual_value: Some(value),
                        attacker_uuid: Some(attacker),
                        owner_id: Some(42),
                        is_crit: Some(crit),
                        ..Default::default()
                    }],
                }),
            }),
        }),
    };
    notify(COMBAT_SERVICE_UID, METHOD_SYNC_TO_ME_DELTA_INFO, &message.encode_to_vec())
}

fn combat_capture() -> Vec<u8> {
    let mut capture = server_time_frame(1_000);
    capture.extend(damage_frame(7, 100, true));
    capture.extend(server_time_frame(3_000));
    capture.extend(damage_frame(7, 100, true));
    capture
}

#[test]
fn decode_then_dps_produces_the_expected_summary() {
    let dir = tempfile::tempdir().unwrap();
    let capture_path = dir.path().join("capture.bin");
    let decoded_path = dir.path().join("combat.jsonl");
    let stats_path = dir.path().join("stats.json");
    let summary_path = dir.path().join("dps.json");

    fs::write(&capture_path, combat_capture()).unwrap();

    run_decode(&capture_path, &decoded_path, Some(&stats_path)).unwrap();

    let decoded = fs::read_to_string(&decoded_path).unwrap();
    let lines: Vec<&str> = decoded.lines().collect();
    assert_eq!(lines.len(), 4);
    let first: Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["message_type"], "blueprotobuf_package.SyncServerTime");
    assert_eq!(first["service_uid"], "0x0000000063335342");

    let stats: Value = serde_json::from_str(&fs::read_to_string(&stats_path).unwrap()).unwrap();
    assert_eq!(stats["frames_parsed"], 4);
    assert_eq!(stats["notify_frames"], 4);
    assert_eq!(stats["resync_events"], 0);
    assert_eq!(stats["sync_to_me_delta_info"], 2);
    assert_eq!(stats["method_histogram"]["0x0000002e"], 2);

    run_dps(&decoded_path, &summary_path).unwrap();

    let summary: Value = serde_json::from_str(&fs::read_to_string(&summary_path).unwrap()).unwrap();
    assert_eq!(summary["total_damage"], 200);
    assert_eq!(summary["hits"], 2);
    assert_eq!(summary["crits"], 2);
    assert_eq!(summary["active_duration_s"], 2.0);
    assert_eq!(summary["dps"], 100.0);
    assert_eq!(summary["skills"]["42"]["damage"], 200);
    assert_eq!(summary["targets"]["999"]["hits"], 2);
}

#[test]
fn decode_missing_input_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = run_decode(
        &dir.path().join("absent.bin"),
        &dir.path().join("out.jsonl"),
        None,
    )
    .unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn dps_aborts_on_malformed_jsonl() {
    let dir = tempfile::tempdir().unwrap();
    let decoded_path = dir.path().join("combat.jsonl");
    fs::write(&decoded_path, "{\"message_type\": \"x\"}\n{broken\n").unwrap();

    let err = run_dps(&decoded_path, &dir.path().join("dps.json")).unwrap_err();
    assert!(matches!(err, CliError::Reduce(_)));
    assert_eq!(err.exit_code(), 1);
}

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

fn trade_capture() -> Vec<u8> {
    let mut details = Vec::new();
    put_field_varint(&mut details, 2, 100_001);

    let entry = |price: u64, quantity: u64| {
        let mut entry = Vec::new();
        put_field_varint(&mut entry, 1, price);
        put_field_varint(&mut entry, 2, quantity);
        put_field_message(&mut entry, 3, &details);
        entry
    };

    let mut reply = Vec::new();
    put_field_message(&mut reply, 2, &entry(1500, 3));
    put_field_message(&mut reply, 2, &entry(1500, 3));
    put_field_message(&mut reply, 2, &entry(900, 1));
    let mut block = Vec::new();
    put_field_message(&mut block, 1, &reply);

    let compressed = zstd::encode_all(block.as_slice(), 0).unwrap();
    let mut body = Vec::new();
    body.extend_from_slice(&77_u32.to_be_bytes());
    body.extend_from_slice(&compressed);
    frame(0x0006, true, &body)
}

#[test]
fn trade_decode_consolidates_listings() {
    let dir = tempfile::tempdir().unwrap();
    let capture_path = dir.path().join("trade.bin");
    let output_path = dir.path().join("listings.json");
    fs::write(&capture_path, trade_capture()).unwrap();

    run_trade_decode(&capture_path, &output_path, true, true).unwrap();

    let listings: Value =
        serde_json::from_str(&fs::read_to_string(&output_path).unwrap()).unwrap();
    let listings = listings.as_array().unwrap();
    assert_eq!(listings.len(), 2);
    assert_eq!(listings[0]["price_luno"], 1500);
    assert_eq!(listings[0]["item_id"], 100_001);
    assert_eq!(listings[0]["metadata"]["server_sequence"], 77);
    assert!(listings[0].get("item_name").is_none());
}

#[test]
fn trade_decode_reports_empty_captures() {
    let dir = tempfile::tempdir().unwrap();
    let capture_path = dir.path().join("empty.bin");
    fs::write(&capture_path, frame(0x0002, false, &[0_u8; 20])).unwrap();

    let err = run_trade_decode(&capture_path, &dir.path().join("out.json"), true, true)
        .unwrap_err();
    assert!(matches!(err, CliError::NoListings));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn update_items_builds_a_mapping_from_a_dump() {
    let dir = tempfile::tempdir().unwrap();
    let dump = dir.path().join("dump");
    fs::create_dir_all(dump.join("ztable")).unwrap();
    fs::write(
        dump.join("item_name_map.json"),
        r#"{"100": {"name": "Iron Sword", "icon": "icons/iron.png"}}"#,
    )
    .unwrap();
    fs::write(
        dump.join("ztable").join("ItemTable.json"),
        r#"{"r": {"Id": 200, "Name": "Herb"}}"#,
    )
    .unwrap();

    let output = dir.path().join("mapping.json");
    run_update_items(&[dump], &output, 2, true).unwrap();

    let mapping: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(mapping["100"]["name"], "Iron Sword");
    assert_eq!(mapping["200"]["name"], "Herb");
}

#[test]
fn update_items_without_sources_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nowhere");
    let err =
        run_update_items(&[missing], &dir.path().join("out.json"), 2, true).unwrap_err();
    assert!(matches!(err, CliError::NoSources));
}
