//! Schema dispatch for combat Notify frames.
//!
//! A small method-id table maps frames of the combat service onto the
//! `blueprotobuf_package` messages they carry. Decoded messages are projected
//! into JSON trees that preserve proto field names and serialize enums by
//! their symbolic names; downstream reducers match on those names.
//!
//! Everything that is not a combat frame (wrong service, unknown method,
//! malformed payload) decodes to `None`. The framer has already advanced
//! past the frame, so nothing else needs to happen.

use bpsr_proto::NotifyFrame;
use prost::Message;
use serde_json::{Map, Value};

use crate::blueproto::{
    AoiSyncData, AoiSyncDelta, AoiSyncToMeDelta, EDamageType, SyncContainerData,
    SyncContainerDirtyData, SyncDamageInfo, SyncNearDeltaInfo, SyncNearEntities, SyncServerTime,
    SyncSkillEffects, SyncToMeDeltaInfo,
};

/// Service identifier carried by combat Notify frames.
pub const COMBAT_SERVICE_UID: u64 = 0x0000_0000_6333_5342;

/// `SyncNearEntities` method id.
pub const METHOD_SYNC_NEAR_ENTITIES: u32 = 0x0000_0006;
/// `SyncContainerData` method id.
pub const METHOD_SYNC_CONTAINER_DATA: u32 = 0x0000_0015;
/// `SyncContainerDirtyData` method id.
pub const METHOD_SYNC_CONTAINER_DIRTY_DATA: u32 = 0x0000_0016;
/// `SyncServerTime` method id.
pub const METHOD_SYNC_SERVER_TIME: u32 = 0x0000_002B;
/// `SyncNearDeltaInfo` method id.
pub const METHOD_SYNC_NEAR_DELTA_INFO: u32 = 0x0000_002D;
/// `SyncToMeDeltaInfo` method id.
pub const METHOD_SYNC_TO_ME_DELTA_INFO: u32 = 0x0000_002E;

/// A schema-interpreted Notify frame, ready for JSONL serialization.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DecodedRecord {
    /// Service identifier, formatted `0x` plus 16 lowercase hex digits.
    pub service_uid: String,
    /// RPC stub identifier.
    pub stub_id: u32,
    /// Method identifier.
    pub method_id: u32,
    /// Fully qualified message type name.
    pub message_type: String,
    /// Field-name-keyed message tree; enums appear as symbolic names.
    pub data: Value,
}

impl DecodedRecord {
    /// Serialize as one JSONL line (no trailing newline, non-ASCII intact).
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Decoder for combat Notify frames.
///
/// Stateless; the schema table is compiled in. Construct once and reuse
/// across frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct CombatDecoder;

impl CombatDecoder {
    /// Create a decoder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Interpret one Notify frame.
    ///
    /// `None` for frames of other services, unknown method ids, and payloads
    /// that fail to parse; none of these are errors.
    #[must_use]
    pub fn decode(&self, frame: &NotifyFrame<'_>) -> Option<DecodedRecord> {
        if frame.service_uid != COMBAT_SERVICE_UID {
            return None;
        }

        let payload = frame.payload.as_ref();
        let (message_type, data) = match frame.method_id {
            METHOD_SYNC_NEAR_ENTITIES => (
                "blueprotobuf_package.SyncNearEntities",
                near_entities_tree(&SyncNearEntities::decode(payload).ok()?),
            ),
            METHOD_SYNC_CONTAINER_DATA => (
                "blueprotobuf_package.SyncContainerData",
                container_data_tree(&SyncContainerData::decode(payload).ok()?),
            ),
            METHOD_SYNC_CONTAINER_DIRTY_DATA => (
                "blueprotobuf_package.SyncContainerDirtyData",
                container_dirty_tree(&SyncContainerDirtyData::decode(payload).ok()?),
            ),
            METHOD_SYNC_SERVER_TIME => (
                "blueprotobuf_package.SyncServerTime",
                server_time_tree(&SyncServerTime::decode(payload).ok()?),
            ),
            METHOD_SYNC_NEAR_DELTA_INFO => (
                "blueprotobuf_package.SyncNearDeltaInfo",
                near_delta_tree(&SyncNearDeltaInfo::decode(payload).ok()?),
            ),
            METHOD_SYNC_TO_ME_DELTA_INFO => (
                "blueprotobuf_package.SyncToMeDeltaInfo",
                to_me_delta_tree(&SyncToMeDeltaInfo::decode(payload).ok()?),
            ),
            _ => return None,
        };

        Some(DecodedRecord {
            service_uid: format!("0x{:016x}", frame.service_uid),
            stub_id: frame.stub_id,
            method_id: frame.method_id,
            message_type: message_type.to_owned(),
            data,
        })
    }
}

// Tree projection. Mirrors the protobuf JSON mapping: unset fields and empty
// repeated fields are omitted, field names are the proto names, enums are
// symbolic.

fn insert_i64(map: &mut Map<String, Value>, key: &str, value: Option<i64>) {
    if let Some(value) = value {
        map.insert(key.to_owned(), Value::from(value));
    }
}

fn insert_bool(map: &mut Map<String, Value>, key: &str, value: Option<bool>) {
    if let Some(value) = value {
        map.insert(key.to_owned(), Value::from(value));
    }
}

fn server_time_tree(msg: &SyncServerTime) -> Value {
    let mut map = Map::new();
    insert_i64(&mut map, "server_milliseconds", msg.server_milliseconds);
    insert_i64(&mut map, "client_milliseconds", msg.client_milliseconds);
    Value::Object(map)
}

fn near_entities_tree(msg: &SyncNearEntities) -> Value {
    let mut map = Map::new();
    if !msg.appear.is_empty() {
        map.insert(
            "appear".to_owned(),
            Value::Array(msg.appear.iter().map(aoi_sync_data_tree).collect()),
        );
    }
    if !msg.disappear.is_empty() {
        map.insert(
            "disappear".to_owned(),
            Value::Array(msg.disappear.iter().copied().map(Value::from).collect()),
        );
    }
    Value::Object(map)
}

fn aoi_sync_data_tree(msg: &AoiSyncData) -> Value {
    let mut map = Map::new();
    insert_i64(&mut map, "uuid", msg.uuid);
    insert_i64(&mut map, "config_id", msg.config_id.map(i64::from));
    Value::Object(map)
}

fn container_data_tree(msg: &SyncContainerData) -> Value {
    let mut map = Map::new();
    if let Some(v_data) = &msg.v_data {
        let mut inner = Map::new();
        insert_i64(&mut inner, "char_id", v_data.char_id);
        map.insert("v_data".to_owned(), Value::Object(inner));
    }
    Value::Object(map)
}

fn container_dirty_tree(msg: &SyncContainerDirtyData) -> Value {
    let mut map = Map::new();
    insert_i64(&mut map, "char_id", msg.char_id);
    if let Some(blob) = &msg.dirty_blob {
        map.insert("dirty_blob".to_owned(), Value::from(hex::encode(blob)));
    }
    Value::Object(map)
}

fn near_delta_tree(msg: &SyncNearDeltaInfo) -> Value {
    let mut map = Map::new();
    if !msg.delta_infos.is_empty() {
        map.insert(
            "delta_infos".to_owned(),
            Value::Array(msg.delta_infos.iter().map(delta_tree).collect()),
        );
    }
    Value::Object(map)
}

fn to_me_delta_tree(msg: &SyncToMeDeltaInfo) -> Value {
    let mut map = Map::new();
    if let Some(delta_info) = &msg.delta_info {
        map.insert("delta_info".to_owned(), to_me_delta_inner_tree(delta_info));
    }
    Value::Object(map)
}

fn to_me_delta_inner_tree(msg: &AoiSyncToMeDelta) -> Value {
    let mut map = Map::new();
    insert_i64(&mut map, "uuid", msg.uuid);
    if let Some(base_delta) = &msg.base_delta {
        map.insert("base_delta".to_owned(), delta_tree(base_delta));
    }
    Value::Object(map)
}

fn delta_tree(msg: &AoiSyncDelta) -> Value {
    let mut map = Map::new();
    insert_i64(&mut map, "uuid", msg.uuid);
    if let Some(skill_effects) = &msg.skill_effects {
        map.insert("skill_effects".to_owned(), skill_effects_tree(skill_effects));
    }
    Value::Object(map)
}

fn skill_effects_tree(msg: &SyncSkillEffects) -> Value {
    let mut map = Map::new();
    if !msg.damages.is_empty() {
        map.insert(
            "damages".to_owned(),
            Value::Array(msg.damages.iter().map(damage_tree).collect()),
        );
    }
    Value::Object(map)
}

fn damage_tree(msg: &SyncDamageInfo) -> Value {
    let mut map = Map::new();
    insert_i64(&mut map, "value", msg.value);
    insert_i64(&mut map, "lucky_value", msg.lucky_value);
    insert_i64(&mut map, "actual_value", msg.actual_value);
    insert_i64(&mut map, "hp_lessen_value", msg.hp_lessen_value);
    insert_i64(&mut map, "attacker_uuid", msg.attacker_uuid);
    insert_i64(&mut map, "owner_id", msg.owner_id);
    insert_i64(&mut map, "hit_event_id", msg.hit_event_id);
    insert_bool(&mut map, "is_crit", msg.is_crit);
    insert_bool(&mut map, "is_miss", msg.is_miss);
    if let Some(raw) = msg.r#type {
        // Unknown enum values keep their wire integer, like the protobuf
        // JSON mapping does.
        let value = match EDamageType::try_from(raw) {
            Ok(kind) => Value::from(kind.as_str_name()),
            Err(_) => Value::from(raw),
        };
        map.insert("type".to_owned(), value);
    }
    Value::Object(map)
}
