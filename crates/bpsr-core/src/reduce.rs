//! Streaming DPS aggregation over decoded combat records.
//!
//! The reducer folds a JSONL stream of [`crate::combat::DecodedRecord`]
//! shaped objects into a damage summary. It is order-sensitive only through
//! the server clock: `SyncServerTime` must precede the damage it timestamps,
//! which the wire order of a capture supplies naturally.
//!
//! Records decoded from protobuf JSON are loosely typed: int64 fields
//! arrive as numbers or decimal strings depending on the encoder generation.
//! All integer reads go through one tolerant parser instead of scattering
//! per-field fixups.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::ReduceError;

const MSG_SERVER_TIME: &str = "blueprotobuf_package.SyncServerTime";
const MSG_TO_ME_DELTA: &str = "blueprotobuf_package.SyncToMeDeltaInfo";
const MSG_NEAR_DELTA: &str = "blueprotobuf_package.SyncNearDeltaInfo";

/// Damage value candidates, in priority order. Missing or non-positive
/// candidates fall through to the next.
const DAMAGE_VALUE_FIELDS: [&str; 4] = ["actual_value", "value", "hp_lessen_value", "lucky_value"];

/// Accept an integer that may arrive as a number, bool, or decimal string.
fn lenient_int(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Bool(flag) => Some(i64::from(*flag)),
        Value::Number(number) => number.as_i64(),
        Value::String(text) if !text.is_empty() => text.trim().parse().ok(),
        _ => None,
    }
}

/// Truthiness in the loose, upstream-compatible sense: absent, `false`, `0`,
/// and empty strings are false; everything else is true.
fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(fields)) => !fields.is_empty(),
    }
}

/// Additive aggregation cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct Bucket {
    /// Total damage credited to this cell.
    pub damage: u64,
    /// Number of hits credited.
    pub hits: u64,
    /// Number of critical hits credited.
    pub crits: u64,
}

impl Bucket {
    fn credit(&mut self, damage: u64, crit: bool) {
        self.damage += damage;
        self.hits += 1;
        if crit {
            self.crits += 1;
        }
    }
}

/// Final DPS summary.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CombatSummary {
    /// Total damage credited.
    pub total_damage: u64,
    /// Total hits credited.
    pub hits: u64,
    /// Total critical hits credited.
    pub crits: u64,
    /// Seconds between the first and last credited damage, by server clock.
    pub active_duration_s: f64,
    /// `total_damage / active_duration_s`, zero when the duration is zero.
    pub dps: f64,
    /// Per-skill breakdown, keyed by decimal skill id, ascending.
    pub skills: BTreeMap<String, Bucket>,
    /// Per-target breakdown, keyed by decimal target uuid, ascending.
    pub targets: BTreeMap<String, Bucket>,
}

/// Streaming DPS reducer.
#[derive(Debug, Default)]
pub struct CombatReducer {
    total_damage: u64,
    hits: u64,
    crits: u64,
    player_uuid: Option<i64>,
    current_server_time_ms: Option<i64>,
    start_time_ms: Option<i64>,
    end_time_ms: Option<i64>,
    skill_buckets: BTreeMap<String, Bucket>,
    target_buckets: BTreeMap<String, Bucket>,
}

impl CombatReducer {
    /// Create an empty reducer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process decoded JSONL lines in order. Blank lines are skipped.
    ///
    /// # Errors
    ///
    /// A malformed line aborts the run with [`ReduceError::MalformedRecord`].
    /// Skipping bad lines silently would mask upstream decoder bugs.
    pub fn process_lines<I, S>(&mut self, lines: I) -> Result<(), ReduceError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for (index, line) in lines.into_iter().enumerate() {
            let line = line.as_ref();
            if line.trim().is_empty() {
                continue;
            }
            let record: Value = serde_json::from_str(line)
                .map_err(|source| ReduceError::MalformedRecord { line: index + 1, source })?;
            self.process_record(&record);
        }
        Ok(())
    }

    /// Fold one decoded record into the running state.
    ///
    /// Unknown message types are ignored; structurally surprising data inside
    /// known types degrades to a no-op rather than an error.
    pub fn process_record(&mut self, record: &Value) {
        let message_type = record.get("message_type").and_then(Value::as_str).unwrap_or_default();
        let empty = Map::new();
        let data = record.get("data").and_then(Value::as_object).unwrap_or(&empty);

        match message_type {
            MSG_SERVER_TIME => self.update_server_time(data),
            MSG_TO_ME_DELTA => {
                self.update_player_uuid(data);
                if let Some(base_delta) = data
                    .get("delta_info")
                    .and_then(Value::as_object)
                    .and_then(|delta| delta.get("base_delta"))
                    .and_then(Value::as_object)
                {
                    self.process_delta(base_delta);
                }
            },
            MSG_NEAR_DELTA => {
                if let Some(deltas) = data.get("delta_infos").and_then(Value::as_array) {
                    for delta in deltas {
                        if let Some(delta) = delta.as_object() {
                            self.process_delta(delta);
                        }
                    }
                }
            },
            _ => {},
        }
    }

    /// The computed summary for everything processed so far.
    #[must_use]
    pub fn summary(&self) -> CombatSummary {
        let duration_s = match (self.start_time_ms, self.end_time_ms) {
            (Some(start), Some(end)) => (end - start).max(0) as f64 / 1000.0,
            _ => 0.0,
        };
        let dps = if duration_s > 0.0 { self.total_damage as f64 / duration_s } else { 0.0 };

        CombatSummary {
            total_damage: self.total_damage,
            hits: self.hits,
            crits: self.crits,
            active_duration_s: duration_s,
            dps,
            skills: self.skill_buckets.clone(),
            targets: self.target_buckets.clone(),
        }
    }

    fn update_server_time(&mut self, data: &Map<String, Value>) {
        // Prefer the authoritative clock, fall back to the client's.
        let server_ms = lenient_int(data.get("server_milliseconds"))
            .or_else(|| lenient_int(data.get("client_milliseconds")));
        if let Some(server_ms) = server_ms {
            self.current_server_time_ms = Some(server_ms);
        }
    }

    fn update_player_uuid(&mut self, data: &Map<String, Value>) {
        let Some(delta) = data.get("delta_info").and_then(Value::as_object) else {
            return;
        };
        if let Some(uuid) = lenient_int(delta.get("uuid")) {
            self.player_uuid = Some(uuid);
            return;
        }
        // Some captures nest the UUID one level down.
        if let Some(uuid) = delta
            .get("base_delta")
            .and_then(Value::as_object)
            .and_then(|base| lenient_int(base.get("uuid")))
        {
            self.player_uuid = Some(uuid);
        }
    }

    fn process_delta(&mut self, delta: &Map<String, Value>) {
        let Some(skill_effects) = delta.get("skill_effects").and_then(Value::as_object) else {
            return;
        };
        let target_uuid = lenient_int(delta.get("uuid"));
        let Some(damages) = skill_effects.get("damages").and_then(Value::as_array) else {
            return;
        };
        for damage in damages {
            if let Some(damage) = damage.as_object() {
                self.process_damage(damage, target_uuid);
            }
        }
    }

    fn process_damage(&mut self, damage: &Map<String, Value>, target_uuid: Option<i64>) {
        if damage.get("type").and_then(Value::as_str) == Some("E_DAMAGE_TYPE_HEAL") {
            return;
        }
        if truthy(damage.get("is_miss")) {
            return;
        }

        // Attribution: only the tracked player's damage counts, but damage
        // without attribution still counts; captures started mid-fight have
        // damage before the first SyncToMeDeltaInfo.
        let attacker_uuid = lenient_int(damage.get("attacker_uuid"));
        if let (Some(player), Some(attacker)) = (self.player_uuid, attacker_uuid) {
            if attacker != player {
                return;
            }
        }

        let Some(value) = DAMAGE_VALUE_FIELDS
            .iter()
            .find_map(|field| lenient_int(damage.get(*field)).filter(|v| *v > 0))
        else {
            return;
        };
        let value = value as u64;
        let crit = truthy(damage.get("is_crit"));

        self.total_damage += value;
        self.hits += 1;
        if crit {
            self.crits += 1;
        }

        if let Some(now) = self.current_server_time_ms {
            if self.start_time_ms.is_none() {
                self.start_time_ms = Some(now);
            }
            self.end_time_ms = Some(now);
        }

        let skill_id = lenient_int(damage.get("owner_id"))
            .or_else(|| lenient_int(damage.get("hit_event_id")));
        if let Some(skill_id) = skill_id {
            self.skill_buckets.entry(skill_id.to_string()).or_default().credit(value, crit);
        }
        if let Some(target_uuid) = target_uuid {
            self.target_buckets.entry(target_uuid.to_string()).or_default().credit(value, crit);
        }
    }
}
