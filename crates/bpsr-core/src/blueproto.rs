//! Combat message schemas for the `blueprotobuf_package` protocol.
//!
//! Hand-maintained prost definitions covering the subset of the game schema
//! the combat pipeline reads. The upstream descriptor bundle is proprietary
//! and not redistributable, so these mirror the observed wire layout;
//! unknown fields are skipped during decode and schema fidelity is
//! best-effort by design.

/// Server/client clock synchronization.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SyncServerTime {
    /// Authoritative server clock, milliseconds.
    #[prost(int64, optional, tag = "1")]
    pub server_milliseconds: Option<i64>,
    /// Client clock at send time, milliseconds.
    #[prost(int64, optional, tag = "2")]
    pub client_milliseconds: Option<i64>,
}

/// Entities entering and leaving the player's area of interest.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SyncNearEntities {
    /// Entities that appeared.
    #[prost(message, repeated, tag = "1")]
    pub appear: Vec<AoiSyncData>,
    /// UUIDs of entities that disappeared.
    #[prost(int64, repeated, tag = "2")]
    pub disappear: Vec<i64>,
}

/// Snapshot of one nearby entity.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AoiSyncData {
    /// Entity UUID.
    #[prost(int64, optional, tag = "1")]
    pub uuid: Option<i64>,
    /// Entity configuration id.
    #[prost(int32, optional, tag = "2")]
    pub config_id: Option<i32>,
}

/// Full container (character) state push.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SyncContainerData {
    /// Serialized character state.
    #[prost(message, optional, tag = "1")]
    pub v_data: Option<CharSerialize>,
}

/// Serialized character state.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CharSerialize {
    /// Character id.
    #[prost(int64, optional, tag = "1")]
    pub char_id: Option<i64>,
}

/// Incremental container (character) state push.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SyncContainerDirtyData {
    /// Character id the delta applies to.
    #[prost(int64, optional, tag = "1")]
    pub char_id: Option<i64>,
    /// Opaque dirty-field blob.
    #[prost(bytes = "vec", optional, tag = "2")]
    pub dirty_blob: Option<Vec<u8>>,
}

/// Deltas for entities near the player.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SyncNearDeltaInfo {
    /// One delta per affected entity.
    #[prost(message, repeated, tag = "1")]
    pub delta_infos: Vec<AoiSyncDelta>,
}

/// Delta targeted at the player themself.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SyncToMeDeltaInfo {
    /// The player-scoped delta.
    #[prost(message, optional, tag = "1")]
    pub delta_info: Option<AoiSyncToMeDelta>,
}

/// Player-scoped delta wrapper.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AoiSyncToMeDelta {
    /// Player UUID.
    #[prost(int64, optional, tag = "1")]
    pub uuid: Option<i64>,
    /// The underlying entity delta.
    #[prost(message, optional, tag = "2")]
    pub base_delta: Option<AoiSyncDelta>,
}

/// State delta for one entity.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AoiSyncDelta {
    /// Entity UUID (the target of any contained damage).
    #[prost(int64, optional, tag = "1")]
    pub uuid: Option<i64>,
    /// Skill effects applied to this entity.
    #[prost(message, optional, tag = "2")]
    pub skill_effects: Option<SyncSkillEffects>,
}

/// Skill effects attached to an entity delta.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SyncSkillEffects {
    /// Damage events in this delta.
    #[prost(message, repeated, tag = "1")]
    pub damages: Vec<SyncDamageInfo>,
}

/// One damage (or heal) event.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SyncDamageInfo {
    /// Nominal damage value.
    #[prost(int64, optional, tag = "1")]
    pub value: Option<i64>,
    /// Bonus value for lucky hits.
    #[prost(int64, optional, tag = "2")]
    pub lucky_value: Option<i64>,
    /// Damage actually applied after mitigation.
    #[prost(int64, optional, tag = "3")]
    pub actual_value: Option<i64>,
    /// Hit-point loss on the target.
    #[prost(int64, optional, tag = "4")]
    pub hp_lessen_value: Option<i64>,
    /// UUID of the attacking entity.
    #[prost(int64, optional, tag = "5")]
    pub attacker_uuid: Option<i64>,
    /// Skill owner id (primary skill bucket key).
    #[prost(int64, optional, tag = "6")]
    pub owner_id: Option<i64>,
    /// Hit event id (fallback skill bucket key).
    #[prost(int64, optional, tag = "7")]
    pub hit_event_id: Option<i64>,
    /// Whether the hit was critical.
    #[prost(bool, optional, tag = "8")]
    pub is_crit: Option<bool>,
    /// Whether the attack missed.
    #[prost(bool, optional, tag = "9")]
    pub is_miss: Option<bool>,
    /// Damage classification.
    #[prost(enumeration = "EDamageType", optional, tag = "10")]
    pub r#type: Option<i32>,
}

/// Damage event classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum EDamageType {
    /// Ordinary damage.
    Normal = 0,
    /// Critical damage.
    Crit = 1,
    /// Lucky damage.
    Lucky = 2,
    /// Critical and lucky damage.
    CritLucky = 3,
    /// Healing; excluded from damage attribution.
    Heal = 4,
}

impl EDamageType {
    /// String value of the enum field names used in the ProtoBuf definition.
    ///
    /// The values are not transformed in any way and thus are considered
    /// stable (if the ProtoBuf definition does not change) and safe for
    /// programmatic use.
    #[must_use]
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Normal => "E_DAMAGE_TYPE_NORMAL",
            Self::Crit => "E_DAMAGE_TYPE_CRIT",
            Self::Lucky => "E_DAMAGE_TYPE_LUCKY",
            Self::CritLucky => "E_DAMAGE_TYPE_CRIT_LUCKY",
            Self::Heal => "E_DAMAGE_TYPE_HEAL",
        }
    }

    /// Creates an enum from field names used in the ProtoBuf definition.
    #[must_use]
    pub fn from_str_name(value: &str) -> Option<Self> {
        match value {
            "E_DAMAGE_TYPE_NORMAL" => Some(Self::Normal),
            "E_DAMAGE_TYPE_CRIT" => Some(Self::Crit),
            "E_DAMAGE_TYPE_LUCKY" => Some(Self::Lucky),
            "E_DAMAGE_TYPE_CRIT_LUCKY" => Some(Self::CritLucky),
            "E_DAMAGE_TYPE_HEAL" => Some(Self::Heal),
            _ => None,
        }
    }
}
