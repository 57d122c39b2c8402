//! v1 cross-boundary contracts for the empire kernel, API, persistence, and clients.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod catalog;

pub const SCHEMA_VERSION_V1: &str = "1.0";
pub const SECS_PER_HOUR: u64 = 3_600;

/// Default offline catch-up ceiling: 72 hours.
pub const DEFAULT_MAX_OFFLINE_CATCHUP_SECS: u64 = 72 * 3_600;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionConfig {
    pub schema_version: String,
    pub session_id: String,
    pub player_id: String,
    #[serde(with = "serde_u64_string")]
    pub seed: u64,
    pub max_offline_catchup_secs: u64,
    pub energy_regen_secs_per_point: u64,
    pub attribute_points_per_level: u32,
    pub base_max_energy: i64,
    pub max_energy_per_level: i64,
    pub base_max_units: u32,
    pub max_units_per_ten_levels: u32,
    pub captured_income_per_hour: i64,
    pub captured_defense: i64,
    pub soldier_loss_bps: u32,
    pub attack_duration_secs: u64,
    pub territory_xp_per_hour: i64,
    pub snapshot_every_ops: u64,
    pub notes: Option<String>,
}

impl SessionConfig {
    pub fn max_energy_at(&self, level: u32) -> i64 {
        self.base_max_energy + self.max_energy_per_level * i64::from(level.saturating_sub(1))
    }

    pub fn max_units_at(&self, level: u32) -> u32 {
        self.base_max_units + self.max_units_per_ten_levels * (level / 10)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            session_id: "session_local_001".to_string(),
            player_id: "player:blackhand".to_string(),
            seed: 1337,
            max_offline_catchup_secs: DEFAULT_MAX_OFFLINE_CATCHUP_SECS,
            energy_regen_secs_per_point: 180,
            attribute_points_per_level: 3,
            base_max_energy: 20,
            max_energy_per_level: 2,
            base_max_units: 2,
            max_units_per_ten_levels: 1,
            captured_income_per_hour: 120,
            captured_defense: 40,
            soldier_loss_bps: 2_500,
            attack_duration_secs: 900,
            territory_xp_per_hour: 15,
            snapshot_every_ops: 16,
            notes: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionStatus {
    pub schema_version: String,
    pub session_id: String,
    pub player_id: String,
    pub last_seen: u64,
    pub op_count: u64,
    pub queue_depth: usize,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "session_id={} player_id={} last_seen={} ops={} queue_depth={}",
            self.session_id, self.player_id, self.last_seen, self.op_count, self.queue_depth
        )
    }
}

/// Ranks in ascending order of seniority.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    #[default]
    Soldato,
    Caporegime,
    Consigliere,
    Sottocapo,
    Capo,
}

impl Rank {
    pub fn for_level(level: u32) -> Self {
        match level {
            0..=9 => Self::Soldato,
            10..=19 => Self::Caporegime,
            20..=29 => Self::Consigliere,
            30..=39 => Self::Sottocapo,
            _ => Self::Capo,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Soldato => "soldato",
            Self::Caporegime => "caporegime",
            Self::Consigliere => "consigliere",
            Self::Sottocapo => "sottocapo",
            Self::Capo => "capo",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Strength,
    Defense,
    Speed,
    Intelligence,
    Charisma,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attributes {
    pub strength: u32,
    pub defense: u32,
    pub speed: u32,
    pub intelligence: u32,
    pub charisma: u32,
}

impl Attributes {
    pub fn get(&self, kind: AttributeKind) -> u32 {
        match kind {
            AttributeKind::Strength => self.strength,
            AttributeKind::Defense => self.defense,
            AttributeKind::Speed => self.speed,
            AttributeKind::Intelligence => self.intelligence,
            AttributeKind::Charisma => self.charisma,
        }
    }

    pub fn bump(&mut self, kind: AttributeKind) {
        match kind {
            AttributeKind::Strength => self.strength += 1,
            AttributeKind::Defense => self.defense += 1,
            AttributeKind::Speed => self.speed += 1,
            AttributeKind::Intelligence => self.intelligence += 1,
            AttributeKind::Charisma => self.charisma += 1,
        }
    }
}

/// Player-scoped mutable state. The kernel owns exactly one of these per
/// session; everything else hangs off it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerState {
    pub schema_version: String,
    pub player_id: String,
    pub alias: String,
    pub level: u32,
    pub experience: i64,
    pub experience_to_next: i64,
    pub cash: i64,
    pub diamonds: i64,
    pub respect: i64,
    pub energy: i64,
    pub max_energy: i64,
    pub attributes: Attributes,
    pub unspent_attribute_points: u32,
    pub rank: Rank,
    /// Absolute epoch seconds of the last committed catch-up pass. Elapsed
    /// time is always recomputed as `now - last_income_collection`, never
    /// accumulated by repeated subtraction.
    pub last_income_collection: u64,
    /// Sub-hour accrual carry in dollar-seconds (rate x seconds not yet
    /// worth a whole unit of cash). Keeps accrual exactly linear under
    /// arbitrary window splits.
    pub income_residue: i64,
    /// Same carry for passive experience.
    pub xp_residue: i64,
    /// Seconds of energy regeneration not yet worth a whole point.
    pub energy_residue_secs: u64,
    pub crimes_committed: u64,
    /// Per-crime last-execution instants, keyed by crime id.
    #[serde(default)]
    pub crime_last_used: BTreeMap<String, u64>,
}

/// Kind tag of an in-flight timed operation. The attack payload rides on
/// the variant so resolvers can match exhaustively.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimedActionKind {
    Build,
    Upgrade,
    Attack { committed_soldiers: u32 },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimedAction {
    #[serde(flatten)]
    pub kind: TimedActionKind,
    pub started_at: u64,
    pub duration_secs: u64,
    /// Global insertion sequence; breaks ties between actions that share a
    /// start instant so catch-up order is deterministic.
    pub sequence: u64,
}

impl TimedAction {
    pub fn ends_at(&self) -> u64 {
        self.started_at.saturating_add(self.duration_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BusinessFeature {
    pub feature_id: String,
    pub name: String,
    pub cost: i64,
    /// Income multiplier in basis points (10_000 = x1.0). Only multiplies
    /// while both `unlocked` and `active`.
    pub income_multiplier_bps: u32,
    pub unlocked: bool,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Business {
    pub business_id: String,
    pub name: String,
    pub category: String,
    /// 0 until first construction completes, then 1..=max_level.
    pub level: u32,
    pub max_level: u32,
    pub base_income_per_hour: i64,
    /// Derived: base x level x efficiency x active feature multipliers.
    /// Stored for display; the kernel recomputes it after every mutation.
    pub current_income_per_hour: i64,
    pub efficiency: u8,
    pub build_cost: i64,
    pub build_duration_secs: u64,
    /// Cost of the next upgrade step; rescaled by the kernel on level-up.
    pub upgrade_cost: i64,
    pub upgrade_duration_secs: u64,
    pub pending_action: Option<TimedAction>,
    #[serde(default)]
    pub features: Vec<BusinessFeature>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TerritoryOwner {
    Player,
    Enemy,
    Neutral,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TerritoryStatus {
    Owned,
    Enemy,
    Neutral,
    UnderAttack,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Territory {
    pub territory_id: String,
    pub name: String,
    pub owner: TerritoryOwner,
    pub status: TerritoryStatus,
    pub income_per_hour: i64,
    pub defense: i64,
    pub garrison: u32,
    pub pending_attack: Option<TimedAction>,
    /// Weak reference; the unit's `assigned_territory_id` is the inverse
    /// and the two must stay mutually consistent.
    pub assigned_unit_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaporegimeUnit {
    pub unit_id: String,
    pub name: String,
    pub level: u32,
    pub garrison: u32,
    pub capacity: u32,
    pub strength: i64,
    pub family_id: Option<String>,
    pub earnings_accrued: i64,
    pub assigned_territory_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MissionState {
    pub mission_id: String,
    pub progress: u32,
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    CollectIncome,
    StartBuild,
    StartUpgrade,
    UnlockFeature,
    CommitCrime,
    StartAttack,
    AssignUnit,
    TrainAttribute,
    AdvanceTo,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandPayload {
    CollectIncome,
    StartBuild {
        business_id: String,
    },
    StartUpgrade {
        business_id: String,
    },
    UnlockFeature {
        business_id: String,
        feature_id: String,
    },
    CommitCrime {
        crime_id: String,
    },
    StartAttack {
        territory_id: String,
        committed_soldiers: u32,
    },
    AssignUnit {
        unit_id: String,
        territory_id: Option<String>,
    },
    TrainAttribute {
        attribute: AttributeKind,
    },
    AdvanceTo {
        now: u64,
    },
}

impl CommandPayload {
    pub fn command_type(&self) -> CommandType {
        match self {
            Self::CollectIncome => CommandType::CollectIncome,
            Self::StartBuild { .. } => CommandType::StartBuild,
            Self::StartUpgrade { .. } => CommandType::StartUpgrade,
            Self::UnlockFeature { .. } => CommandType::UnlockFeature,
            Self::CommitCrime { .. } => CommandType::CommitCrime,
            Self::StartAttack { .. } => CommandType::StartAttack,
            Self::AssignUnit { .. } => CommandType::AssignUnit,
            Self::TrainAttribute { .. } => CommandType::TrainAttribute,
            Self::AdvanceTo { .. } => CommandType::AdvanceTo,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Command {
    pub schema_version: String,
    pub command_id: String,
    pub session_id: String,
    pub issued_at: u64,
    pub command_type: CommandType,
    pub payload: CommandPayload,
}

impl Command {
    pub fn new(
        command_id: impl Into<String>,
        session_id: impl Into<String>,
        issued_at: u64,
        payload: CommandPayload,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            command_id: command_id.into(),
            session_id: session_id.into(),
            issued_at,
            command_type: payload.command_type(),
            payload,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    SessionNotFound,
    InvalidCommand,
    PreconditionFailed,
    ContractVersionUnsupported,
    InternalError,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    pub schema_version: String,
    pub error_code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(error_code: ErrorCode, message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            error_code,
            message: message.into(),
            details,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandResult {
    pub schema_version: String,
    pub command_id: String,
    pub session_id: String,
    pub accepted: bool,
    pub error: Option<ApiError>,
}

impl CommandResult {
    pub fn accepted(command: &Command) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            command_id: command.command_id.clone(),
            session_id: command.session_id.clone(),
            accepted: true,
            error: None,
        }
    }

    pub fn rejected(command: &Command, error: ApiError) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            command_id: command.command_id.clone(),
            session_id: command.session_id.clone(),
            accepted: false,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    CatchUpApplied,
    ClockSkewDetected,
    IncomeCollected,
    EnergyRegenerated,
    BuildStarted,
    BuildCompleted,
    UpgradeStarted,
    UpgradeCompleted,
    FeatureUnlocked,
    CrimeResolved,
    AttackStarted,
    TerritoryCaptured,
    AttackRepelled,
    UnitAssigned,
    UnitUnassigned,
    LevelUp,
    RankPromoted,
    MissionCompleted,
    AttributeTrained,
    CommandApplied,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub schema_version: String,
    pub session_id: String,
    /// Absolute epoch seconds; never a relative offset.
    pub occurred_at: u64,
    pub event_id: String,
    /// Position in the session event log, monotonically increasing.
    pub sequence: u64,
    pub event_type: EventType,
    /// Entity the event is about: a player, business, territory, unit,
    /// crime, or mission id.
    pub subject_id: String,
    pub caused_by: Vec<String>,
    pub details: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub schema_version: String,
    pub session_id: String,
    pub as_of: u64,
    pub snapshot_id: String,
    pub world_state_hash: String,
    pub player: PlayerState,
    pub businesses: Vec<Business>,
    pub territories: Vec<Territory>,
    pub units: Vec<CaporegimeUnit>,
    pub missions: Vec<MissionState>,
    pub perf_stats: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResponse {
    pub schema_version: String,
    pub query_type: String,
    pub session_id: String,
    pub generated_at: u64,
    pub data: Value,
}

pub mod serde_u64_string {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<u64>().map_err(D::Error::custom)
    }
}
