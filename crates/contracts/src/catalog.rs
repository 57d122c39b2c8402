//! Static, read-only catalogs: crime and business definitions, missions,
//! and the leveling curve. Loaded once per session; the kernel never
//! mutates them.

use serde::{Deserialize, Serialize};

use crate::{PlayerState, SCHEMA_VERSION_V1};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrimeDefinition {
    pub crime_id: String,
    pub name: String,
    pub min_reward: i64,
    pub max_reward: i64,
    pub xp_reward: i64,
    pub energy_cost: i64,
    /// Success probability in basis points: 10_000 always succeeds, 0
    /// always fails.
    pub success_bps: u32,
    pub required_level: u32,
    pub cooldown_secs: u64,
    /// Presentation-side timer; the crime itself commits instantly and the
    /// cooldown is the real gate.
    pub duration_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeatureDefinition {
    pub feature_id: String,
    pub name: String,
    pub cost: i64,
    pub income_multiplier_bps: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BusinessDefinition {
    pub business_id: String,
    pub name: String,
    pub category: String,
    pub max_level: u32,
    pub base_income_per_hour: i64,
    pub build_cost: i64,
    pub build_duration_secs: u64,
    /// Cost of the level-1 -> level-2 upgrade; later steps scale linearly
    /// with the level reached.
    pub upgrade_cost_base: i64,
    pub upgrade_duration_secs: u64,
    #[serde(default)]
    pub features: Vec<FeatureDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MissionRequirement {
    MinLevel { level: u32 },
    MinCash { cash: i64 },
    MinRespect { respect: i64 },
    CrimesCommitted { count: u64 },
    BusinessesOwned { count: u32 },
    TerritoriesOwned { count: u32 },
}

impl MissionRequirement {
    /// Progress toward the requirement given a player snapshot and the
    /// owned-asset counts the kernel supplies. Completion is progress
    /// reaching `max_progress`; the flag never reverts.
    pub fn progress(
        &self,
        player: &PlayerState,
        businesses_owned: u32,
        territories_owned: u32,
    ) -> u64 {
        match self {
            Self::MinLevel { .. } => u64::from(player.level),
            Self::MinCash { .. } => player.cash.max(0) as u64,
            Self::MinRespect { .. } => player.respect.max(0) as u64,
            Self::CrimesCommitted { .. } => player.crimes_committed,
            Self::BusinessesOwned { .. } => u64::from(businesses_owned),
            Self::TerritoriesOwned { .. } => u64::from(territories_owned),
        }
    }

    pub fn target(&self) -> u64 {
        match self {
            Self::MinLevel { level } => u64::from(*level),
            Self::MinCash { cash } => (*cash).max(0) as u64,
            Self::MinRespect { respect } => (*respect).max(0) as u64,
            Self::CrimesCommitted { count } => *count,
            Self::BusinessesOwned { count } => u64::from(*count),
            Self::TerritoriesOwned { count } => u64::from(*count),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MissionDefinition {
    pub mission_id: String,
    pub title: String,
    pub requirement: MissionRequirement,
    pub max_progress: u32,
    pub reward_cash: i64,
    pub reward_xp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Catalog {
    pub schema_version: String,
    pub crimes: Vec<CrimeDefinition>,
    pub businesses: Vec<BusinessDefinition>,
    pub missions: Vec<MissionDefinition>,
    /// XP required to clear each level: `leveling_curve[level - 1]` is the
    /// requirement at `level`. Must be strictly increasing. Levels past the
    /// end of the table fall back to a quadratic extension.
    pub leveling_curve: Vec<i64>,
}

impl Catalog {
    pub fn crime(&self, crime_id: &str) -> Option<&CrimeDefinition> {
        self.crimes.iter().find(|crime| crime.crime_id == crime_id)
    }

    pub fn business(&self, business_id: &str) -> Option<&BusinessDefinition> {
        self.businesses
            .iter()
            .find(|business| business.business_id == business_id)
    }

    pub fn mission(&self, mission_id: &str) -> Option<&MissionDefinition> {
        self.missions
            .iter()
            .find(|mission| mission.mission_id == mission_id)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            crimes: vec![
                CrimeDefinition {
                    crime_id: "crime:pickpocket".to_string(),
                    name: "Pickpocket".to_string(),
                    min_reward: 10,
                    max_reward: 40,
                    xp_reward: 5,
                    energy_cost: 2,
                    success_bps: 9_000,
                    required_level: 1,
                    cooldown_secs: 30,
                    duration_secs: 5,
                },
                CrimeDefinition {
                    crime_id: "crime:protection_racket".to_string(),
                    name: "Protection Racket".to_string(),
                    min_reward: 80,
                    max_reward: 220,
                    xp_reward: 18,
                    energy_cost: 5,
                    success_bps: 7_000,
                    required_level: 4,
                    cooldown_secs: 300,
                    duration_secs: 30,
                },
                CrimeDefinition {
                    crime_id: "crime:bank_heist".to_string(),
                    name: "Bank Heist".to_string(),
                    min_reward: 1_500,
                    max_reward: 6_000,
                    xp_reward: 120,
                    energy_cost: 15,
                    success_bps: 3_500,
                    required_level: 12,
                    cooldown_secs: 7_200,
                    duration_secs: 600,
                },
            ],
            businesses: vec![
                BusinessDefinition {
                    business_id: "biz:laundromat".to_string(),
                    name: "Laundromat".to_string(),
                    category: "front".to_string(),
                    max_level: 10,
                    base_income_per_hour: 60,
                    build_cost: 100,
                    build_duration_secs: 300,
                    upgrade_cost_base: 150,
                    upgrade_duration_secs: 600,
                    features: vec![FeatureDefinition {
                        feature_id: "feature:night_shift".to_string(),
                        name: "Night Shift".to_string(),
                        cost: 400,
                        income_multiplier_bps: 12_500,
                    }],
                },
                BusinessDefinition {
                    business_id: "biz:speakeasy".to_string(),
                    name: "Speakeasy".to_string(),
                    category: "vice".to_string(),
                    max_level: 15,
                    base_income_per_hour: 240,
                    build_cost: 900,
                    build_duration_secs: 1_800,
                    upgrade_cost_base: 600,
                    upgrade_duration_secs: 2_400,
                    features: vec![
                        FeatureDefinition {
                            feature_id: "feature:back_room".to_string(),
                            name: "Back Room".to_string(),
                            cost: 1_200,
                            income_multiplier_bps: 15_000,
                        },
                        FeatureDefinition {
                            feature_id: "feature:house_band".to_string(),
                            name: "House Band".to_string(),
                            cost: 800,
                            income_multiplier_bps: 11_000,
                        },
                    ],
                },
            ],
            missions: vec![
                MissionDefinition {
                    mission_id: "mission:first_blood".to_string(),
                    title: "First Blood".to_string(),
                    requirement: MissionRequirement::CrimesCommitted { count: 3 },
                    max_progress: 3,
                    reward_cash: 50,
                    reward_xp: 10,
                },
                MissionDefinition {
                    mission_id: "mission:landlord".to_string(),
                    title: "Landlord".to_string(),
                    requirement: MissionRequirement::BusinessesOwned { count: 1 },
                    max_progress: 1,
                    reward_cash: 200,
                    reward_xp: 25,
                },
                MissionDefinition {
                    mission_id: "mission:turf_war".to_string(),
                    title: "Turf War".to_string(),
                    requirement: MissionRequirement::TerritoriesOwned { count: 2 },
                    max_progress: 2,
                    reward_cash: 1_000,
                    reward_xp: 150,
                },
            ],
            leveling_curve: vec![
                100, 250, 450, 700, 1_000, 1_400, 1_900, 2_500, 3_200, 4_000, 5_000, 6_200, 7_600,
                9_200, 11_000,
            ],
        }
    }
}
