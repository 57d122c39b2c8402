use super::*;

use contracts::{
    Attributes, BusinessFeature, Rank, Snapshot, TerritoryOwner, TerritoryStatus,
    SCHEMA_VERSION_V1,
};
use rand::SeedableRng;

use crate::progression;

impl EmpireWorld {
    /// Seed a fresh session at `started_at` (epoch seconds): catalog
    /// businesses unbuilt, the starting turf owned, the rest of the map
    /// hostile or unclaimed.
    pub fn new(config: SessionConfig, catalog: Catalog, started_at: u64) -> Self {
        let player = PlayerState {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            player_id: config.player_id.clone(),
            alias: "Newcomer".to_string(),
            level: 1,
            experience: 0,
            experience_to_next: progression::xp_to_next(&catalog.leveling_curve, 1),
            cash: 500,
            diamonds: 0,
            respect: 0,
            energy: config.max_energy_at(1),
            max_energy: config.max_energy_at(1),
            attributes: Attributes::default(),
            unspent_attribute_points: 0,
            rank: Rank::Soldato,
            last_income_collection: started_at,
            income_residue: 0,
            xp_residue: 0,
            energy_residue_secs: 0,
            crimes_committed: 0,
            crime_last_used: BTreeMap::new(),
        };

        let mut businesses = BTreeMap::new();
        for definition in &catalog.businesses {
            businesses.insert(
                definition.business_id.clone(),
                Business {
                    business_id: definition.business_id.clone(),
                    name: definition.name.clone(),
                    category: definition.category.clone(),
                    level: 0,
                    max_level: definition.max_level,
                    base_income_per_hour: definition.base_income_per_hour,
                    current_income_per_hour: 0,
                    efficiency: 100,
                    build_cost: definition.build_cost,
                    build_duration_secs: definition.build_duration_secs,
                    upgrade_cost: definition.upgrade_cost_base,
                    upgrade_duration_secs: definition.upgrade_duration_secs,
                    pending_action: None,
                    features: definition
                        .features
                        .iter()
                        .map(|feature| BusinessFeature {
                            feature_id: feature.feature_id.clone(),
                            name: feature.name.clone(),
                            cost: feature.cost,
                            income_multiplier_bps: feature.income_multiplier_bps,
                            unlocked: false,
                            active: false,
                        })
                        .collect(),
                },
            );
        }

        let mut territories = BTreeMap::new();
        territories.insert(
            "territory:old_quarter".to_string(),
            Territory {
                territory_id: "territory:old_quarter".to_string(),
                name: "Old Quarter".to_string(),
                owner: TerritoryOwner::Player,
                status: TerritoryStatus::Owned,
                income_per_hour: 80,
                defense: 30,
                garrison: 6,
                pending_attack: None,
                assigned_unit_id: None,
            },
        );
        territories.insert(
            "territory:docks".to_string(),
            Territory {
                territory_id: "territory:docks".to_string(),
                name: "The Docks".to_string(),
                owner: TerritoryOwner::Enemy,
                status: TerritoryStatus::Enemy,
                income_per_hour: 200,
                defense: 110,
                garrison: 14,
                pending_attack: None,
                assigned_unit_id: None,
            },
        );
        territories.insert(
            "territory:market_row".to_string(),
            Territory {
                territory_id: "territory:market_row".to_string(),
                name: "Market Row".to_string(),
                owner: TerritoryOwner::Neutral,
                status: TerritoryStatus::Neutral,
                income_per_hour: 120,
                defense: 60,
                garrison: 0,
                pending_attack: None,
                assigned_unit_id: None,
            },
        );

        let mut units = BTreeMap::new();
        units.insert(
            "unit:luca".to_string(),
            CaporegimeUnit {
                unit_id: "unit:luca".to_string(),
                name: "Luca".to_string(),
                level: 1,
                garrison: 8,
                capacity: 12,
                strength: 40,
                family_id: Some("family:moretti".to_string()),
                earnings_accrued: 0,
                assigned_territory_id: None,
            },
        );
        units.insert(
            "unit:vito".to_string(),
            CaporegimeUnit {
                unit_id: "unit:vito".to_string(),
                name: "Vito".to_string(),
                level: 1,
                garrison: 10,
                capacity: 10,
                strength: 55,
                family_id: None,
                earnings_accrued: 0,
                assigned_territory_id: None,
            },
        );

        let missions = catalog
            .missions
            .iter()
            .map(|definition| {
                (
                    definition.mission_id.clone(),
                    MissionState {
                        mission_id: definition.mission_id.clone(),
                        progress: 0,
                        completed: false,
                    },
                )
            })
            .collect::<BTreeMap<_, _>>();

        let status = SessionStatus {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            session_id: config.session_id.clone(),
            player_id: config.player_id.clone(),
            last_seen: started_at,
            op_count: 0,
            queue_depth: 0,
        };

        let rng = SmallRng::seed_from_u64(config.seed);
        Self {
            config,
            catalog,
            status,
            player,
            businesses,
            territories,
            units,
            missions,
            event_log: Vec::new(),
            queued_commands: Vec::new(),
            next_command_sequence: 0,
            next_action_sequence: 0,
            rng,
            state_hash: 0,
            skew_reports: 0,
            last_catch_up: CatchUpMetrics::default(),
        }
    }

    /// Restore a persisted session. The event log restarts empty; the
    /// snapshot is the authoritative state and the RNG is re-seeded from
    /// the session seed.
    pub fn from_snapshot(config: SessionConfig, catalog: Catalog, snapshot: Snapshot) -> Self {
        let status = SessionStatus {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            session_id: config.session_id.clone(),
            player_id: snapshot.player.player_id.clone(),
            last_seen: snapshot.as_of,
            op_count: 0,
            queue_depth: 0,
        };
        let rng = SmallRng::seed_from_u64(config.seed);
        let businesses: BTreeMap<String, Business> = snapshot
            .businesses
            .into_iter()
            .map(|business| (business.business_id.clone(), business))
            .collect();
        let territories: BTreeMap<String, Territory> = snapshot
            .territories
            .into_iter()
            .map(|territory| (territory.territory_id.clone(), territory))
            .collect();
        // The tie-break counter must stay ahead of every restored action.
        let next_action_sequence = businesses
            .values()
            .filter_map(|business| business.pending_action.as_ref())
            .map(|action| action.sequence)
            .chain(
                territories
                    .values()
                    .filter_map(|territory| territory.pending_attack.as_ref())
                    .map(|action| action.sequence),
            )
            .max()
            .map(|sequence| sequence + 1)
            .unwrap_or(0);
        Self {
            config,
            catalog,
            status,
            player: snapshot.player,
            businesses,
            territories,
            units: snapshot
                .units
                .into_iter()
                .map(|unit| (unit.unit_id.clone(), unit))
                .collect(),
            missions: snapshot
                .missions
                .into_iter()
                .map(|mission| (mission.mission_id.clone(), mission))
                .collect(),
            event_log: Vec::new(),
            queued_commands: Vec::new(),
            next_command_sequence: 0,
            next_action_sequence,
            rng,
            state_hash: 0,
            skew_reports: 0,
            last_catch_up: CatchUpMetrics::default(),
        }
    }
}
