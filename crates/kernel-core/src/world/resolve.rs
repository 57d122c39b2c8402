use super::*;

use contracts::{EventType, TerritoryOwner, TerritoryStatus, TimedActionKind};
use serde_json::json;

use crate::territory as territory_rules;
use crate::{economy, ledger};

enum ActionEntity {
    Business(String),
    Territory(String),
}

impl EmpireWorld {
    /// Resolve every due timed action in ascending `(started_at,
    /// sequence)` order, so a long-overdue build completes before anything
    /// that assumed it had finished. Returns the number resolved.
    pub(super) fn resolve_due_actions(&mut self, now: u64) -> u64 {
        let mut due: Vec<(u64, u64, ActionEntity)> = Vec::new();
        for business in self.businesses.values() {
            if let Some(action) = &business.pending_action {
                if ledger::is_due(action, now) {
                    due.push((
                        action.started_at,
                        action.sequence,
                        ActionEntity::Business(business.business_id.clone()),
                    ));
                }
            }
        }
        for territory in self.territories.values() {
            if let Some(action) = &territory.pending_attack {
                if ledger::is_due(action, now) {
                    due.push((
                        action.started_at,
                        action.sequence,
                        ActionEntity::Territory(territory.territory_id.clone()),
                    ));
                }
            }
        }
        due.sort_by_key(|(started_at, sequence, _)| (*started_at, *sequence));

        let count = due.len() as u64;
        for (_, _, entity) in due {
            match entity {
                ActionEntity::Business(business_id) => {
                    self.resolve_business_action(&business_id, now)
                }
                ActionEntity::Territory(territory_id) => self.resolve_attack(&territory_id, now),
            }
        }
        count
    }

    /// Build/upgrade completion. Idempotent: a missing or not-yet-due
    /// action is a no-op, never an error. One action is one level step.
    fn resolve_business_action(&mut self, business_id: &str, now: u64) {
        let Some(business) = self.businesses.get_mut(business_id) else {
            return;
        };
        let Some(action) = business.pending_action else {
            return;
        };
        if !ledger::is_due(&action, now) {
            return;
        }
        business.pending_action = None;
        let completed_at = action.ends_at();
        match action.kind {
            TimedActionKind::Build => {
                debug_assert_eq!(business.level, 0, "build on an already-built business");
                business.level = 1;
                business.current_income_per_hour = economy::business_income_per_hour(business);
                let details = json!({
                    "level": business.level,
                    "income_per_hour": business.current_income_per_hour,
                });
                let business_id = business.business_id.clone();
                self.push_event(
                    completed_at,
                    EventType::BuildCompleted,
                    business_id,
                    Vec::new(),
                    Some(details),
                );
            }
            TimedActionKind::Upgrade => {
                debug_assert!(
                    business.level < business.max_level,
                    "upgrade past max level"
                );
                business.level = (business.level + 1).min(business.max_level);
                business.current_income_per_hour = economy::business_income_per_hour(business);
                if let Some(definition) = self.catalog.business(business_id) {
                    business.upgrade_cost =
                        definition.upgrade_cost_base * i64::from(business.level);
                }
                let details = json!({
                    "level": business.level,
                    "income_per_hour": business.current_income_per_hour,
                    "next_upgrade_cost": business.upgrade_cost,
                });
                let business_id = business.business_id.clone();
                self.push_event(
                    completed_at,
                    EventType::UpgradeCompleted,
                    business_id,
                    Vec::new(),
                    Some(details),
                );
            }
            TimedActionKind::Attack { .. } => {
                debug_assert!(false, "attack action on a business");
            }
        }
    }

    /// Attack completion: deterministic strength-vs-defense comparison.
    /// Strictly greater captures; a tie is repelled.
    fn resolve_attack(&mut self, territory_id: &str, now: u64) {
        let Some(territory) = self.territories.get_mut(territory_id) else {
            return;
        };
        let Some(action) = territory.pending_attack else {
            return;
        };
        if !ledger::is_due(&action, now) {
            return;
        }
        territory.pending_attack = None;
        let completed_at = action.ends_at();
        let TimedActionKind::Attack { committed_soldiers } = action.kind else {
            debug_assert!(false, "non-attack action on a territory");
            return;
        };

        let strength = territory_rules::attack_strength(committed_soldiers, &self.player.attributes);
        let defense_before = territory.defense;
        if territory_rules::attack_succeeds(strength, defense_before) {
            territory.owner = TerritoryOwner::Player;
            territory.status = TerritoryStatus::Owned;
            territory.income_per_hour = self.config.captured_income_per_hour;
            territory.defense = self.config.captured_defense;
            territory.garrison = committed_soldiers;
            let territory_id = territory.territory_id.clone();
            self.player.respect += defense_before / 2;
            self.push_event(
                completed_at,
                EventType::TerritoryCaptured,
                territory_id,
                Vec::new(),
                Some(json!({
                    "attack_strength": strength,
                    "defense": defense_before,
                    "committed_soldiers": committed_soldiers,
                })),
            );
        } else {
            territory.status = territory_rules::status_for_owner(territory.owner);
            let territory_id = territory.territory_id.clone();
            let losses = territory_rules::failure_losses(committed_soldiers, &self.config);
            self.deduct_soldier_losses(losses);
            self.push_event(
                completed_at,
                EventType::AttackRepelled,
                territory_id,
                Vec::new(),
                Some(json!({
                    "attack_strength": strength,
                    "defense": defense_before,
                    "committed_soldiers": committed_soldiers,
                    "soldiers_lost": losses,
                })),
            );
        }
    }

    /// Spread failure losses across the unit pool in id order.
    fn deduct_soldier_losses(&mut self, mut losses: u32) {
        for unit in self.units.values_mut() {
            if losses == 0 {
                break;
            }
            let taken = unit.garrison.min(losses);
            unit.garrison -= taken;
            losses -= taken;
        }
    }

    /// Re-evaluate mission progress against the current player snapshot.
    /// Completion is one-way; rewards land immediately.
    pub(super) fn evaluate_missions(&mut self, now: u64) {
        let businesses_owned = self
            .businesses
            .values()
            .filter(|business| business.level > 0)
            .count() as u32;
        let territories_owned = self
            .territories
            .values()
            .filter(|territory| territory.status == TerritoryStatus::Owned)
            .count() as u32;

        let definitions = self.catalog.missions.clone();
        let mut completions: Vec<(String, i64, i64)> = Vec::new();
        for definition in &definitions {
            let Some(state) = self.missions.get_mut(&definition.mission_id) else {
                continue;
            };
            if state.completed {
                continue;
            }
            let progress =
                definition
                    .requirement
                    .progress(&self.player, businesses_owned, territories_owned);
            state.progress = progress.min(u64::from(definition.max_progress)) as u32;
            if progress >= definition.requirement.target() {
                state.completed = true;
                completions.push((
                    definition.mission_id.clone(),
                    definition.reward_cash,
                    definition.reward_xp,
                ));
            }
        }

        for (mission_id, reward_cash, reward_xp) in completions {
            self.player.cash += reward_cash;
            let mission_event = self.push_event(
                now,
                EventType::MissionCompleted,
                mission_id,
                Vec::new(),
                Some(json!({ "reward_cash": reward_cash, "reward_xp": reward_xp })),
            );
            self.commit_experience(reward_xp, now, vec![mission_event]);
        }
    }
}
