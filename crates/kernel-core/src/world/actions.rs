use super::*;

use contracts::{
    AttributeKind, EventType, TerritoryStatus, TimedAction, TimedActionKind,
};
use serde_json::json;

use crate::crime as crime_rules;

impl EmpireWorld {
    /// Collect everything the empire earned since the last pass. The
    /// catch-up itself does the accrual; this operation is the explicit
    /// "cash in" the UI exposes.
    pub fn collect_income(&mut self, now: u64) -> Result<Vec<Event>, EngineError> {
        let mark = self.event_mark();
        self.catch_up(now);
        let metrics = self.last_catch_up;
        let balance = self.player.cash;
        self.push_event(
            now,
            EventType::IncomeCollected,
            self.player.player_id.clone(),
            Vec::new(),
            Some(json!({
                "amount": metrics.cash_accrued,
                "elapsed_secs": metrics.elapsed_secs,
                "balance": balance,
            })),
        );
        self.commit_op();
        Ok(self.events_since(mark))
    }

    /// First construction of a business. Cash is deducted up front;
    /// completion is pure time passage and never refunds.
    pub fn start_build(&mut self, business_id: &str, now: u64) -> Result<Vec<Event>, EngineError> {
        let mark = self.event_mark();
        self.catch_up(now);

        let business = self
            .businesses
            .get(business_id)
            .ok_or_else(|| EngineError::NotFound {
                entity_id: business_id.to_string(),
            })?;
        if business.pending_action.is_some() {
            return Err(EngineError::ActionAlreadyInProgress {
                entity_id: business_id.to_string(),
            });
        }
        if business.level != 0 {
            return Err(EngineError::RequirementNotMet {
                detail: format!("{business_id} is already built"),
            });
        }
        if self.player.cash < business.build_cost {
            return Err(EngineError::InsufficientFunds {
                required: business.build_cost,
                available: self.player.cash,
            });
        }

        let cost = business.build_cost;
        let duration_secs = business.build_duration_secs;
        self.player.cash -= cost;
        let action = self.new_timed_action(TimedActionKind::Build, now, duration_secs);
        let business = self
            .businesses
            .get_mut(business_id)
            .expect("validated above");
        business.pending_action = Some(action);
        self.push_event(
            now,
            EventType::BuildStarted,
            business_id.to_string(),
            Vec::new(),
            Some(json!({
                "cost": cost,
                "duration_secs": duration_secs,
                "completes_at": action.ends_at(),
            })),
        );
        self.commit_op();
        Ok(self.events_since(mark))
    }

    /// One upgrade step: level < max, no action pending, cash up front.
    pub fn start_upgrade(
        &mut self,
        business_id: &str,
        now: u64,
    ) -> Result<Vec<Event>, EngineError> {
        let mark = self.event_mark();
        self.catch_up(now);

        let business = self
            .businesses
            .get(business_id)
            .ok_or_else(|| EngineError::NotFound {
                entity_id: business_id.to_string(),
            })?;
        if business.pending_action.is_some() {
            return Err(EngineError::ActionAlreadyInProgress {
                entity_id: business_id.to_string(),
            });
        }
        if business.level == 0 {
            return Err(EngineError::RequirementNotMet {
                detail: format!("{business_id} has not been built yet"),
            });
        }
        if business.level >= business.max_level {
            return Err(EngineError::RequirementNotMet {
                detail: format!("{business_id} is already at max level"),
            });
        }
        if self.player.cash < business.upgrade_cost {
            return Err(EngineError::InsufficientFunds {
                required: business.upgrade_cost,
                available: self.player.cash,
            });
        }

        let cost = business.upgrade_cost;
        let duration_secs = business.upgrade_duration_secs;
        self.player.cash -= cost;
        let action = self.new_timed_action(TimedActionKind::Upgrade, now, duration_secs);
        let business = self
            .businesses
            .get_mut(business_id)
            .expect("validated above");
        business.pending_action = Some(action);
        let target_level = business.level + 1;
        self.push_event(
            now,
            EventType::UpgradeStarted,
            business_id.to_string(),
            Vec::new(),
            Some(json!({
                "cost": cost,
                "target_level": target_level,
                "duration_secs": duration_secs,
                "completes_at": action.ends_at(),
            })),
        );
        self.commit_op();
        Ok(self.events_since(mark))
    }

    /// Buy a feature for a built business. The multiplier applies from the
    /// next accrual window onward.
    pub fn unlock_feature(
        &mut self,
        business_id: &str,
        feature_id: &str,
        now: u64,
    ) -> Result<Vec<Event>, EngineError> {
        let mark = self.event_mark();
        self.catch_up(now);

        let business = self
            .businesses
            .get(business_id)
            .ok_or_else(|| EngineError::NotFound {
                entity_id: business_id.to_string(),
            })?;
        if business.level == 0 {
            return Err(EngineError::RequirementNotMet {
                detail: format!("{business_id} has not been built yet"),
            });
        }
        let feature = business
            .features
            .iter()
            .find(|feature| feature.feature_id == feature_id)
            .ok_or_else(|| EngineError::NotFound {
                entity_id: feature_id.to_string(),
            })?;
        if feature.unlocked {
            return Err(EngineError::RequirementNotMet {
                detail: format!("{feature_id} is already unlocked"),
            });
        }
        if self.player.cash < feature.cost {
            return Err(EngineError::InsufficientFunds {
                required: feature.cost,
                available: self.player.cash,
            });
        }

        let cost = feature.cost;
        let multiplier_bps = feature.income_multiplier_bps;
        self.player.cash -= cost;
        let business = self
            .businesses
            .get_mut(business_id)
            .expect("validated above");
        if let Some(feature) = business
            .features
            .iter_mut()
            .find(|feature| feature.feature_id == feature_id)
        {
            feature.unlocked = true;
            feature.active = true;
        }
        business.current_income_per_hour = crate::economy::business_income_per_hour(business);
        let income_per_hour = business.current_income_per_hour;
        self.push_event(
            now,
            EventType::FeatureUnlocked,
            business_id.to_string(),
            Vec::new(),
            Some(json!({
                "feature_id": feature_id,
                "cost": cost,
                "income_multiplier_bps": multiplier_bps,
                "income_per_hour": income_per_hour,
            })),
        );
        self.commit_op();
        Ok(self.events_since(mark))
    }

    /// Commit a crime: level, energy, and cooldown gated. Energy is spent
    /// whether or not the job comes off; the draw runs on the session RNG.
    pub fn commit_crime(&mut self, crime_id: &str, now: u64) -> Result<Vec<Event>, EngineError> {
        let mark = self.event_mark();
        self.catch_up(now);

        let definition = self
            .catalog
            .crime(crime_id)
            .ok_or_else(|| EngineError::NotFound {
                entity_id: crime_id.to_string(),
            })?
            .clone();
        if self.player.level < definition.required_level {
            return Err(EngineError::RequirementNotMet {
                detail: format!(
                    "{crime_id} requires level {}, player is {}",
                    definition.required_level, self.player.level
                ),
            });
        }
        if self.player.energy < definition.energy_cost {
            return Err(EngineError::InsufficientEnergy {
                required: definition.energy_cost,
                available: self.player.energy,
            });
        }
        if let Some(last_used) = self.player.crime_last_used.get(crime_id) {
            let ready_at = last_used.saturating_add(definition.cooldown_secs);
            if now < ready_at {
                return Err(EngineError::CooldownActive {
                    crime_id: crime_id.to_string(),
                    ready_at,
                });
            }
        }

        self.player.energy -= definition.energy_cost;
        self.player.crimes_committed += 1;
        self.player
            .crime_last_used
            .insert(crime_id.to_string(), now);
        let outcome = crime_rules::resolve_crime(&definition, &mut self.rng);
        if outcome.success {
            self.player.cash += outcome.reward;
        }
        let energy_left = self.player.energy;
        let crime_event = self.push_event(
            now,
            EventType::CrimeResolved,
            crime_id.to_string(),
            Vec::new(),
            Some(json!({
                "success": outcome.success,
                "reward": outcome.reward,
                "xp": outcome.xp,
                "energy_spent": definition.energy_cost,
                "energy_left": energy_left,
            })),
        );
        self.commit_experience(outcome.xp, now, vec![crime_event]);
        self.evaluate_missions(now);
        self.commit_op();
        Ok(self.events_since(mark))
    }

    /// Open an attack on a territory the player does not hold. Soldiers
    /// come from the unit pool; the outcome resolves when the timer runs
    /// out, not here.
    pub fn start_attack(
        &mut self,
        territory_id: &str,
        committed_soldiers: u32,
        now: u64,
    ) -> Result<Vec<Event>, EngineError> {
        let mark = self.event_mark();
        self.catch_up(now);

        let territory =
            self.territories
                .get(territory_id)
                .ok_or_else(|| EngineError::NotFound {
                    entity_id: territory_id.to_string(),
                })?;
        if territory.status == TerritoryStatus::UnderAttack || territory.pending_attack.is_some() {
            return Err(EngineError::ActionAlreadyInProgress {
                entity_id: territory_id.to_string(),
            });
        }
        if territory.status == TerritoryStatus::Owned {
            return Err(EngineError::RequirementNotMet {
                detail: format!("{territory_id} is already held"),
            });
        }
        let available: u32 = self.units.values().map(|unit| unit.garrison).sum();
        if committed_soldiers == 0 || committed_soldiers > available {
            return Err(EngineError::InsufficientForces {
                committed: committed_soldiers,
                available,
            });
        }

        let duration_secs = self.config.attack_duration_secs;
        let action = self.new_timed_action(
            TimedActionKind::Attack { committed_soldiers },
            now,
            duration_secs,
        );
        let territory = self
            .territories
            .get_mut(territory_id)
            .expect("validated above");
        territory.status = TerritoryStatus::UnderAttack;
        territory.pending_attack = Some(action);
        let defense = territory.defense;
        self.push_event(
            now,
            EventType::AttackStarted,
            territory_id.to_string(),
            Vec::new(),
            Some(json!({
                "committed_soldiers": committed_soldiers,
                "defense": defense,
                "resolves_at": action.ends_at(),
            })),
        );
        self.commit_op();
        Ok(self.events_since(mark))
    }

    /// Garrison a unit on a held territory, or recall it with `None`. The
    /// territory's `assigned_unit_id` and the unit's
    /// `assigned_territory_id` always change together.
    pub fn assign_unit(
        &mut self,
        unit_id: &str,
        territory_id: Option<&str>,
        now: u64,
    ) -> Result<Vec<Event>, EngineError> {
        let mark = self.event_mark();
        self.catch_up(now);

        if !self.units.contains_key(unit_id) {
            return Err(EngineError::NotFound {
                entity_id: unit_id.to_string(),
            });
        }
        if let Some(target_id) = territory_id {
            let territory =
                self.territories
                    .get(target_id)
                    .ok_or_else(|| EngineError::NotFound {
                        entity_id: target_id.to_string(),
                    })?;
            if territory.status != TerritoryStatus::Owned {
                return Err(EngineError::RequirementNotMet {
                    detail: format!("{target_id} is not held, cannot garrison it"),
                });
            }
        }

        self.detach_unit(unit_id, now);
        if let Some(target_id) = territory_id {
            // A territory holds one unit; displace any sitting tenant.
            if let Some(previous_unit_id) = self
                .territories
                .get(target_id)
                .and_then(|territory| territory.assigned_unit_id.clone())
            {
                self.detach_unit(&previous_unit_id, now);
            }
            if let Some(unit) = self.units.get_mut(unit_id) {
                unit.assigned_territory_id = Some(target_id.to_string());
            }
            if let Some(territory) = self.territories.get_mut(target_id) {
                territory.assigned_unit_id = Some(unit_id.to_string());
            }
            self.push_event(
                now,
                EventType::UnitAssigned,
                unit_id.to_string(),
                Vec::new(),
                Some(json!({ "territory_id": target_id })),
            );
        }
        self.commit_op();
        Ok(self.events_since(mark))
    }

    /// Spend one unspent attribute point.
    pub fn train_attribute(
        &mut self,
        attribute: AttributeKind,
        now: u64,
    ) -> Result<Vec<Event>, EngineError> {
        let mark = self.event_mark();
        self.catch_up(now);

        if self.player.unspent_attribute_points == 0 {
            return Err(EngineError::RequirementNotMet {
                detail: "no unspent attribute points".to_string(),
            });
        }
        self.player.attributes.bump(attribute);
        self.player.unspent_attribute_points -= 1;
        let new_value = self.player.attributes.get(attribute);
        let remaining = self.player.unspent_attribute_points;
        self.push_event(
            now,
            EventType::AttributeTrained,
            self.player.player_id.clone(),
            Vec::new(),
            Some(json!({
                "attribute": attribute,
                "new_value": new_value,
                "remaining_points": remaining,
            })),
        );
        self.commit_op();
        Ok(self.events_since(mark))
    }

    fn new_timed_action(
        &mut self,
        kind: TimedActionKind,
        now: u64,
        duration_secs: u64,
    ) -> TimedAction {
        let sequence = self.next_action_sequence;
        self.next_action_sequence += 1;
        TimedAction {
            kind,
            started_at: now,
            duration_secs,
            sequence,
        }
    }

    /// Break a unit/territory link from the unit side, if any.
    fn detach_unit(&mut self, unit_id: &str, now: u64) {
        let previous = self
            .units
            .get_mut(unit_id)
            .and_then(|unit| unit.assigned_territory_id.take());
        if let Some(previous_territory_id) = previous {
            if let Some(territory) = self.territories.get_mut(&previous_territory_id) {
                territory.assigned_unit_id = None;
            }
            self.push_event(
                now,
                EventType::UnitUnassigned,
                unit_id.to_string(),
                Vec::new(),
                Some(json!({ "territory_id": previous_territory_id })),
            );
        }
    }

    fn commit_op(&mut self) {
        self.status.op_count = self.status.op_count.saturating_add(1);
        self.clamp_invariants();
    }

    /// Invariant backstop: a breach is a programming error. Debug builds
    /// fail loudly; release builds clamp and carry on.
    fn clamp_invariants(&mut self) {
        debug_assert!(self.player.cash >= 0, "cash went negative");
        debug_assert!(self.player.energy >= 0, "energy went negative");
        debug_assert!(
            self.player.energy <= self.player.max_energy,
            "energy above cap"
        );
        debug_assert!(
            self.player.experience < self.player.experience_to_next,
            "unresolved experience overflow"
        );
        self.player.cash = self.player.cash.max(0);
        self.player.energy = self.player.energy.clamp(0, self.player.max_energy);
        for business in self.businesses.values_mut() {
            debug_assert!(business.level <= business.max_level, "level above max");
            business.level = business.level.min(business.max_level);
        }
    }
}
