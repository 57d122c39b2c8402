use super::*;

use contracts::catalog::Catalog;
use contracts::{EventType, TerritoryStatus};
use serde_json::json;

use crate::{clock, economy, progression};

impl EmpireWorld {
    pub fn session_id(&self) -> &str {
        &self.status.session_id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    pub fn businesses(&self) -> impl Iterator<Item = &Business> {
        self.businesses.values()
    }

    pub fn territories(&self) -> impl Iterator<Item = &Territory> {
        self.territories.values()
    }

    pub fn units(&self) -> impl Iterator<Item = &CaporegimeUnit> {
        self.units.values()
    }

    pub fn missions(&self) -> impl Iterator<Item = &MissionState> {
        self.missions.values()
    }

    pub fn state_hash(&self) -> u64 {
        self.state_hash
    }

    pub fn skew_reports(&self) -> u64 {
        self.skew_reports
    }

    pub fn last_catch_up(&self) -> CatchUpMetrics {
        self.last_catch_up
    }

    pub fn enqueue_command(&mut self, command: Command, effective_at: u64) {
        self.queued_commands.push(QueuedCommand {
            effective_at,
            insertion_sequence: self.next_command_sequence,
            command,
        });
        self.next_command_sequence = self.next_command_sequence.saturating_add(1);
        self.sync_queue_depth();
    }

    /// Advance the session to `now`: run the catch-up pass, then apply any
    /// queued commands that have come due. Returns every event produced.
    pub fn advance_to(&mut self, now: u64) -> Vec<Event> {
        let mark = self.event_mark();
        self.catch_up(now);
        self.process_due_commands(now);
        self.status.op_count = self.status.op_count.saturating_add(1);
        self.events_since(mark)
    }

    /// The catch-up pass: one elapsed window drives income accrual, energy
    /// regeneration, timed-action resolution, and mission evaluation
    /// together. `last_income_collection` advances only once the whole
    /// pass has committed.
    pub(super) fn catch_up(&mut self, now: u64) {
        let window = clock::elapsed_since(
            self.player.last_income_collection,
            now,
            self.config.max_offline_catchup_secs,
        );
        if window.skew_detected {
            self.skew_reports += 1;
            self.last_catch_up = CatchUpMetrics::default();
            let last_seen = self.player.last_income_collection;
            self.push_event(
                now,
                EventType::ClockSkewDetected,
                self.player.player_id.clone(),
                Vec::new(),
                Some(json!({ "stored_instant": last_seen, "observed_now": now })),
            );
            return;
        }
        let elapsed = window.seconds;

        // Income and passive XP for the window, at the rates in effect when
        // the window opened. Actions completing mid-window start earning on
        // the next pass.
        let income_per_hour = self.recompute_passive_income();
        let territories_owned = self
            .territories
            .values()
            .filter(|territory| territory.status == TerritoryStatus::Owned)
            .count() as u32;
        let xp_per_hour = economy::passive_xp_per_hour(territories_owned, &self.config);
        let accrual = economy::accrue(
            income_per_hour,
            xp_per_hour,
            self.player.income_residue,
            self.player.xp_residue,
            elapsed,
        );
        self.player.cash += accrual.cash_delta;
        self.player.income_residue = accrual.new_income_residue;
        self.player.xp_residue = accrual.new_xp_residue;
        self.accrue_unit_earnings(elapsed);
        self.commit_experience(accrual.xp_delta, now, Vec::new());

        let (energy, residue, regained) = economy::regen_energy(
            self.player.energy,
            self.player.max_energy,
            self.player.energy_residue_secs,
            elapsed,
            self.config.energy_regen_secs_per_point,
        );
        self.player.energy = energy;
        self.player.energy_residue_secs = residue;
        if regained > 0 {
            let energy_now = self.player.energy;
            self.push_event(
                now,
                EventType::EnergyRegenerated,
                self.player.player_id.clone(),
                Vec::new(),
                Some(json!({ "points": regained, "energy": energy_now })),
            );
        }

        let actions_resolved = self.resolve_due_actions(now);
        self.evaluate_missions(now);

        self.player.last_income_collection = now;
        self.status.last_seen = now;
        self.last_catch_up = CatchUpMetrics {
            elapsed_secs: elapsed,
            cash_accrued: accrual.cash_delta,
            xp_accrued: accrual.xp_delta,
            energy_regained: regained,
            actions_resolved,
        };
        if elapsed > 0 || actions_resolved > 0 {
            self.push_event(
                now,
                EventType::CatchUpApplied,
                self.player.player_id.clone(),
                Vec::new(),
                Some(json!({
                    "elapsed_secs": elapsed,
                    "clamped": window.clamped,
                    "cash_accrued": accrual.cash_delta,
                    "xp_accrued": accrual.xp_delta,
                    "energy_regained": regained,
                    "actions_resolved": actions_resolved,
                })),
            );
        }
        self.state_hash = mix_state_hash(self.state_hash, now, self.event_log.len() as u64);
    }

    /// Sum of every passive income source, refreshing each business's
    /// stored `current_income_per_hour` on the way.
    pub(super) fn recompute_passive_income(&mut self) -> i64 {
        let mut total = 0_i64;
        for business in self.businesses.values_mut() {
            business.current_income_per_hour = economy::business_income_per_hour(business);
            total += business.current_income_per_hour;
        }
        for territory in self.territories.values() {
            let assigned_unit = territory
                .assigned_unit_id
                .as_deref()
                .and_then(|unit_id| self.units.get(unit_id));
            total += economy::territory_income_per_hour(territory, assigned_unit);
        }
        total
    }

    /// Display-side bookkeeping: an assigned unit's boost also accrues on
    /// the unit itself, floored per pass.
    fn accrue_unit_earnings(&mut self, elapsed_secs: u64) {
        let assigned: Vec<(String, i64)> = self
            .territories
            .values()
            .filter(|territory| territory.status == TerritoryStatus::Owned)
            .filter_map(|territory| territory.assigned_unit_id.clone())
            .filter_map(|unit_id| {
                self.units
                    .get(&unit_id)
                    .map(|unit| (unit_id, economy::unit_boost_per_hour(unit)))
            })
            .collect();
        for (unit_id, boost_per_hour) in assigned {
            if let Some(unit) = self.units.get_mut(&unit_id) {
                let earned = (i128::from(boost_per_hour) * i128::from(elapsed_secs)
                    / i128::from(contracts::SECS_PER_HOUR)) as i64;
                unit.earnings_accrued += earned;
            }
        }
    }

    /// Grant XP and emit level/rank events for whatever it resolves to.
    /// Runs even on a zero grant so an experience backlog restored from a
    /// snapshot still resolves on the next pass.
    pub(super) fn commit_experience(&mut self, xp_delta: i64, now: u64, caused_by: Vec<String>) {
        if xp_delta < 0 {
            return;
        }
        let summary = progression::apply_experience(
            &mut self.player,
            xp_delta,
            &self.catalog.leveling_curve,
            &self.config,
        );
        if summary.levels_gained == 0 {
            return;
        }
        let level_event = self.push_event(
            now,
            EventType::LevelUp,
            self.player.player_id.clone(),
            caused_by,
            Some(json!({
                "new_level": summary.new_level,
                "levels_gained": summary.levels_gained,
                "points_granted": summary.points_granted,
            })),
        );
        if summary.rank_promoted {
            self.push_event(
                now,
                EventType::RankPromoted,
                self.player.player_id.clone(),
                vec![level_event],
                Some(json!({ "new_rank": summary.new_rank.as_str() })),
            );
        }
    }

    pub(super) fn sync_queue_depth(&mut self) {
        self.status.queue_depth = self.queued_commands.len();
    }
}
