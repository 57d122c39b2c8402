use super::*;

use contracts::{CommandPayload, EventType};
use serde_json::json;

impl EmpireWorld {
    /// Drain and apply queued commands that have come due, in
    /// `(effective_at, insertion_sequence)` order.
    pub(super) fn process_due_commands(&mut self, now: u64) {
        self.queued_commands.sort_by(|a, b| {
            a.effective_at
                .cmp(&b.effective_at)
                .then(a.insertion_sequence.cmp(&b.insertion_sequence))
        });

        let mut future = Vec::new();
        let mut due = Vec::new();
        for queued in self.queued_commands.drain(..) {
            if queued.effective_at <= now {
                due.push(queued);
            } else {
                future.push(queued);
            }
        }
        self.queued_commands = future;
        self.sync_queue_depth();

        for queued in due {
            let at = queued.effective_at.max(self.player.last_income_collection);
            self.apply_command(queued.command, at);
        }
    }

    /// Apply one command at `now`, recording acceptance or the rejection
    /// reason in the event log either way.
    pub fn apply_command(&mut self, command: Command, now: u64) -> Result<(), EngineError> {
        let command_ref = format!("cmd:{}", command.command_id);
        let outcome = match &command.payload {
            CommandPayload::CollectIncome => self.collect_income(now).map(|_| ()),
            CommandPayload::StartBuild { business_id } => {
                self.start_build(business_id, now).map(|_| ())
            }
            CommandPayload::StartUpgrade { business_id } => {
                self.start_upgrade(business_id, now).map(|_| ())
            }
            CommandPayload::UnlockFeature {
                business_id,
                feature_id,
            } => self
                .unlock_feature(business_id, feature_id, now)
                .map(|_| ()),
            CommandPayload::CommitCrime { crime_id } => {
                self.commit_crime(crime_id, now).map(|_| ())
            }
            CommandPayload::StartAttack {
                territory_id,
                committed_soldiers,
            } => self
                .start_attack(territory_id, *committed_soldiers, now)
                .map(|_| ()),
            CommandPayload::AssignUnit {
                unit_id,
                territory_id,
            } => self
                .assign_unit(unit_id, territory_id.as_deref(), now)
                .map(|_| ()),
            CommandPayload::TrainAttribute { attribute } => {
                self.train_attribute(*attribute, now).map(|_| ())
            }
            CommandPayload::AdvanceTo { now: target } => {
                self.catch_up((*target).max(now));
                Ok(())
            }
        };

        self.push_event(
            now,
            EventType::CommandApplied,
            command.command_id.clone(),
            vec![command_ref],
            Some(json!({
                "command_type": command.command_type,
                "accepted": outcome.is_ok(),
                "error": outcome.as_ref().err().map(|err| err.to_string()),
            })),
        );
        outcome
    }
}
