use super::*;

use contracts::{EventType, SCHEMA_VERSION_V1};
use serde_json::Value;

impl EmpireWorld {
    pub fn events(&self) -> &[Event] {
        &self.event_log
    }

    /// Events appended since `mark` (an earlier `event_log` length). The
    /// orchestrator operations use this to return exactly the events they
    /// produced.
    pub(super) fn events_since(&self, mark: usize) -> Vec<Event> {
        self.event_log[mark..].to_vec()
    }

    pub(super) fn event_mark(&self) -> usize {
        self.event_log.len()
    }

    pub(super) fn push_event(
        &mut self,
        occurred_at: u64,
        event_type: EventType,
        subject_id: impl Into<String>,
        caused_by: Vec<String>,
        details: Option<Value>,
    ) -> String {
        let sequence = self.event_log.len() as u64;
        let event_id = format!("evt_{sequence:08}");
        self.event_log.push(Event {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            session_id: self.status.session_id.clone(),
            occurred_at,
            event_id: event_id.clone(),
            sequence,
            event_type,
            subject_id: subject_id.into(),
            caused_by,
            details,
        });
        self.state_hash = mix_event_hash(self.state_hash, &event_id, occurred_at, sequence);
        event_id
    }
}
