use super::*;

use contracts::{Snapshot, SCHEMA_VERSION_V1};
use serde_json::json;

impl EmpireWorld {
    /// Assemble a full persistable snapshot of the session as of the last
    /// committed pass. Field semantics round-trip losslessly; instants are
    /// absolute epoch seconds.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            session_id: self.status.session_id.clone(),
            as_of: self.status.last_seen,
            snapshot_id: format!("snap_{:06}", self.status.op_count),
            world_state_hash: format!("{:016x}", self.state_hash),
            player: self.player.clone(),
            businesses: self.businesses.values().cloned().collect(),
            territories: self.territories.values().cloned().collect(),
            units: self.units.values().cloned().collect(),
            missions: self.missions.values().cloned().collect(),
            perf_stats: Some(json!({
                "event_count": self.event_log.len(),
                "queue_depth": self.queued_commands.len(),
                "skew_reports": self.skew_reports,
            })),
        }
    }
}
