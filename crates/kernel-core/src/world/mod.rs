//! The simulation orchestrator: one player's state tree, advanced
//! deterministically over wall-clock time.
//!
//! All mutations go through `&mut self` operations that run to completion
//! before returning: no two mutating operations on the same session ever
//! interleave, and readers only ever see committed state. Every operation
//! validates fully before touching anything, then commits as one unit and
//! returns the domain events it produced.

use std::collections::BTreeMap;
use std::fmt;

use contracts::catalog::Catalog;
use contracts::{
    Business, CaporegimeUnit, Command, Event, MissionState, PlayerState, SessionConfig,
    SessionStatus, Territory,
};
use rand::rngs::SmallRng;

mod actions;
mod commands;
mod events;
mod init;
mod inspect;
mod resolve;
mod snapshot;
mod step;

#[cfg(test)]
mod tests;

/// Recoverable validation failure. Returned to the caller with the unmet
/// precondition; state is never mutated on the error path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    InsufficientFunds { required: i64, available: i64 },
    InsufficientEnergy { required: i64, available: i64 },
    ActionAlreadyInProgress { entity_id: String },
    CooldownActive { crime_id: String, ready_at: u64 },
    RequirementNotMet { detail: String },
    InsufficientForces { committed: u32, available: u32 },
    NotFound { entity_id: String },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientFunds {
                required,
                available,
            } => write!(f, "insufficient funds: need {required}, have {available}"),
            Self::InsufficientEnergy {
                required,
                available,
            } => write!(f, "insufficient energy: need {required}, have {available}"),
            Self::ActionAlreadyInProgress { entity_id } => {
                write!(f, "timed action already in progress on {entity_id}")
            }
            Self::CooldownActive { crime_id, ready_at } => {
                write!(f, "cooldown active for {crime_id} until {ready_at}")
            }
            Self::RequirementNotMet { detail } => write!(f, "requirement not met: {detail}"),
            Self::InsufficientForces {
                committed,
                available,
            } => write!(
                f,
                "insufficient forces: committed {committed}, available {available}"
            ),
            Self::NotFound { entity_id } => write!(f, "no such entity: {entity_id}"),
        }
    }
}

impl std::error::Error for EngineError {}

#[derive(Debug, Clone)]
pub struct QueuedCommand {
    pub effective_at: u64,
    pub insertion_sequence: u64,
    pub command: Command,
}

/// Summary of one catch-up pass, surfaced in the `CatchUpApplied` event
/// and to the shells for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatchUpMetrics {
    pub elapsed_secs: u64,
    pub cash_accrued: i64,
    pub xp_accrued: i64,
    pub energy_regained: i64,
    pub actions_resolved: u64,
}

#[derive(Debug)]
pub struct EmpireWorld {
    config: SessionConfig,
    catalog: Catalog,
    status: SessionStatus,
    player: PlayerState,
    businesses: BTreeMap<String, Business>,
    territories: BTreeMap<String, Territory>,
    units: BTreeMap<String, CaporegimeUnit>,
    missions: BTreeMap<String, MissionState>,
    event_log: Vec<Event>,
    queued_commands: Vec<QueuedCommand>,
    next_command_sequence: u64,
    /// Global insertion counter for timed actions; the catch-up tie-break.
    next_action_sequence: u64,
    rng: SmallRng,
    state_hash: u64,
    skew_reports: u64,
    last_catch_up: CatchUpMetrics,
}

fn mix_state_hash(state_hash: u64, occurred_at: u64, sequence: u64) -> u64 {
    let mut hash = state_hash ^ occurred_at.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    hash ^= sequence.wrapping_mul(0x517C_C1B7_2722_0A95);
    hash.rotate_left(17)
}

fn mix_event_hash(current: u64, event_id: &str, occurred_at: u64, sequence: u64) -> u64 {
    let mut hash = current ^ occurred_at.wrapping_mul(0xA24B_1C62_5B93_2D47);
    hash ^= sequence.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    for byte in event_id.as_bytes() {
        hash = hash.rotate_left(7) ^ u64::from(*byte);
        hash = hash.wrapping_mul(0x517C_C1B7_2722_0A95);
    }
    hash
}
