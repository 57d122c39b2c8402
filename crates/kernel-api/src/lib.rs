//! In-process API facade with command validation, deterministic audit, and
//! SQLite persistence.
//!
//! The facade owns the kernel and is the only writer; the HTTP server and
//! CLI drive it. Persistence is delta-based: after each operation the new
//! commands and events are appended and a full snapshot is written on the
//! configured cadence. The kernel itself never touches I/O.

mod persistence;
mod server;

use std::path::Path;

use contracts::catalog::Catalog;
use contracts::{
    ApiError, Command, CommandResult, ErrorCode, Event, SessionConfig, SessionStatus, Snapshot,
    SCHEMA_VERSION_V1,
};
use kernel_core::world::EmpireWorld;
use persistence::SqliteRunStore;
pub use persistence::{
    PersistedCommandEntry, PersistedSessionSummary, PersistenceError, ReplaySlice,
};
pub use server::{serve, ServerError};

#[derive(Debug)]
struct PersistenceState {
    store: SqliteRunStore,
    persisted_command_count: usize,
    persisted_event_count: usize,
    last_snapshot_op: Option<u64>,
}

#[derive(Debug)]
pub struct EngineApi {
    engine: EmpireWorld,
    command_audit: Vec<CommandResult>,
    command_log: Vec<PersistedCommandEntry>,
    persistence: Option<PersistenceState>,
    last_persistence_error: Option<String>,
}

impl EngineApi {
    pub fn new(config: SessionConfig, catalog: Catalog, started_at: u64) -> Self {
        Self {
            engine: EmpireWorld::new(config, catalog, started_at),
            command_audit: Vec::new(),
            command_log: Vec::new(),
            persistence: None,
            last_persistence_error: None,
        }
    }

    pub fn from_snapshot(config: SessionConfig, catalog: Catalog, snapshot: Snapshot) -> Self {
        Self {
            engine: EmpireWorld::from_snapshot(config, catalog, snapshot),
            command_audit: Vec::new(),
            command_log: Vec::new(),
            persistence: None,
            last_persistence_error: None,
        }
    }

    pub fn engine(&self) -> &EmpireWorld {
        &self.engine
    }

    pub fn status(&self) -> SessionStatus {
        self.engine.status().clone()
    }

    pub fn events(&self) -> &[Event] {
        self.engine.events()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.engine.snapshot()
    }

    pub fn command_audit(&self) -> &[CommandResult] {
        &self.command_audit
    }

    pub fn last_persistence_error(&self) -> Option<&str> {
        self.last_persistence_error.as_deref()
    }

    pub fn attach_sqlite_store(&mut self, path: impl AsRef<Path>) -> Result<(), PersistenceError> {
        let store = SqliteRunStore::open(path)?;
        self.persistence = Some(PersistenceState {
            store,
            persisted_command_count: 0,
            persisted_event_count: 0,
            last_snapshot_op: None,
        });
        Ok(())
    }

    pub fn initialize_session_storage(
        &mut self,
        replace_existing_session: bool,
    ) -> Result<(), PersistenceError> {
        let Some(state) = self.persistence.as_mut() else {
            return Err(PersistenceError::NotAttached);
        };

        let session_id = self.engine.session_id().to_string();
        if state.store.session_exists(&session_id)? {
            if replace_existing_session {
                state.store.delete_session(&session_id)?;
                state.persisted_command_count = 0;
                state.persisted_event_count = 0;
                state.last_snapshot_op = None;
            } else {
                return Err(PersistenceError::SessionAlreadyExists(session_id));
            }
        }

        let bootstrap_snapshot = self.engine.snapshot();
        state.store.persist_delta(
            self.engine.config(),
            self.engine.status(),
            &[],
            &[],
            Some(&bootstrap_snapshot),
        )?;
        state.last_snapshot_op = Some(self.engine.status().op_count);
        self.last_persistence_error = None;
        Ok(())
    }

    /// Validate and apply one command. The result is recorded in the audit
    /// trail and the outcome (including a rejection) is persisted.
    pub fn submit_command(&mut self, command: Command) -> CommandResult {
        if let Some(error) = self.validate_command(&command) {
            let result = CommandResult::rejected(&command, error);
            self.record_command(command, &result);
            return result;
        }

        let now = command.issued_at;
        let result = match self.engine.apply_command(command.clone(), now) {
            Ok(()) => CommandResult::accepted(&command),
            Err(err) => CommandResult::rejected(
                &command,
                ApiError::new(ErrorCode::PreconditionFailed, err.to_string(), None),
            ),
        };
        self.record_command(command, &result);
        result
    }

    /// Advance the session clock: catch-up plus any queued commands.
    pub fn advance_to(&mut self, now: u64) -> Vec<Event> {
        let events = self.engine.advance_to(now);
        self.flush_persistence();
        events
    }

    fn validate_command(&self, command: &Command) -> Option<ApiError> {
        if command.schema_version != SCHEMA_VERSION_V1 {
            return Some(ApiError::new(
                ErrorCode::ContractVersionUnsupported,
                "unsupported contract schema version",
                Some(format!(
                    "requested={} supported={}",
                    command.schema_version, SCHEMA_VERSION_V1
                )),
            ));
        }
        if command.session_id != self.engine.session_id() {
            return Some(ApiError::new(
                ErrorCode::SessionNotFound,
                "session_id does not match the active session",
                Some(format!(
                    "requested_session_id={} active_session_id={}",
                    command.session_id,
                    self.engine.session_id()
                )),
            ));
        }
        None
    }

    fn record_command(&mut self, command: Command, result: &CommandResult) {
        let effective_at = command.issued_at;
        self.command_audit.push(result.clone());
        self.command_log.push(PersistedCommandEntry {
            command,
            result: result.clone(),
            effective_at,
        });
        self.flush_persistence();
    }

    fn flush_persistence(&mut self) {
        if self.persistence.is_none() {
            return;
        }
        if let Err(err) = self.flush_persistence_checked() {
            self.last_persistence_error = Some(err.to_string());
        }
    }

    /// Persist any unpersisted commands/events, plus a snapshot when the
    /// cadence says one is due.
    pub fn flush_persistence_checked(&mut self) -> Result<(), PersistenceError> {
        let Some(state) = self.persistence.as_mut() else {
            return Err(PersistenceError::NotAttached);
        };

        let new_commands = &self.command_log[state.persisted_command_count..];
        let new_events = &self.engine.events()[state.persisted_event_count..];

        let op_count = self.engine.status().op_count;
        let cadence = self.engine.config().snapshot_every_ops.max(1);
        let snapshot_due = state.last_snapshot_op.is_none()
            || op_count.saturating_sub(state.last_snapshot_op.unwrap_or(0)) >= cadence;
        let snapshot = if snapshot_due {
            Some(self.engine.snapshot())
        } else {
            None
        };

        state.store.persist_delta(
            self.engine.config(),
            self.engine.status(),
            new_commands,
            new_events,
            snapshot.as_ref(),
        )?;

        state.persisted_command_count = self.command_log.len();
        state.persisted_event_count = self.engine.events().len();
        if snapshot.is_some() {
            state.last_snapshot_op = Some(op_count);
        }
        self.last_persistence_error = None;
        Ok(())
    }

    /// Load the latest persisted snapshot and the events after it.
    pub fn load_replay_slice(&mut self, session_id: &str) -> Result<ReplaySlice, PersistenceError> {
        let Some(state) = self.persistence.as_mut() else {
            return Err(PersistenceError::NotAttached);
        };
        state.store.load_replay_slice(session_id)
    }
}
