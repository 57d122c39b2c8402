use std::fmt;
use std::path::Path;

use contracts::{Command, CommandResult, Event, SessionConfig, SessionStatus, Snapshot};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedCommandEntry {
    pub command: Command,
    pub result: CommandResult,
    pub effective_at: u64,
}

#[derive(Debug, Clone)]
pub struct PersistedSessionSummary {
    pub session_id: String,
    pub player_id: String,
    pub last_seen: u64,
    pub op_count: u64,
}

#[derive(Debug, Clone)]
pub struct ReplaySlice {
    pub snapshot: Option<Snapshot>,
    pub events: Vec<Event>,
}

#[derive(Debug)]
pub enum PersistenceError {
    Sqlite(rusqlite::Error),
    Serde(serde_json::Error),
    NotAttached,
    SessionAlreadyExists(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite error: {err}"),
            Self::Serde(err) => write!(f, "serde error: {err}"),
            Self::NotAttached => write!(f, "sqlite store is not attached"),
            Self::SessionAlreadyExists(session_id) => {
                write!(f, "session already persisted: {session_id}")
            }
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}

#[derive(Debug)]
pub struct SqliteRunStore {
    conn: Connection,
}

impl SqliteRunStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path)?;
        let mut store = Self { conn };
        store.configure()?;
        store.migrate()?;
        Ok(store)
    }

    #[cfg(test)]
    fn open_in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()?;
        let mut store = Self { conn };
        store.configure()?;
        store.migrate()?;
        Ok(store)
    }

    fn configure(&mut self) -> Result<(), PersistenceError> {
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        self.conn.pragma_update(None, "synchronous", "NORMAL")?;
        self.conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(())
    }

    fn migrate(&mut self) -> Result<(), PersistenceError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                session_id TEXT PRIMARY KEY,
                player_id TEXT NOT NULL,
                config_json TEXT NOT NULL,
                status_json TEXT NOT NULL,
                last_seen INTEGER NOT NULL,
                op_count INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS commands (
                session_id TEXT NOT NULL,
                command_id TEXT NOT NULL,
                issued_at INTEGER NOT NULL,
                effective_at INTEGER NOT NULL,
                accepted INTEGER NOT NULL,
                command_json TEXT NOT NULL,
                result_json TEXT NOT NULL,
                PRIMARY KEY (session_id, command_id)
            );
            CREATE TABLE IF NOT EXISTS events (
                session_id TEXT NOT NULL,
                sequence INTEGER NOT NULL,
                occurred_at INTEGER NOT NULL,
                event_type TEXT NOT NULL,
                event_json TEXT NOT NULL,
                PRIMARY KEY (session_id, sequence)
            );
            CREATE TABLE IF NOT EXISTS snapshots (
                session_id TEXT NOT NULL,
                op_count INTEGER NOT NULL,
                as_of INTEGER NOT NULL,
                snapshot_json TEXT NOT NULL,
                PRIMARY KEY (session_id, op_count)
            );",
        )?;
        Ok(())
    }

    pub fn session_exists(&self, session_id: &str) -> Result<bool, PersistenceError> {
        let found: Option<String> = self
            .conn
            .query_row(
                "SELECT session_id FROM sessions WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn delete_session(&mut self, session_id: &str) -> Result<(), PersistenceError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM snapshots WHERE session_id = ?1", params![session_id])?;
        tx.execute("DELETE FROM events WHERE session_id = ?1", params![session_id])?;
        tx.execute("DELETE FROM commands WHERE session_id = ?1", params![session_id])?;
        tx.execute("DELETE FROM sessions WHERE session_id = ?1", params![session_id])?;
        tx.commit()?;
        Ok(())
    }

    /// Append-only delta write: new commands and events, the refreshed
    /// session row, and optionally a full snapshot. One transaction.
    pub fn persist_delta(
        &mut self,
        config: &SessionConfig,
        status: &SessionStatus,
        commands: &[PersistedCommandEntry],
        events: &[Event],
        snapshot: Option<&Snapshot>,
    ) -> Result<(), PersistenceError> {
        let config_json = serde_json::to_string(config)?;
        let status_json = serde_json::to_string(status)?;
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO sessions (session_id, player_id, config_json, status_json, last_seen, op_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(session_id) DO UPDATE SET
                status_json = excluded.status_json,
                last_seen = excluded.last_seen,
                op_count = excluded.op_count",
            params![
                status.session_id.as_str(),
                status.player_id.as_str(),
                config_json,
                status_json,
                i64::try_from(status.last_seen).unwrap_or(i64::MAX),
                i64::try_from(status.op_count).unwrap_or(i64::MAX),
            ],
        )?;

        for entry in commands {
            let command_json = serde_json::to_string(&entry.command)?;
            let result_json = serde_json::to_string(&entry.result)?;
            tx.execute(
                "INSERT OR IGNORE INTO commands (
                    session_id, command_id, issued_at, effective_at, accepted,
                    command_json, result_json
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    entry.command.session_id.as_str(),
                    entry.command.command_id.as_str(),
                    i64::try_from(entry.command.issued_at).unwrap_or(i64::MAX),
                    i64::try_from(entry.effective_at).unwrap_or(i64::MAX),
                    if entry.result.accepted { 1_i64 } else { 0_i64 },
                    command_json,
                    result_json,
                ],
            )?;
        }

        for event in events {
            let event_json = serde_json::to_string(event)?;
            let event_type = serde_json::to_string(&event.event_type)?;
            tx.execute(
                "INSERT OR IGNORE INTO events (
                    session_id, sequence, occurred_at, event_type, event_json
                 ) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    event.session_id.as_str(),
                    i64::try_from(event.sequence).unwrap_or(i64::MAX),
                    i64::try_from(event.occurred_at).unwrap_or(i64::MAX),
                    event_type,
                    event_json,
                ],
            )?;
        }

        if let Some(snapshot) = snapshot {
            let snapshot_json = serde_json::to_string(snapshot)?;
            tx.execute(
                "INSERT OR REPLACE INTO snapshots (session_id, op_count, as_of, snapshot_json)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    snapshot.session_id.as_str(),
                    i64::try_from(status.op_count).unwrap_or(i64::MAX),
                    i64::try_from(snapshot.as_of).unwrap_or(i64::MAX),
                    snapshot_json,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    pub fn list_sessions(&self) -> Result<Vec<PersistedSessionSummary>, PersistenceError> {
        let mut statement = self.conn.prepare(
            "SELECT session_id, player_id, last_seen, op_count FROM sessions ORDER BY session_id",
        )?;
        let rows = statement.query_map([], |row| {
            Ok(PersistedSessionSummary {
                session_id: row.get(0)?,
                player_id: row.get(1)?,
                last_seen: row.get::<_, i64>(2)?.max(0) as u64,
                op_count: row.get::<_, i64>(3)?.max(0) as u64,
            })
        })?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?);
        }
        Ok(sessions)
    }

    /// The newest snapshot plus every event logged after it was taken.
    pub fn load_replay_slice(&mut self, session_id: &str) -> Result<ReplaySlice, PersistenceError> {
        let snapshot_json: Option<String> = self
            .conn
            .query_row(
                "SELECT snapshot_json FROM snapshots
                 WHERE session_id = ?1 ORDER BY op_count DESC LIMIT 1",
                params![session_id],
                |row| row.get(0),
            )
            .optional()?;
        let snapshot = snapshot_json
            .map(|raw| serde_json::from_str::<Snapshot>(&raw))
            .transpose()?;

        let since = snapshot
            .as_ref()
            .map(|snapshot| snapshot.as_of)
            .unwrap_or(0);
        let mut statement = self.conn.prepare(
            "SELECT event_json FROM events
             WHERE session_id = ?1 AND occurred_at >= ?2
             ORDER BY sequence",
        )?;
        let rows = statement.query_map(
            params![session_id, i64::try_from(since).unwrap_or(i64::MAX)],
            |row| row.get::<_, String>(0),
        )?;
        let mut events = Vec::new();
        for row in rows {
            events.push(serde_json::from_str::<Event>(&row?)?);
        }
        Ok(ReplaySlice { snapshot, events })
    }
}
