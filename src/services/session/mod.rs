use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension};

use crate::models::event::EventId;
use crate::models::session::Session;
use crate::services::database::Database;

const TOKEN_KEY: &str = "authToken";
const EMAIL_KEY: &str = "operatorEmail";
const CURRENT_EVENT_KEY: &str = "currentEventId";

/// Session record in the `session_state` key/value table.
pub struct SessionService<'a> {
    db: &'a Database,
}

impl<'a> SessionService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn load(&self) -> Result<Session> {
        Ok(Session {
            token: self.get(TOKEN_KEY)?,
            operator_email: self.get(EMAIL_KEY)?,
            current_event_id: self.get(CURRENT_EVENT_KEY)?.map(EventId::new),
        })
    }

    pub fn save_login(&self, token: &str, email: &str) -> Result<()> {
        self.set(TOKEN_KEY, token)?;
        self.set(EMAIL_KEY, email)?;
        Ok(())
    }

    /// Remembers the event created by a draft submission still in progress.
    pub fn set_current_event(&self, id: &EventId) -> Result<()> {
        self.set(CURRENT_EVENT_KEY, id.as_str())
    }

    pub fn clear_current_event(&self) -> Result<()> {
        self.remove(CURRENT_EVENT_KEY)
    }

    /// Forgets the token, the operator and any draft in progress.
    pub fn clear(&self) -> Result<()> {
        self.db
            .connection()
            .execute(
                "DELETE FROM session_state WHERE key IN (?1, ?2, ?3)",
                params![TOKEN_KEY, EMAIL_KEY, CURRENT_EVENT_KEY],
            )
            .context("Failed to clear session")?;
        log::info!("Session cleared");
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        self.db
            .connection()
            .query_row(
                "SELECT value FROM session_state WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("Failed to read session value '{}'", key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.db
            .connection()
            .execute(
                "INSERT INTO session_state (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = CURRENT_TIMESTAMP",
                params![key, value],
            )
            .with_context(|| format!("Failed to store session value '{}'", key))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.db
            .connection()
            .execute("DELETE FROM session_state WHERE key = ?1", [key])
            .with_context(|| format!("Failed to remove session value '{}'", key))?;
        Ok(())
    }
}
