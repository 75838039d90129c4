//! Database repository for countdown deadlines.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use super::models::CountdownKey;
use crate::models::event::EventId;
use crate::models::raffle::RaffleId;

/// Repository for the `countdown_deadlines` table.
pub struct CountdownRepository<'a> {
    conn: &'a Connection,
}

impl<'a> CountdownRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert or overwrite the deadline for a key.
    pub fn upsert(&self, key: &CountdownKey, deadline_ms: i64) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO countdown_deadlines (event_id, raffle_id, deadline_ms)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(event_id, raffle_id) DO UPDATE SET
                    deadline_ms = excluded.deadline_ms",
                params![key.event_id().as_str(), raffle_column(key), deadline_ms],
            )
            .with_context(|| format!("Failed to store deadline for {}", key))?;
        Ok(())
    }

    pub fn get(&self, key: &CountdownKey) -> Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT deadline_ms FROM countdown_deadlines
                 WHERE event_id = ?1 AND raffle_id = ?2",
                params![key.event_id().as_str(), raffle_column(key)],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("Failed to read deadline for {}", key))
    }

    /// Returns true if a row was removed.
    pub fn delete(&self, key: &CountdownKey) -> Result<bool> {
        let rows = self
            .conn
            .execute(
                "DELETE FROM countdown_deadlines WHERE event_id = ?1 AND raffle_id = ?2",
                params![key.event_id().as_str(), raffle_column(key)],
            )
            .with_context(|| format!("Failed to delete deadline for {}", key))?;
        Ok(rows > 0)
    }

    /// All entries, ordered by event then raffle.
    pub fn get_all(&self) -> Result<Vec<(CountdownKey, i64)>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT event_id, raffle_id, deadline_ms FROM countdown_deadlines
                 ORDER BY event_id, raffle_id",
            )
            .context("Failed to prepare countdown list query")?;

        let rows = stmt
            .query_map([], |row| {
                let event_id: String = row.get(0)?;
                let raffle_id: String = row.get(1)?;
                Ok((key_from_columns(event_id, raffle_id), row.get::<_, i64>(2)?))
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to load countdown deadlines")?;

        Ok(rows)
    }

    pub fn delete_for_event(&self, event_id: &EventId) -> Result<usize> {
        self.conn
            .execute(
                "DELETE FROM countdown_deadlines WHERE event_id = ?1",
                [event_id.as_str()],
            )
            .with_context(|| format!("Failed to delete deadlines for event {}", event_id))
    }

    pub fn delete_all(&self) -> Result<usize> {
        self.conn
            .execute("DELETE FROM countdown_deadlines", [])
            .context("Failed to clear countdown deadlines")
    }
}

fn raffle_column(key: &CountdownKey) -> &str {
    key.raffle_id().map(RaffleId::as_str).unwrap_or("")
}

fn key_from_columns(event_id: String, raffle_id: String) -> CountdownKey {
    let event_id = EventId::new(event_id);
    if raffle_id.is_empty() {
        CountdownKey::event(event_id)
    } else {
        CountdownKey::raffle(event_id, RaffleId::new(raffle_id))
    }
}
