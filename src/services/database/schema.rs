use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn initialize_schema(conn: &Connection) -> Result<()> {
    create_session_table(conn)?;
    create_countdown_table(conn)?;
    Ok(())
}

fn create_session_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS session_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create session_state table")?;

    Ok(())
}

// Ids are stored in their own columns; an empty raffle id marks an
// event-wide countdown.
fn create_countdown_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS countdown_deadlines (
            event_id TEXT NOT NULL,
            raffle_id TEXT NOT NULL DEFAULT '',
            deadline_ms INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (event_id, raffle_id)
        )",
        [],
    )
    .context("Failed to create countdown_deadlines table")?;

    Ok(())
}
