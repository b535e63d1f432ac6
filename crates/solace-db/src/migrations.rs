use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS profiles (
            id                  TEXT PRIMARY KEY,
            display_name        TEXT,
            avatar_url          TEXT,
            location            TEXT,
            availability        TEXT,
            support_preferences TEXT NOT NULL DEFAULT '[]',
            support_type        TEXT,
            last_active         TEXT,
            rating              REAL,
            is_certified        INTEGER,
            people_supported    INTEGER,
            journey_note        TEXT,
            created_at          TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at          TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_profiles_support_type
            ON profiles(support_type, last_active);

        CREATE TABLE IF NOT EXISTS messages (
            id              TEXT PRIMARY KEY,
            sender_id       TEXT NOT NULL REFERENCES profiles(id),
            recipient_id    TEXT NOT NULL REFERENCES profiles(id),
            content         TEXT NOT NULL,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_pair
            ON messages(sender_id, recipient_id, created_at);

        CREATE INDEX IF NOT EXISTS idx_messages_recipient
            ON messages(recipient_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
