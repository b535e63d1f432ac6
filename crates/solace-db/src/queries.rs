use crate::models::{MessageRow, ProfileRow, ProfileUpsert};
use crate::Database;
use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, Row};

const PROFILE_COLUMNS: &str = "id, display_name, avatar_url, location, availability, support_preferences, \
     support_type, last_active, rating, is_certified, people_supported, journey_note";

/// Fixed-width RFC 3339 so stored timestamps sort lexicographically.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl Database {
    // -- Profiles --

    pub fn upsert_profile(&self, profile: &ProfileUpsert<'_>, now: &str) -> Result<()> {
        let preferences = serde_json::to_string(profile.support_preferences)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO profiles
                    (id, display_name, avatar_url, location, availability, support_preferences,
                     support_type, journey_note, last_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9, ?9)
                 ON CONFLICT(id) DO UPDATE SET
                    display_name = excluded.display_name,
                    avatar_url = excluded.avatar_url,
                    location = excluded.location,
                    availability = excluded.availability,
                    support_preferences = excluded.support_preferences,
                    support_type = excluded.support_type,
                    journey_note = excluded.journey_note,
                    last_active = excluded.last_active,
                    updated_at = excluded.updated_at",
                rusqlite::params![
                    profile.id,
                    profile.display_name,
                    profile.avatar_url,
                    profile.location,
                    profile.availability,
                    preferences,
                    profile.support_type,
                    profile.journey_note,
                    now,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_profile(&self, id: &str) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| query_profile(conn, id))
    }

    /// Returns false when the user has no profile yet.
    pub fn touch_last_active(&self, id: &str, now: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE profiles SET last_active = ?2 WHERE id = ?1",
                (id, now),
            )?;
            Ok(changed > 0)
        })
    }

    /// One page of candidate peers for a viewer, most recently active first
    /// (ties broken by id, so pages never overlap).
    /// The viewer is never included; `support_type` narrows by role when set.
    pub fn list_peer_profiles(
        &self,
        viewer_id: &str,
        support_type: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ProfileRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {PROFILE_COLUMNS} FROM profiles
                 WHERE id != ?1 AND (?2 IS NULL OR support_type = ?2)
                 ORDER BY last_active DESC, id ASC
                 LIMIT ?3 OFFSET ?4"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![viewer_id, support_type, limit, offset], profile_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Messages --

    pub fn insert_message(
        &self,
        id: &str,
        sender_id: &str,
        recipient_id: &str,
        content: &str,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, sender_id, recipient_id, content, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, sender_id, recipient_id, content, created_at],
            )?;
            Ok(())
        })
    }

    /// Messages exchanged between two users, oldest first.
    /// `before` is a cursor: only messages created strictly earlier are returned.
    pub fn get_conversation(
        &self,
        user_a: &str,
        user_b: &str,
        limit: u32,
        before: Option<&str>,
    ) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_conversation(conn, user_a, user_b, limit, before))
    }

    /// Profiles of everyone the user has exchanged messages with,
    /// most recent conversation first.
    pub fn list_conversation_partners(&self, user_id: &str) -> Result<Vec<ProfileRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {cols} FROM profiles p
                 JOIN (
                     SELECT CASE WHEN sender_id = ?1 THEN recipient_id ELSE sender_id END AS partner_id,
                            MAX(created_at) AS last_at
                     FROM messages
                     WHERE sender_id = ?1 OR recipient_id = ?1
                     GROUP BY partner_id
                 ) c ON p.id = c.partner_id
                 ORDER BY c.last_at DESC",
                cols = PROFILE_COLUMNS
                    .split(", ")
                    .map(|c| format!("p.{}", c.trim()))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], profile_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<ProfileRow> {
    Ok(ProfileRow {
        id: row.get(0)?,
        display_name: row.get(1)?,
        avatar_url: row.get(2)?,
        location: row.get(3)?,
        availability: row.get(4)?,
        support_preferences: row.get(5)?,
        support_type: row.get(6)?,
        last_active: row.get(7)?,
        rating: row.get(8)?,
        is_certified: row.get(9)?,
        people_supported: row.get(10)?,
        journey_note: row.get(11)?,
    })
}

fn query_profile(conn: &Connection, id: &str) -> Result<Option<ProfileRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1"))?;
    let row = stmt.query_row([id], profile_from_row).optional()?;
    Ok(row)
}

fn query_conversation(
    conn: &Connection,
    user_a: &str,
    user_b: &str,
    limit: u32,
    before: Option<&str>,
) -> Result<Vec<MessageRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, sender_id, recipient_id, content, created_at
         FROM messages
         WHERE ((sender_id = ?1 AND recipient_id = ?2) OR (sender_id = ?2 AND recipient_id = ?1))
           AND (?3 IS NULL OR created_at < ?3)
         ORDER BY created_at DESC
         LIMIT ?4",
    )?;

    let mut rows = stmt
        .query_map(rusqlite::params![user_a, user_b, before, limit], |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                sender_id: row.get(1)?,
                recipient_id: row.get(2)?,
                content: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    // Newest page was selected; hand it back in reading order.
    rows.reverse();
    Ok(rows)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
