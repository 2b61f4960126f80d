use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::Database;
use crate::error::{JournalError, JournalResult};
use crate::models::User;

/// Creates the user row on first contact, registered at `now`.
pub(crate) fn ensure_user(conn: &Connection, user_id: &str, now: DateTime<Utc>) -> JournalResult<()> {
    if user_id.trim().is_empty() {
        return Err(JournalError::validation("user id must not be empty"));
    }
    let inserted = conn.execute(
        "INSERT INTO users (id, registered_at) VALUES (?, ?) ON CONFLICT(id) DO NOTHING",
        params![user_id, now.timestamp()],
    )?;
    if inserted > 0 {
        log::info!("Created user {} on first use", user_id);
    }
    Ok(())
}

pub(crate) fn registered_on(conn: &Connection, user_id: &str) -> JournalResult<Option<NaiveDate>> {
    let registered_at: Option<i64> = conn
        .query_row(
            "SELECT registered_at FROM users WHERE id = ?",
            [user_id],
            |row| row.get(0),
        )
        .optional()?;

    Ok(registered_at
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .map(|at| at.date_naive()))
}

pub(crate) fn list_user_ids(conn: &Connection) -> JournalResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT id FROM users ORDER BY id")?;
    let ids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(ids)
}

/// Records the registration date handed over by the auth collaborator.
/// An existing row keeps its trades and gets the new date.
pub fn register_user(db: &Database, user_id: &str, registered_at: DateTime<Utc>) -> JournalResult<User> {
    if user_id.trim().is_empty() {
        return Err(JournalError::validation("user id must not be empty"));
    }

    let conn = db.lock()?;
    conn.execute(
        "INSERT INTO users (id, registered_at) VALUES (?1, ?2)
         ON CONFLICT(id) DO UPDATE SET registered_at = ?2",
        params![user_id, registered_at.timestamp()],
    )?;

    Ok(User {
        id: user_id.to_string(),
        registered_at: registered_at.timestamp(),
    })
}
