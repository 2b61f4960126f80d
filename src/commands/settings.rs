use rusqlite::Connection;

use crate::db::Database;
use crate::error::{JournalError, JournalResult};
use crate::models::{Settings, UpdateSettingsInput};

pub(crate) fn load_settings(conn: &Connection) -> JournalResult<Settings> {
    let settings = conn.query_row(
        "SELECT id, note_max_length, streak_check_interval_secs, notifications_enabled, created_at, updated_at FROM settings WHERE id = 1",
        [],
        |row| {
            Ok(Settings {
                id: row.get(0)?,
                note_max_length: row.get(1)?,
                streak_check_interval_secs: row.get(2)?,
                notifications_enabled: row.get::<_, i32>(3)? == 1,
                created_at: row.get(4)?,
                updated_at: row.get(5)?,
            })
        },
    )?;

    Ok(settings)
}

pub fn get_settings(db: &Database) -> JournalResult<Settings> {
    let conn = db.lock()?;
    load_settings(&conn)
}

pub fn update_settings(db: &Database, settings: UpdateSettingsInput) -> JournalResult<Settings> {
    if settings.note_max_length == Some(0) {
        return Err(JournalError::validation("note_max_length must be positive"));
    }
    if settings.streak_check_interval_secs.is_some_and(|secs| secs <= 0) {
        return Err(JournalError::validation("streak_check_interval_secs must be positive"));
    }

    let conn = db.lock()?;

    let mut updates = Vec::new();
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(val) = settings.note_max_length {
        updates.push("note_max_length = ?");
        values.push(Box::new(val));
    }
    if let Some(val) = settings.streak_check_interval_secs {
        updates.push("streak_check_interval_secs = ?");
        values.push(Box::new(val));
    }
    if let Some(val) = settings.notifications_enabled {
        updates.push("notifications_enabled = ?");
        values.push(Box::new(val as i32));
    }

    updates.push("updated_at = strftime('%s', 'now')");

    let query = format!("UPDATE settings SET {} WHERE id = 1", updates.join(", "));
    let params: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
    conn.execute(&query, params.as_slice())?;

    log::info!("Settings updated");

    load_settings(&conn)
}
