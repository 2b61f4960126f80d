use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::db::Database;
use crate::error::{JournalError, JournalResult};
use crate::models::{NewNotification, Notification};

/// Whether a pipeline run writes to the outbox. Recalculation replays silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyMode {
    Emit,
    Silent,
}

impl NotifyMode {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            NotifyMode::Emit
        } else {
            NotifyMode::Silent
        }
    }
}

/// Appends to the outbox. Returns the new id, or `None` in silent mode.
pub(crate) fn push_notification(
    conn: &Connection,
    notification: NewNotification,
    now: DateTime<Utc>,
    mode: NotifyMode,
) -> JournalResult<Option<String>> {
    if mode == NotifyMode::Silent {
        log::debug!("Suppressed notification for {}: {}", notification.user_id, notification.title);
        return Ok(None);
    }

    let id = format!("NOTIF-{}-{}", now.timestamp_millis(), uuid::Uuid::new_v4());
    conn.execute(
        "INSERT INTO notifications (id, user_id, title, message, category, metadata, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            id,
            notification.user_id,
            notification.title,
            notification.message,
            notification.category,
            serde_json::to_string(&notification.metadata)?,
            now.timestamp()
        ],
    )?;

    log::info!("Notification queued for {}: {}", notification.user_id, notification.title);

    Ok(Some(id))
}

fn map_row_to_notification(row: &rusqlite::Row) -> rusqlite::Result<Notification> {
    let metadata: String = row.get(5)?;
    Ok(Notification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        message: row.get(3)?,
        category: row.get(4)?,
        metadata: serde_json::from_str(&metadata).unwrap_or(serde_json::Value::Null),
        created_at: row.get(6)?,
        read_at: row.get(7)?,
    })
}

pub(crate) fn load_notifications(
    conn: &Connection,
    user_id: &str,
    unread_only: bool,
) -> JournalResult<Vec<Notification>> {
    let query = if unread_only {
        "SELECT id, user_id, title, message, category, metadata, created_at, read_at
         FROM notifications WHERE user_id = ? AND read_at IS NULL ORDER BY created_at, rowid"
    } else {
        "SELECT id, user_id, title, message, category, metadata, created_at, read_at
         FROM notifications WHERE user_id = ? ORDER BY created_at, rowid"
    };

    let mut stmt = conn.prepare(query)?;
    let notifications = stmt
        .query_map([user_id], map_row_to_notification)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(notifications)
}

pub fn get_notifications(db: &Database, user_id: &str, unread_only: bool) -> JournalResult<Vec<Notification>> {
    let conn = db.lock()?;
    load_notifications(&conn, user_id, unread_only)
}

pub fn mark_notification_read(db: &Database, user_id: &str, id: &str) -> JournalResult<()> {
    let conn = db.lock()?;
    let updated = conn.execute(
        "UPDATE notifications SET read_at = COALESCE(read_at, ?) WHERE id = ? AND user_id = ?",
        params![Utc::now().timestamp(), id, user_id],
    )?;
    if updated == 0 {
        return Err(JournalError::not_found("Notification", id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::users::ensure_user;
    use crate::models::NotificationCategory;

    fn sample(user_id: &str) -> NewNotification {
        NewNotification {
            user_id: user_id.to_string(),
            title: "Badge earned".to_string(),
            message: "You earned First Steps".to_string(),
            category: NotificationCategory::Badge,
            metadata: serde_json::json!({ "badge_id": "first-trade" }),
        }
    }

    #[test]
    fn test_push_and_read_back() {
        let db = Database::in_memory().unwrap();
        let id = {
            let conn = db.lock().unwrap();
            ensure_user(&conn, "u1", Utc::now()).unwrap();
            push_notification(&conn, sample("u1"), Utc::now(), NotifyMode::Emit)
                .unwrap()
                .unwrap()
        };

        let unread = get_notifications(&db, "u1", true).unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].category, NotificationCategory::Badge);
        assert_eq!(unread[0].metadata["badge_id"], "first-trade");

        mark_notification_read(&db, "u1", &id).unwrap();
        assert!(get_notifications(&db, "u1", true).unwrap().is_empty());
        assert_eq!(get_notifications(&db, "u1", false).unwrap().len(), 1);
    }

    #[test]
    fn test_silent_mode_writes_nothing() {
        let db = Database::in_memory().unwrap();
        let conn = db.lock().unwrap();
        ensure_user(&conn, "u1", Utc::now()).unwrap();
        let id = push_notification(&conn, sample("u1"), Utc::now(), NotifyMode::Silent).unwrap();
        assert!(id.is_none());
        assert!(load_notifications(&conn, "u1", false).unwrap().is_empty());
    }

    #[test]
    fn test_mark_read_of_other_users_notification_is_not_found() {
        let db = Database::in_memory().unwrap();
        let id = {
            let conn = db.lock().unwrap();
            ensure_user(&conn, "u1", Utc::now()).unwrap();
            push_notification(&conn, sample("u1"), Utc::now(), NotifyMode::Emit)
                .unwrap()
                .unwrap()
        };
        assert!(matches!(
            mark_notification_read(&db, "u2", &id),
            Err(JournalError::NotFound { .. })
        ));
    }
}
