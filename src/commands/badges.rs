use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::collections::HashSet;

use crate::commands::notifications::{push_notification, NotifyMode};
use crate::commands::settings::load_settings;
use crate::commands::stats::{add_badge_to_stats, load_user_stats};
use crate::commands::users::{ensure_user, registered_on};
use crate::db::Database;
use crate::engine::badge::{is_satisfied, BadgeContext};
use crate::error::{JournalError, JournalResult};
use crate::models::{Badge, BadgeRequirement, BadgeTier, BadgeTrigger, NewNotification, NotificationCategory, UserBadge};

/// Loads the catalog in display order. A row whose requirement cannot be
/// decoded is logged and left out; the rest of the catalog still loads.
pub(crate) fn load_catalog(conn: &Connection) -> JournalResult<Vec<Badge>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, category, tier, points, requirement
         FROM badges ORDER BY sort_order, id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, BadgeTier>(4)?,
                row.get::<_, u32>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut catalog = Vec::with_capacity(rows.len());
    for (id, name, description, category, tier, points, requirement) in rows {
        match serde_json::from_str::<BadgeRequirement>(&requirement) {
            Ok(requirement) => catalog.push(Badge {
                id,
                name,
                description,
                category,
                tier,
                points,
                requirement,
            }),
            Err(e) => log::warn!("Skipping badge {}: undecodable requirement {}: {}", id, requirement, e),
        }
    }

    Ok(catalog)
}

pub(crate) fn earned_badge_ids(conn: &Connection, user_id: &str) -> JournalResult<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT badge_id FROM user_badges WHERE user_id = ?")?;
    let ids = stmt
        .query_map([user_id], |row| row.get(0))?
        .collect::<Result<HashSet<String>, _>>()?;
    Ok(ids)
}

/// Inserts the badge under the (user, badge) uniqueness guard. Only an
/// actual insert counts toward stats and emits a notification.
pub(crate) fn award_badge(
    conn: &Connection,
    user_id: &str,
    badge: &Badge,
    trigger: BadgeTrigger,
    now: DateTime<Utc>,
    notify: NotifyMode,
) -> JournalResult<Option<UserBadge>> {
    let inserted = conn.execute(
        "INSERT INTO user_badges (user_id, badge_id, earned_at) VALUES (?, ?, ?)
         ON CONFLICT(user_id, badge_id) DO NOTHING",
        params![user_id, badge.id, now.timestamp()],
    )?;
    if inserted == 0 {
        return Ok(None);
    }

    add_badge_to_stats(conn, user_id, badge.points, now)?;

    push_notification(
        conn,
        NewNotification {
            user_id: user_id.to_string(),
            title: format!("Badge earned: {}", badge.name),
            message: badge.description.clone(),
            category: NotificationCategory::Badge,
            metadata: serde_json::json!({
                "badge_id": badge.id,
                "tier": badge.tier.as_str(),
                "points": badge.points,
                "trigger": trigger,
            }),
        },
        now,
        notify,
    )?;

    log::info!("User {} earned badge {} ({:?})", user_id, badge.id, trigger);

    Ok(Some(UserBadge {
        user_id: user_id.to_string(),
        badge_id: badge.id.clone(),
        earned_at: now.timestamp(),
    }))
}

/// `award_badge` inside a savepoint: a failure after the insert leaves no
/// half-written award behind.
fn award_badge_atomically(
    conn: &Connection,
    user_id: &str,
    badge: &Badge,
    trigger: BadgeTrigger,
    now: DateTime<Utc>,
    notify: NotifyMode,
) -> JournalResult<Option<UserBadge>> {
    conn.execute_batch("SAVEPOINT award_badge")?;
    match award_badge(conn, user_id, badge, trigger, now, notify) {
        Ok(awarded) => {
            conn.execute_batch("RELEASE award_badge")?;
            Ok(awarded)
        }
        Err(e) => {
            conn.execute_batch("ROLLBACK TO award_badge; RELEASE award_badge")?;
            Err(e)
        }
    }
}

/// Evaluates every badge the user has not earned yet and awards the ones
/// whose requirement holds. A failing award is rolled back, logged and skipped.
pub(crate) fn check_and_award_in(
    conn: &Connection,
    user_id: &str,
    trigger: BadgeTrigger,
    now: DateTime<Utc>,
    notify: NotifyMode,
) -> JournalResult<Vec<UserBadge>> {
    let stats = load_user_stats(conn, user_id, now)?;
    let ctx = BadgeContext {
        stats: &stats,
        registered_on: registered_on(conn, user_id)?,
    };
    let earned = earned_badge_ids(conn, user_id)?;

    let mut awarded = Vec::new();
    for badge in load_catalog(conn)? {
        if earned.contains(&badge.id) || !is_satisfied(&badge.requirement, &ctx) {
            continue;
        }
        match award_badge_atomically(conn, user_id, &badge, trigger, now, notify) {
            Ok(Some(user_badge)) => awarded.push(user_badge),
            Ok(None) => log::debug!("Badge {} already held by {}", badge.id, user_id),
            Err(e) => log::error!("Failed to award badge {} to {}: {}", badge.id, user_id, e),
        }
    }

    Ok(awarded)
}

pub fn get_badge_catalog(db: &Database) -> JournalResult<Vec<Badge>> {
    let conn = db.lock()?;
    load_catalog(&conn)
}

pub fn get_user_badges(db: &Database, user_id: &str) -> JournalResult<Vec<UserBadge>> {
    let conn = db.lock()?;
    let mut stmt = conn.prepare(
        "SELECT ub.user_id, ub.badge_id, ub.earned_at
         FROM user_badges ub JOIN badges b ON b.id = ub.badge_id
         WHERE ub.user_id = ? ORDER BY ub.earned_at, b.sort_order",
    )?;
    let badges = stmt
        .query_map([user_id], |row| {
            Ok(UserBadge {
                user_id: row.get(0)?,
                badge_id: row.get(1)?,
                earned_at: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(badges)
}

/// Standalone evaluation pass, e.g. after the catalog grew.
pub fn check_and_award(db: &Database, user_id: &str, trigger: BadgeTrigger) -> JournalResult<Vec<UserBadge>> {
    if user_id.trim().is_empty() {
        return Err(JournalError::validation("user id must not be empty"));
    }
    let mut conn = db.lock()?;
    let now = Utc::now();
    let tx = conn.transaction()?;

    ensure_user(&tx, user_id, now)?;
    let notify = NotifyMode::from_enabled(load_settings(&tx)?.notifications_enabled);
    let awarded = check_and_award_in(&tx, user_id, trigger, now, notify)?;

    tx.commit()?;
    Ok(awarded)
}
