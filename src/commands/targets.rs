use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::commands::badges::check_and_award_in;
use crate::commands::notifications::{push_notification, NotifyMode};
use crate::commands::settings::load_settings;
use crate::commands::stats::refresh_user_stats;
use crate::commands::summaries::load_summaries_between;
use crate::commands::users::ensure_user;
use crate::db::Database;
use crate::engine::target::{compute_progress, WindowTotals};
use crate::error::{JournalError, JournalResult};
use crate::models::{
    BadgeTrigger, CreateTargetInput, NewNotification, NotificationCategory, Target, TargetProgress, TargetState,
    TargetStatus, UpdateTargetInput,
};

const TARGET_COLUMNS: &str = "id, user_id, target_type, start_date, end_date, win_rate_threshold, sop_rate_threshold,
     profit_threshold, is_active, state, created_at, updated_at";

fn map_row_to_target(row: &rusqlite::Row) -> rusqlite::Result<Target> {
    Ok(Target {
        id: row.get(0)?,
        user_id: row.get(1)?,
        target_type: row.get(2)?,
        start_date: row.get(3)?,
        end_date: row.get(4)?,
        win_rate_threshold: row.get(5)?,
        sop_rate_threshold: row.get(6)?,
        profit_threshold: row.get(7)?,
        is_active: row.get::<_, i32>(8)? == 1,
        state: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn load_target(conn: &Connection, user_id: &str, id: &str) -> JournalResult<Target> {
    conn.query_row(
        &format!("SELECT {} FROM targets WHERE id = ? AND user_id = ?", TARGET_COLUMNS),
        params![id, user_id],
        map_row_to_target,
    )
    .optional()?
    .ok_or_else(|| JournalError::not_found("Target", id))
}

fn validate_rate(name: &str, value: f64) -> JournalResult<()> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(JournalError::validation(format!("{} must be between 0 and 100", name)));
    }
    Ok(())
}

fn validate_target(
    start: NaiveDate,
    end: NaiveDate,
    win_rate_threshold: f64,
    sop_rate_threshold: f64,
    profit_threshold: Option<f64>,
) -> JournalResult<()> {
    if start > end {
        return Err(JournalError::validation("target start date is after its end date"));
    }
    validate_rate("win_rate_threshold", win_rate_threshold)?;
    validate_rate("sop_rate_threshold", sop_rate_threshold)?;
    if profit_threshold.is_some_and(|p| !p.is_finite()) {
        return Err(JournalError::validation("profit_threshold must be a finite number"));
    }
    Ok(())
}

pub(crate) fn target_progress(conn: &Connection, target: &Target, today: NaiveDate) -> JournalResult<TargetProgress> {
    let summaries = load_summaries_between(conn, &target.user_id, Some(target.start_date), Some(target.end_date))?;
    let totals = WindowTotals::from_summaries(&summaries, target.start_date, target.end_date);
    Ok(compute_progress(target, &totals, today))
}

pub fn create_target(db: &Database, user_id: &str, target: CreateTargetInput) -> JournalResult<Target> {
    create_target_at(db, user_id, target, Utc::now())
}

pub(crate) fn create_target_at(
    db: &Database,
    user_id: &str,
    target: CreateTargetInput,
    now: DateTime<Utc>,
) -> JournalResult<Target> {
    let (default_start, default_end) = target.target_type.window_containing(now.date_naive());
    let start = target.start_date.unwrap_or(default_start);
    let end = target.end_date.unwrap_or(default_end);
    validate_target(
        start,
        end,
        target.win_rate_threshold,
        target.sop_rate_threshold,
        target.profit_threshold,
    )?;

    let mut conn = db.lock()?;
    let tx = conn.transaction()?;
    ensure_user(&tx, user_id, now)?;

    let id = format!("TARGET-{}-{}", now.timestamp_millis(), uuid::Uuid::new_v4());
    tx.execute(
        "INSERT INTO targets (
            id, user_id, target_type, start_date, end_date, win_rate_threshold, sop_rate_threshold,
            profit_threshold, is_active, state, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?)",
        params![
            id,
            user_id,
            target.target_type,
            start,
            end,
            target.win_rate_threshold,
            target.sop_rate_threshold,
            target.profit_threshold,
            TargetState::Active,
            now.timestamp(),
            now.timestamp()
        ],
    )?;

    let created = load_target(&tx, user_id, &id)?;
    tx.commit()?;

    log::info!(
        "Target {} created for {} ({} {} to {})",
        created.id,
        user_id,
        created.target_type.as_str(),
        created.start_date,
        created.end_date
    );

    Ok(created)
}

/// Only active targets can be edited; settled ones are history.
pub fn update_target(db: &Database, user_id: &str, id: &str, update: UpdateTargetInput) -> JournalResult<Target> {
    let conn = db.lock()?;
    let current = load_target(&conn, user_id, id)?;
    if current.state != TargetState::Active {
        return Err(JournalError::validation(format!(
            "target {} is {} and can no longer be edited",
            id,
            current.state.as_str()
        )));
    }

    let start = update.start_date.unwrap_or(current.start_date);
    let end = update.end_date.unwrap_or(current.end_date);
    let win_rate_threshold = update.win_rate_threshold.unwrap_or(current.win_rate_threshold);
    let sop_rate_threshold = update.sop_rate_threshold.unwrap_or(current.sop_rate_threshold);
    let profit_threshold = if update.clear_profit_threshold {
        None
    } else {
        update.profit_threshold.or(current.profit_threshold)
    };
    validate_target(start, end, win_rate_threshold, sop_rate_threshold, profit_threshold)?;

    conn.execute(
        "UPDATE targets SET start_date = ?, end_date = ?, win_rate_threshold = ?, sop_rate_threshold = ?,
            profit_threshold = ?, updated_at = ?
         WHERE id = ? AND user_id = ?",
        params![
            start,
            end,
            win_rate_threshold,
            sop_rate_threshold,
            profit_threshold,
            Utc::now().timestamp(),
            id,
            user_id
        ],
    )?;

    load_target(&conn, user_id, id)
}

pub fn deactivate_target(db: &Database, user_id: &str, id: &str) -> JournalResult<Target> {
    let conn = db.lock()?;
    let current = load_target(&conn, user_id, id)?;
    if current.state == TargetState::Active {
        conn.execute(
            "UPDATE targets SET is_active = 0, state = ?, updated_at = ? WHERE id = ? AND user_id = ?",
            params![TargetState::Deactivated, Utc::now().timestamp(), id, user_id],
        )?;
        log::info!("Target {} deactivated", id);
    }
    load_target(&conn, user_id, id)
}

pub fn get_targets(db: &Database, user_id: &str, active_only: bool) -> JournalResult<Vec<Target>> {
    let conn = db.lock()?;
    let query = if active_only {
        format!(
            "SELECT {} FROM targets WHERE user_id = ? AND is_active = 1 ORDER BY start_date DESC, id",
            TARGET_COLUMNS
        )
    } else {
        format!(
            "SELECT {} FROM targets WHERE user_id = ? ORDER BY start_date DESC, id",
            TARGET_COLUMNS
        )
    };
    let mut stmt = conn.prepare(&query)?;
    let targets = stmt
        .query_map([user_id], map_row_to_target)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(targets)
}

pub fn get_target_progress(db: &Database, user_id: &str, id: &str) -> JournalResult<TargetProgress> {
    let conn = db.lock()?;
    let target = load_target(&conn, user_id, id)?;
    target_progress(&conn, &target, Utc::now().date_naive())
}

fn settlement_notification(target: &Target, state: TargetState, progress: &TargetProgress) -> NewNotification {
    let (title, message) = if state == TargetState::Completed {
        (
            "Target completed".to_string(),
            format!(
                "You hit your {} target for {} to {}.",
                target.target_type.as_str().to_lowercase(),
                target.start_date,
                target.end_date
            ),
        )
    } else {
        (
            "Target missed".to_string(),
            format!(
                "Your {} target for {} to {} closed at {:.1}% wins and {:.1}% SOP.",
                target.target_type.as_str().to_lowercase(),
                target.start_date,
                target.end_date,
                progress.current_win_rate,
                progress.current_sop_rate
            ),
        )
    };

    NewNotification {
        user_id: target.user_id.clone(),
        title,
        message,
        category: NotificationCategory::Target,
        metadata: serde_json::json!({
            "target_id": target.id,
            "state": state.as_str(),
            "win_rate": progress.current_win_rate,
            "sop_rate": progress.current_sop_rate,
            "profit": progress.current_profit,
        }),
    }
}

/// Moves active targets whose window ended before `now` to COMPLETED or
/// FAILED. A completion refreshes stats and re-runs badge evaluation.
pub(crate) fn settle_expired_targets_in(
    conn: &Connection,
    user_id: &str,
    now: DateTime<Utc>,
    notify: NotifyMode,
) -> JournalResult<Vec<Target>> {
    let today = now.date_naive();
    let expired = {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM targets WHERE user_id = ? AND state = 'ACTIVE' AND end_date < ? ORDER BY end_date, id",
            TARGET_COLUMNS
        ))?;
        stmt.query_map(params![user_id, today], map_row_to_target)?
            .collect::<Result<Vec<_>, _>>()?
    };

    let mut settled = Vec::with_capacity(expired.len());
    let mut any_completed = false;
    for target in expired {
        let progress = target_progress(conn, &target, today)?;
        let state = match progress.status {
            TargetStatus::Completed => TargetState::Completed,
            _ => TargetState::Failed,
        };
        any_completed |= state == TargetState::Completed;

        conn.execute(
            "UPDATE targets SET state = ?, is_active = 0, updated_at = ? WHERE id = ?",
            params![state, now.timestamp(), target.id],
        )?;
        push_notification(conn, settlement_notification(&target, state, &progress), now, notify)?;
        log::info!("Target {} of {} settled as {}", target.id, user_id, state.as_str());

        settled.push(load_target(conn, user_id, &target.id)?);
    }

    if any_completed {
        refresh_user_stats(conn, user_id, now)?;
        check_and_award_in(conn, user_id, BadgeTrigger::TargetCompleted, now, notify)?;
    }

    Ok(settled)
}

pub fn settle_expired_targets(db: &Database, user_id: &str) -> JournalResult<Vec<Target>> {
    let mut conn = db.lock()?;
    let now = Utc::now();
    let tx = conn.transaction()?;
    let notify = NotifyMode::from_enabled(load_settings(&tx)?.notifications_enabled);
    let settled = settle_expired_targets_in(&tx, user_id, now, notify)?;
    tx.commit()?;
    Ok(settled)
}
