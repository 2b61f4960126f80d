use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::commands::notifications::{push_notification, NotifyMode};
use crate::commands::summaries::{load_summaries, load_summary};
use crate::commands::trades::load_sop_history;
use crate::db::Database;
use crate::engine::streak::{crossed_checkpoints, fold_log_days, fold_sop_trades, fold_win_days};
use crate::error::JournalResult;
use crate::models::{utc_date, NewNotification, NotificationCategory, Streak, StreakState, StreakType, Trade};

pub(crate) fn load_streak(
    conn: &Connection,
    user_id: &str,
    streak_type: StreakType,
) -> JournalResult<Option<StreakState>> {
    let state = conn
        .query_row(
            "SELECT current_count, longest_count, last_date, started_on, last_trade_at, last_trade_id
             FROM streaks WHERE user_id = ? AND streak_type = ?",
            params![user_id, streak_type],
            |row| {
                Ok(StreakState {
                    current: row.get(0)?,
                    longest: row.get(1)?,
                    last_date: row.get(2)?,
                    started_on: row.get(3)?,
                    last_trade_at: row.get(4)?,
                    last_trade_id: row.get(5)?,
                })
            },
        )
        .optional()?;
    Ok(state)
}

fn mirrored_columns(streak_type: StreakType) -> (&'static str, &'static str) {
    match streak_type {
        StreakType::WinStreak => ("current_win_streak", "longest_win_streak"),
        StreakType::LogStreak => ("current_log_streak", "longest_log_streak"),
        StreakType::SopStreak => ("current_sop_streak", "longest_sop_streak"),
    }
}

/// Upserts the streak row and writes it through to the user's stats row.
pub(crate) fn save_streak(
    conn: &Connection,
    user_id: &str,
    streak_type: StreakType,
    state: &StreakState,
    now: DateTime<Utc>,
) -> JournalResult<()> {
    conn.execute(
        "INSERT INTO streaks (
            user_id, streak_type, current_count, longest_count, last_date, started_on,
            last_trade_at, last_trade_id, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(user_id, streak_type) DO UPDATE SET
            current_count = ?3, longest_count = ?4, last_date = ?5, started_on = ?6,
            last_trade_at = ?7, last_trade_id = ?8, updated_at = ?9",
        params![
            user_id,
            streak_type,
            state.current,
            state.longest,
            state.last_date,
            state.started_on,
            state.last_trade_at,
            state.last_trade_id,
            now.timestamp()
        ],
    )?;

    let (current_col, longest_col) = mirrored_columns(streak_type);
    conn.execute(
        &format!(
            "UPDATE user_stats SET {} = ?, {} = ?, updated_at = ? WHERE user_id = ?",
            current_col, longest_col
        ),
        params![state.current, state.longest, now.timestamp(), user_id],
    )?;

    Ok(())
}

/// Folds the streak's state machine over everything stored for the user.
pub(crate) fn rebuild_streak(
    conn: &Connection,
    user_id: &str,
    streak_type: StreakType,
    today: NaiveDate,
) -> JournalResult<StreakState> {
    let state = match streak_type {
        StreakType::WinStreak => {
            let days = load_summaries(conn, user_id)?;
            fold_win_days(
                days.iter()
                    .filter(|d| d.has_trades())
                    .map(|d| (d.date, d.is_win_day())),
            )
        }
        StreakType::LogStreak => {
            let days = load_summaries(conn, user_id)?;
            fold_log_days(
                days.iter().filter(|d| d.has_trades()).map(|d| d.date),
                today,
            )
        }
        StreakType::SopStreak => {
            let history = load_sop_history(conn, user_id)?;
            fold_sop_trades(
                history
                    .iter()
                    .map(|(id, at, followed)| (id.as_str(), *at, utc_date(*at), *followed)),
            )
        }
    };

    log::debug!(
        "Rebuilt {} for {}: current {}, longest {}",
        streak_type.as_str(),
        user_id,
        state.current,
        state.longest
    );

    Ok(state)
}

/// Applies a freshly created trade as a single step. Returns false when the
/// event does not extend the stored history and a rebuild is needed.
fn step_created(
    conn: &Connection,
    state: &mut StreakState,
    streak_type: StreakType,
    trade: &Trade,
    today: NaiveDate,
) -> JournalResult<bool> {
    let date = trade.trade_date();
    match streak_type {
        StreakType::WinStreak => {
            if !state.extends_days(streak_type, date) {
                return Ok(false);
            }
            let win_day = load_summary(conn, &trade.user_id, date)?.is_some_and(|s| s.is_win_day());
            state.apply_win_day(date, win_day);
        }
        StreakType::LogStreak => {
            if !state.extends_days(streak_type, date) {
                return Ok(false);
            }
            state.apply_log_day(date);
            state.expire_log(today);
        }
        StreakType::SopStreak => {
            if !state.extends_trades(trade.traded_at, &trade.id) {
                return Ok(false);
            }
            state.apply_sop_trade(&trade.id, trade.traded_at, date, trade.sop_followed);
        }
    }
    Ok(true)
}

fn milestone_notification(user_id: &str, streak_type: StreakType, count: u32) -> NewNotification {
    let (title, message) = match streak_type {
        StreakType::WinStreak => (
            format!("{}-day win streak", count),
            format!("You closed {} winning days in a row.", count),
        ),
        StreakType::LogStreak => (
            format!("{}-day logging streak", count),
            format!("You logged trades {} days in a row.", count),
        ),
        StreakType::SopStreak => (
            format!("{} trades by the book", count),
            format!("You followed your SOP on {} trades in a row.", count),
        ),
    };

    NewNotification {
        user_id: user_id.to_string(),
        title,
        message,
        category: NotificationCategory::Streak,
        metadata: serde_json::json!({
            "streak_type": streak_type.as_str(),
            "count": count,
        }),
    }
}

/// Brings all three streaks up to date after a trade event. `before` is the
/// stored trade prior to the change, `after` the stored trade once applied.
pub(crate) fn refresh_streaks(
    conn: &Connection,
    user_id: &str,
    before: Option<&Trade>,
    after: Option<&Trade>,
    now: DateTime<Utc>,
    notify: NotifyMode,
) -> JournalResult<Vec<Streak>> {
    let today = now.date_naive();
    let created = match (before, after) {
        (None, Some(trade)) => Some(trade),
        _ => None,
    };

    let mut streaks = Vec::with_capacity(StreakType::ALL.len());
    for streak_type in StreakType::ALL {
        let stored = load_streak(conn, user_id, streak_type)?;
        let previous = stored.as_ref().map_or(0, |s| s.current);

        let state = match (created, stored) {
            (Some(trade), Some(mut state)) => {
                if step_created(conn, &mut state, streak_type, trade, today)? {
                    state
                } else {
                    rebuild_streak(conn, user_id, streak_type, today)?
                }
            }
            _ => rebuild_streak(conn, user_id, streak_type, today)?,
        };

        save_streak(conn, user_id, streak_type, &state, now)?;

        for checkpoint in crossed_checkpoints(streak_type, previous, state.current) {
            push_notification(conn, milestone_notification(user_id, streak_type, checkpoint), now, notify)?;
        }

        streaks.push(Streak {
            user_id: user_id.to_string(),
            streak_type,
            state,
        });
    }

    Ok(streaks)
}

/// Missed-day reset for the logging streak. Returns true when it broke.
pub(crate) fn expire_log_streak(conn: &Connection, user_id: &str, now: DateTime<Utc>) -> JournalResult<bool> {
    let Some(mut state) = load_streak(conn, user_id, StreakType::LogStreak)? else {
        return Ok(false);
    };
    if !state.expire_log(now.date_naive()) {
        return Ok(false);
    }

    save_streak(conn, user_id, StreakType::LogStreak, &state, now)?;
    log::info!("Log streak of {} reset after a missed day", user_id);
    Ok(true)
}

pub fn get_streaks(db: &Database, user_id: &str) -> JournalResult<Vec<Streak>> {
    let conn = db.lock()?;
    StreakType::ALL
        .into_iter()
        .map(|streak_type| {
            Ok(Streak {
                user_id: user_id.to_string(),
                streak_type,
                state: load_streak(&conn, user_id, streak_type)?.unwrap_or_default(),
            })
        })
        .collect()
}
