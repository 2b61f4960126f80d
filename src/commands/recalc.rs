use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::commands::badges::check_and_award_in;
use crate::commands::notifications::NotifyMode;
use crate::commands::pipeline::settle_derived_state;
use crate::commands::stats::refresh_user_stats;
use crate::commands::streaks::{rebuild_streak, save_streak};
use crate::commands::summaries::{load_summary, recompute_daily_summary};
use crate::commands::trades::load_all_trades;
use crate::commands::users::{list_user_ids, registered_on};
use crate::db::Database;
use crate::error::{JournalError, JournalResult};
use crate::models::{BadgeTrigger, StreakType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecalcReport {
    pub user_id: String,
    pub trades_replayed: usize,
    pub days: usize,
    pub badges_awarded: usize,
}

/// Wipes the user's derived rows and replays every trade, oldest first, as
/// if it had just been logged. Earned badges survive; notifications stay quiet.
pub(crate) fn recalculate_user_in(conn: &Connection, user_id: &str, now: DateTime<Utc>) -> JournalResult<RecalcReport> {
    // Days whose trades were all deleted keep their zeroed row
    let known_days: Vec<NaiveDate> = {
        let mut stmt = conn.prepare("SELECT date FROM daily_summaries WHERE user_id = ? ORDER BY date")?;
        stmt.query_map([user_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?
    };

    conn.execute("DELETE FROM daily_summaries WHERE user_id = ?", [user_id])?;
    conn.execute("DELETE FROM streaks WHERE user_id = ?", [user_id])?;
    conn.execute("DELETE FROM user_stats WHERE user_id = ?", [user_id])?;

    let trades = load_all_trades(conn, user_id)?;
    for trade in &trades {
        settle_derived_state(conn, user_id, None, Some(trade), now, NotifyMode::Silent)?;
    }

    for date in &known_days {
        if load_summary(conn, user_id, *date)?.is_none() {
            recompute_daily_summary(conn, user_id, *date, now)?;
        }
    }

    // A user without trades still ends up with zeroed streak rows
    for streak_type in StreakType::ALL {
        let state = rebuild_streak(conn, user_id, streak_type, now.date_naive())?;
        save_streak(conn, user_id, streak_type, &state, now)?;
    }

    refresh_user_stats(conn, user_id, now)?;
    // Badges only see the final state, never a replayed prefix
    let badges_awarded = check_and_award_in(conn, user_id, BadgeTrigger::Recalculation, now, NotifyMode::Silent)?.len();

    let days: i64 = conn.query_row(
        "SELECT COUNT(*) FROM daily_summaries WHERE user_id = ?",
        [user_id],
        |row| row.get(0),
    )?;
    let days = days as usize;

    log::info!(
        "Recalculated {}: {} trades replayed, {} days, {} badges awarded",
        user_id,
        trades.len(),
        days,
        badges_awarded
    );

    Ok(RecalcReport {
        user_id: user_id.to_string(),
        trades_replayed: trades.len(),
        days,
        badges_awarded,
    })
}

pub fn recalculate_user(db: &Database, user_id: &str) -> JournalResult<RecalcReport> {
    recalculate_user_at(db, user_id, Utc::now())
}

pub(crate) fn recalculate_user_at(db: &Database, user_id: &str, now: DateTime<Utc>) -> JournalResult<RecalcReport> {
    let mut conn = db.lock()?;
    if registered_on(&conn, user_id)?.is_none() {
        return Err(JournalError::not_found("User", user_id));
    }

    let tx = conn.transaction()?;
    let report = recalculate_user_in(&tx, user_id, now)?;
    tx.commit()?;
    Ok(report)
}

/// One transaction per user, run one after another.
pub fn recalculate_all(db: &Database) -> JournalResult<Vec<RecalcReport>> {
    let user_ids = {
        let conn = db.lock()?;
        list_user_ids(&conn)?
    };

    log::info!("Recalculating {} users", user_ids.len());

    let now = Utc::now();
    let mut reports = Vec::with_capacity(user_ids.len());
    for user_id in user_ids {
        reports.push(recalculate_user_at(db, &user_id, now)?);
    }
    Ok(reports)
}
