use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::commands::streaks::load_streak;
use crate::commands::summaries::load_summaries;
use crate::commands::users::registered_on;
use crate::db::Database;
use crate::engine::stats::{project_user_stats, StatsInputs};
use crate::error::JournalResult;
use crate::models::{EquityCurvePoint, StreakType, UserStats};

/// Helper function to map a database row to a UserStats struct
fn map_row_to_user_stats(row: &rusqlite::Row) -> rusqlite::Result<UserStats> {
    Ok(UserStats {
        user_id: row.get(0)?,
        total_trades: row.get(1)?,
        total_wins: row.get(2)?,
        total_losses: row.get(3)?,
        sop_followed: row.get(4)?,
        total_profit: row.get(5)?,
        win_rate: row.get(6)?,
        sop_compliance_rate: row.get(7)?,
        current_win_streak: row.get(8)?,
        longest_win_streak: row.get(9)?,
        current_log_streak: row.get(10)?,
        longest_log_streak: row.get(11)?,
        current_sop_streak: row.get(12)?,
        longest_sop_streak: row.get(13)?,
        asia_trades: row.get(14)?,
        europe_trades: row.get(15)?,
        us_trades: row.get(16)?,
        overlap_trades: row.get(17)?,
        total_badges: row.get(18)?,
        total_points: row.get(19)?,
        first_trade_date: row.get(20)?,
        last_trade_date: row.get(21)?,
        max_trades_in_day: row.get(22)?,
        total_logging_days: row.get(23)?,
        has_completed_target: row.get::<_, i32>(24)? == 1,
        has_perfect_month: row.get::<_, i32>(25)? == 1,
        updated_at: row.get(26)?,
    })
}

fn stats_inputs(conn: &Connection, user_id: &str) -> JournalResult<StatsInputs> {
    let mut inputs = StatsInputs::default();
    for streak_type in StreakType::ALL {
        if let Some(state) = load_streak(conn, user_id, streak_type)? {
            inputs.set_streak(streak_type, state);
        }
    }

    let (total_badges, total_points): (u32, u32) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(b.points), 0)
         FROM user_badges ub JOIN badges b ON b.id = ub.badge_id
         WHERE ub.user_id = ?",
        [user_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    inputs.total_badges = total_badges;
    inputs.total_points = total_points;

    inputs.has_completed_target = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM targets WHERE user_id = ? AND state = 'COMPLETED')",
        [user_id],
        |row| row.get(0),
    )?;

    Ok(inputs)
}

fn save_user_stats(conn: &Connection, stats: &UserStats) -> JournalResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO user_stats (
            user_id, total_trades, total_wins, total_losses, sop_followed, total_profit,
            win_rate, sop_compliance_rate,
            current_win_streak, longest_win_streak, current_log_streak, longest_log_streak,
            current_sop_streak, longest_sop_streak,
            asia_trades, europe_trades, us_trades, overlap_trades,
            total_badges, total_points, first_trade_date, last_trade_date,
            max_trades_in_day, total_logging_days, has_completed_target, has_perfect_month, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            stats.user_id,
            stats.total_trades,
            stats.total_wins,
            stats.total_losses,
            stats.sop_followed,
            stats.total_profit,
            stats.win_rate,
            stats.sop_compliance_rate,
            stats.current_win_streak,
            stats.longest_win_streak,
            stats.current_log_streak,
            stats.longest_log_streak,
            stats.current_sop_streak,
            stats.longest_sop_streak,
            stats.asia_trades,
            stats.europe_trades,
            stats.us_trades,
            stats.overlap_trades,
            stats.total_badges,
            stats.total_points,
            stats.first_trade_date,
            stats.last_trade_date,
            stats.max_trades_in_day,
            stats.total_logging_days,
            stats.has_completed_target as i32,
            stats.has_perfect_month as i32,
            stats.updated_at
        ],
    )?;
    Ok(())
}

/// Re-derives the whole stats row from summaries, streaks, earned badges and targets.
pub(crate) fn refresh_user_stats(conn: &Connection, user_id: &str, now: DateTime<Utc>) -> JournalResult<UserStats> {
    let summaries = load_summaries(conn, user_id)?;
    let inputs = stats_inputs(conn, user_id)?;
    let stats = project_user_stats(user_id, &summaries, &inputs, now.date_naive(), now.timestamp());
    save_user_stats(conn, &stats)?;
    Ok(stats)
}

/// Reads the stats row, building it first when it does not exist yet.
pub(crate) fn load_user_stats(conn: &Connection, user_id: &str, now: DateTime<Utc>) -> JournalResult<UserStats> {
    let stored = conn
        .query_row(
            "SELECT user_id, total_trades, total_wins, total_losses, sop_followed, total_profit,
                    win_rate, sop_compliance_rate,
                    current_win_streak, longest_win_streak, current_log_streak, longest_log_streak,
                    current_sop_streak, longest_sop_streak,
                    asia_trades, europe_trades, us_trades, overlap_trades,
                    total_badges, total_points, first_trade_date, last_trade_date,
                    max_trades_in_day, total_logging_days, has_completed_target, has_perfect_month, updated_at
             FROM user_stats WHERE user_id = ?",
            [user_id],
            map_row_to_user_stats,
        )
        .optional()?;

    match stored {
        Some(stats) => Ok(stats),
        None => {
            log::debug!("Initializing stats for {}", user_id);
            refresh_user_stats(conn, user_id, now)
        }
    }
}

/// Counts a freshly inserted badge without re-deriving the rest of the row.
pub(crate) fn add_badge_to_stats(conn: &Connection, user_id: &str, points: u32, now: DateTime<Utc>) -> JournalResult<()> {
    conn.execute(
        "UPDATE user_stats SET total_badges = total_badges + 1, total_points = total_points + ?, updated_at = ?
         WHERE user_id = ?",
        params![points, now.timestamp(), user_id],
    )?;
    Ok(())
}

/// Unknown users get an all-zero ledger without anything being written.
pub fn get_user_stats(db: &Database, user_id: &str) -> JournalResult<UserStats> {
    let conn = db.lock()?;
    let now = Utc::now();
    if registered_on(&conn, user_id)?.is_none() {
        return Ok(UserStats::empty(user_id, now.timestamp()));
    }
    load_user_stats(&conn, user_id, now)
}

pub fn get_equity_curve(db: &Database, user_id: &str) -> JournalResult<Vec<EquityCurvePoint>> {
    let conn = db.lock()?;
    let summaries = load_summaries(&conn, user_id)?;

    let mut cumulative_pnl = 0.0;
    let mut result: Vec<EquityCurvePoint> = Vec::new();

    for day in summaries.iter().filter(|s| s.has_trades()) {
        cumulative_pnl += day.net_pnl;
        result.push(EquityCurvePoint {
            date: day.date.format("%Y-%m-%d").to_string(),
            cumulative_pnl,
            daily_pnl: day.net_pnl,
            trade_count: day.total_trades,
        });
    }

    Ok(result)
}
