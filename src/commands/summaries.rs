use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::commands::trades::trades_on_day;
use crate::db::Database;
use crate::engine::summary::summarize;
use crate::error::JournalResult;
use crate::models::DailySummary;

const SUMMARY_COLUMNS: &str = "user_id, date, total_trades, wins, losses, sop_followed, sop_not_followed, net_pnl,
     asia_trades, asia_wins, europe_trades, europe_wins, us_trades, us_wins, overlap_trades, overlap_wins,
     best_session";

fn map_row_to_summary(row: &rusqlite::Row) -> rusqlite::Result<DailySummary> {
    Ok(DailySummary {
        user_id: row.get(0)?,
        date: row.get(1)?,
        total_trades: row.get(2)?,
        wins: row.get(3)?,
        losses: row.get(4)?,
        sop_followed: row.get(5)?,
        sop_not_followed: row.get(6)?,
        net_pnl: row.get(7)?,
        asia_trades: row.get(8)?,
        asia_wins: row.get(9)?,
        europe_trades: row.get(10)?,
        europe_wins: row.get(11)?,
        us_trades: row.get(12)?,
        us_wins: row.get(13)?,
        overlap_trades: row.get(14)?,
        overlap_wins: row.get(15)?,
        best_session: row.get(16)?,
    })
}

pub(crate) fn load_summary(conn: &Connection, user_id: &str, date: NaiveDate) -> JournalResult<Option<DailySummary>> {
    let summary = conn
        .query_row(
            &format!("SELECT {} FROM daily_summaries WHERE user_id = ? AND date = ?", SUMMARY_COLUMNS),
            params![user_id, date],
            map_row_to_summary,
        )
        .optional()?;
    Ok(summary)
}

/// Every stored day of the user in date order, zeroed days included.
pub(crate) fn load_summaries(conn: &Connection, user_id: &str) -> JournalResult<Vec<DailySummary>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM daily_summaries WHERE user_id = ? ORDER BY date ASC",
        SUMMARY_COLUMNS
    ))?;
    let summaries = stmt
        .query_map([user_id], map_row_to_summary)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(summaries)
}

/// Days within an optional inclusive range, in date order.
pub(crate) fn load_summaries_between(
    conn: &Connection,
    user_id: &str,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> JournalResult<Vec<DailySummary>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM daily_summaries
         WHERE user_id = ?1 AND (?2 IS NULL OR date >= ?2) AND (?3 IS NULL OR date <= ?3)
         ORDER BY date ASC",
        SUMMARY_COLUMNS
    ))?;
    let summaries = stmt
        .query_map(params![user_id, from, to], map_row_to_summary)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(summaries)
}

fn upsert_summary(conn: &Connection, summary: &DailySummary, now: DateTime<Utc>) -> JournalResult<()> {
    conn.execute(
        "INSERT INTO daily_summaries (
            user_id, date, total_trades, wins, losses, sop_followed, sop_not_followed, net_pnl,
            asia_trades, asia_wins, europe_trades, europe_wins, us_trades, us_wins, overlap_trades, overlap_wins,
            best_session, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
        ON CONFLICT(user_id, date) DO UPDATE SET
            total_trades = ?3, wins = ?4, losses = ?5, sop_followed = ?6, sop_not_followed = ?7, net_pnl = ?8,
            asia_trades = ?9, asia_wins = ?10, europe_trades = ?11, europe_wins = ?12,
            us_trades = ?13, us_wins = ?14, overlap_trades = ?15, overlap_wins = ?16,
            best_session = ?17, updated_at = ?18",
        params![
            summary.user_id,
            summary.date,
            summary.total_trades,
            summary.wins,
            summary.losses,
            summary.sop_followed,
            summary.sop_not_followed,
            summary.net_pnl,
            summary.asia_trades,
            summary.asia_wins,
            summary.europe_trades,
            summary.europe_wins,
            summary.us_trades,
            summary.us_wins,
            summary.overlap_trades,
            summary.overlap_wins,
            summary.best_session,
            now.timestamp()
        ],
    )?;
    Ok(())
}

/// Rebuilds one (user, day) row from that day's trades. A day with no trades
/// left keeps a zeroed row.
pub(crate) fn recompute_daily_summary(
    conn: &Connection,
    user_id: &str,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> JournalResult<DailySummary> {
    let trades = trades_on_day(conn, user_id, date)?;
    let summary = summarize(user_id, date, &trades);
    upsert_summary(conn, &summary, now)?;

    log::debug!(
        "Recomputed summary {} {}: {} trades, net {:.2}",
        user_id,
        date,
        summary.total_trades,
        summary.net_pnl
    );

    Ok(summary)
}

pub fn get_daily_summaries(
    db: &Database,
    user_id: &str,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> JournalResult<Vec<DailySummary>> {
    let conn = db.lock()?;
    load_summaries_between(&conn, user_id, from, to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::trades::create_trade_at;
    use crate::models::{CreateTradeInput, MarketSession, TradeResult};
    use chrono::TimeZone;

    fn input(traded_at: i64, pnl: f64, sop: bool) -> CreateTradeInput {
        CreateTradeInput {
            traded_at,
            result: if pnl > 0.0 { TradeResult::Win } else { TradeResult::Loss },
            sop_followed: sop,
            profit_loss: pnl,
            note: None,
            symbol: None,
        }
    }

    fn at(d: u32, h: u32) -> i64 {
        Utc.with_ymd_and_hms(2025, 3, d, h, 0, 0).unwrap().timestamp()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 20, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_stored_summary_matches_trades() {
        let db = Database::in_memory().unwrap();
        create_trade_at(&db, "u1", input(at(3, 2), 100.0, true), now()).unwrap();
        create_trade_at(&db, "u1", input(at(3, 14), -40.0, false), now()).unwrap();
        create_trade_at(&db, "u1", input(at(4, 10), 25.0, true), now()).unwrap();

        let summaries = get_daily_summaries(&db, "u1", None, None).unwrap();
        assert_eq!(summaries.len(), 2);

        let first = &summaries[0];
        assert_eq!(first.total_trades, 2);
        assert_eq!((first.wins, first.losses), (1, 1));
        assert_eq!((first.sop_followed, first.sop_not_followed), (1, 1));
        assert!((first.net_pnl - 60.0).abs() < 1e-9);
        assert_eq!((first.asia_trades, first.overlap_trades), (1, 1));
        assert_eq!(first.best_session, Some(MarketSession::Asia));

        let conn = db.lock().unwrap();
        let recomputed = summarize("u1", first.date, &trades_on_day(&conn, "u1", first.date).unwrap());
        assert_eq!(&recomputed, first);
    }

    #[test]
    fn test_date_range_filter() {
        let db = Database::in_memory().unwrap();
        for d in [3, 4, 5] {
            create_trade_at(&db, "u1", input(at(d, 9), 10.0, true), now()).unwrap();
        }
        let day = |d| NaiveDate::from_ymd_opt(2025, 3, d).unwrap();

        let ranged = get_daily_summaries(&db, "u1", Some(day(4)), None).unwrap();
        assert_eq!(ranged.len(), 2);
        let ranged = get_daily_summaries(&db, "u1", Some(day(4)), Some(day(4))).unwrap();
        assert_eq!(ranged.len(), 1);
        assert!(get_daily_summaries(&db, "u2", None, None).unwrap().is_empty());
    }
}
