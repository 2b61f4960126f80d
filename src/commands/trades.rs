use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::commands::notifications::NotifyMode;
use crate::commands::pipeline::{settle_trade_event, Settlement};
use crate::commands::settings::load_settings;
use crate::commands::users::ensure_user;
use crate::db::Database;
use crate::engine::{classify_timestamp, day_bounds};
use crate::error::{JournalError, JournalResult};
use crate::models::{CreateTradeInput, Trade, TradeFilters, UpdateTradeInput};

const TRADE_COLUMNS: &str =
    "id, user_id, traded_at, result, sop_followed, profit_loss, session, note, symbol, created_at, updated_at";

// Exchange tickers and pairs: BTCUSDT, ES1!, EUR/USD, BTC-PERP
const SYMBOL_PATTERN: &str = r"^[A-Z0-9][A-Z0-9./:!_-]{0,31}$";

/// A trade write together with the derived state it settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeMutation {
    pub trade: Trade,
    pub settlement: Settlement,
}

/// Helper function to map a database row to a Trade struct
fn map_row_to_trade(row: &rusqlite::Row) -> rusqlite::Result<Trade> {
    Ok(Trade {
        id: row.get(0)?,
        user_id: row.get(1)?,
        traded_at: row.get(2)?,
        result: row.get(3)?,
        sop_followed: row.get::<_, i32>(4)? == 1,
        profit_loss: row.get(5)?,
        session: row.get(6)?,
        note: row.get(7)?,
        symbol: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// Trades owned by another user are reported as missing.
pub(crate) fn load_trade(conn: &Connection, user_id: &str, id: &str) -> JournalResult<Trade> {
    conn.query_row(
        &format!("SELECT {} FROM trades WHERE id = ? AND user_id = ?", TRADE_COLUMNS),
        params![id, user_id],
        map_row_to_trade,
    )
    .optional()?
    .ok_or_else(|| JournalError::not_found("Trade", id))
}

/// One UTC day of the user's trades, in chronological order.
pub(crate) fn trades_on_day(conn: &Connection, user_id: &str, date: NaiveDate) -> JournalResult<Vec<Trade>> {
    let (start, end) = day_bounds(date);
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM trades WHERE user_id = ? AND traded_at >= ? AND traded_at < ?
         ORDER BY traded_at ASC, id ASC",
        TRADE_COLUMNS
    ))?;
    let trades = stmt
        .query_map(params![user_id, start, end], map_row_to_trade)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(trades)
}

pub(crate) fn load_all_trades(conn: &Connection, user_id: &str) -> JournalResult<Vec<Trade>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM trades WHERE user_id = ? ORDER BY traded_at ASC, id ASC",
        TRADE_COLUMNS
    ))?;
    let trades = stmt
        .query_map([user_id], map_row_to_trade)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(trades)
}

/// `(id, traded_at, sop_followed)` in SOP streak order.
pub(crate) fn load_sop_history(conn: &Connection, user_id: &str) -> JournalResult<Vec<(String, i64, bool)>> {
    let mut stmt = conn.prepare(
        "SELECT id, traded_at, sop_followed FROM trades WHERE user_id = ? ORDER BY traded_at ASC, id ASC",
    )?;
    let history = stmt
        .query_map([user_id], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get::<_, i32>(2)? == 1))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(history)
}

fn validate_profit_loss(profit_loss: f64) -> JournalResult<()> {
    if !profit_loss.is_finite() {
        return Err(JournalError::validation("profit_loss must be a finite number"));
    }
    if profit_loss == 0.0 {
        return Err(JournalError::validation("profit_loss must not be zero"));
    }
    Ok(())
}

fn validate_traded_at(traded_at: i64, now: DateTime<Utc>) -> JournalResult<()> {
    if DateTime::from_timestamp(traded_at, 0).is_none() {
        return Err(JournalError::validation(format!("invalid timestamp: {}", traded_at)));
    }
    if traded_at > now.timestamp() {
        return Err(JournalError::validation("trades cannot be dated in the future"));
    }
    Ok(())
}

/// Blank notes are dropped; length counts characters.
fn normalize_note(note: Option<String>, max_length: u32) -> JournalResult<Option<String>> {
    let Some(note) = note else {
        return Ok(None);
    };
    let note = note.trim();
    if note.is_empty() {
        return Ok(None);
    }
    let length = note.chars().count();
    if length > max_length as usize {
        return Err(JournalError::validation(format!(
            "note is {} characters, the limit is {}",
            length, max_length
        )));
    }
    Ok(Some(note.to_string()))
}

fn normalize_symbol(symbol: Option<String>) -> JournalResult<Option<String>> {
    let Some(symbol) = symbol else {
        return Ok(None);
    };
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Ok(None);
    }
    let re = regex::Regex::new(SYMBOL_PATTERN).map_err(|e| JournalError::ParseError(e.to_string()))?;
    if !re.is_match(&symbol) {
        return Err(JournalError::validation(format!("malformed symbol: {}", symbol)));
    }
    Ok(Some(symbol))
}

fn notify_mode(conn: &Connection) -> JournalResult<NotifyMode> {
    Ok(NotifyMode::from_enabled(load_settings(conn)?.notifications_enabled))
}

pub fn get_trades(db: &Database, user_id: &str, filters: Option<TradeFilters>) -> JournalResult<Vec<Trade>> {
    let conn = db.lock()?;

    let mut query = format!("SELECT {} FROM trades WHERE user_id = ?", TRADE_COLUMNS);
    let mut conditions = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id.to_string())];

    if let Some(f) = &filters {
        if let Some(result) = f.result {
            conditions.push("result = ?");
            params.push(Box::new(result));
        }
        if let Some(symbol) = &f.symbol {
            conditions.push("symbol LIKE ?");
            params.push(Box::new(format!("%{}%", symbol.trim().to_uppercase())));
        }
        if let Some(start_date) = f.start_date {
            conditions.push("traded_at >= ?");
            params.push(Box::new(start_date));
        }
        if let Some(end_date) = f.end_date {
            conditions.push("traded_at <= ?");
            params.push(Box::new(end_date));
        }
    }

    if !conditions.is_empty() {
        query.push_str(&format!(" AND {}", conditions.join(" AND ")));
    }

    query.push_str(" ORDER BY traded_at DESC, id DESC");

    if let Some(f) = &filters {
        if let (Some(page), Some(limit)) = (f.page, f.limit) {
            if page < 1 || limit < 1 {
                return Err(JournalError::validation("page and limit start at 1"));
            }
            let offset = (i64::from(page) - 1) * i64::from(limit);
            query.push_str(" LIMIT ? OFFSET ?");
            params.push(Box::new(i64::from(limit)));
            params.push(Box::new(offset));
        }
    }

    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&query)?;
    let trades = stmt
        .query_map(param_refs.as_slice(), map_row_to_trade)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(trades)
}

pub fn get_trade(db: &Database, user_id: &str, id: &str) -> JournalResult<Trade> {
    let conn = db.lock()?;
    load_trade(&conn, user_id, id)
}

pub fn create_trade(db: &Database, user_id: &str, trade: CreateTradeInput) -> JournalResult<TradeMutation> {
    create_trade_at(db, user_id, trade, Utc::now())
}

pub(crate) fn create_trade_at(
    db: &Database,
    user_id: &str,
    trade: CreateTradeInput,
    now: DateTime<Utc>,
) -> JournalResult<TradeMutation> {
    let mut conn = db.lock()?;

    let settings = load_settings(&conn)?;
    validate_profit_loss(trade.profit_loss)?;
    validate_traded_at(trade.traded_at, now)?;
    let note = normalize_note(trade.note, settings.note_max_length)?;
    let symbol = normalize_symbol(trade.symbol)?;

    let tx = conn.transaction()?;
    ensure_user(&tx, user_id, now)?;

    let id = format!("TRADE-{}-{}", now.timestamp_millis(), uuid::Uuid::new_v4());
    let session = classify_timestamp(trade.traded_at);

    tx.execute(
        "INSERT INTO trades (
            id, user_id, traded_at, result, sop_followed, profit_loss, session, note, symbol, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            id,
            user_id,
            trade.traded_at,
            trade.result,
            trade.sop_followed as i32,
            trade.profit_loss,
            session,
            note,
            symbol,
            now.timestamp(),
            now.timestamp()
        ],
    )?;

    let stored = load_trade(&tx, user_id, &id)?;
    let settlement = settle_trade_event(&tx, user_id, None, Some(&stored), now, notify_mode(&tx)?)?;
    tx.commit()?;

    log::info!(
        "Trade {} created for {} ({} {} {:.2})",
        stored.id,
        user_id,
        stored.session.as_str(),
        stored.result.as_str(),
        stored.profit_loss
    );

    Ok(TradeMutation {
        trade: stored,
        settlement,
    })
}

pub fn update_trade(
    db: &Database,
    user_id: &str,
    id: &str,
    trade_update: UpdateTradeInput,
) -> JournalResult<TradeMutation> {
    update_trade_at(db, user_id, id, trade_update, Utc::now())
}

pub(crate) fn update_trade_at(
    db: &Database,
    user_id: &str,
    id: &str,
    trade_update: UpdateTradeInput,
    now: DateTime<Utc>,
) -> JournalResult<TradeMutation> {
    let mut conn = db.lock()?;

    let before = load_trade(&conn, user_id, id)?;
    let settings = load_settings(&conn)?;

    // Build dynamic UPDATE query based on provided fields
    let mut updates = vec!["updated_at = ?"];
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(now.timestamp())];

    if let Some(traded_at) = trade_update.traded_at {
        validate_traded_at(traded_at, now)?;
        updates.push("traded_at = ?");
        values.push(Box::new(traded_at));
        // Session always follows the timestamp
        updates.push("session = ?");
        values.push(Box::new(classify_timestamp(traded_at)));
    }
    if let Some(result) = trade_update.result {
        updates.push("result = ?");
        values.push(Box::new(result));
    }
    if let Some(sop_followed) = trade_update.sop_followed {
        updates.push("sop_followed = ?");
        values.push(Box::new(sop_followed as i32));
    }
    if let Some(profit_loss) = trade_update.profit_loss {
        validate_profit_loss(profit_loss)?;
        updates.push("profit_loss = ?");
        values.push(Box::new(profit_loss));
    }
    if trade_update.note.is_some() {
        updates.push("note = ?");
        values.push(Box::new(normalize_note(trade_update.note, settings.note_max_length)?));
    }
    if trade_update.symbol.is_some() {
        updates.push("symbol = ?");
        values.push(Box::new(normalize_symbol(trade_update.symbol)?));
    }

    let tx = conn.transaction()?;

    let query = format!("UPDATE trades SET {} WHERE id = ? AND user_id = ?", updates.join(", "));
    values.push(Box::new(id.to_string()));
    values.push(Box::new(user_id.to_string()));
    let param_refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
    tx.execute(&query, param_refs.as_slice())?;

    let after = load_trade(&tx, user_id, id)?;
    let settlement = settle_trade_event(&tx, user_id, Some(&before), Some(&after), now, notify_mode(&tx)?)?;
    tx.commit()?;

    log::info!("Trade {} updated for {}", id, user_id);

    Ok(TradeMutation {
        trade: after,
        settlement,
    })
}

pub fn delete_trade(db: &Database, user_id: &str, id: &str) -> JournalResult<TradeMutation> {
    delete_trade_at(db, user_id, id, Utc::now())
}

pub(crate) fn delete_trade_at(
    db: &Database,
    user_id: &str,
    id: &str,
    now: DateTime<Utc>,
) -> JournalResult<TradeMutation> {
    let mut conn = db.lock()?;
    let before = load_trade(&conn, user_id, id)?;

    let tx = conn.transaction()?;
    tx.execute("DELETE FROM trades WHERE id = ? AND user_id = ?", params![id, user_id])?;
    let settlement = settle_trade_event(&tx, user_id, Some(&before), None, now, notify_mode(&tx)?)?;
    tx.commit()?;

    log::info!("Trade {} deleted for {}", id, user_id);

    Ok(TradeMutation {
        trade: before,
        settlement,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::summaries::{get_daily_summaries, load_summaries, load_summary};
    use crate::engine::summary::summarize;
    use crate::models::{MarketSession, TradeResult};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 20, 12, 0, 0).unwrap()
    }

    fn at(day: u32, hour: u32) -> i64 {
        Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap().timestamp()
    }

    fn input(traded_at: i64, pnl: f64) -> CreateTradeInput {
        CreateTradeInput {
            traded_at,
            result: if pnl > 0.0 { TradeResult::Win } else { TradeResult::Loss },
            sop_followed: true,
            profit_loss: pnl,
            note: None,
            symbol: None,
        }
    }

    fn assert_cache_matches(db: &Database, user_id: &str) {
        let conn = db.lock().unwrap();
        for stored in load_summaries(&conn, user_id).unwrap() {
            let fresh = summarize(user_id, stored.date, &trades_on_day(&conn, user_id, stored.date).unwrap());
            assert_eq!(stored, fresh, "summary for {}", stored.date);
        }
    }

    #[test]
    fn test_create_classifies_session_and_normalizes_fields() {
        let db = Database::in_memory().unwrap();
        let mut trade = input(at(3, 14), 120.0);
        trade.symbol = Some(" btcusdt ".to_string());
        trade.note = Some("   ".to_string());

        let created = create_trade_at(&db, "u1", trade, now()).unwrap();
        assert!(created.trade.id.starts_with("TRADE-"));
        assert_eq!(created.trade.session, MarketSession::Overlap);
        assert_eq!(created.trade.symbol.as_deref(), Some("BTCUSDT"));
        assert_eq!(created.trade.note, None);
        assert_eq!(created.settlement.summaries.len(), 1);
        assert_eq!(created.settlement.stats.total_trades, 1);

        let fetched = get_trade(&db, "u1", &created.trade.id).unwrap();
        assert_eq!(fetched, created.trade);
    }

    #[test]
    fn test_validation_rejects_before_any_write() {
        let db = Database::in_memory().unwrap();

        let zero = create_trade_at(&db, "u1", input(at(3, 9), 0.0), now());
        assert!(matches!(zero, Err(JournalError::Validation(_))));

        let nan = create_trade_at(&db, "u1", input(at(3, 9), f64::NAN), now());
        assert!(matches!(nan, Err(JournalError::Validation(_))));

        let future = create_trade_at(&db, "u1", input(now().timestamp() + 1, 10.0), now());
        assert!(matches!(future, Err(JournalError::Validation(_))));

        let mut long_note = input(at(3, 9), 10.0);
        long_note.note = Some("x".repeat(1001));
        assert!(matches!(
            create_trade_at(&db, "u1", long_note, now()),
            Err(JournalError::Validation(_))
        ));

        let mut bad_symbol = input(at(3, 9), 10.0);
        bad_symbol.symbol = Some("BTC USDT".to_string());
        assert!(matches!(
            create_trade_at(&db, "u1", bad_symbol, now()),
            Err(JournalError::Validation(_))
        ));

        let conn = db.lock().unwrap();
        let users: i32 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(users, 0);
    }

    #[test]
    fn test_note_at_limit_is_accepted() {
        let db = Database::in_memory().unwrap();
        let mut trade = input(at(3, 9), 10.0);
        trade.note = Some("é".repeat(1000));
        let created = create_trade_at(&db, "u1", trade, now()).unwrap();
        assert_eq!(created.trade.note.map(|n| n.chars().count()), Some(1000));
    }

    #[test]
    fn test_update_moving_date_recomputes_both_days() {
        let db = Database::in_memory().unwrap();
        let moved = create_trade_at(&db, "u1", input(at(3, 9), 50.0), now()).unwrap();
        create_trade_at(&db, "u1", input(at(3, 10), -20.0), now()).unwrap();

        let updated = update_trade_at(
            &db,
            "u1",
            &moved.trade.id,
            UpdateTradeInput {
                traded_at: Some(at(5, 18)),
                profit_loss: Some(75.0),
                ..Default::default()
            },
            now(),
        )
        .unwrap();

        assert_eq!(updated.trade.session, MarketSession::Us);
        assert_eq!(updated.settlement.summaries.len(), 2);
        assert_cache_matches(&db, "u1");

        let conn = db.lock().unwrap();
        let old_day = load_summary(&conn, "u1", updated.settlement.summaries[0].date).unwrap().unwrap();
        assert_eq!(old_day.total_trades, 1);
        assert!((old_day.net_pnl + 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_deleting_only_trade_zeroes_day() {
        let db = Database::in_memory().unwrap();
        let only = create_trade_at(&db, "u1", input(at(4, 2), 30.0), now()).unwrap();
        create_trade_at(&db, "u1", input(at(5, 2), 30.0), now()).unwrap();

        let deleted = delete_trade_at(&db, "u1", &only.trade.id, now()).unwrap();
        let zeroed = &deleted.settlement.summaries[0];
        assert_eq!(zeroed.total_trades, 0);
        assert_eq!(zeroed.net_pnl, 0.0);
        assert_eq!(zeroed.best_session, None);

        let summaries = get_daily_summaries(&db, "u1", None, None).unwrap();
        assert_eq!(summaries.len(), 2, "zeroed row is kept");
        assert!(matches!(
            get_trade(&db, "u1", &only.trade.id),
            Err(JournalError::NotFound { .. })
        ));
        assert_cache_matches(&db, "u1");
    }

    #[test]
    fn test_other_users_trade_is_not_found() {
        let db = Database::in_memory().unwrap();
        let created = create_trade_at(&db, "u1", input(at(3, 9), 10.0), now()).unwrap();

        assert!(matches!(
            get_trade(&db, "u2", &created.trade.id),
            Err(JournalError::NotFound { .. })
        ));
        assert!(matches!(
            delete_trade_at(&db, "u2", &created.trade.id, now()),
            Err(JournalError::NotFound { .. })
        ));
        assert!(matches!(
            update_trade_at(&db, "u2", &created.trade.id, UpdateTradeInput::default(), now()),
            Err(JournalError::NotFound { .. })
        ));
    }

    #[test]
    fn test_cache_matches_recompute_after_mixed_sequence() {
        let db = Database::in_memory().unwrap();
        let mut ids = Vec::new();
        for (i, pnl) in [40.0, -15.5, 22.25, -8.0, 60.0, -33.3].into_iter().enumerate() {
            let traded_at = at(3 + (i as u32 % 3), (i as u32 * 5) % 24);
            ids.push(create_trade_at(&db, "u1", input(traded_at, pnl), now()).unwrap().trade.id);
        }
        update_trade_at(
            &db,
            "u1",
            &ids[1],
            UpdateTradeInput {
                result: Some(TradeResult::Win),
                profit_loss: Some(15.5),
                sop_followed: Some(false),
                ..Default::default()
            },
            now(),
        )
        .unwrap();
        delete_trade_at(&db, "u1", &ids[4], now()).unwrap();
        update_trade_at(
            &db,
            "u1",
            &ids[0],
            UpdateTradeInput {
                traded_at: Some(at(7, 23)),
                ..Default::default()
            },
            now(),
        )
        .unwrap();

        assert_cache_matches(&db, "u1");
    }

    #[test]
    fn test_filters_and_pagination() {
        let db = Database::in_memory().unwrap();
        for (i, pnl) in [10.0, -5.0, 7.0, -2.0].into_iter().enumerate() {
            let mut trade = input(at(3, i as u32), pnl);
            trade.symbol = Some(if i % 2 == 0 { "ETHUSDT" } else { "BTCUSDT" }.to_string());
            create_trade_at(&db, "u1", trade, now()).unwrap();
        }

        let wins = get_trades(
            &db,
            "u1",
            Some(TradeFilters {
                result: Some(TradeResult::Win),
                ..Default::default()
            }),
        )
        .unwrap();
        assert_eq!(wins.len(), 2);

        let btc = get_trades(
            &db,
            "u1",
            Some(TradeFilters {
                symbol: Some("btc".to_string()),
                ..Default::default()
            }),
        )
        .unwrap();
        assert_eq!(btc.len(), 2);

        let page = get_trades(
            &db,
            "u1",
            Some(TradeFilters {
                page: Some(2),
                limit: Some(3),
                ..Default::default()
            }),
        )
        .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].traded_at, at(3, 0), "newest first");

        let far_page = get_trades(
            &db,
            "u1",
            Some(TradeFilters {
                page: Some(i32::MAX),
                limit: Some(i32::MAX),
                ..Default::default()
            }),
        )
        .unwrap();
        assert!(far_page.is_empty());

        assert!(get_trades(&db, "u2", None).unwrap().is_empty());
    }
}
