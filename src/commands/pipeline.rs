use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::commands::badges::check_and_award_in;
use crate::commands::notifications::NotifyMode;
use crate::commands::stats::{load_user_stats, refresh_user_stats};
use crate::commands::streaks::refresh_streaks;
use crate::commands::summaries::recompute_daily_summary;
use crate::error::JournalResult;
use crate::models::{BadgeTrigger, DailySummary, Streak, Trade, UserBadge, UserStats};

/// Derived state after a trade event has been fully applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub summaries: Vec<DailySummary>,
    pub streaks: Vec<Streak>,
    pub stats: UserStats,
    pub new_badges: Vec<UserBadge>,
}

/// Summaries, streaks and stats of one trade event without the badge step.
/// Backfill replays through this and evaluates badges once at the end.
pub(crate) fn settle_derived_state(
    conn: &Connection,
    user_id: &str,
    before: Option<&Trade>,
    after: Option<&Trade>,
    now: DateTime<Utc>,
    notify: NotifyMode,
) -> JournalResult<(Vec<DailySummary>, Vec<Streak>)> {
    let dates: BTreeSet<_> = before
        .iter()
        .chain(after.iter())
        .map(|trade| trade.trade_date())
        .collect();

    let mut summaries = Vec::with_capacity(dates.len());
    for date in dates {
        summaries.push(recompute_daily_summary(conn, user_id, date, now)?);
    }

    let streaks = refresh_streaks(conn, user_id, before, after, now, notify)?;
    refresh_user_stats(conn, user_id, now)?;
    Ok((summaries, streaks))
}

/// Runs summaries, streaks, stats and badges for one trade event, in that
/// order, on the caller's transaction. `before` is the stored trade prior to
/// the change (None on create), `after` the stored trade afterwards (None on delete).
pub(crate) fn settle_trade_event(
    conn: &Connection,
    user_id: &str,
    before: Option<&Trade>,
    after: Option<&Trade>,
    now: DateTime<Utc>,
    notify: NotifyMode,
) -> JournalResult<Settlement> {
    let (summaries, streaks) = settle_derived_state(conn, user_id, before, after, now, notify)?;
    let new_badges = check_and_award_in(conn, user_id, BadgeTrigger::TradeEvent, now, notify)?;
    let stats = load_user_stats(conn, user_id, now)?;

    Ok(Settlement {
        summaries,
        streaks,
        stats,
        new_badges,
    })
}
