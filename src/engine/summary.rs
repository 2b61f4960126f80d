use chrono::NaiveDate;

use crate::models::{DailySummary, MarketSession, Trade, TradeResult};

/// Full aggregation of one user-day. Trades from other users or days are ignored,
/// so callers may pass a superset.
pub fn summarize(user_id: &str, date: NaiveDate, trades: &[Trade]) -> DailySummary {
    let mut summary = DailySummary::empty(user_id, date);

    for trade in trades
        .iter()
        .filter(|t| t.user_id == user_id && t.trade_date() == date)
    {
        let won = trade.result == TradeResult::Win;

        summary.total_trades += 1;
        if won {
            summary.wins += 1;
        } else {
            summary.losses += 1;
        }
        if trade.sop_followed {
            summary.sop_followed += 1;
        } else {
            summary.sop_not_followed += 1;
        }
        summary.net_pnl += trade.profit_loss;

        let (session_trades, session_wins) = summary.session_counts_mut(trade.session);
        *session_trades += 1;
        if won {
            *session_wins += 1;
        }
    }

    summary.best_session = best_session(&summary);
    summary
}

/// Highest win rate among sessions with at least one trade. Strict comparison
/// keeps the earliest session of `MarketSession::ALL` on ties.
pub fn best_session(summary: &DailySummary) -> Option<MarketSession> {
    let mut best: Option<(MarketSession, u32, u32)> = None;

    for session in MarketSession::ALL {
        let (trades, wins) = summary.session_counts(session);
        if trades == 0 {
            continue;
        }
        let better = match best {
            None => true,
            // wins/trades > best_wins/best_trades without float division
            Some((_, best_trades, best_wins)) => {
                (wins as u64) * (best_trades as u64) > (best_wins as u64) * (trades as u64)
            }
        };
        if better {
            best = Some((session, trades, wins));
        }
    }

    best.map(|(session, _, _)| session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn trade(id: &str, hour: u32, result: TradeResult, pnl: f64, sop: bool) -> Trade {
        let at = Utc.with_ymd_and_hms(2025, 3, 4, hour, 15, 0).unwrap().timestamp();
        Trade {
            id: id.to_string(),
            user_id: "u1".to_string(),
            traded_at: at,
            result,
            sop_followed: sop,
            profit_loss: pnl,
            session: crate::engine::classify_timestamp(at),
            note: None,
            symbol: None,
            created_at: at,
            updated_at: at,
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 4).unwrap()
    }

    #[test]
    fn test_summarize_counts_everything() {
        let trades = vec![
            trade("a", 2, TradeResult::Win, 120.0, true),
            trade("b", 9, TradeResult::Loss, -40.0, false),
            trade("c", 14, TradeResult::Win, 60.5, true),
            trade("d", 18, TradeResult::Loss, -10.0, true),
        ];

        let s = summarize("u1", day(), &trades);
        assert_eq!(s.total_trades, 4);
        assert_eq!(s.wins, 2);
        assert_eq!(s.losses, 2);
        assert_eq!(s.sop_followed, 3);
        assert_eq!(s.sop_not_followed, 1);
        assert!((s.net_pnl - 130.5).abs() < 1e-9);
        assert_eq!(s.session_counts(MarketSession::Asia), (1, 1));
        assert_eq!(s.session_counts(MarketSession::Europe), (1, 0));
        assert_eq!(s.session_counts(MarketSession::Overlap), (1, 1));
        assert_eq!(s.session_counts(MarketSession::Us), (1, 0));
        // Asia and Overlap tie at 100%; Asia comes first
        assert_eq!(s.best_session, Some(MarketSession::Asia));
    }

    #[test]
    fn test_best_session_prefers_higher_rate_over_volume() {
        let trades = vec![
            trade("a", 2, TradeResult::Win, 10.0, true),
            trade("b", 3, TradeResult::Loss, -10.0, true),
            trade("c", 4, TradeResult::Win, 10.0, true),
            trade("d", 17, TradeResult::Win, 10.0, true),
        ];
        let s = summarize("u1", day(), &trades);
        assert_eq!(s.best_session, Some(MarketSession::Us));
    }

    #[test]
    fn test_best_session_equal_ratios_keep_enumeration_order() {
        let trades = vec![
            trade("a", 9, TradeResult::Win, 10.0, true),
            trade("b", 10, TradeResult::Loss, -5.0, true),
            trade("c", 2, TradeResult::Win, 10.0, true),
            trade("d", 3, TradeResult::Win, 10.0, true),
            trade("e", 4, TradeResult::Loss, -5.0, true),
            trade("f", 5, TradeResult::Loss, -5.0, true),
        ];
        // Asia 2/4 and Europe 1/2 are both 50%
        let s = summarize("u1", day(), &trades);
        assert_eq!(s.best_session, Some(MarketSession::Asia));
    }

    #[test]
    fn test_empty_day_has_no_best_session() {
        let s = summarize("u1", day(), &[]);
        assert_eq!(s, DailySummary::empty("u1", day()));
        assert!(!s.is_win_day());
    }

    #[test]
    fn test_other_days_and_users_are_ignored() {
        let mut other_user = trade("a", 2, TradeResult::Win, 10.0, true);
        other_user.user_id = "u2".to_string();
        let mut other_day = trade("b", 2, TradeResult::Win, 10.0, true);
        other_day.traded_at += 86_400;

        let s = summarize("u1", day(), &[other_user, other_day]);
        assert_eq!(s.total_trades, 0);
    }

    #[test]
    fn test_losing_trade_on_profitable_day_is_still_a_win_day() {
        let trades = vec![
            trade("a", 9, TradeResult::Win, 200.0, true),
            trade("b", 10, TradeResult::Loss, -50.0, true),
        ];
        assert!(summarize("u1", day(), &trades).is_win_day());
    }
}
