use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::MarketSession;

/// Lifetime ledger feeding badge evaluation. A cache over trades, summaries,
/// streaks, earned badges and targets; rebuildable from scratch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub user_id: String,
    pub total_trades: u32,
    pub total_wins: u32,
    pub total_losses: u32,
    pub sop_followed: u32,
    pub total_profit: f64,
    pub win_rate: f64,            // 0-100
    pub sop_compliance_rate: f64, // 0-100

    pub current_win_streak: u32,
    pub longest_win_streak: u32,
    pub current_log_streak: u32,
    pub longest_log_streak: u32,
    pub current_sop_streak: u32,
    pub longest_sop_streak: u32,

    pub asia_trades: u32,
    pub europe_trades: u32,
    pub us_trades: u32,
    pub overlap_trades: u32,

    pub total_badges: u32,
    pub total_points: u32,

    pub first_trade_date: Option<NaiveDate>,
    pub last_trade_date: Option<NaiveDate>,
    pub max_trades_in_day: u32,
    pub total_logging_days: u32,

    pub has_completed_target: bool,
    pub has_perfect_month: bool,

    pub updated_at: i64,
}

impl UserStats {
    pub fn empty(user_id: &str, updated_at: i64) -> Self {
        Self {
            user_id: user_id.to_string(),
            total_trades: 0,
            total_wins: 0,
            total_losses: 0,
            sop_followed: 0,
            total_profit: 0.0,
            win_rate: 0.0,
            sop_compliance_rate: 0.0,
            current_win_streak: 0,
            longest_win_streak: 0,
            current_log_streak: 0,
            longest_log_streak: 0,
            current_sop_streak: 0,
            longest_sop_streak: 0,
            asia_trades: 0,
            europe_trades: 0,
            us_trades: 0,
            overlap_trades: 0,
            total_badges: 0,
            total_points: 0,
            first_trade_date: None,
            last_trade_date: None,
            max_trades_in_day: 0,
            total_logging_days: 0,
            has_completed_target: false,
            has_perfect_month: false,
            updated_at,
        }
    }

    pub fn session_trades(&self, session: MarketSession) -> u32 {
        match session {
            MarketSession::Asia => self.asia_trades,
            MarketSession::Europe => self.europe_trades,
            MarketSession::Us => self.us_trades,
            MarketSession::Overlap => self.overlap_trades,
        }
    }
}
