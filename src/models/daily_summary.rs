use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::MarketSession;

/// Per-user, per-UTC-day aggregate. Always equal to a full recomputation over that day's trades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub user_id: String,
    pub date: NaiveDate,
    pub total_trades: u32,
    pub wins: u32,
    pub losses: u32,
    pub sop_followed: u32,
    pub sop_not_followed: u32,
    pub net_pnl: f64,
    pub asia_trades: u32,
    pub asia_wins: u32,
    pub europe_trades: u32,
    pub europe_wins: u32,
    pub us_trades: u32,
    pub us_wins: u32,
    pub overlap_trades: u32,
    pub overlap_wins: u32,
    pub best_session: Option<MarketSession>,
}

impl DailySummary {
    pub fn empty(user_id: &str, date: NaiveDate) -> Self {
        Self {
            user_id: user_id.to_string(),
            date,
            total_trades: 0,
            wins: 0,
            losses: 0,
            sop_followed: 0,
            sop_not_followed: 0,
            net_pnl: 0.0,
            asia_trades: 0,
            asia_wins: 0,
            europe_trades: 0,
            europe_wins: 0,
            us_trades: 0,
            us_wins: 0,
            overlap_trades: 0,
            overlap_wins: 0,
            best_session: None,
        }
    }

    /// (trades, wins) for one session
    pub fn session_counts(&self, session: MarketSession) -> (u32, u32) {
        match session {
            MarketSession::Asia => (self.asia_trades, self.asia_wins),
            MarketSession::Europe => (self.europe_trades, self.europe_wins),
            MarketSession::Us => (self.us_trades, self.us_wins),
            MarketSession::Overlap => (self.overlap_trades, self.overlap_wins),
        }
    }

    pub(crate) fn session_counts_mut(&mut self, session: MarketSession) -> (&mut u32, &mut u32) {
        match session {
            MarketSession::Asia => (&mut self.asia_trades, &mut self.asia_wins),
            MarketSession::Europe => (&mut self.europe_trades, &mut self.europe_wins),
            MarketSession::Us => (&mut self.us_trades, &mut self.us_wins),
            MarketSession::Overlap => (&mut self.overlap_trades, &mut self.overlap_wins),
        }
    }

    pub fn has_trades(&self) -> bool {
        self.total_trades > 0
    }

    /// Only the day's net sign matters, not individual losing trades.
    pub fn is_win_day(&self) -> bool {
        self.has_trades() && self.net_pnl > 0.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityCurvePoint {
    pub date: String,
    pub cumulative_pnl: f64,
    pub daily_pnl: f64,
    pub trade_count: u32,
}
