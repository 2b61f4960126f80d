use chrono::{Datelike, NaiveDate, Weekday};

use crate::models::{StreakState, StreakType};

pub const WIN_STREAK_CHECKPOINTS: &[u32] = &[3, 5, 7, 10, 15];
pub const LOG_STREAK_CHECKPOINTS: &[u32] = &[3, 7, 14, 30, 60, 100];
pub const SOP_STREAK_CHECKPOINTS: &[u32] = &[5, 10, 25, 50, 100];

pub fn checkpoints(streak_type: StreakType) -> &'static [u32] {
    match streak_type {
        StreakType::WinStreak => WIN_STREAK_CHECKPOINTS,
        StreakType::LogStreak => LOG_STREAK_CHECKPOINTS,
        StreakType::SopStreak => SOP_STREAK_CHECKPOINTS,
    }
}

/// Checkpoints passed when a streak moves from `before` to `after`.
pub fn crossed_checkpoints(streak_type: StreakType, before: u32, after: u32) -> Vec<u32> {
    checkpoints(streak_type)
        .iter()
        .copied()
        .filter(|c| before < *c && after >= *c)
        .collect()
}

/// Trading-calendar continuity: the next calendar day, or a jump over the
/// weekend (Friday → within 3 days, Saturday → within 2 days).
pub fn is_next_trading_day(prev: NaiveDate, next: NaiveDate) -> bool {
    let gap = (next - prev).num_days();
    match gap {
        1 => true,
        2 | 3 => match prev.weekday() {
            Weekday::Fri => gap <= 3,
            Weekday::Sat => gap <= 2,
            _ => false,
        },
        _ => false,
    }
}

impl StreakState {
    /// One WIN_STREAK step for a day with trades.
    pub fn apply_win_day(&mut self, date: NaiveDate, win_day: bool) {
        if win_day {
            match self.last_date {
                Some(prev) if self.current > 0 && is_next_trading_day(prev, date) => {
                    self.current += 1;
                }
                _ => {
                    self.current = 1;
                    self.started_on = Some(date);
                }
            }
            self.longest = self.longest.max(self.current);
        } else {
            self.current = 0;
            self.started_on = None;
        }
        self.last_date = Some(date);
    }

    /// One LOG_STREAK step for a day with at least one trade. Strict calendar
    /// continuity; the same date twice is a no-op.
    pub fn apply_log_day(&mut self, date: NaiveDate) {
        match self.last_date {
            Some(prev) if prev == date => return,
            Some(prev) if self.current > 0 && (date - prev).num_days() == 1 => {
                self.current += 1;
            }
            _ => {
                self.current = 1;
                self.started_on = Some(date);
            }
        }
        self.longest = self.longest.max(self.current);
        self.last_date = Some(date);
    }

    /// Missed-day reset: neither `today` nor yesterday was logged.
    /// Returns true when the streak was broken.
    pub fn expire_log(&mut self, today: NaiveDate) -> bool {
        if self.current == 0 {
            return false;
        }
        match self.last_date {
            Some(last) if (today - last).num_days() <= 1 => false,
            _ => {
                self.current = 0;
                self.started_on = None;
                true
            }
        }
    }

    /// One SOP_STREAK step, per trade in chronological order.
    pub fn apply_sop_trade(&mut self, trade_id: &str, traded_at: i64, date: NaiveDate, followed: bool) {
        if followed {
            if self.current == 0 {
                self.started_on = Some(date);
            }
            self.current += 1;
            self.longest = self.longest.max(self.current);
        } else {
            self.current = 0;
            self.started_on = None;
        }
        self.last_date = Some(date);
        self.last_trade_at = Some(traded_at);
        self.last_trade_id = Some(trade_id.to_string());
    }

    /// Whether a day-based event on `date` can be applied as a single step
    /// instead of replaying history.
    pub fn extends_days(&self, streak_type: StreakType, date: NaiveDate) -> bool {
        match (streak_type, self.last_date) {
            (_, None) => true,
            (StreakType::WinStreak, Some(last)) => date > last,
            // A zeroed log streak may have been expired by the scheduler; replay it
            (StreakType::LogStreak, Some(last)) => self.current > 0 && date >= last,
            (StreakType::SopStreak, Some(_)) => false,
        }
    }

    /// Whether `(traded_at, trade_id)` sorts after the last trade the SOP streak saw.
    pub fn extends_trades(&self, traded_at: i64, trade_id: &str) -> bool {
        match (self.last_trade_at, self.last_trade_id.as_deref()) {
            (Some(at), Some(id)) => (traded_at, trade_id) > (at, id),
            _ => self.last_date.is_none(),
        }
    }
}

/// Replays WIN_STREAK over `(date, is_win_day)` pairs in date order.
pub fn fold_win_days(days: impl IntoIterator<Item = (NaiveDate, bool)>) -> StreakState {
    let mut state = StreakState::default();
    for (date, win_day) in days {
        state.apply_win_day(date, win_day);
    }
    state
}

/// Replays LOG_STREAK over logged dates in order, then applies the missed-day check.
pub fn fold_log_days(days: impl IntoIterator<Item = NaiveDate>, today: NaiveDate) -> StreakState {
    let mut state = StreakState::default();
    for date in days {
        state.apply_log_day(date);
    }
    state.expire_log(today);
    state
}

/// Replays SOP_STREAK over `(trade_id, traded_at, date, sop_followed)` in trade order.
pub fn fold_sop_trades<'a>(
    trades: impl IntoIterator<Item = (&'a str, i64, NaiveDate, bool)>,
) -> StreakState {
    let mut state = StreakState::default();
    for (id, traded_at, date, followed) in trades {
        state.apply_sop_trade(id, traded_at, date, followed);
    }
    state
}
