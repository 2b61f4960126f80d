use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::{BTreeSet, HashMap};

use crate::models::{DailySummary, StreakState, StreakType, UserStats};

/// Inputs of the lifetime projection that do not come from daily summaries.
#[derive(Debug, Clone, Default)]
pub struct StatsInputs {
    pub win_streak: StreakState,
    pub log_streak: StreakState,
    pub sop_streak: StreakState,
    pub total_badges: u32,
    pub total_points: u32,
    pub has_completed_target: bool,
}

impl StatsInputs {
    pub fn set_streak(&mut self, streak_type: StreakType, state: StreakState) {
        match streak_type {
            StreakType::WinStreak => self.win_streak = state,
            StreakType::LogStreak => self.log_streak = state,
            StreakType::SopStreak => self.sop_streak = state,
        }
    }
}

/// Percentage on a 0-100 scale; zero when there is nothing to divide by.
pub fn rate(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Derives the whole ledger. `summaries` must be in date order so the float
/// sum is reproducible between the incremental and the recalculation paths.
pub fn project_user_stats(
    user_id: &str,
    summaries: &[DailySummary],
    inputs: &StatsInputs,
    today: NaiveDate,
    updated_at: i64,
) -> UserStats {
    let mut stats = UserStats::empty(user_id, updated_at);

    for day in summaries.iter().filter(|s| s.has_trades()) {
        stats.total_trades += day.total_trades;
        stats.total_wins += day.wins;
        stats.total_losses += day.losses;
        stats.sop_followed += day.sop_followed;
        stats.total_profit += day.net_pnl;

        stats.asia_trades += day.asia_trades;
        stats.europe_trades += day.europe_trades;
        stats.us_trades += day.us_trades;
        stats.overlap_trades += day.overlap_trades;

        stats.max_trades_in_day = stats.max_trades_in_day.max(day.total_trades);
        stats.total_logging_days += 1;

        if stats.first_trade_date.is_none_or(|first| day.date < first) {
            stats.first_trade_date = Some(day.date);
        }
        if stats.last_trade_date.is_none_or(|last| day.date > last) {
            stats.last_trade_date = Some(day.date);
        }
    }

    stats.win_rate = rate(stats.total_wins, stats.total_trades);
    stats.sop_compliance_rate = rate(stats.sop_followed, stats.total_trades);

    stats.current_win_streak = inputs.win_streak.current;
    stats.longest_win_streak = inputs.win_streak.longest;
    stats.current_log_streak = inputs.log_streak.current;
    stats.longest_log_streak = inputs.log_streak.longest;
    stats.current_sop_streak = inputs.sop_streak.current;
    stats.longest_sop_streak = inputs.sop_streak.longest;

    stats.total_badges = inputs.total_badges;
    stats.total_points = inputs.total_points;
    stats.has_completed_target = inputs.has_completed_target;
    stats.has_perfect_month = has_perfect_month(summaries, today);

    stats
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn next_month_start(first: NaiveDate) -> Option<NaiveDate> {
    if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    }
}

/// A calendar month that has fully elapsed before `today`, in which every
/// weekday closed as a win day and no logged day closed flat or red.
pub fn has_perfect_month(summaries: &[DailySummary], today: NaiveDate) -> bool {
    let logged: HashMap<NaiveDate, &DailySummary> = summaries
        .iter()
        .filter(|s| s.has_trades())
        .map(|s| (s.date, s))
        .collect();

    let months: BTreeSet<NaiveDate> = logged.keys().map(|d| month_start(*d)).collect();

    months.into_iter().any(|first| {
        let Some(next) = next_month_start(first) else {
            return false;
        };
        if next > today {
            return false;
        }

        first.iter_days().take_while(|d| *d < next).all(|day| {
            let weekend = matches!(day.weekday(), Weekday::Sat | Weekday::Sun);
            match logged.get(&day) {
                Some(summary) => summary.is_win_day(),
                None => weekend,
            }
        })
    })
}
