use chrono::NaiveDate;

use crate::models::{BadgeRequirement, UserStats};

/// Everything a requirement predicate may look at.
#[derive(Debug, Clone, Copy)]
pub struct BadgeContext<'a> {
    pub stats: &'a UserStats,
    pub registered_on: Option<NaiveDate>,
}

/// One arm per requirement tag. An unmet predicate is simply `false`.
pub fn is_satisfied(requirement: &BadgeRequirement, ctx: &BadgeContext<'_>) -> bool {
    let stats = ctx.stats;
    match requirement {
        BadgeRequirement::TotalTrades { value } => stats.total_trades >= *value,
        BadgeRequirement::WinStreak { value } => stats.longest_win_streak >= *value,
        BadgeRequirement::LogStreak { value } => stats.longest_log_streak >= *value,
        BadgeRequirement::SopStreak { value } => stats.longest_sop_streak >= *value,
        BadgeRequirement::TotalProfit { value } => stats.total_profit >= *value,
        BadgeRequirement::WinRate { value, min_trades } => {
            stats.total_trades >= *min_trades && stats.win_rate >= *value
        }
        BadgeRequirement::SopRate { value, min_trades } => {
            stats.total_trades >= *min_trades && stats.sop_compliance_rate >= *value
        }
        BadgeRequirement::SessionTrades { session, value } => {
            stats.session_trades(*session) >= *value
        }
        BadgeRequirement::TradesInDay { value } => stats.max_trades_in_day >= *value,
        BadgeRequirement::LoggingDays { value } => stats.total_logging_days >= *value,
        BadgeRequirement::TargetCompleted => stats.has_completed_target,
        BadgeRequirement::PerfectMonth => stats.has_perfect_month,
        BadgeRequirement::EarlyAdopter { before } => {
            ctx.registered_on.is_some_and(|registered| registered < *before)
        }
    }
}
