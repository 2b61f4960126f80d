use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::MarketSession;

pub const DEFAULT_WIN_RATE_MIN_TRADES: u32 = 50;
pub const DEFAULT_SOP_RATE_MIN_TRADES: u32 = 20;

fn default_win_rate_min_trades() -> u32 {
    DEFAULT_WIN_RATE_MIN_TRADES
}

fn default_sop_rate_min_trades() -> u32 {
    DEFAULT_SOP_RATE_MIN_TRADES
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BadgeTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl BadgeTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeTier::Bronze => "BRONZE",
            BadgeTier::Silver => "SILVER",
            BadgeTier::Gold => "GOLD",
            BadgeTier::Platinum => "PLATINUM",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "BRONZE" => Some(BadgeTier::Bronze),
            "SILVER" => Some(BadgeTier::Silver),
            "GOLD" => Some(BadgeTier::Gold),
            "PLATINUM" => Some(BadgeTier::Platinum),
            _ => None,
        }
    }
}

sql_text_enum!(BadgeTier);

/// Unlock condition of a badge, stored as tagged JSON in the catalog
/// (e.g. `{"type":"WIN_RATE","value":60.0,"min_trades":50}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BadgeRequirement {
    TotalTrades {
        value: u32,
    },
    WinStreak {
        value: u32,
    },
    LogStreak {
        value: u32,
    },
    SopStreak {
        value: u32,
    },
    TotalProfit {
        value: f64,
    },
    WinRate {
        value: f64,
        #[serde(default = "default_win_rate_min_trades")]
        min_trades: u32,
    },
    SopRate {
        value: f64,
        #[serde(default = "default_sop_rate_min_trades")]
        min_trades: u32,
    },
    SessionTrades {
        session: MarketSession,
        value: u32,
    },
    TradesInDay {
        value: u32,
    },
    LoggingDays {
        value: u32,
    },
    TargetCompleted,
    PerfectMonth,
    EarlyAdopter {
        before: NaiveDate,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub tier: BadgeTier,
    pub points: u32,
    pub requirement: BadgeRequirement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserBadge {
    pub user_id: String,
    pub badge_id: String,
    pub earned_at: i64,
}

/// What caused an evaluation pass; only used for logging and notification metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BadgeTrigger {
    TradeEvent,
    TargetCompleted,
    Recalculation,
    Scheduled,
    Manual,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requirement_json_round_trip_of_catalog_shapes() {
        let req: BadgeRequirement =
            serde_json::from_str(r#"{"type":"SESSION_TRADES","session":"OVERLAP","value":50}"#)
                .unwrap();
        assert_eq!(
            req,
            BadgeRequirement::SessionTrades {
                session: MarketSession::Overlap,
                value: 50
            }
        );

        let req: BadgeRequirement = serde_json::from_str(r#"{"type":"PERFECT_MONTH"}"#).unwrap();
        assert_eq!(req, BadgeRequirement::PerfectMonth);

        let req: BadgeRequirement =
            serde_json::from_str(r#"{"type":"EARLY_ADOPTER","before":"2026-01-01"}"#).unwrap();
        assert_eq!(
            req,
            BadgeRequirement::EarlyAdopter {
                before: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
            }
        );
    }

    #[test]
    fn test_rate_requirements_default_their_sample_guard() {
        let req: BadgeRequirement =
            serde_json::from_str(r#"{"type":"WIN_RATE","value":60.0}"#).unwrap();
        assert_eq!(
            req,
            BadgeRequirement::WinRate {
                value: 60.0,
                min_trades: DEFAULT_WIN_RATE_MIN_TRADES
            }
        );

        let req: BadgeRequirement =
            serde_json::from_str(r#"{"type":"SOP_RATE","value":90.0}"#).unwrap();
        assert_eq!(
            req,
            BadgeRequirement::SopRate {
                value: 90.0,
                min_trades: DEFAULT_SOP_RATE_MIN_TRADES
            }
        );
    }

    #[test]
    fn test_unknown_requirement_type_is_rejected() {
        let result: Result<BadgeRequirement, _> =
            serde_json::from_str(r#"{"type":"MOON_PHASE","value":3}"#);
        assert!(result.is_err());
    }
}
