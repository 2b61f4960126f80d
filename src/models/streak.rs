use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreakType {
    WinStreak,
    LogStreak,
    SopStreak,
}

impl StreakType {
    pub const ALL: [StreakType; 3] = [
        StreakType::WinStreak,
        StreakType::LogStreak,
        StreakType::SopStreak,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StreakType::WinStreak => "WIN_STREAK",
            StreakType::LogStreak => "LOG_STREAK",
            StreakType::SopStreak => "SOP_STREAK",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "WIN_STREAK" => Some(StreakType::WinStreak),
            "LOG_STREAK" => Some(StreakType::LogStreak),
            "SOP_STREAK" => Some(StreakType::SopStreak),
            _ => None,
        }
    }
}

sql_text_enum!(StreakType);

/// Counter state shared by all three streak machines.
///
/// WIN and LOG streaks advance per calendar day and use `last_date`;
/// the SOP streak advances per trade and also records the trade it last saw.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreakState {
    pub current: u32,
    pub longest: u32,
    pub last_date: Option<NaiveDate>,
    pub started_on: Option<NaiveDate>,
    pub last_trade_at: Option<i64>,
    pub last_trade_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Streak {
    pub user_id: String,
    pub streak_type: StreakType,
    #[serde(flatten)]
    pub state: StreakState,
}
