use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TargetType {
    Weekly,
    Monthly,
    Yearly,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Weekly => "WEEKLY",
            TargetType::Monthly => "MONTHLY",
            TargetType::Yearly => "YEARLY",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "WEEKLY" => Some(TargetType::Weekly),
            "MONTHLY" => Some(TargetType::Monthly),
            "YEARLY" => Some(TargetType::Yearly),
            _ => None,
        }
    }

    /// Inclusive window of this period that contains `date`:
    /// Monday-Sunday week, calendar month, or calendar year.
    pub fn window_containing(&self, date: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            TargetType::Weekly => {
                let start = date - Duration::days(date.weekday().num_days_from_monday() as i64);
                (start, start + Duration::days(6))
            }
            TargetType::Monthly => {
                let start = date.with_day(1).unwrap_or(date);
                let next_month = if date.month() == 12 {
                    NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
                };
                let end = next_month.and_then(|d| d.pred_opt()).unwrap_or(date);
                (start, end)
            }
            TargetType::Yearly => {
                let start = NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date);
                let end = NaiveDate::from_ymd_opt(date.year(), 12, 31).unwrap_or(date);
                (start, end)
            }
        }
    }
}

sql_text_enum!(TargetType);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TargetState {
    Active,
    Completed,
    Failed,
    Deactivated,
}

impl TargetState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetState::Active => "ACTIVE",
            TargetState::Completed => "COMPLETED",
            TargetState::Failed => "FAILED",
            TargetState::Deactivated => "DEACTIVATED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ACTIVE" => Some(TargetState::Active),
            "COMPLETED" => Some(TargetState::Completed),
            "FAILED" => Some(TargetState::Failed),
            "DEACTIVATED" => Some(TargetState::Deactivated),
            _ => None,
        }
    }
}

sql_text_enum!(TargetState);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    pub user_id: String,
    pub target_type: TargetType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate, // inclusive
    pub win_rate_threshold: f64,
    pub sop_rate_threshold: f64,
    pub profit_threshold: Option<f64>,
    pub is_active: bool,
    pub state: TargetState,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTargetInput {
    pub target_type: TargetType,
    /// Both dates default to the period of `target_type` containing today.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub win_rate_threshold: f64,
    pub sop_rate_threshold: f64,
    #[serde(default)]
    pub profit_threshold: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTargetInput {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub win_rate_threshold: Option<f64>,
    pub sop_rate_threshold: Option<f64>,
    pub profit_threshold: Option<f64>,
    /// Drops the profit threshold; wins over `profit_threshold`.
    #[serde(default)]
    pub clear_profit_threshold: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetStatus {
    OnTrack,
    AtRisk,
    Behind,
    Completed,
    Failed,
}

/// Computed on demand, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetProgress {
    pub target_id: String,
    pub trades: u32,
    pub wins: u32,
    pub sop_followed: u32,
    pub current_win_rate: f64,
    pub current_sop_rate: f64,
    pub current_profit: f64,
    pub win_rate_progress: f64,
    pub sop_rate_progress: f64,
    pub profit_progress: Option<f64>,
    pub expected_progress: f64,
    pub days_elapsed: i64,
    pub days_total: i64,
    pub win_rate_on_track: bool,
    pub sop_rate_on_track: bool,
    pub profit_on_track: Option<bool>,
    pub status: TargetStatus,
}
