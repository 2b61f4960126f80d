use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeResult {
    Win,
    Loss,
}

impl TradeResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeResult::Win => "WIN",
            TradeResult::Loss => "LOSS",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "WIN" => Some(TradeResult::Win),
            "LOSS" => Some(TradeResult::Loss),
            _ => None,
        }
    }
}

sql_text_enum!(TradeResult);

/// Market session a trade was placed in, derived from its UTC hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketSession {
    Asia,
    Europe,
    Us,
    Overlap,
}

impl MarketSession {
    /// Fixed enumeration order; ties in best-session selection go to the earliest entry.
    pub const ALL: [MarketSession; 4] = [
        MarketSession::Asia,
        MarketSession::Europe,
        MarketSession::Us,
        MarketSession::Overlap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketSession::Asia => "ASIA",
            MarketSession::Europe => "EUROPE",
            MarketSession::Us => "US",
            MarketSession::Overlap => "OVERLAP",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ASIA" => Some(MarketSession::Asia),
            "EUROPE" => Some(MarketSession::Europe),
            "US" => Some(MarketSession::Us),
            "OVERLAP" => Some(MarketSession::Overlap),
            _ => None,
        }
    }
}

sql_text_enum!(MarketSession);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub user_id: String,
    pub traded_at: i64, // unix seconds, UTC
    pub result: TradeResult,
    pub sop_followed: bool,
    pub profit_loss: f64,
    pub session: MarketSession,
    pub note: Option<String>,
    pub symbol: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Trade {
    /// UTC calendar day the trade belongs to
    pub fn trade_date(&self) -> NaiveDate {
        utc_date(self.traded_at)
    }
}

pub fn utc_date(timestamp: i64) -> NaiveDate {
    DateTime::from_timestamp(timestamp, 0)
        .unwrap_or_default()
        .date_naive()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTradeInput {
    pub traded_at: i64,
    pub result: TradeResult,
    pub sop_followed: bool,
    pub profit_loss: f64,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
}

/// Partial edit; `None` keeps the stored value. The session is never editable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTradeInput {
    pub traded_at: Option<i64>,
    pub result: Option<TradeResult>,
    pub sop_followed: Option<bool>,
    pub profit_loss: Option<f64>,
    pub note: Option<String>,
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradeFilters {
    pub result: Option<TradeResult>,
    pub symbol: Option<String>,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}
