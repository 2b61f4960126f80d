use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationCategory {
    Badge,
    Streak,
    Target,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::Badge => "BADGE",
            NotificationCategory::Streak => "STREAK",
            NotificationCategory::Target => "TARGET",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "BADGE" => Some(NotificationCategory::Badge),
            "STREAK" => Some(NotificationCategory::Streak),
            "TARGET" => Some(NotificationCategory::Target),
            _ => None,
        }
    }
}

sql_text_enum!(NotificationCategory);

/// Outbox record; delivery is up to whoever drains the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub category: NotificationCategory,
    pub metadata: serde_json::Value,
    pub created_at: i64,
    pub read_at: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub category: NotificationCategory,
    pub metadata: serde_json::Value,
}
