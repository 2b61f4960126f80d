use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub id: i32,
    pub note_max_length: u32,
    pub streak_check_interval_secs: i64,
    pub notifications_enabled: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSettingsInput {
    pub note_max_length: Option<u32>,
    pub streak_check_interval_secs: Option<i64>,
    pub notifications_enabled: Option<bool>,
}
