use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::commands::badges::check_and_award_in;
use crate::commands::notifications::NotifyMode;
use crate::commands::settings::load_settings;
use crate::commands::stats::refresh_user_stats;
use crate::commands::streaks::expire_log_streak;
use crate::commands::targets::settle_expired_targets_in;
use crate::commands::users::list_user_ids;
use crate::db::Database;
use crate::error::JournalResult;
use crate::models::BadgeTrigger;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub users: usize,
    pub log_streaks_reset: usize,
    pub targets_settled: usize,
    pub badges_awarded: usize,
    pub failures: usize,
}

struct UserSweep {
    log_streak_reset: bool,
    targets_settled: usize,
    badges_awarded: usize,
}

fn sweep_user(db: &Database, user_id: &str, now: DateTime<Utc>) -> JournalResult<UserSweep> {
    let mut conn = db.lock()?;
    let tx = conn.transaction()?;

    let notify = NotifyMode::from_enabled(load_settings(&tx)?.notifications_enabled);
    let log_streak_reset = expire_log_streak(&tx, user_id, now)?;
    let settled = settle_expired_targets_in(&tx, user_id, now, notify)?;

    // Month-end flags only change with the calendar
    refresh_user_stats(&tx, user_id, now)?;
    let awarded = check_and_award_in(&tx, user_id, BadgeTrigger::Scheduled, now, notify)?;

    tx.commit()?;
    Ok(UserSweep {
        log_streak_reset,
        targets_settled: settled.len(),
        badges_awarded: awarded.len(),
    })
}

/// Time-driven upkeep for every user: the missed-day reset of the logging
/// streak, settlement of targets whose window has closed, and a stats
/// refresh plus badge pass for calendar-based flags. Each user gets
/// its own transaction; one failing user does not stop the rest.
pub fn sweep(db: &Database, now: DateTime<Utc>) -> JournalResult<SweepReport> {
    let user_ids = {
        let conn = db.lock()?;
        list_user_ids(&conn)?
    };

    let mut report = SweepReport {
        users: user_ids.len(),
        ..Default::default()
    };

    for user_id in &user_ids {
        match sweep_user(db, user_id, now) {
            Ok(user) => {
                report.log_streaks_reset += user.log_streak_reset as usize;
                report.targets_settled += user.targets_settled;
                report.badges_awarded += user.badges_awarded;
            }
            Err(e) => {
                log::error!("Sweep failed for {}: {}", user_id, e);
                report.failures += 1;
            }
        }
    }

    log::info!(
        "Sweep done: {} users, {} log streaks reset, {} targets settled, {} badges awarded, {} failures",
        report.users,
        report.log_streaks_reset,
        report.targets_settled,
        report.badges_awarded,
        report.failures
    );

    Ok(report)
}
