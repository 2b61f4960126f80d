//! Performance aggregation and gamification engine for a trading journal.
//!
//! Every trade write runs one pipeline on a single SQLite transaction:
//! the day's summary is recomputed, the three streaks advance or are rebuilt,
//! lifetime stats are re-derived and the badge catalog is evaluated.
//! Target progress is computed on demand; the [`StreakScheduler`] handles the
//! time-driven parts (missed logging days, closed target windows).

pub mod commands;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod scheduler;

use std::path::Path;
use std::sync::Arc;

pub use commands::NotifyMode;
pub use db::Database;
pub use error::{JournalError, JournalResult};
pub use scheduler::{StreakScheduler, SweepReport};

pub const DATABASE_FILE: &str = "trading_journal.db";

/// An opened journal: the shared database and its (not yet started) scheduler.
pub struct Journal {
    pub db: Arc<Database>,
    pub scheduler: StreakScheduler,
}

/// Opens (creating and migrating as needed) the journal database inside `app_dir`.
pub fn open_journal(app_dir: &Path) -> JournalResult<Journal> {
    std::fs::create_dir_all(app_dir).map_err(|e| {
        JournalError::DatabaseError(format!("Failed to create data directory {:?}: {}", app_dir, e))
    })?;

    let db_path = app_dir.join(DATABASE_FILE);
    log::info!("Database path: {:?}", db_path);

    let db_path = db_path
        .to_str()
        .ok_or_else(|| JournalError::validation(format!("database path is not valid UTF-8: {:?}", db_path)))?;

    let database = match Database::new(db_path) {
        Ok(db) => db,
        Err(e) => {
            log::error!("Database initialization failed: {}", e);
            log::error!("This might be due to a failed migration or database corruption.");
            log::error!("Your database backups are located at: {:?}", app_dir.join("backups"));
            log::error!(
                "To recover, replace {} with the most recent backup from that folder and reopen.",
                DATABASE_FILE
            );
            return Err(e.into());
        }
    };

    let db = Arc::new(database);
    let scheduler = StreakScheduler::new(db.clone());

    Ok(Journal { db, scheduler })
}
