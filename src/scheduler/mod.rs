pub mod streak_scheduler;
pub mod sweep;

pub use streak_scheduler::StreakScheduler;
pub use sweep::{sweep, SweepReport};
