//! Pure derivation rules: no storage access, no clock.
//!
//! The `commands` layer feeds these functions rows it has loaded and persists
//! what they return, so the incremental pipeline and the recalculation path
//! share exactly the same arithmetic.

pub mod badge;
pub mod session;
pub mod stats;
pub mod streak;
pub mod summary;
pub mod target;

pub use session::{classify, classify_hour, classify_timestamp, day_bounds};
