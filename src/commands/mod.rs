pub mod badges;
pub mod notifications;
pub mod pipeline;
pub mod recalc;
pub mod settings;
pub mod stats;
pub mod streaks;
pub mod summaries;
pub mod targets;
pub mod trades;
pub mod users;

pub use badges::*;
pub use notifications::*;
pub use pipeline::*;
pub use recalc::*;
pub use settings::*;
pub use stats::*;
pub use streaks::*;
pub use summaries::*;
pub use targets::*;
pub use trades::*;
pub use users::*;
