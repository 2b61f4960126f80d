/// Stores a fieldless enum as its `as_str()` text and reads it back through `parse()`.
macro_rules! sql_text_enum {
    ($ty:ty) => {
        impl rusqlite::types::ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
                Ok(self.as_str().into())
            }
        }

        impl rusqlite::types::FromSql for $ty {
            fn column_result(
                value: rusqlite::types::ValueRef<'_>,
            ) -> rusqlite::types::FromSqlResult<Self> {
                let text = value.as_str()?;
                <$ty>::parse(text).ok_or_else(|| {
                    rusqlite::types::FromSqlError::Other(
                        format!("unknown {} value: {}", stringify!($ty), text).into(),
                    )
                })
            }
        }
    };
}

pub mod badge;
pub mod daily_summary;
pub mod notification;
pub mod settings;
pub mod streak;
pub mod target;
pub mod trade;
pub mod user;
pub mod user_stats;

pub use badge::*;
pub use daily_summary::*;
pub use notification::*;
pub use settings::*;
pub use streak::*;
pub use target::*;
pub use trade::*;
pub use user::*;
pub use user_stats::*;
