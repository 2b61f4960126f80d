use thiserror::Error;

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Invalid stored data: {0}")]
    ParseError(String),

    #[error("Database lock poisoned: {0}")]
    LockError(String),

    #[error("Background task failed: {0}")]
    TaskError(String),
}

impl JournalError {
    pub fn validation(message: impl Into<String>) -> Self {
        JournalError::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        JournalError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

impl From<rusqlite::Error> for JournalError {
    fn from(err: rusqlite::Error) -> Self {
        JournalError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for JournalError {
    fn from(err: serde_json::Error) -> Self {
        JournalError::ParseError(err.to_string())
    }
}

pub type JournalResult<T> = Result<T, JournalError>;
