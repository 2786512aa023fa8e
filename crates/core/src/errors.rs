use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(#[from] eyre::Report),

    #[error("Internal server error: {0}")]
    Internal(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ScheduleError {
    /// Whether the message may be shown to chat users as-is.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, ScheduleError::NotFound(_) | ScheduleError::Validation(_))
    }
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
