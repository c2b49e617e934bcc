use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum PayrollError {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Invalid wage input: {0}")]
    InvalidWageInput(String),

    #[error("Run {0} is finalized and immutable")]
    FinalizedRunImmutable(Uuid),

    #[error("Claim {0} was already consumed by another payroll run")]
    ClaimConsumedConcurrently(Uuid),

    #[error("Missing tenant configuration: {0}")]
    ConfigMissing(String),

    #[error("Duplicate receipt")]
    DuplicateReceipt,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("Internal error{}", .0.as_ref().map_or("".to_string(), |s| format!(": {}", s)))]
    Internal(Option<String>),
}

impl From<sqlx::Error> for PayrollError {
    fn from(error: sqlx::Error) -> Self {
        log::error!("Database error: {}", error);
        PayrollError::Database(error)
    }
}

impl From<anyhow::Error> for PayrollError {
    fn from(error: anyhow::Error) -> Self {
        // Repositories return anyhow; unwrap database failures so callers can
        // tell transient store errors apart from computation errors.
        if error.is::<sqlx::Error>() {
            match error.downcast::<sqlx::Error>() {
                Ok(sqlx_err) => return PayrollError::Database(sqlx_err),
                Err(original_error) => {
                    return PayrollError::Internal(Some(original_error.to_string()));
                }
            }
        }

        PayrollError::Internal(Some(error.to_string()))
    }
}

impl PayrollError {
    pub fn internal(message: impl Into<String>) -> Self {
        PayrollError::Internal(Some(message.into()))
    }

    /// Transient store failures are worth retrying; everything else is not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PayrollError::Database(sqlx::Error::Io(_))
                | PayrollError::Database(sqlx::Error::PoolTimedOut)
        )
    }
}
