use thiserror::Error;

/// Failure taxonomy for circulation operations.
///
/// Business-rule failures are ordinary `Err` values so callers can branch
/// on the kind and report a precise message; none of them are panics.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{entity} not found: {id}")]
    EntityNotFound { entity: &'static str, id: String },
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    LimitExceeded(String),
    #[error("no copies of document {document_id} are available")]
    Unavailable { document_id: String },
    #[error("member {member_id} is not active")]
    InactiveMember { member_id: String },
    #[error("{0}")]
    Validation(String),
    // Internal invariant broken. Surfaced instead of silently resolved so the
    // inconsistency stays visible to operators.
    #[error("consistency violation: {0}")]
    ConsistencyViolation(String),
    #[error("storage operation failed")]
    StorageError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl AppError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        AppError::EntityNotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn storage(cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        AppError::StorageError(Box::new(cause))
    }
}

pub type AppResult<T> = Result<T, AppError>;
