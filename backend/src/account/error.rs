use crate::error::ApiError;
use shared::result::{MSG_UNEXPECTED, MSG_VALIDATION_FAILED};
use shared::validation::FieldErrors;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("An account with this email already exists")]
    AlreadyExists,
    #[error("Validation failed. Please check the form fields.")]
    Validation(FieldErrors),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Session error: {0}")]
    SessionError(String),
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::InvalidCredentials => ApiError::unauthorized(&err.to_string()),
            AccountError::AlreadyExists => ApiError::new("CONFLICT", &err.to_string(), 409),
            AccountError::Validation(_) => ApiError::validation_error(MSG_VALIDATION_FAILED),
            AccountError::DatabaseError(_) => ApiError::database_error(MSG_UNEXPECTED),
            AccountError::SessionError(_) => ApiError::internal_error(MSG_UNEXPECTED),
        }
    }
}
