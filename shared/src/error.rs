use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;

#[derive(Debug, Error, Serialize, Deserialize, PartialEq)]
pub enum SharedError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid date/time: {0}")]
    InvalidDateTime(String),

    #[error("Unknown sport type: {0}")]
    UnknownSportType(String),

    #[error("Invalid field path: {0}")]
    InvalidFieldPath(String),

    #[error("Conversion error: {0}")]
    Conversion(String),
}

impl From<JsonError> for SharedError {
    fn from(error: JsonError) -> Self {
        Self::Conversion(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SharedError>;
