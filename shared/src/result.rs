//! Result shapes returned by server actions and read queries.

use crate::validation::FieldErrors;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MSG_VALIDATION_FAILED: &str = "Validation failed. Please check the form fields.";
pub const MSG_NOT_LOGGED_IN: &str = "You must be logged in to perform this action";
pub const MSG_INVALID_EVENT_ID: &str = "Invalid event ID";
pub const MSG_EVENT_NOT_FOUND: &str = "Event not found";
pub const MSG_UNEXPECTED: &str = "An unexpected error occurred. Please try again.";

/// Successful action outcome with an optional message for the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionSuccess<T> {
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ActionSuccess<T> {
    pub fn new(data: T) -> Self {
        Self { data, message: None }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: Some(message.into()),
        }
    }
}

/// Failed action outcome; `field_errors` is present for validation failures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionFailure {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<FieldErrors>,
}

impl ActionFailure {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field_errors: None,
        }
    }

    pub fn validation(field_errors: FieldErrors) -> Self {
        Self {
            message: MSG_VALIDATION_FAILED.to_string(),
            field_errors: Some(field_errors),
        }
    }

    pub fn has_field_errors(&self) -> bool {
        self.field_errors
            .as_ref()
            .map(|errors| !errors.is_empty())
            .unwrap_or(false)
    }
}

impl fmt::Display for ActionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<FieldErrors> for ActionFailure {
    fn from(errors: FieldErrors) -> Self {
        Self::validation(errors)
    }
}

pub type ActionResult<T> = Result<ActionSuccess<T>, ActionFailure>;

/// Why a read query failed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueryError {
    QueryFailed,
    InvalidData,
    NotFound,
}

impl QueryError {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryError::QueryFailed => "query_failed",
            QueryError::InvalidData => "invalid_data",
            QueryError::NotFound => "not_found",
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for QueryError {}

pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::FieldPath;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_validation_failure_shape() {
        let mut errors = FieldErrors::new();
        errors.add(FieldPath::field("name"), "Name must be at least 2 characters");
        let failure = ActionFailure::validation(errors);

        assert!(failure.has_field_errors());
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "message": MSG_VALIDATION_FAILED,
                "field_errors": {"name": ["Name must be at least 2 characters"]},
            })
        );
    }

    #[test]
    fn test_message_failure_omits_field_errors() {
        let failure = ActionFailure::message(MSG_EVENT_NOT_FOUND);
        assert!(!failure.has_field_errors());
        assert_eq!(
            serde_json::to_value(&failure).unwrap(),
            serde_json::json!({"message": "Event not found"})
        );
    }

    #[test]
    fn test_query_error_tags() {
        assert_eq!(serde_json::to_string(&QueryError::QueryFailed).unwrap(), "\"query_failed\"");
        assert_eq!(serde_json::to_string(&QueryError::InvalidData).unwrap(), "\"invalid_data\"");
        assert_eq!(QueryError::NotFound.to_string(), "not_found");
    }
}
