use crate::event::repository::RepositoryError;
use actix_web::error::JsonPayloadError;
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use log::warn;
use shared::result::{
    ActionFailure, MSG_INVALID_EVENT_ID, MSG_NOT_LOGGED_IN, MSG_VALIDATION_FAILED,
};
use shared::validation::FieldErrors;
use thiserror::Error;

pub const MSG_INVALID_DATETIME: &str = "Invalid date/time format";
pub const MSG_INVALID_PAYLOAD: &str = "Invalid request data";
pub const MSG_PAYLOAD_TOO_LARGE: &str = "Request body is too large";

/// Why an event action was refused. Converts into the [`ActionFailure`]
/// the client sees.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EventActionError {
    #[error("{}", MSG_VALIDATION_FAILED)]
    Validation(FieldErrors),
    #[error("{}", MSG_NOT_LOGGED_IN)]
    NotLoggedIn,
    #[error("{}", MSG_INVALID_EVENT_ID)]
    InvalidEventId,
    #[error("{}", MSG_INVALID_DATETIME)]
    InvalidDateTime,
    #[error("{}", MSG_INVALID_PAYLOAD)]
    InvalidPayload,
    #[error("{}", MSG_PAYLOAD_TOO_LARGE)]
    PayloadTooLarge,
    #[error("{}", .0.user_message())]
    Repository(#[from] RepositoryError),
}

impl EventActionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EventActionError::Validation(_)
            | EventActionError::InvalidEventId
            | EventActionError::InvalidDateTime
            | EventActionError::InvalidPayload => StatusCode::BAD_REQUEST,
            EventActionError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            EventActionError::NotLoggedIn => StatusCode::UNAUTHORIZED,
            EventActionError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            EventActionError::Repository(RepositoryError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_failure(&self) -> ActionFailure {
        match self {
            EventActionError::Validation(errors) => ActionFailure::validation(errors.clone()),
            other => ActionFailure::message(other.to_string()),
        }
    }
}

impl From<EventActionError> for ActionFailure {
    fn from(err: EventActionError) -> Self {
        err.to_failure()
    }
}

impl ResponseError for EventActionError {
    fn status_code(&self) -> StatusCode {
        EventActionError::status_code(self)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(EventActionError::status_code(self)).json(self.to_failure())
    }
}

/// JSON extractor failures become [`ActionFailure`] bodies; the parser's
/// own message is only logged.
pub fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    warn!("Rejected JSON body: method={} path={} error={}", req.method(), req.path(), err);
    let action_error = match err {
        JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => {
            EventActionError::PayloadTooLarge
        }
        _ => EventActionError::InvalidPayload,
    };
    action_error.into()
}
