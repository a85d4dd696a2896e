use serde::{Deserialize, Serialize};
use validator::Validate;

/// Email/password pair used by sign-up and sign-in.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Credentials {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,

    #[validate(length(
        min = 6,
        max = 72,
        message = "Password must be between 6 and 72 characters"
    ))]
    pub password: String,
}

impl Credentials {
    /// Email as stored and looked up: trimmed and lower-cased.
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

/// The signed-in user as exposed to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
}

/// Returned by sign-up and sign-in; `session_id` is sent back as a Bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionResponse {
    pub session_id: String,
    pub user: AuthUser,
}
