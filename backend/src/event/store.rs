use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::models::event::{EventRow, EventVenueRow, SportType};
use shared::result::MSG_UNEXPECTED;
use thiserror::Error;

pub const MSG_DUPLICATE: &str = "This record already exists";
pub const MSG_CONSTRAINT: &str = "Invalid reference to related data";
pub const MSG_PERMISSION: &str = "You don't have permission to perform this action";
pub const MSG_NETWORK: &str = "Network error. Please check your connection and try again";

/// Failure reported by an [`EventStore`]. The payload is the backend's raw
/// message and is only ever logged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("duplicate record: {0}")]
    Duplicate(String),
    #[error("constraint violation: {0}")]
    Constraint(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("storage error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Message that is safe to show to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            StoreError::Duplicate(_) => MSG_DUPLICATE,
            StoreError::Constraint(_) => MSG_CONSTRAINT,
            StoreError::PermissionDenied(_) => MSG_PERMISSION,
            StoreError::Network(_) => MSG_NETWORK,
            StoreError::Backend(_) => MSG_UNEXPECTED,
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Backend(format!("serialization failed: {}", err))
    }
}

/// Row filter for event selects. Every set field narrows the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub owner_id: Option<String>,
    pub event_id: Option<String>,
    /// Case-insensitive substring of the event name.
    pub name_contains: Option<String>,
    pub sport_type: Option<SportType>,
}

impl EventFilter {
    pub fn owned_by(owner_id: &str) -> Self {
        Self {
            owner_id: Some(owner_id.to_string()),
            ..Self::default()
        }
    }

    pub fn by_id(event_id: &str) -> Self {
        Self {
            event_id: Some(event_id.to_string()),
            ..Self::default()
        }
    }
}

/// The mutable columns of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFields {
    pub name: String,
    pub sport_type: SportType,
    pub starts_at: String,
    pub description: Option<String>,
}

impl From<&EventRow> for EventFields {
    fn from(row: &EventRow) -> Self {
        Self {
            name: row.name.clone(),
            sport_type: row.sport_type,
            starts_at: row.starts_at.clone(),
            description: row.description.clone(),
        }
    }
}

/// Row-level persistence for events and their venues.
///
/// Owner-scoped operations match nothing (rather than fail) when the row
/// belongs to someone else.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn insert_event(&self, row: &EventRow) -> Result<(), StoreError>;

    /// Overwrites the fields of the event `id` owned by `owner_id`. Returns
    /// the row as it was before the update, or `None` when nothing matched.
    async fn update_event(
        &self,
        id: &str,
        owner_id: &str,
        fields: &EventFields,
    ) -> Result<Option<EventRow>, StoreError>;

    /// Deletes the event `id` owned by `owner_id` together with its venues.
    async fn delete_event(&self, id: &str, owner_id: &str) -> Result<Option<EventRow>, StoreError>;

    async fn find_event(&self, id: &str, owner_id: &str) -> Result<Option<EventRow>, StoreError>;

    /// Inserts venues for `event_id`, all or none.
    async fn insert_venues(&self, event_id: &str, names: &[String]) -> Result<Vec<EventVenueRow>, StoreError>;

    /// Removes every venue of `event_id`, returning what was removed.
    async fn delete_venues(&self, event_id: &str) -> Result<Vec<EventVenueRow>, StoreError>;

    /// Venues of `event_id` in creation order.
    async fn list_venues(&self, event_id: &str) -> Result<Vec<EventVenueRow>, StoreError>;

    /// Raw event documents with their venues embedded as
    /// `event_venues: [{name}]` in creation order, ascending by `starts_at`.
    async fn select_events(&self, filter: &EventFilter) -> Result<Vec<serde_json::Value>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
