//! Row-level change notifications as carried over the realtime channel.

use crate::models::event::{EventRow, EventVenueRow};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Previous snapshot of an event row. DELETE notifications may carry only
/// the primary key, so every column is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OldEventRow {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Previous snapshot of a venue row.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OldVenueRow {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl OldVenueRow {
    /// A venue snapshot is usable only when it names both its event and itself.
    pub fn to_row(&self) -> Option<EventVenueRow> {
        match (&self.event_id, &self.name) {
            (Some(event_id), Some(name)) => Some(EventVenueRow {
                id: self.id.clone().unwrap_or_default(),
                event_id: event_id.clone(),
                name: name.clone(),
            }),
            _ => None,
        }
    }
}

impl From<&EventVenueRow> for OldVenueRow {
    fn from(row: &EventVenueRow) -> Self {
        Self {
            id: Some(row.id.clone()),
            event_id: Some(row.event_id.clone()),
            name: Some(row.name.clone()),
        }
    }
}

impl From<&EventRow> for OldEventRow {
    fn from(row: &EventRow) -> Self {
        Self {
            id: Some(row.id.clone()),
            user_id: Some(row.user_id.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangePayload<N, O> {
    pub event_type: ChangeKind,
    pub new: Option<N>,
    pub old: Option<O>,
}

/// One change on either table, tagged by table name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "table")]
pub enum ChangeFeedMessage {
    #[serde(rename = "events")]
    Events(ChangePayload<EventRow, OldEventRow>),
    #[serde(rename = "event_venues")]
    EventVenues(ChangePayload<EventVenueRow, OldVenueRow>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventChange {
    Insert(EventRow),
    Update(EventRow),
    Delete(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum VenueChange {
    Insert(EventVenueRow),
    Delete(EventVenueRow),
    Update { new: EventVenueRow, old: EventVenueRow },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Event(EventChange),
    Venue(VenueChange),
}

impl ChangeFeedMessage {
    pub fn event_inserted(row: EventRow) -> Self {
        Self::Events(ChangePayload {
            event_type: ChangeKind::Insert,
            new: Some(row),
            old: None,
        })
    }

    pub fn event_updated(row: EventRow) -> Self {
        let old = OldEventRow::from(&row);
        Self::Events(ChangePayload {
            event_type: ChangeKind::Update,
            new: Some(row),
            old: Some(old),
        })
    }

    pub fn event_deleted(id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self::Events(ChangePayload {
            event_type: ChangeKind::Delete,
            new: None,
            old: Some(OldEventRow {
                id: Some(id.into()),
                user_id: Some(user_id.into()),
            }),
        })
    }

    pub fn venue_inserted(row: EventVenueRow) -> Self {
        Self::EventVenues(ChangePayload {
            event_type: ChangeKind::Insert,
            new: Some(row),
            old: None,
        })
    }

    pub fn venue_deleted(row: &EventVenueRow) -> Self {
        Self::EventVenues(ChangePayload {
            event_type: ChangeKind::Delete,
            new: None,
            old: Some(OldVenueRow::from(row)),
        })
    }

    pub fn venue_updated(new: EventVenueRow, old: &EventVenueRow) -> Self {
        Self::EventVenues(ChangePayload {
            event_type: ChangeKind::Update,
            new: Some(new),
            old: Some(OldVenueRow::from(old)),
        })
    }

    pub fn table(&self) -> &'static str {
        match self {
            ChangeFeedMessage::Events(_) => "events",
            ChangeFeedMessage::EventVenues(_) => "event_venues",
        }
    }

    pub fn kind(&self) -> ChangeKind {
        match self {
            ChangeFeedMessage::Events(payload) => payload.event_type,
            ChangeFeedMessage::EventVenues(payload) => payload.event_type,
        }
    }

    /// Owner of the changed event row, when this is an event change.
    pub fn event_owner(&self) -> Option<&str> {
        match self {
            ChangeFeedMessage::Events(payload) => payload
                .new
                .as_ref()
                .map(|row| row.user_id.as_str())
                .or_else(|| payload.old.as_ref().and_then(|old| old.user_id.as_deref())),
            ChangeFeedMessage::EventVenues(_) => None,
        }
    }

    /// Parent event of the changed venue row, when this is a venue change.
    pub fn venue_event_id(&self) -> Option<&str> {
        match self {
            ChangeFeedMessage::EventVenues(payload) => payload
                .new
                .as_ref()
                .map(|row| row.event_id.as_str())
                .or_else(|| payload.old.as_ref().and_then(|old| old.event_id.as_deref())),
            ChangeFeedMessage::Events(_) => None,
        }
    }

    /// Interprets the raw payload. Notifications missing the snapshot their
    /// kind depends on decode to `None` and are ignored.
    pub fn decode(&self) -> Option<Change> {
        match self {
            ChangeFeedMessage::Events(payload) => {
                let change = match payload.event_type {
                    ChangeKind::Insert => EventChange::Insert(payload.new.clone()?),
                    ChangeKind::Update => EventChange::Update(payload.new.clone()?),
                    ChangeKind::Delete => {
                        EventChange::Delete(payload.old.as_ref()?.id.clone()?)
                    }
                };
                Some(Change::Event(change))
            }
            ChangeFeedMessage::EventVenues(payload) => {
                let change = match payload.event_type {
                    ChangeKind::Insert => VenueChange::Insert(payload.new.clone()?),
                    ChangeKind::Delete => VenueChange::Delete(payload.old.as_ref()?.to_row()?),
                    ChangeKind::Update => VenueChange::Update {
                        new: payload.new.clone()?,
                        old: payload.old.as_ref()?.to_row()?,
                    },
                };
                Some(Change::Venue(change))
            }
        }
    }
}

impl fmt::Display for ChangeFeedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} on {}", self.kind(), self.table())
    }
}

/// Lifecycle status of a realtime channel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelStatus {
    Subscribed,
    ChannelError,
    Closed,
}

/// Control frame sent alongside change messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatusFrame {
    ChannelError { channel: String },
}

/// Anything the server writes to a realtime socket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ServerFrame {
    Change(ChangeFeedMessage),
    Status(StatusFrame),
}

/// Dashboard channel name for `user_id`.
pub fn dashboard_channel(user_id: &str) -> String {
    format!("events-dashboard-{}", user_id)
}
