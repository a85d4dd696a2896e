use crate::dates::normalize_timestamp;
use crate::error::{Result, SharedError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Sport types an event can have.
///
/// `SPORT_TYPES` is the single list used by storage, validation and the UI
/// select options.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SportType {
    Soccer,
    Basketball,
    Tennis,
}

pub const SPORT_TYPES: [SportType; 3] = [SportType::Soccer, SportType::Basketball, SportType::Tennis];

impl SportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SportType::Soccer => "Soccer",
            SportType::Basketball => "Basketball",
            SportType::Tennis => "Tennis",
        }
    }
}

impl Default for SportType {
    fn default() -> Self {
        SportType::Soccer
    }
}

impl fmt::Display for SportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SportType {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self> {
        SPORT_TYPES
            .iter()
            .copied()
            .find(|sport| sport.as_str() == s)
            .ok_or_else(|| SharedError::UnknownSportType(s.to_string()))
    }
}

/// A row of the `events` table as carried by the change feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub sport_type: SportType,
    pub starts_at: String,
    pub description: Option<String>,
}

/// A row of the `event_venues` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventVenueRow {
    #[serde(default)]
    pub id: String,
    pub event_id: String,
    pub name: String,
}

/// Venue as embedded in an event listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EventVenue {
    pub name: String,
}

impl EventVenue {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// An event together with its venues; the unit held by the dashboard and
/// returned by list queries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventWithVenues {
    pub id: String,
    pub name: String,
    pub sport_type: SportType,
    pub starts_at: String,
    pub description: Option<String>,
    #[serde(default)]
    pub event_venues: Vec<EventVenue>,
}

impl EventWithVenues {
    /// Builds a dashboard entry from a bare event row, keeping `venues`.
    ///
    /// The start time is rewritten to the canonical timestamp form.
    pub fn from_row(row: EventRow, venues: Vec<EventVenue>) -> Self {
        Self {
            id: row.id,
            name: row.name,
            sport_type: row.sport_type,
            starts_at: normalize_timestamp(&row.starts_at),
            description: row.description,
            event_venues: venues,
        }
    }

    pub fn venue_names(&self) -> Vec<&str> {
        self.event_venues.iter().map(|venue| venue.name.as_str()).collect()
    }
}

/// Read-only projection used by the event detail view; includes the owner so
/// the caller can decide whether edit controls apply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventWithVenuesAndOwner {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub sport_type: SportType,
    pub starts_at: String,
    pub description: Option<String>,
    #[serde(default)]
    pub event_venues: Vec<EventVenue>,
}

impl EventWithVenuesAndOwner {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// Parses an event id; ids are UUIDs.
pub fn parse_event_id(id: &str) -> Option<Uuid> {
    Uuid::parse_str(id.trim()).ok()
}

/// Identifier returned by create/update actions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventId {
    pub id: String,
}
