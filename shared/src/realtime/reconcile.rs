//! Pure reconciliation of the dashboard collection against change
//! notifications.
//!
//! Every function takes the current list by value and returns the next one.
//! A notification naming an event or venue that is not present leaves the
//! list untouched: the local state may be behind or ahead of the feed.

use crate::dates::parse_timestamp;
use crate::models::event::{EventRow, EventVenue, EventWithVenues};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum StartKey {
    Instant(DateTime<Utc>),
    Unparsed(String),
}

fn start_key(event: &EventWithVenues) -> StartKey {
    match parse_timestamp(&event.starts_at) {
        Some(instant) => StartKey::Instant(instant),
        None => StartKey::Unparsed(event.starts_at.clone()),
    }
}

/// Stable sort, ascending by start instant. Unparseable start times sort
/// after every parseable one, by their raw text.
pub fn sort_events(mut events: Vec<EventWithVenues>) -> Vec<EventWithVenues> {
    events.sort_by_cached_key(start_key);
    events
}

/// Inserts or replaces the scalar fields of an event. An existing venue list
/// is kept since event rows carry no venues.
pub fn upsert_event(mut events: Vec<EventWithVenues>, row: EventRow) -> Vec<EventWithVenues> {
    match events.iter().position(|event| event.id == row.id) {
        Some(index) => {
            let venues = std::mem::take(&mut events[index].event_venues);
            events[index] = EventWithVenues::from_row(row, venues);
        }
        None => events.push(EventWithVenues::from_row(row, Vec::new())),
    }
    sort_events(events)
}

pub fn remove_event(mut events: Vec<EventWithVenues>, event_id: &str) -> Vec<EventWithVenues> {
    events.retain(|event| event.id != event_id);
    events
}

/// Replaces the whole venue list of an event.
pub fn update_event_venues(
    mut events: Vec<EventWithVenues>,
    event_id: &str,
    venues: Vec<EventVenue>,
) -> Vec<EventWithVenues> {
    if let Some(event) = events.iter_mut().find(|event| event.id == event_id) {
        event.event_venues = venues;
    }
    events
}

/// Appends a venue unless the event already has one with that exact name.
pub fn add_venue(mut events: Vec<EventWithVenues>, event_id: &str, venue_name: &str) -> Vec<EventWithVenues> {
    if let Some(event) = events.iter_mut().find(|event| event.id == event_id) {
        if !event.event_venues.iter().any(|venue| venue.name == venue_name) {
            event.event_venues.push(EventVenue::new(venue_name));
        }
    }
    events
}

/// Removes the first venue with exactly this name.
pub fn remove_venue(mut events: Vec<EventWithVenues>, event_id: &str, venue_name: &str) -> Vec<EventWithVenues> {
    if let Some(event) = events.iter_mut().find(|event| event.id == event_id) {
        if let Some(index) = event.event_venues.iter().position(|venue| venue.name == venue_name) {
            event.event_venues.remove(index);
        }
    }
    events
}

/// Renames the first venue called `old_name`.
pub fn update_venue(
    mut events: Vec<EventWithVenues>,
    event_id: &str,
    old_name: &str,
    new_name: &str,
) -> Vec<EventWithVenues> {
    if old_name == new_name {
        return events;
    }
    if let Some(event) = events.iter_mut().find(|event| event.id == event_id) {
        if let Some(venue) = event.event_venues.iter_mut().find(|venue| venue.name == old_name) {
            venue.name = new_name.to_string();
        }
    }
    events
}
