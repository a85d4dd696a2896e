use crate::event::store::{EventFilter, EventStore};
use log::error;
use serde::de::DeserializeOwned;
use shared::dates::normalize_timestamp;
use shared::models::event::{EventWithVenues, EventWithVenuesAndOwner, SportType};
use shared::realtime::sort_events;
use shared::result::{QueryError, QueryResult};
use shared::validation::EventInput;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardQuery {
    pub search_query: Option<String>,
    pub sport_filter: Option<SportType>,
    pub owner_id: String,
}

/// Read side for events. Rows are re-validated on the way out; a row that
/// does not parse is an `invalid_data` failure, not a crash.
#[derive(Clone)]
pub struct EventQueries {
    pub store: Arc<dyn EventStore>,
}

fn parse_rows<T: DeserializeOwned>(rows: Vec<serde_json::Value>) -> Result<Vec<T>, serde_json::Error> {
    serde_json::from_value(serde_json::Value::Array(rows))
}

impl EventQueries {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// The owner's events, filtered and ascending by start time.
    pub async fn list_for_dashboard(&self, query: &DashboardQuery) -> QueryResult<Vec<EventWithVenues>> {
        let filter = EventFilter {
            owner_id: Some(query.owner_id.clone()),
            event_id: None,
            name_contains: query
                .search_query
                .as_deref()
                .map(str::trim)
                .filter(|search| !search.is_empty())
                .map(str::to_string),
            sport_type: query.sport_filter,
        };

        let rows = self.store.select_events(&filter).await.map_err(|e| {
            error!("Events query failed: user_id={} error={}", query.owner_id, e);
            QueryError::QueryFailed
        })?;

        let events: Vec<EventWithVenues> = parse_rows(rows).map_err(|e| {
            error!("Events query returned invalid data: user_id={} error={}", query.owner_id, e);
            QueryError::InvalidData
        })?;

        Ok(sort_events(
            events
                .into_iter()
                .map(|mut event| {
                    event.starts_at = normalize_timestamp(&event.starts_at);
                    event
                })
                .collect(),
        ))
    }

    /// Edit-form data for an event the caller owns.
    pub async fn get_for_edit(&self, event_id: &str, owner_id: &str) -> QueryResult<EventInput> {
        let filter = EventFilter {
            owner_id: Some(owner_id.to_string()),
            ..EventFilter::by_id(event_id)
        };
        let rows = self.store.select_events(&filter).await.map_err(|e| {
            error!("Event fetch failed: event_id={} user_id={} error={}", event_id, owner_id, e);
            QueryError::QueryFailed
        })?;

        let event = parse_rows::<EventWithVenues>(rows)
            .map_err(|e| {
                error!(
                    "Event fetch returned invalid data: event_id={} user_id={} error={}",
                    event_id, owner_id, e
                );
                QueryError::InvalidData
            })?
            .into_iter()
            .next()
            .ok_or_else(|| {
                error!("Event not found: event_id={} user_id={}", event_id, owner_id);
                QueryError::NotFound
            })?;

        Ok(EventInput::new(
            event.name,
            event.sport_type,
            normalize_timestamp(&event.starts_at),
            event.description,
            event.event_venues.into_iter().map(|venue| venue.name).collect(),
        ))
    }

    /// Read-only view of any event; callers compare `user_id` themselves.
    pub async fn get_for_view(&self, event_id: &str) -> QueryResult<EventWithVenuesAndOwner> {
        let rows = self
            .store
            .select_events(&EventFilter::by_id(event_id))
            .await
            .map_err(|e| {
                error!("Event view fetch failed: event_id={} error={}", event_id, e);
                QueryError::QueryFailed
            })?;

        let mut event = parse_rows::<EventWithVenuesAndOwner>(rows)
            .map_err(|e| {
                error!("Event view fetch returned invalid data: event_id={} error={}", event_id, e);
                QueryError::InvalidData
            })?
            .into_iter()
            .next()
            .ok_or_else(|| {
                error!("Event not found: event_id={}", event_id);
                QueryError::NotFound
            })?;

        event.starts_at = normalize_timestamp(&event.starts_at);
        Ok(event)
    }
}
