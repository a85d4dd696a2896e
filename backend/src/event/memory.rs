use crate::event::store::{EventFields, EventFilter, EventStore, StoreError};
use async_trait::async_trait;
use serde_json::{json, Value};
use shared::models::event::{EventRow, EventVenueRow};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Store operations that can be made to fail in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    InsertEvent,
    UpdateEvent,
    DeleteEvent,
    FindEvent,
    InsertVenues,
    DeleteVenues,
    ListVenues,
    SelectEvents,
    Ping,
}

#[derive(Debug, Clone)]
struct StoredEvent {
    document: Value,
    seq: u64,
}

#[derive(Debug, Clone)]
struct StoredVenue {
    row: EventVenueRow,
    seq: u64,
}

#[derive(Debug, Default)]
struct State {
    events: HashMap<String, StoredEvent>,
    venues: Vec<StoredVenue>,
    next_seq: u64,
    failures: HashMap<StoreOperation, VecDeque<StoreError>>,
}

impl State {
    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn fail(&mut self, operation: StoreOperation) -> Result<(), StoreError> {
        match self.failures.get_mut(&operation).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn event_row(&self, id: &str) -> Result<Option<EventRow>, StoreError> {
        self.events
            .get(id)
            .map(|stored| serde_json::from_value(stored.document.clone()))
            .transpose()
            .map_err(StoreError::from)
    }

    fn owned_row(&self, id: &str, owner_id: &str) -> Result<Option<EventRow>, StoreError> {
        Ok(self.event_row(id)?.filter(|row| row.user_id == owner_id))
    }

    fn venues_of(&self, event_id: &str) -> Vec<EventVenueRow> {
        let mut venues: Vec<&StoredVenue> = self
            .venues
            .iter()
            .filter(|venue| venue.row.event_id == event_id)
            .collect();
        venues.sort_by_key(|venue| venue.seq);
        venues.into_iter().map(|venue| venue.row.clone()).collect()
    }
}

fn text<'a>(document: &'a Value, key: &str) -> Option<&'a str> {
    document.get(key).and_then(Value::as_str)
}

/// Event store kept in process memory. Used in development, tests, and as
/// the fallback when no ArangoDB is configured.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next call of `operation` fail with `err`. Calls queue up.
    pub async fn fail_next(&self, operation: StoreOperation, err: StoreError) {
        let mut state = self.state.lock().await;
        state.failures.entry(operation).or_default().push_back(err);
    }

    /// Stores a document as-is, bypassing row typing.
    pub async fn insert_raw_event(&self, document: Value) {
        let mut state = self.state.lock().await;
        let id = text(&document, "id").unwrap_or_default().to_string();
        let seq = state.next_seq();
        state.events.insert(id, StoredEvent { document, seq });
    }

    pub async fn event_count(&self) -> usize {
        self.state.lock().await.events.len()
    }

    pub async fn venue_count(&self) -> usize {
        self.state.lock().await.venues.len()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn insert_event(&self, row: &EventRow) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.fail(StoreOperation::InsertEvent)?;
        if state.events.contains_key(&row.id) {
            return Err(StoreError::Duplicate(format!("event {} already exists", row.id)));
        }
        let document = serde_json::to_value(row)?;
        let seq = state.next_seq();
        state.events.insert(row.id.clone(), StoredEvent { document, seq });
        Ok(())
    }

    async fn update_event(
        &self,
        id: &str,
        owner_id: &str,
        fields: &EventFields,
    ) -> Result<Option<EventRow>, StoreError> {
        let mut state = self.state.lock().await;
        state.fail(StoreOperation::UpdateEvent)?;
        let Some(previous) = state.owned_row(id, owner_id)? else {
            return Ok(None);
        };

        let updated = EventRow {
            id: previous.id.clone(),
            user_id: previous.user_id.clone(),
            name: fields.name.clone(),
            sport_type: fields.sport_type,
            starts_at: fields.starts_at.clone(),
            description: fields.description.clone(),
        };
        let document = serde_json::to_value(&updated)?;
        if let Some(stored) = state.events.get_mut(id) {
            stored.document = document;
        }
        Ok(Some(previous))
    }

    async fn delete_event(&self, id: &str, owner_id: &str) -> Result<Option<EventRow>, StoreError> {
        let mut state = self.state.lock().await;
        state.fail(StoreOperation::DeleteEvent)?;
        let Some(previous) = state.owned_row(id, owner_id)? else {
            return Ok(None);
        };
        state.events.remove(id);
        state.venues.retain(|venue| venue.row.event_id != id);
        Ok(Some(previous))
    }

    async fn find_event(&self, id: &str, owner_id: &str) -> Result<Option<EventRow>, StoreError> {
        let mut state = self.state.lock().await;
        state.fail(StoreOperation::FindEvent)?;
        state.owned_row(id, owner_id)
    }

    async fn insert_venues(&self, event_id: &str, names: &[String]) -> Result<Vec<EventVenueRow>, StoreError> {
        let mut state = self.state.lock().await;
        state.fail(StoreOperation::InsertVenues)?;
        if !state.events.contains_key(event_id) {
            return Err(StoreError::Constraint(format!(
                "event_venues.event_id references missing event {}",
                event_id
            )));
        }

        let mut inserted = Vec::with_capacity(names.len());
        for name in names {
            let row = EventVenueRow {
                id: Uuid::new_v4().to_string(),
                event_id: event_id.to_string(),
                name: name.clone(),
            };
            let seq = state.next_seq();
            state.venues.push(StoredVenue { row: row.clone(), seq });
            inserted.push(row);
        }
        Ok(inserted)
    }

    async fn delete_venues(&self, event_id: &str) -> Result<Vec<EventVenueRow>, StoreError> {
        let mut state = self.state.lock().await;
        state.fail(StoreOperation::DeleteVenues)?;
        let removed = state.venues_of(event_id);
        state.venues.retain(|venue| venue.row.event_id != event_id);
        Ok(removed)
    }

    async fn list_venues(&self, event_id: &str) -> Result<Vec<EventVenueRow>, StoreError> {
        let mut state = self.state.lock().await;
        state.fail(StoreOperation::ListVenues)?;
        Ok(state.venues_of(event_id))
    }

    async fn select_events(&self, filter: &EventFilter) -> Result<Vec<Value>, StoreError> {
        let mut state = self.state.lock().await;
        state.fail(StoreOperation::SelectEvents)?;

        let needle = filter.name_contains.as_ref().map(|query| query.to_lowercase());
        let mut matched: Vec<&StoredEvent> = state
            .events
            .values()
            .filter(|stored| {
                let document = &stored.document;
                filter
                    .owner_id
                    .as_deref()
                    .map_or(true, |owner| text(document, "user_id") == Some(owner))
                    && filter
                        .event_id
                        .as_deref()
                        .map_or(true, |id| text(document, "id") == Some(id))
                    && needle.as_deref().map_or(true, |needle| {
                        text(document, "name")
                            .map(|name| name.to_lowercase().contains(needle))
                            .unwrap_or(false)
                    })
                    && filter
                        .sport_type
                        .map_or(true, |sport| text(document, "sport_type") == Some(sport.as_str()))
            })
            .collect();
        matched.sort_by(|a, b| {
            let a_start = text(&a.document, "starts_at").unwrap_or_default();
            let b_start = text(&b.document, "starts_at").unwrap_or_default();
            a_start.cmp(b_start).then(a.seq.cmp(&b.seq))
        });

        Ok(matched
            .into_iter()
            .map(|stored| {
                let mut document = stored.document.clone();
                let id = text(&document, "id").unwrap_or_default().to_string();
                let venues: Vec<Value> = state
                    .venues_of(&id)
                    .into_iter()
                    .map(|venue| json!({ "name": venue.name }))
                    .collect();
                if let Value::Object(map) = &mut document {
                    map.insert("event_venues".to_string(), Value::Array(venues));
                }
                document
            })
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.state.lock().await.fail(StoreOperation::Ping)
    }
}
