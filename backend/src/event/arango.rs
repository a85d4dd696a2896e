use crate::event::store::{EventFields, EventFilter, EventStore, StoreError};
use arangors::client::reqwest::ReqwestClient;
use arangors::{AqlQuery, ClientError, Database};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use shared::dates::canonical_timestamp;
use shared::models::event::{EventRow, EventVenueRow};
use std::collections::HashMap;
use uuid::Uuid;

pub const EVENTS_COLLECTION: &str = "events";
pub const VENUES_COLLECTION: &str = "event_venues";

const ERROR_FORBIDDEN: u16 = 11;
const ERROR_DOCUMENT_NOT_FOUND: u16 = 1202;
const ERROR_UNIQUE_CONSTRAINT: u16 = 1210;
const ERROR_DOCUMENT_HANDLE_BAD: u16 = 1205;

/// Classifies an ArangoDB client error.
pub fn store_error(err: ClientError) -> StoreError {
    match err {
        ClientError::Arango(arango_error) => match arango_error.error_num() {
            ERROR_UNIQUE_CONSTRAINT => StoreError::Duplicate(arango_error.message().to_string()),
            ERROR_DOCUMENT_NOT_FOUND | ERROR_DOCUMENT_HANDLE_BAD => {
                StoreError::Constraint(arango_error.message().to_string())
            }
            ERROR_FORBIDDEN => StoreError::PermissionDenied(arango_error.message().to_string()),
            _ => StoreError::Backend(arango_error.to_string()),
        },
        ClientError::InsufficientPermission { .. } => StoreError::PermissionDenied(err.to_string()),
        ClientError::HttpClient(message) => StoreError::Network(message),
        other => StoreError::Backend(other.to_string()),
    }
}

/// Event store backed by two ArangoDB document collections, `events` and
/// `event_venues`. Venue documents carry `created_at` plus their position in
/// the inserting batch so creation order survives.
#[derive(Clone)]
pub struct ArangoEventStore {
    pub db: Database<ReqwestClient>,
}

impl ArangoEventStore {
    pub fn new(db: Database<ReqwestClient>) -> Self {
        Self { db }
    }

    /// Creates the collections the store needs when they are missing.
    pub async fn ensure_collections(&self) -> Result<(), StoreError> {
        for name in [EVENTS_COLLECTION, VENUES_COLLECTION] {
            if self.db.collection(name).await.is_err() {
                log::info!("Creating collection {}", name);
                self.db.create_collection(name).await.map_err(store_error)?;
            }
        }
        Ok(())
    }

    async fn run<T: DeserializeOwned>(
        &self,
        query: &str,
        bind_vars: HashMap<&str, Value>,
    ) -> Result<Vec<T>, StoreError> {
        let aql = AqlQuery::builder().query(query).bind_vars(bind_vars).build();
        self.db.aql_query::<T>(aql).await.map_err(|e| {
            log::error!("AQL query failed: {}", e);
            store_error(e)
        })
    }
}

const VENUE_ORDER: &str = "SORT v.created_at ASC, v.position ASC";

#[async_trait]
impl EventStore for ArangoEventStore {
    async fn insert_event(&self, row: &EventRow) -> Result<(), StoreError> {
        let mut bind_vars = HashMap::new();
        bind_vars.insert("row", serde_json::to_value(row)?);
        bind_vars.insert("created_at", Value::String(canonical_timestamp(&chrono::Utc::now())));

        let _: Vec<Value> = self
            .run(
                "INSERT MERGE(@row, { _key: @row.id, created_at: @created_at }) INTO events RETURN NEW._key",
                bind_vars,
            )
            .await?;
        Ok(())
    }

    async fn update_event(
        &self,
        id: &str,
        owner_id: &str,
        fields: &EventFields,
    ) -> Result<Option<EventRow>, StoreError> {
        let mut bind_vars = HashMap::new();
        bind_vars.insert("id", Value::String(id.to_string()));
        bind_vars.insert("owner", Value::String(owner_id.to_string()));
        bind_vars.insert("fields", serde_json::to_value(fields)?);

        let mut previous: Vec<EventRow> = self
            .run(
                r#"
                FOR e IN events
                FILTER e._key == @id AND e.user_id == @owner
                UPDATE e WITH @fields IN events OPTIONS { keepNull: true }
                RETURN OLD
                "#,
                bind_vars,
            )
            .await?;
        Ok(previous.pop())
    }

    async fn delete_event(&self, id: &str, owner_id: &str) -> Result<Option<EventRow>, StoreError> {
        let mut bind_vars = HashMap::new();
        bind_vars.insert("id", Value::String(id.to_string()));
        bind_vars.insert("owner", Value::String(owner_id.to_string()));

        let mut removed: Vec<EventRow> = self
            .run(
                r#"
                FOR e IN events
                FILTER e._key == @id AND e.user_id == @owner
                LET venues = (
                    FOR v IN event_venues
                    FILTER v.event_id == e._key
                    REMOVE v IN event_venues
                )
                REMOVE e IN events
                RETURN OLD
                "#,
                bind_vars,
            )
            .await?;
        Ok(removed.pop())
    }

    async fn find_event(&self, id: &str, owner_id: &str) -> Result<Option<EventRow>, StoreError> {
        let mut bind_vars = HashMap::new();
        bind_vars.insert("id", Value::String(id.to_string()));
        bind_vars.insert("owner", Value::String(owner_id.to_string()));

        let mut found: Vec<EventRow> = self
            .run(
                "FOR e IN events FILTER e._key == @id AND e.user_id == @owner LIMIT 1 RETURN e",
                bind_vars,
            )
            .await?;
        Ok(found.pop())
    }

    async fn insert_venues(&self, event_id: &str, names: &[String]) -> Result<Vec<EventVenueRow>, StoreError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let created_at = canonical_timestamp(&chrono::Utc::now());
        let documents: Vec<Value> = names
            .iter()
            .enumerate()
            .map(|(position, name)| {
                let id = Uuid::new_v4().to_string();
                json!({
                    "_key": id,
                    "id": id,
                    "event_id": event_id,
                    "name": name,
                    "created_at": created_at,
                    "position": position,
                })
            })
            .collect();

        let mut bind_vars = HashMap::new();
        bind_vars.insert("event_id", Value::String(event_id.to_string()));
        bind_vars.insert("venues", Value::Array(documents));

        // The event check and the inserts run as one query, so either every
        // venue lands or none does.
        self.run(
            r#"
            LET event = DOCUMENT(events, @event_id)
            FILTER event != null
            FOR v IN @venues
            INSERT v INTO event_venues
            RETURN { id: NEW.id, event_id: NEW.event_id, name: NEW.name }
            "#,
            bind_vars,
        )
        .await
        .and_then(|rows: Vec<EventVenueRow>| {
            if rows.len() == names.len() {
                Ok(rows)
            } else {
                Err(StoreError::Constraint(format!(
                    "event_venues.event_id references missing event {}",
                    event_id
                )))
            }
        })
    }

    async fn delete_venues(&self, event_id: &str) -> Result<Vec<EventVenueRow>, StoreError> {
        let mut bind_vars = HashMap::new();
        bind_vars.insert("event_id", Value::String(event_id.to_string()));

        let query = format!(
            r#"
            FOR v IN event_venues
            FILTER v.event_id == @event_id
            {}
            REMOVE v IN event_venues
            RETURN {{ id: OLD.id, event_id: OLD.event_id, name: OLD.name }}
            "#,
            VENUE_ORDER
        );
        self.run(&query, bind_vars).await
    }

    async fn list_venues(&self, event_id: &str) -> Result<Vec<EventVenueRow>, StoreError> {
        let mut bind_vars = HashMap::new();
        bind_vars.insert("event_id", Value::String(event_id.to_string()));

        let query = format!(
            r#"
            FOR v IN event_venues
            FILTER v.event_id == @event_id
            {}
            RETURN {{ id: v.id, event_id: v.event_id, name: v.name }}
            "#,
            VENUE_ORDER
        );
        self.run(&query, bind_vars).await
    }

    async fn select_events(&self, filter: &EventFilter) -> Result<Vec<Value>, StoreError> {
        let (query, bind_vars) = select_events_query(filter);
        self.run(&query, bind_vars).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.db.info().await.map(|_| ()).map_err(store_error)
    }
}

/// Builds the dashboard/detail select for `filter`.
pub fn select_events_query(filter: &EventFilter) -> (String, HashMap<&'static str, Value>) {
    let mut query_parts = vec!["FOR e IN events".to_string()];
    let mut bind_vars = HashMap::new();

    if let Some(owner_id) = &filter.owner_id {
        query_parts.push("FILTER e.user_id == @owner".to_string());
        bind_vars.insert("owner", Value::String(owner_id.clone()));
    }
    if let Some(event_id) = &filter.event_id {
        query_parts.push("FILTER e._key == @id".to_string());
        bind_vars.insert("id", Value::String(event_id.clone()));
    }
    if let Some(name) = &filter.name_contains {
        query_parts.push("FILTER CONTAINS(LOWER(e.name), LOWER(@name))".to_string());
        bind_vars.insert("name", Value::String(name.clone()));
    }
    if let Some(sport) = filter.sport_type {
        query_parts.push("FILTER e.sport_type == @sport".to_string());
        bind_vars.insert("sport", Value::String(sport.to_string()));
    }

    query_parts.push("SORT e.starts_at ASC".to_string());
    query_parts.push(format!(
        r#"RETURN MERGE(UNSET(e, "_key", "_id", "_rev", "created_at"), {{
            event_venues: (
                FOR v IN event_venues
                FILTER v.event_id == e._key
                {}
                RETURN {{ name: v.name }}
            )
        }})"#,
        VENUE_ORDER
    ));

    (query_parts.join("\n"), bind_vars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shared::models::event::SportType;

    #[test]
    fn test_select_query_without_filters() {
        let (query, bind_vars) = select_events_query(&EventFilter::default());
        assert!(query.starts_with("FOR e IN events\nSORT e.starts_at ASC"));
        assert!(bind_vars.is_empty());
    }

    #[test]
    fn test_select_query_binds_every_filter() {
        let filter = EventFilter {
            owner_id: Some("u1".to_string()),
            event_id: None,
            name_contains: Some("Cup".to_string()),
            sport_type: Some(SportType::Tennis),
        };
        let (query, bind_vars) = select_events_query(&filter);

        assert!(query.contains("FILTER e.user_id == @owner"));
        assert!(query.contains("CONTAINS(LOWER(e.name), LOWER(@name))"));
        assert!(!query.contains("@id"));
        assert_eq!(bind_vars.get("sport"), Some(&Value::String("Tennis".to_string())));
        assert_eq!(bind_vars.len(), 3);
    }

    #[test]
    fn test_store_error_classification() {
        assert!(matches!(
            store_error(ClientError::HttpClient("connection refused".to_string())),
            StoreError::Network(_)
        ));
        assert!(matches!(
            store_error(ClientError::InvalidServer("not arangodb".to_string())),
            StoreError::Backend(_)
        ));
    }
}
