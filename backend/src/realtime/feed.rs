use crate::event::store::{EventFields, EventFilter, EventStore, StoreError};
use crate::realtime::hub::RealtimeHub;
use async_trait::async_trait;
use log::warn;
use serde_json::Value;
use shared::models::event::{EventRow, EventVenueRow};
use shared::realtime::ChangeFeedMessage;
use std::sync::Arc;

/// Wraps an [`EventStore`] and publishes a change message to the hub for
/// every row a successful call touched. Publishing never fails the call.
pub struct FeedPublishingStore {
    inner: Arc<dyn EventStore>,
    hub: RealtimeHub,
}

impl FeedPublishingStore {
    pub fn new(inner: Arc<dyn EventStore>, hub: RealtimeHub) -> Self {
        Self { inner, hub }
    }

    /// Owner of `event_id`, used to route venue changes.
    async fn owner_of(&self, event_id: &str) -> Option<String> {
        match self.inner.select_events(&EventFilter::by_id(event_id)).await {
            Ok(rows) => rows
                .first()
                .and_then(|row| row.get("user_id"))
                .and_then(Value::as_str)
                .map(str::to_string),
            Err(e) => {
                warn!("Could not resolve owner for venue changes: event_id={} error={}", event_id, e);
                None
            }
        }
    }

    async fn publish_venues<F>(&self, event_id: &str, rows: &[EventVenueRow], message: F)
    where
        F: Fn(&EventVenueRow) -> ChangeFeedMessage,
    {
        if rows.is_empty() {
            return;
        }
        if let Some(owner_id) = self.owner_of(event_id).await {
            for row in rows {
                self.hub.publish(&owner_id, message(row));
            }
        }
    }
}

#[async_trait]
impl EventStore for FeedPublishingStore {
    async fn insert_event(&self, row: &EventRow) -> Result<(), StoreError> {
        self.inner.insert_event(row).await?;
        self.hub.publish(&row.user_id, ChangeFeedMessage::event_inserted(row.clone()));
        Ok(())
    }

    async fn update_event(
        &self,
        id: &str,
        owner_id: &str,
        fields: &EventFields,
    ) -> Result<Option<EventRow>, StoreError> {
        let previous = self.inner.update_event(id, owner_id, fields).await?;
        if let Some(previous) = &previous {
            let updated = EventRow {
                id: previous.id.clone(),
                user_id: previous.user_id.clone(),
                name: fields.name.clone(),
                sport_type: fields.sport_type,
                starts_at: fields.starts_at.clone(),
                description: fields.description.clone(),
            };
            self.hub.publish(&updated.user_id, ChangeFeedMessage::event_updated(updated.clone()));
        }
        Ok(previous)
    }

    async fn delete_event(&self, id: &str, owner_id: &str) -> Result<Option<EventRow>, StoreError> {
        let removed = self.inner.delete_event(id, owner_id).await?;
        if let Some(removed) = &removed {
            self.hub.publish(
                &removed.user_id,
                ChangeFeedMessage::event_deleted(removed.id.clone(), removed.user_id.clone()),
            );
        }
        Ok(removed)
    }

    async fn find_event(&self, id: &str, owner_id: &str) -> Result<Option<EventRow>, StoreError> {
        self.inner.find_event(id, owner_id).await
    }

    async fn insert_venues(&self, event_id: &str, names: &[String]) -> Result<Vec<EventVenueRow>, StoreError> {
        let inserted = self.inner.insert_venues(event_id, names).await?;
        self.publish_venues(event_id, &inserted, |row| ChangeFeedMessage::venue_inserted(row.clone()))
            .await;
        Ok(inserted)
    }

    async fn delete_venues(&self, event_id: &str) -> Result<Vec<EventVenueRow>, StoreError> {
        let removed = self.inner.delete_venues(event_id).await?;
        self.publish_venues(event_id, &removed, ChangeFeedMessage::venue_deleted)
            .await;
        Ok(removed)
    }

    async fn list_venues(&self, event_id: &str) -> Result<Vec<EventVenueRow>, StoreError> {
        self.inner.list_venues(event_id).await
    }

    async fn select_events(&self, filter: &EventFilter) -> Result<Vec<Value>, StoreError> {
        self.inner.select_events(filter).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }
}
