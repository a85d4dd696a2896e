use crate::event::store::{EventFields, EventStore, StoreError};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use shared::dates::canonical_timestamp;
use shared::models::event::{EventId, EventRow};
use shared::result::MSG_EVENT_NOT_FOUND;
use shared::validation::ValidatedEvent;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Event not found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RepositoryError {
    pub fn user_message(&self) -> &'static str {
        match self {
            RepositoryError::NotFound => MSG_EVENT_NOT_FOUND,
            RepositoryError::Store(err) => err.user_message(),
        }
    }
}

/// Event mutations. Each operation spans several store calls; a failure
/// part way through is compensated where possible.
#[async_trait::async_trait]
pub trait EventsRepository: Send + Sync {
    async fn create(
        &self,
        data: &ValidatedEvent,
        owner_id: &str,
        starts_at: DateTime<Utc>,
    ) -> Result<EventId, RepositoryError>;

    async fn update(
        &self,
        id: &str,
        data: &ValidatedEvent,
        owner_id: &str,
        starts_at: DateTime<Utc>,
    ) -> Result<EventId, RepositoryError>;

    async fn delete(&self, id: &str, owner_id: &str) -> Result<(), RepositoryError>;

    async fn create_venues(&self, event_id: &str, venues: &[String]) -> Result<(), RepositoryError>;

    async fn delete_venues(&self, event_id: &str) -> Result<(), RepositoryError>;
}

#[derive(Clone)]
pub struct EventsRepositoryImpl {
    pub store: Arc<dyn EventStore>,
}

impl EventsRepositoryImpl {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    fn fields(data: &ValidatedEvent, starts_at: DateTime<Utc>) -> EventFields {
        EventFields {
            name: data.name.clone(),
            sport_type: data.sport_type,
            starts_at: canonical_timestamp(&starts_at),
            description: data.description.clone(),
        }
    }

    /// Puts back the fields and venues an update replaced. Failures here are
    /// logged and swallowed; the caller reports the original error.
    async fn restore(&self, previous: &EventRow, owner_id: &str, venues: Option<Vec<String>>) {
        if let Err(e) = self
            .store
            .update_event(&previous.id, owner_id, &EventFields::from(previous))
            .await
        {
            error!(
                "Failed to restore fields after venue update failure: event_id={} user_id={} error={}",
                previous.id, owner_id, e
            );
            return;
        }

        let Some(venues) = venues else {
            return;
        };
        let restored = async {
            // Drop whatever part of the new set made it in before the failure.
            self.store.delete_venues(&previous.id).await?;
            self.create_venues(&previous.id, &venues).await
        };
        if let Err(e) = restored.await {
            error!(
                "Failed to restore venues after venue update failure, event left partially updated: event_id={} user_id={} error={}",
                previous.id, owner_id, e
            );
        }
    }
}

#[async_trait::async_trait]
impl EventsRepository for EventsRepositoryImpl {
    async fn create(
        &self,
        data: &ValidatedEvent,
        owner_id: &str,
        starts_at: DateTime<Utc>,
    ) -> Result<EventId, RepositoryError> {
        let fields = Self::fields(data, starts_at);
        let row = EventRow {
            id: Uuid::new_v4().to_string(),
            user_id: owner_id.to_string(),
            name: fields.name,
            sport_type: fields.sport_type,
            starts_at: fields.starts_at,
            description: fields.description,
        };

        self.store.insert_event(&row).await.map_err(|e| {
            error!("Event creation error: user_id={} error={}", owner_id, e);
            RepositoryError::from(e)
        })?;

        if let Err(venues_error) = self.create_venues(&row.id, &data.venues).await {
            error!(
                "Venues creation error, removing event: event_id={} user_id={} error={}",
                row.id, owner_id, venues_error
            );
            if let Err(e) = self.store.delete_event(&row.id, owner_id).await {
                error!(
                    "Failed to remove event after venue failure: event_id={} user_id={} error={}",
                    row.id, owner_id, e
                );
            }
            return Err(venues_error);
        }

        info!("Event created: event_id={} user_id={}", row.id, owner_id);
        Ok(EventId { id: row.id })
    }

    async fn update(
        &self,
        id: &str,
        data: &ValidatedEvent,
        owner_id: &str,
        starts_at: DateTime<Utc>,
    ) -> Result<EventId, RepositoryError> {
        let fields = Self::fields(data, starts_at);
        let previous = self
            .store
            .update_event(id, owner_id, &fields)
            .await
            .map_err(|e| {
                error!("Event update error: event_id={} user_id={} error={}", id, owner_id, e);
                RepositoryError::from(e)
            })?
            .ok_or(RepositoryError::NotFound)?;

        let removed = match self.store.delete_venues(id).await {
            Ok(removed) => removed,
            Err(e) => {
                error!("Venues update error: event_id={} user_id={} error={}", id, owner_id, e);
                self.restore(&previous, owner_id, None).await;
                return Err(e.into());
            }
        };

        if let Err(e) = self.create_venues(id, &data.venues).await {
            error!("Venues update error: event_id={} user_id={} error={}", id, owner_id, e);
            let previous_venues = removed.into_iter().map(|venue| venue.name).collect();
            self.restore(&previous, owner_id, Some(previous_venues)).await;
            return Err(e);
        }

        info!("Event updated: event_id={} user_id={}", id, owner_id);
        Ok(EventId { id: id.to_string() })
    }

    async fn delete(&self, id: &str, owner_id: &str) -> Result<(), RepositoryError> {
        let deleted = self.store.delete_event(id, owner_id).await.map_err(|e| {
            error!("Event deletion error: event_id={} user_id={} error={}", id, owner_id, e);
            RepositoryError::from(e)
        })?;

        match deleted {
            Some(_) => {
                info!("Event deleted: event_id={} user_id={}", id, owner_id);
                Ok(())
            }
            None => {
                warn!("Delete matched no event: event_id={} user_id={}", id, owner_id);
                Err(RepositoryError::NotFound)
            }
        }
    }

    async fn create_venues(&self, event_id: &str, venues: &[String]) -> Result<(), RepositoryError> {
        if venues.is_empty() {
            return Ok(());
        }
        self.store.insert_venues(event_id, venues).await?;
        Ok(())
    }

    async fn delete_venues(&self, event_id: &str) -> Result<(), RepositoryError> {
        self.store.delete_venues(event_id).await?;
        Ok(())
    }
}
