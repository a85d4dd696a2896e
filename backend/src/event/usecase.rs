use crate::event::error::EventActionError;
use crate::event::repository::EventsRepository;
use chrono_tz::Tz;
use log::{debug, warn};
use shared::models::account::AuthUser;
use shared::models::event::{parse_event_id, EventId};
use shared::result::ActionSuccess;
use shared::validation::{EventInput, ValidatedEvent};

pub type EventActionResult<T> = Result<ActionSuccess<T>, EventActionError>;

/// Server actions for events: validation, authentication, then the
/// repository. Validation always runs before the session is consulted.
pub struct EventUseCaseImpl<R: EventsRepository> {
    pub repo: R,
    /// Zone the datetime-local input is read in.
    pub timezone: Tz,
}

fn require_user(user: Option<&AuthUser>) -> Result<&AuthUser, EventActionError> {
    user.ok_or_else(|| {
        debug!("Event action refused: no authenticated user");
        EventActionError::NotLoggedIn
    })
}

fn require_event_id(event_id: &str) -> Result<String, EventActionError> {
    parse_event_id(event_id)
        .map(|id| id.to_string())
        .ok_or_else(|| {
            debug!("Event action refused: malformed event id {:?}", event_id);
            EventActionError::InvalidEventId
        })
}

impl<R: EventsRepository> EventUseCaseImpl<R> {
    pub fn new(repo: R, timezone: Tz) -> Self {
        Self { repo, timezone }
    }

    fn validate(input: &EventInput) -> Result<ValidatedEvent, EventActionError> {
        input.validate_input().map_err(EventActionError::Validation)
    }

    fn starts_at(&self, data: &ValidatedEvent) -> Result<chrono::DateTime<chrono::Utc>, EventActionError> {
        data.starts_at_utc(self.timezone).map_err(|e| {
            warn!("Rejected start time {:?}: {}", data.starts_at, e);
            EventActionError::InvalidDateTime
        })
    }

    pub async fn create_event(
        &self,
        user: Option<&AuthUser>,
        input: EventInput,
    ) -> EventActionResult<EventId> {
        let data = Self::validate(&input)?;
        let user = require_user(user)?;
        let starts_at = self.starts_at(&data)?;

        let id = self.repo.create(&data, &user.id, starts_at).await?;
        Ok(ActionSuccess::new(id))
    }

    pub async fn update_event(
        &self,
        user: Option<&AuthUser>,
        event_id: &str,
        input: EventInput,
    ) -> EventActionResult<EventId> {
        let event_id = require_event_id(event_id)?;
        let data = Self::validate(&input)?;
        let user = require_user(user)?;
        let starts_at = self.starts_at(&data)?;

        let id = self.repo.update(&event_id, &data, &user.id, starts_at).await?;
        Ok(ActionSuccess::new(id))
    }

    pub async fn delete_event(&self, user: Option<&AuthUser>, event_id: &str) -> EventActionResult<()> {
        let event_id = require_event_id(event_id)?;
        let user = require_user(user)?;

        self.repo.delete(&event_id, &user.id).await?;
        Ok(ActionSuccess::new(()))
    }
}
