pub mod models {
    pub mod account;
    pub mod event;
}

pub mod dashboard;
pub mod dates;
pub mod error;
pub mod forms;
pub mod realtime;
pub mod result;
pub mod validation;

// Re-export commonly used items
pub use error::{Result, SharedError};

// Re-export models
pub use models::{
    account::{AuthUser, Credentials, SessionResponse},
    event::{
        parse_event_id, EventId, EventRow, EventVenue, EventVenueRow, EventWithVenues,
        EventWithVenuesAndOwner, SportType, SPORT_TYPES,
    },
};

pub use result::{ActionFailure, ActionResult, ActionSuccess, QueryError, QueryResult};
pub use validation::{EventInput, FieldErrors, FieldPath, ValidatedEvent, VenueInput};
