pub mod event;
pub mod field_errors;

pub use event::{normalize_venues, EventInput, ValidatedEvent, VenueInput};
pub use field_errors::{FieldErrors, FieldPath};
