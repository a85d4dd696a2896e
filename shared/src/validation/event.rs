use crate::dates::{is_valid_datetime_local, parse_datetime_local};
use crate::error::Result;
use crate::models::event::SportType;
use crate::validation::field_errors::{FieldErrors, FieldPath};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;
use validator::{Validate, ValidationError};

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 2000;
pub const VENUE_MIN_CHARS: usize = 2;
pub const VENUE_MAX_CHARS: usize = 120;

pub const MSG_VENUES_REQUIRED: &str = "At least one venue is required";
pub const MSG_VENUE_LENGTH: &str = "Each venue must be between 2 and 120 characters";

/// A venue as submitted: either a bare name or a form row `{ "value": name }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum VenueInput {
    Plain(String),
    Wrapped { value: String },
}

impl VenueInput {
    pub fn as_str(&self) -> &str {
        match self {
            VenueInput::Plain(name) => name,
            VenueInput::Wrapped { value } => value,
        }
    }
}

impl From<&str> for VenueInput {
    fn from(name: &str) -> Self {
        VenueInput::Plain(name.to_string())
    }
}

impl From<String> for VenueInput {
    fn from(name: String) -> Self {
        VenueInput::Plain(name)
    }
}

/// Input accepted by the create and update actions.
///
/// Every field defaults so that missing values surface as field errors from
/// [`EventInput::validate_input`] rather than as a body parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EventInput {
    pub name: String,
    pub sport_type: String,
    pub starts_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub venues: Vec<VenueInput>,
}

/// Input that passed validation, with every field normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedEvent {
    pub name: String,
    pub sport_type: SportType,
    /// Still the datetime-local text; see [`ValidatedEvent::starts_at_utc`].
    pub starts_at: String,
    pub description: Option<String>,
    pub venues: Vec<String>,
}

impl ValidatedEvent {
    pub fn starts_at_utc(&self, tz: Tz) -> Result<DateTime<Utc>> {
        parse_datetime_local(&self.starts_at, tz)
    }
}

#[derive(Debug, Validate)]
struct ScalarFields {
    #[validate(custom = "validate_name")]
    name: String,

    #[validate(custom = "validate_sport_type")]
    sport_type: String,

    #[validate(custom = "validate_starts_at")]
    starts_at: String,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    description: Option<String>,
}

fn error_with_message(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

fn validate_name(value: &str) -> std::result::Result<(), ValidationError> {
    let length = value.chars().count();
    if length < NAME_MIN_CHARS {
        return Err(error_with_message("length", "Name must be at least 2 characters"));
    }
    if length > NAME_MAX_CHARS {
        return Err(error_with_message("length", "Name must be at most 100 characters"));
    }
    Ok(())
}

fn validate_sport_type(value: &str) -> std::result::Result<(), ValidationError> {
    value
        .parse::<SportType>()
        .map(|_| ())
        .map_err(|_| error_with_message("sport_type", "Sport type is required"))
}

fn validate_starts_at(value: &str) -> std::result::Result<(), ValidationError> {
    if value.is_empty() {
        return Err(error_with_message("required", "Start date/time is required"));
    }
    if !is_valid_datetime_local(value) {
        return Err(error_with_message(
            "datetime_local",
            "Invalid date/time format. Expected YYYY-MM-DDTHH:mm",
        ));
    }
    Ok(())
}

/// Trims, drops empties and deduplicates venue names (first occurrence wins).
///
/// Length failures are keyed by the position in the submitted list.
pub fn normalize_venues(venues: &[VenueInput]) -> std::result::Result<Vec<String>, FieldErrors> {
    let mut seen = HashSet::new();
    let mut normalized = Vec::new();
    let mut errors = FieldErrors::new();

    for (index, venue) in venues.iter().enumerate() {
        let name = venue.as_str().trim();
        if name.is_empty() || !seen.insert(name.to_string()) {
            continue;
        }
        let length = name.chars().count();
        if !(VENUE_MIN_CHARS..=VENUE_MAX_CHARS).contains(&length) {
            errors.add(FieldPath::indexed("venues", index), MSG_VENUE_LENGTH);
        }
        normalized.push(name.to_string());
    }

    if normalized.is_empty() {
        errors.add(FieldPath::field("venues"), MSG_VENUES_REQUIRED);
    }

    if errors.is_empty() {
        Ok(normalized)
    } else {
        Err(errors)
    }
}

impl EventInput {
    pub fn new(
        name: impl Into<String>,
        sport_type: SportType,
        starts_at: impl Into<String>,
        description: Option<String>,
        venues: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            sport_type: sport_type.to_string(),
            starts_at: starts_at.into(),
            description,
            venues: venues.into_iter().map(VenueInput::Plain).collect(),
        }
    }

    pub fn venue_names(&self) -> Vec<&str> {
        self.venues.iter().map(VenueInput::as_str).collect()
    }

    /// Validates and normalizes the input, collecting every failure.
    pub fn validate_input(&self) -> std::result::Result<ValidatedEvent, FieldErrors> {
        let scalars = ScalarFields {
            name: self.name.trim().to_string(),
            sport_type: self.sport_type.clone(),
            starts_at: self.starts_at.clone(),
            description: self
                .description
                .as_deref()
                .map(str::trim)
                .filter(|description| !description.is_empty())
                .map(str::to_string),
        };

        let mut errors = match scalars.validate() {
            Ok(()) => FieldErrors::new(),
            Err(validation_errors) => FieldErrors::from(validation_errors),
        };

        let venues = match normalize_venues(&self.venues) {
            Ok(venues) => venues,
            Err(venue_errors) => {
                errors.merge(venue_errors);
                Vec::new()
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        let sport_type = self
            .sport_type
            .parse::<SportType>()
            .map_err(|_| {
                let mut errors = FieldErrors::new();
                errors.add(FieldPath::field("sport_type"), "Sport type is required");
                errors
            })?;

        Ok(ValidatedEvent {
            name: scalars.name,
            sport_type,
            starts_at: scalars.starts_at,
            description: scalars.description,
            venues,
        })
    }
}
