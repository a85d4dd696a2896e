use crate::dates::format_datetime_local;
use crate::models::event::SportType;
use crate::validation::{EventInput, FieldErrors, FieldPath, VenueInput};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One row of the venue list in the form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VenueFormItem {
    pub value: String,
}

impl VenueFormItem {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into() }
    }
}

/// Values held by the create/edit event form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventFormValues {
    pub name: String,
    pub sport_type: SportType,
    pub starts_at: String,
    pub description: String,
    pub venues: Vec<VenueFormItem>,
}

/// Initial form values: blank for a new event, or the edit data with the
/// start time shown as a datetime-local value in `tz`.
pub fn default_values(initial: Option<&EventInput>, tz: Tz) -> EventFormValues {
    let Some(initial) = initial else {
        return EventFormValues {
            name: String::new(),
            sport_type: SportType::default(),
            starts_at: String::new(),
            description: String::new(),
            venues: vec![VenueFormItem::default()],
        };
    };

    let venues: Vec<VenueFormItem> = initial
        .venue_names()
        .into_iter()
        .map(VenueFormItem::new)
        .collect();

    EventFormValues {
        name: initial.name.clone(),
        sport_type: initial.sport_type.parse().unwrap_or_default(),
        starts_at: format_datetime_local(&initial.starts_at, tz).unwrap_or_default(),
        description: initial.description.clone().unwrap_or_default(),
        venues: if venues.is_empty() {
            vec![VenueFormItem::default()]
        } else {
            venues
        },
    }
}

/// Action input built from the form, plus the form row each submitted venue
/// came from (`venue_form_indices[i]` is the row of `input.venues[i]`).
#[derive(Debug, Clone, PartialEq)]
pub struct EventSubmission {
    pub input: EventInput,
    pub venue_form_indices: Vec<usize>,
}

pub fn to_submission(values: &EventFormValues) -> EventSubmission {
    let mut venues = Vec::new();
    let mut venue_form_indices = Vec::new();
    for (row, item) in values.venues.iter().enumerate() {
        let name = item.value.trim();
        if !name.is_empty() {
            venues.push(VenueInput::Plain(name.to_string()));
            venue_form_indices.push(row);
        }
    }

    EventSubmission {
        input: EventInput {
            name: values.name.clone(),
            sport_type: values.sport_type.to_string(),
            starts_at: values.starts_at.clone(),
            description: Some(values.description.clone()).filter(|description| !description.is_empty()),
            venues,
        },
        venue_form_indices,
    }
}

/// A form input that can carry an error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
    Name,
    SportType,
    StartsAt,
    Description,
    /// The venue list as a whole.
    Venues,
    /// The value input of one venue row.
    VenueValue(usize),
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormField::Name => f.write_str("name"),
            FormField::SportType => f.write_str("sport_type"),
            FormField::StartsAt => f.write_str("starts_at"),
            FormField::Description => f.write_str("description"),
            FormField::Venues => f.write_str("venues"),
            FormField::VenueValue(row) => write!(f, "venues.{}.value", row),
        }
    }
}

/// Maps a server field path onto the form. Indexed venue errors are
/// translated back to the form row the venue was typed in.
pub fn map_event_field_error(path: &FieldPath, submission: &EventSubmission) -> Option<FormField> {
    match (path.field.as_str(), path.index) {
        ("name", _) => Some(FormField::Name),
        ("sport_type", _) => Some(FormField::SportType),
        ("starts_at", _) => Some(FormField::StartsAt),
        ("description", _) => Some(FormField::Description),
        ("venues", None) => Some(FormField::Venues),
        ("venues", Some(index)) => Some(
            submission
                .venue_form_indices
                .get(index)
                .map(|row| FormField::VenueValue(*row))
                .unwrap_or(FormField::Venues),
        ),
        _ => None,
    }
}

/// Receives per-field errors for display next to the inputs.
pub trait FormErrorSink {
    fn set_error(&mut self, field: FormField, message: String);
}

/// Plain error map, one message per field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(BTreeMap<FormField, String>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: FormField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl FormErrorSink for FormErrors {
    fn set_error(&mut self, field: FormField, message: String) {
        self.0.insert(field, message);
    }
}

/// Pushes the first message of every mappable server error into `sink`.
pub fn apply_server_field_errors<S>(sink: &mut S, errors: &FieldErrors, submission: &EventSubmission)
where
    S: FormErrorSink + ?Sized,
{
    for (path, messages) in errors.iter() {
        let Some(field) = map_event_field_error(path, submission) else {
            continue;
        };
        if let Some(message) = messages.first() {
            sink.set_error(field, message.clone());
        }
    }
}
