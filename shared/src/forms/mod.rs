pub mod event_form;
pub mod submit;

pub use event_form::{
    apply_server_field_errors, default_values, map_event_field_error, to_submission,
    EventFormValues, EventSubmission, FormErrorSink, FormErrors, FormField, VenueFormItem,
};
pub use submit::{
    EventFormAction, EventFormHandler, FormState, Notifier, SubmitOptions, SubmitOutcome,
};
