use crate::forms::event_form::{apply_server_field_errors, to_submission, EventFormValues, FormErrorSink};
use crate::models::event::EventId;
use crate::result::{ActionResult, ActionSuccess};
use crate::validation::EventInput;
use async_trait::async_trait;
use log::{debug, warn};
use std::sync::atomic::{AtomicU8, Ordering};

/// Server mutation invoked by the form (create or update).
#[async_trait]
pub trait EventFormAction: Send + Sync {
    async fn submit(&self, input: EventInput) -> ActionResult<EventId>;
}

/// Transient user-facing notifications.
pub trait Notifier {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

pub type SuccessCallback<'a> = Box<dyn FnOnce(&ActionSuccess<EventId>) + Send + 'a>;
pub type NavigateCallback<'a> = Box<dyn FnOnce() + Send + 'a>;

/// What to do after a successful submit. `on_success` takes precedence over
/// `navigate`.
#[derive(Default)]
pub struct SubmitOptions<'a> {
    pub success_message: Option<String>,
    pub on_success: Option<SuccessCallback<'a>>,
    pub navigate: Option<NavigateCallback<'a>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Idle,
    Submitting,
    Succeeded,
}

impl FormState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => FormState::Submitting,
            2 => FormState::Succeeded,
            _ => FormState::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            FormState::Idle => 0,
            FormState::Submitting => 1,
            FormState::Succeeded => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Succeeded(EventId),
    /// Field errors were pushed to the form.
    Invalid,
    /// A non-field failure was shown as a notification.
    Failed(String),
    /// Another submit was still in flight.
    Refused,
}

/// Drives one event form through `Idle -> Submitting -> Succeeded` (or back
/// to `Idle` on failure).
#[derive(Debug)]
pub struct EventFormHandler {
    state: AtomicU8,
}

impl Default for EventFormHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventFormHandler {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(FormState::Idle.as_u8()),
        }
    }

    pub fn state(&self) -> FormState {
        FormState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_submitting(&self) -> bool {
        self.state() == FormState::Submitting
    }

    pub async fn submit<A, S, N>(
        &self,
        values: &EventFormValues,
        action: &A,
        errors: &mut S,
        notifier: &N,
        options: SubmitOptions<'_>,
    ) -> SubmitOutcome
    where
        A: EventFormAction + ?Sized,
        S: FormErrorSink + ?Sized,
        N: Notifier + ?Sized,
    {
        let previous = self.state.swap(FormState::Submitting.as_u8(), Ordering::SeqCst);
        if FormState::from_u8(previous) == FormState::Submitting {
            debug!("Ignoring event form submit while a previous submit is in flight");
            return SubmitOutcome::Refused;
        }

        let submission = to_submission(values);
        let result = action.submit(submission.input.clone()).await;

        match result {
            Ok(success) => {
                self.state.store(FormState::Succeeded.as_u8(), Ordering::SeqCst);
                if let Some(message) = &options.success_message {
                    notifier.success(message);
                }
                let id = success.data.clone();
                if let Some(on_success) = options.on_success {
                    on_success(&success);
                } else if let Some(navigate) = options.navigate {
                    navigate();
                }
                SubmitOutcome::Succeeded(id)
            }
            Err(failure) => {
                self.state.store(FormState::Idle.as_u8(), Ordering::SeqCst);
                match failure.field_errors.as_ref().filter(|field_errors| !field_errors.is_empty()) {
                    Some(field_errors) => {
                        apply_server_field_errors(errors, field_errors, &submission);
                        SubmitOutcome::Invalid
                    }
                    None => {
                        warn!("Event form submit failed: {}", failure.message);
                        notifier.error(&failure.message);
                        SubmitOutcome::Failed(failure.message)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::event_form::{FormErrors, FormField, VenueFormItem};
    use crate::models::event::SportType;
    use crate::result::ActionFailure;
    use crate::validation::{FieldErrors, FieldPath};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingNotifier {
        messages: Mutex<Vec<String>>,
    }

    impl Notifier for RecordingNotifier {
        fn success(&self, message: &str) {
            self.messages.lock().unwrap().push(format!("success: {}", message));
        }
        fn error(&self, message: &str) {
            self.messages.lock().unwrap().push(format!("error: {}", message));
        }
    }

    struct ScriptedAction {
        result: ActionResult<EventId>,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl ScriptedAction {
        fn new(result: ActionResult<EventId>) -> Self {
            Self {
                result,
                delay: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EventFormAction for ScriptedAction {
        async fn submit(&self, _input: EventInput) -> ActionResult<EventId> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.result.clone()
        }
    }

    fn values() -> EventFormValues {
        EventFormValues {
            name: "Cup Final".to_string(),
            sport_type: SportType::Soccer,
            starts_at: "2025-01-10T10:00".to_string(),
            description: String::new(),
            venues: vec![VenueFormItem::new(""), VenueFormItem::new("Arena")],
        }
    }

    fn created() -> ActionResult<EventId> {
        Ok(ActionSuccess::new(EventId { id: "e1".to_string() }))
    }

    #[tokio::test]
    async fn test_success_prefers_callback_over_navigation() {
        let handler = EventFormHandler::new();
        let action = ScriptedAction::new(created());
        let notifier = RecordingNotifier::default();
        let mut errors = FormErrors::new();
        let seen = Mutex::new(None);
        let navigated = AtomicUsize::new(0);

        let outcome = handler
            .submit(
                &values(),
                &action,
                &mut errors,
                &notifier,
                SubmitOptions {
                    success_message: Some("Event created".to_string()),
                    on_success: Some(Box::new(|success| {
                        *seen.lock().unwrap() = Some(success.data.id.clone());
                    })),
                    navigate: Some(Box::new(|| {
                        navigated.fetch_add(1, Ordering::SeqCst);
                    })),
                },
            )
            .await;

        assert_eq!(outcome, SubmitOutcome::Succeeded(EventId { id: "e1".to_string() }));
        assert_eq!(handler.state(), FormState::Succeeded);
        assert_eq!(seen.lock().unwrap().as_deref(), Some("e1"));
        assert_eq!(navigated.load(Ordering::SeqCst), 0);
        assert_eq!(*notifier.messages.lock().unwrap(), vec!["success: Event created".to_string()]);
    }

    #[tokio::test]
    async fn test_success_navigates_without_callback() {
        let handler = EventFormHandler::new();
        let action = ScriptedAction::new(created());
        let navigated = AtomicUsize::new(0);

        handler
            .submit(
                &values(),
                &action,
                &mut FormErrors::new(),
                &RecordingNotifier::default(),
                SubmitOptions {
                    navigate: Some(Box::new(|| {
                        navigated.fetch_add(1, Ordering::SeqCst);
                    })),
                    ..SubmitOptions::default()
                },
            )
            .await;

        assert_eq!(navigated.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_field_errors_go_to_form_rows() {
        let mut field_errors = FieldErrors::new();
        field_errors.add(FieldPath::indexed("venues", 0), "Each venue must be between 2 and 120 characters");
        field_errors.add(FieldPath::field("name"), "Name must be at least 2 characters");
        field_errors.add(FieldPath::field("name"), "second message is not shown");

        let handler = EventFormHandler::new();
        let action = ScriptedAction::new(Err(ActionFailure::validation(field_errors)));
        let notifier = RecordingNotifier::default();
        let mut errors = FormErrors::new();

        let outcome = handler
            .submit(&values(), &action, &mut errors, &notifier, SubmitOptions::default())
            .await;

        assert_eq!(outcome, SubmitOutcome::Invalid);
        assert_eq!(handler.state(), FormState::Idle);
        assert_eq!(errors.get(FormField::Name), Some("Name must be at least 2 characters"));
        assert_eq!(
            errors.get(FormField::VenueValue(1)),
            Some("Each venue must be between 2 and 120 characters")
        );
        assert!(notifier.messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_other_failures_notify() {
        let handler = EventFormHandler::new();
        let action = ScriptedAction::new(Err(ActionFailure::message("Event not found")));
        let notifier = RecordingNotifier::default();
        let mut errors = FormErrors::new();

        let outcome = handler
            .submit(&values(), &action, &mut errors, &notifier, SubmitOptions::default())
            .await;

        assert_eq!(outcome, SubmitOutcome::Failed("Event not found".to_string()));
        assert!(errors.is_empty());
        assert_eq!(*notifier.messages.lock().unwrap(), vec!["error: Event not found".to_string()]);
    }

    #[tokio::test]
    async fn test_second_submit_while_in_flight_is_refused() {
        let handler = EventFormHandler::new();
        let action = ScriptedAction {
            delay: Some(Duration::from_millis(50)),
            ..ScriptedAction::new(created())
        };
        let notifier = RecordingNotifier::default();
        let mut first_errors = FormErrors::new();
        let mut second_errors = FormErrors::new();
        let form = values();

        let (first, second) = tokio::join!(
            handler.submit(&form, &action, &mut first_errors, &notifier, SubmitOptions::default()),
            async {
                tokio::task::yield_now().await;
                handler
                    .submit(&form, &action, &mut second_errors, &notifier, SubmitOptions::default())
                    .await
            }
        );

        assert!(matches!(first, SubmitOutcome::Succeeded(_)));
        assert_eq!(second, SubmitOutcome::Refused);
        assert_eq!(action.calls.load(Ordering::SeqCst), 1);
    }
}
