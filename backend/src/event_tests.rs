#[cfg(test)]
mod event_tests {
    use crate::event::error::EventActionError;
    use crate::event::memory::{InMemoryEventStore, StoreOperation};
    use crate::event::query::{DashboardQuery, EventQueries};
    use crate::event::repository::{EventsRepositoryImpl, RepositoryError};
    use crate::event::store::{EventStore, StoreError, MSG_NETWORK};
    use crate::event::usecase::EventUseCaseImpl;
    use chrono_tz::Tz;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;
    use shared::models::account::AuthUser;
    use shared::models::event::SportType;
    use shared::result::{QueryError, MSG_EVENT_NOT_FOUND};
    use shared::validation::{EventInput, FieldPath};
    use std::sync::Arc;

    struct Fixture {
        store: InMemoryEventStore,
        usecase: EventUseCaseImpl<EventsRepositoryImpl>,
        queries: EventQueries,
    }

    fn fixture_in(timezone: Tz) -> Fixture {
        let store = InMemoryEventStore::new();
        let shared: Arc<dyn EventStore> = Arc::new(store.clone());
        Fixture {
            usecase: EventUseCaseImpl::new(EventsRepositoryImpl::new(shared.clone()), timezone),
            queries: EventQueries::new(shared),
            store,
        }
    }

    fn fixture() -> Fixture {
        fixture_in(chrono_tz::UTC)
    }

    fn user(id: &str) -> AuthUser {
        AuthUser {
            id: id.to_string(),
            email: format!("{}@example.com", id),
        }
    }

    fn input(name: &str, starts_at: &str, venues: &[&str]) -> EventInput {
        EventInput::new(
            name,
            SportType::Soccer,
            starts_at,
            None,
            venues.iter().map(|venue| venue.to_string()).collect(),
        )
    }

    fn dashboard(owner: &str) -> DashboardQuery {
        DashboardQuery {
            owner_id: owner.to_string(),
            ..DashboardQuery::default()
        }
    }

    async fn create(fixture: &Fixture, owner: &str, input: EventInput) -> String {
        fixture
            .usecase
            .create_event(Some(&user(owner)), input)
            .await
            .unwrap()
            .data
            .id
    }

    #[tokio::test]
    async fn test_created_events_are_listed_in_start_order_with_venues() {
        let fixture = fixture();
        create(&fixture, "u1", input("Late Cup", "2025-07-01T10:00", &["North Field"])).await;
        create(&fixture, "u1", input("Early Cup", "2025-06-01T10:00", &["Dome", "Arena"])).await;
        create(&fixture, "u2", input("Other Cup", "2025-05-01T10:00", &["Pier"])).await;

        let events = fixture.queries.list_for_dashboard(&dashboard("u1")).await.unwrap();
        let names: Vec<&str> = events.iter().map(|event| event.name.as_str()).collect();
        assert_eq!(names, vec!["Early Cup", "Late Cup"]);
        assert_eq!(events[0].starts_at, "2025-06-01T10:00:00.000Z");

        let venues: Vec<&str> = events[0].event_venues.iter().map(|venue| venue.name.as_str()).collect();
        assert_eq!(venues, vec!["Dome", "Arena"]);
    }

    #[tokio::test]
    async fn test_start_time_is_read_in_configured_zone() {
        let fixture = fixture_in(chrono_tz::Europe::Berlin);
        create(&fixture, "u1", input("Summer Cup", "2025-06-01T10:00", &["Dome"])).await;

        let events = fixture.queries.list_for_dashboard(&dashboard("u1")).await.unwrap();
        assert_eq!(events[0].starts_at, "2025-06-01T08:00:00.000Z");
    }

    #[tokio::test]
    async fn test_start_time_in_dst_gap_is_rejected() {
        let fixture = fixture_in(chrono_tz::Europe::Berlin);
        let err = fixture
            .usecase
            .create_event(Some(&user("u1")), input("Spring Cup", "2025-03-30T02:30", &["Dome"]))
            .await
            .unwrap_err();

        assert_eq!(err, EventActionError::InvalidDateTime);
        assert_eq!(fixture.store.event_count().await, 0);
    }

    #[tokio::test]
    async fn test_venue_failure_on_create_removes_event() {
        let fixture = fixture();
        fixture
            .store
            .fail_next(StoreOperation::InsertVenues, StoreError::Network("reset by peer".into()))
            .await;

        let err = fixture
            .usecase
            .create_event(Some(&user("u1")), input("Cup", "2025-06-01T10:00", &["Dome"]))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), MSG_NETWORK);
        assert_eq!(fixture.store.event_count().await, 0);
        assert!(fixture
            .queries
            .list_for_dashboard(&dashboard("u1"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_venue_failure_on_update_restores_previous_event() {
        let fixture = fixture();
        let id = create(&fixture, "u1", input("Cup", "2025-06-01T10:00", &["Dome", "Arena"])).await;
        fixture
            .store
            .fail_next(StoreOperation::InsertVenues, StoreError::Backend("write conflict".into()))
            .await;

        let err = fixture
            .usecase
            .update_event(Some(&user("u1")), &id, input("Renamed Cup", "2025-08-01T10:00", &["Pier"]))
            .await
            .unwrap_err();
        assert!(matches!(err, EventActionError::Repository(RepositoryError::Store(_))));

        let restored = fixture.queries.get_for_edit(&id, "u1").await.unwrap();
        assert_eq!(restored.name, "Cup");
        assert_eq!(restored.starts_at, "2025-06-01T10:00:00.000Z");
        assert_eq!(restored.venue_names(), vec!["Dome", "Arena"]);
    }

    #[test_log::test(tokio::test)]
    async fn test_failed_restore_is_reported_and_original_error_returned() {
        let fixture = fixture();
        let id = create(&fixture, "u1", input("Cup", "2025-06-01T10:00", &["Dome"])).await;
        fixture
            .store
            .fail_next(StoreOperation::InsertVenues, StoreError::Network("timeout".into()))
            .await;
        fixture
            .store
            .fail_next(StoreOperation::InsertVenues, StoreError::Backend("still down".into()))
            .await;

        let err = fixture
            .usecase
            .update_event(Some(&user("u1")), &id, input("Renamed Cup", "2025-08-01T10:00", &["Pier"]))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), MSG_NETWORK);

        // Fields came back; the venue restore did not.
        let event = fixture.queries.get_for_edit(&id, "u1").await.unwrap();
        assert_eq!(event.name, "Cup");
        assert!(event.venues.is_empty());
    }

    #[tokio::test]
    async fn test_update_replaces_venues() {
        let fixture = fixture();
        let id = create(&fixture, "u1", input("Cup", "2025-06-01T10:00", &["Dome", "Arena"])).await;

        let updated = fixture
            .usecase
            .update_event(Some(&user("u1")), &id, input("Cup", "2025-06-01T10:00", &["Pier"]))
            .await
            .unwrap();
        assert_eq!(updated.data.id, id);

        let event = fixture.queries.get_for_edit(&id, "u1").await.unwrap();
        assert_eq!(event.venue_names(), vec!["Pier"]);
        assert_eq!(fixture.store.venue_count().await, 1);
    }

    #[tokio::test]
    async fn test_strangers_cannot_touch_events() {
        let fixture = fixture();
        let id = create(&fixture, "u1", input("Cup", "2025-06-01T10:00", &["Dome"])).await;

        let update = fixture
            .usecase
            .update_event(Some(&user("u2")), &id, input("Stolen", "2025-06-01T10:00", &["Dome"]))
            .await
            .unwrap_err();
        let delete = fixture.usecase.delete_event(Some(&user("u2")), &id).await.unwrap_err();

        assert_eq!(update.to_string(), MSG_EVENT_NOT_FOUND);
        assert_eq!(delete.to_string(), MSG_EVENT_NOT_FOUND);
        assert_eq!(
            fixture.queries.get_for_edit(&id, "u2").await.unwrap_err(),
            QueryError::NotFound
        );

        let view = fixture.queries.get_for_view(&id).await.unwrap();
        assert!(view.is_owned_by("u1"));
        assert!(!view.is_owned_by("u2"));
    }

    #[tokio::test]
    async fn test_delete_removes_event_and_venues() {
        let fixture = fixture();
        let id = create(&fixture, "u1", input("Cup", "2025-06-01T10:00", &["Dome", "Arena"])).await;

        fixture.usecase.delete_event(Some(&user("u1")), &id).await.unwrap();
        assert_eq!(fixture.store.event_count().await, 0);
        assert_eq!(fixture.store.venue_count().await, 0);

        let again = fixture.usecase.delete_event(Some(&user("u1")), &id).await.unwrap_err();
        assert_eq!(again, EventActionError::Repository(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_malformed_ids_never_reach_storage() {
        let fixture = fixture();
        fixture
            .store
            .fail_next(StoreOperation::UpdateEvent, StoreError::Backend("should not be hit".into()))
            .await;

        let err = fixture
            .usecase
            .update_event(Some(&user("u1")), "not-a-uuid", input("Cup", "2025-06-01T10:00", &["Dome"]))
            .await
            .unwrap_err();
        assert_eq!(err, EventActionError::InvalidEventId);

        let err = fixture.usecase.delete_event(None, "42").await.unwrap_err();
        assert_eq!(err, EventActionError::InvalidEventId);
    }

    #[tokio::test]
    async fn test_validation_runs_before_authentication() {
        let fixture = fixture();

        let err = fixture
            .usecase
            .create_event(None, input("", "2025-06-01T10:00", &[]))
            .await
            .unwrap_err();
        let EventActionError::Validation(errors) = &err else {
            panic!("expected validation failure, got {:?}", err);
        };
        assert!(errors.contains(&FieldPath::field("name")));
        assert!(errors.contains(&FieldPath::field("venues")));

        let err = fixture
            .usecase
            .create_event(None, input("Cup", "2025-06-01T10:00", &["Dome"]))
            .await
            .unwrap_err();
        assert_eq!(err, EventActionError::NotLoggedIn);
    }

    #[tokio::test]
    async fn test_unreadable_rows_are_invalid_data() {
        let fixture = fixture();
        fixture
            .store
            .insert_raw_event(json!({
                "id": "e1",
                "user_id": "u1",
                "name": "Broken",
                "sport_type": "Curling",
                "starts_at": "2025-06-01T10:00:00.000Z",
            }))
            .await;

        assert_eq!(
            fixture.queries.list_for_dashboard(&dashboard("u1")).await.unwrap_err(),
            QueryError::InvalidData
        );
    }

    #[tokio::test]
    async fn test_store_failure_is_query_failed() {
        let fixture = fixture();
        fixture
            .store
            .fail_next(StoreOperation::SelectEvents, StoreError::Network("timeout".into()))
            .await;

        assert_eq!(
            fixture.queries.list_for_dashboard(&dashboard("u1")).await.unwrap_err(),
            QueryError::QueryFailed
        );
    }

    #[tokio::test]
    async fn test_dashboard_filters_are_applied_by_the_store() {
        let fixture = fixture();
        create(&fixture, "u1", input("Summer Cup", "2025-06-01T10:00", &["Dome"])).await;
        create(
            &fixture,
            "u1",
            EventInput::new("Winter Cup", SportType::Tennis, "2025-12-01T10:00", None, vec!["Hall".into()]),
        )
        .await;

        let query = DashboardQuery {
            search_query: Some("  CUP ".to_string()),
            sport_filter: Some(SportType::Tennis),
            owner_id: "u1".to_string(),
        };
        let events = fixture.queries.list_for_dashboard(&query).await.unwrap();
        let names: Vec<&str> = events.iter().map(|event| event.name.as_str()).collect();
        assert_eq!(names, vec!["Winter Cup"]);
    }

    proptest! {
        #[test]
        fn prop_dashboard_is_sorted_by_start(days in proptest::collection::vec(1u32..28, 1..8)) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            let starts = runtime.block_on(async {
                let fixture = fixture();
                for (index, day) in days.iter().enumerate() {
                    let name = format!("Event {}", index);
                    let starts_at = format!("2025-05-{:02}T10:00", day);
                    create(&fixture, "u1", input(&name, &starts_at, &["Dome"])).await;
                }
                fixture
                    .queries
                    .list_for_dashboard(&dashboard("u1"))
                    .await
                    .unwrap()
                    .into_iter()
                    .map(|event| event.starts_at)
                    .collect::<Vec<_>>()
            });

            prop_assert_eq!(starts.len(), days.len());
            prop_assert!(starts.windows(2).all(|pair| pair[0] <= pair[1]));
        }
    }

    mod http {
        use super::*;
        use crate::app::AppState;
        use crate::event::error::{MSG_INVALID_PAYLOAD, MSG_PAYLOAD_TOO_LARGE};
        use actix_web::http::StatusCode;
        use actix_web::{test, App};
        use pretty_assertions::assert_eq;
        use serde_json::Value;
        use shared::models::account::SessionResponse;
        use shared::result::ActionFailure;

        macro_rules! app {
            ($state:expr) => {
                test::init_service(App::new().configure(|cfg| $state.configure(cfg))).await
            };
        }

        macro_rules! sign_up {
            ($app:expr, $email:expr) => {{
                let req = test::TestRequest::post()
                    .uri("/api/auth/sign-up")
                    .set_json(json!({"email": $email, "password": "secret1"}))
                    .to_request();
                let session: SessionResponse = test::call_and_read_body_json(&$app, req).await;
                format!("Bearer {}", session.session_id)
            }};
        }

        fn event_body(name: &str) -> Value {
            json!({
                "name": name,
                "sport_type": "Basketball",
                "starts_at": "2025-06-01T18:30",
                "description": "Finals",
                "venues": [{"value": "Garden"}, "Court 2"],
            })
        }

        #[actix_web::test]
        async fn test_event_lifecycle_over_http() {
            let state = AppState::in_memory(chrono_tz::UTC);
            let app = app!(state);
            let auth = sign_up!(app, "owner@example.com");

            let req = test::TestRequest::post()
                .uri("/api/events")
                .insert_header(("Authorization", auth.clone()))
                .set_json(event_body("City Finals"))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
            let created: Value = test::read_body_json(resp).await;
            let id = created["id"].as_str().unwrap().to_string();

            let req = test::TestRequest::get()
                .uri("/api/events?q=city&sport=Basketball")
                .insert_header(("Authorization", auth.clone()))
                .to_request();
            let listed: Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(listed.as_array().unwrap().len(), 1);
            assert_eq!(listed[0]["event_venues"], json!([{"name": "Garden"}, {"name": "Court 2"}]));

            let req = test::TestRequest::get()
                .uri(&format!("/api/events/{}", id))
                .insert_header(("Authorization", auth.clone()))
                .to_request();
            let view: Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(view["is_owner"], true);
            assert_eq!(view["event"]["starts_at"], "2025-06-01T18:30:00.000Z");

            let req = test::TestRequest::put()
                .uri(&format!("/api/events/{}", id))
                .insert_header(("Authorization", auth.clone()))
                .set_json(event_body("City Finals II"))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);

            let req = test::TestRequest::get()
                .uri(&format!("/api/events/{}/edit", id))
                .insert_header(("Authorization", auth.clone()))
                .to_request();
            let edit: EventInput = test::call_and_read_body_json(&app, req).await;
            assert_eq!(edit.name, "City Finals II");

            let req = test::TestRequest::delete()
                .uri(&format!("/api/events/{}", id))
                .insert_header(("Authorization", auth.clone()))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NO_CONTENT);

            let req = test::TestRequest::get()
                .uri(&format!("/api/events/{}", id))
                .insert_header(("Authorization", auth))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        }

        #[actix_web::test]
        async fn test_http_failures_use_action_failure_bodies() {
            let state = AppState::in_memory(chrono_tz::UTC);
            let app = app!(state);
            let auth = sign_up!(app, "owner@example.com");

            let req = test::TestRequest::post()
                .uri("/api/events")
                .insert_header(("Authorization", auth.clone()))
                .set_json(json!({"name": "X", "sport_type": "Soccer", "starts_at": "soon", "venues": []}))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let failure: ActionFailure = test::read_body_json(resp).await;
            assert!(failure.has_field_errors());

            let req = test::TestRequest::delete()
                .uri("/api/events/not-a-uuid")
                .insert_header(("Authorization", auth))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let failure: ActionFailure = test::read_body_json(resp).await;
            assert_eq!(failure.message, "Invalid event ID");
        }

        #[actix_web::test]
        async fn test_malformed_bodies_use_action_failure_bodies() {
            let state = AppState::in_memory(chrono_tz::UTC);
            let app = app!(state);
            let auth = sign_up!(app, "owner@example.com");

            let mut unknown_field = event_body("City Finals");
            unknown_field["owner"] = json!("x");
            let mut bad_venue = event_body("City Finals");
            bad_venue["venues"] = json!([5]);
            let mut wrong_type = event_body("City Finals");
            wrong_type["name"] = json!(42);

            for body in [unknown_field, bad_venue, wrong_type] {
                let req = test::TestRequest::post()
                    .uri("/api/events")
                    .insert_header(("Authorization", auth.clone()))
                    .set_json(body)
                    .to_request();
                let resp = test::call_service(&app, req).await;
                assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
                let failure: ActionFailure = test::read_body_json(resp).await;
                assert_eq!(failure.message, MSG_INVALID_PAYLOAD);
                assert!(!failure.has_field_errors());
            }

            let req = test::TestRequest::post()
                .uri("/api/events")
                .insert_header(("Authorization", auth))
                .insert_header(("Content-Type", "application/json"))
                .set_payload(vec![b'x'; crate::app::JSON_BODY_LIMIT + 1])
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
            let failure: ActionFailure = test::read_body_json(resp).await;
            assert_eq!(failure.message, MSG_PAYLOAD_TOO_LARGE);
        }

        #[actix_web::test]
        async fn test_other_users_see_view_but_not_edit() {
            let state = AppState::in_memory(chrono_tz::UTC);
            let app = app!(state);
            let owner = sign_up!(app, "owner@example.com");
            let visitor = sign_up!(app, "visitor@example.com");

            let req = test::TestRequest::post()
                .uri("/api/events")
                .insert_header(("Authorization", owner))
                .set_json(event_body("City Finals"))
                .to_request();
            let created: Value = test::call_and_read_body_json(&app, req).await;
            let id = created["id"].as_str().unwrap().to_string();

            let req = test::TestRequest::get()
                .uri(&format!("/api/events/{}", id))
                .insert_header(("Authorization", visitor.clone()))
                .to_request();
            let view: Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(view["is_owner"], false);

            let req = test::TestRequest::get()
                .uri(&format!("/api/events/{}/edit", id))
                .insert_header(("Authorization", visitor.clone()))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);

            let req = test::TestRequest::get()
                .uri("/api/events")
                .insert_header(("Authorization", visitor))
                .to_request();
            let listed: Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(listed, json!([]));
        }

        #[actix_web::test]
        async fn test_events_require_a_session() {
            let state = AppState::in_memory(chrono_tz::UTC);
            let app = app!(state);

            let req = test::TestRequest::get().uri("/api/events").to_request();
            let err = test::try_call_service(&app, req).await.unwrap_err();
            assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);
        }
    }
}
