#[cfg(test)]
mod realtime_tests {
    use crate::event::memory::{InMemoryEventStore, StoreOperation};
    use crate::event::query::{DashboardQuery, EventQueries};
    use crate::event::repository::EventsRepositoryImpl;
    use crate::event::store::{EventStore, StoreError};
    use crate::event::usecase::EventUseCaseImpl;
    use crate::realtime::feed::FeedPublishingStore;
    use crate::realtime::hub::{RealtimeHub, Subscription};
    use pretty_assertions::assert_eq;
    use shared::models::account::AuthUser;
    use shared::models::event::{EventRow, EventVenueRow, EventWithVenues, SportType};
    use shared::realtime::{dashboard_channel, DashboardEvents, EventSubscriptionHandlers, VenueSubscriptionHandlers};
    use shared::validation::EventInput;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// A subscriber's dashboard plus a tick per applied notification.
    #[derive(Clone)]
    struct LiveDashboard {
        events: Arc<Mutex<DashboardEvents>>,
        ticks: mpsc::UnboundedSender<()>,
    }

    impl LiveDashboard {
        fn apply(&self, f: impl FnOnce(&mut DashboardEvents)) {
            if let Ok(mut events) = self.events.lock() {
                f(&mut events);
            }
            let _ = self.ticks.send(());
        }
    }

    impl EventSubscriptionHandlers for LiveDashboard {
        fn on_insert(&mut self, row: EventRow) {
            self.apply(|events| EventSubscriptionHandlers::on_insert(events, row));
        }

        fn on_update(&mut self, row: EventRow) {
            self.apply(|events| EventSubscriptionHandlers::on_update(events, row));
        }

        fn on_delete(&mut self, event_id: String) {
            self.apply(|events| EventSubscriptionHandlers::on_delete(events, event_id));
        }
    }

    impl VenueSubscriptionHandlers for LiveDashboard {
        fn on_insert(&mut self, row: EventVenueRow) {
            self.apply(|events| VenueSubscriptionHandlers::on_insert(events, row));
        }

        fn on_delete(&mut self, row: EventVenueRow) {
            self.apply(|events| VenueSubscriptionHandlers::on_delete(events, row));
        }

        fn on_update(&mut self, new: EventVenueRow, old: EventVenueRow) {
            self.apply(|events| VenueSubscriptionHandlers::on_update(events, new, old));
        }
    }

    struct Watcher {
        events: Arc<Mutex<DashboardEvents>>,
        ticks: mpsc::UnboundedReceiver<()>,
        _subscription: Subscription,
    }

    impl Watcher {
        fn watch(hub: &RealtimeHub, user_id: &str) -> Self {
            let events = Arc::new(Mutex::new(DashboardEvents::default()));
            let (tx, ticks) = mpsc::unbounded_channel();
            let live = LiveDashboard {
                events: events.clone(),
                ticks: tx,
            };
            let subscription =
                hub.subscribe_to_both(&dashboard_channel(user_id), user_id, live.clone(), live, None);
            Self {
                events,
                ticks,
                _subscription: subscription,
            }
        }

        async fn wait_for(&mut self, notifications: usize) {
            for _ in 0..notifications {
                tokio::time::timeout(Duration::from_secs(2), self.ticks.recv())
                    .await
                    .expect("timed out waiting for change notification")
                    .expect("subscription closed");
            }
        }

        fn snapshot(&self) -> Vec<EventWithVenues> {
            self.events.lock().map(|events| events.events().to_vec()).unwrap_or_default()
        }
    }

    struct Fixture {
        raw: InMemoryEventStore,
        hub: RealtimeHub,
        usecase: EventUseCaseImpl<EventsRepositoryImpl>,
        queries: EventQueries,
    }

    fn fixture() -> Fixture {
        let raw = InMemoryEventStore::new();
        let hub = RealtimeHub::default();
        let store: Arc<dyn EventStore> =
            Arc::new(FeedPublishingStore::new(Arc::new(raw.clone()), hub.clone()));
        Fixture {
            usecase: EventUseCaseImpl::new(EventsRepositoryImpl::new(store.clone()), chrono_tz::UTC),
            queries: EventQueries::new(store),
            raw,
            hub,
        }
    }

    fn user(id: &str) -> AuthUser {
        AuthUser {
            id: id.to_string(),
            email: format!("{}@example.com", id),
        }
    }

    fn input(name: &str, venues: &[&str]) -> EventInput {
        EventInput::new(
            name,
            SportType::Tennis,
            "2025-06-01T10:00",
            Some("Doubles".to_string()),
            venues.iter().map(|venue| venue.to_string()).collect(),
        )
    }

    async fn listed(fixture: &Fixture, owner: &str) -> Vec<EventWithVenues> {
        fixture
            .queries
            .list_for_dashboard(&DashboardQuery {
                owner_id: owner.to_string(),
                ..DashboardQuery::default()
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_live_dashboard_converges_with_query() {
        let fixture = fixture();
        let mut owner = Watcher::watch(&fixture.hub, "u1");

        let id = fixture
            .usecase
            .create_event(Some(&user("u1")), input("Open", &["Court 1", "Court 2"]))
            .await
            .unwrap()
            .data
            .id;
        owner.wait_for(3).await;
        assert_eq!(owner.snapshot(), listed(&fixture, "u1").await);

        fixture
            .usecase
            .update_event(Some(&user("u1")), &id, input("Open Finals", &["Center Court"]))
            .await
            .unwrap();
        // event update, two venue deletes, one venue insert
        owner.wait_for(4).await;
        assert_eq!(owner.snapshot(), listed(&fixture, "u1").await);
        assert_eq!(owner.snapshot()[0].name, "Open Finals");

        fixture.usecase.delete_event(Some(&user("u1")), &id).await.unwrap();
        owner.wait_for(1).await;
        assert!(owner.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_changes_reach_only_the_owner() {
        let fixture = fixture();
        let mut owner = Watcher::watch(&fixture.hub, "u1");
        let mut stranger = Watcher::watch(&fixture.hub, "u2");

        fixture
            .usecase
            .create_event(Some(&user("u1")), input("Open", &["Court 1"]))
            .await
            .unwrap();
        owner.wait_for(2).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(stranger.ticks.try_recv().is_err());
        assert!(stranger.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_compensated_update_converges_back() {
        let fixture = fixture();
        let mut owner = Watcher::watch(&fixture.hub, "u1");
        let id = fixture
            .usecase
            .create_event(Some(&user("u1")), input("Open", &["Court 1"]))
            .await
            .unwrap()
            .data
            .id;
        owner.wait_for(2).await;

        fixture
            .raw
            .fail_next(StoreOperation::InsertVenues, StoreError::Network("timeout".into()))
            .await;
        assert!(fixture
            .usecase
            .update_event(Some(&user("u1")), &id, input("Renamed", &["Court 9"]))
            .await
            .is_err());

        // update, venue delete, restore update, restored venue insert
        owner.wait_for(4).await;
        let live = owner.snapshot();
        assert_eq!(live, listed(&fixture, "u1").await);
        assert_eq!(live[0].name, "Open");
    }

    #[tokio::test]
    async fn test_failed_mutations_publish_nothing() {
        let fixture = fixture();
        let mut owner = Watcher::watch(&fixture.hub, "u1");
        fixture
            .raw
            .fail_next(StoreOperation::InsertEvent, StoreError::Duplicate("exists".into()))
            .await;

        assert!(fixture
            .usecase
            .create_event(Some(&user("u1")), input("Open", &["Court 1"]))
            .await
            .is_err());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(owner.ticks.try_recv().is_err());
    }
}
