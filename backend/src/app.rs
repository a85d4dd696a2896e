use crate::account::repository::{AccountRepository, MemoryAccountRepository};
use crate::account::session::{MemorySessionStore, SessionStore};
use crate::account::usecase::AccountUseCaseImpl;
use crate::auth::AuthMiddleware;
use crate::event::error::json_error_handler;
use crate::event::memory::InMemoryEventStore;
use crate::event::query::EventQueries;
use crate::event::repository::EventsRepositoryImpl;
use crate::event::store::EventStore;
use crate::event::usecase::EventUseCaseImpl;
use crate::realtime::feed::FeedPublishingStore;
use crate::realtime::hub::RealtimeHub;
use actix_web::web;
use chrono_tz::Tz;
use std::sync::Arc;

pub const JSON_BODY_LIMIT: usize = 256 * 1024;

/// Shared services handed to every worker.
#[derive(Clone)]
pub struct AppState {
    /// Publishes every successful mutation to `hub`.
    pub store: Arc<dyn EventStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub accounts: Arc<dyn AccountRepository>,
    pub hub: RealtimeHub,
    pub timezone: Tz,
}

impl AppState {
    pub fn new(
        store: Arc<dyn EventStore>,
        sessions: Arc<dyn SessionStore>,
        accounts: Arc<dyn AccountRepository>,
        hub: RealtimeHub,
        timezone: Tz,
    ) -> Self {
        let store: Arc<dyn EventStore> = Arc::new(FeedPublishingStore::new(store, hub.clone()));
        Self {
            store,
            sessions,
            accounts,
            hub,
            timezone,
        }
    }

    /// Everything in process memory; used in development and tests.
    pub fn in_memory(timezone: Tz) -> Self {
        Self::new(
            Arc::new(InMemoryEventStore::new()),
            Arc::new(MemorySessionStore::new()),
            Arc::new(MemoryAccountRepository::new()),
            RealtimeHub::default(),
            timezone,
        )
    }

    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        let json = web::JsonConfig::default()
            .limit(JSON_BODY_LIMIT)
            .error_handler(json_error_handler);

        cfg.app_data(json)
            .app_data(web::Data::from(self.store.clone()))
            .app_data(web::Data::from(self.sessions.clone()))
            .app_data(web::Data::new(self.hub.clone()))
            .app_data(web::Data::new(AccountUseCaseImpl::new(self.accounts.clone())))
            .app_data(web::Data::new(EventUseCaseImpl::new(
                EventsRepositoryImpl::new(self.store.clone()),
                self.timezone,
            )))
            .app_data(web::Data::new(EventQueries::new(self.store.clone())))
            .service(crate::health::health_check)
            .service(crate::health::detailed_health_check)
            .service(crate::dashboard::apply_filters_handler)
            .service(crate::realtime::controller::realtime_handler)
            .service(
                web::scope("/api/auth")
                    .service(crate::account::controller::sign_up_handler)
                    .service(crate::account::controller::sign_in_handler)
                    .service(crate::account::controller::sign_out_handler),
            )
            .service(
                web::scope("/api/events")
                    .wrap(AuthMiddleware {
                        sessions: self.sessions.clone(),
                    })
                    .configure(crate::event::controller::configure),
            );
    }
}
