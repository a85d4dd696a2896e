use actix_web::{App, HttpServer};
use anyhow::{anyhow, Context};
use backend::account::repository::{AccountRepository, AccountRepositoryImpl, MemoryAccountRepository};
use backend::account::session::{MemorySessionStore, RedisSessionStore, SessionStore};
use backend::app::AppState;
use backend::config::{Config, SessionBackend, StorageBackend};
use backend::event::arango::ArangoEventStore;
use backend::event::memory::InMemoryEventStore;
use backend::event::store::EventStore;
use backend::realtime::hub::RealtimeHub;
use log::{info, warn};
use std::sync::Arc;

async fn connect_storage(
    config: &Config,
) -> anyhow::Result<(Arc<dyn EventStore>, Arc<dyn AccountRepository>)> {
    match config.storage.backend {
        StorageBackend::Memory => {
            warn!("Using in-memory storage; data is lost on restart");
            Ok((
                Arc::new(InMemoryEventStore::new()),
                Arc::new(MemoryAccountRepository::new()),
            ))
        }
        StorageBackend::ArangoDb => {
            let conn = arangors::Connection::establish_basic_auth(
                &config.storage.url,
                &config.storage.username,
                &config.storage.password,
            )
            .await
            .with_context(|| format!("Failed to connect to ArangoDB at {}", config.storage.url))?;
            let db = conn
                .db(&config.storage.name)
                .await
                .with_context(|| format!("Failed to open ArangoDB database {}", config.storage.name))?;

            let events = ArangoEventStore::new(db.clone());
            events
                .ensure_collections()
                .await
                .context("Failed to prepare event collections")?;
            let accounts = AccountRepositoryImpl::new(db);
            accounts
                .ensure_collection()
                .await
                .context("Failed to prepare account collection")?;

            info!("Connected to ArangoDB database {}", config.storage.name);
            Ok((Arc::new(events), Arc::new(accounts)))
        }
    }
}

fn connect_sessions(config: &Config) -> anyhow::Result<Arc<dyn SessionStore>> {
    match config.sessions.backend {
        SessionBackend::Memory => {
            warn!("Using in-memory sessions; sessions are lost on restart");
            Ok(Arc::new(MemorySessionStore::new()))
        }
        SessionBackend::Redis => {
            let client = redis::Client::open(config.sessions.redis_url.clone())
                .context("Failed to create Redis client")?;
            Ok(Arc::new(RedisSessionStore::new(client, config.sessions.ttl_seconds)))
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().map_err(|e| anyhow!("Failed to load configuration: {}", e))?;
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(config.logging.filter.clone()));
    info!("Configuration loaded for {:?}", config.environment);

    let (store, accounts) = connect_storage(&config).await?;
    let sessions = connect_sessions(&config)?;
    let hub = RealtimeHub::new(config.realtime.channel_capacity);
    let state = AppState::new(store, sessions, accounts, hub, config.events.timezone());

    info!(
        "Starting server on {}:{} with {} workers",
        config.server.host, config.server.port, config.server.workers
    );

    HttpServer::new(move || {
        App::new()
            .wrap(backend::middleware::Logger)
            .wrap(backend::middleware::cors_middleware())
            .configure(|cfg| state.configure(cfg))
    })
    .workers(config.server.workers)
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await?;

    Ok(())
}
