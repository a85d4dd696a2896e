use crate::account::session::SessionStore;
use crate::event::store::EventStore;
use crate::realtime::hub::RealtimeHub;
use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio::time::timeout;

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: i64,
    pub version: &'static str,
}

#[get("/health")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().timestamp(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Serialize)]
struct ServiceHealthStatus {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_time_ms: Option<u64>,
}

impl ServiceHealthStatus {
    fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            message: None,
            response_time_ms: None,
        }
    }

    fn unhealthy(message: String) -> Self {
        Self {
            status: "unhealthy".to_string(),
            message: Some(message),
            response_time_ms: None,
        }
    }

    fn with_response_time(mut self, ms: u64) -> Self {
        self.response_time_ms = Some(ms);
        self
    }

    fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

async fn check_store(store: &dyn EventStore) -> ServiceHealthStatus {
    let start = Instant::now();

    match timeout(CHECK_TIMEOUT, store.ping()).await {
        Ok(Ok(())) => {
            ServiceHealthStatus::healthy().with_response_time(start.elapsed().as_millis() as u64)
        }
        Ok(Err(e)) => {
            log::error!("Event store ping failed: {}", e);
            ServiceHealthStatus::unhealthy("Event store ping failed".to_string())
        }
        Err(_) => ServiceHealthStatus::unhealthy("Event store timeout".to_string()),
    }
}

async fn check_sessions(sessions: &dyn SessionStore) -> ServiceHealthStatus {
    let start = Instant::now();

    match timeout(CHECK_TIMEOUT, sessions.ping()).await {
        Ok(Ok(())) => {
            ServiceHealthStatus::healthy().with_response_time(start.elapsed().as_millis() as u64)
        }
        Ok(Err(e)) => {
            log::error!("Session store ping failed: {}", e);
            ServiceHealthStatus::unhealthy("Session store ping failed".to_string())
        }
        Err(_) => ServiceHealthStatus::unhealthy("Session store timeout".to_string()),
    }
}

#[derive(Serialize)]
struct RealtimeHealth {
    status: String,
    subscribers: usize,
}

#[derive(Serialize)]
struct ServicesHealth {
    store: ServiceHealthStatus,
    sessions: ServiceHealthStatus,
    realtime: RealtimeHealth,
}

#[derive(Serialize)]
struct DetailedHealthResponse {
    status: String,
    timestamp: i64,
    version: &'static str,
    services: ServicesHealth,
}

#[get("/health/detailed")]
pub async fn detailed_health_check(
    store: web::Data<dyn EventStore>,
    sessions: web::Data<dyn SessionStore>,
    hub: web::Data<RealtimeHub>,
) -> impl Responder {
    let (store_status, session_status) = tokio::join!(
        check_store(store.get_ref()),
        check_sessions(sessions.get_ref())
    );

    let overall_status = if store_status.is_healthy() && session_status.is_healthy() {
        "ok"
    } else {
        "degraded"
    };
    if overall_status != "ok" {
        log::warn!(
            "Health degraded: store={:?} sessions={:?}",
            store_status.message,
            session_status.message
        );
    }

    let response = DetailedHealthResponse {
        status: overall_status.to_string(),
        timestamp: Utc::now().timestamp(),
        version: env!("CARGO_PKG_VERSION"),
        services: ServicesHealth {
            store: store_status,
            sessions: session_status,
            realtime: RealtimeHealth {
                status: "healthy".to_string(),
                subscribers: hub.subscriber_count(),
            },
        },
    };

    if overall_status == "ok" {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}
