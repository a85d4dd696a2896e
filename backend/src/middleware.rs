use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use actix_web::HttpMessage;
use futures_util::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use std::task::{Context, Poll};
use std::time::Instant;
use log::{info, warn, error};
use actix_web::http::header::{HeaderName, HeaderValue};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlation id of the current request, stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Reuses a well-formed incoming `x-request-id`, otherwise generates one.
fn request_id_for(req: &ServiceRequest) -> String {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty() && value.len() <= 64)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Request logging: one line per request, level chosen by status class.
pub struct Logger;

impl<S, B> Transform<S, ServiceRequest> for Logger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = LoggerMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LoggerMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct LoggerMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for LoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = self.service.clone();
        let start_time = Instant::now();
        let method = req.method().clone();
        let uri = req.uri().clone();
        let peer_addr = req.peer_addr().map(|addr| addr.to_string());

        let correlation_id = request_id_for(&req);
        req.extensions_mut().insert(RequestId(correlation_id.clone()));

        Box::pin(async move {
            let mut res = svc.call(req).await?;
            let duration = start_time.elapsed();

            if let Ok(header_value) = HeaderValue::try_from(correlation_id.as_str()) {
                res.headers_mut().insert(
                    HeaderName::from_static(REQUEST_ID_HEADER),
                    header_value,
                );
            }

            let status_code = res.status().as_u16();
            let peer = peer_addr.unwrap_or_else(|| "unknown".to_string());

            if status_code >= 500 {
                error!(
                    "request_id={} {} {} {} {}ms {}",
                    correlation_id, method, uri, status_code, duration.as_millis(), peer
                );
            } else if status_code >= 400 {
                warn!(
                    "request_id={} {} {} {} {}ms {}",
                    correlation_id, method, uri, status_code, duration.as_millis(), peer
                );
            } else {
                info!(
                    "request_id={} {} {} {} {}ms {}",
                    correlation_id, method, uri, status_code, duration.as_millis(), peer
                );
            }

            Ok(res)
        })
    }
}

/// CORS for the web front end. Extra origins come from the comma separated
/// `CORS_ALLOWED_ORIGINS` variable.
pub fn cors_middleware() -> actix_cors::Cors {
    let mut cors = actix_cors::Cors::default()
        .allowed_origin("http://localhost:3000")
        .allowed_origin("http://127.0.0.1:3000")
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            actix_web::http::header::ACCEPT,
            actix_web::http::header::CONTENT_TYPE,
            actix_web::http::header::AUTHORIZATION,
        ])
        .supports_credentials()
        .max_age(3600);

    if let Ok(origins) = std::env::var("CORS_ALLOWED_ORIGINS") {
        for origin in origins.split(',').map(str::trim).filter(|origin| !origin.is_empty()) {
            cors = cors.allowed_origin(origin);
        }
    }

    cors
}
