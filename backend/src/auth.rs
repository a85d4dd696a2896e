use crate::account::session::SessionStore;
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::ErrorUnauthorized,
    http::header::HeaderMap,
    Error, HttpMessage,
};
use futures_util::future::{ready, Ready};
use shared::models::account::AuthUser;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Session id from an `Authorization: Bearer <id>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Resolves the Bearer session and stores the [`AuthUser`] in the request
/// extensions. Requests without a valid session are rejected with 401.
pub struct AuthMiddleware {
    pub sessions: Arc<dyn SessionStore>,
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Arc::new(service),
            sessions: self.sessions.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Arc<S>,
    sessions: Arc<dyn SessionStore>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let sessions = self.sessions.clone();
        let service = self.service.clone();
        let path = req.path().to_string();
        let method = req.method().to_string();

        Box::pin(async move {
            let Some(session_id) = bearer_token(req.headers()) else {
                log::debug!("No Authorization header, rejecting {} {}", method, path);
                return Err(ErrorUnauthorized("Authentication required"));
            };

            let user: Option<AuthUser> = match sessions.get_session(&session_id).await {
                Ok(user) => user,
                Err(e) => {
                    log::error!("Error retrieving session: {}", e);
                    None
                }
            };

            match user {
                Some(user) => {
                    log::debug!("Authenticated user_id={} for {} {}", user.id, method, path);
                    req.extensions_mut().insert(user);
                    service.call(req).await
                }
                None => {
                    log::warn!("Authentication failed: invalid or expired session for {} {}", method, path);
                    Err(ErrorUnauthorized("Invalid or expired session"))
                }
            }
        })
    }
}
