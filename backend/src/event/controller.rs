use crate::error::ApiError;
use crate::event::error::EventActionError;
use crate::event::query::{DashboardQuery, EventQueries};
use crate::event::repository::EventsRepositoryImpl;
use crate::event::usecase::EventUseCaseImpl;
use actix_web::{delete, get, post, put, web, HttpMessage, HttpRequest, HttpResponse};
use serde::Serialize;
use shared::dashboard::{DashboardFilters, DashboardParams};
use shared::models::account::AuthUser;
use shared::models::event::{parse_event_id, EventWithVenuesAndOwner};
use shared::validation::EventInput;

pub type EventUseCase = EventUseCaseImpl<EventsRepositoryImpl>;

#[derive(Debug, Serialize)]
pub struct EventView {
    pub event: EventWithVenuesAndOwner,
    pub is_owner: bool,
}

fn current_user(req: &HttpRequest) -> Option<AuthUser> {
    req.extensions().get::<AuthUser>().cloned()
}

fn checked_event_id(event_id: &str) -> Result<String, EventActionError> {
    parse_event_id(event_id)
        .map(|id| id.to_string())
        .ok_or(EventActionError::InvalidEventId)
}

#[get("")]
pub async fn list_events_handler(
    req: HttpRequest,
    params: web::Query<DashboardParams>,
    queries: web::Data<EventQueries>,
) -> Result<HttpResponse, ApiError> {
    let user = current_user(&req).ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
    let filters = DashboardFilters::from_params(&params);
    let query = DashboardQuery {
        search_query: filters.search_query,
        sport_filter: filters.sport,
        owner_id: user.id,
    };

    let events = queries.list_for_dashboard(&query).await?;
    Ok(HttpResponse::Ok().json(events))
}

#[post("")]
pub async fn create_event_handler(
    req: HttpRequest,
    input: web::Json<EventInput>,
    usecase: web::Data<EventUseCase>,
) -> Result<HttpResponse, EventActionError> {
    let user = current_user(&req);
    let created = usecase.create_event(user.as_ref(), input.into_inner()).await?;
    log::info!("Event created: event_id={}", created.data.id);
    Ok(HttpResponse::Created().json(created.data))
}

#[get("/{id}")]
pub async fn view_event_handler(
    req: HttpRequest,
    path: web::Path<String>,
    queries: web::Data<EventQueries>,
) -> Result<HttpResponse, ApiError> {
    let user = current_user(&req).ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
    let event_id = checked_event_id(&path).map_err(|e| ApiError::bad_request(&e.to_string()))?;

    let event = queries.get_for_view(&event_id).await?;
    let is_owner = event.is_owned_by(&user.id);
    Ok(HttpResponse::Ok().json(EventView { event, is_owner }))
}

#[get("/{id}/edit")]
pub async fn edit_event_handler(
    req: HttpRequest,
    path: web::Path<String>,
    queries: web::Data<EventQueries>,
) -> Result<HttpResponse, ApiError> {
    let user = current_user(&req).ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
    let event_id = checked_event_id(&path).map_err(|e| ApiError::bad_request(&e.to_string()))?;

    let input = queries.get_for_edit(&event_id, &user.id).await?;
    Ok(HttpResponse::Ok().json(input))
}

#[put("/{id}")]
pub async fn update_event_handler(
    req: HttpRequest,
    path: web::Path<String>,
    input: web::Json<EventInput>,
    usecase: web::Data<EventUseCase>,
) -> Result<HttpResponse, EventActionError> {
    let user = current_user(&req);
    let updated = usecase
        .update_event(user.as_ref(), &path, input.into_inner())
        .await?;
    log::info!("Event updated: event_id={}", updated.data.id);
    Ok(HttpResponse::Ok().json(updated.data))
}

#[delete("/{id}")]
pub async fn delete_event_handler(
    req: HttpRequest,
    path: web::Path<String>,
    usecase: web::Data<EventUseCase>,
) -> Result<HttpResponse, EventActionError> {
    let user = current_user(&req);
    usecase.delete_event(user.as_ref(), &path).await?;
    log::info!("Event deleted: event_id={}", path.as_str());
    Ok(HttpResponse::NoContent().finish())
}

/// Routes mounted under `/api/events`; the caller wraps them in auth.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_events_handler)
        .service(create_event_handler)
        .service(edit_event_handler)
        .service(view_event_handler)
        .service(update_event_handler)
        .service(delete_event_handler);
}
