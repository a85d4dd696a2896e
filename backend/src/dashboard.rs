use actix_web::http::header;
use actix_web::{post, web, HttpResponse};
use shared::dashboard::{DashboardFilters, DashboardParams};

/// Filter form target: redirects to the canonical dashboard URL so the
/// filters live in the address bar.
#[post("/dashboard/filters")]
pub async fn apply_filters_handler(form: web::Form<DashboardParams>) -> HttpResponse {
    let location = DashboardFilters::from_params(&form).to_url();
    log::debug!("Dashboard filters applied: location={}", location);
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}
