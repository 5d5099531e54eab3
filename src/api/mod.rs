use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::{Catcher, Request, Route};
use serde_json::{Value, json};
use tracing::warn;

use crate::error::GENERIC_ERROR_MESSAGE;

pub mod account;
pub mod admin;
pub mod analytics;
pub mod contact;
pub mod testimonials;

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}

pub fn routes() -> Vec<Route> {
    routes![
        health,
        testimonials::submit_testimonial,
        testimonials::widget_testimonials,
        testimonials::widget_testimonials_preflight,
        testimonials::list_own_testimonials,
        testimonials::approve_testimonial,
        testimonials::testimonial_usage,
        account::register,
        account::login,
        account::logout,
        account::me,
        admin::admin_login,
        admin::admin_logout,
        admin::admin_verify,
        admin::admin_platform_analytics,
        admin::admin_user_analytics,
        contact::submit_contact,
        contact::list_contacts,
        contact::update_contact,
        contact::delete_contact,
        analytics::ingest_event,
        analytics::ingest_funnel_event,
        analytics::ingest_widget_event,
        analytics::ingest_widget_event_preflight,
        analytics::owner_dashboard,
    ]
}

fn error_body(status: Status, message: &str) -> Custom<Json<Value>> {
    Custom(status, Json(json!({ "error": message })))
}

#[catch(400)]
pub fn bad_request(_req: &Request) -> Custom<Json<Value>> {
    error_body(Status::BadRequest, "Bad request")
}

#[catch(401)]
pub fn unauthorized(req: &Request) -> Custom<Json<Value>> {
    warn!(uri = %req.uri(), "Unauthorized access attempt");
    error_body(Status::Unauthorized, "Authentication required")
}

#[catch(403)]
pub fn forbidden(req: &Request) -> Custom<Json<Value>> {
    warn!(uri = %req.uri(), "Forbidden access attempt");
    error_body(Status::Forbidden, "Forbidden")
}

#[catch(404)]
pub fn not_found(_req: &Request) -> Custom<Json<Value>> {
    error_body(Status::NotFound, "Not found")
}

#[catch(422)]
pub fn unprocessable(_req: &Request) -> Custom<Json<Value>> {
    error_body(Status::UnprocessableEntity, "Invalid request body")
}

#[catch(500)]
pub fn internal_error(_req: &Request) -> Custom<Json<Value>> {
    error_body(Status::InternalServerError, GENERIC_ERROR_MESSAGE)
}

pub fn catchers() -> Vec<Catcher> {
    catchers![
        bad_request,
        unauthorized,
        forbidden,
        not_found,
        unprocessable,
        internal_error
    ]
}
