use rocket::FromForm;
use rocket::State;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::{Pool, Sqlite};
use tracing::info;
use validator::Validate;

use crate::analytics::{
    ContactSubjectProps, EventProperties, PageEvent, TrackingContext, track_event_best_effort,
};
use crate::auth::AdminUser;
use crate::db::{
    create_contact_message, delete_contact_message, list_contact_messages, update_contact_status,
};
use crate::error::AppError;
use crate::models::{ContactMessage, ContactStatus};
use crate::validation::{JsonValidateExt, not_blank};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct ContactRequest {
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(custom(function = "not_blank"))]
    pub subject: String,
    #[validate(custom(function = "not_blank"))]
    pub message: String,
    /// Set when a signed-in owner uses the form.
    pub user_id: Option<String>,
}

#[post("/contact", data = "<body>")]
pub async fn submit_contact(
    body: Json<ContactRequest>,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Value>, AppError> {
    let request = body.validate_body()?;

    let message = create_contact_message(
        db,
        request.name.trim(),
        request.email.trim(),
        request.subject.trim(),
        request.message.trim(),
    )
    .await?;

    info!(contact_id = %message.id, "Contact message received");

    if let Some(user_id) = request.user_id.as_deref().filter(|id| !id.is_empty()) {
        let event = PageEvent {
            event_type: "contact_form_submit".to_string(),
            event_name: "Contact form submitted".to_string(),
            properties: EventProperties::ContactSubject(ContactSubjectProps {
                subject: message.subject.clone(),
            }),
            ..Default::default()
        };
        track_event_best_effort(db, &TrackingContext::new(user_id, None), event).await;
    }

    Ok(Json(json!({
        "success": true,
        "message": "Message sent successfully",
        "data": message,
    })))
}

#[derive(Debug, FromForm)]
pub struct ContactListQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ContactListResponse {
    pub messages: Vec<ContactMessage>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[get("/contact?<query..>")]
pub async fn list_contacts(
    query: ContactListQuery,
    _admin: AdminUser,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<ContactListResponse>, AppError> {
    let status = match query.status.as_deref() {
        None | Some("") | Some("all") => None,
        Some(s) => Some(ContactStatus::from_str(s)?),
    };
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

    let (messages, total) = list_contact_messages(db, status, page, limit).await?;

    Ok(Json(ContactListResponse {
        messages,
        total,
        page,
        limit,
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StatusUpdateRequest {
    pub status: String,
}

#[patch("/contact/<id>", data = "<body>")]
pub async fn update_contact(
    id: &str,
    body: Json<StatusUpdateRequest>,
    admin: AdminUser,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Value>, AppError> {
    let status = ContactStatus::from_str(&body.status)?;

    let message = update_contact_status(db, id, status)
        .await?
        .ok_or_else(|| AppError::NotFound("Message not found".to_string()))?;

    info!(admin_id = %admin.user_id, contact_id = %id, status = %status, "Contact status updated");

    Ok(Json(json!({ "success": true, "data": message })))
}

#[delete("/contact/<id>")]
pub async fn delete_contact(
    id: &str,
    admin: AdminUser,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Value>, AppError> {
    if !delete_contact_message(db, id).await? {
        return Err(AppError::NotFound("Message not found".to_string()));
    }

    info!(admin_id = %admin.user_id, contact_id = %id, "Contact message deleted");

    Ok(Json(json!({
        "success": true,
        "message": "Message deleted successfully",
    })))
}
