use rocket::FromForm;
use rocket::State;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::{Pool, Sqlite};
use tracing::{info, warn};
use validator::Validate;

use crate::analytics::{TrackingContext, testimonial_submitted_event, track_event_best_effort};
use crate::auth::Identity;
use crate::cors::{Cors, preflight};
use crate::db::{
    NewTestimonial, count_testimonials_for_user, ensure_user_profile, find_testimonial,
    insert_testimonial_within_limit, list_approved_testimonials, list_testimonials_for_user,
    set_testimonial_approval,
};
use crate::error::AppError;
use crate::models::{Testimonial, WidgetTestimonial};
use crate::validation::{JsonValidateExt, not_blank};

/// Testimonials an owner on the free plan may hold.
pub const FREE_TESTIMONIAL_LIMIT: i64 = 10;

pub const DEFAULT_WIDGET_LIMIT: i64 = 3;
pub const MAX_WIDGET_LIMIT: i64 = 50;

const LIMIT_REACHED_MESSAGE: &str =
    "Testimonial limit reached. Please upgrade to add more testimonials.";

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct SubmitTestimonialRequest {
    #[validate(custom(function = "not_blank"))]
    pub customer_name: String,
    #[validate(custom(function = "not_blank"))]
    pub customer_email: String,
    #[validate(custom(function = "not_blank"))]
    pub message: String,
    #[validate(
        required(message = "Missing required fields"),
        range(min = 1, max = 5, message = "Rating must be between 1 and 5")
    )]
    pub rating: Option<i64>,
    #[validate(custom(function = "not_blank"))]
    pub user_id: String,
}

#[post("/testimonials", data = "<body>")]
pub async fn submit_testimonial(
    body: Json<SubmitTestimonialRequest>,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Value>, AppError> {
    let request = body.validate_body()?;
    let rating = request.rating.unwrap_or_default();

    if count_testimonials_for_user(db, &request.user_id).await? >= FREE_TESTIMONIAL_LIMIT {
        return Err(AppError::LimitReached(LIMIT_REACHED_MESSAGE.to_string()));
    }

    ensure_user_profile(db, &request.user_id).await?;

    let new = NewTestimonial {
        user_id: &request.user_id,
        customer_name: request.customer_name.trim(),
        customer_email: request.customer_email.trim(),
        message: request.message.trim(),
        rating,
    };

    let Some(testimonial) = insert_testimonial_within_limit(db, &new, FREE_TESTIMONIAL_LIMIT).await?
    else {
        warn!(user_id = %request.user_id, "Limit reached between check and insert");
        return Err(AppError::LimitReached(LIMIT_REACHED_MESSAGE.to_string()));
    };

    info!(testimonial_id = %testimonial.id, "Testimonial submitted");

    let ctx = TrackingContext::new(request.user_id.clone(), None);
    track_event_best_effort(
        db,
        &ctx,
        testimonial_submitted_event(rating, testimonial.message.chars().count()),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": "Testimonial submitted successfully",
        "data": testimonial,
    })))
}

#[derive(Debug, FromForm)]
pub struct WidgetQuery {
    #[field(name = "userId")]
    pub user_id: Option<String>,
    pub limit: Option<i64>,
}

pub fn clamp_widget_limit(limit: Option<i64>) -> i64 {
    limit
        .unwrap_or(DEFAULT_WIDGET_LIMIT)
        .clamp(1, MAX_WIDGET_LIMIT)
}

/// Public, embeddable: approved testimonials only.
#[get("/testimonials/widget?<query..>")]
pub async fn widget_testimonials(
    query: WidgetQuery,
    db: &State<Pool<Sqlite>>,
) -> Cors<Result<Json<Vec<WidgetTestimonial>>, AppError>> {
    let result: Result<Json<Vec<WidgetTestimonial>>, AppError> = async {
        let user_id = query
            .user_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| AppError::Validation("Missing userId".to_string()))?;

        let testimonials =
            list_approved_testimonials(db, &user_id, clamp_widget_limit(query.limit)).await?;

        Ok(Json(
            testimonials.into_iter().map(WidgetTestimonial::from).collect(),
        ))
    }
    .await;

    Cors::new(result, "GET, OPTIONS")
}

#[options("/testimonials/widget")]
pub fn widget_testimonials_preflight() -> Cors<rocket::http::Status> {
    preflight("GET, OPTIONS")
}

#[get("/testimonials")]
pub async fn list_own_testimonials(
    owner: Identity,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<Testimonial>>, AppError> {
    Ok(Json(list_testimonials_for_user(db, &owner.id).await?))
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ApprovalRequest {
    #[validate(required(message = "Missing required fields"))]
    pub approved: Option<bool>,
}

#[patch("/testimonials/<id>/approve", data = "<body>")]
pub async fn approve_testimonial(
    id: &str,
    body: Json<ApprovalRequest>,
    owner: Identity,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Value>, AppError> {
    let approved = body.validate_body()?.approved.unwrap_or_default();

    // Someone else's testimonial is reported exactly like a missing one.
    match find_testimonial(db, id).await? {
        Some(t) if t.user_id == owner.id => {}
        _ => return Err(AppError::NotFound("Testimonial not found".to_string())),
    }

    let testimonial = set_testimonial_approval(db, id, approved)
        .await?
        .ok_or_else(|| AppError::NotFound("Testimonial not found".to_string()))?;

    info!(testimonial_id = %id, approved, "Testimonial approval updated");

    Ok(Json(json!({ "success": true, "data": testimonial })))
}

#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub count: i64,
    pub limit: i64,
}

#[get("/usage/testimonials")]
pub async fn testimonial_usage(
    owner: Identity,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<UsageResponse>, AppError> {
    Ok(Json(UsageResponse {
        count: count_testimonials_for_user(db, &owner.id).await?,
        limit: FREE_TESTIMONIAL_LIMIT,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widget_limit_defaults_and_bounds() {
        assert_eq!(clamp_widget_limit(None), 3);
        assert_eq!(clamp_widget_limit(Some(0)), 1);
        assert_eq!(clamp_widget_limit(Some(-4)), 1);
        assert_eq!(clamp_widget_limit(Some(12)), 12);
        assert_eq!(clamp_widget_limit(Some(500)), 50);
    }
}
