use chrono::Utc;
use rocket::State;
use rocket::request::{FromRequest, Outcome, Request};
use rocket::serde::json::Json;
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::{Pool, Sqlite};
use validator::Validate;

use crate::analytics::{
    DashboardReport, EventProperties, FunnelEvent, FunnelStage, PageEvent, TrackingContext,
    WidgetEvent, WidgetEventType, dashboard_report, normalize_period, track_event,
    track_funnel_event, track_widget_event,
};
use crate::auth::Identity;
use crate::cors::{Cors, preflight};
use crate::error::AppError;
use crate::validation::{JsonValidateExt, not_blank};

/// Caller details captured alongside generic events.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientInfo {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let headers = request.headers();
        let ip_address = headers
            .get_one("X-Forwarded-For")
            .or_else(|| headers.get_one("X-Real-IP"))
            .map(str::to_string)
            .or_else(|| request.client_ip().map(|ip| ip.to_string()));

        Outcome::Success(ClientInfo {
            user_agent: headers.get_one("User-Agent").map(str::to_string),
            ip_address,
        })
    }
}

fn tracked(id: i64, ctx: &TrackingContext) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": { "id": id, "sessionId": ctx.session_id },
    }))
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackEventRequest {
    #[validate(custom(function = "not_blank"))]
    pub user_id: String,
    #[validate(custom(function = "not_blank"))]
    pub event_type: String,
    #[validate(custom(function = "not_blank"))]
    pub event_name: String,
    pub properties: EventProperties,
    pub url: Option<String>,
    pub referrer: Option<String>,
    pub session_id: Option<String>,
}

#[post("/analytics/events", data = "<body>")]
pub async fn ingest_event(
    body: Json<TrackEventRequest>,
    client: ClientInfo,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Value>, AppError> {
    let request = body.validate_body()?;
    let ctx = TrackingContext::new(request.user_id, request.session_id);

    let event = PageEvent {
        event_type: request.event_type,
        event_name: request.event_name,
        properties: request.properties,
        url: request.url,
        referrer: request.referrer,
        user_agent: client.user_agent,
        ip_address: client.ip_address,
    };

    let id = track_event(db, &ctx, &event).await?;
    Ok(tracked(id, &ctx))
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct FunnelEventRequest {
    #[validate(custom(function = "not_blank"))]
    pub user_id: String,
    pub testimonial_id: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub event_type: String,
    pub form_data: EventProperties,
    pub referrer: Option<String>,
    pub session_id: Option<String>,
}

#[post("/analytics/testimonials", data = "<body>")]
pub async fn ingest_funnel_event(
    body: Json<FunnelEventRequest>,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Value>, AppError> {
    let request = body.validate_body()?;
    let stage = FunnelStage::from_db(&request.event_type)
        .ok_or_else(|| AppError::Validation("Invalid event type".to_string()))?;

    let ctx = TrackingContext::new(request.user_id, request.session_id);
    let event = FunnelEvent {
        stage,
        testimonial_id: request.testimonial_id,
        form_data: request.form_data,
        referrer: request.referrer,
    };

    let id = track_funnel_event(db, &ctx, &event).await?;
    Ok(tracked(id, &ctx))
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct WidgetEventRequest {
    #[validate(custom(function = "not_blank"))]
    pub user_id: String,
    pub widget_id: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub event_type: String,
    pub website_domain: Option<String>,
    pub referrer: Option<String>,
    pub session_id: Option<String>,
    pub properties: EventProperties,
}

/// Called from embedded widgets on third-party pages.
#[post("/analytics/widgets", data = "<body>")]
pub async fn ingest_widget_event(
    body: Json<WidgetEventRequest>,
    db: &State<Pool<Sqlite>>,
) -> Cors<Result<Json<Value>, AppError>> {
    let result: Result<Json<Value>, AppError> = async {
        let request = body.validate_body()?;
        let event_type = WidgetEventType::from_db(&request.event_type)
            .ok_or_else(|| AppError::Validation("Invalid event type".to_string()))?;

        let ctx = TrackingContext::new(request.user_id, request.session_id);
        let event = WidgetEvent {
            event_type,
            widget_id: request.widget_id,
            website_domain: request.website_domain.filter(|d| !d.trim().is_empty()),
            referrer: request.referrer,
            properties: request.properties,
        };

        let id = track_widget_event(db, &ctx, &event).await?;
        Ok(tracked(id, &ctx))
    }
    .await;

    Cors::new(result, "POST, OPTIONS")
}

#[options("/analytics/widgets")]
pub fn ingest_widget_event_preflight() -> Cors<rocket::http::Status> {
    preflight("POST, OPTIONS")
}

#[get("/analytics/dashboard?<period>")]
pub async fn owner_dashboard(
    period: Option<i64>,
    owner: Identity,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<DashboardReport>, AppError> {
    let report = dashboard_report(
        db,
        &owner.id,
        normalize_period(period),
        Utc::now().naive_utc(),
    )
    .await?;
    Ok(Json(report))
}
