use chrono::Utc;
use rocket::State;
use rocket::http::CookieJar;
use rocket::serde::json::Json;
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::{Pool, Sqlite};
use tracing::info;
use validator::Validate;

use crate::analytics::{PlatformReport, UserReport, normalize_period, platform_report, user_report};
use crate::auth::{
    ADMIN_SESSION_COOKIE, ADMIN_SESSION_TTL_HOURS, AdminGate, AdminUser, Role,
    destroy_admin_session, login_admin, removal_cookie, session_cookie,
};
use crate::env::AppConfig;
use crate::error::AppError;
use crate::validation::{JsonValidateExt, not_blank};

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct AdminLoginRequest {
    #[validate(custom(function = "not_blank"))]
    pub email: String,
    #[validate(custom(function = "not_blank"))]
    pub password: String,
}

#[post("/admin/auth", data = "<body>")]
pub async fn admin_login(
    body: Json<AdminLoginRequest>,
    cookies: &CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> Result<Json<Value>, AppError> {
    let request = body
        .validate_body()
        .map_err(|_| AppError::Validation("Email and password are required".to_string()))?;

    let (admin, token) = login_admin(db, &request.email, &request.password).await?;

    cookies.add_private(session_cookie(
        ADMIN_SESSION_COOKIE,
        token,
        ADMIN_SESSION_TTL_HOURS,
        config.production,
    ));

    info!(user_id = %admin.id, "Admin logged in");

    Ok(Json(json!({
        "success": true,
        "user": {
            "id": admin.id,
            "email": admin.email,
            "role": Role::Admin,
        }
    })))
}

#[delete("/admin/auth")]
pub async fn admin_logout(cookies: &CookieJar<'_>, db: &State<Pool<Sqlite>>) -> Json<Value> {
    if let Some(cookie) = cookies.get_private(ADMIN_SESSION_COOKIE) {
        destroy_admin_session(db, cookie.value()).await;
    }
    cookies.remove_private(removal_cookie(ADMIN_SESSION_COOKIE));

    Json(json!({ "success": true }))
}

#[post("/admin/verify")]
pub fn admin_verify(gate: AdminGate) -> Result<Json<Value>, AppError> {
    match gate {
        AdminGate::Verified(user_id) => Ok(Json(json!({
            "success": true,
            "userId": user_id,
            "isAdmin": true,
        }))),
        AdminGate::Unverified => Err(AppError::Authentication(
            "Invalid or expired admin session".to_string(),
        )),
    }
}

#[get("/admin/analytics?<period>")]
pub async fn admin_platform_analytics(
    period: Option<i64>,
    _admin: AdminUser,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<PlatformReport>, AppError> {
    let report = platform_report(db, normalize_period(period), Utc::now().naive_utc()).await?;
    Ok(Json(report))
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct UserReportRequest {
    #[validate(custom(function = "not_blank"))]
    pub user_id: String,
    pub period: Option<i64>,
}

#[post("/admin/analytics", data = "<body>")]
pub async fn admin_user_analytics(
    body: Json<UserReportRequest>,
    admin: AdminUser,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<UserReport>, AppError> {
    let request = body
        .validate_body()
        .map_err(|_| AppError::Validation("Missing userId".to_string()))?;

    info!(admin_id = %admin.user_id, user_id = %request.user_id, "Admin requested user report");

    let report = user_report(
        db,
        request.user_id.trim(),
        normalize_period(request.period),
        Utc::now().naive_utc(),
    )
    .await?;
    Ok(Json(report))
}
