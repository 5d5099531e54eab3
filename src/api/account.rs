use rocket::State;
use rocket::http::CookieJar;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::{Pool, Sqlite};
use tracing::info;
use validator::Validate;

use crate::auth::{
    Identity, USER_SESSION_COOKIE, USER_SESSION_TTL_HOURS, expiry_from_now, generate_token,
    removal_cookie, session_cookie,
};
use crate::db::{authenticate_identity, create_identity, create_user_session, get_identity, invalidate_session};
use crate::env::AppConfig;
use crate::error::AppError;
use crate::validation::{JsonValidateExt, not_blank};

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RegisterRequest {
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginRequest {
    #[validate(custom(function = "not_blank"))]
    pub email: String,
    #[validate(custom(function = "not_blank"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub success: bool,
    pub user: Identity,
}

async fn start_session(
    db: &Pool<Sqlite>,
    cookies: &CookieJar<'_>,
    config: &AppConfig,
    user_id: &str,
) -> Result<(), AppError> {
    let token = generate_token();
    create_user_session(db, user_id, &token, expiry_from_now(USER_SESSION_TTL_HOURS)).await?;

    cookies.add_private(session_cookie(
        USER_SESSION_COOKIE,
        token,
        USER_SESSION_TTL_HOURS,
        config.production,
    ));
    Ok(())
}

#[post("/auth/register", data = "<body>")]
pub async fn register(
    body: Json<RegisterRequest>,
    cookies: &CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> Result<Json<AccountResponse>, AppError> {
    let request = body.validate_body()?;
    let email = request.email.trim().to_lowercase();
    let name = request
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let user_id = create_identity(db, &email, &request.password, name).await?;
    start_session(db, cookies, config, &user_id).await?;

    info!(user_id = %user_id, "Owner registered");

    Ok(Json(AccountResponse {
        success: true,
        user: get_identity(db, &user_id).await?,
    }))
}

#[post("/auth/login", data = "<body>")]
pub async fn login(
    body: Json<LoginRequest>,
    cookies: &CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> Result<Json<AccountResponse>, AppError> {
    let request = body.validate_body()?;
    let email = request.email.trim().to_lowercase();

    let identity = authenticate_identity(db, &email, &request.password)
        .await?
        .ok_or_else(|| AppError::Authentication("Invalid credentials".to_string()))?;

    start_session(db, cookies, config, &identity.id).await?;
    info!(user_id = %identity.id, "Owner logged in");

    Ok(Json(AccountResponse {
        success: true,
        user: identity,
    }))
}

#[post("/auth/logout")]
pub async fn logout(cookies: &CookieJar<'_>, db: &State<Pool<Sqlite>>) -> Result<Json<Value>, AppError> {
    if let Some(cookie) = cookies.get_private(USER_SESSION_COOKIE) {
        invalidate_session(db, cookie.value()).await?;
    }
    cookies.remove_private(removal_cookie(USER_SESSION_COOKIE));

    Ok(Json(json!({ "success": true })))
}

#[get("/auth/me")]
pub fn me(owner: Identity, config: &State<AppConfig>) -> Json<Value> {
    let collection_link = config.collection_link(&owner.id);
    Json(json!({
        "user": owner,
        "collectionLink": collection_link,
    }))
}
