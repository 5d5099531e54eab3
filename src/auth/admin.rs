//! Admin session lifecycle. Every function here fails closed: a backend error
//! is logged and reported as "not an admin" / "no session".

use chrono::Utc;
use sqlx::{Pool, Sqlite};
use tracing::{error, info, instrument, warn};

use crate::db::{
    authenticate_identity, delete_admin_session, delete_admin_sessions_for_user,
    find_admin_session, find_user_profile, insert_admin_session,
};
use crate::error::AppError;

use super::Identity;
use super::session::{ADMIN_SESSION_TTL_HOURS, expiry_from_now, generate_token};

#[instrument(skip(pool))]
pub async fn is_user_admin(pool: &Pool<Sqlite>, user_id: &str) -> bool {
    match find_user_profile(pool, user_id).await {
        Ok(Some(profile)) => profile.has_admin_access(),
        Ok(None) => false,
        Err(e) => {
            error!(error = %e, "Admin lookup failed");
            false
        }
    }
}

/// Replaces any existing session for the admin and returns the new token.
#[instrument(skip(pool))]
pub async fn create_admin_session(pool: &Pool<Sqlite>, user_id: &str) -> Option<String> {
    if !is_user_admin(pool, user_id).await {
        warn!("Refusing admin session for non-admin user");
        return None;
    }

    let token = generate_token();
    let expires_at = expiry_from_now(ADMIN_SESSION_TTL_HOURS);

    if let Err(e) = delete_admin_sessions_for_user(pool, user_id).await {
        error!(error = %e, "Failed to clear previous admin sessions");
        return None;
    }

    match insert_admin_session(pool, user_id, &token, expires_at).await {
        Ok(()) => {
            info!("Admin session created");
            Some(token)
        }
        Err(e) => {
            error!(error = %e, "Failed to create admin session");
            None
        }
    }
}

/// Returns the admin's user id for a live session. Expired sessions and
/// sessions whose user lost admin rights are deleted on sight.
#[instrument(skip_all)]
pub async fn verify_admin_session(pool: &Pool<Sqlite>, token: &str) -> Option<String> {
    let session = match find_admin_session(pool, token).await {
        Ok(Some(session)) => session,
        Ok(None) => return None,
        Err(e) => {
            error!(error = %e, "Admin session lookup failed");
            return None;
        }
    };

    if session.is_expired_at(Utc::now().naive_utc()) {
        info!(user_id = %session.user_id, "Admin session expired");
        discard(pool, token).await;
        return None;
    }

    if !is_user_admin(pool, &session.user_id).await {
        warn!(user_id = %session.user_id, "Session holder is no longer an admin");
        discard(pool, token).await;
        return None;
    }

    Some(session.user_id)
}

#[instrument(skip_all)]
pub async fn destroy_admin_session(pool: &Pool<Sqlite>, token: &str) -> bool {
    match delete_admin_session(pool, token).await {
        Ok(n) => n > 0,
        Err(e) => {
            error!(error = %e, "Failed to delete admin session");
            false
        }
    }
}

async fn discard(pool: &Pool<Sqlite>, token: &str) {
    if let Err(e) = delete_admin_session(pool, token).await {
        warn!(error = %e, "Failed to delete stale admin session");
    }
}

/// Credential check plus admin check. On success returns the admin and the
/// session token to hand out as the cookie value.
#[instrument(skip(pool, password))]
pub async fn login_admin(
    pool: &Pool<Sqlite>,
    email: &str,
    password: &str,
) -> Result<(Identity, String), AppError> {
    let identity = authenticate_identity(pool, email, password)
        .await?
        .ok_or_else(|| AppError::Authentication("Invalid credentials".to_string()))?;

    if !is_user_admin(pool, &identity.id).await {
        warn!(user_id = %identity.id, "Non-admin attempted admin login");
        return Err(AppError::Authorization(
            "Access denied. Admin privileges required.".to_string(),
        ));
    }

    let token = create_admin_session(pool, &identity.id)
        .await
        .ok_or_else(|| AppError::Internal("Failed to create admin session".to_string()))?;

    Ok((identity, token))
}
