use rocket::Request;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use sqlx::SqlitePool;
use tracing::{Instrument, error, info, info_span, warn};

use crate::db::{find_identity, get_session_by_token};

use super::Identity;
use super::admin::verify_admin_session;
use super::session::{ADMIN_SESSION_COOKIE, USER_SESSION_COOKIE, removal_cookie};

/// Owner dashboard session.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for Identity {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        owner_from_session(request)
            .instrument(info_span!("owner_auth_guard"))
            .await
    }
}

async fn owner_from_session(request: &Request<'_>) -> Outcome<Identity, ()> {
    let Some(token) = request
        .cookies()
        .get_private(USER_SESSION_COOKIE)
        .map(|c| c.value().to_string())
    else {
        return Outcome::Error((Status::Unauthorized, ()));
    };

    let Some(db) = request.rocket().state::<SqlitePool>() else {
        error!("Database pool not found in managed state");
        return Outcome::Error((Status::InternalServerError, ()));
    };

    let session = match get_session_by_token(db, &token).await {
        Ok(session) => session,
        Err(err) => {
            warn!(error = %err, "Invalid owner session token");
            request.cookies().remove_private(removal_cookie(USER_SESSION_COOKIE));
            return Outcome::Error((Status::Unauthorized, ()));
        }
    };

    if !session.is_valid() {
        warn!(user_id = %session.user_id, "Owner session expired");
        request.cookies().remove_private(removal_cookie(USER_SESSION_COOKIE));
        return Outcome::Error((Status::Unauthorized, ()));
    }

    match find_identity(db, &session.user_id).await {
        Ok(Some(identity)) => {
            info!(user_id = %identity.id, "Owner authenticated via session token");
            Outcome::Success(identity)
        }
        Ok(None) => {
            warn!(user_id = %session.user_id, "Session refers to a missing identity");
            Outcome::Error((Status::Unauthorized, ()))
        }
        Err(err) => {
            error!(user_id = %session.user_id, error = %err, "Failed to load identity for session");
            Outcome::Error((Status::InternalServerError, ()))
        }
    }
}

/// Result of checking the `admin-session` cookie. Never fails; a stale
/// cookie is removed while the gate is evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminGate {
    Unverified,
    Verified(String),
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminGate {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(token) = request
            .cookies()
            .get_private(ADMIN_SESSION_COOKIE)
            .map(|c| c.value().to_string())
        else {
            return Outcome::Success(AdminGate::Unverified);
        };

        let verified = match request.rocket().state::<SqlitePool>() {
            Some(db) => verify_admin_session(db, &token).await,
            None => {
                error!("Database pool not found in managed state");
                None
            }
        };

        match verified {
            Some(user_id) => Outcome::Success(AdminGate::Verified(user_id)),
            None => {
                request.cookies().remove_private(removal_cookie(ADMIN_SESSION_COOKIE));
                Outcome::Success(AdminGate::Unverified)
            }
        }
    }
}

/// A verified admin. Requests without one fail with 401.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub user_id: String,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminUser {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match request.guard::<AdminGate>().await {
            Outcome::Success(AdminGate::Verified(user_id)) => Outcome::Success(AdminUser { user_id }),
            Outcome::Success(AdminGate::Unverified) => {
                warn!("Admin route requested without a valid admin session");
                Outcome::Error((Status::Unauthorized, ()))
            }
            Outcome::Error((status, ())) => Outcome::Error((status, ())),
            Outcome::Forward(status) => Outcome::Forward(status),
        }
    }
}
