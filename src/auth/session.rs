use chrono::{Duration, NaiveDateTime, Utc};
use rocket::http::{Cookie, SameSite};

pub const ADMIN_SESSION_COOKIE: &str = "admin-session";
pub const USER_SESSION_COOKIE: &str = "session_token";

pub const ADMIN_SESSION_TTL_HOURS: i64 = 2;
pub const USER_SESSION_TTL_HOURS: i64 = 1;

/// 256 random bits from the thread-local CSPRNG, hex encoded (64 chars).
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

pub fn expiry_from_now(ttl_hours: i64) -> NaiveDateTime {
    (Utc::now() + Duration::hours(ttl_hours)).naive_utc()
}

/// Http-only, lax, rooted at `/`. `secure` is only set in production so the
/// cookie still works over plain http during development.
pub fn session_cookie(name: &'static str, token: String, ttl_hours: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((name, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(rocket::time::Duration::hours(ttl_hours))
        .build()
}

pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build(name).path("/").build()
}

#[derive(Debug, Clone)]
pub struct UserSession {
    pub id: i64,
    pub user_id: String,
    pub token: String,
    pub created_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbUserSession {
    pub id: Option<i64>,
    pub user_id: Option<String>,
    pub token: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub expires_at: Option<NaiveDateTime>,
}

impl From<DbUserSession> for UserSession {
    fn from(db: DbUserSession) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            id: db.id.unwrap_or_default(),
            user_id: db.user_id.unwrap_or_default(),
            token: db.token.unwrap_or_default(),
            created_at: db.created_at.unwrap_or(now),
            // A row without an expiry is treated as already expired.
            expires_at: db.expires_at.unwrap_or(now),
        }
    }
}

impl UserSession {
    pub fn is_valid(&self) -> bool {
        self.expires_at > Utc::now().naive_utc()
    }
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct AdminSession {
    pub user_id: String,
    pub session_token: String,
    pub expires_at: NaiveDateTime,
}

impl AdminSession {
    pub fn is_expired_at(&self, now: NaiveDateTime) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_64_hex_chars_and_unique() {
        let a = generate_token();
        let b = generate_token();

        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_admin_session_expiry_boundary() {
        let now = Utc::now().naive_utc();
        let session = AdminSession {
            user_id: "u".to_string(),
            session_token: generate_token(),
            expires_at: now,
        };

        assert!(!session.is_expired_at(now), "expiry instant itself is still valid");
        assert!(session.is_expired_at(now + Duration::seconds(1)));
    }

    #[test]
    fn test_session_cookie_flags() {
        let cookie = session_cookie(ADMIN_SESSION_COOKIE, "abc".to_string(), 2, true);

        assert_eq!(cookie.name(), "admin-session");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(rocket::time::Duration::hours(2)));
    }
}
