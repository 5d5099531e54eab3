use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use crate::models::to_utc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Unknown roles collapse to `User` so they never grant admin access.
    pub fn from_db(s: &str) -> Self {
        match s {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A credential-store account. Owners authenticate as an `Identity`.
#[derive(Debug, Serialize, Clone)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbIdentity {
    pub id: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

impl From<DbIdentity> for Identity {
    fn from(db: DbIdentity) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            email: db.email.unwrap_or_default(),
            name: db.name,
            created_at: to_utc(db.created_at),
        }
    }
}

impl Identity {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

/// Row of the mirrored `users` table.
#[derive(Debug, Serialize, Clone)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub is_admin: bool,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbUserProfile {
    pub id: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub is_admin: Option<bool>,
    pub role: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

impl From<DbUserProfile> for UserProfile {
    fn from(db: DbUserProfile) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            email: db.email.unwrap_or_default(),
            name: db.name.unwrap_or_default(),
            is_admin: db.is_admin.unwrap_or_default(),
            role: Role::from_db(db.role.as_deref().unwrap_or_default()),
            created_at: to_utc(db.created_at),
        }
    }
}

impl UserProfile {
    /// Both the flag and the role must agree.
    pub fn has_admin_access(&self) -> bool {
        self.is_admin && self.role == Role::Admin
    }
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    pub created_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(is_admin: bool, role: &str) -> UserProfile {
        UserProfile::from(DbUserProfile {
            id: Some("u1".to_string()),
            email: Some("a@example.com".to_string()),
            name: None,
            is_admin: Some(is_admin),
            role: Some(role.to_string()),
            created_at: None,
        })
    }

    #[test]
    fn test_admin_access_requires_flag_and_role() {
        assert!(profile(true, "admin").has_admin_access());
        assert!(!profile(true, "user").has_admin_access());
        assert!(!profile(false, "admin").has_admin_access());
        assert!(!profile(true, "superuser").has_admin_access());
    }
}
