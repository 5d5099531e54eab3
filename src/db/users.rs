use chrono::Utc;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::{DbIdentity, DbUserProfile, Identity, Role, UserProfile, UserSummary};
use crate::error::AppError;

#[cfg(not(test))]
const BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;
#[cfg(test)]
const BCRYPT_COST: u32 = 4;

#[instrument(skip_all, fields(email))]
pub async fn create_identity(
    pool: &Pool<Sqlite>,
    email: &str,
    password: &str,
    name: Option<&str>,
) -> Result<String, AppError> {
    info!("Creating identity");

    if find_identity_by_email(pool, email).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "An account for '{}' already exists",
            email
        )));
    }

    let hashed_password = bcrypt::hash(password, BCRYPT_COST)?;
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().naive_utc();

    sqlx::query(
        "INSERT INTO auth_users (id, email, password, name, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(email)
    .bind(hashed_password)
    .bind(name)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(id)
}

#[instrument(skip_all, fields(email))]
pub async fn authenticate_identity(
    pool: &Pool<Sqlite>,
    email: &str,
    password: &str,
) -> Result<Option<Identity>, AppError> {
    info!("Authenticating identity");
    let email = email.trim().to_lowercase();

    #[derive(sqlx::FromRow)]
    struct CredentialRow {
        id: String,
        password: String,
    }

    let row = sqlx::query_as::<_, CredentialRow>(
        "SELECT id, password FROM auth_users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    // A malformed stored hash is a failed login, not a server error.
    if !bcrypt::verify(password, &row.password).unwrap_or(false) {
        return Ok(None);
    }

    find_identity(pool, &row.id).await
}

#[instrument(skip(pool))]
pub async fn find_identity(pool: &Pool<Sqlite>, id: &str) -> Result<Option<Identity>, AppError> {
    let row = sqlx::query_as::<_, DbIdentity>(
        "SELECT id, email, name, created_at FROM auth_users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Identity::from))
}

#[instrument(skip(pool))]
pub async fn get_identity(pool: &Pool<Sqlite>, id: &str) -> Result<Identity, AppError> {
    info!("Fetching identity by ID");
    find_identity(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Identity with id {} not found", id)))
}

#[instrument(skip(pool))]
pub async fn find_identity_by_email(
    pool: &Pool<Sqlite>,
    email: &str,
) -> Result<Option<Identity>, AppError> {
    let row = sqlx::query_as::<_, DbIdentity>(
        "SELECT id, email, name, created_at FROM auth_users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Identity::from))
}

#[instrument(skip(pool))]
pub async fn find_user_profile(
    pool: &Pool<Sqlite>,
    user_id: &str,
) -> Result<Option<UserProfile>, AppError> {
    let row = sqlx::query_as::<_, DbUserProfile>(
        "SELECT id, email, name, is_admin, role, created_at FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(UserProfile::from))
}

/// Mirrors an identity into `users` the first time the owner receives a
/// testimonial. Unknown identities are rejected; a failed mirror insert is
/// logged and otherwise ignored.
#[instrument(skip(pool))]
pub async fn ensure_user_profile(pool: &Pool<Sqlite>, user_id: &str) -> Result<(), AppError> {
    if find_user_profile(pool, user_id).await?.is_some() {
        return Ok(());
    }

    let identity = find_identity(pool, user_id)
        .await?
        .ok_or_else(|| AppError::Validation("Invalid user ID".to_string()))?;

    info!("Mirroring identity into users table");
    let result = sqlx::query(
        "INSERT OR IGNORE INTO users (id, email, name, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&identity.id)
    .bind(&identity.email)
    .bind(identity.display_name())
    .bind(Utc::now().naive_utc())
    .execute(pool)
    .await;

    if let Err(e) = result {
        warn!(user_id = %user_id, error = %e, "Failed to mirror user profile, continuing");
    }

    Ok(())
}

/// Creates or updates the mirrored profile with the given admin flags.
#[instrument(skip(pool))]
pub async fn set_user_admin(
    pool: &Pool<Sqlite>,
    user_id: &str,
    is_admin: bool,
) -> Result<(), AppError> {
    info!("Setting admin flag");
    let identity = get_identity(pool, user_id).await?;
    let role = if is_admin { Role::Admin } else { Role::User };

    sqlx::query(
        "INSERT INTO users (id, email, name, is_admin, role, created_at) VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT (id) DO UPDATE SET is_admin = excluded.is_admin, role = excluded.role",
    )
    .bind(&identity.id)
    .bind(&identity.email)
    .bind(identity.display_name())
    .bind(is_admin)
    .bind(role.as_str())
    .bind(Utc::now().naive_utc())
    .execute(pool)
    .await?;

    Ok(())
}

#[instrument(skip(pool))]
pub async fn list_user_summaries(pool: &Pool<Sqlite>) -> Result<Vec<UserSummary>, AppError> {
    info!("Listing users");
    let rows = sqlx::query_as::<_, UserSummary>(
        "SELECT id, email, created_at FROM users ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
