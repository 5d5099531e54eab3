use chrono::Utc;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{ContactMessage, ContactStatus, DbContactMessage};

const CONTACT_COLUMNS: &str = "id, name, email, subject, message, status, created_at, updated_at";

#[instrument(skip(pool, message))]
pub async fn create_contact_message(
    pool: &Pool<Sqlite>,
    name: &str,
    email: &str,
    subject: &str,
    message: &str,
) -> Result<ContactMessage, AppError> {
    info!("Creating contact message");
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().naive_utc();

    sqlx::query(
        "INSERT INTO contact_messages (id, name, email, subject, message, status, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(name)
    .bind(email)
    .bind(subject)
    .bind(message)
    .bind(ContactStatus::Unread.as_str())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    find_contact_message(pool, &id)
        .await?
        .ok_or_else(|| AppError::Internal("Contact message vanished after insert".to_string()))
}

#[instrument(skip(pool))]
pub async fn find_contact_message(
    pool: &Pool<Sqlite>,
    id: &str,
) -> Result<Option<ContactMessage>, AppError> {
    let row = sqlx::query_as::<_, DbContactMessage>(&format!(
        "SELECT {} FROM contact_messages WHERE id = ?",
        CONTACT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(ContactMessage::from))
}

/// Newest first. `page` is 1-based. Returns the page and the total number of
/// matching rows.
#[instrument(skip(pool))]
pub async fn list_contact_messages(
    pool: &Pool<Sqlite>,
    status: Option<ContactStatus>,
    page: i64,
    limit: i64,
) -> Result<(Vec<ContactMessage>, i64), AppError> {
    info!("Listing contact messages");
    let offset = page.max(1).saturating_sub(1).saturating_mul(limit);
    let status = status.map(|s| s.as_str());

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM contact_messages WHERE (?1 IS NULL OR status = ?1)",
    )
    .bind(status)
    .fetch_one(pool)
    .await?;

    let rows = sqlx::query_as::<_, DbContactMessage>(&format!(
        "SELECT {} FROM contact_messages
         WHERE (?1 IS NULL OR status = ?1)
         ORDER BY created_at DESC
         LIMIT ?2 OFFSET ?3",
        CONTACT_COLUMNS
    ))
    .bind(status)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok((rows.into_iter().map(ContactMessage::from).collect(), total))
}

#[instrument(skip(pool))]
pub async fn update_contact_status(
    pool: &Pool<Sqlite>,
    id: &str,
    status: ContactStatus,
) -> Result<Option<ContactMessage>, AppError> {
    info!("Updating contact message status");
    let res = sqlx::query("UPDATE contact_messages SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(Utc::now().naive_utc())
        .bind(id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        return Ok(None);
    }

    find_contact_message(pool, id).await
}

#[instrument(skip(pool))]
pub async fn delete_contact_message(pool: &Pool<Sqlite>, id: &str) -> Result<bool, AppError> {
    info!("Deleting contact message");
    let res = sqlx::query("DELETE FROM contact_messages WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(res.rows_affected() > 0)
}
