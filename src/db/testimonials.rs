use chrono::Utc;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{DbTestimonial, Testimonial, TestimonialStat};

const TESTIMONIAL_COLUMNS: &str =
    "id, user_id, customer_name, customer_email, message, rating, approved, created_at";

pub struct NewTestimonial<'a> {
    pub user_id: &'a str,
    pub customer_name: &'a str,
    pub customer_email: &'a str,
    pub message: &'a str,
    pub rating: i64,
}

#[instrument(skip(pool))]
pub async fn count_testimonials_for_user(
    pool: &Pool<Sqlite>,
    user_id: &str,
) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM testimonials WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// Inserts a pending testimonial unless the owner already holds `limit` rows.
/// The count and the insert are one statement, so concurrent submissions
/// cannot overshoot the ceiling. Returns `None` when the ceiling was hit.
#[instrument(skip(pool, new), fields(user_id = %new.user_id))]
pub async fn insert_testimonial_within_limit(
    pool: &Pool<Sqlite>,
    new: &NewTestimonial<'_>,
    limit: i64,
) -> Result<Option<Testimonial>, AppError> {
    info!("Inserting testimonial");
    let id = Uuid::new_v4().to_string();

    let res = sqlx::query(
        "INSERT INTO testimonials
         (id, user_id, customer_name, customer_email, message, rating, approved, created_at)
         SELECT ?, ?, ?, ?, ?, ?, FALSE, ?
         WHERE (SELECT COUNT(*) FROM testimonials WHERE user_id = ?) < ?",
    )
    .bind(&id)
    .bind(new.user_id)
    .bind(new.customer_name)
    .bind(new.customer_email)
    .bind(new.message)
    .bind(new.rating)
    .bind(Utc::now().naive_utc())
    .bind(new.user_id)
    .bind(limit)
    .execute(pool)
    .await?;

    if res.rows_affected() == 0 {
        return Ok(None);
    }

    find_testimonial(pool, &id).await
}

#[instrument(skip(pool))]
pub async fn find_testimonial(
    pool: &Pool<Sqlite>,
    id: &str,
) -> Result<Option<Testimonial>, AppError> {
    let row = sqlx::query_as::<_, DbTestimonial>(&format!(
        "SELECT {} FROM testimonials WHERE id = ?",
        TESTIMONIAL_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Testimonial::from))
}

#[instrument(skip(pool))]
pub async fn list_testimonials_for_user(
    pool: &Pool<Sqlite>,
    user_id: &str,
) -> Result<Vec<Testimonial>, AppError> {
    info!("Listing testimonials for user");
    let rows = sqlx::query_as::<_, DbTestimonial>(&format!(
        "SELECT {} FROM testimonials WHERE user_id = ? ORDER BY created_at DESC",
        TESTIMONIAL_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Testimonial::from).collect())
}

#[instrument(skip(pool))]
pub async fn list_approved_testimonials(
    pool: &Pool<Sqlite>,
    user_id: &str,
    limit: i64,
) -> Result<Vec<Testimonial>, AppError> {
    info!("Listing approved testimonials");
    let rows = sqlx::query_as::<_, DbTestimonial>(&format!(
        "SELECT {} FROM testimonials
         WHERE user_id = ? AND approved = TRUE
         ORDER BY created_at DESC
         LIMIT ?",
        TESTIMONIAL_COLUMNS
    ))
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Testimonial::from).collect())
}

/// Unconditional update; callers decide who may flip the flag.
#[instrument(skip(pool))]
pub async fn set_testimonial_approval(
    pool: &Pool<Sqlite>,
    id: &str,
    approved: bool,
) -> Result<Option<Testimonial>, AppError> {
    info!("Updating testimonial approval");
    sqlx::query("UPDATE testimonials SET approved = ? WHERE id = ?")
        .bind(approved)
        .bind(id)
        .execute(pool)
        .await?;

    find_testimonial(pool, id).await
}

/// Rating/approval/creation for one owner, or for the whole platform when
/// `user_id` is `None`.
#[instrument(skip(pool))]
pub async fn list_testimonial_stats(
    pool: &Pool<Sqlite>,
    user_id: Option<&str>,
) -> Result<Vec<TestimonialStat>, AppError> {
    let rows = match user_id {
        Some(user_id) => {
            sqlx::query_as::<_, TestimonialStat>(
                "SELECT rating, approved, created_at FROM testimonials WHERE user_id = ?",
            )
            .bind(user_id)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, TestimonialStat>(
                "SELECT rating, approved, created_at FROM testimonials",
            )
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows)
}
