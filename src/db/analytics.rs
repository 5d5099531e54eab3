use chrono::{NaiveDateTime, Utc};
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::analytics::{
    FunnelEvent, PageEvent, RecentEvent, StoredEvent, StoredFunnelEvent, StoredWidgetEvent,
    TrackingContext, WidgetEvent,
};
use crate::error::AppError;

#[instrument(skip(pool, event), fields(user_id = %ctx.user_id, event_type = %event.event_type))]
pub async fn insert_analytics_event(
    pool: &Pool<Sqlite>,
    ctx: &TrackingContext,
    event: &PageEvent,
) -> Result<i64, AppError> {
    info!("Recording analytics event");
    let res = sqlx::query(
        "INSERT INTO analytics_events
         (user_id, event_type, event_name, properties, url, referrer, user_agent, ip_address, session_id, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&ctx.user_id)
    .bind(&event.event_type)
    .bind(&event.event_name)
    .bind(event.properties.to_json_string())
    .bind(&event.url)
    .bind(&event.referrer)
    .bind(&event.user_agent)
    .bind(&event.ip_address)
    .bind(&ctx.session_id)
    .bind(Utc::now().naive_utc())
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool, event), fields(user_id = %ctx.user_id, stage = %event.stage))]
pub async fn insert_funnel_event(
    pool: &Pool<Sqlite>,
    ctx: &TrackingContext,
    event: &FunnelEvent,
) -> Result<i64, AppError> {
    info!("Recording testimonial funnel event");
    let res = sqlx::query(
        "INSERT INTO testimonial_analytics
         (user_id, testimonial_id, event_type, form_data, referrer, session_id, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&ctx.user_id)
    .bind(&event.testimonial_id)
    .bind(event.stage.as_str())
    .bind(event.form_data.to_json_string())
    .bind(&event.referrer)
    .bind(&ctx.session_id)
    .bind(Utc::now().naive_utc())
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool, event), fields(user_id = %ctx.user_id, event_type = %event.event_type))]
pub async fn insert_widget_event(
    pool: &Pool<Sqlite>,
    ctx: &TrackingContext,
    event: &WidgetEvent,
) -> Result<i64, AppError> {
    info!("Recording widget event");
    let res = sqlx::query(
        "INSERT INTO widget_analytics
         (user_id, widget_id, event_type, website_domain, referrer, session_id, properties, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&ctx.user_id)
    .bind(&event.widget_id)
    .bind(event.event_type.as_str())
    .bind(&event.website_domain)
    .bind(&event.referrer)
    .bind(&ctx.session_id)
    .bind(event.properties.to_json_string())
    .bind(Utc::now().naive_utc())
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool))]
pub async fn list_events_since(
    pool: &Pool<Sqlite>,
    user_id: &str,
    since: NaiveDateTime,
) -> Result<Vec<StoredEvent>, AppError> {
    let rows = sqlx::query_as::<_, StoredEvent>(
        "SELECT event_type, event_name, properties, created_at FROM analytics_events
         WHERE user_id = ? AND created_at >= ?",
    )
    .bind(user_id)
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[instrument(skip(pool))]
pub async fn list_funnel_events_since(
    pool: &Pool<Sqlite>,
    user_id: &str,
    since: NaiveDateTime,
) -> Result<Vec<StoredFunnelEvent>, AppError> {
    let rows = sqlx::query_as::<_, StoredFunnelEvent>(
        "SELECT event_type, form_data, created_at FROM testimonial_analytics
         WHERE user_id = ? AND created_at >= ?",
    )
    .bind(user_id)
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Widget events in the window, for one owner or the whole platform.
#[instrument(skip(pool))]
pub async fn list_widget_events_since(
    pool: &Pool<Sqlite>,
    user_id: Option<&str>,
    since: NaiveDateTime,
) -> Result<Vec<StoredWidgetEvent>, AppError> {
    // Insertion order keeps the top-domain tie-break deterministic.
    let rows = sqlx::query_as::<_, StoredWidgetEvent>(
        "SELECT event_type, website_domain, properties, created_at FROM widget_analytics
         WHERE (?1 IS NULL OR user_id = ?1) AND created_at >= ?2
         ORDER BY id",
    )
    .bind(user_id)
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[instrument(skip(pool))]
pub async fn list_recent_events(
    pool: &Pool<Sqlite>,
    limit: i64,
) -> Result<Vec<RecentEvent>, AppError> {
    let rows = sqlx::query_as::<_, RecentEvent>(
        "SELECT e.event_type, e.properties, e.created_at, u.email AS user_email
         FROM analytics_events e
         LEFT JOIN users u ON u.id = e.user_id
         ORDER BY e.created_at DESC, e.id DESC
         LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
