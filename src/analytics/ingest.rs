use sqlx::{Pool, Sqlite};
use tracing::{instrument, warn};

use crate::db::{insert_analytics_event, insert_funnel_event, insert_widget_event};
use crate::error::AppError;

use super::events::{
    EventProperties, FunnelEvent, FormSubmissionProps, PageEvent, TrackingContext, WidgetEvent,
};

/// Event name the server records for each accepted submission.
pub const TESTIMONIAL_SUBMITTED: &str = "testimonial_submitted";

pub async fn track_event(
    pool: &Pool<Sqlite>,
    ctx: &TrackingContext,
    event: &PageEvent,
) -> Result<i64, AppError> {
    insert_analytics_event(pool, ctx, event).await
}

pub async fn track_funnel_event(
    pool: &Pool<Sqlite>,
    ctx: &TrackingContext,
    event: &FunnelEvent,
) -> Result<i64, AppError> {
    insert_funnel_event(pool, ctx, event).await
}

pub async fn track_widget_event(
    pool: &Pool<Sqlite>,
    ctx: &TrackingContext,
    event: &WidgetEvent,
) -> Result<i64, AppError> {
    insert_widget_event(pool, ctx, event).await
}

/// Records a server-side event. Never fails the caller.
#[instrument(skip(pool, event), fields(user_id = %ctx.user_id, event_type = %event.event_type))]
pub async fn track_event_best_effort(pool: &Pool<Sqlite>, ctx: &TrackingContext, event: PageEvent) {
    if let Err(e) = track_event(pool, ctx, &event).await {
        warn!(error = %e, "Failed to record analytics event");
    }
}

pub fn testimonial_submitted_event(rating: i64, message_length: usize) -> PageEvent {
    PageEvent {
        event_type: TESTIMONIAL_SUBMITTED.to_string(),
        event_name: "Testimonial submitted".to_string(),
        properties: EventProperties::FormSubmission(FormSubmissionProps {
            rating,
            message_length: Some(message_length as u64),
        }),
        ..Default::default()
    }
}
