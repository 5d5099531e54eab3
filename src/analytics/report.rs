use std::collections::BTreeMap;

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::db::{
    list_events_since, list_funnel_events_since, list_recent_events, list_testimonial_stats,
    list_user_summaries, list_widget_events_since,
};
use crate::error::AppError;

use super::aggregate::{
    FunnelConversion, FunnelCounts, Insight, InsightInputs, TIMELINE_LIMIT, TOP_DOMAIN_LIMIT,
    TestimonialTotals, TimelineEntry, WidgetCounts, DomainCount, average_rating,
    conversion_rate, count_by_event_type, distinct_domains, generate_insights,
    growth_percentage, monthly_counts, timeline, top_domains,
};
use super::events::{EventProperties, StoredWidgetEvent, WidgetEventType};

pub const DEFAULT_PERIOD_DAYS: i64 = 30;
pub const RECENT_ACTIVITY_LIMIT: i64 = 20;
const MAX_PERIOD_DAYS: i64 = 3650;
const UNKNOWN_USER: &str = "Unknown User";

/// Missing or non-positive periods fall back to the default window.
pub fn normalize_period(period: Option<i64>) -> i64 {
    match period {
        Some(days) if days > 0 => days.min(MAX_PERIOD_DAYS),
        _ => DEFAULT_PERIOD_DAYS,
    }
}

fn window_start(now: NaiveDateTime, period_days: i64) -> NaiveDateTime {
    now - Duration::days(period_days)
}

fn widget_domains(events: &[StoredWidgetEvent]) -> impl Iterator<Item = &str> {
    events.iter().filter_map(|e| e.website_domain.as_deref())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSummary {
    pub loads: usize,
    pub views: usize,
    pub clicks: usize,
    pub unique_domains: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardReport {
    pub period: i64,
    pub testimonials: TestimonialTotals,
    pub collection: FunnelCounts,
    pub conversion: FunnelConversion,
    pub widgets: WidgetSummary,
    pub insights: Vec<Insight>,
}

/// The owner's own dashboard. Event streams cover the last `period_days`;
/// testimonial totals are all-time.
#[instrument(skip(pool))]
pub async fn dashboard_report(
    pool: &Pool<Sqlite>,
    user_id: &str,
    period_days: i64,
    now: NaiveDateTime,
) -> Result<DashboardReport, AppError> {
    info!("Building dashboard report");
    let since = window_start(now, period_days);

    let stats = list_testimonial_stats(pool, Some(user_id)).await?;
    let funnel_events = list_funnel_events_since(pool, user_id, since).await?;
    let widget_events = list_widget_events_since(pool, Some(user_id), since).await?;

    let testimonials = TestimonialTotals::from_stats(&stats);
    let funnel = FunnelCounts::from_events(&funnel_events);
    let conversion = funnel.conversion();
    let widget_counts = WidgetCounts::from_events(&widget_events);

    let insights = generate_insights(&InsightInputs {
        conversion: &conversion,
        testimonials: &testimonials,
        widgets: widget_counts,
        funnel,
    });

    Ok(DashboardReport {
        period: period_days,
        widgets: WidgetSummary {
            loads: widget_counts.loads,
            views: widget_counts.views,
            clicks: widget_counts.clicks,
            unique_domains: distinct_domains(widget_domains(&widget_events)).len(),
        },
        testimonials,
        collection: funnel,
        conversion,
        insights,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    #[serde(rename = "type")]
    pub event_type: String,
    pub user_email: String,
    pub created_at: NaiveDateTime,
    pub properties: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthStats {
    pub users_this_month: usize,
    pub testimonials_this_month: usize,
    pub growth_percentage: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformReport {
    pub period: i64,
    pub total_users: usize,
    pub total_testimonials: usize,
    pub total_widget_loads: usize,
    pub average_rating: String,
    pub conversion_rate: String,
    pub top_domains: Vec<DomainCount>,
    pub recent_activity: Vec<ActivityEntry>,
    pub growth_stats: GrowthStats,
}

/// Platform-wide figures for the admin console.
#[instrument(skip(pool))]
pub async fn platform_report(
    pool: &Pool<Sqlite>,
    period_days: i64,
    now: NaiveDateTime,
) -> Result<PlatformReport, AppError> {
    info!("Building platform report");
    let since = window_start(now, period_days);

    let users = list_user_summaries(pool).await?;
    let stats = list_testimonial_stats(pool, None).await?;
    let widget_events = list_widget_events_since(pool, None, since).await?;
    let recent = list_recent_events(pool, RECENT_ACTIVITY_LIMIT).await?;

    let total_widget_loads = widget_events
        .iter()
        .filter(|e| WidgetEventType::from_db(&e.event_type) == Some(WidgetEventType::WidgetLoad))
        .count();

    let user_growth = monthly_counts(users.iter().map(|u| u.created_at), now);
    let testimonial_growth = monthly_counts(stats.iter().map(|t| t.created_at), now);

    let recent_activity = recent
        .into_iter()
        .map(|e| ActivityEntry {
            properties: EventProperties::from_stored(&e.properties).to_value(),
            user_email: e.user_email.unwrap_or_else(|| UNKNOWN_USER.to_string()),
            event_type: e.event_type,
            created_at: e.created_at,
        })
        .collect();

    Ok(PlatformReport {
        period: period_days,
        total_users: users.len(),
        total_testimonials: stats.len(),
        total_widget_loads,
        average_rating: average_rating(&stats),
        conversion_rate: conversion_rate(stats.len(), total_widget_loads),
        top_domains: top_domains(widget_domains(&widget_events), TOP_DOMAIN_LIMIT),
        recent_activity,
        growth_stats: GrowthStats {
            users_this_month: user_growth.this_month,
            testimonials_this_month: testimonial_growth.this_month,
            growth_percentage: growth_percentage(user_growth.this_month, user_growth.last_month),
        },
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTotals {
    pub total: usize,
    pub by_type: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetReport {
    pub loads: usize,
    pub views: usize,
    pub clicks: usize,
    pub domains: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserReport {
    pub user_id: String,
    pub period: i64,
    pub events: EventTotals,
    pub testimonials: TestimonialTotals,
    pub collection: FunnelCounts,
    pub conversion: FunnelConversion,
    pub widgets: WidgetReport,
    pub timeline: Vec<TimelineEntry>,
}

/// Drill-down on a single owner for the admin console.
#[instrument(skip(pool))]
pub async fn user_report(
    pool: &Pool<Sqlite>,
    user_id: &str,
    period_days: i64,
    now: NaiveDateTime,
) -> Result<UserReport, AppError> {
    info!("Building user report");
    let since = window_start(now, period_days);

    let events = list_events_since(pool, user_id, since).await?;
    let stats = list_testimonial_stats(pool, Some(user_id)).await?;
    let funnel_events = list_funnel_events_since(pool, user_id, since).await?;
    let widget_events = list_widget_events_since(pool, Some(user_id), since).await?;

    let funnel = FunnelCounts::from_events(&funnel_events);
    let widget_counts = WidgetCounts::from_events(&widget_events);

    Ok(UserReport {
        user_id: user_id.to_string(),
        period: period_days,
        events: EventTotals {
            total: events.len(),
            by_type: count_by_event_type(&events),
        },
        testimonials: TestimonialTotals::from_stats(&stats),
        collection: funnel,
        conversion: funnel.conversion(),
        widgets: WidgetReport {
            loads: widget_counts.loads,
            views: widget_counts.views,
            clicks: widget_counts.clicks,
            domains: distinct_domains(widget_domains(&widget_events)),
        },
        timeline: timeline(&events, &funnel_events, &widget_events, TIMELINE_LIMIT),
    })
}
